//! Shared Kernel - Domain-crossing minimal core
//!
//! This crate contains the "smallest core" of vocabulary shared by every
//! gateway crate:
//! - Common error types and result aliases
//! - The error-kind to HTTP status mapping
//!
//! **Design Principle**: Only include things that are "hard to change"
//! and have consistent meaning across all domains.

pub mod error {
    pub mod app_error;
    pub mod kind;

    #[cfg(feature = "axum")]
    pub mod response;
}

pub use error::app_error::{AppError, AppResult};
pub use error::kind::ErrorKind;
