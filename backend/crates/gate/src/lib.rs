//! Gate - Forward-Authentication Gateway Core
//!
//! Clean Architecture structure:
//! - `domain/` - Session record, directory users, step-up policy, store traits
//! - `application/` - Use cases: authorize, login, OTP, OIDC, TOTP, config, audit
//! - `infra/` - Session stores (memory/Redis) and upstream HTTP clients
//! - `presentation/` - HTTP handlers, DTOs, router, rendering, metrics
//!
//! ## Features
//! - `/_auth` decision endpoint for an L7 proxy (Traefik, nginx auth_request)
//! - Opaque cookie sessions with cross-subdomain session exchange
//! - Password, allowlist+OTP, OIDC and TOTP step-up login flows
//! - Pluggable session storage (in-process map or shared Redis)
//!
//! ## Security Model
//! - The gateway is not a user database: user records live in the Warden
//!   allowlist directory, OTP state in the Herald broker, TOTP secrets in
//!   the remote TOTP service
//! - Sessions are opaque UUIDv4 ids; the cookie carries nothing else
//! - Session-store failures fail closed on the decision path

pub mod application;
pub mod domain;
pub mod error;
pub mod i18n;
pub mod infra;
pub mod presentation;


#[cfg(test)]
pub(crate) mod testkit;

// Re-exports for convenience
pub use application::config::{ConfigError, GateConfig};
pub use error::{GateError, GateResult};
pub use presentation::router::gate_router;
pub use presentation::state::GateState;

// Re-export kernel error types for unified error handling
pub use kernel::error::{
    app_error::{AppError, AppResult},
    kind::ErrorKind,
};
