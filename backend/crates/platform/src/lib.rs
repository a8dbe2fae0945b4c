//! Platform Crate - Technical Infrastructure
//!
//! This crate provides shared technical foundations:
//! - Cryptographic utilities (SHA-256, HMAC request signing, Base64)
//! - Configured-password verification (plaintext/md5/sha512/bcrypt)
//! - Cookie management
//! - Client identification (forwarded IP, user agent)

pub mod client;
pub mod cookie;
pub mod crypto;
pub mod password;
