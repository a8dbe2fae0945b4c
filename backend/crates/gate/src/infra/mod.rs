//! Infrastructure layer - session stores and upstream HTTP clients

pub mod herald;
pub mod memory;
pub mod oidc;
pub mod redis;
pub mod totp;
pub mod warden;

pub use herald::HeraldClient;
pub use memory::MemorySessionStore;
pub use oidc::OidcProvider;
pub use redis::{KvSessionStore, RedisKv};
pub use totp::TotpClient;
pub use warden::WardenClient;
