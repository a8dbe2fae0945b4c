//! Store Traits
//!
//! Interfaces for session persistence. Implementations live in the
//! infrastructure layer: a single-process map and a shared Redis KV.
//!
//! Handlers must observe read-modify-write semantics per session id:
//! load, mutate in memory, save. No handler holds a session reference
//! across request boundaries; the store is authoritative on expiry.

use std::time::Duration;

use crate::domain::session::Session;
use crate::error::GateResult;

/// Session store trait
#[trait_variant::make(SessionStore: Send)]
pub trait LocalSessionStore {
    /// Load a session by id. `Ok(None)` for unknown or expired ids;
    /// `Err` only on transport/storage failure.
    async fn load(&self, id: &str) -> GateResult<Option<Session>>;

    /// Persist the session under its id, refreshing the TTL.
    async fn save(&self, session: &Session) -> GateResult<()>;

    /// Remove a session by id. Unknown ids are not an error.
    async fn destroy(&self, id: &str) -> GateResult<()>;

    /// Remove every session owned by this store (namespaced for shared
    /// backends).
    async fn reset(&self) -> GateResult<()>;

    /// Release backend resources.
    async fn close(&self) -> GateResult<()>;
}

/// Generic byte-blob KV used by the shared session store.
#[trait_variant::make(Kv: Send)]
pub trait LocalKv {
    async fn get(&self, key: &str) -> GateResult<Option<Vec<u8>>>;

    async fn set(&self, key: &str, value: &[u8], ttl: Duration) -> GateResult<()>;

    async fn del(&self, key: &str) -> GateResult<()>;

    /// Delete only keys within this store's namespace.
    async fn reset(&self) -> GateResult<()>;

    async fn close(&self) -> GateResult<()>;
}
