//! In-Memory Session Store
//!
//! Single-process map keyed by session id. Expiry is enforced lazily on
//! load and eagerly by a background sweeper. Suitable for one gateway
//! instance; multi-instance deployments use the Redis-backed store.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use crate::domain::session::Session;
use crate::domain::store::SessionStore;
use crate::error::GateResult;

struct Entry {
    session: Session,
    expires_at: Instant,
}

#[derive(Clone)]
pub struct MemorySessionStore {
    entries: Arc<Mutex<HashMap<String, Entry>>>,
    ttl: Duration,
}

impl MemorySessionStore {
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: Arc::new(Mutex::new(HashMap::new())),
            ttl,
        }
    }

    /// Spawn the expiry sweeper. The handle is held by the caller for
    /// the process lifetime.
    pub fn start_sweeper(&self, interval: Duration) -> tokio::task::JoinHandle<()> {
        let entries = Arc::clone(&self.entries);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            loop {
                ticker.tick().await;
                let now = Instant::now();
                let mut map = entries.lock().unwrap_or_else(|e| e.into_inner());
                let before = map.len();
                map.retain(|_, entry| entry.expires_at > now);
                let swept = before - map.len();
                if swept > 0 {
                    tracing::debug!(swept, remaining = map.len(), "Expired sessions swept");
                }
            }
        })
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, Entry>> {
        self.entries.lock().unwrap_or_else(|e| e.into_inner())
    }

    #[cfg(test)]
    fn insert_with_ttl(&self, session: Session, ttl: Duration) {
        self.lock().insert(
            session.id.clone(),
            Entry {
                session,
                expires_at: Instant::now() + ttl,
            },
        );
    }
}

impl SessionStore for MemorySessionStore {
    async fn load(&self, id: &str) -> GateResult<Option<Session>> {
        let mut map = self.lock();
        match map.get(id) {
            Some(entry) if entry.expires_at > Instant::now() => Ok(Some(entry.session.clone())),
            Some(_) => {
                map.remove(id);
                Ok(None)
            }
            None => Ok(None),
        }
    }

    async fn save(&self, session: &Session) -> GateResult<()> {
        self.lock().insert(
            session.id.clone(),
            Entry {
                session: session.clone(),
                expires_at: Instant::now() + self.ttl,
            },
        );
        Ok(())
    }

    async fn destroy(&self, id: &str) -> GateResult<()> {
        self.lock().remove(id);
        Ok(())
    }

    async fn reset(&self) -> GateResult<()> {
        self.lock().clear();
        Ok(())
    }

    async fn close(&self) -> GateResult<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_save_load_destroy() {
        let store = MemorySessionStore::new(Duration::from_secs(60));
        let mut session = Session::new();
        session.authenticate_password();
        store.save(&session).await.unwrap();

        let loaded = store.load(&session.id).await.unwrap().unwrap();
        assert!(loaded.authenticated);

        store.destroy(&session.id).await.unwrap();
        assert!(store.load(&session.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_expired_entry_is_gone_on_load() {
        let store = MemorySessionStore::new(Duration::from_secs(60));
        let session = Session::new();
        store.insert_with_ttl(session.clone(), Duration::from_millis(0));

        tokio::time::sleep(Duration::from_millis(5)).await;
        assert!(store.load(&session.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_save_refreshes_ttl() {
        let store = MemorySessionStore::new(Duration::from_secs(60));
        let session = Session::new();
        store.insert_with_ttl(session.clone(), Duration::from_millis(0));
        store.save(&session).await.unwrap();
        assert!(store.load(&session.id).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_reset_clears_everything() {
        let store = MemorySessionStore::new(Duration::from_secs(60));
        store.save(&Session::new()).await.unwrap();
        store.save(&Session::new()).await.unwrap();
        store.reset().await.unwrap();
        assert!(store.lock().is_empty());
    }
}
