//! Redis Session Store
//!
//! A blob-per-id model over a generic KV: sessions serialize to JSON and
//! live under a configured key prefix with the store TTL as the Redis
//! expiry. `RedisKv` is the fred-backed KV; `KvSessionStore` layers the
//! session codec on top of any `Kv` implementation.

use std::sync::Arc;
use std::time::Duration;

use fred::prelude::{Client, ClientLike, Config, Expiration, KeysInterface};
use fred::types::scan::Scanner;
use futures::StreamExt;

use crate::application::config::SessionStorageConfig;
use crate::domain::session::Session;
use crate::domain::store::{Kv, SessionStore};
use crate::error::{GateError, GateResult};

/// Per-operation ceiling for KV round-trips.
const KV_TIMEOUT: Duration = Duration::from_secs(5);

/// SCAN page size for prefix resets.
const SCAN_PAGE: u32 = 100;

pub struct RedisKv {
    client: Client,
    prefix: String,
}

impl RedisKv {
    /// Connect and wait for the connection to come up.
    pub async fn connect(config: &SessionStorageConfig) -> GateResult<Self> {
        let url = match &config.password {
            Some(password) => format!("redis://:{}@{}/{}", password, config.addr, config.db),
            None => format!("redis://{}/{}", config.addr, config.db),
        };
        let fred_config = Config::from_url(&url)
            .map_err(|e| GateError::SessionStore(format!("redis config: {e}")))?;
        let client = Client::new(fred_config, None, None, None);
        client.connect();
        client
            .wait_for_connect()
            .await
            .map_err(|e| GateError::SessionStore(format!("redis connect: {e}")))?;

        tracing::info!(addr = %config.addr, db = config.db, "Connected to Redis");
        Ok(Self {
            client,
            prefix: config.key_prefix.clone(),
        })
    }

    fn key(&self, id: &str) -> String {
        format!("{}{}", self.prefix, id)
    }
}

async fn bounded<T, F>(op: &'static str, fut: F) -> GateResult<T>
where
    F: std::future::Future<Output = Result<T, fred::prelude::Error>>,
{
    match tokio::time::timeout(KV_TIMEOUT, fut).await {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(e)) => Err(GateError::SessionStore(format!("{op}: {e}"))),
        Err(_) => Err(GateError::SessionStore(format!("{op}: timed out"))),
    }
}

impl Kv for RedisKv {
    async fn get(&self, key: &str) -> GateResult<Option<Vec<u8>>> {
        bounded("GET", self.client.get::<Option<Vec<u8>>, _>(self.key(key))).await
    }

    async fn set(&self, key: &str, value: &[u8], ttl: Duration) -> GateResult<()> {
        bounded(
            "SET",
            self.client.set::<(), _, _>(
                self.key(key),
                value.to_vec(),
                Some(Expiration::EX(ttl.as_secs() as i64)),
                None,
                false,
            ),
        )
        .await
    }

    async fn del(&self, key: &str) -> GateResult<()> {
        bounded("DEL", self.client.del::<(), _>(self.key(key))).await
    }

    /// Delete every key under the prefix. Scans stay inside the
    /// namespace so unrelated keys in a shared instance survive.
    async fn reset(&self) -> GateResult<()> {
        let pattern = format!("{}*", self.prefix);
        let mut scanner = self.client.scan(pattern, Some(SCAN_PAGE), None);
        while let Some(page) = scanner.next().await {
            let mut page = page.map_err(|e| GateError::SessionStore(format!("SCAN: {e}")))?;
            if let Some(keys) = page.take_results() {
                if !keys.is_empty() {
                    bounded("DEL", self.client.del::<(), _>(keys)).await?;
                }
            }
            let _ = page.next();
        }
        Ok(())
    }

    async fn close(&self) -> GateResult<()> {
        self.client
            .quit()
            .await
            .map_err(|e| GateError::SessionStore(format!("QUIT: {e}")))
    }
}

/// Session codec over any KV backend.
pub struct KvSessionStore<K>
where
    K: Kv,
{
    kv: Arc<K>,
    ttl: Duration,
}

impl<K> KvSessionStore<K>
where
    K: Kv,
{
    pub fn new(kv: Arc<K>, ttl: Duration) -> Self {
        Self { kv, ttl }
    }
}

impl<K> SessionStore for KvSessionStore<K>
where
    K: Kv + Sync,
{
    async fn load(&self, id: &str) -> GateResult<Option<Session>> {
        let Some(blob) = self.kv.get(id).await? else {
            return Ok(None);
        };
        match serde_json::from_slice(&blob) {
            Ok(session) => Ok(Some(session)),
            Err(e) => {
                // A corrupt blob reads as a missing session; the login
                // flow will overwrite it.
                tracing::warn!(session_id = %id, error = %e, "Discarding undecodable session blob");
                Ok(None)
            }
        }
    }

    async fn save(&self, session: &Session) -> GateResult<()> {
        let blob = serde_json::to_vec(session)?;
        self.kv.set(&session.id, &blob, self.ttl).await
    }

    async fn destroy(&self, id: &str) -> GateResult<()> {
        self.kv.del(id).await
    }

    async fn reset(&self) -> GateResult<()> {
        self.kv.reset().await
    }

    async fn close(&self) -> GateResult<()> {
        self.kv.close().await
    }
}
