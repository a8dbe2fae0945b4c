//! Warden Allowlist Client
//!
//! Read-only directory of users allowed to sign in. The full list is
//! cached in memory under a TTL; a cache-refresh failure falls back to a
//! per-key lookup so login keeps working through partial outages. The
//! client never serves a snapshot past its TTL.

use std::time::{Duration, Instant};

use tokio::sync::RwLock;

use crate::application::config::WardenConfig;
use crate::domain::directory::DirectoryUser;
use crate::domain::upstream::Directory;
use crate::error::{GateError, GateResult};

const HTTP_TIMEOUT: Duration = Duration::from_secs(10);

struct CacheState {
    snapshot: Vec<DirectoryUser>,
    expires_at: Instant,
}

pub struct WardenClient {
    http: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
    cache_ttl: Duration,
    cache: RwLock<Option<CacheState>>,
}

impl WardenClient {
    pub fn new(config: &WardenConfig) -> GateResult<Self> {
        let http = reqwest::Client::builder()
            .timeout(HTTP_TIMEOUT)
            .build()
            .map_err(|e| GateError::Internal(format!("http client: {e}")))?;
        Ok(Self {
            http,
            base_url: config.url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
            cache_ttl: config.cache_ttl,
            cache: RwLock::new(None),
        })
    }

    /// Refresh the snapshot unconditionally. Also used by the optional
    /// background refresh task.
    pub async fn refresh(&self) -> GateResult<usize> {
        let users = self.fetch_all().await?;
        let count = users.len();
        let mut cache = self.cache.write().await;
        *cache = Some(CacheState {
            snapshot: users,
            expires_at: Instant::now() + self.cache_ttl,
        });
        tracing::debug!(users = count, "Allowlist snapshot refreshed");
        Ok(count)
    }

    /// Current snapshot, refreshing first when expired. `None` when the
    /// refresh failed and no fresh snapshot exists.
    async fn snapshot(&self) -> Option<Vec<DirectoryUser>> {
        {
            let cache = self.cache.read().await;
            if let Some(state) = cache.as_ref() {
                if state.expires_at > Instant::now() {
                    return Some(state.snapshot.clone());
                }
            }
        }
        match self.refresh().await {
            Ok(_) => {
                let cache = self.cache.read().await;
                cache.as_ref().map(|state| state.snapshot.clone())
            }
            Err(e) => {
                tracing::warn!(error = %e, "Allowlist refresh failed");
                None
            }
        }
    }

    async fn fetch_all(&self) -> GateResult<Vec<DirectoryUser>> {
        let response = self
            .request(reqwest::Method::GET, &format!("{}/", self.base_url))
            .send()
            .await
            .map_err(|e| GateError::upstream("warden", e.to_string()))?;
        if !response.status().is_success() {
            return Err(GateError::upstream(
                "warden",
                format!("list returned {}", response.status()),
            ));
        }
        let users: Vec<DirectoryUser> = response
            .json()
            .await
            .map_err(|e| GateError::upstream("warden", e.to_string()))?;
        Ok(users.into_iter().map(DirectoryUser::normalized).collect())
    }

    /// Single-user lookup, bypassing the cache. Fallback path when the
    /// snapshot is unavailable.
    async fn fetch_one(&self, field: &str, value: &str) -> GateResult<Option<DirectoryUser>> {
        let response = self
            .request(reqwest::Method::GET, &format!("{}/user", self.base_url))
            .query(&[(field, value)])
            .send()
            .await
            .map_err(|e| GateError::upstream("warden", e.to_string()))?;
        match response.status() {
            reqwest::StatusCode::OK => {
                let user: DirectoryUser = response
                    .json()
                    .await
                    .map_err(|e| GateError::upstream("warden", e.to_string()))?;
                Ok(Some(user.normalized()))
            }
            reqwest::StatusCode::NOT_FOUND => Ok(None),
            status => Err(GateError::upstream(
                "warden",
                format!("lookup returned {status}"),
            )),
        }
    }

    fn request(&self, method: reqwest::Method, url: &str) -> reqwest::RequestBuilder {
        let mut builder = self.http.request(method, url);
        if let Some(key) = &self.api_key {
            builder = builder
                .header("X-API-Key", key)
                .header("Authorization", format!("Bearer {key}"));
        }
        builder
    }
}

impl Directory for WardenClient {
    async fn get_user(
        &self,
        user_id: &str,
        phone: &str,
        mail: &str,
    ) -> GateResult<Option<DirectoryUser>> {
        let (field, value) = if !user_id.is_empty() {
            ("user_id", user_id)
        } else if !phone.is_empty() {
            ("phone", phone)
        } else if !mail.is_empty() {
            ("mail", mail)
        } else {
            return Ok(None);
        };

        if let Some(snapshot) = self.snapshot().await {
            return Ok(snapshot
                .iter()
                .find(|u| u.is_active() && u.matches_identifier(value))
                .cloned());
        }

        // Snapshot unavailable; one direct lookup before giving up.
        let user = self.fetch_one(field, value).await?;
        Ok(user.filter(DirectoryUser::is_active))
    }

    async fn check_in_list(&self, phone: &str, mail: &str) -> bool {
        match self.get_user("", phone, mail).await {
            Ok(user) => user.is_some(),
            Err(e) => {
                tracing::warn!(error = %e, "Allowlist membership check failed");
                false
            }
        }
    }
}
