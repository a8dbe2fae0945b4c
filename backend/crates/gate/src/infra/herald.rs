//! Herald Credential-Broker Client
//!
//! Issues and verifies one-time codes over SMS and email. Requests are
//! authenticated with an API key, an HMAC-SHA-256 signature over
//! `"<unix-ts>:<service>:<body>"`, or both when both are configured.
//! The broker owns attempt limits and code expiry; this client only
//! relays its verdicts.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::application::config::{HeraldConfig, SERVICE_NAME};
use crate::domain::upstream::{
    ChallengeCreated, ChallengeRequest, ChallengeVerification, CodeBroker,
};
use crate::error::{GateError, GateResult};

const HTTP_TIMEOUT: Duration = Duration::from_secs(10);

/// Broker-side failure, keyed by HTTP status. Transport failures use
/// status 0 with the reason `connection_failed`.
#[derive(Debug, thiserror::Error)]
#[error("herald returned {status_code}: {reason}")]
pub struct HeraldError {
    pub status_code: u16,
    pub reason: String,
}

impl HeraldError {
    pub fn connection_failed() -> Self {
        Self {
            status_code: 0,
            reason: "connection_failed".to_string(),
        }
    }
}

impl From<HeraldError> for GateError {
    fn from(e: HeraldError) -> Self {
        match e.status_code {
            429 => GateError::RateLimited(e.reason),
            _ => GateError::upstream("herald", e.reason),
        }
    }
}

#[derive(Serialize)]
struct CreateChallengeBody<'a> {
    user_id: &'a str,
    channel: &'a str,
    destination: &'a str,
    purpose: &'a str,
    locale: &'a str,
    client_ip: &'a str,
    user_agent: &'a str,
}

#[derive(Serialize)]
struct VerifyBody<'a> {
    challenge_id: &'a str,
    code: &'a str,
    client_ip: &'a str,
}

#[derive(Deserialize)]
struct CreateChallengeResponse {
    challenge_id: String,
    #[serde(default)]
    expires_in: u64,
    #[serde(default)]
    next_resend_in: u64,
}

#[derive(Deserialize)]
struct VerifyResponse {
    #[serde(default)]
    ok: bool,
    #[serde(default)]
    user_id: String,
    #[serde(default)]
    amr: Vec<String>,
    #[serde(default)]
    issued_at: Option<String>,
    #[serde(default)]
    reason: Option<String>,
}

#[derive(Deserialize, Default)]
struct ErrorBody {
    #[serde(default)]
    reason: String,
}

pub struct HeraldClient {
    http: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
    hmac_secret: Option<String>,
}

impl HeraldClient {
    pub fn new(config: &HeraldConfig) -> GateResult<Self> {
        let http = reqwest::Client::builder()
            .timeout(HTTP_TIMEOUT)
            .build()
            .map_err(|e| GateError::Internal(format!("http client: {e}")))?;
        Ok(Self {
            http,
            base_url: config.url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
            hmac_secret: config.hmac_secret.clone(),
        })
    }

    async fn post(
        &self,
        path: &str,
        body: Vec<u8>,
        idempotency_key: Option<&str>,
    ) -> Result<reqwest::Response, HeraldError> {
        let mut builder = self
            .http
            .post(format!("{}{}", self.base_url, path))
            .header("Content-Type", "application/json");

        if let Some(key) = &self.api_key {
            builder = builder.header("X-API-Key", key);
        }
        if let Some(secret) = &self.hmac_secret {
            let timestamp = chrono::Utc::now().timestamp();
            let signature =
                platform::crypto::sign_request(secret.as_bytes(), timestamp, SERVICE_NAME, &body);
            builder = builder
                .header("X-Timestamp", timestamp.to_string())
                .header("X-Service", SERVICE_NAME)
                .header("X-Signature", signature);
        }
        if let Some(key) = idempotency_key {
            builder = builder.header("Idempotency-Key", key);
        }

        builder.body(body).send().await.map_err(|e| {
            tracing::debug!(error = %e, "Herald request failed");
            HeraldError::connection_failed()
        })
    }

    async fn fail(response: reqwest::Response) -> HeraldError {
        let status_code = response.status().as_u16();
        let body: ErrorBody = response.json().await.unwrap_or_default();
        let reason = if body.reason.is_empty() {
            format!("status {status_code}")
        } else {
            body.reason
        };
        HeraldError {
            status_code,
            reason,
        }
    }
}

impl CodeBroker for HeraldClient {
    async fn create_challenge(&self, request: &ChallengeRequest) -> GateResult<ChallengeCreated> {
        let body = serde_json::to_vec(&CreateChallengeBody {
            user_id: &request.user_id,
            channel: request.channel.as_str(),
            destination: &request.destination,
            purpose: &request.purpose,
            locale: &request.locale,
            client_ip: &request.client_ip,
            user_agent: &request.user_agent,
        })?;

        let response = self
            .post("/v1/otp/challenges", body, request.idempotency_key.as_deref())
            .await
            .map_err(GateError::from)?;

        if !response.status().is_success() {
            return Err(Self::fail(response).await.into());
        }

        let parsed: CreateChallengeResponse = response
            .json()
            .await
            .map_err(|e| GateError::upstream("herald", e.to_string()))?;
        Ok(ChallengeCreated {
            challenge_id: parsed.challenge_id,
            expires_in: parsed.expires_in,
            next_resend_in: parsed.next_resend_in,
        })
    }

    async fn verify_challenge(
        &self,
        challenge_id: &str,
        code: &str,
        client_ip: &str,
        idempotency_key: Option<&str>,
    ) -> GateResult<ChallengeVerification> {
        let body = serde_json::to_vec(&VerifyBody {
            challenge_id,
            code,
            client_ip,
        })?;

        let response = self
            .post("/v1/otp/verifications", body, idempotency_key)
            .await
            .map_err(GateError::from)?;

        if !response.status().is_success() {
            return Err(Self::fail(response).await.into());
        }

        let parsed: VerifyResponse = response
            .json()
            .await
            .map_err(|e| GateError::upstream("herald", e.to_string()))?;
        Ok(ChallengeVerification {
            ok: parsed.ok,
            user_id: parsed.user_id,
            amr: parsed.amr,
            issued_at: parsed.issued_at,
            reason: parsed.reason,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_herald_error_mapping() {
        let rate_limited: GateError = HeraldError {
            status_code: 429,
            reason: "rate_limited".to_string(),
        }
        .into();
        assert!(matches!(rate_limited, GateError::RateLimited(_)));

        let transport: GateError = HeraldError::connection_failed().into();
        assert!(matches!(transport, GateError::Upstream { .. }));
        assert!(transport.to_string().contains("connection_failed"));
    }
}
