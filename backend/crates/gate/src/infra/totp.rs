//! TOTP Service Client
//!
//! Remote authenticator-app service holding the per-subject secrets.
//! Shares the Herald authentication scheme: API key, HMAC triple, or
//! both.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::application::config::{TotpConfig, SERVICE_NAME};
use crate::domain::upstream::{
    TotpEnrollConfirmed, TotpEnrollStarted, TotpService, TotpStatus, TotpVerification,
};
use crate::error::{GateError, GateResult};

const HTTP_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Serialize)]
struct EnrollStartBody<'a> {
    subject: &'a str,
    label: &'a str,
}

#[derive(Serialize)]
struct EnrollConfirmBody<'a> {
    enroll_id: &'a str,
    code: &'a str,
}

#[derive(Serialize)]
struct VerifyBody<'a> {
    subject: &'a str,
    code: &'a str,
}

#[derive(Serialize)]
struct RevokeBody<'a> {
    subject: &'a str,
}

#[derive(Deserialize)]
struct StatusResponse {
    #[serde(default)]
    subject: String,
    #[serde(default)]
    totp_enabled: bool,
}

#[derive(Deserialize)]
struct EnrollStartResponse {
    enroll_id: String,
    otpauth_uri: String,
}

#[derive(Deserialize)]
struct EnrollConfirmResponse {
    #[serde(default)]
    ok: bool,
    #[serde(default)]
    subject: String,
    #[serde(default)]
    totp_enabled: bool,
    #[serde(default)]
    backup_codes: Vec<String>,
}

#[derive(Deserialize)]
struct VerifyResponse {
    #[serde(default)]
    ok: bool,
    #[serde(default)]
    reason: Option<String>,
}

pub struct TotpClient {
    http: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
    hmac_secret: Option<String>,
}

impl TotpClient {
    pub fn new(config: &TotpConfig) -> GateResult<Self> {
        let http = reqwest::Client::builder()
            .timeout(HTTP_TIMEOUT)
            .build()
            .map_err(|e| GateError::Internal(format!("http client: {e}")))?;
        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
            hmac_secret: config.hmac_secret.clone(),
        })
    }

    fn auth_headers(&self, builder: reqwest::RequestBuilder, body: &[u8]) -> reqwest::RequestBuilder {
        let mut builder = builder;
        if let Some(key) = &self.api_key {
            builder = builder.header("X-API-Key", key);
        }
        if let Some(secret) = &self.hmac_secret {
            let timestamp = chrono::Utc::now().timestamp();
            let signature =
                platform::crypto::sign_request(secret.as_bytes(), timestamp, SERVICE_NAME, body);
            builder = builder
                .header("X-Timestamp", timestamp.to_string())
                .header("X-Service", SERVICE_NAME)
                .header("X-Signature", signature);
        }
        builder
    }

    async fn post<T: serde::de::DeserializeOwned>(
        &self,
        path: &str,
        body: Vec<u8>,
    ) -> GateResult<T> {
        let builder = self
            .http
            .post(format!("{}{}", self.base_url, path))
            .header("Content-Type", "application/json");
        let response = self
            .auth_headers(builder, &body)
            .body(body)
            .send()
            .await
            .map_err(|_| GateError::upstream("totp", "connection_failed"))?;
        if !response.status().is_success() {
            return Err(GateError::upstream(
                "totp",
                format!("status {}", response.status().as_u16()),
            ));
        }
        response
            .json()
            .await
            .map_err(|e| GateError::upstream("totp", e.to_string()))
    }
}

impl TotpService for TotpClient {
    async fn status(&self, subject: &str) -> GateResult<TotpStatus> {
        let builder = self
            .http
            .get(format!("{}/v1/status", self.base_url))
            .query(&[("subject", subject)]);
        let response = self
            .auth_headers(builder, b"")
            .send()
            .await
            .map_err(|_| GateError::upstream("totp", "connection_failed"))?;
        if !response.status().is_success() {
            return Err(GateError::upstream(
                "totp",
                format!("status {}", response.status().as_u16()),
            ));
        }
        let parsed: StatusResponse = response
            .json()
            .await
            .map_err(|e| GateError::upstream("totp", e.to_string()))?;
        Ok(TotpStatus {
            subject: parsed.subject,
            totp_enabled: parsed.totp_enabled,
        })
    }

    async fn enroll_start(&self, subject: &str, label: &str) -> GateResult<TotpEnrollStarted> {
        let body = serde_json::to_vec(&EnrollStartBody { subject, label })?;
        let parsed: EnrollStartResponse = self.post("/v1/enroll/start", body).await?;
        Ok(TotpEnrollStarted {
            enroll_id: parsed.enroll_id,
            otpauth_uri: parsed.otpauth_uri,
        })
    }

    async fn enroll_confirm(
        &self,
        enroll_id: &str,
        code: &str,
    ) -> GateResult<TotpEnrollConfirmed> {
        let body = serde_json::to_vec(&EnrollConfirmBody { enroll_id, code })?;
        let parsed: EnrollConfirmResponse = self.post("/v1/enroll/confirm", body).await?;
        Ok(TotpEnrollConfirmed {
            ok: parsed.ok,
            subject: parsed.subject,
            totp_enabled: parsed.totp_enabled,
            backup_codes: parsed.backup_codes,
        })
    }

    async fn verify(&self, subject: &str, code: &str) -> GateResult<TotpVerification> {
        let body = serde_json::to_vec(&VerifyBody { subject, code })?;
        let parsed: VerifyResponse = self.post("/v1/verify", body).await?;
        Ok(TotpVerification {
            ok: parsed.ok,
            reason: parsed.reason,
        })
    }

    async fn revoke(&self, subject: &str) -> GateResult<()> {
        let body = serde_json::to_vec(&RevokeBody { subject })?;
        let _: serde_json::Value = self.post("/v1/revoke", body).await?;
        Ok(())
    }
}
