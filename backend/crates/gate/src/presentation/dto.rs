//! Form and Response DTOs
//!
//! Forms arrive urlencoded from the server-rendered pages; responses
//! are JSON for API callers. Field names are part of the wire contract.

use serde::{Deserialize, Serialize};

/// `POST /_login` form.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LoginForm {
    #[serde(default)]
    pub auth_method: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub mail: String,
    #[serde(default)]
    pub challenge_id: String,
    #[serde(default)]
    pub verify_code: String,
    /// Post-login redirect host from the form or the login link.
    #[serde(default)]
    pub callback: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct LoginResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
}

/// `POST /_send_verify_code` form.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SendCodeForm {
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub mail: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct SendCodeResponse {
    pub success: bool,
    pub challenge_id: String,
    pub expires_in: u64,
    pub next_resend_in: u64,
}

/// `POST /_step_up` form.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct StepUpForm {
    #[serde(default)]
    pub code: String,
    #[serde(default)]
    pub callback: String,
}

/// `GET /_login`, `/_step_up`, `/_oidc/login` query.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CallbackQuery {
    #[serde(default)]
    pub callback: String,
}

/// `GET /_session_exchange` query.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ExchangeQuery {
    #[serde(default)]
    pub id: String,
}

/// `GET /_oidc/callback` query.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct OidcCallbackQuery {
    #[serde(default)]
    pub code: String,
    #[serde(default)]
    pub state: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct EnrollStartResponse {
    pub enroll_id: String,
    pub otpauth_uri: String,
}

/// `POST /totp/enroll/confirm` form.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct EnrollConfirmForm {
    #[serde(default)]
    pub enroll_id: String,
    #[serde(default)]
    pub code: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct EnrollConfirmResponse {
    pub ok: bool,
    pub subject: String,
    pub totp_enabled: bool,
    /// Shown exactly once; the service does not return them again.
    pub backup_codes: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct OkResponse {
    pub success: bool,
}
