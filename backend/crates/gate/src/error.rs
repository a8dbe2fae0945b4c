//! Gate Error Types
//!
//! Gateway-specific error variants that integrate with the unified
//! `kernel::error::AppError` system.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use kernel::error::{app_error::AppError, kind::ErrorKind};
use thiserror::Error;

/// Gate-specific result type alias
pub type GateResult<T> = Result<T, GateError>;

/// Gate-specific error variants
#[derive(Debug, Error)]
pub enum GateError {
    /// Wrong password, wrong OTP code, wrong TOTP code, state mismatch
    #[error("Authentication denied: {0}")]
    AuthDenied(String),

    /// Authenticated session blocked by the step-up policy
    #[error("Step-up verification required")]
    StepUpRequired,

    /// Session store unreachable or corrupt; fails closed on `/_auth`
    #[error("Session store failure: {0}")]
    SessionStore(String),

    /// Broker / directory / TOTP / OIDC provider unreachable
    #[error("{service} unavailable: {reason}")]
    Upstream { service: &'static str, reason: String },

    /// Broker rate limit, propagated unchanged
    #[error("Rate limited: {0}")]
    RateLimited(String),

    /// Missing required fields, malformed cookies, missing exchange id
    #[error("Bad request: {0}")]
    BadInput(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl GateError {
    pub fn upstream(service: &'static str, reason: impl Into<String>) -> Self {
        GateError::Upstream {
            service,
            reason: reason.into(),
        }
    }

    pub fn denied(reason: impl Into<String>) -> Self {
        GateError::AuthDenied(reason.into())
    }

    /// Get the HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            GateError::AuthDenied(_) => StatusCode::UNAUTHORIZED,
            GateError::StepUpRequired => StatusCode::FORBIDDEN,
            GateError::SessionStore(_) | GateError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            GateError::Upstream { .. } => StatusCode::SERVICE_UNAVAILABLE,
            GateError::RateLimited(_) => StatusCode::TOO_MANY_REQUESTS,
            GateError::BadInput(_) => StatusCode::BAD_REQUEST,
        }
    }

    /// Get the ErrorKind for this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            GateError::AuthDenied(_) => ErrorKind::Unauthorized,
            GateError::StepUpRequired => ErrorKind::Forbidden,
            GateError::SessionStore(_) | GateError::Internal(_) => ErrorKind::InternalServerError,
            GateError::Upstream { .. } => ErrorKind::ServiceUnavailable,
            GateError::RateLimited(_) => ErrorKind::TooManyRequests,
            GateError::BadInput(_) => ErrorKind::BadRequest,
        }
    }

    /// Convert to AppError
    pub fn to_app_error(&self) -> AppError {
        AppError::new(self.kind(), self.to_string())
    }

    /// Log the error with appropriate level
    pub fn log(&self) {
        match self {
            GateError::SessionStore(msg) => {
                tracing::error!(message = %msg, "Session store error");
            }
            GateError::Internal(msg) => {
                tracing::error!(message = %msg, "Gateway internal error");
            }
            GateError::Upstream { service, reason } => {
                tracing::warn!(service = %service, reason = %reason, "Upstream unavailable");
            }
            GateError::AuthDenied(reason) => {
                tracing::warn!(reason = %reason, "Authentication denied");
            }
            _ => {
                tracing::debug!(error = %self, "Gateway error");
            }
        }
    }
}

impl IntoResponse for GateError {
    fn into_response(self) -> Response {
        self.log();
        self.to_app_error().into_response()
    }
}

impl From<AppError> for GateError {
    fn from(err: AppError) -> Self {
        GateError::Internal(err.to_string())
    }
}

impl From<serde_json::Error> for GateError {
    fn from(err: serde_json::Error) -> Self {
        GateError::SessionStore(format!("session blob codec: {err}"))
    }
}
