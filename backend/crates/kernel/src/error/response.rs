//! Axum response integration for [`AppError`].
//!
//! The gateway's own endpoints negotiate the error body by `Accept`; this
//! default JSON rendering is the fallback used by plain API surfaces.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;

use super::app_error::AppError;

#[derive(Serialize)]
struct ErrorBody<'a> {
    error: &'a str,
    code: u16,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        if self.is_server_error() {
            tracing::error!(kind = %self.kind(), message = %self.message(), "Request failed");
        } else {
            tracing::debug!(kind = %self.kind(), message = %self.message(), "Request rejected");
        }

        let status =
            StatusCode::from_u16(self.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        let body = ErrorBody {
            error: self.message(),
            code: self.status_code(),
        };

        (status, Json(&body)).into_response()
    }
}
