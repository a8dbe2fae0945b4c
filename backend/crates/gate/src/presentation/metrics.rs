//! Prometheus Metrics
//!
//! Lock-free counters on the default registry, exposed at `/metrics` in
//! text exposition format.

use axum::http::header;
use axum::response::{IntoResponse, Response};
use lazy_static::lazy_static;
use prometheus::{
    register_int_counter_vec, Encoder, IntCounterVec, TextEncoder,
};

lazy_static! {
    /// `/_auth` verdicts by outcome: allow, deny, redirect, step_up, error.
    pub static ref AUTH_DECISIONS: IntCounterVec = register_int_counter_vec!(
        "stargate_auth_decisions_total",
        "Forward-auth decisions by outcome",
        &["outcome"]
    )
    .expect("metric registration");

    /// Login attempts by method and result.
    pub static ref LOGIN_ATTEMPTS: IntCounterVec = register_int_counter_vec!(
        "stargate_login_attempts_total",
        "Login attempts by method and result",
        &["method", "result"]
    )
    .expect("metric registration");

    /// Verification code sends by channel and result.
    pub static ref CODE_SENDS: IntCounterVec = register_int_counter_vec!(
        "stargate_verify_code_sends_total",
        "Verification code sends by channel and result",
        &["channel", "result"]
    )
    .expect("metric registration");

    /// Upstream client errors by service.
    pub static ref UPSTREAM_ERRORS: IntCounterVec = register_int_counter_vec!(
        "stargate_upstream_errors_total",
        "Upstream service errors by service",
        &["service"]
    )
    .expect("metric registration");
}

pub async fn metrics_handler() -> Response {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();
    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        tracing::warn!(error = %e, "Failed to encode metrics");
    }
    (
        [(header::CONTENT_TYPE, encoder.format_type().to_string())],
        buffer,
    )
        .into_response()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_metrics_exposition() {
        AUTH_DECISIONS.with_label_values(&["allow"]).inc();
        let response = metrics_handler().await;
        assert_eq!(response.status(), axum::http::StatusCode::OK);
    }
}
