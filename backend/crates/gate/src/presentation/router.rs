//! Route table for the gateway.

use axum::routing::{get, post};
use axum::Router;

use crate::domain::store::SessionStore;
use crate::presentation::handlers;
use crate::presentation::metrics::metrics_handler;
use crate::presentation::state::GateState;

/// Build the full gateway router over any session store backend.
pub fn gate_router<S>(state: GateState<S>) -> Router
where
    S: SessionStore + Send + Sync + 'static,
{
    Router::new()
        .route("/", get(handlers::root::<S>))
        .route("/health", get(handlers::health))
        .route("/metrics", get(metrics_handler))
        .route("/_auth", get(handlers::authorize::<S>))
        .route(
            "/_login",
            get(handlers::login_page::<S>).post(handlers::login::<S>),
        )
        .route("/_send_verify_code", post(handlers::send_verify_code::<S>))
        .route("/_logout", get(handlers::logout::<S>))
        .route("/_session_exchange", get(handlers::session_exchange::<S>))
        .route("/_oidc/login", get(handlers::oidc_login::<S>))
        .route("/_oidc/callback", get(handlers::oidc_callback::<S>))
        .route(
            "/_step_up",
            get(handlers::step_up_page::<S>).post(handlers::step_up::<S>),
        )
        .route("/totp/enroll", get(handlers::totp_enroll::<S>))
        .route("/totp/enroll/confirm", post(handlers::totp_enroll_confirm::<S>))
        .route(
            "/totp/revoke",
            get(handlers::totp_revoke::<S>).post(handlers::totp_revoke::<S>),
        )
        .with_state(state)
}
