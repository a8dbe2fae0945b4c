//! HTTP Handlers
//!
//! Thin adapters between the wire and the use cases: header parsing,
//! cookie handling, content negotiation and redirect assembly. All
//! identity decisions live in the application layer.

use axum::extract::{Query, State};
use axum::http::{header, HeaderMap, HeaderName, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::{Form, Json};

use platform::client::extract_client_ip;
use platform::cookie::extract_cookie;

use crate::application::config::{CALLBACK_COOKIE, SESSION_COOKIE};
use crate::application::{
    validate_callback, validate_exchange_id, AuthorizeInput, AuthorizeUseCase, AuthorizeVerdict,
    LoginInput, LoginUseCase, LogoutUseCase, OidcCallbackUseCase, OidcLoginUseCase, SendCodeInput,
    SendCodeUseCase, StepUpUseCase, TotpEnrollUseCase,
};
use crate::domain::store::SessionStore;
use crate::error::GateError;
use crate::i18n::{catalog, Catalog, Lang};
use crate::presentation::dto::{
    CallbackQuery, EnrollConfirmForm, EnrollConfirmResponse, EnrollStartResponse, ExchangeQuery,
    LoginForm, LoginResponse, OidcCallbackQuery, OkResponse, SendCodeForm, SendCodeResponse,
    StepUpForm,
};
use crate::presentation::metrics::{AUTH_DECISIONS, CODE_SENDS, LOGIN_ATTEMPTS, UPSTREAM_ERRORS};
use crate::presentation::render;
use crate::presentation::state::GateState;

// ============================================================================
// Request parsing helpers
// ============================================================================

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|v| v.to_str().ok())
}

fn forwarded_proto(headers: &HeaderMap) -> String {
    header_str(headers, "X-Forwarded-Proto")
        .unwrap_or("http")
        .to_string()
}

fn forwarded_host(headers: &HeaderMap) -> String {
    header_str(headers, "X-Forwarded-Host")
        .or_else(|| header_str(headers, "Host"))
        .unwrap_or_default()
        .to_string()
}

fn is_secure(headers: &HeaderMap) -> bool {
    forwarded_proto(headers) == "https"
}

fn session_id(headers: &HeaderMap) -> Option<String> {
    extract_cookie(headers, SESSION_COOKIE)
}

fn request_lang<S>(state: &GateState<S>, headers: &HeaderMap) -> Lang
where
    S: SessionStore + Send + Sync + 'static,
{
    match header_str(headers, "Accept-Language") {
        Some(value) => Lang::from_accept_language(value, state.config.language),
        None => state.config.language,
    }
}

fn wants_html(headers: &HeaderMap) -> bool {
    render::wants_html(header_str(headers, "Accept"))
}

fn redirect(location: &str) -> Response {
    (StatusCode::FOUND, [(header::LOCATION, location.to_string())]).into_response()
}

fn append_cookie(response: &mut Response, cookie: String) {
    if let Ok(value) = HeaderValue::from_str(&cookie) {
        response.headers_mut().append(header::SET_COOKIE, value);
    }
}

/// Metric label for a submitted auth method. Unknown values collapse to
/// one bucket so the counter's cardinality stays bounded.
fn method_label(auth_method: &str) -> &'static str {
    match auth_method {
        "" | "password" => "password",
        "warden" => "warden",
        _ => "other",
    }
}

/// Translated user-facing message for an error. Original detail is
/// logged, never sent to the client.
fn user_message(err: &GateError, phrases: &Catalog, suggest_totp: bool) -> String {
    match err {
        GateError::AuthDenied(_) => phrases.invalid_credentials.to_string(),
        GateError::StepUpRequired => phrases.step_up_required.to_string(),
        GateError::RateLimited(reason) => {
            // The broker's taxonomy code stays visible to API callers.
            if reason.is_empty() {
                phrases.rate_limited.to_string()
            } else {
                format!("{} ({reason})", phrases.rate_limited)
            }
        }
        GateError::BadInput(_) => phrases.invalid_request.to_string(),
        GateError::Upstream { .. } => {
            if suggest_totp {
                format!("{} {}", phrases.broker_unavailable, phrases.totp_fallback_hint)
            } else {
                phrases.broker_unavailable.to_string()
            }
        }
        GateError::SessionStore(_) | GateError::Internal(_) => phrases.internal_error.to_string(),
    }
}

/// Content-negotiated error response.
fn error_response<S>(state: &GateState<S>, headers: &HeaderMap, err: &GateError) -> Response
where
    S: SessionStore + Send + Sync + 'static,
{
    err.log();
    if let GateError::Upstream { service, .. } = err {
        UPSTREAM_ERRORS.with_label_values(&[service]).inc();
    }
    let phrases = catalog(request_lang(state, headers));
    let suggest_totp = state.totp.is_some();
    let message = user_message(err, phrases, suggest_totp);
    let status = err.status_code();
    if wants_html(headers) {
        render::error_page(status, &message)
    } else {
        render::render_error(status, &message, render::error_format(header_str(headers, "Accept")))
    }
}

/// Exchange-based redirect to the callback host, or `/` on the same
/// host when no callback survived validation.
fn post_login_location(proto: &str, callback: &str, session_id: &str) -> String {
    if callback.is_empty() {
        "/".to_string()
    } else {
        format!("{proto}://{callback}/_session_exchange?id={session_id}")
    }
}

// ============================================================================
// Liveness and smoke
// ============================================================================

/// GET /health
pub async fn health() -> &'static str {
    "OK"
}

/// GET / - smoke endpoint reporting the caller's session state.
pub async fn root<S>(State(state): State<GateState<S>>, headers: HeaderMap) -> Response
where
    S: SessionStore + Send + Sync + 'static,
{
    let session = match session_id(&headers) {
        Some(id) => match state.store.load(&id).await {
            Ok(session) => session,
            Err(e) => return error_response(&state, &headers, &e),
        },
        None => None,
    };
    let body = if session.is_some_and(|s| s.authenticated) {
        "Authenticated"
    } else {
        "Not authenticated"
    };
    (StatusCode::OK, body).into_response()
}

// ============================================================================
// Decision endpoint
// ============================================================================

/// GET /_auth - the proxy subrequest endpoint.
pub async fn authorize<S>(State(state): State<GateState<S>>, headers: HeaderMap) -> Response
where
    S: SessionStore + Send + Sync + 'static,
{
    let input = AuthorizeInput {
        forwarded_proto: forwarded_proto(&headers),
        forwarded_host: forwarded_host(&headers),
        forwarded_uri: header_str(&headers, "X-Forwarded-Uri").unwrap_or("/").to_string(),
        password_header: header_str(&headers, "Stargate-Password").map(str::to_string),
        phone_header: header_str(&headers, "X-User-Phone").map(str::to_string),
        mail_header: header_str(&headers, "X-User-Mail").map(str::to_string),
        session_id: session_id(&headers),
        wants_html: wants_html(&headers),
    };

    let use_case = AuthorizeUseCase::new(
        state.store.clone(),
        state.warden.clone(),
        state.passwords(),
        state.matcher.clone(),
        state.config.auth_host.clone(),
        state.config.user_header_name.clone(),
    );

    match use_case.execute(input).await {
        Ok(AuthorizeVerdict::Allow(pairs)) => {
            AUTH_DECISIONS.with_label_values(&["allow"]).inc();
            let mut response = StatusCode::OK.into_response();
            for (name, value) in &pairs {
                match (
                    HeaderName::from_bytes(name.as_bytes()),
                    HeaderValue::from_str(value),
                ) {
                    (Ok(name), Ok(value)) => {
                        response.headers_mut().insert(name, value);
                    }
                    _ => tracing::warn!(header = %name, "Dropping unencodable identity header"),
                }
            }
            response
        }
        Ok(AuthorizeVerdict::Redirect(location)) => {
            AUTH_DECISIONS.with_label_values(&["redirect"]).inc();
            redirect(&location)
        }
        Ok(AuthorizeVerdict::StepUpRedirect(location)) => {
            AUTH_DECISIONS.with_label_values(&["step_up"]).inc();
            redirect(&location)
        }
        Ok(AuthorizeVerdict::Deny) => {
            AUTH_DECISIONS.with_label_values(&["deny"]).inc();
            error_response(&state, &headers, &GateError::denied("unauthenticated"))
        }
        Ok(AuthorizeVerdict::StepUpBlocked) => {
            AUTH_DECISIONS.with_label_values(&["step_up"]).inc();
            error_response(&state, &headers, &GateError::StepUpRequired)
        }
        Err(e) => {
            AUTH_DECISIONS.with_label_values(&["error"]).inc();
            error_response(&state, &headers, &e)
        }
    }
}

// ============================================================================
// Login
// ============================================================================

/// GET /_login - login form, or a redirect when already signed in.
pub async fn login_page<S>(
    State(state): State<GateState<S>>,
    headers: HeaderMap,
    Query(query): Query<CallbackQuery>,
) -> Response
where
    S: SessionStore + Send + Sync + 'static,
{
    let callback = validate_callback(
        &query.callback,
        state.config.cookie_domain.as_deref(),
        &state.config.auth_host,
    );

    if let Some(id) = session_id(&headers) {
        match state.store.load(&id).await {
            Ok(Some(session)) if session.authenticated => {
                return redirect(&post_login_location(
                    &forwarded_proto(&headers),
                    callback,
                    &session.id,
                ));
            }
            Ok(_) => {}
            Err(e) => return error_response(&state, &headers, &e),
        }
    }

    let mut response = render::login_page(
        request_lang(&state, &headers),
        callback,
        state.warden.is_some() && state.herald.is_some(),
        state.oidc.is_some(),
    );
    if !callback.is_empty() {
        let cookie = state.callback_cookie(is_secure(&headers));
        append_cookie(&mut response, cookie.build_set_cookie(callback));
    }
    response
}

/// POST /_login
pub async fn login<S>(
    State(state): State<GateState<S>>,
    headers: HeaderMap,
    Form(form): Form<LoginForm>,
) -> Response
where
    S: SessionStore + Send + Sync + 'static,
{
    let method = method_label(&form.auth_method);

    // Callback from the form, falling back to the transient cookie.
    let raw_callback = if form.callback.is_empty() {
        extract_cookie(&headers, CALLBACK_COOKIE).unwrap_or_default()
    } else {
        form.callback.clone()
    };
    let callback = validate_callback(
        &raw_callback,
        state.config.cookie_domain.as_deref(),
        &state.config.auth_host,
    )
    .to_string();

    let use_case = LoginUseCase::new(
        state.store.clone(),
        state.warden.clone(),
        state.herald.clone(),
        state.passwords(),
        state.audit.clone(),
    );
    let input = LoginInput {
        auth_method: form.auth_method,
        password: form.password,
        phone: form.phone,
        mail: form.mail,
        challenge_id: form.challenge_id,
        verify_code: form.verify_code,
        session_id: session_id(&headers),
        client_ip: extract_client_ip(&headers, None),
        user_agent: platform::client::extract_user_agent(&headers).unwrap_or_default(),
        idempotency_key: header_str(&headers, "Idempotency-Key").map(str::to_string),
    };

    match use_case.execute(input).await {
        Ok(output) => {
            LOGIN_ATTEMPTS.with_label_values(&[method, "success"]).inc();
            let secure = is_secure(&headers);
            let mut response = if wants_html(&headers) {
                redirect(&post_login_location(
                    &forwarded_proto(&headers),
                    &callback,
                    &output.session.id,
                ))
            } else {
                Json(LoginResponse {
                    success: true,
                    user_id: (!output.session.user_id.is_empty())
                        .then(|| output.session.user_id.clone()),
                })
                .into_response()
            };
            append_cookie(
                &mut response,
                state.session_cookie(secure).build_set_cookie(&output.session.id),
            );
            // Successful login consumes the callback cookie.
            append_cookie(
                &mut response,
                state.callback_cookie(secure).build_delete_cookie(),
            );
            response
        }
        Err(e) => {
            LOGIN_ATTEMPTS.with_label_values(&[method, "failure"]).inc();
            error_response(&state, &headers, &e)
        }
    }
}

/// POST /_send_verify_code
pub async fn send_verify_code<S>(
    State(state): State<GateState<S>>,
    headers: HeaderMap,
    Form(form): Form<SendCodeForm>,
) -> Response
where
    S: SessionStore + Send + Sync + 'static,
{
    let use_case = SendCodeUseCase::new(
        state.warden.clone(),
        state.herald.clone(),
        state.audit.clone(),
        state.config.language,
    );
    let channel = if form.phone.is_empty() { "email" } else { "sms" };
    let input = SendCodeInput {
        phone: form.phone,
        mail: form.mail,
        accept_language: header_str(&headers, "Accept-Language").map(str::to_string),
        idempotency_key: header_str(&headers, "Idempotency-Key").map(str::to_string),
        client_ip: extract_client_ip(&headers, None),
        user_agent: platform::client::extract_user_agent(&headers).unwrap_or_default(),
    };

    match use_case.execute(input).await {
        Ok(output) => {
            CODE_SENDS.with_label_values(&[channel, "success"]).inc();
            Json(SendCodeResponse {
                success: true,
                challenge_id: output.challenge_id,
                expires_in: output.expires_in,
                next_resend_in: output.next_resend_in,
            })
            .into_response()
        }
        Err(e) => {
            CODE_SENDS.with_label_values(&[channel, "failure"]).inc();
            error_response(&state, &headers, &e)
        }
    }
}

/// GET /_logout
pub async fn logout<S>(State(state): State<GateState<S>>, headers: HeaderMap) -> Response
where
    S: SessionStore + Send + Sync + 'static,
{
    let use_case = LogoutUseCase::new(state.store.clone(), state.audit.clone());
    let id = session_id(&headers);
    if let Err(e) = use_case
        .execute(id.as_deref(), extract_client_ip(&headers, None))
        .await
    {
        return error_response(&state, &headers, &e);
    }

    let phrases = catalog(request_lang(&state, &headers));
    let mut response = (StatusCode::OK, phrases.logged_out.to_string()).into_response();
    append_cookie(
        &mut response,
        state.session_cookie(is_secure(&headers)).build_delete_cookie(),
    );
    response
}

// ============================================================================
// Cross-domain session exchange
// ============================================================================

/// GET /_session_exchange?id=<sid> - set the cookie on this host.
pub async fn session_exchange<S>(
    State(state): State<GateState<S>>,
    headers: HeaderMap,
    Query(query): Query<ExchangeQuery>,
) -> Response
where
    S: SessionStore + Send + Sync + 'static,
{
    let id = match validate_exchange_id(&query.id) {
        Ok(id) => id,
        Err(e) => return error_response(&state, &headers, &e),
    };

    let mut response = redirect("/");
    append_cookie(
        &mut response,
        state.session_cookie(is_secure(&headers)).build_set_cookie(id),
    );
    response
}

// ============================================================================
// OIDC
// ============================================================================

/// GET /_oidc/login
pub async fn oidc_login<S>(
    State(state): State<GateState<S>>,
    headers: HeaderMap,
    Query(query): Query<CallbackQuery>,
) -> Response
where
    S: SessionStore + Send + Sync + 'static,
{
    let Some(provider) = state.oidc.clone() else {
        return error_response(
            &state,
            &headers,
            &GateError::Internal("no OIDC provider configured".to_string()),
        );
    };

    let callback = validate_callback(
        &query.callback,
        state.config.cookie_domain.as_deref(),
        &state.config.auth_host,
    );

    let use_case = OidcLoginUseCase::new(state.store.clone(), provider);
    match use_case.execute(session_id(&headers).as_deref(), callback).await {
        Ok(output) => {
            let mut response = redirect(&output.authorize_url);
            append_cookie(
                &mut response,
                state
                    .session_cookie(is_secure(&headers))
                    .build_set_cookie(&output.session.id),
            );
            response
        }
        Err(e) => error_response(&state, &headers, &e),
    }
}

/// GET /_oidc/callback
pub async fn oidc_callback<S>(
    State(state): State<GateState<S>>,
    headers: HeaderMap,
    Query(query): Query<OidcCallbackQuery>,
) -> Response
where
    S: SessionStore + Send + Sync + 'static,
{
    let Some(provider) = state.oidc.clone() else {
        return error_response(
            &state,
            &headers,
            &GateError::Internal("no OIDC provider configured".to_string()),
        );
    };

    let use_case = OidcCallbackUseCase::new(state.store.clone(), provider, state.audit.clone());
    let result = use_case
        .execute(
            session_id(&headers).as_deref(),
            &query.code,
            &query.state,
            extract_client_ip(&headers, None),
        )
        .await;

    match result {
        Ok(output) => {
            LOGIN_ATTEMPTS.with_label_values(&["oidc", "success"]).inc();
            let callback = validate_callback(
                &output.callback,
                state.config.cookie_domain.as_deref(),
                &state.config.auth_host,
            );
            let mut response = redirect(&post_login_location(
                &forwarded_proto(&headers),
                callback,
                &output.session.id,
            ));
            append_cookie(
                &mut response,
                state
                    .session_cookie(is_secure(&headers))
                    .build_set_cookie(&output.session.id),
            );
            response
        }
        Err(e) => {
            LOGIN_ATTEMPTS.with_label_values(&["oidc", "failure"]).inc();
            error_response(&state, &headers, &e)
        }
    }
}

// ============================================================================
// Step-up and TOTP
// ============================================================================

/// GET /_step_up - the TOTP prompt.
pub async fn step_up_page<S>(
    State(state): State<GateState<S>>,
    headers: HeaderMap,
    Query(query): Query<CallbackQuery>,
) -> Response
where
    S: SessionStore + Send + Sync + 'static,
{
    let callback = validate_callback(
        &query.callback,
        state.config.cookie_domain.as_deref(),
        &state.config.auth_host,
    );
    render::step_up_page(request_lang(&state, &headers), callback)
}

/// POST /_step_up
pub async fn step_up<S>(
    State(state): State<GateState<S>>,
    headers: HeaderMap,
    Form(form): Form<StepUpForm>,
) -> Response
where
    S: SessionStore + Send + Sync + 'static,
{
    let use_case = StepUpUseCase::new(state.store.clone(), state.totp.clone(), state.audit.clone());
    let result = use_case
        .execute(
            session_id(&headers).as_deref(),
            &form.code,
            extract_client_ip(&headers, None),
        )
        .await;

    match result {
        Ok(_) => {
            if wants_html(&headers) {
                let callback = validate_callback(
                    &form.callback,
                    state.config.cookie_domain.as_deref(),
                    &state.config.auth_host,
                );
                if callback.is_empty() {
                    redirect("/")
                } else {
                    redirect(&format!("{}://{}/", forwarded_proto(&headers), callback))
                }
            } else {
                Json(OkResponse { success: true }).into_response()
            }
        }
        Err(e) => error_response(&state, &headers, &e),
    }
}

/// GET /totp/enroll
pub async fn totp_enroll<S>(State(state): State<GateState<S>>, headers: HeaderMap) -> Response
where
    S: SessionStore + Send + Sync + 'static,
{
    let use_case = TotpEnrollUseCase::new(state.store.clone(), state.totp.clone());
    match use_case.start(session_id(&headers).as_deref()).await {
        Ok(started) => {
            if wants_html(&headers) {
                render::enroll_page(&started.enroll_id, &started.otpauth_uri)
            } else {
                Json(EnrollStartResponse {
                    enroll_id: started.enroll_id,
                    otpauth_uri: started.otpauth_uri,
                })
                .into_response()
            }
        }
        Err(e) => error_response(&state, &headers, &e),
    }
}

/// POST /totp/enroll/confirm
pub async fn totp_enroll_confirm<S>(
    State(state): State<GateState<S>>,
    headers: HeaderMap,
    Form(form): Form<EnrollConfirmForm>,
) -> Response
where
    S: SessionStore + Send + Sync + 'static,
{
    let use_case = TotpEnrollUseCase::new(state.store.clone(), state.totp.clone());
    match use_case
        .confirm(session_id(&headers).as_deref(), &form.enroll_id, &form.code)
        .await
    {
        Ok(confirmed) => Json(EnrollConfirmResponse {
            ok: confirmed.ok,
            subject: confirmed.subject,
            totp_enabled: confirmed.totp_enabled,
            backup_codes: confirmed.backup_codes,
        })
        .into_response(),
        Err(e) => error_response(&state, &headers, &e),
    }
}

/// GET/POST /totp/revoke
pub async fn totp_revoke<S>(State(state): State<GateState<S>>, headers: HeaderMap) -> Response
where
    S: SessionStore + Send + Sync + 'static,
{
    let use_case = TotpEnrollUseCase::new(state.store.clone(), state.totp.clone());
    match use_case.revoke(session_id(&headers).as_deref()).await {
        Ok(()) => Json(OkResponse { success: true }).into_response(),
        Err(e) => error_response(&state, &headers, &e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::i18n::{catalog, Lang};

    #[test]
    fn test_rate_limit_message_keeps_broker_reason() {
        let phrases = catalog(Lang::En);
        let err = GateError::RateLimited("rate_limited".to_string());
        let message = user_message(&err, phrases, false);
        assert!(message.starts_with(phrases.rate_limited));
        assert!(message.contains("rate_limited"));

        let bare = user_message(&GateError::RateLimited(String::new()), phrases, false);
        assert_eq!(bare, phrases.rate_limited);
    }

    #[test]
    fn test_upstream_message_appends_totp_hint() {
        let phrases = catalog(Lang::En);
        let err = GateError::upstream("herald", "connection_failed");
        assert_eq!(user_message(&err, phrases, false), phrases.broker_unavailable);
        let with_hint = user_message(&err, phrases, true);
        assert!(with_hint.contains(phrases.totp_fallback_hint));
    }

    #[test]
    fn test_method_label_bounds_cardinality() {
        assert_eq!(method_label(""), "password");
        assert_eq!(method_label("password"), "password");
        assert_eq!(method_label("warden"), "warden");
        assert_eq!(method_label("oidc'); DROP TABLE"), "other");
    }
}
