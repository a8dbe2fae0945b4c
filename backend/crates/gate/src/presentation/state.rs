//! Shared Handler State

use std::sync::Arc;

use platform::cookie::{CookieConfig, SameSite};
use platform::password::PasswordSet;

use crate::application::audit::AuditSink;
use crate::application::config::{GateConfig, CALLBACK_COOKIE, SESSION_COOKIE};
use crate::domain::policy::StepUpMatcher;
use crate::domain::store::SessionStore;
use crate::infra::{HeraldClient, OidcProvider, TotpClient, WardenClient};

/// Everything the handlers need, wired once at startup. Upstream
/// clients are optional slots; a disabled integration is simply absent.
pub struct GateState<S>
where
    S: SessionStore + Send + Sync + 'static,
{
    pub store: Arc<S>,
    pub warden: Option<Arc<WardenClient>>,
    pub herald: Option<Arc<HeraldClient>>,
    pub totp: Option<Arc<TotpClient>>,
    pub oidc: Option<Arc<OidcProvider>>,
    pub matcher: Arc<StepUpMatcher>,
    pub audit: AuditSink,
    pub config: Arc<GateConfig>,
}

impl<S> Clone for GateState<S>
where
    S: SessionStore + Send + Sync + 'static,
{
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            warden: self.warden.clone(),
            herald: self.herald.clone(),
            totp: self.totp.clone(),
            oidc: self.oidc.clone(),
            matcher: Arc::clone(&self.matcher),
            audit: self.audit.clone(),
            config: Arc::clone(&self.config),
        }
    }
}

impl<S> GateState<S>
where
    S: SessionStore + Send + Sync + 'static,
{
    /// Password set, or `None` when no passwords are configured.
    pub fn passwords(&self) -> Option<PasswordSet> {
        let set = &self.config.passwords;
        (!set.is_empty()).then(|| set.clone())
    }

    /// Session cookie attributes. `Secure` follows the forwarded scheme.
    pub fn session_cookie(&self, secure: bool) -> CookieConfig {
        CookieConfig {
            name: SESSION_COOKIE.to_string(),
            domain: self.config.cookie_domain.clone(),
            secure,
            http_only: true,
            same_site: SameSite::Lax,
            path: "/".to_string(),
            max_age_secs: Some(self.config.session_ttl_secs()),
        }
    }

    /// Transient callback cookie for HTML login flows; no Max-Age, so it
    /// dies with the browser session.
    pub fn callback_cookie(&self, secure: bool) -> CookieConfig {
        CookieConfig {
            name: CALLBACK_COOKIE.to_string(),
            domain: self.config.cookie_domain.clone(),
            secure,
            http_only: true,
            same_site: SameSite::Lax,
            path: "/".to_string(),
            max_age_secs: None,
        }
    }
}
