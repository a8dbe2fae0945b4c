//! OIDC Use Cases
//!
//! Authorization-code flow split in two: starting the flow stores a
//! single-use `state` on the session and hands back the provider's
//! authorize URL; the callback consumes the state atomically (cleared
//! before comparison, so a replayed callback never matches), exchanges
//! the code and authenticates the session.

use std::net::IpAddr;
use std::sync::Arc;

use platform::crypto::random_state;

use crate::application::audit::{AuditEvent, AuditResult, AuditSink, EventType};
use crate::domain::session::Session;
use crate::domain::store::SessionStore;
use crate::domain::upstream::IdentityProvider;
use crate::error::{GateError, GateResult};

/// Begin the flow: mint state, remember the callback, redirect out.
pub struct OidcLoginUseCase<S, P>
where
    S: SessionStore,
    P: IdentityProvider,
{
    store: Arc<S>,
    provider: Arc<P>,
}

/// Redirect target plus the session carrying the pending state.
#[derive(Debug, Clone)]
pub struct OidcLoginOutput {
    pub authorize_url: String,
    pub session: Session,
}

impl<S, P> OidcLoginUseCase<S, P>
where
    S: SessionStore + Sync,
    P: IdentityProvider + Sync,
{
    pub fn new(store: Arc<S>, provider: Arc<P>) -> Self {
        Self { store, provider }
    }

    pub async fn execute(
        &self,
        session_id: Option<&str>,
        callback: &str,
    ) -> GateResult<OidcLoginOutput> {
        let mut session = match session_id {
            Some(id) => self.store.load(id).await?.unwrap_or_else(Session::new),
            None => Session::new(),
        };

        let state = random_state();
        session.oauth_state = state.clone();
        session.oauth_callback = callback.to_string();
        self.store.save(&session).await?;

        Ok(OidcLoginOutput {
            authorize_url: self.provider.authorize_url(&state),
            session,
        })
    }
}

/// Complete the flow at `/_oidc/callback`.
pub struct OidcCallbackUseCase<S, P>
where
    S: SessionStore,
    P: IdentityProvider,
{
    store: Arc<S>,
    provider: Arc<P>,
    audit: AuditSink,
}

/// Authenticated session and the validated post-login callback host.
#[derive(Debug, Clone)]
pub struct OidcCallbackOutput {
    pub session: Session,
    pub callback: String,
}

impl<S, P> OidcCallbackUseCase<S, P>
where
    S: SessionStore + Sync,
    P: IdentityProvider + Sync,
{
    pub fn new(store: Arc<S>, provider: Arc<P>, audit: AuditSink) -> Self {
        Self {
            store,
            provider,
            audit,
        }
    }

    pub async fn execute(
        &self,
        session_id: Option<&str>,
        code: &str,
        state: &str,
        client_ip: Option<IpAddr>,
    ) -> GateResult<OidcCallbackOutput> {
        if code.is_empty() || state.is_empty() {
            return Err(GateError::BadInput("code and state are required".to_string()));
        }
        let Some(id) = session_id else {
            return Err(GateError::BadInput("no pending login".to_string()));
        };
        let Some(mut session) = self.store.load(id).await? else {
            return Err(GateError::BadInput("no pending login".to_string()));
        };

        // Consume the stored state before comparing. A second callback
        // with the same state finds nothing and fails.
        let stored = session.take_oauth_state();
        self.store.save(&session).await?;

        if stored.as_deref() != Some(state) {
            self.audit.emit(
                AuditEvent::new(EventType::LoginFailure, AuditResult::Failure, client_ip)
                    .method("oidc")
                    .reason("state mismatch"),
            );
            return Err(GateError::BadInput("state mismatch".to_string()));
        }

        let identity = match self.provider.exchange(code).await {
            Ok(identity) => identity,
            Err(e) => {
                self.audit.emit(
                    AuditEvent::new(EventType::LoginFailure, AuditResult::Failure, client_ip)
                        .method("oidc")
                        .reason(e.to_string()),
                );
                return Err(e);
            }
        };

        session.authenticate_oidc(&identity.subject, identity.email.as_deref(), self.provider.name());
        let callback = std::mem::take(&mut session.oauth_callback);
        self.store.save(&session).await?;

        self.audit.emit(
            AuditEvent::new(EventType::Login, AuditResult::Success, client_ip)
                .user(identity.subject.clone())
                .method("oidc"),
        );
        tracing::info!(
            session_id = %session.id,
            provider = self.provider.name(),
            "OIDC login succeeded"
        );

        Ok(OidcCallbackOutput { session, callback })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testkit::{FakeProvider, FakeStore};

    async fn started(store: &Arc<FakeStore>) -> OidcLoginOutput {
        let uc = OidcLoginUseCase::new(store.clone(), Arc::new(FakeProvider));
        uc.execute(None, "app.example.com").await.unwrap()
    }

    #[tokio::test]
    async fn test_login_stores_state_and_callback() {
        let store = Arc::new(FakeStore::default());
        let output = started(&store).await;

        assert!(output.authorize_url.contains(&output.session.oauth_state));
        let stored = store.load(&output.session.id).await.unwrap().unwrap();
        assert!(!stored.oauth_state.is_empty());
        assert_eq!(stored.oauth_callback, "app.example.com");
        assert!(!stored.authenticated);
    }

    #[tokio::test]
    async fn test_callback_authenticates() {
        let store = Arc::new(FakeStore::default());
        let login = started(&store).await;
        let state = login.session.oauth_state.clone();

        let uc = OidcCallbackUseCase::new(store.clone(), Arc::new(FakeProvider), AuditSink::disabled());
        let output = uc
            .execute(Some(&login.session.id), "good", &state, None)
            .await
            .unwrap();

        assert!(output.session.authenticated);
        assert_eq!(output.session.user_id, "oidc-sub-1");
        assert_eq!(output.session.user_mail, "oidc@x.test");
        assert_eq!(output.session.provider, "fakeidp");
        assert_eq!(output.callback, "app.example.com");
        // Stored session is authenticated with the state cleared.
        let stored = store.load(&login.session.id).await.unwrap().unwrap();
        assert!(stored.authenticated);
        assert!(stored.oauth_state.is_empty());
    }

    #[tokio::test]
    async fn test_state_is_single_use() {
        let store = Arc::new(FakeStore::default());
        let login = started(&store).await;
        let state = login.session.oauth_state.clone();

        let uc = OidcCallbackUseCase::new(store.clone(), Arc::new(FakeProvider), AuditSink::disabled());
        uc.execute(Some(&login.session.id), "good", &state, None)
            .await
            .unwrap();

        let err = uc
            .execute(Some(&login.session.id), "good", &state, None)
            .await
            .unwrap_err();
        assert!(matches!(err, GateError::BadInput(_)));
    }

    #[tokio::test]
    async fn test_state_mismatch_rejected() {
        let store = Arc::new(FakeStore::default());
        let login = started(&store).await;

        let uc = OidcCallbackUseCase::new(store.clone(), Arc::new(FakeProvider), AuditSink::disabled());
        let err = uc
            .execute(Some(&login.session.id), "good", "forged", None)
            .await
            .unwrap_err();
        assert!(matches!(err, GateError::BadInput(_)));

        // The stored state was consumed even on mismatch.
        let stored = store.load(&login.session.id).await.unwrap().unwrap();
        assert!(stored.oauth_state.is_empty());
    }

    #[tokio::test]
    async fn test_exchange_failure_does_not_authenticate() {
        let store = Arc::new(FakeStore::default());
        let login = started(&store).await;
        let state = login.session.oauth_state.clone();

        let uc = OidcCallbackUseCase::new(store.clone(), Arc::new(FakeProvider), AuditSink::disabled());
        let err = uc
            .execute(Some(&login.session.id), "bad", &state, None)
            .await
            .unwrap_err();
        assert!(matches!(err, GateError::BadInput(_)));
        let stored = store.load(&login.session.id).await.unwrap().unwrap();
        assert!(!stored.authenticated);
    }
}
