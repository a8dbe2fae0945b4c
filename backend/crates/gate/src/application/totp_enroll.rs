//! TOTP Enrollment Use Case
//!
//! Enrollment, confirmation and revocation against the remote TOTP
//! service. All three require an authenticated session with a user id;
//! the gateway never sees the shared secret, only the otpauth URI and
//! the one-time backup codes it relays to the client.

use std::sync::Arc;

use crate::domain::session::Session;
use crate::domain::store::SessionStore;
use crate::domain::upstream::{TotpEnrollConfirmed, TotpEnrollStarted, TotpService};
use crate::error::{GateError, GateResult};

pub struct TotpEnrollUseCase<S, T>
where
    S: SessionStore,
    T: TotpService,
{
    store: Arc<S>,
    totp: Option<Arc<T>>,
}

impl<S, T> TotpEnrollUseCase<S, T>
where
    S: SessionStore + Sync,
    T: TotpService + Sync,
{
    pub fn new(store: Arc<S>, totp: Option<Arc<T>>) -> Self {
        Self { store, totp }
    }

    pub async fn start(&self, session_id: Option<&str>) -> GateResult<TotpEnrollStarted> {
        let session = self.require_user(session_id).await?;
        let totp = self.service()?;
        let label = enrollment_label(&session);
        let started = totp.enroll_start(&session.user_id, label).await?;
        tracing::info!(user_id = %session.user_id, enroll_id = %started.enroll_id, "TOTP enrollment started");
        Ok(started)
    }

    pub async fn confirm(
        &self,
        session_id: Option<&str>,
        enroll_id: &str,
        code: &str,
    ) -> GateResult<TotpEnrollConfirmed> {
        let session = self.require_user(session_id).await?;
        if enroll_id.is_empty() || code.is_empty() {
            return Err(GateError::BadInput(
                "enroll_id and code are required".to_string(),
            ));
        }
        let totp = self.service()?;
        let confirmed = totp.enroll_confirm(enroll_id, code).await?;
        if confirmed.ok {
            tracing::info!(user_id = %session.user_id, "TOTP enrollment confirmed");
        }
        Ok(confirmed)
    }

    pub async fn revoke(&self, session_id: Option<&str>) -> GateResult<()> {
        let session = self.require_user(session_id).await?;
        let totp = self.service()?;
        totp.revoke(&session.user_id).await?;
        tracing::info!(user_id = %session.user_id, "TOTP revoked");
        Ok(())
    }

    fn service(&self) -> GateResult<&Arc<T>> {
        self.totp
            .as_ref()
            .ok_or_else(|| GateError::upstream("totp", "totp service is not configured"))
    }

    async fn require_user(&self, session_id: Option<&str>) -> GateResult<Session> {
        let Some(id) = session_id else {
            return Err(GateError::denied("not signed in"));
        };
        self.store
            .load(id)
            .await?
            .filter(|s| s.authenticated && !s.user_id.is_empty())
            .ok_or_else(|| GateError::denied("not signed in"))
    }
}

/// Authenticator label: mail, then phone, then the bare user id.
fn enrollment_label(session: &Session) -> &str {
    if !session.user_mail.is_empty() {
        &session.user_mail
    } else if !session.user_phone.is_empty() {
        &session.user_phone
    } else {
        &session.user_id
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::directory::DirectoryUser;
    use crate::testkit::{FakeStore, FakeTotp};

    async fn authed_session(store: &Arc<FakeStore>, mail: &str) -> Session {
        let mut session = Session::new();
        session.authenticate_directory(
            &DirectoryUser {
                user_id: "u1".to_string(),
                mail: mail.to_string(),
                status: "active".to_string(),
                ..Default::default()
            },
            &[],
        );
        store.save(&session).await.unwrap();
        session
    }

    #[tokio::test]
    async fn test_enroll_start_uses_mail_label() {
        let store = Arc::new(FakeStore::default());
        let session = authed_session(&store, "u@x.test").await;

        let uc = TotpEnrollUseCase::new(store, Some(Arc::new(FakeTotp::default())));
        let started = uc.start(Some(&session.id)).await.unwrap();
        assert_eq!(started.enroll_id, "enr_1");
        assert!(started.otpauth_uri.contains("u@x.test"));
    }

    #[tokio::test]
    async fn test_enroll_confirm_returns_backup_codes() {
        let store = Arc::new(FakeStore::default());
        let session = authed_session(&store, "u@x.test").await;

        let uc = TotpEnrollUseCase::new(store, Some(Arc::new(FakeTotp::default())));
        let confirmed = uc.confirm(Some(&session.id), "enr_1", "654321").await.unwrap();
        assert!(confirmed.ok);
        assert!(!confirmed.backup_codes.is_empty());
    }

    #[tokio::test]
    async fn test_enroll_confirm_missing_fields() {
        let store = Arc::new(FakeStore::default());
        let session = authed_session(&store, "u@x.test").await;

        let uc = TotpEnrollUseCase::new(store, Some(Arc::new(FakeTotp::default())));
        let err = uc.confirm(Some(&session.id), "", "654321").await.unwrap_err();
        assert!(matches!(err, GateError::BadInput(_)));
    }

    #[tokio::test]
    async fn test_requires_authenticated_session() {
        let store = Arc::new(FakeStore::default());
        let uc = TotpEnrollUseCase::new(store, Some(Arc::new(FakeTotp::default())));
        let err = uc.start(None).await.unwrap_err();
        assert!(matches!(err, GateError::AuthDenied(_)));
        let err = uc.revoke(Some("unknown")).await.unwrap_err();
        assert!(matches!(err, GateError::AuthDenied(_)));
    }
}
