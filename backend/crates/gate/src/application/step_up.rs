//! Step-Up Verification Use Case
//!
//! `/_step_up`: an already-authenticated session proves possession of
//! its TOTP authenticator; on success the session carries
//! `step_up_verified` and passes the path gate.

use std::net::IpAddr;
use std::sync::Arc;

use crate::application::audit::{AuditEvent, AuditResult, AuditSink, EventType};
use crate::domain::session::Session;
use crate::domain::store::SessionStore;
use crate::domain::upstream::TotpService;
use crate::error::{GateError, GateResult};

pub struct StepUpUseCase<S, T>
where
    S: SessionStore,
    T: TotpService,
{
    store: Arc<S>,
    totp: Option<Arc<T>>,
    audit: AuditSink,
}

impl<S, T> StepUpUseCase<S, T>
where
    S: SessionStore + Sync,
    T: TotpService + Sync,
{
    pub fn new(store: Arc<S>, totp: Option<Arc<T>>, audit: AuditSink) -> Self {
        Self { store, totp, audit }
    }

    pub async fn execute(
        &self,
        session_id: Option<&str>,
        code: &str,
        client_ip: Option<IpAddr>,
    ) -> GateResult<Session> {
        let Some(id) = session_id else {
            return Err(GateError::denied("not signed in"));
        };
        let mut session = self
            .store
            .load(id)
            .await?
            .filter(|s| s.authenticated)
            .ok_or_else(|| GateError::denied("not signed in"))?;

        if code.is_empty() {
            return Err(GateError::BadInput("code is required".to_string()));
        }
        if session.user_id.is_empty() {
            return Err(GateError::BadInput(
                "session carries no user id for verification".to_string(),
            ));
        }
        let Some(totp) = &self.totp else {
            return Err(GateError::upstream("totp", "totp service is not configured"));
        };

        let verdict = totp.verify(&session.user_id, code).await?;
        if !verdict.ok {
            self.audit.emit(
                AuditEvent::new(EventType::VerifyCodeCheck, AuditResult::Failure, client_ip)
                    .user(session.user_id.clone())
                    .method("totp")
                    .reason(verdict.reason.clone().unwrap_or_default()),
            );
            return Err(GateError::denied(
                verdict.reason.unwrap_or_else(|| "invalid code".to_string()),
            ));
        }

        session.verify_step_up();
        self.store.save(&session).await?;

        self.audit.emit(
            AuditEvent::new(EventType::VerifyCodeCheck, AuditResult::Success, client_ip)
                .user(session.user_id.clone())
                .method("totp"),
        );
        tracing::info!(session_id = %session.id, "Step-up verification passed");
        Ok(session)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::directory::DirectoryUser;
    use crate::domain::session::amr;
    use crate::testkit::{FakeStore, FakeTotp};

    async fn authed_session(store: &Arc<FakeStore>) -> Session {
        let mut session = Session::new();
        session.authenticate_directory(
            &DirectoryUser {
                user_id: "u1".to_string(),
                status: "active".to_string(),
                ..Default::default()
            },
            &[amr::OTP.to_string()],
        );
        store.save(&session).await.unwrap();
        session
    }

    #[tokio::test]
    async fn test_step_up_success() {
        let store = Arc::new(FakeStore::default());
        let session = authed_session(&store).await;

        let uc = StepUpUseCase::new(store.clone(), Some(Arc::new(FakeTotp::default())), AuditSink::disabled());
        let output = uc.execute(Some(&session.id), "654321", None).await.unwrap();

        assert!(output.step_up_verified);
        assert!(output.user_amr.contains(&amr::TOTP.to_string()));
        let stored = store.load(&session.id).await.unwrap().unwrap();
        assert!(stored.step_up_verified);
    }

    #[tokio::test]
    async fn test_step_up_wrong_code() {
        let store = Arc::new(FakeStore::default());
        let session = authed_session(&store).await;

        let uc = StepUpUseCase::new(store.clone(), Some(Arc::new(FakeTotp::default())), AuditSink::disabled());
        let err = uc.execute(Some(&session.id), "000000", None).await.unwrap_err();
        assert!(matches!(err, GateError::AuthDenied(_)));
        assert!(!store.load(&session.id).await.unwrap().unwrap().step_up_verified);
    }

    #[tokio::test]
    async fn test_step_up_requires_authenticated_session() {
        let store = Arc::new(FakeStore::default());
        let session = Session::new();
        store.save(&session).await.unwrap();

        let uc = StepUpUseCase::new(store, Some(Arc::new(FakeTotp::default())), AuditSink::disabled());
        let err = uc.execute(Some(&session.id), "654321", None).await.unwrap_err();
        assert!(matches!(err, GateError::AuthDenied(_)));
    }

    #[tokio::test]
    async fn test_step_up_service_down() {
        let store = Arc::new(FakeStore::default());
        let session = authed_session(&store).await;

        let totp = FakeTotp {
            down: true,
            ..Default::default()
        };
        let uc = StepUpUseCase::new(store, Some(Arc::new(totp)), AuditSink::disabled());
        let err = uc.execute(Some(&session.id), "654321", None).await.unwrap_err();
        assert!(matches!(err, GateError::Upstream { .. }));
    }
}
