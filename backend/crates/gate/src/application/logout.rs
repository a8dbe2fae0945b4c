//! Logout Use Case

use std::net::IpAddr;
use std::sync::Arc;

use crate::application::audit::{AuditEvent, AuditResult, AuditSink, EventType};
use crate::domain::store::SessionStore;
use crate::error::GateResult;

pub struct LogoutUseCase<S>
where
    S: SessionStore,
{
    store: Arc<S>,
    audit: AuditSink,
}

impl<S> LogoutUseCase<S>
where
    S: SessionStore + Sync,
{
    pub fn new(store: Arc<S>, audit: AuditSink) -> Self {
        Self { store, audit }
    }

    /// Destroy the caller's session. Missing or unknown cookies are not
    /// an error; logout is idempotent.
    pub async fn execute(&self, session_id: Option<&str>, client_ip: Option<IpAddr>) -> GateResult<()> {
        let Some(id) = session_id else {
            return Ok(());
        };

        let user_id = match self.store.load(id).await? {
            Some(session) => session.user_id,
            None => return Ok(()),
        };

        self.store.destroy(id).await?;

        self.audit.emit(
            AuditEvent::new(EventType::Logout, AuditResult::Success, client_ip)
                .user(user_id.clone()),
        );
        self.audit.emit(
            AuditEvent::new(EventType::SessionDestroy, AuditResult::Success, client_ip)
                .user(user_id),
        );
        tracing::info!(session_id = %id, "Session destroyed");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::session::Session;
    use crate::testkit::FakeStore;

    #[tokio::test]
    async fn test_logout_destroys_session() {
        let store = Arc::new(FakeStore::default());
        let mut session = Session::new();
        session.authenticate_password();
        store.save(&session).await.unwrap();

        let uc = LogoutUseCase::new(store.clone(), AuditSink::disabled());
        uc.execute(Some(&session.id), None).await.unwrap();

        assert!(store.load(&session.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_logout_without_cookie_is_noop() {
        let uc = LogoutUseCase::new(Arc::new(FakeStore::default()), AuditSink::disabled());
        uc.execute(None, None).await.unwrap();
        uc.execute(Some("unknown"), None).await.unwrap();
    }
}
