//! Login Use Case
//!
//! Handles `POST /_login` for both auth methods: a shared-password match
//! and an allowlist lookup plus broker-verified OTP code. On success the
//! session flips to authenticated and is saved before the cookie goes out.

use std::net::IpAddr;
use std::sync::Arc;

use platform::password::PasswordSet;

use crate::application::audit::{AuditEvent, AuditResult, AuditSink, EventType};
use crate::domain::session::Session;
use crate::domain::store::SessionStore;
use crate::domain::upstream::{CodeBroker, Directory};
use crate::error::{GateError, GateResult};

pub const METHOD_PASSWORD: &str = "password";
pub const METHOD_WARDEN: &str = "warden";

/// Parsed login form plus request metadata.
#[derive(Debug, Clone, Default)]
pub struct LoginInput {
    /// `password` or `warden`; empty defaults to `password`.
    pub auth_method: String,
    pub password: String,
    pub phone: String,
    pub mail: String,
    pub challenge_id: String,
    pub verify_code: String,
    /// Session id from the inbound cookie, if any.
    pub session_id: Option<String>,
    pub client_ip: Option<IpAddr>,
    pub user_agent: String,
    /// `Idempotency-Key` header, forwarded to the broker verbatim.
    pub idempotency_key: Option<String>,
}

/// Authenticated session ready for the cookie.
#[derive(Debug, Clone)]
pub struct LoginOutput {
    pub session: Session,
    /// True when the session id did not come from the inbound cookie.
    pub created: bool,
}

pub struct LoginUseCase<S, D, B>
where
    S: SessionStore,
    D: Directory,
    B: CodeBroker,
{
    store: Arc<S>,
    directory: Option<Arc<D>>,
    broker: Option<Arc<B>>,
    passwords: Option<PasswordSet>,
    audit: AuditSink,
}

impl<S, D, B> LoginUseCase<S, D, B>
where
    S: SessionStore + Sync,
    D: Directory + Sync,
    B: CodeBroker + Sync,
{
    pub fn new(
        store: Arc<S>,
        directory: Option<Arc<D>>,
        broker: Option<Arc<B>>,
        passwords: Option<PasswordSet>,
        audit: AuditSink,
    ) -> Self {
        Self {
            store,
            directory,
            broker,
            passwords,
            audit,
        }
    }

    pub async fn execute(&self, input: LoginInput) -> GateResult<LoginOutput> {
        // Reuse the caller's session id so the cookie survives the
        // login; otherwise mint a fresh one.
        let (mut session, created) = match input.session_id.as_deref() {
            Some(id) => match self.store.load(id).await? {
                Some(session) => (session, false),
                None => (Session::new(), true),
            },
            None => (Session::new(), true),
        };

        let result = match input.auth_method.as_str() {
            "" | METHOD_PASSWORD => self.login_password(&mut session, &input),
            METHOD_WARDEN => self.login_warden(&mut session, &input).await,
            other => Err(GateError::BadInput(format!("unknown auth_method {other}"))),
        };

        if let Err(e) = result {
            self.audit.emit(
                AuditEvent::new(EventType::LoginFailure, AuditResult::Failure, input.client_ip)
                    .method(method_label(&input.auth_method))
                    .reason(e.to_string()),
            );
            return Err(e);
        }

        self.store.save(&session).await?;

        self.audit.emit(
            AuditEvent::new(EventType::Login, AuditResult::Success, input.client_ip)
                .user(session.user_id.clone())
                .method(method_label(&input.auth_method)),
        );
        if created {
            self.audit.emit(
                AuditEvent::new(EventType::SessionCreate, AuditResult::Success, input.client_ip)
                    .user(session.user_id.clone()),
            );
        }

        tracing::info!(
            session_id = %session.id,
            method = method_label(&input.auth_method),
            "Login succeeded"
        );

        Ok(LoginOutput { session, created })
    }

    fn login_password(&self, session: &mut Session, input: &LoginInput) -> GateResult<()> {
        if input.password.is_empty() {
            return Err(GateError::BadInput("password is required".to_string()));
        }
        let Some(passwords) = &self.passwords else {
            return Err(GateError::denied("password login is not configured"));
        };
        if !passwords.matches(&input.password) {
            return Err(GateError::denied("wrong password"));
        }
        session.authenticate_password();
        Ok(())
    }

    async fn login_warden(&self, session: &mut Session, input: &LoginInput) -> GateResult<()> {
        if input.phone.is_empty() && input.mail.is_empty() {
            return Err(GateError::BadInput("phone or mail is required".to_string()));
        }
        if input.challenge_id.is_empty() || input.verify_code.is_empty() {
            return Err(GateError::BadInput(
                "challenge_id and verify_code are required".to_string(),
            ));
        }
        let Some(directory) = &self.directory else {
            return Err(GateError::BadInput("directory login is not enabled".to_string()));
        };
        let Some(broker) = &self.broker else {
            return Err(GateError::upstream("herald", "broker is not configured"));
        };

        let user = directory
            .get_user("", &input.phone, &input.mail)
            .await?
            .ok_or_else(|| GateError::denied("user is not in the allowlist"))?;

        let ip = input.client_ip.map(|ip| ip.to_string()).unwrap_or_default();
        let verification = broker
            .verify_challenge(
                &input.challenge_id,
                &input.verify_code,
                &ip,
                input.idempotency_key.as_deref(),
            )
            .await?;

        self.audit.emit(
            AuditEvent::new(
                EventType::VerifyCodeCheck,
                if verification.ok {
                    AuditResult::Success
                } else {
                    AuditResult::Failure
                },
                input.client_ip,
            )
            .user(user.user_id.clone()),
        );

        if !verification.ok {
            let reason = verification
                .reason
                .unwrap_or_else(|| "invalid verification code".to_string());
            return Err(GateError::denied(reason));
        }

        session.authenticate_directory(&user, &verification.amr);
        Ok(())
    }
}

fn method_label(auth_method: &str) -> &str {
    if auth_method.is_empty() {
        METHOD_PASSWORD
    } else {
        auth_method
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::directory::DirectoryUser;
    use crate::domain::session::amr;
    use crate::testkit::{FakeBroker, FakeDirectory, FakeStore};

    fn password_use_case(store: Arc<FakeStore>) -> LoginUseCase<FakeStore, FakeDirectory, FakeBroker> {
        LoginUseCase::new(
            store,
            None,
            None,
            Some(PasswordSet::parse("plaintext:test123").unwrap()),
            AuditSink::disabled(),
        )
    }

    fn directory_user() -> DirectoryUser {
        DirectoryUser {
            phone: "13800138000".to_string(),
            mail: "u@x.test".to_string(),
            user_id: "u1".to_string(),
            status: "active".to_string(),
            scope: vec!["read".to_string(), "write".to_string()],
            role: "user".to_string(),
        }
    }

    #[tokio::test]
    async fn test_password_login() {
        let store = Arc::new(FakeStore::default());
        let uc = password_use_case(store.clone());
        let output = uc
            .execute(LoginInput {
                password: "test123".to_string(),
                ..Default::default()
            })
            .await
            .unwrap();

        assert!(output.created);
        assert!(output.session.authenticated);
        assert_eq!(output.session.user_amr, vec![amr::PASSWORD.to_string()]);
        // And it was saved.
        let stored = store.load(&output.session.id).await.unwrap().unwrap();
        assert!(stored.authenticated);
    }

    #[tokio::test]
    async fn test_password_login_wrong_password() {
        let store = Arc::new(FakeStore::default());
        let uc = password_use_case(store.clone());
        let err = uc
            .execute(LoginInput {
                password: "wrong".to_string(),
                ..Default::default()
            })
            .await
            .unwrap_err();
        assert!(matches!(err, GateError::AuthDenied(_)));
    }

    #[tokio::test]
    async fn test_password_login_reuses_cookie_session() {
        let store = Arc::new(FakeStore::default());
        let session = Session::new();
        store.save(&session).await.unwrap();

        let uc = password_use_case(store.clone());
        let output = uc
            .execute(LoginInput {
                password: "test123".to_string(),
                session_id: Some(session.id.clone()),
                ..Default::default()
            })
            .await
            .unwrap();
        assert!(!output.created);
        assert_eq!(output.session.id, session.id);
    }

    #[tokio::test]
    async fn test_warden_login() {
        let store = Arc::new(FakeStore::default());
        let broker = Arc::new(FakeBroker::default());
        let uc = LoginUseCase::new(
            store,
            Some(Arc::new(FakeDirectory::with_user(directory_user()))),
            Some(broker),
            None,
            AuditSink::disabled(),
        );

        let output = uc
            .execute(LoginInput {
                auth_method: METHOD_WARDEN.to_string(),
                phone: "13800138000".to_string(),
                challenge_id: "ch_1".to_string(),
                verify_code: "123456".to_string(),
                ..Default::default()
            })
            .await
            .unwrap();

        let session = output.session;
        assert!(session.authenticated);
        assert_eq!(session.user_id, "u1");
        assert_eq!(session.user_mail, "u@x.test");
        assert_eq!(session.user_role, "user");
        assert_eq!(session.user_amr, vec![amr::OTP.to_string()]);
    }

    #[tokio::test]
    async fn test_warden_login_bad_code() {
        let uc = LoginUseCase::new(
            Arc::new(FakeStore::default()),
            Some(Arc::new(FakeDirectory::with_user(directory_user()))),
            Some(Arc::new(FakeBroker::default())),
            None,
            AuditSink::disabled(),
        );
        let err = uc
            .execute(LoginInput {
                auth_method: METHOD_WARDEN.to_string(),
                phone: "13800138000".to_string(),
                challenge_id: "ch_1".to_string(),
                verify_code: "000000".to_string(),
                ..Default::default()
            })
            .await
            .unwrap_err();
        assert!(matches!(err, GateError::AuthDenied(_)));
    }

    #[tokio::test]
    async fn test_warden_login_unknown_user() {
        let uc = LoginUseCase::new(
            Arc::new(FakeStore::default()),
            Some(Arc::new(FakeDirectory::default())),
            Some(Arc::new(FakeBroker::default())),
            None,
            AuditSink::disabled(),
        );
        let err = uc
            .execute(LoginInput {
                auth_method: METHOD_WARDEN.to_string(),
                phone: "13800138000".to_string(),
                challenge_id: "ch_1".to_string(),
                verify_code: "123456".to_string(),
                ..Default::default()
            })
            .await
            .unwrap_err();
        assert!(matches!(err, GateError::AuthDenied(_)));
    }

    #[tokio::test]
    async fn test_warden_login_missing_fields() {
        let uc = LoginUseCase::new(
            Arc::new(FakeStore::default()),
            Some(Arc::new(FakeDirectory::with_user(directory_user()))),
            Some(Arc::new(FakeBroker::default())),
            None,
            AuditSink::disabled(),
        );
        let err = uc
            .execute(LoginInput {
                auth_method: METHOD_WARDEN.to_string(),
                phone: "13800138000".to_string(),
                ..Default::default()
            })
            .await
            .unwrap_err();
        assert!(matches!(err, GateError::BadInput(_)));
    }

    #[tokio::test]
    async fn test_unknown_auth_method() {
        let uc = password_use_case(Arc::new(FakeStore::default()));
        let err = uc
            .execute(LoginInput {
                auth_method: "saml".to_string(),
                ..Default::default()
            })
            .await
            .unwrap_err();
        assert!(matches!(err, GateError::BadInput(_)));
    }
}
