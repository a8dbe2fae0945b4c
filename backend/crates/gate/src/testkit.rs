//! In-memory fakes for use-case tests.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use crate::domain::directory::DirectoryUser;
use crate::domain::session::Session;
use crate::domain::store::{Kv, SessionStore};
use crate::domain::upstream::{
    ChallengeCreated, ChallengeRequest, ChallengeVerification, CodeBroker, Directory,
    IdentityProvider, OidcIdentity, TotpEnrollConfirmed, TotpEnrollStarted, TotpService,
    TotpStatus, TotpVerification,
};
use crate::error::{GateError, GateResult};

/// Map-backed session store. `failing()` makes every call error, for
/// fail-closed paths.
#[derive(Default)]
pub struct FakeStore {
    sessions: Mutex<HashMap<String, Session>>,
    fail: bool,
}

impl FakeStore {
    pub fn failing() -> Self {
        Self {
            sessions: Mutex::new(HashMap::new()),
            fail: true,
        }
    }

    fn check(&self) -> GateResult<()> {
        if self.fail {
            return Err(GateError::SessionStore("store down".to_string()));
        }
        Ok(())
    }
}

impl SessionStore for FakeStore {
    async fn load(&self, id: &str) -> GateResult<Option<Session>> {
        self.check()?;
        Ok(self.sessions.lock().unwrap().get(id).cloned())
    }

    async fn save(&self, session: &Session) -> GateResult<()> {
        self.check()?;
        self.sessions
            .lock()
            .unwrap()
            .insert(session.id.clone(), session.clone());
        Ok(())
    }

    async fn destroy(&self, id: &str) -> GateResult<()> {
        self.check()?;
        self.sessions.lock().unwrap().remove(id);
        Ok(())
    }

    async fn reset(&self) -> GateResult<()> {
        self.check()?;
        self.sessions.lock().unwrap().clear();
        Ok(())
    }

    async fn close(&self) -> GateResult<()> {
        Ok(())
    }
}

/// Map-backed KV, ignores TTLs.
#[derive(Default)]
pub struct FakeKv {
    entries: Mutex<HashMap<String, Vec<u8>>>,
}

impl Kv for FakeKv {
    async fn get(&self, key: &str) -> GateResult<Option<Vec<u8>>> {
        Ok(self.entries.lock().unwrap().get(key).cloned())
    }

    async fn set(&self, key: &str, value: &[u8], _ttl: Duration) -> GateResult<()> {
        self.entries
            .lock()
            .unwrap()
            .insert(key.to_string(), value.to_vec());
        Ok(())
    }

    async fn del(&self, key: &str) -> GateResult<()> {
        self.entries.lock().unwrap().remove(key);
        Ok(())
    }

    async fn reset(&self) -> GateResult<()> {
        self.entries.lock().unwrap().clear();
        Ok(())
    }

    async fn close(&self) -> GateResult<()> {
        Ok(())
    }
}

/// Directory with at most one user.
#[derive(Default)]
pub struct FakeDirectory {
    user: Option<DirectoryUser>,
}

impl FakeDirectory {
    pub fn with_user(user: DirectoryUser) -> Self {
        Self { user: Some(user) }
    }
}

impl Directory for FakeDirectory {
    async fn get_user(
        &self,
        user_id: &str,
        phone: &str,
        mail: &str,
    ) -> GateResult<Option<DirectoryUser>> {
        let identifier = [user_id, phone, mail]
            .into_iter()
            .find(|s| !s.is_empty())
            .unwrap_or_default();
        Ok(self
            .user
            .iter()
            .find(|u| u.is_active() && u.matches_identifier(identifier))
            .cloned()
            .map(DirectoryUser::normalized))
    }

    async fn check_in_list(&self, phone: &str, mail: &str) -> bool {
        let identifier = if phone.is_empty() { mail } else { phone };
        self.user
            .as_ref()
            .is_some_and(|u| u.is_active() && u.matches_identifier(identifier))
    }
}

/// Broker accepting a single expected code. Records the last challenge
/// request and idempotency key it saw.
pub struct FakeBroker {
    pub challenge_id: String,
    pub code: String,
    pub rate_limited: bool,
    pub down: bool,
    pub last_request: Mutex<Option<ChallengeRequest>>,
    pub last_verify_key: Mutex<Option<String>>,
}

impl Default for FakeBroker {
    fn default() -> Self {
        Self {
            challenge_id: "ch_1".to_string(),
            code: "123456".to_string(),
            rate_limited: false,
            down: false,
            last_request: Mutex::new(None),
            last_verify_key: Mutex::new(None),
        }
    }
}

impl CodeBroker for FakeBroker {
    async fn create_challenge(&self, request: &ChallengeRequest) -> GateResult<ChallengeCreated> {
        if self.down {
            return Err(GateError::upstream("herald", "connection_failed"));
        }
        if self.rate_limited {
            return Err(GateError::RateLimited("rate_limited".to_string()));
        }
        *self.last_request.lock().unwrap() = Some(request.clone());
        Ok(ChallengeCreated {
            challenge_id: self.challenge_id.clone(),
            expires_in: 300,
            next_resend_in: 60,
        })
    }

    async fn verify_challenge(
        &self,
        challenge_id: &str,
        code: &str,
        _client_ip: &str,
        idempotency_key: Option<&str>,
    ) -> GateResult<ChallengeVerification> {
        if self.down {
            return Err(GateError::upstream("herald", "connection_failed"));
        }
        *self.last_verify_key.lock().unwrap() = idempotency_key.map(str::to_string);
        let ok = challenge_id == self.challenge_id && code == self.code;
        Ok(ChallengeVerification {
            ok,
            user_id: String::new(),
            amr: vec!["otp".to_string()],
            issued_at: None,
            reason: (!ok).then(|| "invalid_code".to_string()),
        })
    }
}

/// TOTP service accepting a single code.
pub struct FakeTotp {
    pub code: String,
    pub enabled: bool,
    pub down: bool,
}

impl Default for FakeTotp {
    fn default() -> Self {
        Self {
            code: "654321".to_string(),
            enabled: true,
            down: false,
        }
    }
}

impl FakeTotp {
    fn check(&self) -> GateResult<()> {
        if self.down {
            return Err(GateError::upstream("totp", "connection_failed"));
        }
        Ok(())
    }
}

impl TotpService for FakeTotp {
    async fn status(&self, subject: &str) -> GateResult<TotpStatus> {
        self.check()?;
        Ok(TotpStatus {
            subject: subject.to_string(),
            totp_enabled: self.enabled,
        })
    }

    async fn enroll_start(&self, subject: &str, label: &str) -> GateResult<TotpEnrollStarted> {
        self.check()?;
        Ok(TotpEnrollStarted {
            enroll_id: "enr_1".to_string(),
            otpauth_uri: format!("otpauth://totp/{label}?issuer=stargate&subject={subject}"),
        })
    }

    async fn enroll_confirm(
        &self,
        _enroll_id: &str,
        code: &str,
    ) -> GateResult<TotpEnrollConfirmed> {
        self.check()?;
        Ok(TotpEnrollConfirmed {
            ok: code == self.code,
            subject: "u1".to_string(),
            totp_enabled: code == self.code,
            backup_codes: vec!["aaaa-bbbb".to_string(), "cccc-dddd".to_string()],
        })
    }

    async fn verify(&self, _subject: &str, code: &str) -> GateResult<TotpVerification> {
        self.check()?;
        let ok = code == self.code;
        Ok(TotpVerification {
            ok,
            reason: (!ok).then(|| "invalid_code".to_string()),
        })
    }

    async fn revoke(&self, _subject: &str) -> GateResult<()> {
        self.check()
    }
}

/// Provider that accepts the code `"good"`.
#[derive(Default)]
pub struct FakeProvider;

impl IdentityProvider for FakeProvider {
    fn name(&self) -> &str {
        "fakeidp"
    }

    fn authorize_url(&self, state: &str) -> String {
        format!("https://idp.test/authorize?state={state}")
    }

    async fn exchange(&self, code: &str) -> GateResult<OidcIdentity> {
        if code == "good" {
            Ok(OidcIdentity {
                subject: "oidc-sub-1".to_string(),
                email: Some("oidc@x.test".to_string()),
            })
        } else {
            Err(GateError::BadInput("code exchange rejected".to_string()))
        }
    }
}
