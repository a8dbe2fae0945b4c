//! Upstream Service Traits
//!
//! Interfaces for the external services the gateway talks to: the
//! allowlist directory, the verification-code broker, the TOTP service
//! and the OIDC provider. HTTP implementations live in the
//! infrastructure layer; use cases depend only on these traits.

use crate::domain::directory::DirectoryUser;
use crate::error::GateResult;

/// Delivery channel for a verification code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Channel {
    Sms,
    Email,
}

impl Channel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Channel::Sms => "sms",
            Channel::Email => "email",
        }
    }
}

/// Request to open a verification-code challenge.
#[derive(Debug, Clone)]
pub struct ChallengeRequest {
    pub user_id: String,
    pub channel: Channel,
    pub destination: String,
    pub purpose: String,
    pub locale: String,
    pub client_ip: String,
    pub user_agent: String,
    /// Forwarded verbatim when the caller supplies one.
    pub idempotency_key: Option<String>,
}

/// Broker acknowledgement of a created challenge.
#[derive(Debug, Clone)]
pub struct ChallengeCreated {
    pub challenge_id: String,
    pub expires_in: u64,
    pub next_resend_in: u64,
}

/// Broker verdict on a submitted code. `ok == false` carries the
/// broker's reason; transport failures are `Err`, not a verdict.
#[derive(Debug, Clone)]
pub struct ChallengeVerification {
    pub ok: bool,
    pub user_id: String,
    pub amr: Vec<String>,
    pub issued_at: Option<String>,
    pub reason: Option<String>,
}

/// Allowlist directory lookups.
#[trait_variant::make(Directory: Send)]
pub trait LocalDirectory {
    /// Look up a user by the first non-empty identifier. Returns
    /// `Ok(None)` for unknown or inactive users.
    async fn get_user(
        &self,
        user_id: &str,
        phone: &str,
        mail: &str,
    ) -> GateResult<Option<DirectoryUser>>;

    /// Membership test. Lookup failures answer `false`, never `Err`.
    async fn check_in_list(&self, phone: &str, mail: &str) -> bool;
}

/// Verification-code broker.
#[trait_variant::make(CodeBroker: Send)]
pub trait LocalCodeBroker {
    async fn create_challenge(&self, request: &ChallengeRequest) -> GateResult<ChallengeCreated>;

    async fn verify_challenge(
        &self,
        challenge_id: &str,
        code: &str,
        client_ip: &str,
        idempotency_key: Option<&str>,
    ) -> GateResult<ChallengeVerification>;
}

/// TOTP enrollment state for a subject.
#[derive(Debug, Clone)]
pub struct TotpStatus {
    pub subject: String,
    pub totp_enabled: bool,
}

/// Result of starting an enrollment.
#[derive(Debug, Clone)]
pub struct TotpEnrollStarted {
    pub enroll_id: String,
    pub otpauth_uri: String,
}

/// Result of confirming an enrollment. Backup codes are shown once.
#[derive(Debug, Clone)]
pub struct TotpEnrollConfirmed {
    pub ok: bool,
    pub subject: String,
    pub totp_enabled: bool,
    pub backup_codes: Vec<String>,
}

/// TOTP verification verdict.
#[derive(Debug, Clone)]
pub struct TotpVerification {
    pub ok: bool,
    pub reason: Option<String>,
}

/// Authenticator-app (TOTP) service.
#[trait_variant::make(TotpService: Send)]
pub trait LocalTotpService {
    async fn status(&self, subject: &str) -> GateResult<TotpStatus>;

    async fn enroll_start(&self, subject: &str, label: &str) -> GateResult<TotpEnrollStarted>;

    async fn enroll_confirm(&self, enroll_id: &str, code: &str)
        -> GateResult<TotpEnrollConfirmed>;

    async fn verify(&self, subject: &str, code: &str) -> GateResult<TotpVerification>;

    async fn revoke(&self, subject: &str) -> GateResult<()>;
}

/// Verified identity extracted from an OIDC ID token.
#[derive(Debug, Clone)]
pub struct OidcIdentity {
    pub subject: String,
    pub email: Option<String>,
}

/// OIDC provider seam: authorize-URL construction and code exchange.
#[trait_variant::make(IdentityProvider: Send)]
pub trait LocalIdentityProvider {
    /// Provider name recorded on the session.
    fn name(&self) -> &str;

    /// Authorization endpoint URL carrying the given `state`.
    fn authorize_url(&self, state: &str) -> String;

    /// Exchange the authorization code and verify the ID token.
    async fn exchange(&self, code: &str) -> GateResult<OidcIdentity>;
}
