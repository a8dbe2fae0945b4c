//! Session Entity
//!
//! The opaque session record. The id (UUID v4) is the sole cookie payload;
//! the record itself lives in the session store and is the blob persisted
//! by the shared-KV backend.
//!
//! A session is either unauthenticated (it may still hold an OAuth CSRF
//! nonce) or authenticated. The only intermediate state is the step-up
//! window: `authenticated == true` with `step_up_verified == false`.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::directory::DirectoryUser;

/// Authentication-method references recorded on the session.
pub mod amr {
    pub const PASSWORD: &str = "pwd";
    pub const OTP: &str = "otp";
    pub const TOTP: &str = "totp";
    pub const OIDC: &str = "oidc";
}

/// The downstream identity when a session has no directory user id.
pub const ANONYMOUS_USER: &str = "authenticated";

/// Session record
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Session {
    /// Session id (UUID v4), also the cookie value
    pub id: String,
    /// True iff a primary factor succeeded
    #[serde(default)]
    pub authenticated: bool,
    /// Directory user id or OIDC `sub`; empty for pure-password sessions
    #[serde(default)]
    pub user_id: String,
    #[serde(default)]
    pub user_mail: String,
    #[serde(default)]
    pub user_phone: String,
    #[serde(default)]
    pub user_name: String,
    #[serde(default)]
    pub user_scope: Vec<String>,
    #[serde(default)]
    pub user_role: String,
    /// Methods that contributed to this session ("pwd", "otp", ...)
    #[serde(default)]
    pub user_amr: Vec<String>,
    /// Set by a successful TOTP/OIDC step-up
    #[serde(default)]
    pub step_up_verified: bool,
    /// "oidc" when the session was entered through the OIDC flow
    #[serde(default)]
    pub provider: String,
    /// Single-use CSRF nonce for the OIDC flow
    #[serde(default)]
    pub oauth_state: String,
    /// Post-login redirect host captured at authorize time
    #[serde(default)]
    pub oauth_callback: String,
}

impl Session {
    /// Create a fresh, unauthenticated session with a new id.
    pub fn new() -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            ..Default::default()
        }
    }

    pub fn is_authenticated(&self) -> bool {
        self.authenticated
    }

    /// Record a successful password-only login. No directory identity is
    /// attached; downstream headers will carry the literal `authenticated`.
    pub fn authenticate_password(&mut self) {
        self.authenticated = true;
        self.push_amr(amr::PASSWORD);
    }

    /// Record a successful allowlist + OTP login, copying the directory
    /// record into the session.
    pub fn authenticate_directory(&mut self, user: &DirectoryUser, methods: &[String]) {
        self.authenticated = true;
        self.user_id = user.user_id.clone();
        self.user_mail = user.mail.clone();
        self.user_phone = user.phone.clone();
        self.user_scope = user.scope.clone();
        self.user_role = user.role.clone();
        if methods.is_empty() {
            self.push_amr(amr::OTP);
        } else {
            for m in methods {
                self.push_amr(m);
            }
        }
    }

    /// Record a successful OIDC login.
    pub fn authenticate_oidc(&mut self, subject: &str, email: Option<&str>, provider: &str) {
        self.authenticated = true;
        self.user_id = subject.to_string();
        if let Some(email) = email {
            self.user_mail = email.to_lowercase();
        }
        self.provider = provider.to_string();
        self.push_amr(amr::OIDC);
    }

    /// Record a passed step-up TOTP check.
    pub fn verify_step_up(&mut self) {
        self.step_up_verified = true;
        self.push_amr(amr::TOTP);
    }

    /// Drop all authentication state, keeping only the id.
    pub fn unauthenticate(&mut self) {
        let id = std::mem::take(&mut self.id);
        *self = Session {
            id,
            ..Default::default()
        };
    }

    /// Consume the OAuth state nonce. Single-use: the stored value is
    /// cleared before the caller compares it.
    pub fn take_oauth_state(&mut self) -> Option<String> {
        if self.oauth_state.is_empty() {
            None
        } else {
            Some(std::mem::take(&mut self.oauth_state))
        }
    }

    /// Identity emitted in the configured user header.
    pub fn forwarded_user(&self) -> &str {
        if self.user_id.is_empty() {
            ANONYMOUS_USER
        } else {
            &self.user_id
        }
    }

    fn push_amr(&mut self, method: &str) {
        if !self.user_amr.iter().any(|m| m == method) {
            self.user_amr.push(method.to_string());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn active_user() -> DirectoryUser {
        DirectoryUser {
            phone: "13800138000".into(),
            mail: "u@x.test".into(),
            user_id: "u1".into(),
            status: "active".into(),
            scope: vec!["read".into(), "write".into()],
            role: "user".into(),
        }
    }

    #[test]
    fn test_new_session_is_anonymous() {
        let session = Session::new();
        assert!(!session.is_authenticated());
        assert!(!session.id.is_empty());
        assert_eq!(session.forwarded_user(), ANONYMOUS_USER);
    }

    #[test]
    fn test_password_authentication() {
        let mut session = Session::new();
        session.authenticate_password();
        assert!(session.is_authenticated());
        assert_eq!(session.user_amr, vec![amr::PASSWORD]);
        // user_id stays empty for password-only sessions
        assert_eq!(session.forwarded_user(), ANONYMOUS_USER);
    }

    #[test]
    fn test_directory_authentication() {
        let mut session = Session::new();
        session.authenticate_directory(&active_user(), &[]);
        assert!(session.is_authenticated());
        assert_eq!(session.forwarded_user(), "u1");
        assert_eq!(session.user_scope, vec!["read", "write"]);
        assert_eq!(session.user_amr, vec![amr::OTP]);
    }

    #[test]
    fn test_unauthenticate_keeps_id() {
        let mut session = Session::new();
        let id = session.id.clone();
        session.authenticate_directory(&active_user(), &[]);
        session.unauthenticate();
        assert!(!session.is_authenticated());
        assert_eq!(session.id, id);
        assert!(session.user_id.is_empty());
    }

    #[test]
    fn test_oauth_state_single_use() {
        let mut session = Session::new();
        session.oauth_state = "nonce123".into();
        assert_eq!(session.take_oauth_state().as_deref(), Some("nonce123"));
        assert_eq!(session.take_oauth_state(), None);
    }

    #[test]
    fn test_amr_deduplicated() {
        let mut session = Session::new();
        session.authenticate_password();
        session.authenticate_password();
        assert_eq!(session.user_amr.len(), 1);
    }

    #[test]
    fn test_blob_roundtrip() {
        let mut session = Session::new();
        session.authenticate_directory(&active_user(), &[amr::OTP.to_string()]);
        let blob = serde_json::to_vec(&session).unwrap();
        let back: Session = serde_json::from_slice(&blob).unwrap();
        assert_eq!(back.id, session.id);
        assert_eq!(back.user_id, "u1");
        assert!(back.authenticated);
    }
}
