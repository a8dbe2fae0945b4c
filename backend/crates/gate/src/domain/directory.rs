//! Directory User Entity
//!
//! The user record served by the Warden allowlist directory. The gateway
//! never stores these records durably; they live in the directory and pass
//! through a TTL-bounded cache.

use serde::{Deserialize, Serialize};

/// Record status that counts as present in the allowlist.
pub const STATUS_ACTIVE: &str = "active";

/// A user record from the allowlist directory.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DirectoryUser {
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub mail: String,
    #[serde(default)]
    pub user_id: String,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub scope: Vec<String>,
    #[serde(default)]
    pub role: String,
}

impl DirectoryUser {
    /// Anything but `active` is treated as "not found".
    pub fn is_active(&self) -> bool {
        self.status == STATUS_ACTIVE
    }

    /// Case-fold the mail address once, at ingest.
    pub fn normalized(mut self) -> Self {
        self.mail = self.mail.to_lowercase();
        self
    }

    /// Match against a single identifier (phone, mail or user id).
    pub fn matches_identifier(&self, identifier: &str) -> bool {
        if identifier.is_empty() {
            return false;
        }
        self.user_id == identifier
            || self.phone == identifier
            || self.mail == identifier.to_lowercase()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user() -> DirectoryUser {
        DirectoryUser {
            phone: "13800138000".into(),
            mail: "U@X.Test".into(),
            user_id: "u1".into(),
            status: "active".into(),
            scope: vec![],
            role: "user".into(),
        }
        .normalized()
    }

    #[test]
    fn test_active_status() {
        assert!(user().is_active());
        let mut disabled = user();
        disabled.status = "disabled".into();
        assert!(!disabled.is_active());
    }

    #[test]
    fn test_mail_case_folding() {
        let u = user();
        assert_eq!(u.mail, "u@x.test");
        assert!(u.matches_identifier("U@X.TEST"));
        assert!(u.matches_identifier("u@x.test"));
    }

    #[test]
    fn test_identifier_matching() {
        let u = user();
        assert!(u.matches_identifier("u1"));
        assert!(u.matches_identifier("13800138000"));
        assert!(!u.matches_identifier(""));
        assert!(!u.matches_identifier("other"));
    }
}
