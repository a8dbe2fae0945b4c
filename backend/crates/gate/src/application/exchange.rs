//! Cross-Domain Session Exchange
//!
//! Validation for `/_session_exchange?id=<sid>` and for the `callback`
//! hostname carried through login flows. The exchanged id is opaque and
//! is only ever written into the cookie, never used as a redirect target.

use crate::error::{GateError, GateResult};

/// Accept only opaque session ids: no URL scheme, no authority marker.
pub fn validate_exchange_id(id: &str) -> GateResult<&str> {
    if id.is_empty() {
        return Err(GateError::BadInput("missing session id".to_string()));
    }
    if id.contains(':') || id.contains("//") {
        return Err(GateError::BadInput("malformed session id".to_string()));
    }
    Ok(id)
}

/// Same-site check for a post-login callback hostname. Hosts outside the
/// cookie domain (or the auth host itself) collapse to an empty callback,
/// which forces a same-host redirect.
pub fn validate_callback<'a>(
    callback: &'a str,
    cookie_domain: Option<&str>,
    auth_host: &str,
) -> &'a str {
    if callback.is_empty() {
        return "";
    }
    // Hostnames only; anything that smells like a URL is rejected.
    if callback.contains(':') || callback.contains('/') {
        return "";
    }
    if callback.eq_ignore_ascii_case(auth_host) {
        return callback;
    }
    if let Some(domain) = cookie_domain {
        let suffix = domain.trim_start_matches('.').to_ascii_lowercase();
        if !suffix.is_empty() {
            let lower = callback.to_ascii_lowercase();
            if lower == suffix || lower.ends_with(&format!(".{suffix}")) {
                return callback;
            }
        }
    }
    ""
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exchange_id_opaque() {
        assert!(validate_exchange_id("abc-123").is_ok());
        assert!(validate_exchange_id("").is_err());
        assert!(validate_exchange_id("https://evil.test").is_err());
        assert!(validate_exchange_id("//evil.test").is_err());
    }

    #[test]
    fn test_callback_suffix_match() {
        assert_eq!(
            validate_callback("app.example.com", Some(".example.com"), "auth.example.com"),
            "app.example.com"
        );
        assert_eq!(
            validate_callback("example.com", Some(".example.com"), "auth.example.com"),
            "example.com"
        );
    }

    #[test]
    fn test_callback_auth_host_without_domain() {
        assert_eq!(
            validate_callback("auth.example.com", None, "auth.example.com"),
            "auth.example.com"
        );
        assert_eq!(validate_callback("other.example.com", None, "auth.example.com"), "");
    }

    #[test]
    fn test_callback_rejects_foreign_hosts() {
        assert_eq!(
            validate_callback("evil.test", Some(".example.com"), "auth.example.com"),
            ""
        );
        // Suffix match is on label boundaries.
        assert_eq!(
            validate_callback("notexample.com", Some(".example.com"), "auth.example.com"),
            ""
        );
    }

    #[test]
    fn test_callback_rejects_urls() {
        assert_eq!(
            validate_callback("https://app.example.com", Some(".example.com"), "auth.example.com"),
            ""
        );
        assert_eq!(
            validate_callback("app.example.com/path", Some(".example.com"), "auth.example.com"),
            ""
        );
    }
}
