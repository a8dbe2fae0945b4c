//! Gateway Configuration
//!
//! Typed environment schema. Every knob is read once at startup,
//! validated, and frozen; there is no dynamic reload.

use std::env;
use std::time::Duration;

use platform::password::{PasswordParseError, PasswordSet};
use thiserror::Error;

use crate::i18n::Lang;

/// Session cookie name.
pub const SESSION_COOKIE: &str = "stargate_session_id";

/// Transient cookie holding the post-login callback host for HTML flows.
pub const CALLBACK_COOKIE: &str = "stargate_callback";

/// Default namespace for shared-KV session keys.
pub const DEFAULT_KEY_PREFIX: &str = "stargate:session:";

/// Service name announced in HMAC-signed upstream requests.
pub const SERVICE_NAME: &str = "stargate";

/// Fatal configuration errors, reported once at startup.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    Missing(&'static str),

    #[error("Invalid value for {name}: {reason}")]
    Invalid { name: &'static str, reason: String },

    #[error("PASSWORDS is required when WARDEN_ENABLED=false")]
    NoAuthMethod,

    #[error("Invalid PASSWORDS: {0}")]
    Passwords(#[from] PasswordParseError),
}

/// Audit log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AuditFormat {
    #[default]
    Json,
    Text,
}

/// Shared session storage (Redis) settings.
#[derive(Debug, Clone)]
pub struct SessionStorageConfig {
    pub addr: String,
    pub password: Option<String>,
    pub db: u8,
    pub key_prefix: String,
}

/// Credential-broker (Herald) settings.
#[derive(Debug, Clone)]
pub struct HeraldConfig {
    pub url: String,
    pub api_key: Option<String>,
    pub hmac_secret: Option<String>,
}

/// Allowlist directory (Warden) settings.
#[derive(Debug, Clone)]
pub struct WardenConfig {
    pub url: String,
    pub api_key: Option<String>,
    pub cache_ttl: Duration,
}

/// Remote TOTP service settings.
#[derive(Debug, Clone)]
pub struct TotpConfig {
    pub base_url: String,
    pub api_key: Option<String>,
    pub hmac_secret: Option<String>,
}

/// OIDC provider settings.
#[derive(Debug, Clone)]
pub struct OidcConfig {
    pub issuer_url: String,
    pub client_id: String,
    pub client_secret: String,
    pub redirect_uri: String,
    pub provider_name: String,
}

/// Audit sink settings.
#[derive(Debug, Clone, Default)]
pub struct AuditConfig {
    pub enabled: bool,
    pub format: AuditFormat,
}

/// Step-up policy settings (compiled later into a matcher).
#[derive(Debug, Clone, Default)]
pub struct StepUpConfig {
    pub enabled: bool,
    pub paths: Vec<String>,
}

/// Background allowlist refresh settings.
#[derive(Debug, Clone, Default)]
pub struct RefreshConfig {
    pub enabled: bool,
    pub interval: Duration,
}

/// OTLP export settings. The exporter itself is wired outside the core;
/// the gateway only validates and reports the knobs.
#[derive(Debug, Clone, Default)]
pub struct OtlpConfig {
    pub enabled: bool,
    pub endpoint: Option<String>,
}

/// Immutable gateway configuration.
#[derive(Debug, Clone)]
pub struct GateConfig {
    /// Authoritative login host
    pub auth_host: String,
    /// Accepted password set (may be empty when Warden is enabled)
    pub passwords: PasswordSet,
    /// Downstream identity header name
    pub user_header_name: String,
    /// Optional parent domain for cookies (leading dot form)
    pub cookie_domain: Option<String>,
    /// Default interface language
    pub language: Lang,
    pub debug: bool,
    /// Session TTL; the cookie Max-Age and the store TTL both use this
    pub session_expiration: Duration,
    pub session_storage: Option<SessionStorageConfig>,
    pub herald: Option<HeraldConfig>,
    pub warden: Option<WardenConfig>,
    pub totp: Option<TotpConfig>,
    pub oidc: Option<OidcConfig>,
    pub step_up: StepUpConfig,
    pub audit: AuditConfig,
    pub refresh: RefreshConfig,
    pub otlp: OtlpConfig,
}

impl GateConfig {
    /// Load and validate the configuration from the environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        let auth_host = require("AUTH_HOST")?;

        let warden = if env_bool("WARDEN_ENABLED", false)? {
            Some(WardenConfig {
                url: require("WARDEN_URL")?,
                api_key: optional("WARDEN_API_KEY"),
                cache_ttl: Duration::from_secs(env_parse("WARDEN_CACHE_TTL", 300)?),
            })
        } else {
            None
        };

        let passwords = match optional("PASSWORDS") {
            Some(raw) => PasswordSet::parse(&raw)?,
            None => PasswordSet::default(),
        };
        if warden.is_none() && passwords.is_empty() {
            return Err(ConfigError::NoAuthMethod);
        }

        let language = match optional("LANGUAGE") {
            Some(code) => Lang::parse(&code).ok_or_else(|| ConfigError::Invalid {
                name: "LANGUAGE",
                reason: format!("unsupported language: {code}"),
            })?,
            None => Lang::default(),
        };

        let session_storage = if env_bool("SESSION_STORAGE_ENABLED", false)? {
            Some(SessionStorageConfig {
                addr: require("SESSION_STORAGE_REDIS_ADDR")?,
                password: optional("SESSION_STORAGE_REDIS_PASSWORD"),
                db: env_parse("SESSION_STORAGE_REDIS_DB", 0)?,
                key_prefix: optional("SESSION_STORAGE_REDIS_KEY_PREFIX")
                    .unwrap_or_else(|| DEFAULT_KEY_PREFIX.to_string()),
            })
        } else {
            None
        };

        let herald = if env_bool("HERALD_ENABLED", false)? {
            Some(HeraldConfig {
                url: require("HERALD_URL")?,
                api_key: optional("HERALD_API_KEY"),
                hmac_secret: optional("HERALD_HMAC_SECRET"),
            })
        } else {
            None
        };

        let totp = if env_bool("HERALD_TOTP_ENABLED", false)? {
            Some(TotpConfig {
                base_url: require("HERALD_TOTP_BASE_URL")?,
                api_key: optional("HERALD_TOTP_API_KEY"),
                hmac_secret: optional("HERALD_TOTP_HMAC_SECRET"),
            })
        } else {
            None
        };

        let oidc = if env_bool("OIDC_ENABLED", false)? {
            Some(OidcConfig {
                issuer_url: require("OIDC_ISSUER_URL")?,
                client_id: require("OIDC_CLIENT_ID")?,
                client_secret: require("OIDC_CLIENT_SECRET")?,
                redirect_uri: require("OIDC_REDIRECT_URI")?,
                provider_name: optional("OIDC_PROVIDER_NAME")
                    .unwrap_or_else(|| "oidc".to_string()),
            })
        } else {
            None
        };

        let step_up = StepUpConfig {
            enabled: env_bool("STEP_UP_ENABLED", false)?,
            paths: optional("STEP_UP_PATHS")
                .map(|raw| {
                    raw.split(',')
                        .map(|p| p.trim().to_string())
                        .filter(|p| !p.is_empty())
                        .collect()
                })
                .unwrap_or_default(),
        };

        let audit = AuditConfig {
            enabled: env_bool("AUDIT_LOG_ENABLED", false)?,
            format: match optional("AUDIT_LOG_FORMAT").as_deref() {
                None | Some("json") => AuditFormat::Json,
                Some("text") => AuditFormat::Text,
                Some(other) => {
                    return Err(ConfigError::Invalid {
                        name: "AUDIT_LOG_FORMAT",
                        reason: format!("expected json or text, got {other}"),
                    });
                }
            },
        };

        let refresh = RefreshConfig {
            enabled: env_bool("AUTH_REFRESH_ENABLED", false)?,
            interval: Duration::from_secs(env_parse("AUTH_REFRESH_INTERVAL", 300)?),
        };

        let otlp = OtlpConfig {
            enabled: env_bool("OTLP_ENABLED", false)?,
            endpoint: optional("OTLP_ENDPOINT"),
        };

        Ok(Self {
            auth_host,
            passwords,
            user_header_name: optional("USER_HEADER_NAME")
                .unwrap_or_else(|| "X-Forwarded-User".to_string()),
            cookie_domain: optional("COOKIE_DOMAIN"),
            language,
            debug: env_bool("DEBUG", false)?,
            session_expiration: Duration::from_secs(
                env_parse::<u64>("SESSION_EXPIRATION_HOURS", 24)? * 3600,
            ),
            session_storage,
            herald,
            warden,
            totp,
            oidc,
            step_up,
            audit,
            refresh,
            otlp,
        })
    }

    /// Session TTL in whole seconds (cookie Max-Age).
    pub fn session_ttl_secs(&self) -> i64 {
        self.session_expiration.as_secs() as i64
    }
}

fn require(name: &'static str) -> Result<String, ConfigError> {
    optional(name).ok_or(ConfigError::Missing(name))
}

fn optional(name: &str) -> Option<String> {
    env::var(name).ok().map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

fn env_bool(name: &'static str, default: bool) -> Result<bool, ConfigError> {
    match optional(name) {
        None => Ok(default),
        Some(v) => match v.to_ascii_lowercase().as_str() {
            "true" | "1" | "yes" => Ok(true),
            "false" | "0" | "no" => Ok(false),
            other => Err(ConfigError::Invalid {
                name,
                reason: format!("expected a boolean, got {other}"),
            }),
        },
    }
}

fn env_parse<T: std::str::FromStr>(name: &'static str, default: T) -> Result<T, ConfigError>
where
    T::Err: std::fmt::Display,
{
    match optional(name) {
        None => Ok(default),
        Some(v) => v.parse().map_err(|e| ConfigError::Invalid {
            name,
            reason: format!("{e}"),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Mutex, MutexGuard};

    // Environment mutation is process-global; serialize these tests.
    static ENV_LOCK: Mutex<()> = Mutex::new(());

    fn clean_env() -> MutexGuard<'static, ()> {
        let guard = ENV_LOCK.lock().unwrap_or_else(|e| e.into_inner());
        for (key, _) in env::vars() {
            if key.starts_with("AUTH_")
                || key.starts_with("WARDEN_")
                || key.starts_with("HERALD_")
                || key.starts_with("OIDC_")
                || key.starts_with("STEP_UP_")
                || key.starts_with("SESSION_")
                || key.starts_with("AUDIT_")
                || key.starts_with("OTLP_")
                || key == "PASSWORDS"
                || key == "LANGUAGE"
                || key == "COOKIE_DOMAIN"
                || key == "USER_HEADER_NAME"
                || key == "DEBUG"
            {
                unsafe { env::remove_var(&key) };
            }
        }
        guard
    }

    #[test]
    fn test_minimal_password_config() {
        let _guard = clean_env();
        unsafe {
            env::set_var("AUTH_HOST", "login.example.com");
            env::set_var("PASSWORDS", "plaintext:test123");
        }

        let config = GateConfig::from_env().unwrap();
        assert_eq!(config.auth_host, "login.example.com");
        assert!(config.passwords.matches("test123"));
        assert_eq!(config.user_header_name, "X-Forwarded-User");
        assert_eq!(config.session_expiration, Duration::from_secs(24 * 3600));
        assert!(config.warden.is_none());
        assert!(config.session_storage.is_none());
    }

    #[test]
    fn test_missing_auth_host() {
        let _guard = clean_env();
        unsafe { env::set_var("PASSWORDS", "plaintext:x") };
        assert!(matches!(
            GateConfig::from_env(),
            Err(ConfigError::Missing("AUTH_HOST"))
        ));
    }

    #[test]
    fn test_passwords_required_without_warden() {
        let _guard = clean_env();
        unsafe { env::set_var("AUTH_HOST", "login.example.com") };
        assert!(matches!(
            GateConfig::from_env(),
            Err(ConfigError::NoAuthMethod)
        ));
    }

    #[test]
    fn test_warden_allows_empty_passwords() {
        let _guard = clean_env();
        unsafe {
            env::set_var("AUTH_HOST", "login.example.com");
            env::set_var("WARDEN_ENABLED", "true");
            env::set_var("WARDEN_URL", "https://warden.internal");
        }

        let config = GateConfig::from_env().unwrap();
        let warden = config.warden.unwrap();
        assert_eq!(warden.url, "https://warden.internal");
        assert_eq!(warden.cache_ttl, Duration::from_secs(300));
    }

    #[test]
    fn test_invalid_language_rejected() {
        let _guard = clean_env();
        unsafe {
            env::set_var("AUTH_HOST", "login.example.com");
            env::set_var("PASSWORDS", "plaintext:x");
            env::set_var("LANGUAGE", "xx");
        }
        assert!(matches!(
            GateConfig::from_env(),
            Err(ConfigError::Invalid { name: "LANGUAGE", .. })
        ));
    }

    #[test]
    fn test_step_up_paths_parsed() {
        let _guard = clean_env();
        unsafe {
            env::set_var("AUTH_HOST", "login.example.com");
            env::set_var("PASSWORDS", "plaintext:x");
            env::set_var("STEP_UP_ENABLED", "true");
            env::set_var("STEP_UP_PATHS", "/admin*, /billing/*");
        }

        let config = GateConfig::from_env().unwrap();
        assert!(config.step_up.enabled);
        assert_eq!(config.step_up.paths, vec!["/admin*", "/billing/*"]);
    }
}
