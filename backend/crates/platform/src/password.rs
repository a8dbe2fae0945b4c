//! Configured-Password Verification
//!
//! The gateway authenticates password logins against a fixed set of
//! operator-configured hashes, not a user database. Supported entry
//! formats (`<algo>:<payload>`, `|`-separated):
//! - `plaintext` - literal comparison
//! - `md5` / `sha512` - hex digest comparison, case-insensitive
//! - `bcrypt` - verified by the bcrypt verifier against the stored hash
//!
//! Hex-style payloads and candidate inputs are normalized identically
//! (whitespace stripped, uppercased) at load and at check time, which is
//! what makes the digest comparison case-insensitive. Bcrypt payloads are
//! kept in their original case: uppercasing a bcrypt hash corrupts it, so
//! bcrypt entries skip normalization entirely.

use md5::Md5;
use sha2::{Digest, Sha512};
use thiserror::Error;

use crate::crypto::constant_time_eq;

/// Supported password hash algorithms
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Algorithm {
    Plaintext,
    Md5,
    Sha512,
    Bcrypt,
}

impl Algorithm {
    fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "plaintext" => Some(Algorithm::Plaintext),
            "md5" => Some(Algorithm::Md5),
            "sha512" => Some(Algorithm::Sha512),
            "bcrypt" => Some(Algorithm::Bcrypt),
            _ => None,
        }
    }
}

/// A single configured password entry
#[derive(Debug, Clone, PartialEq, Eq)]
struct Entry {
    algorithm: Algorithm,
    payload: String,
}

/// Errors while parsing the `PASSWORDS` value
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PasswordParseError {
    #[error("Unknown password algorithm: {0}")]
    UnknownAlgorithm(String),

    #[error("Password entry without an algorithm prefix")]
    MissingAlgorithm,

    #[error("Empty password hash")]
    EmptyHash,
}

/// The set of passwords accepted by the gateway.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PasswordSet {
    entries: Vec<Entry>,
}

impl PasswordSet {
    /// Parse a `|`-separated list of `<algo>:<hash>` entries.
    ///
    /// An entry without an `<algo>:` prefix inherits the algorithm of the
    /// preceding entry, so `plaintext:a|b|c` configures three plaintext
    /// passwords.
    pub fn parse(raw: &str) -> Result<Self, PasswordParseError> {
        let mut entries = Vec::new();
        let mut current: Option<Algorithm> = None;

        for part in raw.split('|') {
            let part = part.trim();
            if part.is_empty() {
                continue;
            }

            let (algorithm, payload) = match part.split_once(':') {
                Some((algo, payload)) => {
                    let algorithm = Algorithm::parse(algo)
                        .ok_or_else(|| PasswordParseError::UnknownAlgorithm(algo.to_string()))?;
                    (algorithm, payload)
                }
                None => (current.ok_or(PasswordParseError::MissingAlgorithm)?, part),
            };
            current = Some(algorithm);

            let payload = match algorithm {
                // Bcrypt hashes are case-sensitive; keep them verbatim.
                Algorithm::Bcrypt => payload.trim().to_string(),
                _ => normalize(payload),
            };
            if payload.is_empty() {
                return Err(PasswordParseError::EmptyHash);
            }

            entries.push(Entry { algorithm, payload });
        }

        Ok(Self { entries })
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True iff any configured entry matches the candidate.
    pub fn matches(&self, candidate: &str) -> bool {
        let normalized = normalize(candidate);

        let mut matched = false;
        for entry in &self.entries {
            let hit = match entry.algorithm {
                Algorithm::Plaintext => {
                    constant_time_eq(entry.payload.as_bytes(), normalized.as_bytes())
                }
                Algorithm::Md5 => {
                    let digest = hex::encode_upper(Md5::digest(normalized.as_bytes()));
                    constant_time_eq(entry.payload.as_bytes(), digest.as_bytes())
                }
                Algorithm::Sha512 => {
                    let digest = hex::encode_upper(Sha512::digest(normalized.as_bytes()));
                    constant_time_eq(entry.payload.as_bytes(), digest.as_bytes())
                }
                Algorithm::Bcrypt => bcrypt::verify(candidate, &entry.payload).unwrap_or(false),
            };
            matched |= hit;
        }

        matched
    }
}

/// Strip all whitespace and uppercase.
fn normalize(s: &str) -> String {
    s.chars()
        .filter(|c| !c.is_whitespace())
        .collect::<String>()
        .to_uppercase()
}
