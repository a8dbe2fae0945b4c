//! Step-Up Path Policy
//!
//! Glob patterns (`*` any run, `?` any char) compiled once to anchored
//! regular expressions. A pattern that fails to compile is dropped with a
//! warning, never fatal.

use regex::Regex;

/// Compiled step-up path matcher.
#[derive(Debug, Default)]
pub struct StepUpMatcher {
    enabled: bool,
    patterns: Vec<Regex>,
}

impl StepUpMatcher {
    /// Disabled matcher; `matches` is always false.
    pub fn disabled() -> Self {
        Self::default()
    }

    /// Compile the configured glob patterns.
    pub fn compile(enabled: bool, globs: &[String]) -> Self {
        if !enabled {
            return Self::disabled();
        }

        let mut patterns = Vec::with_capacity(globs.len());
        for glob in globs {
            let glob = glob.trim();
            if glob.is_empty() {
                continue;
            }
            match Regex::new(&glob_to_regex(glob)) {
                Ok(re) => patterns.push(re),
                Err(e) => {
                    tracing::warn!(pattern = %glob, error = %e, "Dropping bad step-up pattern");
                }
            }
        }

        Self { enabled, patterns }
    }

    /// True iff any pattern matches the forwarded path.
    pub fn matches(&self, path: &str) -> bool {
        self.enabled && self.patterns.iter().any(|re| re.is_match(path))
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }
}

/// Translate a glob into an anchored regex: `*` -> `.*`, `?` -> `.`,
/// everything else quoted.
fn glob_to_regex(glob: &str) -> String {
    let mut out = String::with_capacity(glob.len() + 4);
    out.push('^');
    for c in glob.chars() {
        match c {
            '*' => out.push_str(".*"),
            '?' => out.push('.'),
            _ => out.push_str(&regex::escape(&c.to_string())),
        }
    }
    out.push('$');
    out
}
