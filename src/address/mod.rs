//! Address helpers: domain extraction and the permissive shape check applied
//! before any SMTP dialogue.

use std::sync::OnceLock;

use regex::Regex;
use tracing::error;

// Prefix match only: trailing garbage after the first valid shape is tolerated.
const SYNTAX_PATTERN: &str = r"^[^@]+@[^@]+\.[^@]+";

static SYNTAX_RE: OnceLock<Regex> = OnceLock::new();

fn syntax_regex() -> &'static Regex {
    SYNTAX_RE.get_or_init(|| {
        Regex::new(SYNTAX_PATTERN)
            .unwrap_or_else(|err| panic!("address syntax regex failed to compile: {err}"))
    })
}

/// Returns everything after the last `@`.
///
/// Input without any `@` is returned unchanged; callers get a degraded domain
/// rather than an error.
pub fn extract_domain(email: &str) -> &str {
    match email.rsplit_once('@') {
        Some((_, domain)) => domain,
        None => email,
    }
}

/// Minimal shape check: `local@label.tld`, no RFC 5321/5322 grammar.
pub fn validate_syntax(email: &str) -> bool {
    if syntax_regex().is_match(email) {
        true
    } else {
        error!("Invalid email address syntax: {email}");
        false
    }
}
