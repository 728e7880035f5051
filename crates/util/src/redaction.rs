//! Redaction of credential-bearing header values before they reach logs.

use once_cell::sync::Lazy;
use regex::Regex;

static SENSITIVE_HEADER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)(authorization|cookie|token|secret|password|api[-_]?key)").expect("valid header pattern"));

/// Returns `true` when a header name looks like it carries credentials.
pub fn is_sensitive_header(name: &str) -> bool {
    SENSITIVE_HEADER.is_match(name)
}

/// Returns the header value to log: the value itself, or `<redacted>` for
/// credential-bearing headers.
pub fn redact_header_value(name: &str, value: &str) -> String {
    if is_sensitive_header(name) {
        "<redacted>".to_string()
    } else {
        value.to_string()
    }
}
