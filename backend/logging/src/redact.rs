//! Log Redaction
//!
//! Scrubs API keys and bearer tokens from strings prior to logging.
//! Provider error bodies and transport errors may echo request URLs or
//! headers, so they pass through here first.

use regex::Regex;
use std::sync::LazyLock;

static API_KEY_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(sk-[a-zA-Z0-9_\-]{20,})|(AIza[0-9A-Za-z_\-]{30,})|(Bearer\s+[a-zA-Z0-9\-\._~+/]+=*)").unwrap()
});
static KEY_PARAM_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)([?&](?:key|api_key|apikey)=)[^&\s]+").unwrap());

/// Redacts sensitive patterns in a string.
pub fn redact_sensitive_data(input: &str) -> String {
    let redacted = API_KEY_RE.replace_all(input, "[REDACTED_TOKEN]");
    KEY_PARAM_RE.replace_all(&redacted, "${1}[REDACTED]").into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_redaction() {
        let raw = "POST failed with Bearer eyJhbGciOiJIUzI1NiIsInR5cCI6IkpXVCJ9";
        let clean = redact_sensitive_data(raw);
        assert!(!clean.contains("eyJhbGciOiJIUzI1NiIsInR5cCI6IkpXVCJ9"));
    }

    #[test]
    fn redacts_query_keys() {
        let raw = "error sending request for url (https://host/v1/models/x:generateContent?key=secret123&alt=json)";
        let clean = redact_sensitive_data(raw);
        assert!(!clean.contains("secret123"));
        assert!(clean.contains("?key=[REDACTED]&alt=json"));
    }

    #[test]
    fn redacts_provider_keys() {
        let clean = redact_sensitive_data("key sk-abcdefghijklmnopqrstuvwxyz0123 rejected");
        assert_eq!(clean, "key [REDACTED_TOKEN] rejected");
        let clean = redact_sensitive_data("AIzaSyA1234567890abcdefghijklmnopqrstu");
        assert_eq!(clean, "[REDACTED_TOKEN]");
    }

    #[test]
    fn leaves_plain_text_alone() {
        assert_eq!(redact_sensitive_data("₦500 - Nigerian Naira"), "₦500 - Nigerian Naira");
    }
}
