//! Classification of provider output entries.
//!
//! Providers return their results in one of two supported shapes: a
//! remote URL to fetch, or an inline base64 payload. Anything else is
//! preserved as opaque text bytes so no artifact is ever silently
//! dropped; the persister will store it full-size without a thumbnail.

use base64::Engine;
use serde_json::Value;

/// What to do with one entry of a provider's output list.
#[derive(Debug, Clone, PartialEq)]
pub enum OutputEntry {
    /// Remote artifact to fetch with a bounded timeout.
    Url(String),
    /// Inline payload, already decoded from base64.
    Inline(Vec<u8>),
    /// Unrecognized entry preserved verbatim as text bytes.
    Opaque(Vec<u8>),
}

/// Classify one provider output entry.
pub fn classify_output_entry(value: &Value) -> OutputEntry {
    match value {
        Value::String(s) => {
            if s.starts_with("http://") || s.starts_with("https://") {
                return OutputEntry::Url(s.clone());
            }
            match base64::engine::general_purpose::STANDARD.decode(s) {
                Ok(bytes) => OutputEntry::Inline(bytes),
                Err(_) => OutputEntry::Opaque(s.clone().into_bytes()),
            }
        }
        other => OutputEntry::Opaque(other.to_string().into_bytes()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn http_and_https_urls_are_fetched() {
        assert_eq!(
            classify_output_entry(&Value::String("http://example.com/a.png".into())),
            OutputEntry::Url("http://example.com/a.png".into())
        );
        assert_eq!(
            classify_output_entry(&Value::String("https://example.com/a.png".into())),
            OutputEntry::Url("https://example.com/a.png".into())
        );
    }

    #[test]
    fn base64_strings_are_decoded_inline() {
        let encoded = base64::engine::general_purpose::STANDARD.encode(b"fake image bytes");
        match classify_output_entry(&Value::String(encoded)) {
            OutputEntry::Inline(bytes) => assert_eq!(bytes, b"fake image bytes"),
            other => panic!("expected inline, got {other:?}"),
        }
    }

    #[test]
    fn undecodable_strings_become_opaque_text() {
        // '!' is outside the base64 alphabet.
        match classify_output_entry(&Value::String("definitely not base64!".into())) {
            OutputEntry::Opaque(bytes) => assert_eq!(bytes, b"definitely not base64!"),
            other => panic!("expected opaque, got {other:?}"),
        }
    }

    #[test]
    fn non_string_entries_become_opaque_json_text() {
        match classify_output_entry(&serde_json::json!({ "unexpected": true })) {
            OutputEntry::Opaque(bytes) => {
                assert_eq!(bytes, br#"{"unexpected":true}"#);
            }
            other => panic!("expected opaque, got {other:?}"),
        }
        match classify_output_entry(&serde_json::json!(42)) {
            OutputEntry::Opaque(bytes) => assert_eq!(bytes, b"42"),
            other => panic!("expected opaque, got {other:?}"),
        }
    }

    #[test]
    fn nothing_is_dropped() {
        // Every JSON value classifies to exactly one variant; none error.
        for value in [
            serde_json::json!(null),
            serde_json::json!(true),
            serde_json::json!([1, 2, 3]),
            serde_json::json!(""),
        ] {
            let _ = classify_output_entry(&value);
        }
    }
}
