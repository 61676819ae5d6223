//! # Response normalization
//!
//! Completion services do not agree on a response shape. This module turns
//! whatever came back into display text, or `None` when there is nothing to
//! show.
//!
//! Accepted shapes, checked against the first entry of `choices`:
//!
//! | Shape | Example |
//! |-------|---------|
//! | chat message object | `{"choices":[{"message":{"content":"x"}}]}` |
//! | string `messages` | `{"choices":[{"messages":"x"}]}` |
//! | string `text` | `{"choices":[{"text":"x"}]}` |
//! | plain text | `"x"` |
//!
//! A JSON string value is parsed first, so a response that arrives as
//! serialized JSON text is handled like the structured value. Anything that
//! does not match falls back to the stringified response (and is logged).
//!
//! Instruction markers leaked by some models (`[INST] … [/INST]`) are removed
//! before the text is trimmed.
//!
//! ```rust
//! use frost_chat::normalize::extract_text;
//! use serde_json::json;
//!
//! let raw = json!({"choices": [{"message": {"content": " Salut ! "}}]});
//! assert_eq!(extract_text(Some(&raw)).as_deref(), Some("Salut !"));
//! assert_eq!(extract_text(None), None);
//! ```

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value as JsonValue;
use tracing::{debug, warn};

/// Closed `[INST] … [/INST]` spans plus the whitespace that follows them.
static CLOSED_INST_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)\[INST\].*?\[/INST\]\s*").expect("valid regex"));

/// A trailing `[INST]` that is never closed, through end of text.
static OPEN_INST_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)\[INST\].*").expect("valid regex"));

/// Convert a raw completion response into display text.
///
/// Returns `None` when the response is absent or yields no text after
/// cleaning; callers must treat that as "answer unavailable" and not render
/// an empty bubble. This function never fails.
pub fn extract_text(response: Option<&JsonValue>) -> Option<String> {
    let response = response?;

    let text = match response {
        JsonValue::String(raw) => match serde_json::from_str::<JsonValue>(raw) {
            Ok(parsed) => text_from_structured(&parsed),
            Err(_) => Some(raw.clone()),
        },
        other => text_from_structured(other),
    }?;

    let cleaned = strip_instruction_markers(&text);
    let cleaned = cleaned.trim();

    if cleaned.is_empty() {
        debug!("Normalized response is empty");
        None
    } else {
        Some(cleaned.to_string())
    }
}

/// Remove `[INST]` artifacts: closed spans first, then an unterminated tail.
pub fn strip_instruction_markers(text: &str) -> String {
    let without_closed = CLOSED_INST_RE.replace_all(text, "");
    let without_closed = without_closed.trim();
    OPEN_INST_RE.replace_all(without_closed, "").into_owned()
}

fn text_from_structured(response: &JsonValue) -> Option<String> {
    let Some(first) = first_choice(response) else {
        warn!("Unrecognized completion response shape, using it verbatim");
        return Some(stringify(response));
    };

    if let Some(message) = first.get("message").filter(|m| m.is_object()) {
        return match message.get("content") {
            None | Some(JsonValue::Null) => None,
            Some(JsonValue::String(content)) => Some(content.clone()),
            Some(other) => Some(stringify(other)),
        };
    }

    if let Some(JsonValue::String(messages)) = first.get("messages") {
        return Some(messages.clone());
    }

    if let Some(JsonValue::String(text)) = first.get("text") {
        return Some(text.clone());
    }

    warn!("Completion choice has no known text field, using the whole response");
    Some(stringify(response))
}

fn first_choice(response: &JsonValue) -> Option<&JsonValue> {
    response
        .get("choices")?
        .as_array()?
        .first()
        .filter(|choice| choice.is_object())
}

/// Strings render as themselves, everything else as compact JSON.
fn stringify(value: &JsonValue) -> String {
    match value {
        JsonValue::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn extract(value: JsonValue) -> Option<String> {
        extract_text(Some(&value))
    }

    #[test]
    fn test_known_shapes_yield_the_content() {
        assert_eq!(
            extract(json!({"choices": [{"message": {"content": "x"}}]})).as_deref(),
            Some("x")
        );
        assert_eq!(
            extract(json!({"choices": [{"messages": "x"}]})).as_deref(),
            Some("x")
        );
        assert_eq!(extract(json!({"choices": [{"text": "x"}]})).as_deref(), Some("x"));
        assert_eq!(extract(json!("x")).as_deref(), Some("x"));
    }

    #[test]
    fn test_json_encoded_string_is_parsed() {
        let raw = json!(r#"{"choices":[{"messages":"  bonjour  "}]}"#);
        assert_eq!(extract(raw).as_deref(), Some("bonjour"));
    }

    #[test]
    fn test_absent_response_is_none() {
        assert_eq!(extract_text(None), None);
    }

    #[test]
    fn test_malformed_json_text_is_returned_trimmed() {
        assert_eq!(
            extract(json!("  {not json at all ")).as_deref(),
            Some("{not json at all")
        );
    }

    #[test]
    fn test_instruction_markers_are_stripped() {
        assert_eq!(
            extract(json!("[INST]secret[/INST]visible")).as_deref(),
            Some("visible")
        );
        assert_eq!(extract(json!("...[INST]ignored")).as_deref(), Some("..."));
        assert_eq!(
            strip_instruction_markers("a [INST]one\ntwo[/INST]\n b [INST]tail\nmore"),
            "a b "
        );
    }

    #[test]
    fn test_marker_only_response_is_none() {
        assert_eq!(extract(json!("[INST]only instructions[/INST]   ")), None);
    }

    #[test]
    fn test_null_or_missing_message_content_is_none() {
        assert_eq!(extract(json!({"choices": [{"message": {"content": null}}]})), None);
        assert_eq!(extract(json!({"choices": [{"message": {}}]})), None);
    }

    #[test]
    fn test_empty_string_is_none() {
        assert_eq!(extract(json!("   ")), None);
    }

    #[test]
    fn test_unknown_shapes_fall_back_to_stringified_response() {
        let raw = json!({"choices": [{"delta": "x"}]});
        assert_eq!(extract(raw.clone()).as_deref(), Some(raw.to_string().as_str()));

        let raw = json!({"result": "nope"});
        assert_eq!(extract(raw).as_deref(), Some(r#"{"result":"nope"}"#));

        let raw = json!({"choices": []});
        assert_eq!(extract(raw).as_deref(), Some(r#"{"choices":[]}"#));

        assert_eq!(extract(json!(42)).as_deref(), Some("42"));
    }

    #[test]
    fn test_message_takes_precedence_over_text_fields() {
        let raw = json!({"choices": [{"message": {"content": "first"}, "messages": "second", "text": "third"}]});
        assert_eq!(extract(raw).as_deref(), Some("first"));

        let raw = json!({"choices": [{"messages": "second", "text": "third"}]});
        assert_eq!(extract(raw).as_deref(), Some("second"));
    }

    #[test]
    fn test_only_first_choice_is_used() {
        let raw = json!({"choices": [{"text": "one"}, {"text": "two"}]});
        assert_eq!(extract(raw).as_deref(), Some("one"));
    }
}
