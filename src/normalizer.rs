//! Lenient recovery of a single JSON object from a messy endpoint reply.
//!
//! The OCR endpoint nominally returns JSON but in practice replies with
//! double-encoded strings, stray wrapping quotes, trailing sentence
//! punctuation, escaped quotes, or several JSON objects concatenated with
//! explanatory text. [`normalize`] runs an ordered chain of recovery steps,
//! each a pure function conditional on a detectable textual marker:
//!
//! 1. Trim surrounding whitespace
//! 2. Truncate to the first complete `{...}` when several objects are present
//! 3. Strip one wrapping quote pair
//! 4. Strip a trailing period
//! 5. Unescape `\"` and `\\`
//! 6. Parse, falling back to the first-`{`-to-last-`}` substring
//! 7. Unwrap one remaining level of string-encoding
//!
//! Every step is conditional on what the text actually looks like; nothing
//! guesses at field values. Recovery is all-or-nothing: either a full object
//! comes back or the call fails with [`ParseError`].

use serde_json::{Map, Value};
use std::borrow::Cow;
use tracing::{debug, warn};

/// How much of the original text a [`ParseError::Unparsable`] carries.
const SNIPPET_LEN: usize = 200;

/// Failure to recover a JSON object from the reply text.
#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    /// No recovery step produced parseable JSON.
    #[error("could not parse endpoint reply as JSON: {snippet}")]
    Unparsable { snippet: String },

    /// The reply parsed, but to something other than an object.
    #[error("endpoint reply is valid JSON but not an object")]
    NotAnObject,
}

/// Recover a single JSON object from raw endpoint reply text.
pub fn normalize(raw: &str) -> Result<Map<String, Value>, ParseError> {
    let text = raw.trim();
    let text = truncate_to_first_object(text);
    let text = strip_wrapping_quotes(text);
    let text = strip_trailing_period(text);
    let text = unescape_quotes(text);

    let value = parse_lenient(&text).ok_or_else(|| ParseError::Unparsable {
        snippet: snippet_of(raw),
    })?;
    into_object(value)
}

/// When the text holds more than one `{`, cut it down to the first complete
/// object by tracking brace depth.
///
/// The scan is not string-aware: a brace inside a quoted value shifts the
/// depth and can end the object early. If the depth never returns to zero
/// the text is returned whole.
fn truncate_to_first_object(text: &str) -> &str {
    if text.matches('{').count() <= 1 {
        return text;
    }
    warn!("reply contains multiple JSON objects, keeping the first");
    let mut depth: i32 = 0;
    for (i, ch) in text.char_indices() {
        match ch {
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return &text[..=i];
                }
            }
            _ => {}
        }
    }
    text
}

/// Strip exactly one leading and one trailing quote when the text is
/// wrapped in them (the endpoint double-encoding the object as a string).
fn strip_wrapping_quotes(text: &str) -> &str {
    if text.len() >= 2 && text.starts_with('"') && text.ends_with('"') {
        debug!("stripping wrapping quotes from reply");
        &text[1..text.len() - 1]
    } else {
        text
    }
}

/// Drop a trailing period (the endpoint appending sentence punctuation).
fn strip_trailing_period(text: &str) -> &str {
    text.strip_suffix('.').unwrap_or(text)
}

/// Unescape `\"` to `"` and `\\` to `\`, in that order, when any backslash
/// is present.
fn unescape_quotes(text: &str) -> Cow<'_, str> {
    if text.contains('\\') {
        debug!("unescaping backslash sequences in reply");
        Cow::Owned(text.replace("\\\"", "\"").replace("\\\\", "\\"))
    } else {
        Cow::Borrowed(text)
    }
}

/// Parse the text as JSON, falling back to the substring between the first
/// `{` and the last `}` inclusive.
fn parse_lenient(text: &str) -> Option<Value> {
    if let Ok(value) = serde_json::from_str(text) {
        return Some(value);
    }
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    if end < start {
        return None;
    }
    debug!("direct parse failed, retrying on brace-delimited substring");
    serde_json::from_str(&text[start..=end]).ok()
}

/// Reduce a parsed value to an object, unwrapping one remaining level of
/// string-encoding if needed.
fn into_object(value: Value) -> Result<Map<String, Value>, ParseError> {
    match value {
        Value::Object(map) => Ok(map),
        Value::String(inner) => match serde_json::from_str(inner.trim()) {
            Ok(Value::Object(map)) => Ok(map),
            _ => Err(ParseError::NotAnObject),
        },
        _ => Err(ParseError::NotAnObject),
    }
}

fn snippet_of(raw: &str) -> String {
    raw.chars().take(SNIPPET_LEN).collect()
}
