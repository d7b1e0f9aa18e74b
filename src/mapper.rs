//! Maps a normalized response object onto [`CardDetails`].
//!
//! Endpoint versions disagree on key spellings (`company` vs `company_name`,
//! `mobile` vs `phone`); the mapper resolves aliases in a fixed order and
//! treats every missing key as "not found". Pure and total: it cannot fail.

use crate::types::CardDetails;
use serde_json::{Map, Value};

/// Build a [`CardDetails`] from the decoded response object and the measured
/// round-trip time.
///
/// `processing_time` always comes from `elapsed_seconds`, never from the
/// response body. The full object moves into `raw_response` unmodified.
pub fn map_fields(raw: Map<String, Value>, elapsed_seconds: f64) -> CardDetails {
    CardDetails {
        name: text_field(&raw, &["name"]),
        designation: text_field(&raw, &["designation"]),
        company: text_field(&raw, &["company", "company_name"]),
        mobile: text_field(&raw, &["mobile", "phone"]),
        email: text_field(&raw, &["email"]),
        address: text_field(&raw, &["address"]),
        confidence: raw.get("confidence").and_then(Value::as_f64),
        processing_time: Some(elapsed_seconds),
        raw_response: raw,
    }
}

/// First present key wins, even when its value is null.
fn text_field(obj: &Map<String, Value>, keys: &[&str]) -> Option<String> {
    let value = keys.iter().find_map(|key| obj.get(*key))?;
    scalar_to_string(value)
}

/// Endpoints sometimes return phone numbers or postcodes as JSON numbers;
/// render those as text rather than dropping them.
fn scalar_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}
