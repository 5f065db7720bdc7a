//! Extraction of `{support, speech}` from the model's final text.

use council_core::{FALLBACK_PLAN_SPEECH, ResponsePayload};
use serde_json::Value;

/// Parse the final answer. Returns the payload and whether it parsed.
///
/// Unparseable text yields the fallback payload. Support is dropped when no
/// plan is on the table and otherwise rounded into 0..=10.
pub fn parse_final_answer(text: &str, has_plan: bool) -> (ResponsePayload, bool) {
    let Some(object) = extract_object(text) else {
        return (ResponsePayload::fallback(), false);
    };
    let support = if has_plan {
        object.get("support").and_then(support_score)
    } else {
        None
    };
    let speech = object
        .get("speech")
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .unwrap_or(FALLBACK_PLAN_SPEECH)
        .to_string();
    (ResponsePayload { support, speech }, true)
}

fn support_score(value: &Value) -> Option<u8> {
    let n = value.as_f64().filter(|n| n.is_finite())?;
    Some(n.round().clamp(0.0, 10.0) as u8)
}

/// Accept a bare object, a fenced block, or an object embedded in prose.
fn extract_object(text: &str) -> Option<serde_json::Map<String, Value>> {
    let trimmed = strip_fences(text.trim());
    if let Ok(Value::Object(map)) = serde_json::from_str::<Value>(trimmed) {
        return Some(map);
    }
    let start = trimmed.find('{')?;
    let end = trimmed.rfind('}')?;
    if end <= start {
        return None;
    }
    match serde_json::from_str::<Value>(&trimmed[start..=end]) {
        Ok(Value::Object(map)) => Some(map),
        _ => None,
    }
}

fn strip_fences(text: &str) -> &str {
    let Some(rest) = text.strip_prefix("```") else {
        return text;
    };
    let rest = rest.strip_prefix("json").unwrap_or(rest);
    rest.strip_suffix("```").unwrap_or(rest).trim()
}
