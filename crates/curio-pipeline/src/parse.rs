//! Decoding of JSON replies from the text agents.

use serde_json::{Map, Value};

use curio_core::error::{CurioError, Result};

/// Strip a Markdown code fence around a reply, if present.
pub fn strip_code_fences(text: &str) -> &str {
    let trimmed = text.trim();

    // ```json ... ``` first
    if let Some(start) = trimmed.find("```json") {
        let after = &trimmed[start + 7..];
        if let Some(end) = after.find("```") {
            return after[..end].trim();
        }
    }

    if let Some(start) = trimmed.find("```") {
        let after = &trimmed[start + 3..];
        // Skip an optional language tag on the fence line
        let content_start = after.find('\n').map_or(0, |p| p + 1);
        let after = &after[content_start..];
        if let Some(end) = after.find("```") {
            return after[..end].trim();
        }
    }

    trimmed
}

fn decode(stage: &str, record_id: &str, reply: &str) -> Result<Value> {
    serde_json::from_str(strip_code_fences(reply)).map_err(|e| {
        CurioError::contract(stage, record_id, format!("reply is not valid JSON: {}", e))
    })
}

/// Decode a reply that must be a JSON object carrying every key in `required`.
pub fn expect_object(
    stage: &str,
    record_id: &str,
    reply: &str,
    required: &[&str],
) -> Result<Map<String, Value>> {
    let Value::Object(map) = decode(stage, record_id, reply)? else {
        return Err(CurioError::contract(stage, record_id, "expected a JSON object"));
    };
    if let Some(missing) = required.iter().find(|k| !map.contains_key(**k)) {
        return Err(CurioError::contract(
            stage,
            record_id,
            format!("missing key '{}'", missing),
        ));
    }
    Ok(map)
}

/// Decode a reply that must be a top-level JSON array.
pub fn expect_array(stage: &str, record_id: &str, reply: &str) -> Result<Vec<Value>> {
    match decode(stage, record_id, reply)? {
        Value::Array(items) => Ok(items),
        _ => Err(CurioError::contract(stage, record_id, "expected a JSON array")),
    }
}

/// Render a JSON value as plain text: strings unquoted, null empty.
pub fn value_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}
