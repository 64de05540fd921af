//! Parsing of JSON replies from chat models
//!
//! Models asked for JSON still wrap it in code fences or prose now and then,
//! so the payload is located before parsing.

use serde_json::{Map, Value};

use crate::{PipelineError, Result};

/// Locate the JSON payload in a model reply.
///
/// Tries, in order: the whole reply, a fenced code block, and the outermost
/// object or array.
pub fn extract_json(text: &str) -> Option<&str> {
    let trimmed = text.trim();
    if trimmed.starts_with('{') || trimmed.starts_with('[') {
        return Some(trimmed);
    }

    for fence in ["```json", "```JSON", "```"] {
        if let Some(start) = trimmed.find(fence) {
            let content = &trimmed[start + fence.len()..];
            if let Some(end) = content.find("```") {
                let inner = content[..end].trim();
                if !inner.is_empty() {
                    return Some(inner);
                }
            }
        }
    }

    let start = trimmed.find(['{', '['])?;
    let close = if trimmed[start..].starts_with('{') { '}' } else { ']' };
    let end = trimmed.rfind(close)?;
    (end > start).then(|| &trimmed[start..=end])
}

fn parse_value(text: &str) -> Result<Value> {
    let payload = extract_json(text)
        .ok_or_else(|| PipelineError::MalformedResponse("reply contains no JSON".to_string()))?;
    serde_json::from_str(payload)
        .map_err(|e| PipelineError::MalformedResponse(format!("reply is not valid JSON: {}", e)))
}

/// Parse a reply that must be a JSON object
pub fn parse_json_object(text: &str) -> Result<Map<String, Value>> {
    match parse_value(text)? {
        Value::Object(map) => Ok(map),
        other => Err(PipelineError::MalformedResponse(format!(
            "expected a JSON object, got {}",
            kind_of(&other)
        ))),
    }
}

/// Parse a list of strings, given either as a bare array or as an object
/// holding the array under one of `keys`.
///
/// Blank and non-string entries are dropped.
pub fn parse_string_list(text: &str, keys: &[&str]) -> Result<Vec<String>> {
    let value = parse_value(text)?;
    let list = match value {
        Value::Array(items) => items,
        Value::Object(mut map) => keys
            .iter()
            .find_map(|key| match map.remove(*key) {
                Some(Value::Array(items)) => Some(items),
                _ => None,
            })
            .ok_or_else(|| {
                PipelineError::MalformedResponse(format!(
                    "expected a list under one of {:?}",
                    keys
                ))
            })?,
        other => {
            return Err(PipelineError::MalformedResponse(format!(
                "expected a JSON list, got {}",
                kind_of(&other)
            )))
        }
    };

    Ok(list
        .into_iter()
        .filter_map(|item| match item {
            Value::String(s) => Some(s.trim().to_string()),
            _ => None,
        })
        .filter(|s| !s.is_empty())
        .collect())
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
