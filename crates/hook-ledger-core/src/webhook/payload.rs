//! Safe lookups over untyped webhook payload trees.
//!
//! Every accessor states its fallback: nested objects that are absent read
//! as empty, nested values that are present but not objects are a structural
//! failure, and leaf strings that are absent, null or not strings read as
//! `None`.

use serde_json::{Map, Value};

/// JSON object as found inside a payload
pub type Object = Map<String, Value>;

/// Structural problem found while walking a payload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShapeError(pub String);

/// View the payload root as an object.
pub fn root(payload: &Value) -> Result<&Object, ShapeError> {
    payload
        .as_object()
        .ok_or_else(|| ShapeError(format!("payload root is {}, expected object", kind_of(payload))))
}

/// Look up a nested object. Absent reads as `None`.
pub fn nested<'a>(parent: Option<&'a Object>, key: &str) -> Result<Option<&'a Object>, ShapeError> {
    let Some(value) = parent.and_then(|p| p.get(key)) else {
        return Ok(None);
    };

    value
        .as_object()
        .map(Some)
        .ok_or_else(|| ShapeError(format!("'{}' is {}, expected object", key, kind_of(value))))
}

/// Look up a string leaf. Empty strings read as `None`.
pub fn text<'a>(parent: Option<&'a Object>, key: &str) -> Option<&'a str> {
    parent
        .and_then(|p| p.get(key))
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
}

/// Look up a string leaf, defaulting to the empty string.
pub fn text_or_empty(parent: Option<&Object>, key: &str) -> String {
    text(parent, key).unwrap_or_default().to_string()
}

/// Look up an identifier that upstream may send as a number or a string.
///
/// Zero and the empty string read as `None`.
pub fn identifier(parent: Option<&Object>, key: &str) -> Option<String> {
    match parent.and_then(|p| p.get(key))? {
        Value::Number(n) if n.as_u64() == Some(0) => None,
        Value::Number(n) => Some(n.to_string()),
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        _ => None,
    }
}

/// Check a boolean flag; only a JSON `true` counts.
pub fn flag(parent: Option<&Object>, key: &str) -> bool {
    matches!(parent.and_then(|p| p.get(key)), Some(Value::Bool(true)))
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

#[cfg(test)]
#[path = "payload_tests.rs"]
mod tests;
