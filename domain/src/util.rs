//! Shared utility functions.

use serde_json::{Map, Value};

/// Maximum length of a string argument in log summaries.
pub const ARGUMENT_SUMMARY_MAX: usize = 64;
/// Maximum length of a string result in log summaries.
pub const RESULT_SUMMARY_MAX: usize = 120;

/// Truncate a string to approximately `max_bytes` without splitting a UTF-8
/// character boundary.
///
/// Returns a sub-slice of the original string. If the string is shorter than
/// `max_bytes`, the entire string is returned unchanged.
pub fn truncate_str(s: &str, max_bytes: usize) -> &str {
    if s.len() <= max_bytes {
        return s;
    }
    let mut end = max_bytes;
    while end > 0 && !s.is_char_boundary(end) {
        end -= 1;
    }
    &s[..end]
}

/// JSON type name of a value, used in place of non-scalar values in logs.
pub fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Log-safe rendering of a single value.
///
/// Scalars are kept, strings are truncated to `max_bytes`, anything else is
/// reduced to its type name.
pub fn summarize_value(value: &Value, max_bytes: usize) -> Value {
    match value {
        Value::Bool(_) | Value::Number(_) => value.clone(),
        Value::String(s) => Value::String(truncate_str(s, max_bytes).to_string()),
        other => Value::String(json_type_name(other).to_string()),
    }
}

/// Log-safe rendering of tool arguments.
pub fn summarize_arguments(arguments: &Map<String, Value>) -> Value {
    Value::Object(
        arguments
            .iter()
            .map(|(k, v)| (k.clone(), summarize_value(v, ARGUMENT_SUMMARY_MAX)))
            .collect(),
    )
}

/// Log-safe rendering of a tool result.
pub fn summarize_result(result: &Value) -> Value {
    summarize_value(result, RESULT_SUMMARY_MAX)
}
