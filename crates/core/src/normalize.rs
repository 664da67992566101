//! Recursive decoding of JSON documents embedded as strings.
//!
//! Lambda payloads routinely carry JSON inside JSON (an API Gateway event's
//! `body`, a Step Functions input, ...). For display, every string that looks
//! like a JSON object is decoded in place, recursively.

use serde_json::Value;

/// Maximum nesting (decoded strings plus containers) that [`normalize`] descends into.
/// Deeper values are returned as they are.
pub const MAX_NORMALIZE_DEPTH: usize = 64;

/// Decode JSON-object strings nested anywhere inside `value`.
///
/// - a string starting with `{` that parses as JSON is replaced by its parsed
///   (and normalized) value; if it does not parse it is kept unchanged
/// - objects and arrays are normalized element-wise, keys and order unchanged
/// - every other value is returned as is
///
/// Never fails.
pub fn normalize(value: Value) -> Value {
    normalize_at(value, 0)
}

/// Normalize a raw text payload.
pub fn normalize_text(text: &str) -> Value {
    normalize(Value::String(text.to_owned()))
}

fn normalize_at(value: Value, depth: usize) -> Value {
    if depth >= MAX_NORMALIZE_DEPTH {
        return value;
    }
    match value {
        Value::String(s) if s.starts_with('{') => match serde_json::from_str::<Value>(&s) {
            Ok(parsed) => normalize_at(parsed, depth + 1),
            Err(_) => Value::String(s),
        },
        Value::Object(map) => Value::Object(
            map.into_iter()
                .map(|(k, v)| (k, normalize_at(v, depth + 1)))
                .collect(),
        ),
        Value::Array(items) => Value::Array(
            items
                .into_iter()
                .map(|v| normalize_at(v, depth + 1))
                .collect(),
        ),
        other => other,
    }
}

/// Split a newline-delimited log blob into its lines.
///
/// Accepts `\n` and `\r\n` terminators; a trailing terminator does not
/// produce an empty final line.
pub fn split_log_lines(logs: &str) -> Vec<String> {
    logs.lines().map(str::to_owned).collect()
}
