//! Text extraction from JSON chat exports.
//!
//! Accepted shapes:
//! - `{"messages": [...]}`, or `{"chats": [...]}` when `messages` is missing or empty;
//!   a non-empty `messages` that is not an array yields nothing
//! - a bare top-level array
//!
//! Items are strings or objects carrying `text` (falling back to `content`).
//! A field holding an array contributes its string parts joined by spaces.

use log::debug;
use serde_json::Value;

/// Extract the message texts from a JSON export. Invalid JSON yields nothing.
pub fn extract_json_texts(raw: &str) -> Vec<String> {
    let value: Value = match serde_json::from_str(raw) {
        Ok(value) => value,
        Err(err) => {
            debug!("ignoring invalid json export: {err}");
            return Vec::new();
        }
    };
    let items: &[Value] = match &value {
        // The first truthy key wins even when it is not an array.
        Value::Object(map) => match ["messages", "chats"]
            .iter()
            .filter_map(|key| map.get(*key))
            .find(|value| is_present(value))
        {
            Some(Value::Array(items)) => items.as_slice(),
            _ => &[],
        },
        Value::Array(items) => items.as_slice(),
        _ => &[],
    };
    items.iter().filter_map(item_text).collect()
}

fn item_text(item: &Value) -> Option<String> {
    match item {
        Value::String(text) => Some(text.clone()),
        Value::Object(map) => {
            let field = ["text", "content"]
                .iter()
                .filter_map(|key| map.get(*key))
                .find(|value| is_present(value))?;
            match field {
                Value::String(text) => Some(text.clone()),
                Value::Array(parts) => Some(
                    parts
                        .iter()
                        .filter_map(Value::as_str)
                        .collect::<Vec<_>>()
                        .join(" "),
                ),
                _ => None,
            }
        }
        _ => None,
    }
}

/// Nulls, `false`, zero and empty strings, arrays or objects fall through to
/// the next key.
fn is_present(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(flag) => *flag,
        Value::Number(number) => number.as_f64().is_some_and(|n| n != 0.0),
        Value::String(text) => !text.is_empty(),
        Value::Array(parts) => !parts.is_empty(),
        Value::Object(map) => !map.is_empty(),
    }
}
