//! Reference-preserving JSON from the booking backend.
//!
//! The backend serializes with .NET reference handling, so any list may arrive
//! as `{"$id": "1", "$values": [...]}` and objects carry `$id` markers. Every
//! response body passes through [`unwrap_envelopes`] before it is decoded into
//! a model, which lets the models declare plain `Vec<T>` fields.

use serde_json::{Map, Value};

const VALUES_KEY: &str = "$values";

/// Recursively replaces `$values` envelopes with their arrays and drops `$id` markers.
pub fn unwrap_envelopes(value: Value) -> Value {
    match value {
        Value::Array(items) => Value::Array(items.into_iter().map(unwrap_envelopes).collect()),
        Value::Object(mut map) => {
            if let Some(values) = map.remove(VALUES_KEY) {
                return unwrap_envelopes(values);
            }
            let cleaned: Map<String, Value> = map
                .into_iter()
                .filter(|(key, _)| key != "$id")
                .map(|(key, value)| (key, unwrap_envelopes(value)))
                .collect();
            Value::Object(cleaned)
        }
        other => other,
    }
}

/// Interprets a value as a list: arrays pass through, an object with a single
/// array-valued field (`{"travelers": [...]}`) yields that array, `null` is empty.
pub fn as_list(value: Value) -> Option<Vec<Value>> {
    match unwrap_envelopes(value) {
        Value::Array(items) => Some(items),
        Value::Null => Some(Vec::new()),
        Value::Object(map) => {
            let mut arrays = map.into_iter().filter_map(|(_, v)| match v {
                Value::Array(items) => Some(items),
                _ => None,
            });
            let first = arrays.next();
            match arrays.next() {
                Some(_) => None,
                None => first,
            }
        }
        _ => None,
    }
}
