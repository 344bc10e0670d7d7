//! Case-insensitive access to JSON attribute maps.
//!
//! SCIM attribute names are case-insensitive. Stored payloads keep whatever
//! casing the client sent, so every lookup goes through these helpers. Exact
//! matches win over case-folded ones.

use serde_json::{Map, Value};

/// The stored key matching `name`, ignoring case.
pub fn key_ci<'a>(map: &'a Map<String, Value>, name: &str) -> Option<&'a String> {
    if let Some((key, _)) = map.get_key_value(name) {
        return Some(key);
    }
    map.keys().find(|key| key.eq_ignore_ascii_case(name))
}

pub fn get_ci<'a>(map: &'a Map<String, Value>, name: &str) -> Option<&'a Value> {
    let key = key_ci(map, name)?;
    map.get(key)
}

pub fn get_ci_mut<'a>(map: &'a mut Map<String, Value>, name: &str) -> Option<&'a mut Value> {
    let key = key_ci(map, name)?.clone();
    map.get_mut(&key)
}

pub fn remove_ci(map: &mut Map<String, Value>, name: &str) -> Option<Value> {
    let key = key_ci(map, name)?.clone();
    map.remove(&key)
}

/// Insert under the existing key's casing when present, otherwise under `name`.
pub fn insert_ci(map: &mut Map<String, Value>, name: &str, value: Value) {
    let key = key_ci(map, name)
        .cloned()
        .unwrap_or_else(|| name.to_string());
    map.insert(key, value);
}

/// Whether two entries of a multi-valued complex attribute hold the same `value`.
pub fn same_entry(a: &Map<String, Value>, b: &Map<String, Value>) -> bool {
    get_ci(a, "value").is_some_and(|value| get_ci(b, "value") == Some(value))
}

/// Whether a value counts as present: not null, not an empty string, array or object.
pub fn is_present(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::String(s) => !s.is_empty(),
        Value::Array(items) => items.iter().any(is_present),
        Value::Object(obj) => obj.values().any(is_present),
        _ => true,
    }
}
