//! Typed replacement for free-form JSON maps.
//!
//! The upstream design used dynamic `map[string]interface{}` values for
//! `template_data`, `metadata`, and `parameters`. [`JsonValue`] is the typed
//! equivalent called for in the re-architecture guidance: keys are strings,
//! values are one of {string, number, boolean, null, array, object}, and
//! round-tripping through [`serde_json::Value`] preserves unknown keys.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// A JSON-shaped value with explicit accessors instead of reflection/casts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(untagged)]
pub enum JsonValue {
    /// Absence of a value.
    #[default]
    Null,
    /// A boolean.
    Bool(bool),
    /// A number, stored as f64 for simplicity of range.
    Number(f64),
    /// A UTF-8 string.
    String(String),
    /// An ordered list of values.
    Array(Vec<JsonValue>),
    /// A string-keyed map, ordered for deterministic serialization.
    Object(BTreeMap<String, JsonValue>),
}

impl JsonValue {
    /// An empty object, the default container for `metadata`/`parameters`.
    pub fn empty_object() -> Self {
        JsonValue::Object(BTreeMap::new())
    }

    /// Borrow as a string slice, if this value is a string.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            JsonValue::String(s) => Some(s.as_str()),
            _ => None,
        }
    }

    /// Borrow as f64, if this value is numeric.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            JsonValue::Number(n) => Some(*n),
            _ => None,
        }
    }

    /// Borrow as bool, if this value is a boolean.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            JsonValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Borrow as a slice of values, if this value is an array.
    pub fn as_array(&self) -> Option<&[JsonValue]> {
        match self {
            JsonValue::Array(a) => Some(a.as_slice()),
            _ => None,
        }
    }

    /// Borrow as an object, if this value is an object.
    pub fn as_object(&self) -> Option<&BTreeMap<String, JsonValue>> {
        match self {
            JsonValue::Object(o) => Some(o),
            _ => None,
        }
    }

    /// Look up a key, only meaningful for objects.
    pub fn get(&self, key: &str) -> Option<&JsonValue> {
        self.as_object().and_then(|o| o.get(key))
    }

    /// Insert a key, turning `Null` into an object in place.
    pub fn insert(&mut self, key: impl Into<String>, value: JsonValue) {
        if !matches!(self, JsonValue::Object(_)) {
            *self = JsonValue::empty_object();
        }
        if let JsonValue::Object(map) = self {
            map.insert(key.into(), value);
        }
    }

    /// Iterate object entries; empty iterator for any other variant.
    pub fn iter(&self) -> Box<dyn Iterator<Item = (&String, &JsonValue)> + '_> {
        match self {
            JsonValue::Object(map) => Box::new(map.iter()),
            _ => Box::new(std::iter::empty()),
        }
    }

    /// True if this value is `Null`.
    pub fn is_null(&self) -> bool {
        matches!(self, JsonValue::Null)
    }
}

impl From<serde_json::Value> for JsonValue {
    fn from(value: serde_json::Value) -> Self {
        match value {
            serde_json::Value::Null => JsonValue::Null,
            serde_json::Value::Bool(b) => JsonValue::Bool(b),
            serde_json::Value::Number(n) => JsonValue::Number(n.as_f64().unwrap_or_default()),
            serde_json::Value::String(s) => JsonValue::String(s),
            serde_json::Value::Array(a) => JsonValue::Array(a.into_iter().map(Into::into).collect()),
            serde_json::Value::Object(o) => {
                JsonValue::Object(o.into_iter().map(|(k, v)| (k, v.into())).collect())
            }
        }
    }
}

impl From<JsonValue> for serde_json::Value {
    fn from(value: JsonValue) -> Self {
        match value {
            JsonValue::Null => serde_json::Value::Null,
            JsonValue::Bool(b) => serde_json::Value::Bool(b),
            JsonValue::Number(n) => serde_json::Number::from_f64(n)
                .map(serde_json::Value::Number)
                .unwrap_or(serde_json::Value::Null),
            JsonValue::String(s) => serde_json::Value::String(s),
            JsonValue::Array(a) => serde_json::Value::Array(a.into_iter().map(Into::into).collect()),
            JsonValue::Object(o) => {
                serde_json::Value::Object(o.into_iter().map(|(k, v)| (k, v.into())).collect())
            }
        }
    }
}

impl From<&str> for JsonValue {
    fn from(value: &str) -> Self {
        JsonValue::String(value.to_string())
    }
}

impl From<String> for JsonValue {
    fn from(value: String) -> Self {
        JsonValue::String(value)
    }
}

impl From<f64> for JsonValue {
    fn from(value: f64) -> Self {
        JsonValue::Number(value)
    }
}

impl From<bool> for JsonValue {
    fn from(value: bool) -> Self {
        JsonValue::Bool(value)
    }
}

impl fmt::Display for JsonValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let v: serde_json::Value = self.clone().into();
        write!(f, "{v}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_unknown_keys_through_serde_json() {
        let raw = serde_json::json!({
            "known": "value",
            "unknown_nested": {"a": 1, "b": [true, null]}
        });
        let typed: JsonValue = raw.clone().into();
        let back: serde_json::Value = typed.into();
        assert_eq!(raw, back);
    }

    #[test]
    fn accessors_read_expected_shapes() {
        let mut obj = JsonValue::empty_object();
        obj.insert("name", JsonValue::from("alice"));
        obj.insert("score", JsonValue::from(0.9));
        assert_eq!(obj.get("name").and_then(JsonValue::as_str), Some("alice"));
        assert_eq!(obj.get("score").and_then(JsonValue::as_f64), Some(0.9));
        assert_eq!(obj.get("missing"), None);
    }
}
