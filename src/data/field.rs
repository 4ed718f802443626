//! Three-valued optional fields for update payloads

use serde_json::{Map, Value};
use tracing::debug;

/// An optional field as carried by an update payload.
///
/// Payloads distinguish a missing key from a key that is present and `null`.
/// Collapsing both into `Option` would lose the difference between "leave
/// unchanged" and "clear".
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Field<T> {
    /// Key not present: leave the target untouched
    Absent,
    /// Key present with `null`: clear the target
    Null,
    /// Key present with a usable value: set the target
    Value(T),
}

impl<T> Default for Field<T> {
    fn default() -> Self {
        Field::Absent
    }
}

impl<T> Field<T> {
    /// Apply this update to an existing optional value
    pub fn apply_to(self, target: &mut Option<T>) {
        match self {
            Field::Absent => {}
            Field::Null => *target = None,
            Field::Value(value) => *target = Some(value),
        }
    }
}

impl Field<String> {
    /// Decode a string-valued key from a payload.
    ///
    /// A present value of the wrong type is treated as absent so a malformed
    /// update never clears existing data.
    pub fn string(map: &Map<String, Value>, key: &str) -> Self {
        match map.get(key) {
            None => Field::Absent,
            Some(Value::Null) => Field::Null,
            Some(Value::String(s)) => Field::Value(s.clone()),
            Some(other) => {
                debug!("Ignoring non-string value for '{}': {}", key, other);
                Field::Absent
            }
        }
    }

    /// Like [`Field::string`], but an empty or blank string is treated as absent
    pub fn non_empty_string(map: &Map<String, Value>, key: &str) -> Self {
        match Self::string(map, key) {
            Field::Value(s) if s.trim().is_empty() => Field::Absent,
            other => other,
        }
    }
}

/// Read a key as a non-empty string, ignoring null and other types
pub fn opt_string(map: &Map<String, Value>, key: &str) -> Option<String> {
    match map.get(key) {
        Some(Value::String(s)) if !s.trim().is_empty() => Some(s.clone()),
        _ => None,
    }
}
