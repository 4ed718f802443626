//! Opaque telemetry snapshot

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::field::Field;

/// Full remote telemetry document.
///
/// Replaced wholesale on every update and never field-merged; only the
/// `meta.current_action` projection is ever read out of it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StateSnapshot(Value);

impl StateSnapshot {
    pub fn new(value: Value) -> Self {
        Self(value)
    }

    pub fn as_value(&self) -> &Value {
        &self.0
    }

    /// Project `meta.current_action` as a tri-state field.
    ///
    /// A non-empty string sets the action, an explicit null clears it, and a
    /// missing key (or missing `meta`) leaves it unchanged.
    pub fn current_action(&self) -> Field<String> {
        match self.0.get("meta").and_then(Value::as_object) {
            Some(meta) => Field::non_empty_string(meta, "current_action"),
            None => Field::Absent,
        }
    }

    /// Pointer lookup into the document (e.g. "/battery/voltage")
    pub fn pointer(&self, pointer: &str) -> Option<&Value> {
        self.0.pointer(pointer)
    }
}
