//! Wire envelope for the event stream and the history endpoint

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

/// Errors raised while decoding an inbound message
#[derive(Debug, Error)]
pub enum EnvelopeError {
    #[error("malformed envelope: {0}")]
    Json(#[from] serde_json::Error),

    #[error("envelope has an empty type tag")]
    EmptyType,
}

/// A tagged message as published by the robot's event bus
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    /// Event identifier, unique per published event
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    /// Type discriminator (e.g. "state.diff", "loop.status")
    #[serde(rename = "type")]
    pub event_type: String,

    /// ISO-8601 publish time
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,

    #[serde(default, deserialize_with = "null_as_empty")]
    pub payload: Map<String, Value>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meta: Option<Map<String, Value>>,
}

impl Envelope {
    /// Parse a text frame into an envelope
    pub fn parse(text: &str) -> Result<Self, EnvelopeError> {
        let envelope: Envelope = serde_json::from_str(text)?;
        envelope.validated()
    }

    /// Convert an already-decoded JSON value (history entries)
    pub fn from_value(value: Value) -> Result<Self, EnvelopeError> {
        let envelope: Envelope = serde_json::from_value(value)?;
        envelope.validated()
    }

    fn validated(self) -> Result<Self, EnvelopeError> {
        if self.event_type.trim().is_empty() {
            return Err(EnvelopeError::EmptyType);
        }
        Ok(self)
    }
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<Map<String, Value>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Map<String, Value>>::deserialize(deserializer)?.unwrap_or_default())
}
