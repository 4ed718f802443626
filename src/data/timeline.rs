//! Bounded event timeline

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::VecDeque;

use super::envelope::Envelope;

/// Maximum number of events kept in the timeline
pub const TIMELINE_CAPACITY: usize = 200;

/// An event shown in the dashboard history
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimelineEvent {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    #[serde(rename = "type")]
    pub event_type: String,

    pub timestamp: String,

    #[serde(default)]
    pub payload: Map<String, Value>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meta: Option<Map<String, Value>>,
}

impl TimelineEvent {
    /// Build a timeline entry from an envelope.
    ///
    /// Envelopes without a timestamp are stamped with the receive time.
    pub fn from_envelope(envelope: Envelope) -> Self {
        Self {
            id: envelope.id,
            event_type: envelope.event_type,
            timestamp: envelope
                .timestamp
                .unwrap_or_else(|| chrono::Utc::now().to_rfc3339()),
            payload: envelope.payload,
            meta: envelope.meta,
        }
    }
}

/// Arrival-ordered event buffer, unique on `id` and capped in size.
///
/// Safe under at-least-once delivery: replaying an id-bearing event replaces
/// the buffered copy in place instead of appending a duplicate.
#[derive(Debug, Clone, PartialEq)]
pub struct Timeline {
    events: VecDeque<TimelineEvent>,
    capacity: usize,
}

impl Default for Timeline {
    fn default() -> Self {
        Self::with_capacity(TIMELINE_CAPACITY)
    }
}

impl Timeline {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            events: VecDeque::with_capacity(capacity.min(TIMELINE_CAPACITY)),
            capacity: capacity.max(1),
        }
    }

    /// Insert or replace an event, then evict the oldest past capacity
    pub fn upsert(&mut self, event: TimelineEvent) {
        let existing = event
            .id
            .as_deref()
            .and_then(|id| self.events.iter().position(|e| e.id.as_deref() == Some(id)));

        match existing {
            Some(index) => self.events[index] = event,
            None => self.events.push_back(event),
        }

        while self.events.len() > self.capacity {
            self.events.pop_front();
        }
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Events oldest first
    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &TimelineEvent> {
        self.events.iter()
    }

    pub fn latest(&self) -> Option<&TimelineEvent> {
        self.events.back()
    }

    pub fn get(&self, id: &str) -> Option<&TimelineEvent> {
        self.events.iter().find(|e| e.id.as_deref() == Some(id))
    }
}
