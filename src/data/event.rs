//! Typed view of inbound envelopes

use serde_json::Value;

use super::envelope::Envelope;
use super::field::{opt_string, Field};
use super::persona::{PersonaPatch, PromptUpdate};
use super::snapshot::StateSnapshot;
use super::timeline::TimelineEvent;
use crate::camera::CameraUpdate;

pub const STATE_DIFF: &str = "state.diff";
pub const LOOP_STATUS: &str = "loop.status";
pub const ACTION_STARTED: &str = "command.action.started";
pub const ACTION_COMPLETED: &str = "command.action.completed";
pub const ACTION_FAILED: &str = "command.action.failed";
pub const CAMERA_UPDATED: &str = "camera.web_stream.updated";
pub const PERSONA_SWITCH_COMPLETED: &str = "persona.switch.completed";
pub const GOAL_UPDATED: &str = "interaction.goal.updated";
pub const PERSONA_PROMPT_UPDATED: &str = "persona.prompt.updated";

/// An inbound event, decoded by type tag
#[derive(Debug, Clone, PartialEq)]
pub enum StreamEvent {
    StateDiff {
        snapshot: StateSnapshot,
        current_action: Field<String>,
    },
    LoopStatus {
        name: Option<String>,
        enabled: Option<bool>,
    },
    ActionStarted {
        name: Option<String>,
    },
    ActionFinished {
        failed: bool,
    },
    CameraUpdated(CameraUpdate),
    PersonaSwitched(PersonaPatch),
    GoalUpdated {
        goal: Option<String>,
    },
    PromptUpdated(PromptUpdate),
    /// Anything else goes to the timeline
    Timeline(TimelineEvent),
}

impl StreamEvent {
    pub fn from_envelope(envelope: Envelope) -> Self {
        let payload = &envelope.payload;
        match envelope.event_type.as_str() {
            STATE_DIFF => {
                // The bus wraps the snapshot as {"state": {...}}
                let snapshot = match payload.get("state") {
                    Some(state) => StateSnapshot::new(state.clone()),
                    None => StateSnapshot::new(Value::Object(payload.clone())),
                };
                let current_action = snapshot.current_action();
                StreamEvent::StateDiff {
                    snapshot,
                    current_action,
                }
            }
            LOOP_STATUS => StreamEvent::LoopStatus {
                name: payload.get("loop").and_then(Value::as_str).map(str::to_string),
                enabled: payload.get("enabled").and_then(Value::as_bool),
            },
            ACTION_STARTED => StreamEvent::ActionStarted {
                name: opt_string(payload, "name"),
            },
            ACTION_COMPLETED => StreamEvent::ActionFinished { failed: false },
            ACTION_FAILED => StreamEvent::ActionFinished { failed: true },
            CAMERA_UPDATED => StreamEvent::CameraUpdated(CameraUpdate::from_payload(payload)),
            PERSONA_SWITCH_COMPLETED => {
                StreamEvent::PersonaSwitched(PersonaPatch::from_payload(payload))
            }
            GOAL_UPDATED => StreamEvent::GoalUpdated {
                goal: payload.get("goal").and_then(Value::as_str).map(str::to_string),
            },
            PERSONA_PROMPT_UPDATED => {
                StreamEvent::PromptUpdated(PromptUpdate::from_payload(payload))
            }
            _ => StreamEvent::Timeline(TimelineEvent::from_envelope(envelope)),
        }
    }

    /// Short name for logging
    pub fn kind(&self) -> &'static str {
        match self {
            StreamEvent::StateDiff { .. } => STATE_DIFF,
            StreamEvent::LoopStatus { .. } => LOOP_STATUS,
            StreamEvent::ActionStarted { .. } => ACTION_STARTED,
            StreamEvent::ActionFinished { failed: false } => ACTION_COMPLETED,
            StreamEvent::ActionFinished { failed: true } => ACTION_FAILED,
            StreamEvent::CameraUpdated(_) => CAMERA_UPDATED,
            StreamEvent::PersonaSwitched(_) => PERSONA_SWITCH_COMPLETED,
            StreamEvent::GoalUpdated { .. } => GOAL_UPDATED,
            StreamEvent::PromptUpdated(_) => PERSONA_PROMPT_UPDATED,
            StreamEvent::Timeline(_) => "timeline",
        }
    }
}
