//! The dashboard's local view of the robot

use crate::camera::CameraStreamStatus;
use crate::data::{LoopName, LoopStatus, PersonaState, StateSnapshot, Timeline};

/// Everything the dashboard knows about the remote system.
///
/// Values are never mutated in place once published; every transition
/// produces a new value that replaces the old one wholesale.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DashboardState {
    /// Latest full telemetry document
    pub snapshot: Option<StateSnapshot>,

    /// Recent events, oldest first
    pub timeline: Timeline,

    pub loops: LoopStatus,

    /// Camera web-stream status, if known
    pub camera: Option<CameraStreamStatus>,

    pub personas: PersonaState,

    /// Interaction goal reported by the persona catalog or goal events
    pub goal: Option<String>,

    /// Actions available for triggering
    pub actions: Vec<String>,

    /// Routine currently executing on the robot
    pub current_action: Option<String>,

    /// Visible error from the last failed bootstrap
    pub load_error: Option<String>,

    /// Whether a bootstrap has completed successfully
    pub bootstrapped: bool,
}

impl DashboardState {
    /// One-line description for logs
    pub fn summary(&self) -> String {
        format!(
            "action={} persona={} loops=[{}={} {}={}] camera={} events={} last={}{}",
            self.current_action.as_deref().unwrap_or("-"),
            self.personas.selected().unwrap_or("-"),
            LoopName::Awareness,
            self.loops.get(LoopName::Awareness),
            LoopName::Sensors,
            self.loops.get(LoopName::Sensors),
            self.camera
                .as_ref()
                .and_then(|c| c.stream_url.as_deref())
                .unwrap_or("off"),
            self.timeline.len(),
            self.timeline
                .latest()
                .map(|e| e.event_type.as_str())
                .unwrap_or("-"),
            self.load_error
                .as_deref()
                .map(|e| format!(" error=\"{}\"", e))
                .unwrap_or_default(),
        )
    }
}
