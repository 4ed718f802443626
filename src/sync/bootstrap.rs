//! One-shot baseline load
//!
//! Six resources are fetched in parallel. State and history are mandatory;
//! the rest degrade to empty values when they fail.

use reqwest::Url;
use thiserror::Error;
use tracing::{info, warn};

use crate::api::{ApiClient, ApiError};
use crate::camera::{CameraStreamStatus, CameraUpdate};
use crate::data::{LoopStatus, PersonaCatalog, PersonaState, StateSnapshot, Timeline, TimelineEvent};
use crate::store::DashboardState;

#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error("failed to load state: {0}")]
    State(#[source] ApiError),

    #[error("failed to load event history: {0}")]
    History(#[source] ApiError),
}

/// Everything one bootstrap fetched
#[derive(Debug, Clone)]
pub struct BootstrapData {
    pub snapshot: StateSnapshot,
    pub history: Vec<TimelineEvent>,
    pub camera: Option<CameraUpdate>,
    pub personas: Option<PersonaCatalog>,
    pub loops: Option<LoopStatus>,
    pub actions: Option<Vec<String>>,
}

#[derive(Clone)]
pub struct SnapshotLoader {
    api: ApiClient,
}

impl SnapshotLoader {
    pub fn new(api: ApiClient) -> Self {
        Self { api }
    }

    pub async fn load(&self) -> Result<BootstrapData, BootstrapError> {
        let (state, history, camera, personas, loops, actions) = tokio::join!(
            self.api.fetch_state(),
            self.api.fetch_history(),
            self.api.fetch_camera_status(),
            self.api.fetch_personas(),
            self.api.fetch_loops(),
            self.api.fetch_action_catalog(),
        );

        let snapshot = state.map_err(BootstrapError::State)?;
        let history = history.map_err(BootstrapError::History)?;

        let data = BootstrapData {
            snapshot,
            history,
            camera: optional("camera status", camera),
            personas: optional("persona catalog", personas),
            loops: optional("loop status", loops),
            actions: optional("action catalog", actions),
        };

        info!(
            "Bootstrap fetched {} history events, {} actions",
            data.history.len(),
            data.actions.as_ref().map_or(0, Vec::len)
        );
        Ok(data)
    }
}

fn optional<T>(what: &str, result: Result<T, ApiError>) -> Option<T> {
    match result {
        Ok(value) => Some(value),
        Err(e) => {
            warn!("Failed to load {}: {}", what, e);
            None
        }
    }
}

/// Commit a successful bootstrap as one transition.
///
/// Fetched resources replace their local counterparts. History is upserted
/// into the live timeline by id, so live events that landed first survive
/// and committing the same history twice changes nothing.
pub fn commit(state: &DashboardState, data: BootstrapData, page: &Url) -> DashboardState {
    let timeline = merge_history(&state.timeline, data.history);

    let mut current_action = state.current_action.clone();
    data.snapshot.current_action().apply_to(&mut current_action);

    let (personas, goal) = match data.personas {
        Some(catalog) => {
            let goal = catalog.goal.clone();
            (PersonaState::from_catalog(catalog), goal)
        }
        None => (PersonaState::default(), None),
    };

    DashboardState {
        snapshot: Some(data.snapshot),
        timeline,
        loops: data.loops.unwrap_or_default(),
        camera: data
            .camera
            .map(|update| CameraStreamStatus::merged(None, &update, page)),
        personas,
        goal,
        actions: data.actions.unwrap_or_default(),
        current_action,
        load_error: None,
        bootstrapped: true,
    }
}

fn merge_history(live: &Timeline, history: Vec<TimelineEvent>) -> Timeline {
    let mut timeline = live.clone();
    for event in history {
        // Entries without an id can only be matched whole
        if event.id.is_none() && timeline.iter().any(|existing| *existing == event) {
            continue;
        }
        timeline.upsert(event);
    }
    timeline
}

/// Record a mandatory failure without touching anything else
pub fn commit_failure(state: &DashboardState, error: &BootstrapError) -> DashboardState {
    DashboardState {
        load_error: Some(error.to_string()),
        ..state.clone()
    }
}
