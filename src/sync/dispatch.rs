//! Per-event merge rules
//!
//! Every rule is a pure transition from the previous state to the next one.
//! Rules are idempotent under replay because the server resends its buffer
//! after each reconnect.

use reqwest::Url;
use tracing::debug;

use crate::camera::CameraStreamStatus;
use crate::data::{LoopName, StreamEvent};
use crate::store::DashboardState;

/// Apply one decoded event to the state.
///
/// `page` is the context the camera stream URL is resolved against.
pub fn apply(state: &DashboardState, event: StreamEvent, page: &Url) -> DashboardState {
    let mut next = state.clone();

    match event {
        StreamEvent::StateDiff {
            snapshot,
            current_action,
        } => {
            next.snapshot = Some(snapshot);
            current_action.apply_to(&mut next.current_action);
        }

        StreamEvent::LoopStatus { name, enabled } => {
            let (Some(name), Some(enabled)) = (name, enabled) else {
                debug!("Ignoring loop.status without loop name or boolean flag");
                return next;
            };
            match name.parse::<LoopName>() {
                Ok(loop_name) => next.loops.set(loop_name, enabled),
                Err(e) => debug!("Ignoring loop.status: {}", e),
            }
        }

        StreamEvent::ActionStarted { name } => match name {
            Some(name) => next.current_action = Some(name),
            None => debug!("Ignoring action start without a name"),
        },

        StreamEvent::ActionFinished { .. } => {
            next.current_action = None;
        }

        StreamEvent::CameraUpdated(update) => {
            next.camera = Some(CameraStreamStatus::merged(
                state.camera.as_ref(),
                &update,
                page,
            ));
        }

        StreamEvent::PersonaSwitched(patch) => {
            if !next.personas.apply_switch(&patch) {
                debug!("Ignoring persona switch with no resolvable target");
            }
        }

        StreamEvent::GoalUpdated { goal } => match goal {
            Some(goal) => {
                if !next.personas.apply_goal(&goal) {
                    debug!("Goal updated without a current persona");
                }
                next.goal = Some(goal);
            }
            None => debug!("Ignoring goal update without a string goal"),
        },

        StreamEvent::PromptUpdated(update) => {
            if !next.personas.apply_prompt(&update) {
                debug!("Ignoring prompt update for unknown persona");
            }
        }

        StreamEvent::Timeline(entry) => {
            next.timeline.upsert(entry);
        }
    }

    next
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{Envelope, LoopStatus, PersonaCatalog, PersonaState, PersonaSummary};
    use serde_json::json;

    fn page() -> Url {
        Url::parse("http://pidog.local:8000/").unwrap()
    }

    fn event(value: serde_json::Value) -> StreamEvent {
        StreamEvent::from_envelope(Envelope::from_value(value).unwrap())
    }

    fn apply_all(state: DashboardState, events: Vec<serde_json::Value>) -> DashboardState {
        events
            .into_iter()
            .fold(state, |state, value| apply(&state, event(value), &page()))
    }

    fn persona(name: &str, prompt: &str) -> PersonaSummary {
        PersonaSummary {
            prompt: Some(prompt.to_string()),
            ..PersonaSummary::named(name)
        }
    }

    #[test]
    fn test_last_state_diff_wins() {
        let state = apply_all(
            DashboardState::default(),
            vec![
                json!({"type": "state.diff", "payload": {"state": {"volume": 1}}}),
                json!({"id": "x", "type": "command.action.queued", "payload": {}}),
                json!({"type": "loop.status", "payload": {"loop": "sensors", "enabled": true}}),
                json!({"type": "state.diff", "payload": {"state": {"battery": 80}}}),
                json!({"type": "command.action.started", "payload": {"name": "sit"}}),
            ],
        );

        let snapshot = state.snapshot.unwrap();
        assert_eq!(snapshot.as_value(), &json!({"battery": 80}));
        assert_eq!(snapshot.pointer("/volume"), None);
    }

    #[test]
    fn test_current_action_tri_state() {
        let state = apply_all(
            DashboardState::default(),
            vec![json!({"type": "command.action.started", "payload": {"name": "walk_forward"}})],
        );
        assert_eq!(state.current_action.as_deref(), Some("walk_forward"));

        let state = apply_all(
            state,
            vec![json!({"type": "state.diff", "payload": {"state": {"meta": {}}}})],
        );
        assert_eq!(state.current_action.as_deref(), Some("walk_forward"));

        let state = apply_all(
            state,
            vec![json!({"type": "state.diff", "payload": {"state": {"meta": {"current_action": null}}}})],
        );
        assert_eq!(state.current_action, None);
    }

    #[test]
    fn test_action_completion_clears() {
        let state = apply_all(
            DashboardState::default(),
            vec![
                json!({"type": "command.action.started", "payload": {"name": "howl"}}),
                json!({"type": "command.action.failed", "payload": {"name": "howl", "error": "busy"}}),
            ],
        );
        assert_eq!(state.current_action, None);
    }

    #[test]
    fn test_loop_toggle_and_unknown_loop() {
        let state = DashboardState {
            loops: LoopStatus {
                awareness: true,
                sensors: true,
            },
            ..Default::default()
        };

        let toggled = apply_all(
            state.clone(),
            vec![json!({"type": "loop.status", "payload": {"loop": "sensors", "enabled": false}})],
        );
        assert_eq!(
            toggled.loops,
            LoopStatus {
                awareness: true,
                sensors: false
            }
        );

        let unchanged = apply_all(
            state.clone(),
            vec![json!({"type": "loop.status", "payload": {"loop": "unknown", "enabled": true}})],
        );
        assert_eq!(unchanged, state);
    }

    #[test]
    fn test_camera_update_fills_missing_fields() {
        let state = DashboardState {
            camera: Some(CameraStreamStatus {
                enabled: true,
                stream_url: Some("http://pidog.local:8080/mjpg".to_string()),
                frame_rate: Some(10),
                port: Some(8080),
                path: Some("/mjpg".to_string()),
            }),
            ..Default::default()
        };

        let state = apply_all(
            state,
            vec![json!({"type": "camera.web_stream.updated", "payload": {"enabled": true, "port": "9090"}})],
        );
        let camera = state.camera.unwrap();
        assert!(camera.enabled);
        assert_eq!(camera.frame_rate, Some(10));
        assert_eq!(camera.port, Some(9090));
        assert_eq!(camera.path.as_deref(), Some("/mjpg"));
        assert_eq!(camera.stream_url.as_deref(), Some("http://pidog.local:9090/mjpg"));
    }

    #[test]
    fn test_camera_disable_drops_url() {
        let state = apply_all(
            DashboardState::default(),
            vec![
                json!({"type": "camera.web_stream.updated", "payload": {"enabled": true, "port": 9000}}),
                json!({"type": "camera.web_stream.updated", "payload": {"enabled": false}}),
            ],
        );
        let camera = state.camera.unwrap();
        assert!(!camera.enabled);
        assert_eq!(camera.stream_url, None);
        assert_eq!(camera.port, Some(9000));
    }

    #[test]
    fn test_timeline_replay_is_idempotent() {
        let events = vec![
            json!({"id": "a", "type": "command.action.queued", "timestamp": "t1", "payload": {"name": "sit"}}),
            json!({"id": "b", "type": "command.action.queued", "timestamp": "t2", "payload": {"name": "howl"}}),
        ];
        let once = apply_all(DashboardState::default(), events.clone());
        let twice = apply_all(once.clone(), events);
        assert_eq!(once, twice);
        assert_eq!(twice.timeline.len(), 2);
    }

    #[test]
    fn test_timeline_keeps_latest_entries() {
        let events = (0..250)
            .map(|i| json!({"id": format!("e{}", i), "type": "sensor.touch", "timestamp": "t", "payload": {}}))
            .collect();
        let state = apply_all(DashboardState::default(), events);
        assert_eq!(state.timeline.len(), 200);
        assert_eq!(state.timeline.iter().next().unwrap().id.as_deref(), Some("e50"));
        assert_eq!(state.timeline.latest().unwrap().id.as_deref(), Some("e249"));
    }

    #[test]
    fn test_handled_types_skip_timeline() {
        let state = apply_all(
            DashboardState::default(),
            vec![json!({"id": "s1", "type": "state.diff", "payload": {"state": {}}})],
        );
        assert!(state.timeline.is_empty());
    }

    #[test]
    fn test_persona_switch_merges_and_selects() {
        let state = DashboardState {
            personas: PersonaState::from_catalog(PersonaCatalog {
                personas: vec![persona("k9", "Loyal"), persona("butler", "Formal")],
                current: Some(persona("k9", "Loyal")),
                selected: Some("k9".to_string()),
                goal: None,
            }),
            ..Default::default()
        };

        let state = apply_all(
            state,
            vec![json!({"type": "persona.switch.completed", "payload": {"name": "butler", "voice": "en-GB", "prompt": null}})],
        );

        assert_eq!(state.personas.selected(), Some("butler"));
        let current = state.personas.current().unwrap();
        assert_eq!(current.name, "butler");
        assert_eq!(current.voice.as_deref(), Some("en-GB"));
        assert_eq!(current.prompt.as_deref(), Some("Formal"));
        assert_eq!(state.personas.list().len(), 2);
    }

    #[test]
    fn test_persona_switch_to_unknown_appends() {
        let state = apply_all(
            DashboardState::default(),
            vec![json!({"type": "persona.switch.completed", "payload": {"name": "pirate", "prompt": "Arr"}})],
        );
        assert_eq!(state.personas.list().len(), 1);
        assert_eq!(state.personas.current().unwrap().prompt.as_deref(), Some("Arr"));
        assert!(state.personas.resolve_selected().is_some());
    }

    #[test]
    fn test_goal_update_sets_motivation() {
        let state = DashboardState {
            personas: PersonaState::from_catalog(PersonaCatalog {
                personas: vec![persona("k9", "Loyal")],
                current: Some(persona("k9", "Loyal")),
                selected: None,
                goal: None,
            }),
            ..Default::default()
        };

        let state = apply_all(
            state,
            vec![json!({"type": "interaction.goal.updated", "payload": {"goal": "Find the ball"}})],
        );
        assert_eq!(state.goal.as_deref(), Some("Find the ball"));
        assert_eq!(
            state.personas.current().unwrap().default_motivation.as_deref(),
            Some("Find the ball")
        );

        let unchanged = apply_all(
            state.clone(),
            vec![json!({"type": "interaction.goal.updated", "payload": {"goal": 7}})],
        );
        assert_eq!(unchanged, state);
    }

    #[test]
    fn test_prompt_update_tri_state() {
        let mut k9 = persona("k9", "Loyal");
        k9.voice = Some("en-US".to_string());
        k9.image_prompt = Some("metal dog".to_string());
        let state = DashboardState {
            personas: PersonaState::from_catalog(PersonaCatalog {
                personas: vec![k9.clone()],
                current: Some(k9),
                selected: Some("k9".to_string()),
                goal: None,
            }),
            ..Default::default()
        };

        let state = apply_all(
            state,
            vec![json!({"type": "persona.prompt.updated", "payload": {"persona": "k9", "prompt": "Brave", "voice": null}})],
        );

        for entry in [state.personas.find("k9").unwrap(), state.personas.current().unwrap()] {
            assert_eq!(entry.prompt.as_deref(), Some("Brave"));
            assert_eq!(entry.voice, None);
            assert_eq!(entry.image_prompt.as_deref(), Some("metal dog"));
        }
    }
}
