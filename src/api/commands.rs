//! User-initiated mutations sent to the control server

use serde::Serialize;
use serde_json::{json, Map, Value};

use crate::data::Field;

/// Origin tag the server records on events caused by this client
pub const ORIGIN: &str = "k9-sync";

/// A new persona for `POST /api/personas`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct NewPersona {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub voice: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prompt: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_motivation: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_prompt: Option<String>,
}

/// Edit of the active persona's prompt
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PromptChange {
    pub prompt: String,
    pub voice: Field<String>,
    pub default_motivation: Field<String>,
    pub image_prompt: Field<String>,
}

/// A mutation endpoint call
#[derive(Debug, Clone, PartialEq)]
pub enum RemoteCommand {
    SetLoops {
        awareness: Option<bool>,
        sensors: Option<bool>,
    },
    TriggerAction {
        name: String,
    },
    SwitchPersona {
        name: String,
    },
    CreatePersona(NewPersona),
    UpdatePrompt(PromptChange),
    SetGoal {
        goal: String,
    },
    Instruct {
        instructions: String,
    },
    CustomAwareness {
        message: String,
    },
    UpdateCamera {
        enabled: bool,
        frame_rate: Option<u32>,
    },
    Shutdown,
}

impl RemoteCommand {
    /// Endpoint path relative to the server base URL
    pub fn path(&self) -> &'static str {
        match self {
            RemoteCommand::SetLoops { .. } => "api/loops",
            RemoteCommand::TriggerAction { .. } => "api/actions/trigger",
            RemoteCommand::SwitchPersona { .. } => "api/personas/switch",
            RemoteCommand::CreatePersona(_) => "api/personas",
            RemoteCommand::UpdatePrompt(_) => "api/interaction/prompt",
            RemoteCommand::SetGoal { .. } => "api/interaction/goal",
            RemoteCommand::Instruct { .. } => "api/interaction/instruct",
            RemoteCommand::CustomAwareness { .. } => "api/awareness/custom",
            RemoteCommand::UpdateCamera { .. } => "api/camera/web-stream",
            RemoteCommand::Shutdown => "api/system/shutdown",
        }
    }

    /// Short name for logs and status messages
    pub fn label(&self) -> &'static str {
        match self {
            RemoteCommand::SetLoops { .. } => "set-loops",
            RemoteCommand::TriggerAction { .. } => "trigger-action",
            RemoteCommand::SwitchPersona { .. } => "switch-persona",
            RemoteCommand::CreatePersona(_) => "create-persona",
            RemoteCommand::UpdatePrompt(_) => "update-prompt",
            RemoteCommand::SetGoal { .. } => "set-goal",
            RemoteCommand::Instruct { .. } => "instruct",
            RemoteCommand::CustomAwareness { .. } => "custom-awareness",
            RemoteCommand::UpdateCamera { .. } => "update-camera",
            RemoteCommand::Shutdown => "shutdown",
        }
    }

    /// JSON request body
    pub fn body(&self) -> Value {
        let mut body = match self {
            RemoteCommand::SetLoops { awareness, sensors } => {
                let mut loops = Map::new();
                if let Some(enabled) = awareness {
                    loops.insert("awareness".to_string(), json!(enabled));
                }
                if let Some(enabled) = sensors {
                    loops.insert("sensors".to_string(), json!(enabled));
                }
                Value::Object(loops)
            }
            RemoteCommand::TriggerAction { name } => json!({ "name": name }),
            RemoteCommand::SwitchPersona { name } => json!({ "name": name }),
            RemoteCommand::CreatePersona(persona) => json!(persona),
            RemoteCommand::UpdatePrompt(change) => {
                let mut body = Map::new();
                body.insert("prompt".to_string(), json!(change.prompt));
                insert_field(&mut body, "voice", &change.voice);
                insert_field(&mut body, "default_motivation", &change.default_motivation);
                insert_field(&mut body, "image_prompt", &change.image_prompt);
                Value::Object(body)
            }
            RemoteCommand::SetGoal { goal } => json!({ "goal": goal }),
            RemoteCommand::Instruct { instructions } => json!({ "instructions": instructions }),
            RemoteCommand::CustomAwareness { message } => json!({ "message": message }),
            RemoteCommand::UpdateCamera {
                enabled,
                frame_rate,
            } => {
                let mut body = Map::new();
                body.insert("enabled".to_string(), json!(enabled));
                if let Some(fps) = frame_rate {
                    body.insert("frameRate".to_string(), json!(fps));
                }
                Value::Object(body)
            }
            RemoteCommand::Shutdown => json!({}),
        };

        if let Value::Object(map) = &mut body {
            map.insert("origin".to_string(), json!(ORIGIN));
        }
        body
    }
}

/// The server treats null as "leave unchanged" and clears a field when it
/// receives an empty string.
fn insert_field(body: &mut Map<String, Value>, key: &str, field: &Field<String>) {
    match field {
        Field::Absent => {}
        Field::Null => {
            body.insert(key.to_string(), json!(""));
        }
        Field::Value(value) => {
            body.insert(key.to_string(), json!(value));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_loops_only_sends_named_loops() {
        let body = RemoteCommand::SetLoops {
            awareness: None,
            sensors: Some(false),
        }
        .body();
        assert_eq!(body, json!({"sensors": false, "origin": ORIGIN}));
    }

    #[test]
    fn test_prompt_change_encodes_tri_state() {
        let body = RemoteCommand::UpdatePrompt(PromptChange {
            prompt: "You are K9".to_string(),
            voice: Field::Null,
            default_motivation: Field::Value("Guard".to_string()),
            image_prompt: Field::Absent,
        })
        .body();

        assert_eq!(body["voice"], "");
        assert_eq!(body["default_motivation"], "Guard");
        assert!(body.get("image_prompt").is_none());
    }

    #[test]
    fn test_create_persona_skips_unset_fields() {
        let body = RemoteCommand::CreatePersona(NewPersona {
            name: "butler".to_string(),
            prompt: Some("Very formal".to_string()),
            ..Default::default()
        })
        .body();
        assert_eq!(body["name"], "butler");
        assert!(body.get("voice").is_none());
        assert_eq!(body["origin"], ORIGIN);
    }

    #[test]
    fn test_paths() {
        assert_eq!(RemoteCommand::Shutdown.path(), "api/system/shutdown");
        assert_eq!(
            RemoteCommand::UpdateCamera { enabled: true, frame_rate: Some(10) }.path(),
            "api/camera/web-stream"
        );
    }
}
