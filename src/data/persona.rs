//! Persona catalog and selection state

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::field::{opt_string, Field};

/// A persona as listed by the persona catalog
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersonaSummary {
    /// Unique key
    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub voice: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prompt: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_motivation: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_prompt: Option<String>,
}

impl PersonaSummary {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }
}

/// Body of `GET /api/personas`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PersonaCatalog {
    #[serde(default)]
    pub personas: Vec<PersonaSummary>,
    #[serde(default)]
    pub current: Option<PersonaSummary>,
    #[serde(default)]
    pub selected: Option<String>,
    #[serde(default)]
    pub goal: Option<String>,
}

/// Fields announced when a persona switch completes.
///
/// Every key is always sent by the server, with null for values the persona
/// does not define, so null here means "not specified" rather than "clear".
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PersonaPatch {
    pub name: Option<String>,
    pub voice: Option<String>,
    pub description: Option<String>,
    pub prompt: Option<String>,
    pub default_motivation: Option<String>,
    pub image_prompt: Option<String>,
}

impl PersonaPatch {
    pub fn from_payload(payload: &Map<String, Value>) -> Self {
        Self {
            name: opt_string(payload, "name"),
            voice: opt_string(payload, "voice"),
            description: opt_string(payload, "description"),
            prompt: opt_string(payload, "prompt"),
            default_motivation: opt_string(payload, "default_motivation"),
            image_prompt: opt_string(payload, "image_prompt"),
        }
    }

    fn merge_into(&self, entry: &mut PersonaSummary) {
        fn merge(source: &Option<String>, target: &mut Option<String>) {
            if let Some(value) = source {
                *target = Some(value.clone());
            }
        }
        merge(&self.voice, &mut entry.voice);
        merge(&self.description, &mut entry.description);
        merge(&self.prompt, &mut entry.prompt);
        merge(&self.default_motivation, &mut entry.default_motivation);
        merge(&self.image_prompt, &mut entry.image_prompt);
    }
}

/// Prompt edit announced by the server; every optional field is tri-state
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PromptUpdate {
    pub persona: Option<String>,
    pub prompt: Field<String>,
    pub voice: Field<String>,
    pub default_motivation: Field<String>,
    pub image_prompt: Field<String>,
}

impl PromptUpdate {
    pub fn from_payload(payload: &Map<String, Value>) -> Self {
        Self {
            persona: opt_string(payload, "persona"),
            prompt: Field::string(payload, "prompt"),
            voice: Field::string(payload, "voice"),
            default_motivation: Field::string(payload, "default_motivation"),
            image_prompt: Field::string(payload, "image_prompt"),
        }
    }

    fn apply(&self, entry: &mut PersonaSummary) {
        self.prompt.clone().apply_to(&mut entry.prompt);
        self.voice.clone().apply_to(&mut entry.voice);
        self.default_motivation
            .clone()
            .apply_to(&mut entry.default_motivation);
        self.image_prompt.clone().apply_to(&mut entry.image_prompt);
    }
}

/// Persona list, active persona and selection.
///
/// Invariant: `selected`, when set, names an entry of `list` or `current`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PersonaState {
    list: Vec<PersonaSummary>,
    current: Option<PersonaSummary>,
    selected: Option<String>,
}

impl PersonaState {
    pub fn from_catalog(catalog: PersonaCatalog) -> Self {
        let mut state = Self {
            list: Vec::with_capacity(catalog.personas.len()),
            current: catalog.current,
            selected: catalog.selected,
        };
        for persona in catalog.personas {
            state.upsert(persona);
        }
        state.normalize_selection();
        state
    }

    pub fn list(&self) -> &[PersonaSummary] {
        &self.list
    }

    pub fn current(&self) -> Option<&PersonaSummary> {
        self.current.as_ref()
    }

    pub fn selected(&self) -> Option<&str> {
        self.selected.as_deref()
    }

    pub fn find(&self, name: &str) -> Option<&PersonaSummary> {
        self.list.iter().find(|p| p.name == name)
    }

    /// The persona `selected` points at
    pub fn resolve_selected(&self) -> Option<&PersonaSummary> {
        let name = self.selected.as_deref()?;
        self.find(name)
            .or_else(|| self.current.as_ref().filter(|c| c.name == name))
    }

    fn find_mut(&mut self, name: &str) -> Option<&mut PersonaSummary> {
        self.list.iter_mut().find(|p| p.name == name)
    }

    fn upsert(&mut self, persona: PersonaSummary) {
        match self.find_mut(&persona.name) {
            Some(existing) => *existing = persona,
            None => self.list.push(persona),
        }
    }

    fn normalize_selection(&mut self) {
        if self.selected.is_some() && self.resolve_selected().is_none() {
            self.selected = self.current.as_ref().map(|c| c.name.clone());
        }
        if self.selected.is_none() {
            self.selected = self.current.as_ref().map(|c| c.name.clone());
        }
    }

    /// Apply a completed persona switch.
    ///
    /// Returns false when no target persona could be resolved.
    pub fn apply_switch(&mut self, patch: &PersonaPatch) -> bool {
        let Some(target) = patch.name.clone().or_else(|| self.selected.clone()) else {
            return false;
        };

        match self.find_mut(&target) {
            Some(entry) => patch.merge_into(entry),
            None => {
                let mut entry = self
                    .current
                    .as_ref()
                    .filter(|c| c.name == target)
                    .cloned()
                    .unwrap_or_else(|| PersonaSummary::named(target.clone()));
                patch.merge_into(&mut entry);
                self.list.push(entry);
            }
        }

        let switching_away = self.current.as_ref().map_or(true, |c| c.name != target);
        if switching_away {
            self.current = self.find(&target).cloned();
        } else if let Some(current) = self.current.as_mut() {
            patch.merge_into(current);
        }

        self.selected = Some(target);
        true
    }

    /// Set the current persona's motivation from a goal update.
    ///
    /// Returns false when there is no current persona.
    pub fn apply_goal(&mut self, goal: &str) -> bool {
        match self.current.as_mut() {
            Some(current) => {
                current.default_motivation = Some(goal.to_string());
                true
            }
            None => false,
        }
    }

    /// Apply a prompt edit to the named persona's list and current entries.
    ///
    /// Without a persona name the edit targets the current persona.
    pub fn apply_prompt(&mut self, update: &PromptUpdate) -> bool {
        let Some(name) = update
            .persona
            .clone()
            .or_else(|| self.current.as_ref().map(|c| c.name.clone()))
        else {
            return false;
        };

        let mut applied = false;
        if let Some(entry) = self.find_mut(&name) {
            update.apply(entry);
            applied = true;
        }
        if let Some(current) = self.current.as_mut().filter(|c| c.name == name) {
            update.apply(current);
            applied = true;
        }
        applied
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn catalog() -> PersonaCatalog {
        serde_json::from_value(json!({
            "personas": [
                {"name": "k9", "voice": "ash", "description": "Loyal robot dog", "prompt": "You are K9"},
                {"name": "pirate", "voice": "verse", "prompt": "Arr"}
            ],
            "current": {"name": "k9", "voice": "ash", "description": "Loyal robot dog", "prompt": "You are K9"},
            "selected": "k9",
            "goal": "Explore"
        }))
        .unwrap()
    }

    fn payload(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_from_catalog_repairs_dangling_selection() {
        let mut catalog = catalog();
        catalog.selected = Some("ghost".to_string());
        let state = PersonaState::from_catalog(catalog);
        assert_eq!(state.selected(), Some("k9"));
        assert!(state.resolve_selected().is_some());
    }

    #[test]
    fn test_from_catalog_dedupes_names() {
        let mut catalog = catalog();
        catalog.personas.push(PersonaSummary {
            name: "pirate".to_string(),
            voice: Some("coral".to_string()),
            ..Default::default()
        });
        let state = PersonaState::from_catalog(catalog);
        assert_eq!(state.list().len(), 2);
        assert_eq!(state.find("pirate").unwrap().voice.as_deref(), Some("coral"));
    }

    #[test]
    fn test_switch_to_listed_persona_keeps_unspecified_fields() {
        let mut state = PersonaState::from_catalog(catalog());
        let patch = PersonaPatch::from_payload(&payload(json!({
            "name": "pirate",
            "voice": "verse",
            "description": null,
            "default_motivation": "Find treasure"
        })));

        assert!(state.apply_switch(&patch));
        let pirate = state.find("pirate").unwrap();
        assert_eq!(pirate.prompt.as_deref(), Some("Arr"));
        assert_eq!(pirate.default_motivation.as_deref(), Some("Find treasure"));
        assert_eq!(state.current().unwrap().name, "pirate");
        assert_eq!(state.selected(), Some("pirate"));
    }

    #[test]
    fn test_switch_to_unknown_persona_appends_entry() {
        let mut state = PersonaState::from_catalog(catalog());
        let patch = PersonaPatch::from_payload(&payload(json!({"name": "butler", "voice": "sage"})));

        assert!(state.apply_switch(&patch));
        assert_eq!(state.list().len(), 3);
        assert_eq!(state.list()[2].name, "butler");
        assert_eq!(state.current().unwrap().voice.as_deref(), Some("sage"));
        assert_eq!(state.resolve_selected().unwrap().name, "butler");
    }

    #[test]
    fn test_switch_without_name_uses_prior_selection() {
        let mut state = PersonaState::from_catalog(catalog());
        let patch = PersonaPatch::from_payload(&payload(json!({"voice": "echo"})));
        assert!(state.apply_switch(&patch));
        assert_eq!(state.current().unwrap().voice.as_deref(), Some("echo"));
        assert_eq!(state.find("k9").unwrap().voice.as_deref(), Some("echo"));
    }

    #[test]
    fn test_switch_from_empty_state_without_name_is_noop() {
        let mut state = PersonaState::default();
        assert!(!state.apply_switch(&PersonaPatch::default()));
        assert_eq!(state, PersonaState::default());
    }

    #[test]
    fn test_goal_updates_current_only() {
        let mut state = PersonaState::from_catalog(catalog());
        assert!(state.apply_goal("Guard the house"));
        assert_eq!(
            state.current().unwrap().default_motivation.as_deref(),
            Some("Guard the house")
        );
        assert_eq!(state.find("k9").unwrap().default_motivation, None);

        let mut empty = PersonaState::default();
        assert!(!empty.apply_goal("anything"));
    }

    #[test]
    fn test_prompt_update_tri_state() {
        let mut state = PersonaState::from_catalog(catalog());
        let update = PromptUpdate::from_payload(&payload(json!({
            "persona": "k9",
            "prompt": "You are a very good dog",
            "voice": null,
            "image_prompt": "a metal dog"
        })));

        assert!(state.apply_prompt(&update));
        for entry in [state.find("k9").unwrap(), state.current().unwrap()] {
            assert_eq!(entry.prompt.as_deref(), Some("You are a very good dog"));
            assert_eq!(entry.voice, None);
            assert_eq!(entry.description.as_deref(), Some("Loyal robot dog"));
            assert_eq!(entry.image_prompt.as_deref(), Some("a metal dog"));
        }
    }

    #[test]
    fn test_prompt_update_for_other_persona_leaves_current() {
        let mut state = PersonaState::from_catalog(catalog());
        let update = PromptUpdate::from_payload(&payload(json!({"persona": "pirate", "prompt": "Yo ho"})));
        assert!(state.apply_prompt(&update));
        assert_eq!(state.find("pirate").unwrap().prompt.as_deref(), Some("Yo ho"));
        assert_eq!(state.current().unwrap().prompt.as_deref(), Some("You are K9"));
    }
}
