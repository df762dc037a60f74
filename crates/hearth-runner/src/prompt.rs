//! Prompt template loading and rendering via `minijinja`.
//!
//! Three templates drive the prompts: `system.j2` (the fixed instruction
//! enumerating the permitted action tokens), `dialogue_system.j2` (the
//! instruction for talking NPCs), and `snapshot.j2` (the rendered
//! situation). Defaults are compiled into the binary; operators can point
//! [`PromptEngine::from_dir`] at a directory of replacements to tune NPC
//! behavior without recompiling.

use hearth_types::ContextSnapshot;
use minijinja::Environment;
use serde::Serialize;

use crate::config::ConfigError;
use crate::error::DecisionError;
use crate::vocabulary::VOCABULARY;

const SYSTEM_TEMPLATE: &str = include_str!("../templates/system.j2");
const DIALOGUE_SYSTEM_TEMPLATE: &str = include_str!("../templates/dialogue_system.j2");
const SNAPSHOT_TEMPLATE: &str = include_str!("../templates/snapshot.j2");

/// Template names, each loaded from `<name>.j2`.
const TEMPLATE_NAMES: [&str; 3] = ["system", "dialogue_system", "snapshot"];

/// Manages prompt templates and renders snapshots into prompts.
pub struct PromptEngine {
    env: Environment<'static>,
}

/// The complete rendered prompt ready to send to a chat backend.
#[derive(Debug, Clone)]
pub struct RenderedPrompt {
    /// System message enumerating the permitted answers.
    pub system: String,
    /// User message describing the agent's situation.
    pub user: String,
}

/// Values visible to the templates.
#[derive(Serialize)]
struct PromptContext<'a> {
    #[serde(flatten)]
    snapshot: &'a ContextSnapshot,
    agent_type: &'static str,
    actions: Vec<&'static str>,
}

impl PromptEngine {
    /// Create a prompt engine with the built-in templates.
    pub fn new() -> Result<Self, ConfigError> {
        Self::from_sources([
            ("system", SYSTEM_TEMPLATE.to_owned()),
            ("dialogue_system", DIALOGUE_SYSTEM_TEMPLATE.to_owned()),
            ("snapshot", SNAPSHOT_TEMPLATE.to_owned()),
        ])
    }

    /// Create a prompt engine loading templates from the given directory.
    ///
    /// The directory must contain `system.j2`, `dialogue_system.j2` and
    /// `snapshot.j2`.
    pub fn from_dir(templates_dir: &str) -> Result<Self, ConfigError> {
        let mut sources = Vec::with_capacity(TEMPLATE_NAMES.len());
        for name in TEMPLATE_NAMES {
            sources.push((name, load_template(templates_dir, name)?));
        }
        Self::from_sources(sources)
    }

    fn from_sources(
        sources: impl IntoIterator<Item = (&'static str, String)>,
    ) -> Result<Self, ConfigError> {
        let mut env = Environment::new();
        for (name, source) in sources {
            env.add_template_owned(name, source)
                .map_err(|e| ConfigError::Template(format!("failed to add {name} template: {e}")))?;
        }
        Ok(Self { env })
    }

    /// Render the prompt asking for an action.
    pub fn render_action(&self, snapshot: &ContextSnapshot) -> Result<RenderedPrompt, DecisionError> {
        self.render("system", snapshot)
    }

    /// Render the prompt asking for a dialogue line.
    pub fn render_dialogue(
        &self,
        snapshot: &ContextSnapshot,
    ) -> Result<RenderedPrompt, DecisionError> {
        self.render("dialogue_system", snapshot)
    }

    fn render(
        &self,
        system_name: &str,
        snapshot: &ContextSnapshot,
    ) -> Result<RenderedPrompt, DecisionError> {
        let ctx = PromptContext {
            snapshot,
            agent_type: snapshot.agent_type().as_str(),
            actions: VOCABULARY.iter().map(|a| a.token()).collect(),
        };

        let system = self
            .env
            .get_template(system_name)
            .map_err(|e| DecisionError::Template(format!("missing {system_name} template: {e}")))?
            .render(&ctx)
            .map_err(|e| DecisionError::Template(format!("{system_name} render failed: {e}")))?;

        let user = self
            .env
            .get_template("snapshot")
            .map_err(|e| DecisionError::Template(format!("missing snapshot template: {e}")))?
            .render(&ctx)
            .map_err(|e| DecisionError::Template(format!("snapshot render failed: {e}")))?;

        Ok(RenderedPrompt { system, user })
    }
}

/// Read a template file from disk.
fn load_template(dir: &str, name: &str) -> Result<String, ConfigError> {
    let path = format!("{dir}/{name}.j2");
    std::fs::read_to_string(&path)
        .map_err(|e| ConfigError::Template(format!("failed to read {path}: {e}")))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use hearth_types::{
        ActionKind, AgentArchetype, AgentId, DialogueRole, NearbyAgent, NearbyObstacle,
        PlayerProximity, Vec2,
    };

    use super::*;

    fn snapshot() -> ContextSnapshot {
        ContextSnapshot {
            agent_id: AgentId::new(),
            name: "Grunt".to_owned(),
            archetype: AgentArchetype::Combatant,
            position: Vec2::new(120.4, 79.6),
            health: 100,
            last_action: Some(ActionKind::MoveLeft),
            nearby_agents: vec![NearbyAgent {
                id: AgentId::new(),
                kind: hearth_types::ArchetypeKind::Caster,
                position: Vec2::new(150.0, 80.0),
                distance: 29.6,
            }],
            player: Some(PlayerProximity {
                position: Vec2::new(160.0, 80.0),
                distance: 39.64,
            }),
            nearby_obstacles: vec![NearbyObstacle {
                position: Vec2::new(200.0, 200.0),
                extent: Vec2::new(50.0, 50.0),
                distance: 144.2,
            }],
            can_attack: true,
        }
    }

    #[test]
    fn action_prompt_lists_every_token() {
        let engine = PromptEngine::new().unwrap();
        let prompt = engine.render_action(&snapshot()).unwrap();
        for action in VOCABULARY {
            assert!(prompt.system.contains(action.token()), "{action}");
        }
        assert!(prompt.system.contains("combatant"));
    }

    #[test]
    fn snapshot_rendering() {
        let engine = PromptEngine::new().unwrap();
        let prompt = engine.render_action(&snapshot()).unwrap();
        assert!(prompt.user.contains("Position: (120, 80)"), "{}", prompt.user);
        assert!(prompt.user.contains("Last action: MOVE_LEFT"));
        assert!(prompt.user.contains("Player detected at (160, 80)"));
        assert!(prompt.user.contains("type: caster"));
        assert!(prompt.user.contains("size: 50x50"));
        assert!(prompt.user.contains("What is your next action?"));
    }

    #[test]
    fn empty_surroundings_rendering() {
        let engine = PromptEngine::new().unwrap();
        let mut snap = snapshot();
        snap.player = None;
        snap.nearby_agents.clear();
        snap.nearby_obstacles.clear();
        snap.last_action = None;
        let prompt = engine.render_action(&snap).unwrap();
        assert!(prompt.user.contains("Player not visible."));
        assert!(prompt.user.contains("No other NPCs nearby."));
        assert!(prompt.user.contains("No visible obstacles nearby."));
        assert!(prompt.user.contains("Last action: none"));
    }

    #[test]
    fn dialogue_prompt_mentions_role() {
        let engine = PromptEngine::new().unwrap();
        let mut snap = snapshot();
        snap.name = "Aldo".to_owned();
        snap.archetype = AgentArchetype::Dialogue {
            role: DialogueRole::Merchant,
        };
        let prompt = engine.render_dialogue(&snap).unwrap();
        assert!(prompt.system.contains("Aldo"));
        assert!(prompt.system.contains("merchant"));
        assert!(prompt.system.contains("|SAY:"));
    }

    #[test]
    fn templates_from_directory() {
        let unique = format!(
            "hearth_test_templates_{}_{:?}",
            std::process::id(),
            std::thread::current().id(),
        );
        let dir = std::env::temp_dir().join(unique);
        std::fs::create_dir_all(&dir).ok();
        std::fs::write(dir.join("system.j2"), "Pick one of {{ actions | length }} actions.").ok();
        std::fs::write(dir.join("dialogue_system.j2"), "Speak, {{ name }}.").ok();
        std::fs::write(dir.join("snapshot.j2"), "Health {{ health }}").ok();

        let engine = PromptEngine::from_dir(dir.to_str().unwrap_or("")).unwrap();
        let prompt = engine.render_action(&snapshot()).unwrap();
        assert_eq!(prompt.system, "Pick one of 8 actions.");
        assert_eq!(prompt.user, "Health 100");

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn missing_template_returns_error() {
        let unique = format!(
            "hearth_missing_templates_{}_{:?}",
            std::process::id(),
            std::thread::current().id(),
        );
        let dir = std::env::temp_dir().join(unique);
        std::fs::create_dir_all(&dir).ok();
        std::fs::write(dir.join("system.j2"), "only this one").ok();

        let result = PromptEngine::from_dir(dir.to_str().unwrap_or(""));
        assert!(result.is_err(), "should fail when templates are missing");

        std::fs::remove_dir_all(&dir).ok();
    }
}
