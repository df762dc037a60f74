//! Scene description loaded from YAML.
//!
//! A scene lists the arena size, static obstacles, the stand-in player
//! and the NPCs to spawn. The engine reads `hearth-scene.yaml` from the
//! working directory (or the path in `SCENE_PATH`) and falls back to a
//! built-in scene when neither exists.

use std::path::Path;
use std::time::Duration;

use hearth_agents::{AgentConfig, Obstacle};
use hearth_types::{ActionKind, AgentArchetype, ArchetypeKind, DialogueRole, Vec2};
use serde::Deserialize;
use tracing::info;

use crate::error::EngineError;

/// Default scene file name, relative to the working directory.
pub const DEFAULT_SCENE_PATH: &str = "hearth-scene.yaml";

/// Everything the engine needs to set up and run a scene.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct SceneConfig {
    /// Arena width and height; bodies are kept inside.
    pub arena: Vec2,
    /// Frames per second of the fixed-rate loop.
    pub frame_rate_hz: u32,
    /// How long to run before shutting down; 0 runs until interrupted.
    pub duration_secs: u64,
    /// Period of the manual override; 0 disables it.
    pub force_every_secs: u64,
    /// The action forced on every agent each period.
    pub force_action: ActionKind,
    /// The stand-in player.
    pub player: PlayerConfig,
    /// Static obstacles.
    pub obstacles: Vec<Obstacle>,
    /// NPCs to spawn.
    pub agents: Vec<AgentSpec>,
}

/// The player wanders randomly so agents have something to react to.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default)]
pub struct PlayerConfig {
    /// Starting position.
    pub start: Vec2,
    /// Walking speed in units per second.
    pub speed: f64,
    /// Seconds between direction changes.
    pub turn_every_secs: f64,
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            start: Vec2::new(400.0, 500.0),
            speed: 120.0,
            turn_every_secs: 2.0,
        }
    }
}

/// One NPC in the scene.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct AgentSpec {
    /// Display name.
    pub name: String,
    /// Archetype tag.
    pub kind: ArchetypeKind,
    /// Dialogue role; guessed from the name when omitted.
    #[serde(default)]
    pub role: Option<DialogueRole>,
    /// Spawn position.
    pub position: Vec2,
    /// Log this agent's decisions at info level.
    #[serde(default)]
    pub debug: bool,
    /// Override of the base decision interval.
    #[serde(default)]
    pub decision_interval_ms: Option<u64>,
}

impl AgentSpec {
    fn new(name: &str, kind: ArchetypeKind, x: f64, y: f64) -> Self {
        Self {
            name: name.to_owned(),
            kind,
            role: None,
            position: Vec2::new(x, y),
            debug: false,
            decision_interval_ms: None,
        }
    }

    /// The archetype, resolving a missing dialogue role from the name.
    pub fn archetype(&self) -> AgentArchetype {
        match self.kind {
            ArchetypeKind::Combatant => AgentArchetype::Combatant,
            ArchetypeKind::Caster => AgentArchetype::Caster,
            ArchetypeKind::Dialogue => AgentArchetype::Dialogue {
                role: self
                    .role
                    .unwrap_or_else(|| DialogueRole::infer_from_name(&self.name)),
            },
        }
    }

    /// Build the agent configuration, deriving a per-agent seed from
    /// `base_seed` when one is set.
    pub fn to_config(&self, base_seed: Option<u64>, index: usize) -> AgentConfig {
        let mut config = AgentConfig::new(self.name.clone(), self.archetype()).with_debug(self.debug);
        if let Some(ms) = self.decision_interval_ms {
            config.decision_interval = Duration::from_millis(ms);
        }
        if let Some(seed) = base_seed {
            let offset = u64::try_from(index).unwrap_or(u64::MAX);
            config = config.with_seed(seed.wrapping_add(offset));
        }
        config
    }
}

impl Default for SceneConfig {
    fn default() -> Self {
        let obstacle = |x: f64, y: f64, w: f64, h: f64| Obstacle {
            center: Vec2::new(x, y),
            extent: Vec2::new(w, h),
        };
        Self {
            arena: Vec2::new(800.0, 600.0),
            frame_rate_hz: 60,
            duration_secs: 60,
            force_every_secs: 20,
            force_action: ActionKind::Patrol,
            player: PlayerConfig::default(),
            obstacles: vec![
                obstacle(400.0, 300.0, 100.0, 100.0),
                obstacle(200.0, 200.0, 50.0, 50.0),
                obstacle(600.0, 400.0, 50.0, 50.0),
                obstacle(100.0, 500.0, 100.0, 50.0),
                obstacle(700.0, 100.0, 50.0, 100.0),
            ],
            agents: vec![
                AgentSpec::new("Grunt", ArchetypeKind::Combatant, 200.0, 150.0),
                AgentSpec::new("Brute", ArchetypeKind::Combatant, 300.0, 200.0),
                AgentSpec::new("Mage", ArchetypeKind::Caster, 400.0, 100.0),
                AgentSpec::new("Sorcerer", ArchetypeKind::Caster, 150.0, 300.0),
                AgentSpec::new("Merchant Mira", ArchetypeKind::Dialogue, 560.0, 520.0),
                AgentSpec::new("Guard Hal", ArchetypeKind::Dialogue, 700.0, 300.0),
            ],
        }
    }
}

impl SceneConfig {
    /// Time per frame.
    pub fn frame(&self) -> Duration {
        Duration::from_secs_f64(1.0 / f64::from(self.frame_rate_hz.max(1)))
    }

    /// Parse a scene from YAML text.
    pub fn from_yaml(contents: &str) -> Result<Self, EngineError> {
        serde_yml::from_str(contents).map_err(|e| EngineError::Scene {
            message: format!("failed to parse scene YAML: {e}"),
        })
    }

    /// Load the scene from `SCENE_PATH`, then `hearth-scene.yaml`, then
    /// the built-in default.
    ///
    /// An explicit `SCENE_PATH` that does not exist is an error.
    pub fn load() -> Result<Self, EngineError> {
        match std::env::var("SCENE_PATH") {
            Ok(path) => Self::from_file(Path::new(&path)),
            Err(_) => {
                let path = Path::new(DEFAULT_SCENE_PATH);
                if path.exists() {
                    Self::from_file(path)
                } else {
                    info!("Scene file not found, using built-in scene");
                    Ok(Self::default())
                }
            }
        }
    }

    fn from_file(path: &Path) -> Result<Self, EngineError> {
        let contents = std::fs::read_to_string(path).map_err(|e| EngineError::Scene {
            message: format!("failed to read {}: {e}", path.display()),
        })?;
        let scene = Self::from_yaml(&contents)?;
        info!(path = %path.display(), agents = scene.agents.len(), "Scene loaded");
        Ok(scene)
    }
}
