//! Per-agent tunables.
//!
//! Everything that used to be ambient (first-agent timing, debug output)
//! is an explicit field here, passed in when the agent is created.

use std::time::Duration;

use hearth_types::{AgentArchetype, DialogueRole};

/// Configuration for one agent.
#[derive(Debug, Clone, PartialEq)]
pub struct AgentConfig {
    /// Display name.
    pub name: String,

    /// Archetype, carrying the dialogue role for talking NPCs.
    pub archetype: AgentArchetype,

    /// Starting health (default: 100).
    pub health: u32,

    /// Base time between decision requests (default: 6s).
    pub decision_interval: Duration,

    /// Upper bound of the random offset added to the interval and to the
    /// initial timer phase (default: 2s).
    pub interval_jitter: Duration,

    /// Distance within which agents and the player are perceived
    /// (default: 200).
    pub vision_radius: f64,

    /// Movement speed in units per second (default: 150).
    pub walk_speed: f64,

    /// Time between stuck checks (default: 500ms).
    pub stuck_check_interval: Duration,

    /// Displacement below which a moving agent counts as stuck
    /// (default: 2.0).
    pub stuck_epsilon: f64,

    /// Delay before a dialogue agent retries after a fallback
    /// (default: 2s).
    pub dialogue_retry_delay: Duration,

    /// Log every decision at info level.
    pub debug: bool,

    /// Seed for the agent's own RNG; `None` seeds from the OS.
    pub seed: Option<u64>,
}

impl AgentConfig {
    /// Default tunables for the given name and archetype.
    pub fn new(name: impl Into<String>, archetype: AgentArchetype) -> Self {
        Self {
            name: name.into(),
            archetype,
            health: 100,
            decision_interval: Duration::from_secs(6),
            interval_jitter: Duration::from_secs(2),
            vision_radius: 200.0,
            walk_speed: 150.0,
            stuck_check_interval: Duration::from_millis(500),
            stuck_epsilon: 2.0,
            dialogue_retry_delay: Duration::from_secs(2),
            debug: false,
            seed: None,
        }
    }

    /// A dialogue agent whose role is guessed from its name.
    pub fn dialogue(name: impl Into<String>) -> Self {
        let name = name.into();
        let role = DialogueRole::infer_from_name(&name);
        Self::new(name, AgentArchetype::Dialogue { role })
    }

    /// Fix the agent's RNG seed.
    #[must_use]
    pub const fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Enable or disable verbose decision logging.
    #[must_use]
    pub const fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = AgentConfig::new("Grunt", AgentArchetype::Combatant);
        assert_eq!(config.health, 100);
        assert_eq!(config.decision_interval, Duration::from_secs(6));
        assert_eq!(config.interval_jitter, Duration::from_secs(2));
        assert_eq!(config.stuck_check_interval, Duration::from_millis(500));
        assert!(config.seed.is_none());
        assert!(!config.debug);
    }

    #[test]
    fn dialogue_role_from_name() {
        let merchant = AgentConfig::dialogue("Marchand Pierre");
        assert_eq!(
            merchant.archetype,
            AgentArchetype::Dialogue {
                role: DialogueRole::Merchant
            }
        );
        let villager = AgentConfig::dialogue("Old Tom").with_seed(3);
        assert_eq!(villager.archetype.dialogue_role(), Some(DialogueRole::Villager));
        assert_eq!(villager.seed, Some(3));
    }
}
