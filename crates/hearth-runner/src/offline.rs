//! Offline decision generator.
//!
//! Produces plausible actions and dialogue without any I/O so the game
//! stays playable with no decision service at all. Attack chance, speech
//! chance and the pools are fixed, so the output is stable in
//! distribution.
//!
//! Agent controllers pass their own random stream to
//! [`OfflineGenerator::sample`], so what one agent gets never depends on
//! how many draws other agents made first. [`OfflineGenerator::decide`]
//! draws from the generator's own stream instead.

use std::sync::{Mutex, PoisonError};

use hearth_types::{ActionKind, ContextSnapshot, Decision, DialogueRole};
use rand::rngs::SmallRng;
use rand::seq::IndexedRandom;
use rand::{Rng, SeedableRng};

/// Actions sampled when nothing more specific applies.
pub const WANDER_ACTIONS: [ActionKind; 5] = [
    ActionKind::MoveLeft,
    ActionKind::MoveRight,
    ActionKind::MoveUp,
    ActionKind::MoveDown,
    ActionKind::Idle,
];

const MERCHANT_LINES: [&str; 4] = [
    "Fresh wares, fair prices!",
    "Looking for something special?",
    "Best goods in the valley, friend.",
    "Coin first, questions later.",
];

const GUARD_LINES: [&str; 4] = [
    "Move along, citizen.",
    "Keep the peace and we'll get along.",
    "Halt! State your business.",
    "All quiet on my watch.",
];

const CLOSE_LINES: [&str; 3] = [
    "Hello there, traveler!",
    "Nice weather today, isn't it?",
    "Careful out there, monsters roam the roads.",
];

const GENERIC_LINES: [&str; 4] = [
    "Hmm...",
    "What a long day.",
    "I wonder what lies beyond the hills.",
    "Did you hear that?",
];

/// Tunables for the offline generator.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OfflineConfig {
    /// Player distance under which an attack-capable agent may strike.
    pub strike_range: f64,
    /// Chance of attacking when the player is within strike range.
    pub attack_probability: f64,
    /// Chance of attaching a line (action agents) or an action
    /// (dialogue agents).
    pub speech_probability: f64,
    /// Player distance under which dialogue agents greet the player.
    pub close_dialogue_range: f64,
}

impl Default for OfflineConfig {
    fn default() -> Self {
        Self {
            strike_range: 100.0,
            attack_probability: 0.3,
            speech_probability: 0.5,
            close_dialogue_range: 50.0,
        }
    }
}

/// Samples decisions locally.
///
/// The built-in RNG sits behind a mutex so one generator can serve
/// concurrent callers that bring no stream of their own.
pub struct OfflineGenerator {
    config: OfflineConfig,
    rng: Mutex<SmallRng>,
}

impl core::fmt::Debug for OfflineGenerator {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("OfflineGenerator")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl Default for OfflineGenerator {
    fn default() -> Self {
        Self::new(OfflineConfig::default())
    }
}

impl OfflineGenerator {
    /// Create a generator seeded from the operating system.
    pub fn new(config: OfflineConfig) -> Self {
        Self {
            config,
            rng: Mutex::new(SmallRng::from_os_rng()),
        }
    }

    /// Create a generator with a fixed seed.
    pub fn seeded(config: OfflineConfig, seed: u64) -> Self {
        Self {
            config,
            rng: Mutex::new(SmallRng::seed_from_u64(seed)),
        }
    }

    /// The active tunables.
    pub const fn config(&self) -> &OfflineConfig {
        &self.config
    }

    /// Sample a decision for `snapshot` from the generator's own stream.
    pub fn decide(&self, snapshot: &ContextSnapshot) -> Decision {
        let mut rng = self.rng.lock().unwrap_or_else(PoisonError::into_inner);
        self.sample(snapshot, &mut *rng)
    }

    /// Sample a decision for `snapshot` from `rng`.
    pub fn sample<R: Rng + ?Sized>(&self, snapshot: &ContextSnapshot, rng: &mut R) -> Decision {
        if snapshot.is_dialogue() {
            let line = pick_line(self.pool_for(snapshot), rng);
            let action = if chance(rng, self.config.speech_probability) {
                pick_action(rng)
            } else {
                ActionKind::Idle
            };
            return Decision::speak(action, line);
        }

        let in_strike_range = snapshot
            .player_distance()
            .is_some_and(|d| d < self.config.strike_range);
        if snapshot.can_attack && in_strike_range && chance(rng, self.config.attack_probability) {
            return Decision::act(ActionKind::Attack);
        }

        let action = pick_action(rng);
        if chance(rng, self.config.speech_probability) {
            Decision::speak(action, pick_line(self.pool_for(snapshot), rng))
        } else {
            Decision::act(action)
        }
    }

    /// A canned line for `snapshot`, used when a networked dialogue
    /// request falls back.
    pub fn fallback_line(&self, snapshot: &ContextSnapshot) -> String {
        let mut rng = self.rng.lock().unwrap_or_else(PoisonError::into_inner);
        self.line_from(snapshot, &mut *rng)
    }

    /// A canned line for `snapshot`, drawn from `rng`.
    pub fn line_from<R: Rng + ?Sized>(&self, snapshot: &ContextSnapshot, rng: &mut R) -> String {
        pick_line(self.pool_for(snapshot), rng).to_owned()
    }

    fn pool_for(&self, snapshot: &ContextSnapshot) -> &'static [&'static str] {
        match snapshot.archetype.dialogue_role() {
            Some(DialogueRole::Merchant) => &MERCHANT_LINES,
            Some(DialogueRole::Guard) => &GUARD_LINES,
            _ if snapshot
                .player_distance()
                .is_some_and(|d| d < self.config.close_dialogue_range) =>
            {
                &CLOSE_LINES
            }
            _ => &GENERIC_LINES,
        }
    }
}

/// Bernoulli draw that tolerates out-of-range probabilities.
fn chance<R: Rng + ?Sized>(rng: &mut R, probability: f64) -> bool {
    rng.random::<f64>() < probability
}

fn pick_action<R: Rng + ?Sized>(rng: &mut R) -> ActionKind {
    WANDER_ACTIONS
        .choose(rng)
        .copied()
        .unwrap_or(ActionKind::Idle)
}

fn pick_line<R: Rng + ?Sized>(pool: &[&'static str], rng: &mut R) -> &'static str {
    pool.choose(rng).copied().unwrap_or("...")
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::arithmetic_side_effects,
    clippy::cast_precision_loss
)]
mod tests {
    use hearth_types::{AgentArchetype, AgentId, PlayerProximity, Vec2};

    use super::*;

    fn snapshot(archetype: AgentArchetype, player_distance: Option<f64>) -> ContextSnapshot {
        ContextSnapshot {
            agent_id: AgentId::new(),
            name: "Test".to_owned(),
            archetype,
            position: Vec2::new(100.0, 100.0),
            health: 100,
            last_action: None,
            nearby_agents: Vec::new(),
            player: player_distance.map(|distance| PlayerProximity {
                position: Vec2::new(100.0 + distance, 100.0),
                distance,
            }),
            nearby_obstacles: Vec::new(),
            can_attack: archetype.can_attack(),
        }
    }

    #[test]
    fn attack_rate_matches_configured_probability() {
        let generator = OfflineGenerator::seeded(OfflineConfig::default(), 7);
        let snap = snapshot(AgentArchetype::Combatant, Some(40.0));
        let trials = 10_000;
        let mut attacks = 0_u32;
        for _ in 0..trials {
            let decision = generator.decide(&snap);
            if decision.action == ActionKind::Attack {
                attacks += 1;
            } else {
                assert!(WANDER_ACTIONS.contains(&decision.action));
            }
        }
        let rate = f64::from(attacks) / f64::from(trials);
        assert!((rate - 0.3).abs() < 0.03, "attack rate {rate}");
    }

    #[test]
    fn no_attack_out_of_range_or_when_unable() {
        let generator = OfflineGenerator::seeded(OfflineConfig::default(), 11);
        let far = snapshot(AgentArchetype::Combatant, Some(150.0));
        let caster = snapshot(AgentArchetype::Caster, Some(20.0));
        let unseen = snapshot(AgentArchetype::Combatant, None);
        for _ in 0..2_000 {
            assert_ne!(generator.decide(&far).action, ActionKind::Attack);
            assert_ne!(generator.decide(&caster).action, ActionKind::Attack);
            assert_ne!(generator.decide(&unseen).action, ActionKind::Attack);
        }
    }

    #[test]
    fn dialogue_agents_always_speak_from_their_pool() {
        let generator = OfflineGenerator::seeded(OfflineConfig::default(), 3);
        let merchant = snapshot(
            AgentArchetype::Dialogue {
                role: DialogueRole::Merchant,
            },
            Some(30.0),
        );
        let guard = snapshot(
            AgentArchetype::Dialogue {
                role: DialogueRole::Guard,
            },
            None,
        );
        for _ in 0..200 {
            let line = generator.decide(&merchant).line.unwrap();
            assert!(MERCHANT_LINES.contains(&line.as_str()));
            let line = generator.decide(&guard).line.unwrap();
            assert!(GUARD_LINES.contains(&line.as_str()));
        }
    }

    #[test]
    fn villagers_pick_pool_by_player_distance() {
        let generator = OfflineGenerator::seeded(OfflineConfig::default(), 5);
        let villager = AgentArchetype::Dialogue {
            role: DialogueRole::Villager,
        };
        let close = snapshot(villager, Some(30.0));
        let far = snapshot(villager, Some(80.0));
        for _ in 0..200 {
            let line = generator.fallback_line(&close);
            assert!(CLOSE_LINES.contains(&line.as_str()));
            let line = generator.fallback_line(&far);
            assert!(GENERIC_LINES.contains(&line.as_str()));
        }
    }

    #[test]
    fn speech_rate_for_action_agents() {
        let generator = OfflineGenerator::seeded(OfflineConfig::default(), 13);
        let snap = snapshot(AgentArchetype::Caster, None);
        let trials = 4_000_u32;
        let spoken = (0..trials)
            .filter(|_| generator.decide(&snap).line.is_some())
            .count();
        let rate = spoken as f64 / f64::from(trials);
        assert!((rate - 0.5).abs() < 0.05, "speech rate {rate}");
    }

    #[test]
    fn seeded_generators_agree() {
        let a = OfflineGenerator::seeded(OfflineConfig::default(), 42);
        let b = OfflineGenerator::seeded(OfflineConfig::default(), 42);
        let snap = snapshot(AgentArchetype::Combatant, Some(10.0));
        for _ in 0..100 {
            assert_eq!(a.decide(&snap), b.decide(&snap));
        }
    }

    #[test]
    fn action_agents_greet_a_close_player() {
        let config = OfflineConfig {
            speech_probability: 1.0,
            ..OfflineConfig::default()
        };
        let generator = OfflineGenerator::seeded(config, 17);
        let close = snapshot(AgentArchetype::Caster, Some(30.0));
        let far = snapshot(AgentArchetype::Caster, Some(90.0));
        for _ in 0..200 {
            let line = generator.decide(&close).line.unwrap();
            assert!(CLOSE_LINES.contains(&line.as_str()));
            let line = generator.decide(&far).line.unwrap();
            assert!(GENERIC_LINES.contains(&line.as_str()));
        }
    }

    #[test]
    fn caller_streams_are_independent_of_each_other() {
        let shared = OfflineGenerator::seeded(OfflineConfig::default(), 8);
        let a = snapshot(AgentArchetype::Combatant, Some(60.0));
        let b = snapshot(AgentArchetype::Caster, Some(20.0));

        let run = |a_first: bool| {
            let mut rng_a = SmallRng::seed_from_u64(100);
            let mut rng_b = SmallRng::seed_from_u64(200);
            let mut seen_by_a = Vec::new();
            for _ in 0..20 {
                if a_first {
                    seen_by_a.push(shared.sample(&a, &mut rng_a));
                    shared.sample(&b, &mut rng_b);
                } else {
                    shared.sample(&b, &mut rng_b);
                    seen_by_a.push(shared.sample(&a, &mut rng_a));
                }
                // Draws from the built-in stream must not disturb either.
                shared.decide(&b);
            }
            seen_by_a
        };
        assert_eq!(run(true), run(false));
    }

    #[test]
    fn probabilities_outside_unit_range_do_not_panic() {
        let config = OfflineConfig {
            attack_probability: 1.5,
            speech_probability: f64::NAN,
            ..OfflineConfig::default()
        };
        let generator = OfflineGenerator::seeded(config, 1);
        let snap = snapshot(AgentArchetype::Combatant, Some(10.0));
        assert_eq!(generator.decide(&snap).action, ActionKind::Attack);
        let caster = snapshot(AgentArchetype::Caster, None);
        assert!(generator.decide(&caster).line.is_none());
    }
}
