//! Enumeration types shared across the decision loop.

use serde::{Deserialize, Serialize};

use crate::geometry::Vec2;

// ---------------------------------------------------------------------------
// Actions
// ---------------------------------------------------------------------------

/// The closed set of symbolic actions an agent can be commanded to perform.
///
/// Serialized with the wire tokens the decision service is told to use
/// (`MOVE_UP`, `ATTACK_PLAYER`, ...). Declaration order carries no
/// priority.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ActionKind {
    /// Walk toward the top of the screen.
    #[serde(rename = "MOVE_UP")]
    MoveUp,
    /// Walk toward the bottom of the screen.
    #[serde(rename = "MOVE_DOWN")]
    MoveDown,
    /// Walk toward the left edge.
    #[serde(rename = "MOVE_LEFT")]
    MoveLeft,
    /// Walk toward the right edge.
    #[serde(rename = "MOVE_RIGHT")]
    MoveRight,
    /// Strike the player.
    #[serde(rename = "ATTACK_PLAYER")]
    Attack,
    /// Interact with a nearby NPC.
    #[serde(rename = "INTERACT_NPC")]
    Interact,
    /// Stand still.
    #[serde(rename = "IDLE")]
    Idle,
    /// Wander in a random direction.
    #[serde(rename = "PATROL")]
    Patrol,
}

impl ActionKind {
    /// Every action, in declaration order.
    pub const ALL: [Self; 8] = [
        Self::MoveUp,
        Self::MoveDown,
        Self::MoveLeft,
        Self::MoveRight,
        Self::Attack,
        Self::Interact,
        Self::Idle,
        Self::Patrol,
    ];

    /// The four movement directions.
    pub const MOVEMENTS: [Self; 4] = [Self::MoveLeft, Self::MoveRight, Self::MoveUp, Self::MoveDown];

    /// The wire token for this action.
    pub const fn token(self) -> &'static str {
        match self {
            Self::MoveUp => "MOVE_UP",
            Self::MoveDown => "MOVE_DOWN",
            Self::MoveLeft => "MOVE_LEFT",
            Self::MoveRight => "MOVE_RIGHT",
            Self::Attack => "ATTACK_PLAYER",
            Self::Interact => "INTERACT_NPC",
            Self::Idle => "IDLE",
            Self::Patrol => "PATROL",
        }
    }

    /// True for the four directional movement actions.
    pub const fn is_movement(self) -> bool {
        matches!(
            self,
            Self::MoveUp | Self::MoveDown | Self::MoveLeft | Self::MoveRight
        )
    }

    /// Velocity for this action at the given walk speed.
    ///
    /// Non-movement actions return [`Vec2::ZERO`].
    pub const fn velocity(self, speed: f64) -> Vec2 {
        match self {
            Self::MoveUp => Vec2::new(0.0, -speed),
            Self::MoveDown => Vec2::new(0.0, speed),
            Self::MoveLeft => Vec2::new(-speed, 0.0),
            Self::MoveRight => Vec2::new(speed, 0.0),
            Self::Attack | Self::Interact | Self::Idle | Self::Patrol => Vec2::ZERO,
        }
    }
}

impl core::fmt::Display for ActionKind {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.token())
    }
}

// ---------------------------------------------------------------------------
// Archetypes
// ---------------------------------------------------------------------------

/// Which canned dialogue pool a dialogue agent draws from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DialogueRole {
    /// Sells wares; talks trade.
    Merchant,
    /// Keeps watch; talks order.
    Guard,
    /// Anyone else.
    Villager,
}

impl DialogueRole {
    /// Guess a role from a display name.
    ///
    /// Only meant as a construction-time default for configurations that
    /// predate the explicit role field. Matching is a case-insensitive
    /// substring test in English and French.
    pub fn infer_from_name(name: &str) -> Self {
        let lower = name.to_lowercase();
        if lower.contains("merchant") || lower.contains("marchand") {
            Self::Merchant
        } else if lower.contains("guard") || lower.contains("garde") {
            Self::Guard
        } else {
            Self::Villager
        }
    }
}

/// Agent archetype, carrying only the data each archetype needs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AgentArchetype {
    /// Melee enemy that can attack the player.
    Combatant,
    /// Spell caster; moves and interacts but never strikes.
    Caster,
    /// Talking NPC driven by dialogue lines.
    Dialogue {
        /// Which canned pool the offline generator samples from.
        role: DialogueRole,
    },
}

impl AgentArchetype {
    /// The tag without payload.
    pub const fn kind(self) -> ArchetypeKind {
        match self {
            Self::Combatant => ArchetypeKind::Combatant,
            Self::Caster => ArchetypeKind::Caster,
            Self::Dialogue { .. } => ArchetypeKind::Dialogue,
        }
    }

    /// Whether agents of this archetype may attack the player.
    pub const fn can_attack(self) -> bool {
        matches!(self, Self::Combatant)
    }

    /// The dialogue role, for dialogue agents.
    pub const fn dialogue_role(self) -> Option<DialogueRole> {
        match self {
            Self::Dialogue { role } => Some(role),
            Self::Combatant | Self::Caster => None,
        }
    }
}

/// Payload-free archetype tag, used where only the kind matters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArchetypeKind {
    /// See [`AgentArchetype::Combatant`].
    Combatant,
    /// See [`AgentArchetype::Caster`].
    Caster,
    /// See [`AgentArchetype::Dialogue`].
    Dialogue,
}

impl ArchetypeKind {
    /// Lowercase label used in prompts and logs.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Combatant => "combatant",
            Self::Caster => "caster",
            Self::Dialogue => "dialogue",
        }
    }
}

impl core::fmt::Display for ArchetypeKind {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}
