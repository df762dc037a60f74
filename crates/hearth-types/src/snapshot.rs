//! The context snapshot delivered to the decision step.
//!
//! A snapshot is everything an agent "knows" when it asks for its next
//! action. It is built fresh on every decision tick, serialized into the
//! prompt context, and dropped once the decision resolves.

use serde::{Deserialize, Serialize};

use crate::enums::{ActionKind, AgentArchetype, ArchetypeKind};
use crate::geometry::Vec2;
use crate::ids::AgentId;

/// Immutable description of one agent's situation for one decision request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContextSnapshot {
    /// The deciding agent.
    pub agent_id: AgentId,
    /// Display name (used in prompts and logs only).
    pub name: String,
    /// Archetype of the deciding agent.
    pub archetype: AgentArchetype,
    /// Current position.
    pub position: Vec2,
    /// Current health.
    pub health: u32,
    /// The action applied by the previous decision, if any.
    pub last_action: Option<ActionKind>,
    /// Other agents within the vision radius.
    pub nearby_agents: Vec<NearbyAgent>,
    /// The player, when within the vision radius.
    pub player: Option<PlayerProximity>,
    /// Static obstacles within the widened obstacle radius.
    pub nearby_obstacles: Vec<NearbyObstacle>,
    /// Whether this agent may attack (derived from the archetype).
    pub can_attack: bool,
}

impl ContextSnapshot {
    /// Archetype tag of the deciding agent.
    pub const fn agent_type(&self) -> ArchetypeKind {
        self.archetype.kind()
    }

    /// True when the deciding agent talks rather than acts.
    pub const fn is_dialogue(&self) -> bool {
        matches!(self.archetype.kind(), ArchetypeKind::Dialogue)
    }

    /// Distance to the player, when visible.
    pub fn player_distance(&self) -> Option<f64> {
        self.player.as_ref().map(|p| p.distance)
    }
}

/// Another agent seen by the deciding agent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NearbyAgent {
    /// The other agent.
    pub id: AgentId,
    /// Its archetype tag.
    pub kind: ArchetypeKind,
    /// Its position.
    pub position: Vec2,
    /// Euclidean distance from the deciding agent.
    pub distance: f64,
}

/// The player as seen by the deciding agent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerProximity {
    /// Player position.
    pub position: Vec2,
    /// Euclidean distance from the deciding agent.
    pub distance: f64,
}

/// A static obstacle seen by the deciding agent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NearbyObstacle {
    /// Obstacle center.
    pub position: Vec2,
    /// Width and height of the obstacle's bounding box.
    pub extent: Vec2,
    /// Euclidean distance from the deciding agent to the center.
    pub distance: f64,
}
