//! Context snapshot assembly.
//!
//! Before fanning out a frame update the registry freezes a [`WorldView`]
//! of every agent position, the player and the static obstacles. Each
//! controller builds its [`ContextSnapshot`] from that view, so what one
//! agent sees never depends on which agents were updated before it in the
//! same frame.
//!
//! Filtering is by Euclidean distance: agents and the player are included
//! within the vision radius, obstacles within
//! [`OBSTACLE_VISION_FACTOR`] times the vision radius.

use hearth_types::{
    ActionKind, AgentArchetype, AgentId, ArchetypeKind, ContextSnapshot, NearbyAgent,
    NearbyObstacle, PlayerProximity, Vec2,
};
use serde::{Deserialize, Serialize};

/// Obstacles are static and low priority, so agents see them further out.
pub const OBSTACLE_VISION_FACTOR: f64 = 1.2;

/// Public view of one agent, as other agents and the engine see it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AgentHandle {
    /// Agent identifier.
    pub id: AgentId,
    /// Display name.
    pub name: String,
    /// Archetype tag.
    pub kind: ArchetypeKind,
    /// Position at the time the handle was taken.
    pub position: Vec2,
}

/// A static axis-aligned obstacle.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Obstacle {
    /// Center of the box.
    pub center: Vec2,
    /// Width and height.
    pub extent: Vec2,
}

impl Obstacle {
    /// Whether an axis-aligned box of `size` centered at `center` overlaps
    /// this obstacle.
    pub fn overlaps(&self, center: Vec2, size: Vec2) -> bool {
        let dx = (self.center.x - center.x).abs();
        let dy = (self.center.y - center.y).abs();
        dx * 2.0 < self.extent.x + size.x && dy * 2.0 < self.extent.y + size.y
    }
}

/// Immutable picture of the world for one frame.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WorldView {
    /// Every live agent.
    pub agents: Vec<AgentHandle>,
    /// Player position, if there is a player.
    pub player: Option<Vec2>,
    /// Static obstacles.
    pub obstacles: Vec<Obstacle>,
}

impl WorldView {
    /// Every agent except `id`.
    pub fn others(&self, id: AgentId) -> impl Iterator<Item = &AgentHandle> {
        self.agents.iter().filter(move |a| a.id != id)
    }
}

/// The agent a snapshot is built for.
#[derive(Debug, Clone, Copy)]
pub struct Subject<'a> {
    /// Agent identifier.
    pub id: AgentId,
    /// Display name.
    pub name: &'a str,
    /// Archetype.
    pub archetype: AgentArchetype,
    /// Current position.
    pub position: Vec2,
    /// Current health.
    pub health: u32,
    /// Action applied most recently, if any.
    pub last_action: Option<ActionKind>,
}

/// Build the snapshot for `subject` from a frozen world view.
pub fn build_snapshot(subject: &Subject<'_>, world: &WorldView, vision_radius: f64) -> ContextSnapshot {
    let origin = subject.position;

    let nearby_agents = world
        .others(subject.id)
        .filter_map(|other| {
            let distance = origin.distance_to(other.position);
            (distance <= vision_radius).then_some(NearbyAgent {
                id: other.id,
                kind: other.kind,
                position: other.position,
                distance,
            })
        })
        .collect();

    let player = world.player.and_then(|position| {
        let distance = origin.distance_to(position);
        (distance <= vision_radius).then_some(PlayerProximity { position, distance })
    });

    let obstacle_radius = vision_radius * OBSTACLE_VISION_FACTOR;
    let nearby_obstacles = world
        .obstacles
        .iter()
        .filter_map(|obstacle| {
            let distance = origin.distance_to(obstacle.center);
            (distance <= obstacle_radius).then_some(NearbyObstacle {
                position: obstacle.center,
                extent: obstacle.extent,
                distance,
            })
        })
        .collect();

    ContextSnapshot {
        agent_id: subject.id,
        name: subject.name.to_owned(),
        archetype: subject.archetype,
        position: origin,
        health: subject.health,
        last_action: subject.last_action,
        nearby_agents,
        player,
        nearby_obstacles,
        can_attack: subject.archetype.can_attack(),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;

    fn handle(name: &str, kind: ArchetypeKind, x: f64, y: f64) -> AgentHandle {
        AgentHandle {
            id: AgentId::new(),
            name: name.to_owned(),
            kind,
            position: Vec2::new(x, y),
        }
    }

    fn subject(id: AgentId) -> Subject<'static> {
        Subject {
            id,
            name: "Grunt",
            archetype: AgentArchetype::Combatant,
            position: Vec2::new(0.0, 0.0),
            health: 100,
            last_action: Some(ActionKind::MoveUp),
        }
    }

    #[test]
    fn filters_by_vision_radius() {
        let me = handle("Grunt", ArchetypeKind::Combatant, 0.0, 0.0);
        let world = WorldView {
            agents: vec![
                me.clone(),
                handle("Edge", ArchetypeKind::Caster, 200.0, 0.0),
                handle("Far", ArchetypeKind::Caster, 0.0, 200.5),
                handle("Near", ArchetypeKind::Dialogue, 30.0, 40.0),
            ],
            player: Some(Vec2::new(120.0, 160.0)),
            obstacles: vec![
                Obstacle {
                    center: Vec2::new(240.0, 0.0),
                    extent: Vec2::new(50.0, 50.0),
                },
                Obstacle {
                    center: Vec2::new(0.0, 241.0),
                    extent: Vec2::new(50.0, 50.0),
                },
            ],
        };

        let snap = build_snapshot(&subject(me.id), &world, 200.0);

        assert_eq!(snap.agent_id, me.id);
        assert!(snap.can_attack);
        assert_eq!(snap.last_action, Some(ActionKind::MoveUp));

        let seen: Vec<_> = snap.nearby_agents.iter().map(|a| a.kind).collect();
        assert_eq!(seen, vec![ArchetypeKind::Caster, ArchetypeKind::Dialogue]);
        assert!(snap.nearby_agents.iter().all(|a| a.id != me.id));
        assert!((snap.nearby_agents[1].distance - 50.0).abs() < 1e-9);

        let player = snap.player.unwrap();
        assert!((player.distance - 200.0).abs() < 1e-9);

        assert_eq!(snap.nearby_obstacles.len(), 1);
        assert!((snap.nearby_obstacles[0].position.x - 240.0).abs() < 1e-9);
    }

    #[test]
    fn absent_player_is_none() {
        let me = handle("Grunt", ArchetypeKind::Combatant, 0.0, 0.0);
        let mut world = WorldView {
            agents: vec![me.clone()],
            player: None,
            obstacles: Vec::new(),
        };
        assert!(build_snapshot(&subject(me.id), &world, 200.0).player.is_none());

        world.player = Some(Vec2::new(300.0, 0.0));
        let snap = build_snapshot(&subject(me.id), &world, 200.0);
        assert!(snap.player.is_none());
        assert!(snap.nearby_agents.is_empty());
        assert!(snap.nearby_obstacles.is_empty());
    }

    #[test]
    fn obstacle_overlap() {
        let wall = Obstacle {
            center: Vec2::new(400.0, 300.0),
            extent: Vec2::new(100.0, 100.0),
        };
        let size = Vec2::new(32.0, 32.0);
        assert!(wall.overlaps(Vec2::new(400.0, 300.0), size));
        assert!(wall.overlaps(Vec2::new(460.0, 300.0), size));
        assert!(!wall.overlaps(Vec2::new(470.0, 300.0), size));
        assert!(!wall.overlaps(Vec2::new(400.0, 200.0), size));
    }
}
