//! Minimal arcade physics for the headless host.
//!
//! Bodies move freely until their box would leave the arena or overlap an
//! obstacle; then the engine zeroes their velocity, the way a collider
//! would. Controllers react to the stop by re-applying held movement or,
//! if it keeps happening, by declaring themselves stuck.

use hearth_agents::{AgentRegistry, KinematicBody, Obstacle, PhysicsBody};
use hearth_types::Vec2;
use rand::rngs::SmallRng;
use rand::seq::IndexedRandom;
use rand::{Rng, SeedableRng};

use crate::scene::PlayerConfig;

/// The static collision world.
#[derive(Debug, Clone)]
pub struct Arena {
    size: Vec2,
    obstacles: Vec<Obstacle>,
}

impl Arena {
    /// An arena of `size` containing `obstacles`.
    pub const fn new(size: Vec2, obstacles: Vec<Obstacle>) -> Self {
        Self { size, obstacles }
    }

    /// Whether a box of `body_size` centered at `center` collides with the
    /// arena edges or any obstacle.
    pub fn blocked(&self, center: Vec2, body_size: Vec2) -> bool {
        let half_w = body_size.x / 2.0;
        let half_h = body_size.y / 2.0;
        let outside = center.x - half_w < 0.0
            || center.y - half_h < 0.0
            || center.x + half_w > self.size.x
            || center.y + half_h > self.size.y;
        outside || self.obstacles.iter().any(|o| o.overlaps(center, body_size))
    }

    /// Move `body` by `seconds` of its velocity, or stop it on collision.
    ///
    /// Returns false when the body was stopped.
    pub fn advance(&self, body: &mut KinematicBody, seconds: f64) -> bool {
        if !body.is_moving() {
            return true;
        }
        let next = body.projected(seconds);
        if self.blocked(next, body.size()) {
            body.stop();
            false
        } else {
            body.integrate(seconds);
            true
        }
    }

    /// Advance every agent body in `registry`.
    pub fn step_agents(&self, registry: &mut AgentRegistry, seconds: f64) {
        for agent in registry.iter_mut() {
            self.advance(agent.body_mut(), seconds);
        }
    }
}

/// A player that wanders in random directions.
#[derive(Debug)]
pub struct Wanderer {
    body: KinematicBody,
    speed: f64,
    turn_every: f64,
    since_turn: f64,
    rng: SmallRng,
}

const DIRECTIONS: [Vec2; 4] = [
    Vec2::new(1.0, 0.0),
    Vec2::new(-1.0, 0.0),
    Vec2::new(0.0, 1.0),
    Vec2::new(0.0, -1.0),
];

impl Wanderer {
    /// A wanderer starting at `config.start`.
    pub fn new(config: &PlayerConfig, seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(seed) => SmallRng::seed_from_u64(seed),
            None => SmallRng::from_os_rng(),
        };
        Self {
            body: KinematicBody::new(config.start),
            speed: config.speed,
            turn_every: config.turn_every_secs,
            since_turn: config.turn_every_secs,
            rng,
        }
    }

    /// Current position.
    pub fn position(&self) -> Vec2 {
        self.body.position()
    }

    /// Advance by `seconds`, picking a new direction on schedule or after
    /// bumping into something.
    pub fn step(&mut self, arena: &Arena, seconds: f64) {
        self.since_turn += seconds;
        if self.since_turn >= self.turn_every || !self.body.is_moving() {
            self.since_turn = 0.0;
            let direction = DIRECTIONS
                .choose(&mut self.rng)
                .copied()
                .unwrap_or(Vec2::ZERO);
            let pause = self.rng.random_bool(0.2);
            let speed = if pause { 0.0 } else { self.speed };
            self.body.set_velocity(direction * speed);
        }
        arena.advance(&mut self.body, seconds);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn arena() -> Arena {
        Arena::new(
            Vec2::new(800.0, 600.0),
            vec![Obstacle {
                center: Vec2::new(400.0, 300.0),
                extent: Vec2::new(100.0, 100.0),
            }],
        )
    }

    #[test]
    fn free_motion_integrates() {
        let mut body = KinematicBody::new(Vec2::new(100.0, 100.0));
        body.set_velocity(Vec2::new(150.0, 0.0));
        assert!(arena().advance(&mut body, 0.1));
        assert!((body.position().x - 115.0).abs() < 1e-9);
    }

    #[test]
    fn obstacle_stops_the_body() {
        let mut body = KinematicBody::new(Vec2::new(320.0, 300.0));
        body.set_velocity(Vec2::new(150.0, 0.0));
        assert!(!arena().advance(&mut body, 0.1));
        assert!(!body.is_moving());
        assert!((body.position().x - 320.0).abs() < 1e-9);
    }

    #[test]
    fn arena_edges_stop_the_body() {
        let mut body = KinematicBody::new(Vec2::new(20.0, 300.0));
        body.set_velocity(Vec2::new(-150.0, 0.0));
        assert!(!arena().advance(&mut body, 0.1));
        assert!(!body.is_moving());
    }

    #[test]
    fn wanderer_stays_inside() {
        let arena = arena();
        let mut player = Wanderer::new(&PlayerConfig::default(), Some(3));
        for _ in 0..2_000 {
            player.step(&arena, 1.0 / 60.0);
            assert!(!arena.blocked(player.position(), KinematicBody::DEFAULT_SIZE));
        }
    }
}
