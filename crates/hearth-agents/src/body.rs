//! The physics surface an agent drives.
//!
//! The host engine owns collision and integration. Controllers only read
//! positions and write velocities through [`PhysicsBody`], so any engine
//! can plug in its own body type. [`KinematicBody`] is a headless
//! implementation for the bundled driver and for tests.

use hearth_types::Vec2;

/// Position and velocity state of one entity, owned by the host engine.
pub trait PhysicsBody: Send {
    /// Current position in world coordinates.
    fn position(&self) -> Vec2;

    /// Current velocity in units per second.
    fn velocity(&self) -> Vec2;

    /// Replace the velocity.
    fn set_velocity(&mut self, velocity: Vec2);

    /// Whether the engine currently has the body in motion.
    ///
    /// A collision that zeroes the velocity makes this false.
    fn is_moving(&self) -> bool {
        !self.velocity().is_zero()
    }

    /// Zero the velocity.
    fn stop(&mut self) {
        self.set_velocity(Vec2::ZERO);
    }
}

/// Axis-aligned box with a position and a velocity and nothing else.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct KinematicBody {
    position: Vec2,
    velocity: Vec2,
    size: Vec2,
}

impl KinematicBody {
    /// Default body size, matching a 32px sprite.
    pub const DEFAULT_SIZE: Vec2 = Vec2::new(32.0, 32.0);

    /// A body at rest at `position`.
    pub const fn new(position: Vec2) -> Self {
        Self {
            position,
            velocity: Vec2::ZERO,
            size: Self::DEFAULT_SIZE,
        }
    }

    /// Override the collision box size.
    #[must_use]
    pub const fn with_size(mut self, size: Vec2) -> Self {
        self.size = size;
        self
    }

    /// Collision box size.
    pub const fn size(&self) -> Vec2 {
        self.size
    }

    /// Teleport the body.
    pub const fn set_position(&mut self, position: Vec2) {
        self.position = position;
    }

    /// The position the body would reach after `seconds` of free motion.
    pub fn projected(&self, seconds: f64) -> Vec2 {
        self.position + self.velocity * seconds
    }

    /// Advance the position by `seconds` of free motion.
    pub fn integrate(&mut self, seconds: f64) {
        self.position = self.projected(seconds);
    }
}

impl PhysicsBody for KinematicBody {
    fn position(&self) -> Vec2 {
        self.position
    }

    fn velocity(&self) -> Vec2 {
        self.velocity
    }

    fn set_velocity(&mut self, velocity: Vec2) {
        self.velocity = velocity;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn integrates_velocity() {
        let mut body = KinematicBody::new(Vec2::new(10.0, 10.0));
        assert!(!body.is_moving());

        body.set_velocity(Vec2::new(150.0, 0.0));
        assert!(body.is_moving());
        body.integrate(0.5);
        assert!((body.position().x - 85.0).abs() < 1e-9);
        assert!((body.position().y - 10.0).abs() < 1e-9);

        body.stop();
        assert!(!body.is_moving());
        body.integrate(1.0);
        assert!((body.position().x - 85.0).abs() < 1e-9);
    }
}
