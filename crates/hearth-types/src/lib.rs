//! Shared value types for the Hearth NPC decision loop.
//!
//! This crate is the single source of truth for the values that cross the
//! boundary between the agent controllers and the decision client: the
//! closed action vocabulary, agent archetypes, the per-request context
//! snapshot, and the decision that comes back.
//!
//! # Modules
//!
//! - [`ids`] -- Type-safe UUID wrapper for agent identifiers
//! - [`geometry`] -- 2D vector math shared by snapshots and motion
//! - [`enums`] -- Action kinds, archetypes, and dialogue roles
//! - [`snapshot`] -- The context snapshot sent to the decision step
//! - [`decision`] -- The decision returned for one snapshot

pub mod decision;
pub mod enums;
pub mod geometry;
pub mod ids;
pub mod snapshot;

// Re-export all public types at crate root for convenience.
pub use decision::{Decision, SPEECH_DELIMITER};
pub use enums::{ActionKind, AgentArchetype, ArchetypeKind, DialogueRole};
pub use geometry::Vec2;
pub use ids::AgentId;
pub use snapshot::{ContextSnapshot, NearbyAgent, NearbyObstacle, PlayerProximity};
