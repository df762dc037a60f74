//! Agent side of the Hearth NPC decision loop.
//!
//! Each NPC is driven by an [`AgentController`]: a small state machine that
//! paces decision requests on a jittered timer, applies the returned action
//! to its physics body, holds movement intents against collisions, and
//! recovers when it gets stuck. The [`AgentRegistry`] owns the controllers
//! and fans out the per-frame update.
//!
//! # Modules
//!
//! - [`body`] -- The physics surface the host engine exposes ([`PhysicsBody`])
//! - [`config`] -- Per-agent tunables ([`AgentConfig`])
//! - [`controller`] -- The per-agent state machine ([`AgentController`])
//! - [`error`] -- Error types for registry operations ([`AgentError`])
//! - [`perception`] -- Context snapshot assembly and the frozen [`WorldView`]
//! - [`registry`] -- Agent ownership and per-frame fan-out ([`AgentRegistry`])
//! - [`telemetry`] -- Injected observer for decision-loop events

pub mod body;
pub mod config;
pub mod controller;
pub mod error;
pub mod perception;
pub mod registry;
pub mod telemetry;

pub use body::{KinematicBody, PhysicsBody};
pub use config::AgentConfig;
pub use controller::{AgentController, AgentPhase};
pub use error::AgentError;
pub use perception::{
    AgentHandle, OBSTACLE_VISION_FACTOR, Obstacle, Subject, WorldView, build_snapshot,
};
pub use registry::AgentRegistry;
pub use telemetry::{
    CountingTelemetry, FanoutTelemetry, MemoryTelemetry, NoopTelemetry, RecordedEvent, Telemetry,
    TelemetryEvent, TelemetrySummary, TracingTelemetry,
};
