//! Per-agent decision state machine.
//!
//! An [`AgentController`] paces decision requests on a jittered timer,
//! applies each returned action to its [`PhysicsBody`], keeps movement
//! going against collisions, and recovers when a movement stalls.
//!
//! ```text
//! Idle --timer--> Deciding --decision--> Acting --no progress--> Stuck
//!                    ^                     |  ^                     |
//!                    +-------timer---------+  +----new direction----+
//! ```
//!
//! Decision requests run as tokio tasks and report back over a oneshot
//! channel. Holding the receiver is the in-flight guard: while it is
//! present no second request is launched for the same agent. The
//! controller never awaits the task; it polls the receiver once per frame
//! and keeps acting on its last action in the meantime.

use std::sync::Arc;
use std::time::Duration;

use hearth_runner::{DecisionClient, FailureKind, Outcome, ResolvedDecision};
use hearth_types::{ActionKind, AgentArchetype, AgentId, ContextSnapshot, Decision, Vec2};
use rand::rngs::SmallRng;
use rand::seq::IndexedRandom;
use rand::{Rng, SeedableRng};
use tokio::sync::oneshot;
use tokio::sync::oneshot::error::TryRecvError;
use tracing::{debug, info, warn};

use crate::body::PhysicsBody;
use crate::config::AgentConfig;
use crate::perception::{AgentHandle, Subject, WorldView, build_snapshot};
use crate::telemetry::{Telemetry, TelemetryEvent};

/// Observable state of a controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AgentPhase {
    /// No action applied yet and nothing in flight.
    Idle,
    /// A decision request is in flight.
    Deciding,
    /// An action is applied.
    Acting,
    /// The current movement stopped making progress and is being
    /// replaced. Recovery runs in the same update as detection.
    Stuck,
}

/// Drives one NPC.
pub struct AgentController<B: PhysicsBody> {
    id: AgentId,
    config: AgentConfig,
    body: B,
    client: Arc<DecisionClient>,
    telemetry: Arc<dyn Telemetry>,
    rng: SmallRng,

    health: u32,
    current_action: ActionKind,
    has_acted: bool,
    last_line: Option<String>,
    last_snapshot: Option<ContextSnapshot>,

    decision_interval: Duration,
    decision_timer: Duration,
    pending: Option<oneshot::Receiver<ResolvedDecision>>,

    now: Duration,
    last_stuck_check: Duration,
    last_sample: Vec2,
    is_stuck: bool,

    active: bool,
}

impl<B: PhysicsBody> core::fmt::Debug for AgentController<B> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("AgentController")
            .field("id", &self.id)
            .field("name", &self.config.name)
            .field("phase", &self.phase())
            .field("current_action", &self.current_action)
            .finish_non_exhaustive()
    }
}

impl<B: PhysicsBody> AgentController<B> {
    /// Create a controller for `body`.
    ///
    /// The decision interval gets a random offset of up to
    /// `config.interval_jitter`, and the timer starts at a random phase in
    /// the same range, so agents created together do not request in step.
    pub fn new(
        config: AgentConfig,
        body: B,
        client: Arc<DecisionClient>,
        telemetry: Arc<dyn Telemetry>,
    ) -> Self {
        let mut rng = match config.seed {
            Some(seed) => SmallRng::seed_from_u64(seed),
            None => SmallRng::from_os_rng(),
        };

        let jitter_ms = u64::try_from(config.interval_jitter.as_millis()).unwrap_or(u64::MAX);
        let decision_interval = config
            .decision_interval
            .saturating_add(Duration::from_millis(rng.random_range(0..=jitter_ms)));
        let decision_timer = Duration::from_millis(rng.random_range(0..=jitter_ms));

        let id = AgentId::new();
        let last_sample = body.position();

        debug!(
            agent_id = %id,
            agent = %config.name,
            archetype = %config.archetype.kind(),
            interval_ms = decision_interval.as_millis(),
            "agent controller created"
        );

        Self {
            id,
            health: config.health,
            config,
            body,
            client,
            telemetry,
            rng,
            current_action: ActionKind::Idle,
            has_acted: false,
            last_line: None,
            last_snapshot: None,
            decision_interval,
            decision_timer,
            pending: None,
            now: Duration::ZERO,
            last_stuck_check: Duration::ZERO,
            last_sample,
            is_stuck: false,
            active: true,
        }
    }

    // -----------------------------------------------------------------------
    // Accessors
    // -----------------------------------------------------------------------

    /// Agent identifier.
    pub const fn id(&self) -> AgentId {
        self.id
    }

    /// Display name.
    pub fn name(&self) -> &str {
        &self.config.name
    }

    /// Archetype.
    pub const fn archetype(&self) -> AgentArchetype {
        self.config.archetype
    }

    /// Configuration the agent was created with.
    pub const fn config(&self) -> &AgentConfig {
        &self.config
    }

    /// Current position of the body.
    pub fn position(&self) -> Vec2 {
        self.body.position()
    }

    /// The physics body.
    pub const fn body(&self) -> &B {
        &self.body
    }

    /// The physics body, for the engine to integrate and collide.
    pub const fn body_mut(&mut self) -> &mut B {
        &mut self.body
    }

    /// Current health.
    pub const fn health(&self) -> u32 {
        self.health
    }

    /// Set health, as reported by the engine's combat.
    pub const fn set_health(&mut self, health: u32) {
        self.health = health;
    }

    /// The action being carried out.
    pub const fn current_action(&self) -> ActionKind {
        self.current_action
    }

    /// The most recent line spoken, if any.
    pub fn last_line(&self) -> Option<&str> {
        self.last_line.as_deref()
    }

    /// The snapshot sent with the most recent request.
    pub const fn last_snapshot(&self) -> Option<&ContextSnapshot> {
        self.last_snapshot.as_ref()
    }

    /// This agent's decision interval, jitter included.
    pub const fn decision_interval(&self) -> Duration {
        self.decision_interval
    }

    /// Whether a decision request is in flight.
    pub const fn is_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// Whether the current movement has stalled.
    pub const fn is_stuck(&self) -> bool {
        self.is_stuck
    }

    /// False once [`destroy`](Self::destroy) has been called.
    pub const fn is_active(&self) -> bool {
        self.active
    }

    /// Current state machine phase.
    pub const fn phase(&self) -> AgentPhase {
        if self.is_stuck {
            AgentPhase::Stuck
        } else if self.pending.is_some() {
            AgentPhase::Deciding
        } else if self.has_acted {
            AgentPhase::Acting
        } else {
            AgentPhase::Idle
        }
    }

    /// Public view for other agents and the engine.
    pub fn handle(&self) -> AgentHandle {
        AgentHandle {
            id: self.id,
            name: self.config.name.clone(),
            kind: self.config.archetype.kind(),
            position: self.body.position(),
        }
    }

    /// Build this agent's snapshot from a frozen world view.
    pub fn snapshot(&self, world: &WorldView) -> ContextSnapshot {
        let subject = Subject {
            id: self.id,
            name: &self.config.name,
            archetype: self.config.archetype,
            position: self.body.position(),
            health: self.health,
            last_action: self.has_acted.then_some(self.current_action),
        };
        build_snapshot(&subject, world, self.config.vision_radius)
    }

    // -----------------------------------------------------------------------
    // Frame update
    // -----------------------------------------------------------------------

    /// Advance the controller by one frame.
    ///
    /// `now` is the engine clock, `delta` the time since the previous
    /// frame. Must be called from within a tokio runtime for decision
    /// requests to be launched; outside one, due requests resolve straight
    /// to the fallback.
    pub fn update(&mut self, now: Duration, delta: Duration, world: &WorldView) {
        if !self.active {
            return;
        }
        self.now = now;

        self.poll_pending();

        self.decision_timer = self.decision_timer.saturating_add(delta);
        if self.decision_timer >= self.decision_interval && self.pending.is_none() {
            self.decision_timer = Duration::ZERO;
            self.request_decision(world);
        }

        self.check_stuck();
        self.hold_movement();
    }

    /// Apply `action` immediately, bypassing the timer and the in-flight
    /// guard. Clears the stuck flag.
    pub fn force_action(&mut self, action: ActionKind) {
        if !self.active {
            return;
        }
        self.telemetry.record(TelemetryEvent::Forced {
            agent_id: self.id,
            action,
        });
        self.is_stuck = false;
        self.apply_action(action);
    }

    /// Tear the controller down.
    ///
    /// Stops the body and drops any in-flight request; its result is
    /// discarded when it arrives. Later updates and forced actions do
    /// nothing.
    pub fn destroy(&mut self) {
        if !self.active {
            return;
        }
        self.active = false;
        self.pending = None;
        self.is_stuck = false;
        self.body.stop();
        debug!(agent_id = %self.id, agent = %self.config.name, "agent controller destroyed");
    }

    fn poll_pending(&mut self) {
        let Some(receiver) = self.pending.as_mut() else {
            return;
        };
        match receiver.try_recv() {
            Ok(resolved) => {
                self.pending = None;
                self.apply_resolved(resolved);
            }
            Err(TryRecvError::Empty) => {}
            Err(TryRecvError::Closed) => {
                self.pending = None;
                warn!(agent_id = %self.id, "decision task ended without a result");
                self.apply_action(ActionKind::Idle);
            }
        }
    }

    fn request_decision(&mut self, world: &WorldView) {
        let snapshot = self.snapshot(world);
        self.last_snapshot = Some(snapshot.clone());
        self.telemetry.record(TelemetryEvent::DecisionRequested { agent_id: self.id });

        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            warn!(agent_id = %self.id, "no async runtime, using fallback decision");
            let decision = self.client.fallback_with(&snapshot, &mut self.rng);
            self.apply_resolved(ResolvedDecision {
                decision,
                outcome: Outcome::Fallback(FailureKind::Transport),
            });
            return;
        };

        let (sender, receiver) = oneshot::channel();
        let client = Arc::clone(&self.client);
        let agent_id = self.id;
        let mut rng = SmallRng::seed_from_u64(self.rng.random());
        runtime.spawn(async move {
            let resolved = client.resolve_with(&snapshot, &mut rng).await;
            if sender.send(resolved).is_err() {
                debug!(agent_id = %agent_id, "agent gone, decision dropped");
            }
        });
        self.pending = Some(receiver);
    }

    fn apply_resolved(&mut self, resolved: ResolvedDecision) {
        let ResolvedDecision { decision, outcome } = resolved;
        let Decision { action, line } = decision;

        let applied = self.apply_action(action);
        self.telemetry.record(TelemetryEvent::DecisionResolved {
            agent_id: self.id,
            action: applied,
            outcome,
        });

        if self.config.debug {
            info!(
                agent_id = %self.id,
                agent = %self.config.name,
                action = %applied,
                outcome = %outcome,
                line = line.as_deref().unwrap_or(""),
                "decision"
            );
        }

        if let Some(line) = line {
            self.telemetry.record(TelemetryEvent::Speech {
                agent_id: self.id,
                line: line.clone(),
            });
            self.last_line = Some(line);
        }

        if matches!(self.config.archetype, AgentArchetype::Dialogue { .. })
            && matches!(outcome, Outcome::Fallback(_))
        {
            self.decision_timer = self
                .decision_interval
                .saturating_sub(self.config.dialogue_retry_delay);
            self.telemetry
                .record(TelemetryEvent::DialogueRetryScheduled { agent_id: self.id });
        }
    }

    /// Apply an action to the body and return the action actually applied.
    ///
    /// A movement that starts or changes direction opens a fresh stuck
    /// sampling window.
    fn apply_action(&mut self, action: ActionKind) -> ActionKind {
        let action = match action {
            ActionKind::Patrol => self.random_direction(None),
            other => other,
        };

        match action {
            ActionKind::Attack => {
                debug!(agent_id = %self.id, "attack requested, handing over to engine combat");
            }
            ActionKind::Interact => {
                debug!(agent_id = %self.id, "interaction requested");
            }
            _ => {}
        }

        let previous = self.current_action;
        self.current_action = action;
        self.has_acted = true;
        if !action.is_movement() {
            self.is_stuck = false;
        } else if action != previous {
            self.last_sample = self.body.position();
            self.last_stuck_check = self.now;
        }
        self.body
            .set_velocity(action.velocity(self.config.walk_speed));
        action
    }

    fn check_stuck(&mut self) {
        if self.now.saturating_sub(self.last_stuck_check) < self.config.stuck_check_interval {
            return;
        }
        self.last_stuck_check = self.now;

        let position = self.body.position();
        let moved = position.distance_to(self.last_sample);
        self.last_sample = position;

        if self.current_action.is_movement() && moved < self.config.stuck_epsilon {
            self.is_stuck = true;
            self.telemetry.record(TelemetryEvent::Stuck {
                agent_id: self.id,
                action: self.current_action,
            });
            debug!(agent_id = %self.id, phase = ?self.phase(), moved, "movement stalled");
            self.recover();
        } else {
            self.is_stuck = false;
        }
    }

    /// Switch to another direction and clear the stuck flag; the next check
    /// re-detects the stall if the new direction is blocked too.
    fn recover(&mut self) {
        let from = self.current_action;
        let to = self.random_direction(Some(from));
        self.apply_action(to);
        self.is_stuck = false;
        self.telemetry.record(TelemetryEvent::Unstuck {
            agent_id: self.id,
            from,
            to,
        });
    }

    fn hold_movement(&mut self) {
        if self.current_action.is_movement() && !self.body.is_moving() {
            self.body
                .set_velocity(self.current_action.velocity(self.config.walk_speed));
        }
    }

    fn random_direction(&mut self, excluding: Option<ActionKind>) -> ActionKind {
        let choices: Vec<ActionKind> = ActionKind::MOVEMENTS
            .into_iter()
            .filter(|a| Some(*a) != excluding)
            .collect();
        choices
            .choose(&mut self.rng)
            .copied()
            .unwrap_or(ActionKind::MoveDown)
    }
}
