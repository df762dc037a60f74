//! Agent ownership and per-frame fan-out.
//!
//! The registry owns every [`AgentController`] along with the shared
//! decision client and telemetry sink. [`AgentRegistry::update`] freezes a
//! [`WorldView`] first and then updates each controller against it, so the
//! outcome for any agent is the same whatever order the agents are stored
//! in.

use std::sync::Arc;
use std::time::Duration;

use hearth_runner::DecisionClient;
use hearth_types::{ActionKind, AgentId, Vec2};
use tracing::{debug, info};

use crate::body::{KinematicBody, PhysicsBody};
use crate::config::AgentConfig;
use crate::controller::AgentController;
use crate::error::AgentError;
use crate::perception::{AgentHandle, Obstacle, WorldView};
use crate::telemetry::Telemetry;

/// Owns the agents of one scene.
pub struct AgentRegistry<B: PhysicsBody = KinematicBody> {
    client: Arc<DecisionClient>,
    telemetry: Arc<dyn Telemetry>,
    agents: Vec<AgentController<B>>,
    player: Option<Vec2>,
    obstacles: Vec<Obstacle>,
}

impl<B: PhysicsBody> core::fmt::Debug for AgentRegistry<B> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("AgentRegistry")
            .field("agents", &self.agents)
            .field("player", &self.player)
            .field("obstacles", &self.obstacles.len())
            .finish_non_exhaustive()
    }
}

impl<B: PhysicsBody> AgentRegistry<B> {
    /// An empty registry sharing `client` and `telemetry` across agents.
    pub fn new(client: Arc<DecisionClient>, telemetry: Arc<dyn Telemetry>) -> Self {
        Self {
            client,
            telemetry,
            agents: Vec::new(),
            player: None,
            obstacles: Vec::new(),
        }
    }

    /// Create an agent driving `body`.
    pub fn create(&mut self, config: AgentConfig, body: B) -> AgentHandle {
        let controller = AgentController::new(
            config,
            body,
            Arc::clone(&self.client),
            Arc::clone(&self.telemetry),
        );
        let handle = controller.handle();
        info!(
            agent_id = %handle.id,
            agent = %handle.name,
            kind = %handle.kind,
            x = handle.position.x,
            y = handle.position.y,
            "agent created"
        );
        self.agents.push(controller);
        handle
    }

    /// Advance every live agent by one frame.
    pub fn update(&mut self, now: Duration, delta: Duration) {
        let world = self.world_view();
        for agent in &mut self.agents {
            agent.update(now, delta, &world);
        }
    }

    /// Freeze the current positions, player and obstacles.
    pub fn world_view(&self) -> WorldView {
        WorldView {
            agents: self.handles(),
            player: self.player,
            obstacles: self.obstacles.clone(),
        }
    }

    /// Handles for every live agent.
    pub fn handles(&self) -> Vec<AgentHandle> {
        self.agents
            .iter()
            .filter(|a| a.is_active())
            .map(AgentController::handle)
            .collect()
    }

    /// Handles for every live agent except `id`.
    pub fn others(&self, id: AgentId) -> Vec<AgentHandle> {
        self.agents
            .iter()
            .filter(|a| a.is_active() && a.id() != id)
            .map(AgentController::handle)
            .collect()
    }

    /// Look up an agent.
    pub fn get(&self, id: AgentId) -> Option<&AgentController<B>> {
        self.agents.iter().find(|a| a.id() == id)
    }

    /// Look up an agent mutably.
    pub fn get_mut(&mut self, id: AgentId) -> Option<&mut AgentController<B>> {
        self.agents.iter_mut().find(|a| a.id() == id)
    }

    /// Iterate over every agent.
    pub fn iter(&self) -> impl Iterator<Item = &AgentController<B>> {
        self.agents.iter()
    }

    /// Iterate mutably over every agent, for the engine's physics step.
    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut AgentController<B>> {
        self.agents.iter_mut()
    }

    /// Destroy and remove an agent.
    pub fn remove(&mut self, id: AgentId) -> Result<AgentController<B>, AgentError> {
        let index = self
            .agents
            .iter()
            .position(|a| a.id() == id)
            .ok_or(AgentError::AgentNotFound(id))?;
        let mut controller = self.agents.remove(index);
        controller.destroy();
        debug!(agent_id = %id, "agent removed");
        Ok(controller)
    }

    /// Destroy and remove every agent.
    pub fn destroy_all(&mut self) {
        let count = self.agents.len();
        for agent in &mut self.agents {
            agent.destroy();
        }
        self.agents.clear();
        info!(count, "all agents destroyed");
    }

    /// Set or clear the player position.
    pub const fn set_player(&mut self, player: Option<Vec2>) {
        self.player = player;
    }

    /// Player position, if any.
    pub const fn player(&self) -> Option<Vec2> {
        self.player
    }

    /// Replace the static obstacles.
    pub fn set_obstacles(&mut self, obstacles: Vec<Obstacle>) {
        self.obstacles = obstacles;
    }

    /// The static obstacles.
    pub fn obstacles(&self) -> &[Obstacle] {
        &self.obstacles
    }

    /// Force an action on one agent.
    pub fn force(&mut self, id: AgentId, action: ActionKind) -> Result<(), AgentError> {
        let agent = self.get_mut(id).ok_or(AgentError::AgentNotFound(id))?;
        agent.force_action(action);
        Ok(())
    }

    /// Force an action on every agent.
    pub fn force_all(&mut self, action: ActionKind) {
        info!(action = %action, count = self.agents.len(), "forcing action on all agents");
        for agent in &mut self.agents {
            agent.force_action(action);
        }
    }

    /// Number of agents.
    pub fn len(&self) -> usize {
        self.agents.len()
    }

    /// Whether there are no agents.
    pub fn is_empty(&self) -> bool {
        self.agents.is_empty()
    }
}
