//! Headless host for Hearth NPCs.
//!
//! Plays the part of a game engine: it owns the bodies, steps a simple
//! collision world at a fixed frame rate, walks a stand-in player around,
//! and calls into the agent registry once per frame. NPC decisions come
//! from the offline generator or an OpenAI-compatible server, depending on
//! `HEARTH_DECISION_MODE`.
//!
//! # Startup Sequence
//!
//! 1. Initialize structured logging (tracing)
//! 2. Load runner configuration from the environment
//! 3. Build the decision client and probe the service
//! 4. Load the scene
//! 5. Spawn agents and the player
//! 6. Run the frame loop until the scene duration elapses or Ctrl-C
//! 7. Tear down agents and log a telemetry summary

mod error;
mod physics;
mod scene;

use std::sync::Arc;
use std::time::Duration;

use hearth_agents::{
    AgentRegistry, CountingTelemetry, FanoutTelemetry, KinematicBody, Telemetry, TracingTelemetry,
};
use hearth_runner::{DecisionClient, ProbeStatus, RunnerConfig};
use tokio::time::MissedTickBehavior;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crate::error::EngineError;
use crate::physics::{Arena, Wanderer};
use crate::scene::SceneConfig;

/// Application entry point for the engine.
///
/// # Errors
///
/// Returns an error if configuration, templates or the scene cannot be
/// loaded.
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // 1. Initialize structured logging.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(true)
        .init();

    info!("hearth-engine starting");

    // 2. Load runner configuration.
    let runner_config = RunnerConfig::from_env().map_err(EngineError::from)?;
    info!(
        mode = runner_config.mode.as_str(),
        api_url = %runner_config.backend.api_url,
        model = %runner_config.backend.model,
        timeout_ms = runner_config.decision_timeout.as_millis(),
        "Runner configuration loaded"
    );

    // 3. Decision client.
    let client = Arc::new(DecisionClient::from_config(&runner_config).map_err(EngineError::from)?);
    match client.probe().await {
        Some(ProbeStatus::Ready { models }) => {
            info!(models = ?models, "Decision service ready");
        }
        Some(status) => {
            warn!(
                status = status.as_str(),
                "Decision service not ready, agents will fall back until it answers"
            );
        }
        None => info!("Offline decisions, no service to probe"),
    }

    // 4. Scene.
    let scene = SceneConfig::load()?;
    let arena = Arena::new(scene.arena, scene.obstacles.clone());

    // 5. Agents and player.
    let counts = Arc::new(CountingTelemetry::new());
    let telemetry = FanoutTelemetry::new(vec![
        Arc::new(TracingTelemetry) as Arc<dyn Telemetry>,
        Arc::clone(&counts) as Arc<dyn Telemetry>,
    ]);
    let mut registry: AgentRegistry =
        AgentRegistry::new(Arc::clone(&client), Arc::new(telemetry));
    registry.set_obstacles(scene.obstacles.clone());

    for (index, spec) in scene.agents.iter().enumerate() {
        let config = spec.to_config(runner_config.seed, index);
        registry.create(config, KinematicBody::new(spec.position));
    }

    let mut player = Wanderer::new(&scene.player, runner_config.seed);
    registry.set_player(Some(player.position()));

    info!(
        agents = registry.len(),
        obstacles = scene.obstacles.len(),
        frame_rate_hz = scene.frame_rate_hz,
        duration_secs = scene.duration_secs,
        "Scene ready, entering frame loop"
    );

    // 6. Frame loop.
    run(&scene, &arena, &mut registry, &mut player).await;

    // 7. Teardown.
    registry.destroy_all();
    let summary = counts.summary();
    info!(
        requested = summary.requested,
        succeeded = summary.succeeded,
        fallbacks = summary.fallback_total(),
        by_kind = ?summary.fallbacks,
        stuck = summary.stuck,
        forced = summary.forced,
        lines = summary.lines,
        "hearth-engine shutdown complete"
    );

    Ok(())
}

/// Step the scene at a fixed rate until it is over or interrupted.
async fn run(
    scene: &SceneConfig,
    arena: &Arena,
    registry: &mut AgentRegistry,
    player: &mut Wanderer,
) {
    let frame = scene.frame();
    let seconds = frame.as_secs_f64();
    let duration = Duration::from_secs(scene.duration_secs);
    let force_every = Duration::from_secs(scene.force_every_secs);

    let mut ticker = tokio::time::interval(frame);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    let mut now = Duration::ZERO;
    let mut last_force = Duration::ZERO;

    loop {
        tokio::select! {
            _ = ticker.tick() => {}
            _ = &mut shutdown => {
                info!("Interrupted, shutting down");
                break;
            }
        }

        now = now.saturating_add(frame);

        player.step(arena, seconds);
        registry.set_player(Some(player.position()));
        arena.step_agents(registry, seconds);
        registry.update(now, frame);

        if !force_every.is_zero() && now.saturating_sub(last_force) >= force_every {
            last_force = now;
            registry.force_all(scene.force_action);
        }

        if !duration.is_zero() && now >= duration {
            info!(elapsed_secs = now.as_secs(), "Scene duration reached");
            break;
        }
    }
}
