//! The decision boundary between agents and the decision service.
//!
//! [`DecisionClient::decide`] is the raw fallible step.
//! [`DecisionClient::resolve`] coerces every failure into a fallback
//! decision and reports the coarse outcome. Agent controllers only ever
//! call [`DecisionClient::resolve_with`], handing over their own random
//! stream for offline draws, so no failure reaches the frame loop and no
//! agent's draws depend on another's.

use std::time::Duration;

use hearth_types::{ActionKind, ContextSnapshot, Decision};
use rand::Rng;
use tracing::{debug, info, warn};

use crate::config::{ConfigError, DecisionMode, RunnerConfig};
use crate::error::{DecisionError, FailureKind};
use crate::llm::{ChatBackend, ProbeStatus};
use crate::offline::{OfflineConfig, OfflineGenerator};
use crate::prompt::PromptEngine;
use crate::vocabulary;

/// Longest reply excerpt kept in a [`DecisionError::NoActionRecognized`].
const MAX_REPLY_EXCERPT_LEN: usize = 120;

/// How a decision was obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Outcome {
    /// The decision came from the configured source.
    Success,
    /// The request failed and a fallback was substituted.
    Fallback(FailureKind),
}

impl Outcome {
    /// Label for logging.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Fallback(_) => "fallback",
        }
    }
}

impl core::fmt::Display for Outcome {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Success => f.write_str("success"),
            Self::Fallback(kind) => write!(f, "fallback({kind})"),
        }
    }
}

/// A decision that is always usable, plus how it was obtained.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedDecision {
    /// The decision to apply.
    pub decision: Decision,
    /// Whether it came from the service or the fallback path.
    pub outcome: Outcome,
}

impl ResolvedDecision {
    /// True when the decision is a fallback.
    pub const fn is_fallback(&self) -> bool {
        matches!(self.outcome, Outcome::Fallback(_))
    }
}

struct Networked {
    backend: ChatBackend,
    prompts: PromptEngine,
    timeout: Duration,
}

/// Turns snapshots into decisions, offline or over HTTP.
///
/// The offline generator is always present: in offline mode it makes
/// every decision, in networked mode it supplies canned fallback lines
/// for dialogue agents.
pub struct DecisionClient {
    generator: OfflineGenerator,
    networked: Option<Networked>,
}

impl core::fmt::Debug for DecisionClient {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("DecisionClient")
            .field("mode", &self.mode())
            .finish_non_exhaustive()
    }
}

impl DecisionClient {
    /// A client that never performs I/O.
    pub const fn offline(generator: OfflineGenerator) -> Self {
        Self {
            generator,
            networked: None,
        }
    }

    /// A client that asks a chat-completions endpoint.
    ///
    /// `timeout` bounds every request; a request that does not settle in
    /// time resolves to the fallback.
    pub fn networked(backend: ChatBackend, prompts: PromptEngine, timeout: Duration) -> Self {
        Self {
            generator: OfflineGenerator::default(),
            networked: Some(Networked {
                backend,
                prompts,
                timeout,
            }),
        }
    }

    /// Replace the generator used for offline decisions and fallback lines.
    #[must_use]
    pub fn with_generator(mut self, generator: OfflineGenerator) -> Self {
        self.generator = generator;
        self
    }

    /// Build a client from runner configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if on-disk templates are configured but
    /// cannot be loaded.
    pub fn from_config(config: &RunnerConfig) -> Result<Self, ConfigError> {
        let generator = match config.seed {
            Some(seed) => OfflineGenerator::seeded(OfflineConfig::default(), seed),
            None => OfflineGenerator::new(OfflineConfig::default()),
        };

        let client = match config.mode {
            DecisionMode::Offline => Self::offline(generator),
            DecisionMode::Networked => {
                let prompts = match &config.templates_dir {
                    Some(dir) => PromptEngine::from_dir(dir)?,
                    None => PromptEngine::new()?,
                };
                let backend = ChatBackend::new(&config.backend);
                info!(
                    backend = backend.name(),
                    model = backend.model(),
                    api_url = %config.backend.api_url,
                    timeout = ?config.decision_timeout,
                    "networked decision client ready"
                );
                Self::networked(backend, prompts, config.decision_timeout).with_generator(generator)
            }
        };
        Ok(client)
    }

    /// Which mode this client runs in.
    pub const fn mode(&self) -> DecisionMode {
        if self.networked.is_some() {
            DecisionMode::Networked
        } else {
            DecisionMode::Offline
        }
    }

    /// Obtain a decision, surfacing any failure.
    ///
    /// # Errors
    ///
    /// Returns a [`DecisionError`] for transport, status, body or reply
    /// failures. Offline mode never fails.
    pub async fn decide(&self, snapshot: &ContextSnapshot) -> Result<Decision, DecisionError> {
        match &self.networked {
            Some(net) => ask(net, snapshot).await,
            None => Ok(self.generator.decide(snapshot)),
        }
    }

    /// Like [`decide`](Self::decide), drawing offline decisions from `rng`.
    ///
    /// # Errors
    ///
    /// Same as [`decide`](Self::decide).
    pub async fn decide_with<R: Rng + ?Sized>(
        &self,
        snapshot: &ContextSnapshot,
        rng: &mut R,
    ) -> Result<Decision, DecisionError> {
        match &self.networked {
            Some(net) => ask(net, snapshot).await,
            None => Ok(self.generator.sample(snapshot, rng)),
        }
    }

    /// Obtain a decision, substituting the fallback on any failure.
    ///
    /// The fallback is `Idle` for action agents and `Idle` plus a canned
    /// line for dialogue agents.
    pub async fn resolve(&self, snapshot: &ContextSnapshot) -> ResolvedDecision {
        match self.decide(snapshot).await {
            Ok(decision) => ResolvedDecision {
                decision,
                outcome: Outcome::Success,
            },
            Err(e) => settle_failure(snapshot, &e, self.fallback(snapshot)),
        }
    }

    /// Like [`resolve`](Self::resolve), drawing offline decisions and
    /// fallback lines from `rng`.
    pub async fn resolve_with<R: Rng + ?Sized>(
        &self,
        snapshot: &ContextSnapshot,
        rng: &mut R,
    ) -> ResolvedDecision {
        match self.decide_with(snapshot, rng).await {
            Ok(decision) => ResolvedDecision {
                decision,
                outcome: Outcome::Success,
            },
            Err(e) => settle_failure(snapshot, &e, self.fallback_with(snapshot, rng)),
        }
    }

    /// The decision substituted when a request fails.
    pub fn fallback(&self, snapshot: &ContextSnapshot) -> Decision {
        if snapshot.is_dialogue() {
            Decision::speak(ActionKind::Idle, self.generator.fallback_line(snapshot))
        } else {
            Decision::idle()
        }
    }

    /// The fallback decision, with any canned line drawn from `rng`.
    pub fn fallback_with<R: Rng + ?Sized>(
        &self,
        snapshot: &ContextSnapshot,
        rng: &mut R,
    ) -> Decision {
        if snapshot.is_dialogue() {
            Decision::speak(ActionKind::Idle, self.generator.line_from(snapshot, rng))
        } else {
            Decision::idle()
        }
    }

    /// Probe the decision service, for diagnostics only.
    ///
    /// Returns `None` in offline mode.
    pub async fn probe(&self) -> Option<ProbeStatus> {
        match &self.networked {
            Some(net) => Some(net.backend.probe().await),
            None => None,
        }
    }
}

/// Render, send and interpret one networked request.
async fn ask(net: &Networked, snapshot: &ContextSnapshot) -> Result<Decision, DecisionError> {
    let prompt = if snapshot.is_dialogue() {
        net.prompts.render_dialogue(snapshot)?
    } else {
        net.prompts.render_action(snapshot)?
    };

    let Ok(reply) = tokio::time::timeout(net.timeout, net.backend.complete(&prompt)).await
    else {
        return Err(DecisionError::Timeout {
            timeout_ms: u64::try_from(net.timeout.as_millis()).unwrap_or(u64::MAX),
        });
    };
    let text = reply?;

    debug!(agent_id = %snapshot.agent_id, reply = %text, "decision reply received");
    interpret_reply(&text, snapshot.is_dialogue())
}

fn settle_failure(
    snapshot: &ContextSnapshot,
    error: &DecisionError,
    fallback: Decision,
) -> ResolvedDecision {
    let kind = error.kind();
    warn!(
        agent_id = %snapshot.agent_id,
        agent = %snapshot.name,
        kind = %kind,
        error = %error,
        "decision failed, using fallback"
    );
    ResolvedDecision {
        decision: fallback,
        outcome: Outcome::Fallback(kind),
    }
}

/// Read a completion text as a decision.
///
/// Action agents need a recognizable action token. Dialogue agents need a
/// line; a reply without the composite delimiter is taken whole as the
/// line.
fn interpret_reply(text: &str, dialogue: bool) -> Result<Decision, DecisionError> {
    if !dialogue {
        return vocabulary::parse_decision(text)
            .map_err(|vocabulary::Unrecognized| DecisionError::NoActionRecognized(excerpt(text)));
    }

    if text.contains(hearth_types::SPEECH_DELIMITER) {
        return match vocabulary::parse_decision(text) {
            Ok(decision) if decision.line.is_some() => Ok(decision),
            _ => Err(DecisionError::EmptyLine),
        };
    }

    let line = text.trim().trim_matches('"').trim();
    if line.is_empty() {
        Err(DecisionError::EmptyLine)
    } else {
        Ok(Decision::speak(ActionKind::Idle, line))
    }
}

fn excerpt(text: &str) -> String {
    text.trim().chars().take(MAX_REPLY_EXCERPT_LEN).collect()
}
