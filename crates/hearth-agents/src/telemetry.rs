//! Injected observer for decision-loop events.
//!
//! Controllers report what happens to them through a [`Telemetry`]
//! implementation handed in at construction, instead of writing to any
//! shared presentation object. [`TracingTelemetry`] turns events into log
//! lines and [`MemoryTelemetry`] keeps every event for tests.
//! [`CountingTelemetry`] keeps only the end-of-run counts, and
//! [`NoopTelemetry`] discards everything.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, PoisonError};

use chrono::{DateTime, Utc};
use hearth_runner::Outcome;
use hearth_types::{ActionKind, AgentId};
use tracing::{debug, info};

/// Something worth reporting about one agent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TelemetryEvent {
    /// A decision request was launched.
    DecisionRequested {
        /// The requesting agent.
        agent_id: AgentId,
    },
    /// A decision arrived and was applied.
    DecisionResolved {
        /// The agent.
        agent_id: AgentId,
        /// The action as applied (patrol already resolved to a direction).
        action: ActionKind,
        /// Whether the decision was a fallback.
        outcome: Outcome,
    },
    /// A moving agent stopped making progress.
    Stuck {
        /// The agent.
        agent_id: AgentId,
        /// The movement that stalled.
        action: ActionKind,
    },
    /// A stuck agent was sent in a new direction.
    Unstuck {
        /// The agent.
        agent_id: AgentId,
        /// The stalled direction.
        from: ActionKind,
        /// The new direction.
        to: ActionKind,
    },
    /// An action was forced from outside the decision loop.
    Forced {
        /// The agent.
        agent_id: AgentId,
        /// The forced action.
        action: ActionKind,
    },
    /// The agent said something.
    Speech {
        /// The agent.
        agent_id: AgentId,
        /// The line.
        line: String,
    },
    /// A dialogue agent will retry sooner after a fallback.
    DialogueRetryScheduled {
        /// The agent.
        agent_id: AgentId,
    },
}

/// Receives decision-loop events.
pub trait Telemetry: Send + Sync {
    /// Record one event.
    fn record(&self, event: TelemetryEvent);
}

/// Discards every event.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopTelemetry;

impl Telemetry for NoopTelemetry {
    fn record(&self, _event: TelemetryEvent) {}
}

/// Logs every event through `tracing`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingTelemetry;

impl Telemetry for TracingTelemetry {
    fn record(&self, event: TelemetryEvent) {
        match event {
            TelemetryEvent::DecisionRequested { agent_id } => {
                debug!(agent_id = %agent_id, "decision requested");
            }
            TelemetryEvent::DecisionResolved {
                agent_id,
                action,
                outcome,
            } => {
                debug!(agent_id = %agent_id, action = %action, outcome = %outcome, "decision applied");
            }
            TelemetryEvent::Stuck { agent_id, action } => {
                debug!(agent_id = %agent_id, action = %action, "agent stuck");
            }
            TelemetryEvent::Unstuck { agent_id, from, to } => {
                debug!(agent_id = %agent_id, from = %from, to = %to, "agent unstuck");
            }
            TelemetryEvent::Forced { agent_id, action } => {
                info!(agent_id = %agent_id, action = %action, "action forced");
            }
            TelemetryEvent::Speech { agent_id, line } => {
                info!(agent_id = %agent_id, line = %line, "agent speaks");
            }
            TelemetryEvent::DialogueRetryScheduled { agent_id } => {
                debug!(agent_id = %agent_id, "dialogue retry scheduled");
            }
        }
    }
}

/// Forwards every event to several sinks.
#[derive(Default)]
pub struct FanoutTelemetry {
    sinks: Vec<Arc<dyn Telemetry>>,
}

impl FanoutTelemetry {
    /// A fan-out over `sinks`.
    pub fn new(sinks: Vec<Arc<dyn Telemetry>>) -> Self {
        Self { sinks }
    }
}

impl core::fmt::Debug for FanoutTelemetry {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("FanoutTelemetry")
            .field("sinks", &self.sinks.len())
            .finish()
    }
}

impl Telemetry for FanoutTelemetry {
    fn record(&self, event: TelemetryEvent) {
        if let Some((last, rest)) = self.sinks.split_last() {
            for sink in rest {
                sink.record(event.clone());
            }
            last.record(event);
        }
    }
}

/// An event with the wall-clock time it was recorded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedEvent {
    /// When the event was recorded.
    pub at: DateTime<Utc>,
    /// The event.
    pub event: TelemetryEvent,
}

/// Keeps every event in memory.
#[derive(Debug, Default)]
pub struct MemoryTelemetry {
    events: Mutex<Vec<RecordedEvent>>,
}

impl MemoryTelemetry {
    /// An empty recorder.
    pub fn new() -> Self {
        Self::default()
    }

    /// A copy of every event recorded so far.
    pub fn events(&self) -> Vec<RecordedEvent> {
        self.lock().clone()
    }

    /// Number of events matching `predicate`.
    pub fn count(&self, predicate: impl Fn(&TelemetryEvent) -> bool) -> usize {
        self.lock().iter().filter(|r| predicate(&r.event)).count()
    }

    /// Aggregate counts over everything recorded.
    pub fn summary(&self) -> TelemetrySummary {
        let mut summary = TelemetrySummary::default();
        for recorded in self.lock().iter() {
            summary.add(&recorded.event);
        }
        summary
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<RecordedEvent>> {
        self.events.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Telemetry for MemoryTelemetry {
    fn record(&self, event: TelemetryEvent) {
        self.lock().push(RecordedEvent {
            at: Utc::now(),
            event,
        });
    }
}

/// Keeps running counts only, in constant memory.
#[derive(Debug, Default)]
pub struct CountingTelemetry {
    summary: Mutex<TelemetrySummary>,
}

impl CountingTelemetry {
    /// Zeroed counters.
    pub fn new() -> Self {
        Self::default()
    }

    /// Counts so far.
    pub fn summary(&self) -> TelemetrySummary {
        self.summary
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl Telemetry for CountingTelemetry {
    fn record(&self, event: TelemetryEvent) {
        self.summary
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .add(&event);
    }
}

/// Aggregate counts of decision-loop events.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TelemetrySummary {
    /// Decision requests launched.
    pub requested: u64,
    /// Decisions obtained from the configured source.
    pub succeeded: u64,
    /// Fallback decisions, by failure kind.
    pub fallbacks: BTreeMap<&'static str, u64>,
    /// Stuck detections.
    pub stuck: u64,
    /// Forced actions.
    pub forced: u64,
    /// Lines spoken.
    pub lines: u64,
}

impl TelemetrySummary {
    /// Total fallback decisions.
    pub fn fallback_total(&self) -> u64 {
        self.fallbacks
            .values()
            .fold(0_u64, |acc, n| acc.saturating_add(*n))
    }

    fn add(&mut self, event: &TelemetryEvent) {
        match event {
            TelemetryEvent::DecisionRequested { .. } => bump(&mut self.requested),
            TelemetryEvent::DecisionResolved { outcome, .. } => match outcome {
                Outcome::Success => bump(&mut self.succeeded),
                Outcome::Fallback(kind) => {
                    bump(self.fallbacks.entry(kind.as_str()).or_insert(0));
                }
            },
            TelemetryEvent::Stuck { .. } => bump(&mut self.stuck),
            TelemetryEvent::Forced { .. } => bump(&mut self.forced),
            TelemetryEvent::Speech { .. } => bump(&mut self.lines),
            TelemetryEvent::Unstuck { .. } | TelemetryEvent::DialogueRetryScheduled { .. } => {}
        }
    }
}

fn bump(counter: &mut u64) {
    *counter = counter.saturating_add(1);
}

#[cfg(test)]
mod tests {
    use hearth_runner::FailureKind;

    use super::*;

    #[test]
    fn memory_telemetry_summarizes() {
        let telemetry = MemoryTelemetry::new();
        let agent_id = AgentId::new();
        telemetry.record(TelemetryEvent::DecisionRequested { agent_id });
        telemetry.record(TelemetryEvent::DecisionRequested { agent_id });
        telemetry.record(TelemetryEvent::DecisionResolved {
            agent_id,
            action: ActionKind::MoveUp,
            outcome: Outcome::Success,
        });
        telemetry.record(TelemetryEvent::DecisionResolved {
            agent_id,
            action: ActionKind::Idle,
            outcome: Outcome::Fallback(FailureKind::Protocol),
        });
        telemetry.record(TelemetryEvent::Speech {
            agent_id,
            line: "Halt!".to_owned(),
        });

        assert_eq!(telemetry.events().len(), 5);
        assert_eq!(
            telemetry.count(|e| matches!(e, TelemetryEvent::DecisionRequested { .. })),
            2
        );

        let summary = telemetry.summary();
        assert_eq!(summary.requested, 2);
        assert_eq!(summary.succeeded, 1);
        assert_eq!(summary.fallbacks.get("protocol"), Some(&1));
        assert_eq!(summary.fallback_total(), 1);
        assert_eq!(summary.lines, 1);
        assert_eq!(summary.stuck, 0);
    }

    #[test]
    fn counting_sink_matches_the_recorder() {
        let memory = MemoryTelemetry::new();
        let counting = CountingTelemetry::new();
        let agent_id = AgentId::new();
        let events = [
            TelemetryEvent::DecisionRequested { agent_id },
            TelemetryEvent::DecisionResolved {
                agent_id,
                action: ActionKind::Idle,
                outcome: Outcome::Fallback(FailureKind::Transport),
            },
            TelemetryEvent::Stuck {
                agent_id,
                action: ActionKind::MoveDown,
            },
            TelemetryEvent::Unstuck {
                agent_id,
                from: ActionKind::MoveDown,
                to: ActionKind::MoveLeft,
            },
            TelemetryEvent::Forced {
                agent_id,
                action: ActionKind::Patrol,
            },
        ];
        for event in events {
            memory.record(event.clone());
            counting.record(event);
        }

        let summary = counting.summary();
        assert_eq!(summary, memory.summary());
        assert_eq!(summary.fallbacks.get("transport"), Some(&1));
        assert_eq!(summary.stuck, 1);
        assert_eq!(summary.forced, 1);
    }

    #[test]
    fn fanout_reaches_every_sink() {
        let first = Arc::new(MemoryTelemetry::new());
        let second = Arc::new(MemoryTelemetry::new());
        let fanout = FanoutTelemetry::new(vec![
            Arc::clone(&first) as Arc<dyn Telemetry>,
            Arc::clone(&second) as Arc<dyn Telemetry>,
            Arc::new(TracingTelemetry),
        ]);
        fanout.record(TelemetryEvent::DecisionRequested {
            agent_id: AgentId::new(),
        });
        assert_eq!(first.events().len(), 1);
        assert_eq!(second.events().len(), 1);
    }

    #[test]
    fn events_are_timestamped_in_order() {
        let telemetry = MemoryTelemetry::new();
        let agent_id = AgentId::new();
        telemetry.record(TelemetryEvent::Forced {
            agent_id,
            action: ActionKind::Idle,
        });
        telemetry.record(TelemetryEvent::Stuck {
            agent_id,
            action: ActionKind::MoveLeft,
        });
        let events = telemetry.events();
        assert!(events.windows(2).all(|w| w.first().map(|e| e.at) <= w.last().map(|e| e.at)));
    }
}
