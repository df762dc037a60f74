//! Decision client for Hearth NPCs.
//!
//! Turns a [`ContextSnapshot`] into a [`Decision`]. In networked mode the
//! snapshot is rendered into a prompt, sent to an OpenAI-compatible
//! chat-completions endpoint, and the free-text reply is classified into
//! the closed action vocabulary. In offline mode a local generator
//! samples plausible actions and dialogue without any I/O.
//!
//! # Architecture
//!
//! ```text
//! ContextSnapshot --> PromptEngine --> ChatBackend --> vocabulary --> Decision
//!                 \-> OfflineGenerator ---------------------------/
//! ```
//!
//! Every failure is caught at the [`DecisionClient`] boundary. Callers use
//! [`DecisionClient::resolve`], which always yields a decision (falling
//! back to `Idle` or a canned line) together with a coarse outcome.
//!
//! [`ContextSnapshot`]: hearth_types::ContextSnapshot
//! [`Decision`]: hearth_types::Decision
//! [`DecisionClient`]: client::DecisionClient
//! [`DecisionClient::resolve`]: client::DecisionClient::resolve

pub mod client;
pub mod config;
pub mod error;
pub mod llm;
pub mod offline;
pub mod prompt;
pub mod vocabulary;

pub use client::{DecisionClient, Outcome, ResolvedDecision};
pub use config::{ConfigError, DecisionMode, LlmBackendConfig, RunnerConfig};
pub use error::{DecisionError, FailureKind};
pub use llm::{ChatBackend, ProbeStatus};
pub use offline::{OfflineConfig, OfflineGenerator};
pub use prompt::{PromptEngine, RenderedPrompt};
pub use vocabulary::{MatchRule, Unrecognized};
