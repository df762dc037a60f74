//! Error types for the hearth-agents crate.

use hearth_types::AgentId;

/// Errors that can occur during registry operations.
#[derive(Debug, thiserror::Error)]
pub enum AgentError {
    /// No live agent has the given ID.
    #[error("agent not found: {0}")]
    AgentNotFound(AgentId),
}
