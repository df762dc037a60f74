//! Error types for the engine binary.
//!
//! [`EngineError`] wraps every failure that can stop the engine before
//! the frame loop starts. Once the loop runs, decision failures are
//! absorbed by the decision client and never surface here.

/// Top-level error for the engine binary.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// Runner configuration or prompt templates could not be loaded.
    #[error("config error: {source}")]
    Config {
        /// The underlying config error.
        #[from]
        source: hearth_runner::ConfigError,
    },

    /// The scene file could not be read or parsed.
    #[error("scene error: {message}")]
    Scene {
        /// Description of the scene failure.
        message: String,
    },
}
