//! Configuration types for the decision client.
//!
//! All configuration is loaded from environment variables. The client
//! needs to know whether to talk to a text-generation service at all and,
//! if so, where it lives and how long to wait for it.

use std::time::Duration;

/// Errors that can occur while loading configuration or templates.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// A variable was present but could not be parsed.
    #[error("invalid {name}: {message}")]
    Invalid {
        /// The variable name.
        name: String,
        /// What was wrong with it.
        message: String,
    },

    /// A prompt template could not be read or compiled.
    #[error("template error: {0}")]
    Template(String),
}

/// Complete decision-client configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct RunnerConfig {
    /// Whether decisions come from the network or the local generator.
    pub mode: DecisionMode,
    /// Chat-completions backend settings (ignored in offline mode).
    pub backend: LlmBackendConfig,
    /// Maximum time a single decision request may take.
    pub decision_timeout: Duration,
    /// Directory with prompt template overrides.
    pub templates_dir: Option<String>,
    /// Seed for the offline generator, for reproducible runs.
    pub seed: Option<u64>,
}

/// How decisions are produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecisionMode {
    /// Local sampling, no I/O.
    Offline,
    /// Chat-completions requests with offline-style fallbacks.
    Networked,
}

impl DecisionMode {
    /// Label for logging.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Offline => "offline",
            Self::Networked => "networked",
        }
    }
}

/// Configuration for an OpenAI-compatible chat-completions endpoint.
#[derive(Debug, Clone, PartialEq)]
pub struct LlmBackendConfig {
    /// Base API URL (e.g. `http://localhost:1234/v1`).
    pub api_url: String,
    /// API key sent as a bearer token.
    pub api_key: String,
    /// Model identifier.
    pub model: String,
    /// Sampling temperature.
    pub temperature: f64,
    /// Response-size budget in tokens.
    pub max_tokens: u32,
}

impl Default for LlmBackendConfig {
    fn default() -> Self {
        Self {
            api_url: "http://localhost:1234/v1".to_owned(),
            api_key: "lm-studio".to_owned(),
            model: "TheBloke/Mistral-7B-Instruct-v0.1-GGUF".to_owned(),
            temperature: 0.7,
            max_tokens: 64,
        }
    }
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            mode: DecisionMode::Offline,
            backend: LlmBackendConfig::default(),
            decision_timeout: Duration::from_millis(7000),
            templates_dir: None,
            seed: None,
        }
    }
}

impl RunnerConfig {
    /// Load configuration from environment variables.
    ///
    /// All variables are optional:
    /// - `HEARTH_DECISION_MODE` -- `offline` (default) or `networked`
    /// - `LLM_API_URL` -- base URL (default `http://localhost:1234/v1`)
    /// - `LLM_API_KEY` -- bearer key (default `lm-studio`)
    /// - `LLM_MODEL` -- model name
    /// - `LLM_TEMPERATURE` -- sampling temperature (default 0.7)
    /// - `LLM_MAX_TOKENS` -- response budget (default 64)
    /// - `DECISION_TIMEOUT_MS` -- request deadline (default 7000)
    /// - `TEMPLATES_DIR` -- prompt template overrides
    /// - `HEARTH_SEED` -- offline generator seed
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    pub fn from_lookup<F>(mut lookup: F) -> Result<Self, ConfigError>
    where
        F: FnMut(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let mode = match lookup("HEARTH_DECISION_MODE") {
            None => defaults.mode,
            Some(raw) => match raw.trim().to_lowercase().as_str() {
                "offline" | "" => DecisionMode::Offline,
                "networked" | "online" | "llm" => DecisionMode::Networked,
                other => {
                    return Err(ConfigError::Invalid {
                        name: "HEARTH_DECISION_MODE".to_owned(),
                        message: format!("unknown mode: {other}"),
                    });
                }
            },
        };

        let backend = LlmBackendConfig {
            api_url: lookup("LLM_API_URL")
                .map(|url| url.trim_end_matches('/').to_owned())
                .unwrap_or(defaults.backend.api_url),
            api_key: lookup("LLM_API_KEY").unwrap_or(defaults.backend.api_key),
            model: lookup("LLM_MODEL").unwrap_or(defaults.backend.model),
            temperature: parse_var(&mut lookup, "LLM_TEMPERATURE", defaults.backend.temperature)?,
            max_tokens: parse_var(&mut lookup, "LLM_MAX_TOKENS", defaults.backend.max_tokens)?,
        };

        let timeout_ms: u64 = parse_var(&mut lookup, "DECISION_TIMEOUT_MS", 7000)?;
        let seed = match lookup("HEARTH_SEED") {
            Some(raw) => Some(raw.trim().parse().map_err(|e| ConfigError::Invalid {
                name: "HEARTH_SEED".to_owned(),
                message: format!("{e}"),
            })?),
            None => None,
        };

        Ok(Self {
            mode,
            backend,
            decision_timeout: Duration::from_millis(timeout_ms),
            templates_dir: lookup("TEMPLATES_DIR"),
            seed,
        })
    }
}

/// Parse an optional variable, falling back to `default` when absent.
fn parse_var<F, T>(lookup: &mut F, name: &str, default: T) -> Result<T, ConfigError>
where
    F: FnMut(&str) -> Option<String>,
    T: core::str::FromStr,
    T::Err: core::fmt::Display,
{
    match lookup(name) {
        Some(raw) => raw.trim().parse().map_err(|e| ConfigError::Invalid {
            name: name.to_owned(),
            message: format!("{e}"),
        }),
        None => Ok(default),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl FnMut(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn defaults_are_offline() {
        let config = RunnerConfig::from_lookup(lookup_from(&[])).unwrap();
        assert_eq!(config.mode, DecisionMode::Offline);
        assert_eq!(config.backend.api_url, "http://localhost:1234/v1");
        assert_eq!(config.decision_timeout, Duration::from_millis(7000));
        assert!(config.seed.is_none());
    }

    #[test]
    fn networked_overrides() {
        let config = RunnerConfig::from_lookup(lookup_from(&[
            ("HEARTH_DECISION_MODE", "Networked"),
            ("LLM_API_URL", "http://10.0.0.2:8080/v1/"),
            ("LLM_MODEL", "tiny"),
            ("LLM_MAX_TOKENS", "16"),
            ("DECISION_TIMEOUT_MS", "250"),
            ("HEARTH_SEED", "42"),
        ]))
        .unwrap();
        assert_eq!(config.mode, DecisionMode::Networked);
        assert_eq!(config.backend.api_url, "http://10.0.0.2:8080/v1");
        assert_eq!(config.backend.model, "tiny");
        assert_eq!(config.backend.max_tokens, 16);
        assert_eq!(config.decision_timeout, Duration::from_millis(250));
        assert_eq!(config.seed, Some(42));
    }

    #[test]
    fn bad_values_are_rejected() {
        let err = RunnerConfig::from_lookup(lookup_from(&[("DECISION_TIMEOUT_MS", "soon")]));
        assert!(matches!(err, Err(ConfigError::Invalid { ref name, .. }) if name == "DECISION_TIMEOUT_MS"));

        let err = RunnerConfig::from_lookup(lookup_from(&[("HEARTH_DECISION_MODE", "psychic")]));
        assert!(err.is_err());
    }
}
