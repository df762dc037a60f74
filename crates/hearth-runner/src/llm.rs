//! Chat-completions backend and connectivity probe.
//!
//! Talks to any OpenAI-compatible server (LM Studio, Ollama, llama.cpp,
//! hosted APIs) over HTTP via `reqwest`. The backend does not care which
//! model answers; it sends a prompt and hands back the raw completion
//! text for the vocabulary to classify.

use tracing::debug;

use crate::config::LlmBackendConfig;
use crate::error::DecisionError;
use crate::prompt::RenderedPrompt;

/// Longest error body kept in a [`DecisionError::BadStatus`].
const MAX_ERROR_BODY_LEN: usize = 200;

/// Backend for OpenAI-compatible chat completions APIs.
///
/// Sends requests to `{api_url}/chat/completions` and probes
/// `{api_url}/models`.
pub struct ChatBackend {
    client: reqwest::Client,
    api_url: String,
    api_key: String,
    model: String,
    temperature: f64,
    max_tokens: u32,
}

/// Result of a connectivity probe.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProbeStatus {
    /// The server answered and listed these models.
    Ready {
        /// Model identifiers reported by the server.
        models: Vec<String>,
    },
    /// The server answered with an error status.
    ServerError(u16),
    /// No HTTP response at all.
    Unreachable,
}

impl ProbeStatus {
    /// Label for logging.
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Ready { .. } => "ready",
            Self::ServerError(_) => "server_error",
            Self::Unreachable => "unreachable",
        }
    }
}

impl ChatBackend {
    /// Create a backend from configuration.
    pub fn new(config: &LlmBackendConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_url: config.api_url.trim_end_matches('/').to_owned(),
            api_key: config.api_key.clone(),
            model: config.model.clone(),
            temperature: config.temperature,
            max_tokens: config.max_tokens,
        }
    }

    /// Human-readable name for logging.
    pub const fn name(&self) -> &str {
        "openai-compatible"
    }

    /// Model identifier sent with every request.
    pub fn model(&self) -> &str {
        &self.model
    }

    /// Send a prompt and return the completion text.
    ///
    /// # Errors
    ///
    /// Returns [`DecisionError::Unreachable`] or [`DecisionError::Timeout`]
    /// for transport failures, [`DecisionError::BadStatus`] for non-2xx
    /// responses and [`DecisionError::MalformedBody`] when the body is not
    /// JSON or lacks `choices[0].message.content`.
    pub async fn complete(&self, prompt: &RenderedPrompt) -> Result<String, DecisionError> {
        let url = format!("{}/chat/completions", self.api_url);

        let body = serde_json::json!({
            "model": self.model,
            "messages": [
                {"role": "system", "content": prompt.system},
                {"role": "user", "content": prompt.user}
            ],
            "temperature": self.temperature,
            "max_tokens": self.max_tokens
        });

        debug!(url = %url, model = %self.model, "sending chat completion request");

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Accept", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| classify_transport_error(&e))?;

        let status = response.status();
        if !status.is_success() {
            let error_body = response
                .text()
                .await
                .unwrap_or_else(|_| "unable to read error body".to_owned());
            return Err(DecisionError::BadStatus {
                status: status.as_u16(),
                body: truncate(&error_body, MAX_ERROR_BODY_LEN),
            });
        }

        let text = response
            .text()
            .await
            .map_err(|e| DecisionError::MalformedBody(format!("failed to read body: {e}")))?;
        let json: serde_json::Value = serde_json::from_str(&text)
            .map_err(|e| DecisionError::MalformedBody(format!("body is not JSON: {e}")))?;

        extract_content(&json)
    }

    /// Check whether the server is up, for diagnostics only.
    ///
    /// Never fails: every outcome is folded into a [`ProbeStatus`].
    pub async fn probe(&self) -> ProbeStatus {
        let url = format!("{}/models", self.api_url);
        let response = match self
            .client
            .get(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .send()
            .await
        {
            Ok(response) => response,
            Err(e) => {
                debug!(url = %url, error = %e, "probe failed");
                return ProbeStatus::Unreachable;
            }
        };

        let status = response.status();
        if !status.is_success() {
            return ProbeStatus::ServerError(status.as_u16());
        }

        let models = response
            .json::<serde_json::Value>()
            .await
            .ok()
            .and_then(|json| {
                json.get("data").and_then(serde_json::Value::as_array).map(|data| {
                    data.iter()
                        .filter_map(|m| m.get("id").and_then(serde_json::Value::as_str))
                        .map(ToOwned::to_owned)
                        .collect()
                })
            })
            .unwrap_or_default();

        ProbeStatus::Ready { models }
    }
}

/// Map a `reqwest` send error onto the failure taxonomy.
fn classify_transport_error(error: &reqwest::Error) -> DecisionError {
    if error.is_timeout() {
        DecisionError::Timeout { timeout_ms: 0 }
    } else if error.is_decode() {
        DecisionError::MalformedBody(format!("{error}"))
    } else {
        DecisionError::Unreachable(format!("{error}"))
    }
}

/// Extract the text content from a chat completions response.
fn extract_content(json: &serde_json::Value) -> Result<String, DecisionError> {
    json.get("choices")
        .and_then(|c| c.get(0))
        .and_then(|c| c.get("message"))
        .and_then(|m| m.get("content"))
        .and_then(serde_json::Value::as_str)
        .map(|s| s.trim().to_owned())
        .ok_or_else(|| {
            DecisionError::MalformedBody("response missing choices[0].message.content".to_owned())
        })
}

/// Truncate to at most `max` characters.
fn truncate(s: &str, max: usize) -> String {
    s.chars().take(max).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extract_content_valid() {
        let json = serde_json::json!({
            "choices": [{
                "message": {
                    "content": "  MOVE_UP\n"
                }
            }]
        });
        let result = extract_content(&json);
        assert_eq!(result.ok().as_deref(), Some("MOVE_UP"));
    }

    #[test]
    fn extract_content_missing_choices() {
        let json = serde_json::json!({"error": "rate_limit"});
        assert!(matches!(
            extract_content(&json),
            Err(DecisionError::MalformedBody(_))
        ));
    }

    #[test]
    fn extract_content_empty_choices() {
        let json = serde_json::json!({"choices": []});
        assert!(extract_content(&json).is_err());
    }

    #[test]
    fn backend_trims_trailing_slash() {
        let backend = ChatBackend::new(&LlmBackendConfig {
            api_url: "http://localhost:1234/v1/".to_owned(),
            ..LlmBackendConfig::default()
        });
        assert_eq!(backend.api_url, "http://localhost:1234/v1");
        assert_eq!(backend.name(), "openai-compatible");
    }

    #[test]
    fn truncate_counts_chars() {
        assert_eq!(truncate("héllo", 2), "hé");
        assert_eq!(truncate("ok", 10), "ok");
    }
}
