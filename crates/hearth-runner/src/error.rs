//! Failure taxonomy for decision requests.
//!
//! Uses `thiserror` for typed errors that surface from the decision
//! pipeline: transport, HTTP status, response shape, and reply content.
//! None of these reach the agent controllers; [`DecisionClient::resolve`]
//! coerces them into a fallback decision and keeps only the coarse
//! [`FailureKind`] for logs and telemetry.
//!
//! [`DecisionClient::resolve`]: crate::client::DecisionClient::resolve

/// Errors that can occur while obtaining a decision.
#[derive(Debug, thiserror::Error)]
pub enum DecisionError {
    /// Connection refused, reset, or otherwise not established.
    #[error("decision service unreachable: {0}")]
    Unreachable(String),

    /// The request did not settle before the client deadline.
    #[error("decision request timed out after {timeout_ms}ms")]
    Timeout {
        /// The deadline in milliseconds.
        timeout_ms: u64,
    },

    /// The service answered with a non-2xx status.
    #[error("decision service returned {status}: {body}")]
    BadStatus {
        /// HTTP status code.
        status: u16,
        /// Truncated response body.
        body: String,
    },

    /// The body was not JSON or lacked `choices[0].message.content`.
    #[error("malformed response body: {0}")]
    MalformedBody(String),

    /// The completion text contained no recognizable action token.
    #[error("no action recognized in reply: {0}")]
    NoActionRecognized(String),

    /// A dialogue reply contained no usable line.
    #[error("dialogue reply contained no line")]
    EmptyLine,

    /// The prompt could not be rendered from the snapshot.
    #[error("prompt render error: {0}")]
    Template(String),
}

/// Coarse classification of a [`DecisionError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailureKind {
    /// The request never produced an HTTP response.
    Transport,
    /// The service answered with an error status.
    Protocol,
    /// The response (or our prompt) was not in the expected shape.
    Format,
    /// The reply was well-formed but meaningless.
    Semantic,
}

impl FailureKind {
    /// Label for logging and metrics.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Transport => "transport",
            Self::Protocol => "protocol",
            Self::Format => "format",
            Self::Semantic => "semantic",
        }
    }
}

impl core::fmt::Display for FailureKind {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl DecisionError {
    /// Classify this error.
    pub const fn kind(&self) -> FailureKind {
        match self {
            Self::Unreachable(_) | Self::Timeout { .. } => FailureKind::Transport,
            Self::BadStatus { .. } => FailureKind::Protocol,
            Self::MalformedBody(_) | Self::Template(_) => FailureKind::Format,
            Self::NoActionRecognized(_) | Self::EmptyLine => FailureKind::Semantic,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_variant_has_a_kind() {
        let cases = [
            (DecisionError::Unreachable("refused".to_owned()), FailureKind::Transport),
            (DecisionError::Timeout { timeout_ms: 10 }, FailureKind::Transport),
            (
                DecisionError::BadStatus {
                    status: 500,
                    body: String::new(),
                },
                FailureKind::Protocol,
            ),
            (DecisionError::MalformedBody("nope".to_owned()), FailureKind::Format),
            (DecisionError::Template("bad".to_owned()), FailureKind::Format),
            (
                DecisionError::NoActionRecognized("hmm".to_owned()),
                FailureKind::Semantic,
            ),
            (DecisionError::EmptyLine, FailureKind::Semantic),
        ];
        for (error, kind) in cases {
            assert_eq!(error.kind(), kind, "{error}");
        }
    }
}
