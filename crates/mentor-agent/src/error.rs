//! Error types for the agent crate.

use thiserror::Error;

/// Errors that can occur while talking to the completion service or
/// running a pipeline stage.
#[derive(Error, Debug)]
pub enum AgentError {
    /// The service answered with a non-success HTTP status.
    #[error("completion API error {status}: {body}")]
    Http {
        /// HTTP status code.
        status: u16,
        /// Response body, as far as it could be read.
        body: String,
    },

    /// The request timed out.
    #[error("completion request timed out: {0}")]
    Timeout(String),

    /// The connection failed before a response arrived.
    #[error("transport error: {0}")]
    Transport(String),

    /// Model invocation failed for another reason.
    #[error("model invocation failed: {0}")]
    ModelInvocation(String),

    /// Response parsing failed.
    #[error("failed to parse response: {0}")]
    ResponseParse(String),

    /// The service returned no text.
    #[error("completion contained no text")]
    EmptyCompletion,

    /// Vector index or embedding operation failed.
    #[error("memory operation failed: {0}")]
    Memory(#[from] mentor_memory::MemoryError),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Configuration(String),
}

impl AgentError {
    /// Whether retrying the same request may succeed.
    ///
    /// Timeouts, connection failures, rate limits and server errors are
    /// transient. Authentication failures, malformed requests and
    /// unparsable responses are not.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Http { status, .. } => *status == 408 || *status == 429 || *status >= 500,
            Self::Timeout(_) | Self::Transport(_) => true,
            _ => false,
        }
    }

    pub(crate) fn from_reqwest(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            Self::Timeout(e.to_string())
        } else if e.is_connect() || e.is_request() {
            Self::Transport(e.to_string())
        } else {
            Self::ModelInvocation(e.to_string())
        }
    }
}

/// Result type for agent operations.
pub type Result<T> = std::result::Result<T, AgentError>;
