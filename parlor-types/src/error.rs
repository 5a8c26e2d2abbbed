//! Error taxonomy for client and session operations.

use thiserror::Error;

/// Errors from protocol client and session operations.
///
/// Every call is independent: none of these poison the client, and a new
/// call may succeed after a failed one. The core applies no retry or
/// backoff policy; see [`ClientError::is_retryable`] for the caller-side
/// classification.
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum ClientError {
    /// Input rejected before any network traffic (empty model, empty
    /// message list). Correct the input and call again.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// The connection could not be established or the socket failed
    /// mid-read.
    #[error("transport error: {0}")]
    Transport(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// The server answered with a non-200 status, surfaced verbatim.
    #[error("server returned HTTP {status}: {body}")]
    Server {
        /// HTTP status code as received.
        status: u16,
        /// Response body, which carries the server's error message.
        body: String,
    },

    /// A completed line (or whole body) was not valid JSON for its record
    /// type. Terminates the current streamed sequence; fragments already
    /// yielded remain valid.
    #[error("decode error: {0}")]
    Decode(String),

    /// The requested model is absent from the server's model list. Raised
    /// only at session construction or an explicit model switch.
    #[error("model '{model}' not available; installed models: {available:?}")]
    ModelNotAvailable {
        /// The model that was requested.
        model: String,
        /// Names returned by the listing endpoint.
        available: Vec<String>,
    },
}

impl ClientError {
    /// Whether retrying the call might succeed.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            ClientError::Transport(_) => true,
            ClientError::Server { status, .. } => (500..=599).contains(status),
            _ => false,
        }
    }
}
