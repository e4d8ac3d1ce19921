//! EFA client error types.

use super::schema::ValidationError;

/// Network or HTTP-level failure. Never retried by this crate.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// Request failed (connection refused, timeout, broken stream, ...)
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Server answered with a non-success status
    #[error("server returned status {status}: {body}")]
    Status { status: u16, body: String },
}

impl TransportError {
    /// Whether the failure was a request timeout.
    pub fn is_timeout(&self) -> bool {
        matches!(self, TransportError::Http(e) if e.is_timeout())
    }
}

/// Errors from the EFA client.
#[derive(Debug, thiserror::Error)]
pub enum EfaError {
    /// Caller supplied malformed input; detected before any request is sent
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Query issued while the session is not open
    #[error("session error: {0}")]
    SessionState(&'static str),

    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    /// Response body is not JSON
    #[error("response is not valid JSON: {message}")]
    ResponseFormat {
        message: String,
        body: Option<String>,
    },

    /// Response is JSON but not shaped as expected
    #[error("unexpected response shape: {0}")]
    ResponseValidation(#[from] ValidationError),

    /// A date field does not match the server's date pattern
    #[error("invalid date in {field}: {value:?}")]
    DateFormat { field: &'static str, value: String },

    /// A code that has no counterpart in a closed enumeration
    #[error("unknown {kind} code: {value}")]
    UnknownEnumValue { kind: &'static str, value: String },

    /// Operation not implemented by this client
    #[error("not supported: {0}")]
    Unsupported(&'static str),
}

impl From<reqwest::Error> for EfaError {
    fn from(err: reqwest::Error) -> Self {
        EfaError::Transport(TransportError::Http(err))
    }
}

impl EfaError {
    pub(crate) fn invalid_argument(message: impl Into<String>) -> Self {
        EfaError::InvalidArgument(message.into())
    }
}
