//! SDK error types
//!
//! Every resource call resolves to [`SdkResult`]. Transport-level outcomes
//! are first captured in an [`crate::Envelope`] and converted here.

use thiserror::Error;

/// The main error type for the SDK
#[derive(Error, Debug)]
pub enum SdkError {
    /// The request never produced an HTTP response (connection refused,
    /// timeout, unreadable body).
    #[error("Network error: {0}")]
    Transport(String),

    /// The server answered with a non-2xx status
    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },

    /// A 2xx response whose own `status` field reports a failure
    #[error("{message}")]
    Business { message: String },

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// URL parsing error
    #[error("Invalid URL: {0}")]
    UrlError(#[from] url::ParseError),

    /// Configuration error
    #[error("Configuration error: {0}")]
    ConfigurationError(String),

    /// Invalid request
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// The operation was cancelled before it completed
    #[error("Operation cancelled")]
    Cancelled,
}

/// Result type alias for SDK operations
pub type SdkResult<T> = Result<T, SdkError>;

impl SdkError {
    pub fn business(message: impl Into<String>) -> Self {
        SdkError::Business {
            message: message.into(),
        }
    }

    /// Get the HTTP status code if available
    pub fn status_code(&self) -> Option<u16> {
        match self {
            SdkError::Api { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Whether the failure happened before any response arrived.
    pub fn is_transport(&self) -> bool {
        matches!(self, SdkError::Transport(_))
    }
}

impl From<reqwest::Error> for SdkError {
    fn from(err: reqwest::Error) -> Self {
        SdkError::Transport(err.to_string())
    }
}
