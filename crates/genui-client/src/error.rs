//! Error types for the streaming client.
//!
//! Only two kinds of failure ever reach a caller: the collaborator could not
//! be reached or its stream broke (`Transport`, `Http`, `Request`), or the
//! client was misconfigured (`Config`). Malformed patch lines are not errors
//! at all, and a cancelled session is silent.

use thiserror::Error;

/// Errors surfaced by generators, the controller and the snapshot store.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum ClientError {
    /// The text stream failed while it was being read.
    #[error("transport error: {reason}")]
    Transport {
        /// Description of the failure.
        reason: String,
    },

    /// The collaborator answered with a non-success status.
    #[error("HTTP {status}: {message}")]
    Http {
        /// HTTP status code.
        status: u16,
        /// Response body, if any.
        message: String,
    },

    /// The request could not be sent.
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// Invalid builder input (URL, header, ...).
    #[error("invalid configuration: {message}")]
    Config {
        /// What was wrong.
        message: String,
    },

    /// Request or tree serialization failed.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Snapshot publication failed.
    #[error("snapshot store error: {0}")]
    Store(#[from] StoreError),

    /// Failure reported by a custom generator.
    #[error("{message}")]
    Generation {
        /// Error message.
        message: String,
        /// Optional source error for chaining.
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },
}

impl ClientError {
    /// Create a transport error.
    #[must_use]
    pub fn transport(reason: impl Into<String>) -> Self {
        Self::Transport {
            reason: reason.into(),
        }
    }

    /// Create a configuration error.
    #[must_use]
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Create a custom generation error with a message.
    #[must_use]
    pub fn custom(message: impl Into<String>) -> Self {
        Self::Generation {
            message: message.into(),
            source: None,
        }
    }

    /// Create a custom generation error with a message and source.
    #[must_use]
    pub fn custom_with_source(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Generation {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Whether the failure came from the stream or the connection.
    #[must_use]
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            Self::Transport { .. } | Self::Http { .. } | Self::Request(_)
        )
    }
}

/// Errors during snapshot publication.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum StoreError {
    /// A tree could not be serialized for delta computation.
    #[error("tree serialization failed: {reason}")]
    Serialization {
        /// Description of the serialization failure.
        reason: String,
    },
}

/// Result type alias for client operations.
pub type ClientResult<T> = Result<T, ClientError>;

/// Result type alias for snapshot store operations.
pub type StoreResult<T> = Result<T, StoreError>;
