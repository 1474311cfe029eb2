//! Error types for the engine.

use thiserror::Error;

/// Result type for engine operations.
pub type EngineResult<T> = Result<T, EngineError>;

/// Errors that can occur in the offline data-access engine.
#[derive(Error, Debug)]
pub enum EngineError {
    /// Remote call failure: a transport-level error or a non-2xx
    /// response. Carries the HTTP status when one was received.
    #[error("remote call failed: {message}")]
    Remote {
        /// Error message.
        message: String,
        /// HTTP status code, if a response was received.
        status: Option<u16>,
    },

    /// Local store failure.
    #[error("store error: {0}")]
    Store(#[from] offsync_store::StoreError),

    /// A cache or wire value could not be serialized or deserialized.
    #[error("codec error: {0}")]
    Codec(#[from] serde_json::Error),

    /// The requested entity is not present in the local cache.
    #[error("entity {id} not found in collection {collection}")]
    NotFound {
        /// Collection resource URL.
        collection: String,
        /// Requested entity identifier.
        id: String,
    },

    /// The operation requires an entity identifier but none is set.
    #[error("entity is missing an identifier")]
    MissingId,
}

impl EngineError {
    /// Creates a remote error without an HTTP status (transport-level).
    pub fn remote(message: impl Into<String>) -> Self {
        Self::Remote {
            message: message.into(),
            status: None,
        }
    }

    /// Creates a remote error for a non-2xx HTTP response.
    pub fn remote_status(status: u16) -> Self {
        Self::Remote {
            message: format!("unexpected status {status}"),
            status: Some(status),
        }
    }
}
