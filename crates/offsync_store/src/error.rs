//! Error types for the store crate.

use thiserror::Error;

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Errors that can occur in a key-value store.
#[derive(Error, Debug)]
pub enum StoreError {
    /// An I/O error from the underlying storage medium.
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    /// The persisted store file could not be parsed.
    #[error("corrupt store file: {0}")]
    Corrupt(#[from] serde_json::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display() {
        let err = StoreError::Io(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            "missing",
        ));
        assert!(err.to_string().contains("missing"));
    }
}
