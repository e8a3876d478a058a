//! Error types for document operations.

use thiserror::Error;

/// Result type for core document operations.
pub type CoreResult<T> = Result<T, CoreError>;

/// Errors that can occur while encoding or decoding a scene.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Stored bytes are not a valid emoji art document.
    #[error("Corrupt document: {0}")]
    CorruptDocument(String),

    /// Scene could not be serialized.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Errors reported by a [`PersistencePort`](crate::persist::PersistencePort).
///
/// A missing blob is not an error; ports report it as `Ok(None)`.
#[derive(Debug, Error)]
pub enum PersistenceError {
    /// Underlying storage I/O failed.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// A value could not be converted to or from its stored form.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// The storage backend refused the operation.
    #[error("Storage backend error: {0}")]
    Backend(String),
}
