//! Error types for document operations.

use emojiart_core::{CoreError, PersistenceError};
use thiserror::Error;

/// Result type for document operations.
pub type DocumentResult<T> = Result<T, DocumentError>;

/// Errors surfaced by a [`Document`](crate::Document).
#[derive(Debug, Error)]
pub enum DocumentError {
    /// The stored document could not be decoded, or the scene could not be encoded.
    #[error(transparent)]
    Core(#[from] CoreError),

    /// Loading or saving through the persistence port failed.
    #[error(transparent)]
    Persistence(#[from] PersistenceError),
}

impl DocumentError {
    /// Returns true if this error means the stored document is corrupt.
    #[must_use]
    pub fn is_corrupt_document(&self) -> bool {
        matches!(self, Self::Core(CoreError::CorruptDocument(_)))
    }
}

/// Errors that can occur while resolving a background image.
#[derive(Debug, Error)]
pub enum ImageError {
    /// HTTP layer failed (connection, timeout, etc.).
    #[error("Image request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The server answered with a non-success status.
    #[error("Image server responded with status {0}")]
    Status(u16),

    /// Reading the image source failed for another reason.
    #[error("Image fetch failed: {0}")]
    Fetch(String),

    /// The bytes are not a decodable image.
    #[error("Failed to decode image: {0}")]
    Decode(String),

    /// A `data:` URL was malformed.
    #[error("Invalid data URI: {0}")]
    DataUri(String),

    /// The URL scheme cannot be fetched.
    #[error("Unsupported URL scheme: {0}")]
    UnsupportedScheme(String),
}
