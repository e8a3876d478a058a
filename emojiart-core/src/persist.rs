//! Persistence port for document and palette blobs.
//!
//! The core never assumes a storage medium: documents and palettes are
//! loaded and saved as opaque byte blobs keyed by [`DocumentKey`] through a
//! [`PersistencePort`]. Two implementations are provided: [`FileStore`] for a
//! data directory on disk and [`MemoryStore`] for in-process use.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, RwLock};

use async_trait::async_trait;

use crate::PersistenceError;

/// Key of the autosave slot.
pub const AUTOSAVE_KEY: &str = "Autosaved.emojiart";

/// Identity of a stored blob.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DocumentKey(String);

impl DocumentKey {
    /// Create a key from any string.
    #[must_use]
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    /// The key of the autosave slot.
    #[must_use]
    pub fn autosave() -> Self {
        Self::new(AUTOSAVE_KEY)
    }

    /// The key as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for DocumentKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Load and save byte blobs by key.
#[async_trait]
pub trait PersistencePort: Send + Sync {
    /// Load a blob. Returns `Ok(None)` if nothing is stored under `key`.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage medium cannot be read.
    async fn load(&self, key: &DocumentKey) -> Result<Option<Vec<u8>>, PersistenceError>;

    /// Store a blob, replacing any previous value.
    ///
    /// # Errors
    ///
    /// Returns an error if the blob could not be written.
    async fn save(&self, key: &DocumentKey, bytes: &[u8]) -> Result<(), PersistenceError>;
}

/// Stores each blob as a file in a data directory.
#[derive(Debug, Clone)]
pub struct FileStore {
    data_dir: PathBuf,
}

impl FileStore {
    /// Create a store rooted at `data_dir`, creating the directory if needed.
    ///
    /// # Errors
    ///
    /// Returns [`PersistenceError::Io`] if the directory cannot be created.
    pub fn with_data_dir(data_dir: impl Into<PathBuf>) -> Result<Self, PersistenceError> {
        let data_dir = data_dir.into();
        std::fs::create_dir_all(&data_dir)?;
        Ok(Self { data_dir })
    }

    /// The directory blobs are stored in.
    #[must_use]
    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    /// The file a key is stored in.
    #[must_use]
    pub fn path_for(&self, key: &DocumentKey) -> PathBuf {
        self.data_dir.join(sanitize_filename(key.as_str()))
    }
}

#[async_trait]
impl PersistencePort for FileStore {
    async fn load(&self, key: &DocumentKey) -> Result<Option<Vec<u8>>, PersistenceError> {
        match tokio::fs::read(self.path_for(key)).await {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn save(&self, key: &DocumentKey, bytes: &[u8]) -> Result<(), PersistenceError> {
        let path = self.path_for(key);
        let tmp = self
            .data_dir
            .join(format!("{}.tmp", sanitize_filename(key.as_str())));
        tokio::fs::write(&tmp, bytes).await?;
        tokio::fs::rename(&tmp, &path).await?;
        tracing::debug!("Stored {} bytes at {}", bytes.len(), path.display());
        Ok(())
    }
}

/// Keeps blobs in memory.
///
/// Cloning shares the underlying storage. Counts saves and can be switched
/// into a failing mode, which makes it useful for exercising save policies.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    blobs: Arc<RwLock<HashMap<DocumentKey, Vec<u8>>>>,
    saves: Arc<AtomicUsize>,
    failing: Arc<AtomicBool>,
}

impl MemoryStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Put a blob directly, bypassing the save counter.
    pub fn insert(&self, key: DocumentKey, bytes: Vec<u8>) {
        self.blobs
            .write()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .insert(key, bytes);
    }

    /// Read a blob directly.
    #[must_use]
    pub fn get(&self, key: &DocumentKey) -> Option<Vec<u8>> {
        self.blobs
            .read()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .get(key)
            .cloned()
    }

    /// Number of `save` calls received, including failed ones.
    #[must_use]
    pub fn save_count(&self) -> usize {
        self.saves.load(Ordering::SeqCst)
    }

    /// Make subsequent saves fail (or succeed again).
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }
}

#[async_trait]
impl PersistencePort for MemoryStore {
    async fn load(&self, key: &DocumentKey) -> Result<Option<Vec<u8>>, PersistenceError> {
        Ok(self.get(key))
    }

    async fn save(&self, key: &DocumentKey, bytes: &[u8]) -> Result<(), PersistenceError> {
        self.saves.fetch_add(1, Ordering::SeqCst);
        if self.failing.load(Ordering::SeqCst) {
            return Err(PersistenceError::Backend(format!("refusing to store {key}")));
        }
        self.insert(key.clone(), bytes.to_vec());
        Ok(())
    }
}

/// Sanitize a key for use as a filename.
///
/// Replaces any character that is not alphanumeric, `-`, `_` or `.` with `_`,
/// and never produces a hidden or parent-directory name.
fn sanitize_filename(key: &str) -> String {
    let name: String = key
        .chars()
        .map(|c| {
            if c.is_alphanumeric() || c == '-' || c == '_' || c == '.' {
                c
            } else {
                '_'
            }
        })
        .collect();
    if name.is_empty() || name.starts_with('.') {
        format!("_{name}")
    } else {
        name
    }
}
