//! Persistence backends for the local state store.
//!
//! The store is saved as one JSON blob. It is a pure cache: losing it only
//! means the next snapshot fetch has to repopulate everything.

use std::path::{Path, PathBuf};
use std::sync::RwLock;

use crate::error::CacheError;

/// Default blob name, used as the file name by [`FileCache`].
pub const DEFAULT_CACHE_NAME: &str = "state.json";

/// Storage backend for the serialized state blob.
pub trait StateCache: Send + Sync {
    /// Read the blob. `Ok(None)` means nothing has been saved yet.
    fn load(&self) -> Result<Option<String>, CacheError>;

    /// Replace the blob.
    fn save(&self, blob: &str) -> Result<(), CacheError>;
}

impl StateCache for Box<dyn StateCache> {
    fn load(&self) -> Result<Option<String>, CacheError> {
        (**self).load()
    }

    fn save(&self, blob: &str) -> Result<(), CacheError> {
        (**self).save(blob)
    }
}

// ============================================================================
// MemoryCache
// ============================================================================

/// Cache that lives only as long as the process.
#[derive(Debug, Default)]
pub struct MemoryCache {
    blob: RwLock<Option<String>>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from an existing blob.
    pub fn with_blob(blob: impl Into<String>) -> Self {
        Self {
            blob: RwLock::new(Some(blob.into())),
        }
    }
}

impl StateCache for MemoryCache {
    fn load(&self) -> Result<Option<String>, CacheError> {
        Ok(self.blob.read().unwrap().clone())
    }

    fn save(&self, blob: &str) -> Result<(), CacheError> {
        *self.blob.write().unwrap() = Some(blob.to_string());
        Ok(())
    }
}

// ============================================================================
// FileCache
// ============================================================================

/// Cache stored as a single JSON file.
///
/// Writes go to a sibling temporary file that is then renamed over the
/// target, so a crash mid-write leaves the previous blob intact.
#[derive(Clone, Debug)]
pub struct FileCache {
    path: PathBuf,
}

impl FileCache {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// `<data dir>/sequencer-kit/state.json`, e.g.
    /// `~/.local/share/sequencer-kit/state.json` on Linux.
    #[cfg(feature = "file-signer")]
    pub fn default_location() -> Option<Self> {
        dirs::data_local_dir()
            .map(|dir| Self::new(dir.join("sequencer-kit").join(DEFAULT_CACHE_NAME)))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl StateCache for FileCache {
    fn load(&self) -> Result<Option<String>, CacheError> {
        match std::fs::read_to_string(&self.path) {
            Ok(blob) => Ok(Some(blob)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn save(&self, blob: &str) -> Result<(), CacheError> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let tmp = self.path.with_extension("json.tmp");
        std::fs::write(&tmp, blob)?;
        std::fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}
