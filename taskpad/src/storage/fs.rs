//! File-per-key storage backend under a data directory.
//!
//! Each key maps to one file; writes go through a temp file followed by a
//! rename so a crash mid-write never leaves a truncated blob behind. The
//! data directory is created on first write.

use std::path::{Path, PathBuf};

use super::{KeyValueStore, StorageError};

/// Filesystem-backed [`KeyValueStore`].
#[derive(Debug, Clone)]
pub struct FsStore {
    dir: PathBuf,
}

impl FsStore {
    /// Creates a store rooted at `dir`. The directory is created lazily on
    /// the first write.
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Returns the data directory this store writes under.
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(key)
    }
}

impl KeyValueStore for FsStore {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StorageError> {
        match tokio::fs::read(self.path_for(key)).await {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(StorageError::ReadFailed(format!("{key}: {e}"))),
        }
    }

    async fn set(&self, key: &str, value: Vec<u8>) -> Result<(), StorageError> {
        tokio::fs::create_dir_all(&self.dir)
            .await
            .map_err(|e| StorageError::Unavailable(format!("{}: {e}", self.dir.display())))?;

        let path = self.path_for(key);
        let tmp = self.dir.join(format!("{key}.tmp"));
        tokio::fs::write(&tmp, &value)
            .await
            .map_err(|e| StorageError::WriteFailed(format!("{key}: {e}")))?;
        tokio::fs::rename(&tmp, &path)
            .await
            .map_err(|e| StorageError::WriteFailed(format!("{key}: {e}")))
    }

    async fn remove(&self, key: &str) -> Result<(), StorageError> {
        match tokio::fs::remove_file(self.path_for(key)).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(StorageError::WriteFailed(format!("{key}: {e}"))),
        }
    }
}
