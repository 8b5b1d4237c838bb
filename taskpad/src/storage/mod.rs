//! Durable key/value persistence for the task collection and its sync
//! bookkeeping.
//!
//! Defines the [`KeyValueStore`] trait that all storage backends must
//! satisfy, plus the typed [`TaskStore`] wrapper that layers the JSON codec
//! on top. Concrete backends:
//! - [`memory::InMemoryStore`] — in-process store for testing, with
//!   per-operation failure injection
//! - [`fs::FsStore`] — file-per-key store under the configured data
//!   directory

pub mod fs;
pub mod memory;

use chrono::{DateTime, Utc};

use taskpad_model::codec;
use taskpad_model::task::{Task, Tombstone};

/// Storage key for the persisted task list (JSON array of tasks).
pub const TASKS_KEY: &str = "tasks";

/// Storage key for the tombstone list (JSON array).
pub const DELETED_IDS_KEY: &str = "deleted_ids";

/// Storage key for the last-sync timestamp (RFC 3339 string).
pub const LAST_SYNC_KEY: &str = "last_sync";

/// Errors that can occur during storage operations.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// The underlying storage is unavailable.
    #[error("storage unavailable: {0}")]
    Unavailable(String),

    /// A read operation failed.
    #[error("read failed: {0}")]
    ReadFailed(String),

    /// A write operation failed.
    #[error("write failed: {0}")]
    WriteFailed(String),

    /// A stored blob could not be encoded or decoded.
    #[error("codec error: {0}")]
    Codec(#[from] codec::CodecError),
}

/// Async key/value storage over opaque byte blobs.
///
/// Implementations must tolerate unknown keys: `get` returns `None` for a
/// key that was never written, and `remove` of an absent key succeeds.
pub trait KeyValueStore: Send + Sync {
    /// Read the blob stored under `key`, or `None` if absent.
    fn get(
        &self,
        key: &str,
    ) -> impl std::future::Future<Output = Result<Option<Vec<u8>>, StorageError>> + Send;

    /// Write `value` under `key`, replacing any previous blob.
    fn set(
        &self,
        key: &str,
        value: Vec<u8>,
    ) -> impl std::future::Future<Output = Result<(), StorageError>> + Send;

    /// Delete the blob under `key`, if present.
    fn remove(&self, key: &str)
    -> impl std::future::Future<Output = Result<(), StorageError>> + Send;
}

/// Shared handles delegate to the inner store, so a backend can be owned
/// by a repository and inspected by a test at the same time.
impl<S: KeyValueStore> KeyValueStore for std::sync::Arc<S> {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StorageError> {
        (**self).get(key).await
    }

    async fn set(&self, key: &str, value: Vec<u8>) -> Result<(), StorageError> {
        (**self).set(key, value).await
    }

    async fn remove(&self, key: &str) -> Result<(), StorageError> {
        (**self).remove(key).await
    }
}

/// Typed persistence for the task collection, tombstone list, and last-sync
/// timestamp, layered over any [`KeyValueStore`].
///
/// A missing key loads as the empty value (empty list, no timestamp); only
/// actual read/decode failures surface as errors, so callers can decide
/// whether to swallow them.
pub struct TaskStore<S: KeyValueStore> {
    inner: S,
}

impl<S: KeyValueStore> TaskStore<S> {
    /// Wraps a raw key/value backend.
    #[must_use]
    pub const fn new(inner: S) -> Self {
        Self { inner }
    }

    /// Returns a reference to the underlying backend.
    pub const fn inner(&self) -> &S {
        &self.inner
    }

    /// Loads the persisted task list, preserving order.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError`] if the read or decode fails. A missing blob
    /// is an empty list, not an error.
    pub async fn load_tasks(&self) -> Result<Vec<Task>, StorageError> {
        match self.inner.get(TASKS_KEY).await? {
            Some(bytes) => Ok(codec::decode_tasks(&bytes)?),
            None => Ok(Vec::new()),
        }
    }

    /// Persists the full task list.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError`] if the encode or write fails.
    pub async fn save_tasks(&self, tasks: &[Task]) -> Result<(), StorageError> {
        let bytes = codec::encode_tasks(tasks)?;
        self.inner.set(TASKS_KEY, bytes).await
    }

    /// Loads the tombstone list.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError`] if the read or decode fails. A missing blob
    /// is an empty list, not an error.
    pub async fn load_tombstones(&self) -> Result<Vec<Tombstone>, StorageError> {
        match self.inner.get(DELETED_IDS_KEY).await? {
            Some(bytes) => Ok(codec::decode_tombstones(&bytes)?),
            None => Ok(Vec::new()),
        }
    }

    /// Persists the tombstone list.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError`] if the encode or write fails.
    pub async fn save_tombstones(&self, tombstones: &[Tombstone]) -> Result<(), StorageError> {
        let bytes = codec::encode_tombstones(tombstones)?;
        self.inner.set(DELETED_IDS_KEY, bytes).await
    }

    /// Loads the last-sync timestamp, or `None` if no pass has completed.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError`] if the read fails or the stored string is
    /// not a valid timestamp.
    pub async fn load_last_sync(&self) -> Result<Option<DateTime<Utc>>, StorageError> {
        match self.inner.get(LAST_SYNC_KEY).await? {
            Some(bytes) => Ok(Some(codec::decode_timestamp(&bytes)?)),
            None => Ok(None),
        }
    }

    /// Persists the last-sync timestamp.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError`] if the write fails.
    pub async fn save_last_sync(&self, ts: DateTime<Utc>) -> Result<(), StorageError> {
        self.inner.set(LAST_SYNC_KEY, codec::encode_timestamp(ts)).await
    }
}
