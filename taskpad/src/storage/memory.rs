//! In-memory key/value store for testing.
//!
//! Supports per-operation failure injection and a write counter so tests
//! can assert both error paths and the absence of persistence writes.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use parking_lot::Mutex;

use super::{KeyValueStore, StorageError};

/// In-memory [`KeyValueStore`] backed by a `HashMap`.
///
/// Failure injection flips every subsequent operation of the corresponding
/// kind into an error until cleared.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    entries: Mutex<HashMap<String, Vec<u8>>>,
    reads_fail: AtomicBool,
    writes_fail: AtomicBool,
    write_count: AtomicUsize,
}

impl InMemoryStore {
    /// Creates a new, empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// When `fail` is true, every subsequent `get` returns an error.
    pub fn fail_reads(&self, fail: bool) {
        self.reads_fail.store(fail, Ordering::SeqCst);
    }

    /// When `fail` is true, every subsequent `set`/`remove` returns an error.
    pub fn fail_writes(&self, fail: bool) {
        self.writes_fail.store(fail, Ordering::SeqCst);
    }

    /// Number of successful `set` calls since construction.
    #[must_use]
    pub fn write_count(&self) -> usize {
        self.write_count.load(Ordering::SeqCst)
    }

    /// Returns a copy of the blob under `key` without going through the
    /// async trait (test convenience).
    #[must_use]
    pub fn peek(&self, key: &str) -> Option<Vec<u8>> {
        self.entries.lock().get(key).cloned()
    }
}

impl KeyValueStore for InMemoryStore {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StorageError> {
        if self.reads_fail.load(Ordering::SeqCst) {
            return Err(StorageError::ReadFailed(format!(
                "injected read failure for key {key}"
            )));
        }
        Ok(self.entries.lock().get(key).cloned())
    }

    async fn set(&self, key: &str, value: Vec<u8>) -> Result<(), StorageError> {
        if self.writes_fail.load(Ordering::SeqCst) {
            return Err(StorageError::WriteFailed(format!(
                "injected write failure for key {key}"
            )));
        }
        self.entries.lock().insert(key.to_string(), value);
        self.write_count.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<(), StorageError> {
        if self.writes_fail.load(Ordering::SeqCst) {
            return Err(StorageError::WriteFailed(format!(
                "injected write failure for key {key}"
            )));
        }
        self.entries.lock().remove(key);
        Ok(())
    }
}
