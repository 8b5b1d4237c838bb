//! Reconciliation of local task state against the remote store.
//!
//! [`engine::SyncEngine`] drives one reconciliation pass: propagate pending
//! deletions, then pending creates/updates, then persist the reconciled
//! snapshot. [`spawn_autosync`] runs passes automatically on
//! offline-to-online connectivity edges.

pub mod engine;

pub use engine::{PassOutcome, SyncEngine, SyncReport};

use std::sync::Arc;

use tokio::task::JoinHandle;

use crate::gateway::TaskGateway;
use crate::repo::TaskRepository;
use crate::storage::{KeyValueStore, StorageError};

/// Errors that abort a reconciliation pass.
///
/// Individual remote-call failures are contained inside the pass and never
/// surface here; only structural failures (persistence of the reconciled
/// snapshot or the tombstone list) do.
#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    /// A storage write inside the pass failed.
    #[error("storage failure during sync: {0}")]
    Storage(#[from] StorageError),
}

/// Tunables for the reconciliation pass.
#[derive(Debug, Clone)]
pub struct SyncConfig {
    /// When true, a tombstone whose remote delete failed is discarded
    /// anyway (fire-and-forget). Default is to retain it and retry on the
    /// next pass.
    pub drop_failed_deletes: bool,
    /// Per-task ceiling on consecutive failed propagation attempts; a task
    /// at the ceiling is skipped until it is mutated again. `0` disables
    /// the ceiling.
    pub max_sync_attempts: u32,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            drop_failed_deletes: false,
            max_sync_attempts: 8,
        }
    }
}

/// Spawns a background task that triggers a sync pass whenever
/// connectivity transitions to online.
///
/// The task ends when the repository's connectivity monitor is dropped.
/// Pass failures are logged and do not terminate the watcher; the next
/// edge triggers a fresh pass.
pub fn spawn_autosync<S, G>(repo: Arc<TaskRepository<S>>, gateway: Arc<G>) -> JoinHandle<()>
where
    S: KeyValueStore + 'static,
    G: TaskGateway + 'static,
{
    let mut rx = repo.connectivity().subscribe();
    tokio::spawn(async move {
        while rx.changed().await.is_ok() {
            let online = *rx.borrow_and_update();
            if !online {
                continue;
            }
            tracing::info!("connectivity restored, starting sync pass");
            if let Err(e) = repo.sync_with_server(gateway.as_ref()).await {
                tracing::warn!(error = %e, "autosync pass failed");
            }
        }
        tracing::debug!("connectivity channel closed, autosync watcher exiting");
    })
}
