//! The task repository: single source of truth for the task collection
//! and its sync-status flags.
//!
//! Every mutation validates its input, builds the updated list, persists it
//! through the [`TaskStore`], and only then commits to in-memory state — a
//! failed persistence write leaves memory unchanged and propagates to the
//! caller. All read-modify-persist sequences are serialized by an internal
//! mutex held for the full sequence, so back-to-back mutations cannot lose
//! each other's writes.
//!
//! State changes are announced on a bounded event channel the application
//! shell drains for user-visible notices.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::{Mutex, RwLock, mpsc};

use taskpad_model::task::{Task, TaskDraft, TaskId, TaskPatch, Tombstone, ValidationError};

use crate::connectivity::ConnectivityMonitor;
use crate::gateway::TaskGateway;
use crate::storage::{KeyValueStore, StorageError, TaskStore};
use crate::sync::{PassOutcome, SyncEngine, SyncError};

/// Errors returned by repository mutation operations.
#[derive(Debug, thiserror::Error)]
pub enum RepoError {
    /// Entry validation of a title or description failed.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// No task with the given id exists.
    #[error("task not found: {0}")]
    NotFound(TaskId),

    /// The durable write backing the mutation failed.
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Process-wide sync status flags.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncStatus {
    /// Initial load from storage is in flight.
    pub is_loading: bool,
    /// A reconciliation pass is in flight.
    pub is_syncing: bool,
    /// When the last reconciliation pass completed.
    pub last_sync_time: Option<DateTime<Utc>>,
    /// Last load error, if any.
    pub error: Option<String>,
}

/// State-change notifications emitted by the repository.
///
/// Replaces ambient toast/snackbar state: the shell subscribes and decides
/// what to surface. Emission is best-effort — a full channel drops the
/// event rather than blocking a mutation.
#[derive(Debug, Clone, PartialEq)]
pub enum RepoEvent {
    /// The initial load finished (possibly with a recorded error).
    Loaded {
        /// Number of tasks loaded.
        count: usize,
    },
    /// A task was created.
    TaskCreated(Task),
    /// A task was updated.
    TaskUpdated(Task),
    /// A task was deleted.
    TaskDeleted(TaskId),
    /// A reconciliation pass started.
    SyncStarted,
    /// A reconciliation pass completed.
    SyncCompleted {
        /// Tasks that transitioned to synced.
        synced: usize,
        /// Tasks still dirty after the pass.
        failed: usize,
    },
    /// A reconciliation pass aborted with the given message.
    SyncFailed(String),
}

/// Result of a [`TaskRepository::sync_with_server`] call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncOutcome {
    /// The pass ran; counts of synced and still-dirty tasks.
    Completed {
        /// Tasks that transitioned to synced.
        synced: usize,
        /// Tasks still dirty after the pass.
        failed: usize,
    },
    /// Connectivity is down; nothing was attempted.
    Offline,
    /// Another pass is already in flight; this call was a no-op.
    AlreadySyncing,
}

#[derive(Debug, Default)]
struct RepoState {
    tasks: Vec<Task>,
    status: SyncStatus,
}

/// Owns the canonical in-memory task list and its durable persistence.
pub struct TaskRepository<S: KeyValueStore> {
    store: TaskStore<S>,
    connectivity: Arc<ConnectivityMonitor>,
    engine: SyncEngine,
    state: RwLock<RepoState>,
    /// Serializes read-modify-persist sequences across mutations.
    mutation_lock: Mutex<()>,
    event_tx: mpsc::Sender<RepoEvent>,
}

impl<S: KeyValueStore> TaskRepository<S> {
    /// Creates a repository over the given store, connectivity handle, and
    /// sync engine.
    ///
    /// Returns the repository and the receiver for [`RepoEvent`]s.
    pub fn new(
        store: TaskStore<S>,
        connectivity: Arc<ConnectivityMonitor>,
        engine: SyncEngine,
        event_buffer: usize,
    ) -> (Self, mpsc::Receiver<RepoEvent>) {
        let (event_tx, event_rx) = mpsc::channel(event_buffer);
        let repo = Self {
            store,
            connectivity,
            engine,
            state: RwLock::new(RepoState::default()),
            mutation_lock: Mutex::new(()),
            event_tx,
        };
        (repo, event_rx)
    }

    /// Returns the connectivity monitor this repository watches.
    #[must_use]
    pub fn connectivity(&self) -> &ConnectivityMonitor {
        &self.connectivity
    }

    /// Loads the persisted task list and last-sync timestamp.
    ///
    /// Load failures are swallowed: the list stays empty and the error
    /// message is recorded in the `error` status field, so a corrupted
    /// snapshot never prevents startup.
    pub async fn load_from_storage(&self) {
        self.state.write().await.status.is_loading = true;

        let loaded = self.store.load_tasks().await;
        let last_sync = match self.store.load_last_sync().await {
            Ok(ts) => ts,
            Err(e) => {
                tracing::warn!(error = %e, "failed to load last-sync timestamp");
                None
            }
        };

        let count;
        {
            let mut state = self.state.write().await;
            state.status.is_loading = false;
            state.status.last_sync_time = last_sync;
            match loaded {
                Ok(tasks) => {
                    tracing::info!(count = tasks.len(), "loaded tasks from storage");
                    state.tasks = tasks;
                    state.status.error = None;
                }
                Err(e) => {
                    tracing::error!(error = %e, "failed to load tasks from storage");
                    state.tasks = Vec::new();
                    state.status.error = Some(e.to_string());
                }
            }
            count = state.tasks.len();
        }
        self.emit(RepoEvent::Loaded { count });
    }

    /// Creates a task from the draft and persists the grown list.
    ///
    /// The new task starts dirty; `local_only` reflects connectivity at
    /// creation time.
    ///
    /// # Errors
    ///
    /// Returns [`RepoError::Validation`] for out-of-bounds entry fields,
    /// or [`RepoError::Storage`] when the persistence write fails (memory
    /// is left unchanged).
    pub async fn create(&self, draft: TaskDraft) -> Result<Task, RepoError> {
        draft.validate()?;
        let _guard = self.mutation_lock.lock().await;

        let task = Task::new(
            draft.title,
            draft.description,
            !self.connectivity.is_connected(),
        );

        let mut tasks = self.state.read().await.tasks.clone();
        tasks.push(task.clone());
        self.store.save_tasks(&tasks).await?;
        self.state.write().await.tasks = tasks;

        tracing::info!(task_id = %task.id, local_only = task.local_only, "task created");
        self.emit(RepoEvent::TaskCreated(task.clone()));
        Ok(task)
    }

    /// Merges the patch into the task with the given id and persists.
    ///
    /// Always dirties the task, even when the patch matches the current
    /// values.
    ///
    /// # Errors
    ///
    /// Returns [`RepoError::NotFound`] if no such task exists,
    /// [`RepoError::Validation`] for out-of-bounds fields, or
    /// [`RepoError::Storage`] when the persistence write fails.
    pub async fn update(&self, id: &TaskId, patch: TaskPatch) -> Result<Task, RepoError> {
        patch.validate()?;
        let _guard = self.mutation_lock.lock().await;

        let mut tasks = self.state.read().await.tasks.clone();
        let task = tasks
            .iter_mut()
            .find(|t| &t.id == id)
            .ok_or_else(|| RepoError::NotFound(id.clone()))?;
        task.apply(&patch);
        let updated = task.clone();

        self.store.save_tasks(&tasks).await?;
        self.state.write().await.tasks = tasks;

        tracing::info!(task_id = %id, "task updated");
        self.emit(RepoEvent::TaskUpdated(updated.clone()));
        Ok(updated)
    }

    /// Flips the completion flag of the task with the given id.
    ///
    /// # Errors
    ///
    /// Same as [`update`](Self::update).
    pub async fn toggle(&self, id: &TaskId) -> Result<Task, RepoError> {
        let _guard = self.mutation_lock.lock().await;

        let mut tasks = self.state.read().await.tasks.clone();
        let task = tasks
            .iter_mut()
            .find(|t| &t.id == id)
            .ok_or_else(|| RepoError::NotFound(id.clone()))?;
        let patch = TaskPatch {
            completed: Some(!task.completed),
            ..Default::default()
        };
        task.apply(&patch);
        let updated = task.clone();

        self.store.save_tasks(&tasks).await?;
        self.state.write().await.tasks = tasks;

        tracing::info!(task_id = %id, completed = updated.completed, "task toggled");
        self.emit(RepoEvent::TaskUpdated(updated.clone()));
        Ok(updated)
    }

    /// Removes the task with the given id, persists the reduced list, and
    /// records a tombstone for remote deletion.
    ///
    /// The removal is immediate and durable even while offline; the remote
    /// side catches up on the next reconciliation pass. Tombstones are
    /// deduplicated by task id. A tombstone write failure is logged but
    /// does not fail the deletion (the task-list write already succeeded).
    ///
    /// # Errors
    ///
    /// Returns [`RepoError::NotFound`] if no such task exists, or
    /// [`RepoError::Storage`] when the task-list write fails.
    pub async fn delete(&self, id: &TaskId) -> Result<(), RepoError> {
        let _guard = self.mutation_lock.lock().await;

        let mut tasks = self.state.read().await.tasks.clone();
        let position = tasks
            .iter()
            .position(|t| &t.id == id)
            .ok_or_else(|| RepoError::NotFound(id.clone()))?;
        let removed = tasks.remove(position);

        self.store.save_tasks(&tasks).await?;
        self.state.write().await.tasks = tasks;

        // Record the tombstone after the list write: losing it leaves a
        // phantom remote record, not a resurrected local task.
        match self.store.load_tombstones().await {
            Ok(mut tombstones) => {
                if tombstones.iter().all(|t| &t.id != id) {
                    tombstones.push(Tombstone {
                        id: removed.id.clone(),
                        remote_id: removed.remote_id,
                    });
                    if let Err(e) = self.store.save_tombstones(&tombstones).await {
                        tracing::error!(task_id = %id, error = %e, "failed to persist tombstone");
                    }
                }
            }
            Err(e) => {
                tracing::error!(task_id = %id, error = %e, "failed to load tombstones");
            }
        }

        tracing::info!(task_id = %id, "task deleted");
        self.emit(RepoEvent::TaskDeleted(removed.id));
        Ok(())
    }

    /// Snapshot of the current task list.
    pub async fn tasks(&self) -> Vec<Task> {
        self.state.read().await.tasks.clone()
    }

    /// Snapshot of the current sync status flags.
    pub async fn status(&self) -> SyncStatus {
        self.state.read().await.status.clone()
    }

    /// Sets the syncing flag.
    pub async fn set_syncing(&self, syncing: bool) {
        self.state.write().await.status.is_syncing = syncing;
    }

    /// Records when the last reconciliation pass completed.
    pub async fn set_last_sync_time(&self, ts: DateTime<Utc>) {
        self.state.write().await.status.last_sync_time = Some(ts);
    }

    /// Marks the task with the given id as mirrored remotely; no-op if the
    /// task no longer exists.
    pub async fn mark_synced(&self, id: &TaskId, remote_id: Option<u64>) {
        let mut state = self.state.write().await;
        if let Some(task) = state.tasks.iter_mut().find(|t| &t.id == id) {
            task.mark_synced(remote_id);
        }
    }

    /// Runs one reconciliation pass against the gateway and applies the
    /// result.
    ///
    /// Cooperative single-flight: if a pass is already flagged in flight
    /// the call returns [`SyncOutcome::AlreadySyncing`] without touching
    /// anything; if connectivity is down it returns
    /// [`SyncOutcome::Offline`].
    ///
    /// # Errors
    ///
    /// Returns [`SyncError`] when the pass aborts on a structural storage
    /// failure; the error text is also emitted as
    /// [`RepoEvent::SyncFailed`].
    pub async fn sync_with_server<G: TaskGateway>(
        &self,
        gateway: &G,
    ) -> Result<SyncOutcome, SyncError> {
        {
            let mut state = self.state.write().await;
            if state.status.is_syncing {
                tracing::debug!("sync pass already in flight, skipping");
                return Ok(SyncOutcome::AlreadySyncing);
            }
            state.status.is_syncing = true;
        }

        if !self.connectivity.is_connected() {
            self.set_syncing(false).await;
            return Ok(SyncOutcome::Offline);
        }

        self.emit(RepoEvent::SyncStarted);
        let snapshot = self.tasks().await;

        let result = self
            .engine
            .run(&snapshot, &self.store, gateway, &self.connectivity)
            .await;

        match result {
            Ok(PassOutcome::Completed(report)) => {
                {
                    let mut state = self.state.write().await;
                    for (id, remote_id) in &report.synced {
                        if let Some(task) = state.tasks.iter_mut().find(|t| &t.id == id) {
                            task.mark_synced(*remote_id);
                        }
                    }
                    // Carry attempt counters back for still-dirty tasks, but
                    // only when the task was not mutated mid-pass (a fresh
                    // mutation resets its retry budget).
                    for id in &report.failed {
                        let Some(reconciled) = report.tasks.iter().find(|t| &t.id == id) else {
                            continue;
                        };
                        if let Some(task) = state.tasks.iter_mut().find(|t| &t.id == id)
                            && task.updated_at == reconciled.updated_at
                        {
                            task.sync_attempts = reconciled.sync_attempts;
                        }
                    }
                    state.status.last_sync_time = Some(report.completed_at);
                    state.status.is_syncing = false;
                }
                let outcome = SyncOutcome::Completed {
                    synced: report.synced.len(),
                    failed: report.failed.len(),
                };
                self.emit(RepoEvent::SyncCompleted {
                    synced: report.synced.len(),
                    failed: report.failed.len(),
                });
                Ok(outcome)
            }
            Ok(PassOutcome::Offline) => {
                self.set_syncing(false).await;
                Ok(SyncOutcome::Offline)
            }
            Err(e) => {
                self.set_syncing(false).await;
                tracing::error!(error = %e, "sync pass aborted");
                self.emit(RepoEvent::SyncFailed(e.to_string()));
                Err(e)
            }
        }
    }

    fn emit(&self, event: RepoEvent) {
        let _ = self.event_tx.try_send(event);
    }
}
