//! The reconciliation pass: deletion propagation, create/update
//! propagation, and persistence of the reconciled snapshot.
//!
//! The engine is a pure pass over inputs it owns. It never mutates the
//! input slice or the repository's state — it returns a [`SyncReport`]
//! the caller diffs against its own state. Reentrancy protection is the
//! caller's cooperative discipline (check-and-set of the syncing flag);
//! the engine itself accepts concurrent invocations.

use chrono::{DateTime, Utc};

use taskpad_model::remote::NewRemoteTask;
use taskpad_model::task::{Task, TaskId};

use crate::connectivity::ConnectivityMonitor;
use crate::gateway::{GatewayError, TaskGateway};
use crate::storage::{KeyValueStore, TaskStore};

use super::{SyncConfig, SyncError};

/// Outcome of one reconciliation pass.
#[derive(Debug)]
pub enum PassOutcome {
    /// Connectivity was down; nothing was read, written, or sent.
    Offline,
    /// The pass ran to completion (possibly with individual failures).
    Completed(SyncReport),
}

/// What one completed pass did, for the caller to apply.
#[derive(Debug)]
pub struct SyncReport {
    /// The reconciled task list that was persisted.
    pub tasks: Vec<Task>,
    /// Tasks that transitioned to synced, with the remote id each now
    /// carries.
    pub synced: Vec<(TaskId, Option<u64>)>,
    /// Tasks that remain dirty after this pass.
    pub failed: Vec<TaskId>,
    /// Remote delete calls issued during the deletion phase.
    pub deletes_attempted: usize,
    /// Remote delete calls that failed.
    pub deletes_failed: usize,
    /// Timestamp persisted as the last-sync time.
    pub completed_at: DateTime<Utc>,
}

/// Drives reconciliation passes against a remote gateway.
#[derive(Debug, Clone, Default)]
pub struct SyncEngine {
    config: SyncConfig,
}

impl SyncEngine {
    /// Creates an engine with the given tunables.
    #[must_use]
    pub const fn new(config: SyncConfig) -> Self {
        Self { config }
    }

    /// Runs one reconciliation pass.
    ///
    /// Sequence:
    /// 1. No-op when the monitor reports offline.
    /// 2. Deletion phase: one remote delete per tombstone that carries a
    ///    remote id. Failed deletes are retained for the next pass unless
    ///    configured otherwise; a remote 404 counts as already deleted.
    /// 3. Propagation phase: each dirty task gets one create (no remote id
    ///    yet) or update (remote id known) call. Individual failures are
    ///    logged and never abort the pass.
    /// 4. The reconciled list and a fresh last-sync timestamp are
    ///    persisted unconditionally, even when some tasks failed.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError`] only for structural failures: the tombstone
    /// or task-list write failing. The caller should surface the message
    /// and not treat the pass as completed.
    pub async fn run<S, G>(
        &self,
        tasks: &[Task],
        store: &TaskStore<S>,
        gateway: &G,
        connectivity: &ConnectivityMonitor,
    ) -> Result<PassOutcome, SyncError>
    where
        S: KeyValueStore,
        G: TaskGateway,
    {
        if !connectivity.is_connected() {
            tracing::debug!("offline, skipping sync pass");
            return Ok(PassOutcome::Offline);
        }

        let (deletes_attempted, deletes_failed) = self.propagate_deletions(store, gateway).await?;

        let mut working = tasks.to_vec();
        let mut synced = Vec::new();
        let mut failed = Vec::new();

        for task in &mut working {
            if task.synced {
                continue;
            }
            if self.config.max_sync_attempts > 0 && task.sync_attempts >= self.config.max_sync_attempts
            {
                tracing::warn!(
                    task_id = %task.id,
                    attempts = task.sync_attempts,
                    "retry ceiling reached, skipping task until next mutation"
                );
                failed.push(task.id.clone());
                continue;
            }

            match propagate_one(task, gateway).await {
                Ok(assigned) => {
                    task.mark_synced(assigned);
                    synced.push((task.id.clone(), task.remote_id));
                }
                Err(e) => {
                    task.sync_attempts += 1;
                    tracing::warn!(
                        task_id = %task.id,
                        attempts = task.sync_attempts,
                        error = %e,
                        "task propagation failed, will retry next pass"
                    );
                    failed.push(task.id.clone());
                }
            }
        }

        // The snapshot is persisted even when some tasks failed: partial
        // progress (fresh attempt counters included) must survive restarts.
        store.save_tasks(&working).await?;

        let completed_at = Utc::now();
        if let Err(e) = store.save_last_sync(completed_at).await {
            tracing::warn!(error = %e, "failed to persist last-sync timestamp");
        }

        tracing::info!(
            synced = synced.len(),
            failed = failed.len(),
            deletes = deletes_attempted,
            "sync pass complete"
        );

        Ok(PassOutcome::Completed(SyncReport {
            tasks: working,
            synced,
            failed,
            deletes_attempted,
            deletes_failed,
            completed_at,
        }))
    }

    /// Deletion phase: drains the tombstone list against the remote store.
    ///
    /// Returns `(attempted, failed)` counts. The surviving list is
    /// persisted only when it changed.
    async fn propagate_deletions<S, G>(
        &self,
        store: &TaskStore<S>,
        gateway: &G,
    ) -> Result<(usize, usize), SyncError>
    where
        S: KeyValueStore,
        G: TaskGateway,
    {
        let tombstones = match store.load_tombstones().await {
            Ok(t) => t,
            Err(e) => {
                tracing::warn!(error = %e, "failed to load tombstones, treating as empty");
                Vec::new()
            }
        };
        if tombstones.is_empty() {
            return Ok((0, 0));
        }

        let initial = tombstones.len();
        let mut attempted = 0;
        let mut failed = 0;
        let mut retained = Vec::new();

        for tombstone in tombstones {
            let Some(remote_id) = tombstone.remote_id else {
                // Never created remotely; nothing to delete.
                tracing::debug!(task_id = %tombstone.id, "discarding tombstone with no remote record");
                continue;
            };
            attempted += 1;
            match gateway.delete(remote_id).await {
                Ok(()) => {
                    tracing::debug!(task_id = %tombstone.id, remote_id, "remote delete confirmed");
                }
                Err(GatewayError::Status(404)) => {
                    tracing::debug!(task_id = %tombstone.id, remote_id, "remote record already gone");
                }
                Err(e) => {
                    failed += 1;
                    tracing::warn!(
                        task_id = %tombstone.id,
                        remote_id,
                        error = %e,
                        "remote delete failed"
                    );
                    if self.config.drop_failed_deletes {
                        tracing::debug!(task_id = %tombstone.id, "dropping failed delete per config");
                    } else {
                        retained.push(tombstone);
                    }
                }
            }
        }

        if retained.len() != initial {
            store.save_tombstones(&retained).await?;
        }
        Ok((attempted, failed))
    }
}

/// Issues the single gateway call a dirty task needs: create when no
/// remote record exists yet, update otherwise.
///
/// Returns the remote id assigned by a create, `None` for an update.
async fn propagate_one<G: TaskGateway>(
    task: &Task,
    gateway: &G,
) -> Result<Option<u64>, GatewayError> {
    let payload = NewRemoteTask::from_task(task);
    if let Some(remote_id) = task.remote_id {
        tracing::debug!(task_id = %task.id, remote_id, "updating remote task");
        gateway.update(remote_id, &payload).await?;
        Ok(None)
    } else {
        tracing::debug!(task_id = %task.id, title = %task.title, "creating remote task");
        let record = gateway.create(&payload).await?;
        Ok(Some(record.id))
    }
}
