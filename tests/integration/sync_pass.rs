//! Integration tests for the reconciliation pass: deletion propagation,
//! create/update propagation, partial-failure tolerance, and the
//! persisted snapshot.

#![allow(clippy::expect_used, clippy::unwrap_used)]

use std::sync::Arc;

use taskpad::connectivity::ConnectivityMonitor;
use taskpad::gateway::memory::InMemoryGateway;
use taskpad::repo::{SyncOutcome, TaskRepository};
use taskpad::storage::memory::InMemoryStore;
use taskpad::storage::TaskStore;
use taskpad::sync::{SyncConfig, SyncEngine};
use taskpad_model::task::TaskDraft;

// ---------------------------------------------------------------------------
// Helper functions
// ---------------------------------------------------------------------------

struct Harness {
    repo: TaskRepository<Arc<InMemoryStore>>,
    store: Arc<InMemoryStore>,
    monitor: Arc<ConnectivityMonitor>,
    gateway: InMemoryGateway,
}

fn make_harness(online: bool, config: SyncConfig) -> Harness {
    let store = Arc::new(InMemoryStore::new());
    let monitor = Arc::new(ConnectivityMonitor::new(online));
    let engine = SyncEngine::new(config);
    let (repo, _events) = TaskRepository::new(
        TaskStore::new(Arc::clone(&store)),
        Arc::clone(&monitor),
        engine,
        32,
    );
    Harness {
        repo,
        store,
        monitor,
        gateway: InMemoryGateway::new(),
    }
}

fn draft(title: &str) -> TaskDraft {
    TaskDraft {
        title: title.to_string(),
        description: String::new(),
    }
}

// ---------------------------------------------------------------------------
// Offline cycle: create offline, reconcile on reconnect
// ---------------------------------------------------------------------------

#[tokio::test]
async fn offline_creations_are_pushed_on_reconnect() {
    let harness = make_harness(false, SyncConfig::default());
    harness.repo.create(draft("Offline one")).await.expect("create");
    harness.repo.create(draft("Offline two")).await.expect("create");

    // Still offline: the pass is a no-op.
    let outcome = harness.repo.sync_with_server(&harness.gateway).await.expect("sync");
    assert_eq!(outcome, SyncOutcome::Offline);
    assert_eq!(harness.gateway.total_calls(), 0);

    // Reconnect and reconcile.
    harness.monitor.set_online(true);
    let outcome = harness.repo.sync_with_server(&harness.gateway).await.expect("sync");
    assert_eq!(
        outcome,
        SyncOutcome::Completed {
            synced: 2,
            failed: 0
        }
    );
    assert_eq!(harness.gateway.create_calls(), 2);
    assert_eq!(harness.gateway.len(), 2);

    // Every task now carries its remote id.
    for task in harness.repo.tasks().await {
        assert!(task.synced);
        assert!(!task.local_only);
        assert!(task.remote_id.is_some());
    }
}

#[tokio::test]
async fn second_pass_over_synced_list_is_remote_quiet() {
    let harness = make_harness(true, SyncConfig::default());
    harness.repo.create(draft("Settle down")).await.expect("create");
    harness.repo.sync_with_server(&harness.gateway).await.expect("first pass");
    let calls_after_first = harness.gateway.total_calls();
    let first_sync_time = harness.repo.status().await.last_sync_time.expect("timestamp");

    let outcome = harness.repo.sync_with_server(&harness.gateway).await.expect("second pass");
    assert_eq!(
        outcome,
        SyncOutcome::Completed {
            synced: 0,
            failed: 0
        }
    );
    // No further remote traffic, but a fresh completion timestamp.
    assert_eq!(harness.gateway.total_calls(), calls_after_first);
    let second_sync_time = harness.repo.status().await.last_sync_time.expect("timestamp");
    assert!(second_sync_time >= first_sync_time);
}

#[tokio::test]
async fn dirty_edit_of_synced_task_becomes_remote_update() {
    let harness = make_harness(true, SyncConfig::default());
    let task = harness.repo.create(draft("Original title")).await.expect("create");
    harness.repo.sync_with_server(&harness.gateway).await.expect("first pass");

    let remote_id = harness
        .repo
        .tasks()
        .await
        .first()
        .and_then(|t| t.remote_id)
        .expect("remote id");

    harness
        .repo
        .update(
            &task.id,
            taskpad_model::task::TaskPatch {
                title: Some("Edited title".to_string()),
                ..Default::default()
            },
        )
        .await
        .expect("update");

    harness.repo.sync_with_server(&harness.gateway).await.expect("second pass");
    assert_eq!(harness.gateway.update_calls(), 1);
    assert_eq!(
        harness.gateway.record(remote_id).expect("record").title,
        "Edited title"
    );
}

// ---------------------------------------------------------------------------
// Partial failure
// ---------------------------------------------------------------------------

#[tokio::test]
async fn failing_remote_keeps_tasks_dirty_for_the_next_pass() {
    let harness = make_harness(true, SyncConfig::default());
    harness.repo.create(draft("Will fail")).await.expect("create");
    harness.gateway.fail_creates(true);

    let outcome = harness.repo.sync_with_server(&harness.gateway).await.expect("sync");
    assert_eq!(
        outcome,
        SyncOutcome::Completed {
            synced: 0,
            failed: 1
        }
    );
    let tasks = harness.repo.tasks().await;
    assert!(!tasks[0].synced);

    // Remote recovers; the next pass retries the same task.
    harness.gateway.fail_creates(false);
    let outcome = harness.repo.sync_with_server(&harness.gateway).await.expect("sync");
    assert_eq!(
        outcome,
        SyncOutcome::Completed {
            synced: 1,
            failed: 0
        }
    );
}

#[tokio::test]
async fn retry_ceiling_stops_hammering_a_dead_remote() {
    let config = SyncConfig {
        max_sync_attempts: 2,
        ..Default::default()
    };
    let harness = make_harness(true, config);
    harness.repo.create(draft("Stubborn")).await.expect("create");
    harness.gateway.fail_creates(true);

    for _ in 0..5 {
        harness.repo.sync_with_server(&harness.gateway).await.expect("sync");
    }
    // Two real attempts, then the ceiling holds.
    assert_eq!(harness.gateway.create_calls(), 2);

    // A fresh mutation resets the budget.
    let task_id = harness.repo.tasks().await[0].id.clone();
    harness
        .repo
        .update(
            &task_id,
            taskpad_model::task::TaskPatch {
                completed: Some(true),
                ..Default::default()
            },
        )
        .await
        .expect("update");
    harness.repo.sync_with_server(&harness.gateway).await.expect("sync");
    assert_eq!(harness.gateway.create_calls(), 3);
}

// ---------------------------------------------------------------------------
// Deletion propagation
// ---------------------------------------------------------------------------

#[tokio::test]
async fn offline_delete_reaches_remote_on_reconnect() {
    let harness = make_harness(true, SyncConfig::default());
    let task = harness.repo.create(draft("Short lived")).await.expect("create");
    harness.repo.sync_with_server(&harness.gateway).await.expect("sync");
    assert_eq!(harness.gateway.len(), 1);

    harness.monitor.set_online(false);
    harness.repo.delete(&task.id).await.expect("delete");
    assert!(harness.repo.tasks().await.is_empty());
    assert_eq!(harness.gateway.len(), 1); // remote still has it

    harness.monitor.set_online(true);
    harness.repo.sync_with_server(&harness.gateway).await.expect("sync");
    assert!(harness.gateway.is_empty());

    let inspect = TaskStore::new(Arc::clone(&harness.store));
    assert!(inspect.load_tombstones().await.expect("tombstones").is_empty());
}

#[tokio::test]
async fn failed_delete_is_retried_on_a_later_pass() {
    let harness = make_harness(true, SyncConfig::default());
    let task = harness.repo.create(draft("Sticky delete")).await.expect("create");
    harness.repo.sync_with_server(&harness.gateway).await.expect("sync");

    harness.repo.delete(&task.id).await.expect("delete");
    harness.gateway.fail_deletes(true);
    harness.repo.sync_with_server(&harness.gateway).await.expect("sync");

    // Tombstone retained, remote record still there.
    let inspect = TaskStore::new(Arc::clone(&harness.store));
    assert_eq!(inspect.load_tombstones().await.expect("tombstones").len(), 1);
    assert_eq!(harness.gateway.len(), 1);

    // Remote recovers; the retained tombstone drains.
    harness.gateway.fail_deletes(false);
    harness.repo.sync_with_server(&harness.gateway).await.expect("sync");
    assert!(inspect.load_tombstones().await.expect("tombstones").is_empty());
    assert!(harness.gateway.is_empty());
}

#[tokio::test]
async fn fire_and_forget_deletes_when_opted_in() {
    let config = SyncConfig {
        drop_failed_deletes: true,
        ..Default::default()
    };
    let harness = make_harness(true, config);
    let task = harness.repo.create(draft("Forgotten")).await.expect("create");
    harness.repo.sync_with_server(&harness.gateway).await.expect("sync");

    harness.repo.delete(&task.id).await.expect("delete");
    harness.gateway.fail_deletes(true);
    harness.repo.sync_with_server(&harness.gateway).await.expect("sync");

    // Tombstone dropped even though the remote delete failed: the remote
    // record is now a phantom, by explicit configuration.
    let inspect = TaskStore::new(Arc::clone(&harness.store));
    assert!(inspect.load_tombstones().await.expect("tombstones").is_empty());
    assert_eq!(harness.gateway.len(), 1);
}

#[tokio::test]
async fn deleting_a_never_synced_task_needs_no_remote_call() {
    let harness = make_harness(false, SyncConfig::default());
    let task = harness.repo.create(draft("Purely local")).await.expect("create");
    harness.repo.delete(&task.id).await.expect("delete");

    harness.monitor.set_online(true);
    harness.repo.sync_with_server(&harness.gateway).await.expect("sync");

    assert_eq!(harness.gateway.delete_calls(), 0);
    let inspect = TaskStore::new(Arc::clone(&harness.store));
    assert!(inspect.load_tombstones().await.expect("tombstones").is_empty());
}
