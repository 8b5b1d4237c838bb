//! End-to-end offline/online cycle driven by the autosync watcher:
//! mutations accumulate offline, a connectivity edge triggers
//! reconciliation, and local flags plus the remote table converge.

#![allow(clippy::expect_used, clippy::unwrap_used)]

use std::sync::Arc;
use std::time::Duration;

use taskpad::connectivity::ConnectivityMonitor;
use taskpad::gateway::memory::InMemoryGateway;
use taskpad::repo::TaskRepository;
use taskpad::storage::TaskStore;
use taskpad::storage::memory::InMemoryStore;
use taskpad::sync::{SyncConfig, SyncEngine, spawn_autosync};
use taskpad_model::task::TaskDraft;

struct Harness {
    repo: Arc<TaskRepository<Arc<InMemoryStore>>>,
    monitor: Arc<ConnectivityMonitor>,
    gateway: Arc<InMemoryGateway>,
    watcher: tokio::task::JoinHandle<()>,
}

fn make_harness() -> Harness {
    let store = Arc::new(InMemoryStore::new());
    let monitor = Arc::new(ConnectivityMonitor::new(false));
    let engine = SyncEngine::new(SyncConfig::default());
    let (repo, _events) = TaskRepository::new(
        TaskStore::new(Arc::clone(&store)),
        Arc::clone(&monitor),
        engine,
        32,
    );
    let repo = Arc::new(repo);
    let gateway = Arc::new(InMemoryGateway::new());
    let watcher = spawn_autosync(Arc::clone(&repo), Arc::clone(&gateway));
    Harness {
        repo,
        monitor,
        gateway,
        watcher,
    }
}

fn draft(title: &str) -> TaskDraft {
    TaskDraft {
        title: title.to_string(),
        description: String::new(),
    }
}

/// Polls until every task is synced, or panics after two seconds.
async fn wait_until_settled(harness: &Harness) {
    let deadline = tokio::time::Instant::now() + Duration::from_secs(2);
    loop {
        let tasks = harness.repo.tasks().await;
        let syncing = harness.repo.status().await.is_syncing;
        if !syncing && tasks.iter().all(|t| t.synced) {
            return;
        }
        assert!(
            tokio::time::Instant::now() < deadline,
            "tasks did not settle in time"
        );
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}

#[tokio::test]
async fn reconnect_edge_triggers_reconciliation() {
    let harness = make_harness();
    harness.repo.create(draft("Written on the train")).await.expect("create");
    harness.repo.create(draft("Also on the train")).await.expect("create");
    assert_eq!(harness.gateway.total_calls(), 0);

    harness.monitor.set_online(true);
    wait_until_settled(&harness).await;

    assert_eq!(harness.gateway.len(), 2);
    for task in harness.repo.tasks().await {
        assert!(task.synced);
        assert!(!task.local_only);
    }
    harness.watcher.abort();
}

#[tokio::test]
async fn going_offline_does_not_trigger_a_pass() {
    let harness = make_harness();
    harness.monitor.set_online(true);
    wait_until_settled(&harness).await;
    let calls_before = harness.gateway.total_calls();

    harness.monitor.set_online(false);
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(harness.gateway.total_calls(), calls_before);
    harness.watcher.abort();
}

#[tokio::test]
async fn repeated_reconnects_each_get_a_pass() {
    let harness = make_harness();

    harness.repo.create(draft("First outage")).await.expect("create");
    harness.monitor.set_online(true);
    wait_until_settled(&harness).await;

    harness.monitor.set_online(false);
    harness.repo.create(draft("Second outage")).await.expect("create");
    harness.monitor.set_online(true);
    wait_until_settled(&harness).await;

    assert_eq!(harness.gateway.len(), 2);
    harness.watcher.abort();
}

#[tokio::test]
async fn offline_delete_of_synced_task_propagates_on_reconnect() {
    let harness = make_harness();
    let task = harness.repo.create(draft("Remote then gone")).await.expect("create");

    harness.monitor.set_online(true);
    wait_until_settled(&harness).await;
    assert_eq!(harness.gateway.len(), 1);

    harness.monitor.set_online(false);
    harness.repo.delete(&task.id).await.expect("delete");
    assert!(harness.repo.tasks().await.is_empty());

    harness.monitor.set_online(true);
    let deadline = tokio::time::Instant::now() + Duration::from_secs(2);
    while !harness.gateway.is_empty() {
        assert!(
            tokio::time::Instant::now() < deadline,
            "remote delete did not propagate in time"
        );
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    harness.watcher.abort();
}
