//! Integration tests running the full client stack — repository, engine,
//! HTTP gateway — against a live `taskpad-server` instance.

#![allow(clippy::expect_used, clippy::unwrap_used)]

use std::sync::Arc;
use std::time::Duration;

use url::Url;

use taskpad::connectivity::ConnectivityMonitor;
use taskpad::gateway::http::HttpGateway;
use taskpad::repo::{SyncOutcome, TaskRepository};
use taskpad::storage::TaskStore;
use taskpad::storage::memory::InMemoryStore;
use taskpad::sync::{SyncConfig, SyncEngine};
use taskpad_model::task::{TaskDraft, TaskPatch};
use taskpad_server::api;
use taskpad_server::store::TaskTable;

struct Harness {
    repo: TaskRepository<Arc<InMemoryStore>>,
    monitor: Arc<ConnectivityMonitor>,
    gateway: HttpGateway,
    remote: Arc<TaskTable>,
}

/// Starts a server on an ephemeral port and wires a client stack at it.
async fn make_harness() -> Harness {
    let remote = Arc::new(TaskTable::new());
    let (addr, _handle) = api::start_server("127.0.0.1:0", Arc::clone(&remote))
        .await
        .expect("start server");

    let base = Url::parse(&format!("http://{addr}/")).expect("base url");
    let gateway = HttpGateway::new(base, Duration::from_secs(5)).expect("gateway");

    let store = Arc::new(InMemoryStore::new());
    let monitor = Arc::new(ConnectivityMonitor::new(true));
    let engine = SyncEngine::new(SyncConfig::default());
    let (repo, _events) = TaskRepository::new(
        TaskStore::new(Arc::clone(&store)),
        Arc::clone(&monitor),
        engine,
        32,
    );

    Harness {
        repo,
        monitor,
        gateway,
        remote,
    }
}

fn draft(title: &str) -> TaskDraft {
    TaskDraft {
        title: title.to_string(),
        description: String::new(),
    }
}

#[tokio::test]
async fn create_edit_delete_converge_over_http() {
    let harness = make_harness().await;

    // Create and push.
    let task = harness.repo.create(draft("Wire task")).await.expect("create");
    let outcome = harness.repo.sync_with_server(&harness.gateway).await.expect("sync");
    assert_eq!(
        outcome,
        SyncOutcome::Completed {
            synced: 1,
            failed: 0
        }
    );
    let remote_id = harness.repo.tasks().await[0].remote_id.expect("remote id");
    assert_eq!(
        harness.remote.get(remote_id).await.expect("record").title,
        "Wire task"
    );

    // Edit and push.
    harness
        .repo
        .update(
            &task.id,
            TaskPatch {
                title: Some("Wire task, renamed".to_string()),
                completed: Some(true),
                ..Default::default()
            },
        )
        .await
        .expect("update");
    harness.repo.sync_with_server(&harness.gateway).await.expect("sync");
    let record = harness.remote.get(remote_id).await.expect("record");
    assert_eq!(record.title, "Wire task, renamed");
    assert!(record.completed);

    // Delete and push.
    harness.repo.delete(&task.id).await.expect("delete");
    harness.repo.sync_with_server(&harness.gateway).await.expect("sync");
    assert!(harness.remote.is_empty().await);
}

#[tokio::test]
async fn offline_batch_converges_after_reconnect() {
    let harness = make_harness().await;
    harness.monitor.set_online(false);

    harness.repo.create(draft("Batch one")).await.expect("create");
    harness.repo.create(draft("Batch two")).await.expect("create");
    harness.repo.create(draft("Batch three")).await.expect("create");

    let outcome = harness.repo.sync_with_server(&harness.gateway).await.expect("sync");
    assert_eq!(outcome, SyncOutcome::Offline);
    assert!(harness.remote.is_empty().await);

    harness.monitor.set_online(true);
    let outcome = harness.repo.sync_with_server(&harness.gateway).await.expect("sync");
    assert_eq!(
        outcome,
        SyncOutcome::Completed {
            synced: 3,
            failed: 0
        }
    );
    assert_eq!(harness.remote.len().await, 3);

    let titles: Vec<String> = harness
        .remote
        .list()
        .await
        .into_iter()
        .map(|r| r.title)
        .collect();
    assert_eq!(titles, vec!["Batch one", "Batch two", "Batch three"]);
}

#[tokio::test]
async fn remote_404_on_delete_still_drains_tombstone() {
    let harness = make_harness().await;
    let task = harness.repo.create(draft("Ghost record")).await.expect("create");
    harness.repo.sync_with_server(&harness.gateway).await.expect("sync");
    let remote_id = harness.repo.tasks().await[0].remote_id.expect("remote id");

    // The record vanishes server-side before the client deletes it.
    assert!(harness.remote.remove(remote_id).await);

    harness.repo.delete(&task.id).await.expect("delete");
    let outcome = harness.repo.sync_with_server(&harness.gateway).await.expect("sync");
    assert!(matches!(outcome, SyncOutcome::Completed { .. }));
    assert!(harness.repo.tasks().await.is_empty());
}
