//! In-process remote gateway double for tests.
//!
//! Behaves like a tiny remote task table: numeric id assignment on create,
//! 404-style errors for unknown ids, per-operation failure injection, and
//! call counters so tests can assert exactly how many remote calls a
//! reconciliation pass performed.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};

use parking_lot::Mutex;

use taskpad_model::remote::{NewRemoteTask, RemoteTaskRecord};

use super::{GatewayError, TaskGateway};

/// In-memory [`TaskGateway`] implementation.
#[derive(Debug)]
pub struct InMemoryGateway {
    records: Mutex<HashMap<u64, RemoteTaskRecord>>,
    next_id: AtomicU64,
    creates_fail: AtomicBool,
    updates_fail: AtomicBool,
    deletes_fail: AtomicBool,
    create_calls: AtomicUsize,
    update_calls: AtomicUsize,
    delete_calls: AtomicUsize,
}

impl Default for InMemoryGateway {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryGateway {
    /// Creates an empty gateway; ids are assigned from 1 upward.
    #[must_use]
    pub fn new() -> Self {
        Self {
            records: Mutex::new(HashMap::new()),
            next_id: AtomicU64::new(1),
            creates_fail: AtomicBool::new(false),
            updates_fail: AtomicBool::new(false),
            deletes_fail: AtomicBool::new(false),
            create_calls: AtomicUsize::new(0),
            update_calls: AtomicUsize::new(0),
            delete_calls: AtomicUsize::new(0),
        }
    }

    /// When `fail` is true, every subsequent create errors.
    pub fn fail_creates(&self, fail: bool) {
        self.creates_fail.store(fail, Ordering::SeqCst);
    }

    /// When `fail` is true, every subsequent update errors.
    pub fn fail_updates(&self, fail: bool) {
        self.updates_fail.store(fail, Ordering::SeqCst);
    }

    /// When `fail` is true, every subsequent delete errors.
    pub fn fail_deletes(&self, fail: bool) {
        self.deletes_fail.store(fail, Ordering::SeqCst);
    }

    /// Number of create calls received, including failed ones.
    #[must_use]
    pub fn create_calls(&self) -> usize {
        self.create_calls.load(Ordering::SeqCst)
    }

    /// Number of update calls received, including failed ones.
    #[must_use]
    pub fn update_calls(&self) -> usize {
        self.update_calls.load(Ordering::SeqCst)
    }

    /// Number of delete calls received, including failed ones.
    #[must_use]
    pub fn delete_calls(&self) -> usize {
        self.delete_calls.load(Ordering::SeqCst)
    }

    /// Total calls of any kind.
    #[must_use]
    pub fn total_calls(&self) -> usize {
        self.create_calls() + self.update_calls() + self.delete_calls()
    }

    /// Returns the stored record under `id`, if any.
    #[must_use]
    pub fn record(&self, id: u64) -> Option<RemoteTaskRecord> {
        self.records.lock().get(&id).cloned()
    }

    /// Number of records currently stored.
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.lock().len()
    }

    /// Whether the remote table is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.lock().is_empty()
    }
}

impl TaskGateway for InMemoryGateway {
    async fn create(&self, task: &NewRemoteTask) -> Result<RemoteTaskRecord, GatewayError> {
        self.create_calls.fetch_add(1, Ordering::SeqCst);
        if self.creates_fail.load(Ordering::SeqCst) {
            return Err(GatewayError::Transport("injected create failure".into()));
        }
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let record = RemoteTaskRecord {
            id,
            user_id: task.user_id,
            title: task.title.clone(),
            completed: task.completed,
        };
        self.records.lock().insert(id, record.clone());
        Ok(record)
    }

    async fn update(&self, id: u64, task: &NewRemoteTask) -> Result<RemoteTaskRecord, GatewayError> {
        self.update_calls.fetch_add(1, Ordering::SeqCst);
        if self.updates_fail.load(Ordering::SeqCst) {
            return Err(GatewayError::Transport("injected update failure".into()));
        }
        let mut records = self.records.lock();
        let Some(existing) = records.get_mut(&id) else {
            return Err(GatewayError::Status(404));
        };
        existing.title = task.title.clone();
        existing.completed = task.completed;
        existing.user_id = task.user_id;
        Ok(existing.clone())
    }

    async fn delete(&self, id: u64) -> Result<(), GatewayError> {
        self.delete_calls.fetch_add(1, Ordering::SeqCst);
        if self.deletes_fail.load(Ordering::SeqCst) {
            return Err(GatewayError::Transport("injected delete failure".into()));
        }
        if self.records.lock().remove(&id).is_none() {
            return Err(GatewayError::Status(404));
        }
        Ok(())
    }
}
