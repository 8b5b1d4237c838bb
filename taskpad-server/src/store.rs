//! In-memory task table with numeric id assignment.
//!
//! Thread-safe via [`RwLock`]; ids are assigned from an atomic counter so
//! concurrent creates never collide.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use tokio::sync::RwLock;

use taskpad_model::remote::{NewRemoteTask, RemoteTaskRecord};

/// In-memory table of remote task records keyed by numeric id.
#[derive(Debug, Default)]
pub struct TaskTable {
    records: RwLock<HashMap<u64, RemoteTaskRecord>>,
    next_id: AtomicU64,
}

impl TaskTable {
    /// Creates an empty table; ids are assigned from 1 upward.
    #[must_use]
    pub fn new() -> Self {
        Self {
            records: RwLock::new(HashMap::new()),
            next_id: AtomicU64::new(1),
        }
    }

    /// Inserts a new record, assigning it the next id.
    pub async fn insert(&self, payload: NewRemoteTask) -> RemoteTaskRecord {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let record = RemoteTaskRecord {
            id,
            user_id: payload.user_id,
            title: payload.title,
            completed: payload.completed,
        };
        self.records.write().await.insert(id, record.clone());
        record
    }

    /// Replaces the record under `id`, returning the new state, or `None`
    /// if no such record exists.
    pub async fn update(&self, id: u64, payload: NewRemoteTask) -> Option<RemoteTaskRecord> {
        let mut records = self.records.write().await;
        let record = records.get_mut(&id)?;
        record.title = payload.title;
        record.completed = payload.completed;
        record.user_id = payload.user_id;
        Some(record.clone())
    }

    /// Removes the record under `id`; returns whether it existed.
    pub async fn remove(&self, id: u64) -> bool {
        self.records.write().await.remove(&id).is_some()
    }

    /// Returns the record under `id`, if any.
    pub async fn get(&self, id: u64) -> Option<RemoteTaskRecord> {
        self.records.read().await.get(&id).cloned()
    }

    /// Returns all records sorted by id.
    pub async fn list(&self) -> Vec<RemoteTaskRecord> {
        let records = self.records.read().await;
        let mut all: Vec<RemoteTaskRecord> = records.values().cloned().collect();
        all.sort_by_key(|r| r.id);
        all
    }

    /// Number of records currently stored.
    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    /// Whether the table is empty.
    pub async fn is_empty(&self) -> bool {
        self.records.read().await.is_empty()
    }
}
