//! Record types for the remote task API.
//!
//! The remote collection is keyed by numeric id and carries only a subset of
//! the local task fields (no description, no timestamps); propagation sends
//! the projection built by [`NewRemoteTask::from_task`].

use serde::{Deserialize, Serialize};

use crate::task::Task;

/// Fixed user id sent with every outbound record.
///
/// The remote collection is multi-tenant by user id; this client always
/// writes as user 1.
pub const DEFAULT_USER_ID: u64 = 1;

/// A task record as stored by the remote API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteTaskRecord {
    /// Remote-assigned numeric id.
    pub id: u64,
    /// Owning user id.
    pub user_id: u64,
    /// Task title.
    pub title: String,
    /// Completion flag.
    pub completed: bool,
}

/// Outbound payload for remote create and update calls.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewRemoteTask {
    /// Task title.
    pub title: String,
    /// Completion flag.
    pub completed: bool,
    /// Owning user id (always [`DEFAULT_USER_ID`]).
    pub user_id: u64,
}

impl NewRemoteTask {
    /// Projects a local task onto the remote record shape.
    #[must_use]
    pub fn from_task(task: &Task) -> Self {
        Self {
            title: task.title.clone(),
            completed: task.completed,
            user_id: DEFAULT_USER_ID,
        }
    }
}
