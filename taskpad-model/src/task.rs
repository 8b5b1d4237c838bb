//! The task model: identifiers, the synchronizable [`Task`] record,
//! entry validation, and deletion tombstones.
//!
//! Persisted JSON uses camelCase field names so that snapshots written by
//! earlier builds of the app remain readable.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Minimum allowed task title length in characters.
pub const MIN_TITLE_LENGTH: usize = 3;

/// Maximum allowed task title length in characters.
pub const MAX_TITLE_LENGTH: usize = 100;

/// Maximum allowed task description length in characters.
pub const MAX_DESCRIPTION_LENGTH: usize = 500;

/// Unique identifier for a task, based on UUID v7 for time-ordering.
///
/// Local ids are authoritative for the task's whole lifetime: the numeric id
/// a remote store assigns on create is recorded separately in
/// [`Task::remote_id`] and never replaces this one.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TaskId(Uuid);

impl TaskId {
    /// Creates a new time-ordered task identifier (UUID v7).
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }

    /// Creates a `TaskId` from an existing UUID.
    #[must_use]
    pub const fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Returns the inner UUID value.
    #[must_use]
    pub const fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for TaskId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for TaskId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for TaskId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

/// Errors produced by entry validation of titles and descriptions.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ValidationError {
    /// Task title is shorter than [`MIN_TITLE_LENGTH`] characters.
    #[error("task title must be at least {MIN_TITLE_LENGTH} characters")]
    TitleTooShort,
    /// Task title exceeds [`MAX_TITLE_LENGTH`] characters.
    #[error("task title too long (max {MAX_TITLE_LENGTH} characters)")]
    TitleTooLong,
    /// Task description exceeds [`MAX_DESCRIPTION_LENGTH`] characters.
    #[error("task description too long (max {MAX_DESCRIPTION_LENGTH} characters)")]
    DescriptionTooLong,
}

/// Validates a task title against the entry length bounds.
///
/// # Errors
///
/// Returns [`ValidationError::TitleTooShort`] or
/// [`ValidationError::TitleTooLong`] when out of bounds. Length is counted
/// in characters, not bytes.
pub fn validate_title(title: &str) -> Result<(), ValidationError> {
    let len = title.chars().count();
    if len < MIN_TITLE_LENGTH {
        return Err(ValidationError::TitleTooShort);
    }
    if len > MAX_TITLE_LENGTH {
        return Err(ValidationError::TitleTooLong);
    }
    Ok(())
}

/// Validates a task description against the entry length bound.
///
/// # Errors
///
/// Returns [`ValidationError::DescriptionTooLong`] when over the bound.
pub fn validate_description(description: &str) -> Result<(), ValidationError> {
    if description.chars().count() > MAX_DESCRIPTION_LENGTH {
        return Err(ValidationError::DescriptionTooLong);
    }
    Ok(())
}

/// The synchronizable unit: a locally-owned task plus its sync bookkeeping.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    /// Local identifier, never changes after creation.
    pub id: TaskId,
    /// Title, 3–100 characters (validated at entry).
    pub title: String,
    /// Description, up to 500 characters (validated at entry).
    pub description: String,
    /// Completion flag. Toggling is an ordinary mutation.
    pub completed: bool,
    /// When the task was created.
    pub created_at: DateTime<Utc>,
    /// Refreshed on every mutation.
    pub updated_at: DateTime<Utc>,
    /// True iff the task's current local state is mirrored remotely.
    pub synced: bool,
    /// True iff the task was created offline and has never been created
    /// remotely.
    pub local_only: bool,
    /// Numeric id assigned by the remote store on first create. Used to
    /// address subsequent update/delete calls; the local [`TaskId`] stays
    /// authoritative.
    #[serde(default)]
    pub remote_id: Option<u64>,
    /// Consecutive failed propagation attempts; zeroed on success and on
    /// any local mutation.
    #[serde(default)]
    pub sync_attempts: u32,
}

impl Task {
    /// Builds a fresh task from validated entry fields.
    ///
    /// The task starts uncompleted and dirty (`synced = false`);
    /// `local_only` reflects connectivity at creation time.
    #[must_use]
    pub fn new(title: String, description: String, local_only: bool) -> Self {
        let now = Utc::now();
        Self {
            id: TaskId::new(),
            title,
            description,
            completed: false,
            created_at: now,
            updated_at: now,
            synced: false,
            local_only,
            remote_id: None,
            sync_attempts: 0,
        }
    }

    /// Applies a partial update, refreshing `updated_at` and dirtying the
    /// task. Applying a patch whose values equal the current ones still
    /// dirties the task.
    pub fn apply(&mut self, patch: &TaskPatch) {
        if let Some(title) = &patch.title {
            self.title = title.clone();
        }
        if let Some(description) = &patch.description {
            self.description = description.clone();
        }
        if let Some(completed) = patch.completed {
            self.completed = completed;
        }
        self.updated_at = Utc::now();
        self.synced = false;
        self.sync_attempts = 0;
    }

    /// Marks the task as mirrored remotely, recording the remote id when
    /// one was assigned.
    pub fn mark_synced(&mut self, remote_id: Option<u64>) {
        self.synced = true;
        self.local_only = false;
        if remote_id.is_some() {
            self.remote_id = remote_id;
        }
        self.sync_attempts = 0;
    }
}

/// Entry fields for creating a task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskDraft {
    /// Title, validated against the 3–100 character bounds.
    pub title: String,
    /// Description, validated against the 500 character bound.
    pub description: String,
}

impl TaskDraft {
    /// Validates both entry fields.
    ///
    /// # Errors
    ///
    /// Returns the first [`ValidationError`] encountered.
    pub fn validate(&self) -> Result<(), ValidationError> {
        validate_title(&self.title)?;
        validate_description(&self.description)
    }
}

/// A partial update to an existing task. Absent fields are left unchanged.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskPatch {
    /// New title, if changing.
    pub title: Option<String>,
    /// New description, if changing.
    pub description: Option<String>,
    /// New completion state, if changing.
    pub completed: Option<bool>,
}

impl TaskPatch {
    /// Validates whichever entry fields are present.
    ///
    /// # Errors
    ///
    /// Returns the first [`ValidationError`] encountered.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if let Some(title) = &self.title {
            validate_title(title)?;
        }
        if let Some(description) = &self.description {
            validate_description(description)?;
        }
        Ok(())
    }
}

/// Durable marker for a task deleted locally but not yet confirmed deleted
/// remotely.
///
/// Carries the remote numeric id so the deletion phase can address the
/// remote record; a tombstone with no remote id has nothing to delete
/// remotely and is discarded on the next pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Tombstone {
    /// Local id of the deleted task.
    pub id: TaskId,
    /// Remote id the task carried at deletion time, if any.
    #[serde(default)]
    pub remote_id: Option<u64>,
}
