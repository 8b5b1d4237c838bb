//! Shared data model for `Taskpad` — tasks, tombstones, remote records,
//! and the JSON codec for persisted blobs.

pub mod codec;
pub mod remote;
pub mod task;
