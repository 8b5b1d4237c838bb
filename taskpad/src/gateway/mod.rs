//! Remote task gateway abstraction.
//!
//! Defines the [`TaskGateway`] trait the reconciliation engine drives.
//! Concrete implementations:
//! - [`http::HttpGateway`] — reqwest client against the configured base URL
//! - [`memory::InMemoryGateway`] — in-process double with failure injection
//!   and call counters, for tests
//!
//! The remote collection is keyed by numeric id; local [`TaskId`]s never
//! cross this boundary.
//!
//! [`TaskId`]: taskpad_model::task::TaskId

pub mod http;
pub mod memory;

use taskpad_model::remote::{NewRemoteTask, RemoteTaskRecord};

/// Errors that can occur during remote gateway operations.
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    /// The request never produced a response (DNS, refused, timeout).
    #[error("remote transport error: {0}")]
    Transport(String),

    /// The remote answered with a non-success HTTP status.
    #[error("remote returned status {0}")]
    Status(u16),

    /// The response body could not be decoded.
    #[error("invalid response body: {0}")]
    Decode(String),
}

/// Async create/update/delete operations against the remote task
/// collection.
pub trait TaskGateway: Send + Sync {
    /// Creates a record remotely; the response carries the assigned
    /// numeric id.
    fn create(
        &self,
        task: &NewRemoteTask,
    ) -> impl std::future::Future<Output = Result<RemoteTaskRecord, GatewayError>> + Send;

    /// Replaces the record stored under `id`.
    fn update(
        &self,
        id: u64,
        task: &NewRemoteTask,
    ) -> impl std::future::Future<Output = Result<RemoteTaskRecord, GatewayError>> + Send;

    /// Deletes the record stored under `id`.
    fn delete(&self, id: u64)
    -> impl std::future::Future<Output = Result<(), GatewayError>> + Send;
}
