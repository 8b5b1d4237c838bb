//! HTTP surface of the task API: routing, JSON handlers, and server
//! startup.
//!
//! Routes:
//! - `GET /tasks` — list all records
//! - `POST /tasks` — create, responds `201` with the assigned id
//! - `GET /tasks/{id}` — fetch one record
//! - `PUT /tasks/{id}` — replace, `404` for unknown ids
//! - `DELETE /tasks/{id}` — remove, `204` on success, `404` for unknown ids

use std::net::SocketAddr;
use std::sync::Arc;

use axum::Json;
use axum::Router;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::get;
use tokio::task::JoinHandle;

use taskpad_model::remote::{NewRemoteTask, RemoteTaskRecord};

use crate::store::TaskTable;

/// Errors that can occur when starting the server.
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    /// Binding the listen address failed.
    #[error("failed to bind {addr}: {source}")]
    Bind {
        /// Address that was attempted.
        addr: String,
        /// Underlying I/O error.
        source: std::io::Error,
    },
}

/// Builds the API router over the given table.
pub fn router(state: Arc<TaskTable>) -> Router {
    Router::new()
        .route("/tasks", get(list_tasks).post(create_task))
        .route(
            "/tasks/{id}",
            get(get_task).put(update_task).delete(delete_task),
        )
        .with_state(state)
}

/// Binds `addr` (which may use port 0 for an ephemeral port) and serves
/// the API on a background task.
///
/// Returns the bound address and the server's join handle.
///
/// # Errors
///
/// Returns [`ServerError::Bind`] if the address cannot be bound.
pub async fn start_server(
    addr: &str,
    state: Arc<TaskTable>,
) -> Result<(SocketAddr, JoinHandle<()>), ServerError> {
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| ServerError::Bind {
            addr: addr.to_string(),
            source: e,
        })?;
    let bound = listener.local_addr().map_err(|e| ServerError::Bind {
        addr: addr.to_string(),
        source: e,
    })?;

    let app = router(state);
    let handle = tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app).await {
            tracing::error!(error = %e, "task api server failed");
        }
    });

    Ok((bound, handle))
}

async fn list_tasks(State(state): State<Arc<TaskTable>>) -> Json<Vec<RemoteTaskRecord>> {
    Json(state.list().await)
}

async fn create_task(
    State(state): State<Arc<TaskTable>>,
    Json(payload): Json<NewRemoteTask>,
) -> (StatusCode, Json<RemoteTaskRecord>) {
    let record = state.insert(payload).await;
    tracing::info!(id = record.id, title = %record.title, "task created");
    (StatusCode::CREATED, Json(record))
}

async fn get_task(
    State(state): State<Arc<TaskTable>>,
    Path(id): Path<u64>,
) -> Result<Json<RemoteTaskRecord>, StatusCode> {
    state.get(id).await.map(Json).ok_or(StatusCode::NOT_FOUND)
}

async fn update_task(
    State(state): State<Arc<TaskTable>>,
    Path(id): Path<u64>,
    Json(payload): Json<NewRemoteTask>,
) -> Result<Json<RemoteTaskRecord>, StatusCode> {
    match state.update(id, payload).await {
        Some(record) => {
            tracing::info!(id, "task updated");
            Ok(Json(record))
        }
        None => Err(StatusCode::NOT_FOUND),
    }
}

async fn delete_task(State(state): State<Arc<TaskTable>>, Path(id): Path<u64>) -> StatusCode {
    if state.remove(id).await {
        tracing::info!(id, "task deleted");
        StatusCode::NO_CONTENT
    } else {
        StatusCode::NOT_FOUND
    }
}
