//! HTTP implementation of the remote task gateway.
//!
//! Speaks the task API's JSON dialect: `POST /tasks`, `PUT /tasks/{id}`,
//! `DELETE /tasks/{id}` relative to the configured base URL.

use std::time::Duration;

use url::Url;

use taskpad_model::remote::{NewRemoteTask, RemoteTaskRecord};

use super::{GatewayError, TaskGateway};

/// [`TaskGateway`] backed by a [`reqwest::Client`].
#[derive(Debug, Clone)]
pub struct HttpGateway {
    http: reqwest::Client,
    base: Url,
}

impl HttpGateway {
    /// Builds a gateway against `base` with the given per-request timeout.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::Transport`] if the HTTP client cannot be
    /// constructed.
    pub fn new(base: Url, timeout: Duration) -> Result<Self, GatewayError> {
        let http = reqwest::Client::builder()
            .user_agent("taskpad/0.1")
            .timeout(timeout)
            .build()
            .map_err(|e| GatewayError::Transport(e.to_string()))?;
        Ok(Self { http, base })
    }

    fn collection_url(&self) -> Result<Url, GatewayError> {
        self.base
            .join("tasks")
            .map_err(|e| GatewayError::Transport(e.to_string()))
    }

    fn record_url(&self, id: u64) -> Result<Url, GatewayError> {
        self.base
            .join(&format!("tasks/{id}"))
            .map_err(|e| GatewayError::Transport(e.to_string()))
    }

    async fn decode_record(response: reqwest::Response) -> Result<RemoteTaskRecord, GatewayError> {
        response
            .json()
            .await
            .map_err(|e| GatewayError::Decode(e.to_string()))
    }

    fn check_status(response: &reqwest::Response) -> Result<(), GatewayError> {
        let status = response.status();
        if status.is_success() {
            Ok(())
        } else {
            Err(GatewayError::Status(status.as_u16()))
        }
    }
}

impl TaskGateway for HttpGateway {
    async fn create(&self, task: &NewRemoteTask) -> Result<RemoteTaskRecord, GatewayError> {
        let response = self
            .http
            .post(self.collection_url()?)
            .json(task)
            .send()
            .await
            .map_err(|e| GatewayError::Transport(e.to_string()))?;
        Self::check_status(&response)?;
        Self::decode_record(response).await
    }

    async fn update(&self, id: u64, task: &NewRemoteTask) -> Result<RemoteTaskRecord, GatewayError> {
        let response = self
            .http
            .put(self.record_url(id)?)
            .json(task)
            .send()
            .await
            .map_err(|e| GatewayError::Transport(e.to_string()))?;
        Self::check_status(&response)?;
        Self::decode_record(response).await
    }

    async fn delete(&self, id: u64) -> Result<(), GatewayError> {
        let response = self
            .http
            .delete(self.record_url(id)?)
            .send()
            .await
            .map_err(|e| GatewayError::Transport(e.to_string()))?;
        Self::check_status(&response)
    }
}
