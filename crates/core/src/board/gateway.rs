//! Transport used by the board to reach the task store

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

use crate::envelope::ApiResponse;
use crate::task::{Task, TaskId, TaskRepository, TaskUpdate};
use crate::{Error, Result};

/// Operations the board needs from the store
#[async_trait]
pub trait TaskGateway: Send + Sync + 'static {
    /// Every task, as the store currently sees it
    async fn fetch_tasks(&self) -> Result<Vec<Task>>;

    /// Apply a partial update and return the stored task
    async fn update_task(&self, id: TaskId, update: TaskUpdate) -> Result<Task>;
}

/// In-process gateway that calls a repository directly
pub struct RepositoryGateway {
    repository: Arc<dyn TaskRepository>,
}

impl RepositoryGateway {
    pub fn new(repository: Arc<dyn TaskRepository>) -> Self {
        Self { repository }
    }
}

#[async_trait]
impl TaskGateway for RepositoryGateway {
    async fn fetch_tasks(&self) -> Result<Vec<Task>> {
        self.repository.list().await
    }

    async fn update_task(&self, id: TaskId, update: TaskUpdate) -> Result<Task> {
        self.repository.update(id, update).await
    }
}

/// Gateway speaking the REST API of the server
pub struct HttpTaskGateway {
    client: Client,
    base_url: String,
}

impl HttpTaskGateway {
    /// `base_url` is the API root, e.g. `http://localhost:8081/api`
    pub fn new(base_url: impl Into<String>) -> Result<Self> {
        let client = Client::builder().timeout(Duration::from_secs(30)).build()?;
        Ok(Self::with_client(client, base_url))
    }

    pub fn with_client(client: Client, base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self { client, base_url }
    }

    /// Send a request, retrying once if it never got a response.
    ///
    /// Only idempotent field assignments go through here, so a duplicate
    /// delivery after an ambiguous timeout is harmless.
    async fn send(&self, request: RequestBuilder) -> Result<Response> {
        let retry = request.try_clone();
        match request.send().await {
            Ok(response) => Ok(response),
            Err(err) => match retry {
                Some(retry) => {
                    warn!("Request failed ({}), retrying once", err);
                    Ok(retry.send().await?)
                }
                None => Err(err.into()),
            },
        }
    }

    /// Unwrap the `{success, data, error}` envelope
    async fn read_envelope<T: DeserializeOwned>(response: Response) -> Result<T> {
        let status = response.status();
        let body = response.text().await?;

        match serde_json::from_str::<ApiResponse<T>>(&body) {
            Ok(ApiResponse {
                success: true,
                data: Some(data),
                ..
            }) if status.is_success() => Ok(data),
            Ok(envelope) => Err(Error::Rejected {
                status: status.as_u16(),
                message: envelope
                    .error
                    .unwrap_or_else(|| "request failed".to_string()),
            }),
            Err(_) if !status.is_success() => Err(Error::Rejected {
                status: status.as_u16(),
                message: body,
            }),
            Err(e) => Err(Error::Transport(format!("Malformed response body: {}", e))),
        }
    }
}

#[async_trait]
impl TaskGateway for HttpTaskGateway {
    async fn fetch_tasks(&self) -> Result<Vec<Task>> {
        let url = format!("{}/tasks", self.base_url);
        debug!("GET {}", url);
        let response = self.send(self.client.get(&url)).await?;
        Self::read_envelope(response).await
    }

    async fn update_task(&self, id: TaskId, update: TaskUpdate) -> Result<Task> {
        let url = format!("{}/tasks/{}", self.base_url, id);
        debug!("PUT {}", url);
        let response = self.send(self.client.put(&url).json(&update)).await?;
        Self::read_envelope(response).await
    }
}
