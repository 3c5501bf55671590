//! REST client for the task service.
//!
//! [`TaskApi`] is the seam the streaming layer and the viewer depend on;
//! [`ApiClient`] is the reqwest-backed implementation. Every failure is
//! normalized into [`ApiError`] with the service's `detail` text.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

use crate::config::Settings;
use crate::error::ApiError;
use crate::model::{
    NewTask, Repository, RepositoryId, Task, TaskId, TaskOutput, TaskStatus, TaskSummary,
};

pub const API_PREFIX: &str = "/api/v1";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Query for `GET /tasks/`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TaskFilter {
    pub repository_id: Option<RepositoryId>,
    pub status: Option<TaskStatus>,
}

impl TaskFilter {
    fn query(&self) -> Vec<(&'static str, String)> {
        let mut query = Vec::new();
        if let Some(repo) = &self.repository_id {
            query.push(("repository_id", repo.to_string()));
        }
        if let Some(status) = self.status {
            query.push(("status", status.as_str().to_string()));
        }
        query
    }
}

#[async_trait]
pub trait TaskApi: Send + Sync {
    async fn list_tasks(&self, filter: &TaskFilter) -> Result<Vec<Task>, ApiError>;
    async fn get_task(&self, id: &TaskId) -> Result<Task, ApiError>;
    async fn create_task(&self, new_task: &NewTask) -> Result<Task, ApiError>;
    /// Request cancellation. The returned message is informational; the
    /// task's status only changes once the service reports it.
    async fn cancel_task(&self, id: &TaskId) -> Result<String, ApiError>;
    async fn delete_task(&self, id: &TaskId) -> Result<(), ApiError>;
    async fn task_output(&self, id: &TaskId) -> Result<TaskOutput, ApiError>;
    async fn list_repositories(&self) -> Result<Vec<Repository>, ApiError>;
    async fn repository_tasks(&self, id: &RepositoryId) -> Result<Vec<TaskSummary>, ApiError>;
    async fn health(&self) -> Result<String, ApiError>;
}

#[derive(Deserialize)]
struct MessageBody {
    message: String,
}

#[derive(Deserialize)]
struct HealthBody {
    status: String,
}

#[derive(Debug, Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
    token: Option<String>,
}

impl ApiClient {
    pub fn new(settings: &Settings) -> Result<Self, ApiError> {
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()?;
        Ok(Self {
            http,
            base_url: settings.api_url.clone(),
            token: settings.api_token.clone(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{API_PREFIX}{path}", self.base_url)
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    async fn execute(&self, request: RequestBuilder) -> Result<Response, ApiError> {
        let response = self.authorize(request).send().await?;
        let status = response.status();
        debug!(url = %response.url(), status = status.as_u16(), "api response");
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        Err(error_from_body(status.as_u16(), &body))
    }

    async fn fetch<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T, ApiError> {
        let response = self.execute(request).await?;
        Ok(response.json::<T>().await?)
    }
}

/// Build an [`ApiError`] from a non-success response body.
///
/// Prefers the service's `detail` field (validation errors carry a list,
/// rendered as JSON), then the raw body, then a generic message.
pub fn error_from_body(status: u16, body: &str) -> ApiError {
    let detail = serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|value| value.get("detail").cloned())
        .map(|detail| match detail {
            Value::String(text) => text,
            other => other.to_string(),
        })
        .filter(|detail| !detail.is_empty())
        .or_else(|| {
            let trimmed = body.trim();
            (!trimmed.is_empty()).then(|| trimmed.to_string())
        })
        .unwrap_or_else(|| "An error occurred".to_string());

    ApiError::new(detail).with_status(status)
}

#[async_trait]
impl TaskApi for ApiClient {
    async fn list_tasks(&self, filter: &TaskFilter) -> Result<Vec<Task>, ApiError> {
        self.fetch(self.http.get(self.url("/tasks/")).query(&filter.query()))
            .await
    }

    async fn get_task(&self, id: &TaskId) -> Result<Task, ApiError> {
        self.fetch(self.http.get(self.url(&format!("/tasks/{id}"))))
            .await
    }

    async fn create_task(&self, new_task: &NewTask) -> Result<Task, ApiError> {
        self.fetch(self.http.post(self.url("/tasks/")).json(new_task))
            .await
    }

    async fn cancel_task(&self, id: &TaskId) -> Result<String, ApiError> {
        let body: MessageBody = self
            .fetch(self.http.post(self.url(&format!("/tasks/{id}/cancel"))))
            .await?;
        Ok(body.message)
    }

    async fn delete_task(&self, id: &TaskId) -> Result<(), ApiError> {
        self.execute(self.http.delete(self.url(&format!("/tasks/{id}"))))
            .await?;
        Ok(())
    }

    async fn task_output(&self, id: &TaskId) -> Result<TaskOutput, ApiError> {
        self.fetch(self.http.get(self.url(&format!("/tasks/{id}/output"))))
            .await
    }

    async fn list_repositories(&self) -> Result<Vec<Repository>, ApiError> {
        self.fetch(self.http.get(self.url("/repositories/"))).await
    }

    async fn repository_tasks(&self, id: &RepositoryId) -> Result<Vec<TaskSummary>, ApiError> {
        self.fetch(self.http.get(self.url(&format!("/repositories/{id}/tasks"))))
            .await
    }

    async fn health(&self) -> Result<String, ApiError> {
        // Served outside the versioned prefix
        let body: HealthBody = self
            .fetch(self.http.get(format!("{}/health", self.base_url)))
            .await?;
        Ok(body.status)
    }
}
