#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use devbud_tui::api::{TaskApi, TaskFilter};
use devbud_tui::config::Settings;
use devbud_tui::error::ApiError;
use devbud_tui::model::{
    NewTask, Repository, RepositoryId, Task, TaskAction, TaskId, TaskOutput, TaskStatus,
    TaskSummary,
};
use devbud_tui::stream::{MemoryConnector, SessionDeps};
use parking_lot::Mutex;

pub const RECONNECT: Duration = Duration::from_millis(5_000);

/// In-memory task service with the real service's lifecycle rules.
#[derive(Default)]
pub struct FakeApi {
    tasks: Mutex<HashMap<TaskId, Task>>,
    output_failure: Mutex<Option<ApiError>>,
    pub output_calls: AtomicUsize,
    pub cancel_calls: AtomicUsize,
    pub delete_calls: AtomicUsize,
}

impl FakeApi {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn insert(&self, task: Task) {
        self.tasks.lock().insert(task.id.clone(), task);
    }

    pub fn set_status(&self, id: &str, status: TaskStatus) {
        if let Some(task) = self.tasks.lock().get_mut(&TaskId::new(id)) {
            task.status = status;
        }
    }

    pub fn fail_output(&self, error: ApiError) {
        *self.output_failure.lock() = Some(error);
    }

    pub fn contains(&self, id: &str) -> bool {
        self.tasks.lock().contains_key(&TaskId::new(id))
    }

    fn find(&self, id: &TaskId) -> Result<Task, ApiError> {
        self.tasks
            .lock()
            .get(id)
            .cloned()
            .ok_or_else(|| ApiError::new("Task not found").with_status(404))
    }
}

#[async_trait]
impl TaskApi for FakeApi {
    async fn list_tasks(&self, filter: &TaskFilter) -> Result<Vec<Task>, ApiError> {
        Ok(self
            .tasks
            .lock()
            .values()
            .filter(|t| filter.status.is_none_or(|s| t.status == s))
            .cloned()
            .collect())
    }

    async fn get_task(&self, id: &TaskId) -> Result<Task, ApiError> {
        self.find(id)
    }

    async fn create_task(&self, new_task: &NewTask) -> Result<Task, ApiError> {
        let id = format!("task-{}", self.tasks.lock().len() + 1);
        let task = Task::new(
            id.as_str(),
            new_task.repository_id.clone(),
            new_task.branch_name.clone(),
            TaskStatus::Pending,
        )
        .with_instructions(new_task.instructions.clone());
        self.insert(task.clone());
        Ok(task)
    }

    async fn cancel_task(&self, id: &TaskId) -> Result<String, ApiError> {
        self.cancel_calls.fetch_add(1, Ordering::SeqCst);
        let task = self.find(id)?;
        if !task.allows(TaskAction::Cancel) {
            return Err(
                ApiError::new(format!("Cannot cancel task in {} status", task.status))
                    .with_status(400),
            );
        }
        self.set_status(id.as_str(), TaskStatus::Cancelled);
        Ok("Task cancelled successfully".to_string())
    }

    async fn delete_task(&self, id: &TaskId) -> Result<(), ApiError> {
        self.delete_calls.fetch_add(1, Ordering::SeqCst);
        let task = self.find(id)?;
        if !task.allows(TaskAction::Delete) {
            return Err(ApiError::new(format!(
                "Cannot delete task in {} status. Cancel it first.",
                task.status
            ))
            .with_status(400));
        }
        self.tasks.lock().remove(id);
        Ok(())
    }

    async fn task_output(&self, id: &TaskId) -> Result<TaskOutput, ApiError> {
        self.output_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(error) = self.output_failure.lock().clone() {
            return Err(error);
        }
        let task = self.find(id)?;
        Ok(TaskOutput {
            task_id: task.id,
            output: task.output_log,
            timestamp: None,
        })
    }

    async fn list_repositories(&self) -> Result<Vec<Repository>, ApiError> {
        Ok(Vec::new())
    }

    async fn repository_tasks(&self, _id: &RepositoryId) -> Result<Vec<TaskSummary>, ApiError> {
        Ok(Vec::new())
    }

    async fn health(&self) -> Result<String, ApiError> {
        Ok("healthy".to_string())
    }
}

pub fn running_task(id: &str, output: &str) -> Task {
    Task::new(id, "repo-1", "feature/live", TaskStatus::Running)
        .with_instructions("Stream some output")
        .with_output(output)
}

pub fn deps(api: &Arc<FakeApi>, connector: &MemoryConnector) -> SessionDeps {
    SessionDeps {
        api: api.clone(),
        connector: Arc::new(connector.clone()),
        settings: Settings::default()
            .with_ws_url("ws://devbud.test")
            .with_reconnect_interval(RECONNECT),
    }
}
