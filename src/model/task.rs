use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use super::serde_utils::{null_as_default, timestamp_opt};
use super::{RepositoryId, TaskId};
use crate::error::ValidationError;

/// Maximum branch name length accepted by the task service.
pub const MAX_BRANCH_LEN: usize = 100;

/// Characters git refuses in branch names (subset enforced by the service).
const INVALID_BRANCH_CHARS: [char; 8] = [' ', '~', '^', ':', '?', '*', '[', '\\'];

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Task {
    pub id: TaskId,
    pub repository_id: RepositoryId,
    pub branch_name: String,
    pub instructions: String,
    pub status: TaskStatus,
    #[serde(default, alias = "output", deserialize_with = "null_as_default")]
    pub output_log: String,
    #[serde(default)]
    pub worktree_path: Option<String>,
    #[serde(default)]
    pub error_message: Option<String>,
    #[serde(default, with = "timestamp_opt")]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(default, with = "timestamp_opt")]
    pub completed_at: Option<DateTime<Utc>>,
    #[serde(default, with = "timestamp_opt")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, with = "timestamp_opt")]
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub repository: Option<RepositoryRef>,
}

impl Task {
    pub fn new(
        id: impl Into<TaskId>,
        repository_id: impl Into<RepositoryId>,
        branch_name: impl Into<String>,
        status: TaskStatus,
    ) -> Self {
        Self {
            id: id.into(),
            repository_id: repository_id.into(),
            branch_name: branch_name.into(),
            instructions: String::new(),
            status,
            output_log: String::new(),
            worktree_path: None,
            error_message: None,
            started_at: None,
            completed_at: None,
            created_at: None,
            updated_at: None,
            repository: None,
        }
    }

    pub fn with_instructions(mut self, instructions: impl Into<String>) -> Self {
        self.instructions = instructions.into();
        self
    }

    pub fn with_output(mut self, output: impl Into<String>) -> Self {
        self.output_log = output.into();
        self
    }

    /// Repository display name, falling back to the raw id.
    pub fn repository_name(&self) -> &str {
        self.repository
            .as_ref()
            .map(|r| r.name.as_str())
            .unwrap_or_else(|| self.repository_id.as_str())
    }

    pub fn allows(&self, action: TaskAction) -> bool {
        self.status.allows(action)
    }
}

/// Embedded `{id, name}` summary the service attaches to tasks.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RepositoryRef {
    pub id: RepositoryId,
    pub name: String,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "lowercase")]
pub enum TaskStatus {
    #[default]
    Pending,
    Running,
    Completed,
    Failed,
    Cancelled,
}

impl TaskStatus {
    pub const ALL: [TaskStatus; 5] = [
        TaskStatus::Pending,
        TaskStatus::Running,
        TaskStatus::Completed,
        TaskStatus::Failed,
        TaskStatus::Cancelled,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::Pending => "pending",
            TaskStatus::Running => "running",
            TaskStatus::Completed => "completed",
            TaskStatus::Failed => "failed",
            TaskStatus::Cancelled => "cancelled",
        }
    }

    /// Terminal states have no outgoing transitions.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            TaskStatus::Completed | TaskStatus::Failed | TaskStatus::Cancelled
        )
    }

    /// Whether the runner may legally move a task from `self` to `next`.
    /// Staying in the same state is always allowed.
    pub fn can_transition_to(&self, next: TaskStatus) -> bool {
        if *self == next {
            return true;
        }
        match self {
            TaskStatus::Pending => true,
            TaskStatus::Running => next.is_terminal(),
            TaskStatus::Completed | TaskStatus::Failed | TaskStatus::Cancelled => false,
        }
    }

    pub fn allows(&self, action: TaskAction) -> bool {
        match action {
            TaskAction::Cancel => matches!(self, TaskStatus::Pending | TaskStatus::Running),
            TaskAction::ViewLive => matches!(self, TaskStatus::Running),
            TaskAction::Delete => self.is_terminal(),
        }
    }

    /// Enabled actions in display order.
    pub fn enabled_actions(&self) -> Vec<TaskAction> {
        TaskAction::ALL
            .into_iter()
            .filter(|a| self.allows(*a))
            .collect()
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for TaskStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        TaskStatus::ALL
            .into_iter()
            .find(|status| status.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| format!("unknown task status: {s}"))
    }
}

/// User-facing controls gated by lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TaskAction {
    Cancel,
    Delete,
    ViewLive,
}

impl TaskAction {
    pub const ALL: [TaskAction; 3] = [TaskAction::Cancel, TaskAction::Delete, TaskAction::ViewLive];

    pub fn as_str(&self) -> &'static str {
        match self {
            TaskAction::Cancel => "cancel",
            TaskAction::Delete => "delete",
            TaskAction::ViewLive => "view-live",
        }
    }

    /// Check the action against `status`, producing the error shown to the user.
    pub fn check(&self, status: TaskStatus) -> Result<(), ValidationError> {
        if status.allows(*self) {
            Ok(())
        } else {
            Err(ValidationError::ActionNotOffered {
                action: self.as_str(),
                status: status.as_str(),
            })
        }
    }
}

/// Request body for `POST /tasks/`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NewTask {
    pub repository_id: RepositoryId,
    pub branch_name: String,
    pub instructions: String,
}

impl NewTask {
    /// Build a validated task request. Rules match the service's schema so
    /// bad input fails before a round trip.
    pub fn new(
        repository_id: RepositoryId,
        branch_name: impl Into<String>,
        instructions: impl Into<String>,
    ) -> Result<Self, ValidationError> {
        let branch_name = branch_name.into();
        let instructions = instructions.into();

        let len = branch_name.chars().count();
        if len == 0 || len > MAX_BRANCH_LEN {
            return Err(ValidationError::BranchLength {
                max: MAX_BRANCH_LEN,
            });
        }
        if let Some(c) = branch_name
            .chars()
            .find(|c| INVALID_BRANCH_CHARS.contains(c))
        {
            return Err(ValidationError::BranchChar(c));
        }
        if instructions.trim().is_empty() {
            return Err(ValidationError::EmptyInstructions);
        }

        Ok(Self {
            repository_id,
            branch_name,
            instructions,
        })
    }
}

/// Snapshot returned by `GET /tasks/{id}/output`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TaskOutput {
    pub task_id: TaskId,
    #[serde(default, deserialize_with = "null_as_default")]
    pub output: String,
    #[serde(default, with = "timestamp_opt")]
    pub timestamp: Option<DateTime<Utc>>,
}

/// Row returned by `GET /repositories/{id}/tasks`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TaskSummary {
    pub id: TaskId,
    pub branch_name: String,
    pub status: TaskStatus,
    #[serde(default, with = "timestamp_opt")]
    pub created_at: Option<DateTime<Utc>>,
}
