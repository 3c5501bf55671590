use serde::{Deserialize, Serialize};

use super::RepositoryId;

/// Repository as listed by the task service. Read-only here.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Repository {
    pub id: RepositoryId,
    pub name: String,
    pub path: String,
    #[serde(default = "default_branch")]
    pub default_branch: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default = "default_active")]
    pub is_active: bool,
    #[serde(default)]
    pub task_count: Option<u32>,
    #[serde(default)]
    pub active_task_count: Option<u32>,
}

fn default_branch() -> String {
    "main".to_string()
}

fn default_active() -> bool {
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn repository_defaults_when_fields_missing() {
        let repo: Repository =
            serde_json::from_str(r#"{"id":"r1","name":"api","path":"/src/api"}"#).unwrap();
        assert_eq!(repo.default_branch, "main");
        assert!(repo.is_active);
        assert!(repo.task_count.is_none());
    }
}
