//! Upstream project/task collaborator.
//!
//! The bot never caches upstream state: every reminder or digest firing goes
//! back to Vikunja through this trait.

use async_trait::async_trait;
use serde::Serialize;

use crate::error::Result;
use crate::types::{Project, Task};

/// Partial task update; `None` fields are left untouched upstream.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TaskPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub done: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub priority: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
}

#[async_trait]
pub trait TaskApi: Send + Sync {
    /// `Ok(None)` when the project does not exist (or is no longer visible).
    async fn get_project(&self, id: i64) -> Result<Option<Project>>;

    async fn get_project_tasks(&self, project_id: i64) -> Result<Vec<Task>>;

    /// `Ok(None)` when the task does not exist (or is no longer visible).
    async fn get_task(&self, id: i64) -> Result<Option<Task>>;

    async fn update_task(&self, id: i64, patch: &TaskPatch) -> Result<Task>;

    async fn assign_task(&self, id: i64, user_id: i64) -> Result<()>;
}
