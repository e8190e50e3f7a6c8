//! Boundaries to the task store and the notification dispatcher.
//!
//! The engine reads tenant-scoped snapshots through [`TaskStore`] and writes back
//! only two things: new dependency edges and the smart priority score. Both
//! writes are idempotent per key.

mod memory;

pub use memory::{InMemoryTaskStore, Notification, RecordingNotifier};

use thiserror::Error;

use crate::models::{AttributePatch, Dependency, FindingPayload, Sprint, Task, TaskStatus};

pub type StoreResult<T> = Result<T, StoreError>;

/// Errors returned by store and notifier implementations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// The backing service cannot be reached; the request may be retried.
    #[error("store unavailable: {0}")]
    Unavailable(String),

    #[error("record not found: {0}")]
    NotFound(String),

    /// The write conflicts with an existing record.
    #[error("conflict: {0}")]
    Conflict(String),
}

/// Selection applied by [`TaskStore::list_tasks`] within one tenant.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TaskFilter {
    pub exclude_statuses: Vec<TaskStatus>,
    pub sprint_id: Option<String>,
    pub task_ids: Option<Vec<String>>,
}

impl TaskFilter {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn excluding(mut self, status: TaskStatus) -> Self {
        self.exclude_statuses.push(status);
        self
    }

    pub fn in_sprint(mut self, sprint_id: impl Into<String>) -> Self {
        self.sprint_id = Some(sprint_id.into());
        self
    }

    pub fn with_ids(mut self, ids: Vec<String>) -> Self {
        self.task_ids = Some(ids);
        self
    }

    pub fn matches(&self, task: &Task) -> bool {
        !self.exclude_statuses.contains(&task.status)
            && self
                .sprint_id
                .as_ref()
                .map_or(true, |sprint| task.sprint_id.as_ref() == Some(sprint))
            && self
                .task_ids
                .as_ref()
                .map_or(true, |ids| ids.iter().any(|id| *id == task.id))
    }
}

/// Read and write access to tenant-scoped task data.
pub trait TaskStore: Send + Sync {
    /// Tasks of `tenant_id` matching `filter`.
    fn list_tasks(&self, tenant_id: &str, filter: &TaskFilter) -> StoreResult<Vec<Task>>;

    /// Every dependency edge with at least one endpoint in `task_ids`.
    fn list_dependencies(&self, tenant_id: &str, task_ids: &[String]) -> StoreResult<Vec<Dependency>>;

    /// Persist a validated edge.
    ///
    /// # Errors
    /// Returns [`StoreError::Conflict`] if the same edge already exists.
    fn insert_dependency(&self, tenant_id: &str, dependency: &Dependency) -> StoreResult<()>;

    /// Apply a typed attribute patch. Re-applying the same patch is a no-op.
    ///
    /// # Errors
    /// Returns [`StoreError::NotFound`] if the task is not in the tenant.
    fn update_task_attributes(
        &self,
        tenant_id: &str,
        task_id: &str,
        patch: &AttributePatch,
    ) -> StoreResult<()>;

    fn list_sprints(&self, tenant_id: &str) -> StoreResult<Vec<Sprint>>;
}

/// Outbound notification dispatcher.
pub trait Notifier: Send + Sync {
    fn notify(&self, user_id: &str, title: &str, body: &str, payload: &FindingPayload) -> StoreResult<()>;
}
