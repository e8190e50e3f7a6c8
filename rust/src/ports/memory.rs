//! In-memory store and notifier for tests and embedding.

use rustc_hash::FxHashMap;
use std::sync::{Arc, Mutex, RwLock};

use super::{Notifier, StoreError, StoreResult, TaskFilter, TaskStore};
use crate::models::{AttributePatch, Dependency, FindingPayload, ScoreRecord, Sprint, Task};

/// Thread-safe in-memory task store.
#[derive(Debug, Clone, Default)]
pub struct InMemoryTaskStore {
    state: Arc<RwLock<InMemoryState>>,
}

#[derive(Debug, Default)]
struct InMemoryState {
    tasks: Vec<Task>,
    dependencies: Vec<Dependency>,
    sprints: Vec<Sprint>,
    scores: FxHashMap<String, ScoreRecord>,
    unavailable: bool,
}

fn poisoned(err: impl std::fmt::Display) -> StoreError {
    StoreError::Unavailable(err.to_string())
}

impl InMemoryTaskStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed tasks, dependencies and sprints in one go.
    pub fn seeded(tasks: Vec<Task>, dependencies: Vec<Dependency>, sprints: Vec<Sprint>) -> Self {
        Self {
            state: Arc::new(RwLock::new(InMemoryState {
                tasks,
                dependencies,
                sprints,
                ..InMemoryState::default()
            })),
        }
    }

    /// Make every call fail with [`StoreError::Unavailable`] until reset.
    pub fn set_unavailable(&self, unavailable: bool) {
        if let Ok(mut state) = self.state.write() {
            state.unavailable = unavailable;
        }
    }

    /// The stored score record for a task, if any.
    pub fn score_of(&self, task_id: &str) -> Option<ScoreRecord> {
        self.state.read().ok()?.scores.get(task_id).cloned()
    }

    pub fn dependencies(&self) -> Vec<Dependency> {
        self.state
            .read()
            .map(|state| state.dependencies.clone())
            .unwrap_or_default()
    }

    fn read(&self) -> StoreResult<std::sync::RwLockReadGuard<'_, InMemoryState>> {
        let state = self.state.read().map_err(poisoned)?;
        if state.unavailable {
            return Err(StoreError::Unavailable("in-memory store offline".to_string()));
        }
        Ok(state)
    }

    fn write(&self) -> StoreResult<std::sync::RwLockWriteGuard<'_, InMemoryState>> {
        let state = self.state.write().map_err(poisoned)?;
        if state.unavailable {
            return Err(StoreError::Unavailable("in-memory store offline".to_string()));
        }
        Ok(state)
    }
}

impl InMemoryState {
    fn has_task(&self, tenant_id: &str, task_id: &str) -> bool {
        self.tasks
            .iter()
            .any(|t| t.tenant_id == tenant_id && t.id == task_id)
    }
}

impl TaskStore for InMemoryTaskStore {
    fn list_tasks(&self, tenant_id: &str, filter: &TaskFilter) -> StoreResult<Vec<Task>> {
        let state = self.read()?;
        Ok(state
            .tasks
            .iter()
            .filter(|t| t.tenant_id == tenant_id && filter.matches(t))
            .cloned()
            .collect())
    }

    fn list_dependencies(&self, tenant_id: &str, task_ids: &[String]) -> StoreResult<Vec<Dependency>> {
        let state = self.read()?;
        let touches = |id: &String| task_ids.contains(id) && state.has_task(tenant_id, id);
        Ok(state
            .dependencies
            .iter()
            .filter(|d| touches(&d.blocking_task_id) || touches(&d.blocked_task_id))
            .cloned()
            .collect())
    }

    fn insert_dependency(&self, tenant_id: &str, dependency: &Dependency) -> StoreResult<()> {
        let mut state = self.write()?;
        for id in [&dependency.blocking_task_id, &dependency.blocked_task_id] {
            if !state.has_task(tenant_id, id) {
                return Err(StoreError::NotFound(format!("task {id}")));
            }
        }
        if state.dependencies.contains(dependency) {
            return Err(StoreError::Conflict(format!(
                "dependency {} -> {} already exists",
                dependency.blocking_task_id, dependency.blocked_task_id
            )));
        }
        state.dependencies.push(dependency.clone());
        Ok(())
    }

    fn update_task_attributes(
        &self,
        tenant_id: &str,
        task_id: &str,
        patch: &AttributePatch,
    ) -> StoreResult<()> {
        let mut state = self.write()?;
        if !state.has_task(tenant_id, task_id) {
            return Err(StoreError::NotFound(format!("task {task_id}")));
        }
        if let Some(record) = &patch.scoring {
            state.scores.insert(task_id.to_string(), record.clone());
        }
        Ok(())
    }

    fn list_sprints(&self, tenant_id: &str) -> StoreResult<Vec<Sprint>> {
        let state = self.read()?;
        Ok(state
            .sprints
            .iter()
            .filter(|s| s.tenant_id == tenant_id)
            .cloned()
            .collect())
    }
}

/// A notification captured by [`RecordingNotifier`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Notification {
    pub user_id: String,
    pub title: String,
    pub body: String,
    pub payload: FindingPayload,
}

/// Notifier that keeps every notification in memory.
#[derive(Debug, Clone, Default)]
pub struct RecordingNotifier {
    sent: Arc<Mutex<Vec<Notification>>>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sent(&self) -> Vec<Notification> {
        self.sent.lock().map(|sent| sent.clone()).unwrap_or_default()
    }
}

impl Notifier for RecordingNotifier {
    fn notify(&self, user_id: &str, title: &str, body: &str, payload: &FindingPayload) -> StoreResult<()> {
        let mut sent = self.sent.lock().map_err(poisoned)?;
        sent.push(Notification {
            user_id: user_id.to_string(),
            title: title.to_string(),
            body: body.to_string(),
            payload: payload.clone(),
        });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{SprintStatus, TaskStatus};
    use chrono::{NaiveDate, TimeZone, Utc};

    fn store() -> InMemoryTaskStore {
        InMemoryTaskStore::seeded(
            vec![
                Task::new("a", "t1", "A").in_sprint("s1"),
                Task::new("b", "t1", "B").with_status(TaskStatus::Cancelled),
                Task::new("c", "t2", "C"),
            ],
            vec![Dependency::blocks("a", "b")],
            vec![Sprint {
                id: "s1".to_string(),
                tenant_id: "t1".to_string(),
                name: "Sprint 1".to_string(),
                start_date: NaiveDate::from_ymd_opt(2025, 1, 6).unwrap(),
                end_date: NaiveDate::from_ymd_opt(2025, 1, 17).unwrap(),
                status: SprintStatus::Active,
            }],
        )
    }

    #[test]
    fn test_list_tasks_is_tenant_scoped() {
        let store = store();
        let all = store.list_tasks("t1", &TaskFilter::all()).unwrap();
        assert_eq!(all.len(), 2);

        let open = store
            .list_tasks("t1", &TaskFilter::all().excluding(TaskStatus::Cancelled))
            .unwrap();
        assert_eq!(open.len(), 1);

        let sprint = store.list_tasks("t1", &TaskFilter::all().in_sprint("s1")).unwrap();
        assert_eq!(sprint[0].id, "a");

        assert!(store.list_sprints("t2").unwrap().is_empty());
    }

    #[test]
    fn test_insert_dependency() {
        let store = store();
        let edge = Dependency::blocks("b", "a");
        store.insert_dependency("t1", &edge).unwrap();
        assert!(matches!(
            store.insert_dependency("t1", &edge),
            Err(StoreError::Conflict(_))
        ));
        assert!(matches!(
            store.insert_dependency("t1", &Dependency::blocks("a", "c")),
            Err(StoreError::NotFound(_))
        ));
        assert_eq!(store.dependencies().len(), 2);
    }

    #[test]
    fn test_score_write_is_idempotent() {
        let store = store();
        let patch = AttributePatch {
            scoring: Some(ScoreRecord {
                task_id: "a".to_string(),
                score: 42,
                computed_at: Utc.with_ymd_and_hms(2025, 1, 8, 9, 0, 0).unwrap(),
            }),
        };
        store.update_task_attributes("t1", "a", &patch).unwrap();
        store.update_task_attributes("t1", "a", &patch).unwrap();
        assert_eq!(store.score_of("a").unwrap().score, 42);
        assert!(matches!(
            store.update_task_attributes("t2", "a", &patch),
            Err(StoreError::NotFound(_))
        ));
    }

    #[test]
    fn test_unavailable_store() {
        let store = store();
        store.set_unavailable(true);
        assert!(matches!(
            store.list_tasks("t1", &TaskFilter::all()),
            Err(StoreError::Unavailable(_))
        ));
        store.set_unavailable(false);
        assert!(store.list_tasks("t1", &TaskFilter::all()).is_ok());
    }

    #[test]
    fn test_recording_notifier() {
        let notifier = RecordingNotifier::new();
        let payload = FindingPayload {
            kind: "delay_task".to_string(),
            task_ids: vec!["a".to_string()],
        };
        notifier.notify("u1", "title", "body", &payload).unwrap();
        assert_eq!(notifier.sent().len(), 1);
        assert_eq!(notifier.sent()[0].payload, payload);
    }
}
