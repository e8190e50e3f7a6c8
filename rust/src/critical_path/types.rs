//! Types for critical path analysis.

use serde::Serialize;

use crate::models::Task;

/// Per-task timing information, in whole days from project start.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskTiming {
    /// Earliest possible start time (from forward pass).
    pub earliest_start: i64,
    /// Earliest possible finish time (from forward pass).
    pub earliest_finish: i64,
    /// Latest allowable start time (from backward pass).
    pub latest_start: i64,
    /// Latest allowable finish time (from backward pass).
    pub latest_finish: i64,
    /// Slack = latest_start - earliest_start.
    pub slack: i64,
}

impl TaskTiming {
    pub fn is_critical(&self) -> bool {
        self.slack == 0
    }
}

/// A task of the snapshot together with its computed schedule.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduledTask {
    pub task: Task,
    pub duration_days: i64,
    pub timing: TaskTiming,
    /// Ids of the tasks blocking this one.
    pub dependencies: Vec<String>,
    /// Ids of the tasks this one blocks.
    pub dependents: Vec<String>,
}

impl ScheduledTask {
    pub fn id(&self) -> &str {
        &self.task.id
    }

    pub fn is_critical(&self) -> bool {
        self.timing.is_critical()
    }
}

/// Result of a critical path computation over one snapshot.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CriticalPathResult {
    /// Max earliest finish over all tasks.
    pub project_duration: i64,
    /// Zero-slack tasks ordered by earliest start, then id.
    pub critical_path: Vec<ScheduledTask>,
    /// Remaining tasks ordered by descending slack, then id.
    pub non_critical: Vec<ScheduledTask>,
}

impl CriticalPathResult {
    pub fn len(&self) -> usize {
        self.critical_path.len() + self.non_critical.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn tasks(&self) -> impl Iterator<Item = &ScheduledTask> {
        self.critical_path.iter().chain(self.non_critical.iter())
    }

    pub fn get(&self, task_id: &str) -> Option<&ScheduledTask> {
        self.tasks().find(|t| t.id() == task_id)
    }

    pub fn is_critical(&self, task_id: &str) -> bool {
        self.critical_path.iter().any(|t| t.id() == task_id)
    }

    pub fn critical_path_ids(&self) -> Vec<String> {
        self.critical_path.iter().map(|t| t.id().to_string()).collect()
    }

    /// One zero-slack chain from project start to project end.
    ///
    /// Each step follows the first critical dependent that starts when the
    /// current task finishes. Parallel critical branches contribute only the
    /// branch with the lowest ids.
    pub fn critical_chain(&self) -> Vec<&ScheduledTask> {
        let mut chain = Vec::new();
        let mut current = self
            .critical_path
            .iter()
            .find(|t| t.timing.earliest_start == 0);
        while let Some(task) = current {
            chain.push(task);
            current = task
                .dependents
                .iter()
                .filter_map(|id| self.critical_path.iter().find(|t| t.id() == id))
                .find(|next| next.timing.earliest_start == task.timing.earliest_finish);
        }
        chain
    }

    /// Total duration of [`Self::critical_chain`]; equals the project duration
    /// whenever the snapshot is non-empty.
    pub fn critical_path_duration(&self) -> i64 {
        self.critical_chain().iter().map(|t| t.duration_days).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_task_timing_critical() {
        let timing = TaskTiming {
            earliest_start: 0,
            earliest_finish: 5,
            latest_start: 0,
            latest_finish: 5,
            slack: 0,
        };
        assert!(timing.is_critical());

        let timing_with_slack = TaskTiming {
            latest_start: 2,
            latest_finish: 7,
            slack: 2,
            ..timing
        };
        assert!(!timing_with_slack.is_critical());
    }

    #[test]
    fn test_empty_result() {
        let result = CriticalPathResult::default();
        assert!(result.is_empty());
        assert_eq!(result.critical_path_duration(), 0);
        assert!(result.get("a").is_none());
    }

    fn scheduled(id: &str, duration: i64, es: i64, dependents: &[&str]) -> ScheduledTask {
        ScheduledTask {
            task: Task::new(id, "t", id),
            duration_days: duration,
            timing: TaskTiming {
                earliest_start: es,
                earliest_finish: es + duration,
                latest_start: es,
                latest_finish: es + duration,
                slack: 0,
            },
            dependencies: Vec::new(),
            dependents: dependents.iter().map(|d| d.to_string()).collect(),
        }
    }

    #[test]
    fn test_parallel_critical_branches_count_once() {
        // a(2) -> c(3) and b(2) -> c(3): both a and b are critical
        let result = CriticalPathResult {
            project_duration: 5,
            critical_path: vec![
                scheduled("a", 2, 0, &["c"]),
                scheduled("b", 2, 0, &["c"]),
                scheduled("c", 3, 2, &[]),
            ],
            non_critical: Vec::new(),
        };
        let chain: Vec<&str> = result.critical_chain().iter().map(|t| t.id()).collect();
        assert_eq!(chain, vec!["a", "c"]);
        assert_eq!(result.critical_path_duration(), 5);
    }

    #[test]
    fn test_independent_critical_tasks() {
        let result = CriticalPathResult {
            project_duration: 5,
            critical_path: vec![scheduled("a", 5, 0, &[]), scheduled("b", 5, 0, &[])],
            non_critical: Vec::new(),
        };
        assert_eq!(result.critical_path_duration(), result.project_duration);
    }
}
