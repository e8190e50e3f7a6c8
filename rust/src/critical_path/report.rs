//! Summary statistics and recommendations for a critical path result.

use serde::Serialize;

use crate::config::AnalysisConfig;
use crate::models::TaskStatus;

use super::types::CriticalPathResult;

/// Slack (in days) at which a task is considered to have spare capacity.
const AMPLE_SLACK_DAYS: i64 = 5;

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CriticalPathSummary {
    pub total_tasks: usize,
    pub critical_tasks: usize,
    pub project_duration_days: i64,
    pub project_duration_hours: f64,
    /// Duration of one start-to-end critical chain.
    pub critical_path_duration: i64,
    /// Mean slack over all tasks, one decimal.
    pub average_slack_days: f64,
    /// Tasks nothing blocks.
    pub start_nodes: Vec<String>,
    /// Tasks that block nothing.
    pub end_nodes: Vec<String>,
    pub recommendations: Vec<String>,
}

/// Summarise a result. Recommendations are derived deterministically from the
/// schedule and the task states.
pub fn summarize(result: &CriticalPathResult, config: &AnalysisConfig) -> CriticalPathSummary {
    let total_tasks = result.len();
    let average_slack_days = if total_tasks == 0 {
        0.0
    } else {
        let total: i64 = result.tasks().map(|t| t.timing.slack).sum();
        (total as f64 / total_tasks as f64 * 10.0).round() / 10.0
    };

    let mut start_nodes: Vec<String> = result
        .tasks()
        .filter(|t| t.dependencies.is_empty())
        .map(|t| t.id().to_string())
        .collect();
    start_nodes.sort();
    let mut end_nodes: Vec<String> = result
        .tasks()
        .filter(|t| t.dependents.is_empty())
        .map(|t| t.id().to_string())
        .collect();
    end_nodes.sort();

    CriticalPathSummary {
        total_tasks,
        critical_tasks: result.critical_path.len(),
        project_duration_days: result.project_duration,
        project_duration_hours: result.project_duration as f64 * config.hours_per_day,
        critical_path_duration: result.critical_path_duration(),
        average_slack_days,
        start_nodes,
        end_nodes,
        recommendations: recommendations(result),
    }
}

fn recommendations(result: &CriticalPathResult) -> Vec<String> {
    let mut out = Vec::new();
    if result.is_empty() {
        out.push("No tasks to schedule.".to_string());
        return out;
    }

    for task in &result.critical_path {
        match task.task.status {
            TaskStatus::Blocked => out.push(format!(
                "Critical task '{}' is blocked; resolving it is the fastest way to protect the end date.",
                task.task.title
            )),
            TaskStatus::Todo if task.timing.earliest_start == 0 => out.push(format!(
                "Start critical task '{}' now; it has no slack.",
                task.task.title
            )),
            _ => {}
        }
        if task.task.status.is_open() && task.task.assignee_id.is_none() {
            out.push(format!("Assign an owner to critical task '{}'.", task.task.title));
        }
    }

    if result.critical_path.len() * 2 > result.len() && result.len() > 2 {
        out.push(
            "More than half of the tasks are critical; parallelise work or add resources to create slack."
                .to_string(),
        );
    }

    let ample = result
        .non_critical
        .iter()
        .filter(|t| t.timing.slack >= AMPLE_SLACK_DAYS)
        .count();
    if ample > 0 {
        out.push(format!(
            "{ample} task(s) have {AMPLE_SLACK_DAYS}+ days of slack; their owners can support the critical path."
        ));
    }

    if out.is_empty() {
        out.push("Schedule is healthy; keep critical tasks moving.".to_string());
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cancellation::Cancellation;
    use crate::critical_path::analyze_tasks;
    use crate::models::{Dependency, Task};

    fn analyze(tasks: &[Task], edges: &[(&str, &str)]) -> CriticalPathResult {
        let edges: Vec<Dependency> = edges.iter().map(|(a, b)| Dependency::blocks(*a, *b)).collect();
        analyze_tasks(tasks, &edges, &AnalysisConfig::default(), &Cancellation::none()).unwrap()
    }

    #[test]
    fn test_summary_counts() {
        let tasks = vec![
            Task::new("a", "t", "A").with_estimate(8.0),
            Task::new("b", "t", "B").with_estimate(24.0),
            Task::new("c", "t", "C").with_estimate(8.0),
        ];
        let result = analyze(&tasks, &[("a", "b"), ("a", "c")]);
        let summary = summarize(&result, &AnalysisConfig::default());

        assert_eq!(summary.total_tasks, 3);
        assert_eq!(summary.critical_tasks, 2);
        assert_eq!(summary.project_duration_days, 4);
        assert!((summary.project_duration_hours - 32.0).abs() < 1e-9);
        assert_eq!(summary.start_nodes, vec!["a"]);
        assert_eq!(summary.end_nodes, vec!["b", "c"]);
        // slack: a=0, b=0, c=2
        assert!((summary.average_slack_days - 0.7).abs() < 1e-9);
    }

    #[test]
    fn test_recommendations_flag_blocked_and_unassigned() {
        let mut blocked = Task::new("a", "t", "Design").with_status(TaskStatus::Blocked);
        blocked.assignee_id = Some("u1".to_string());
        let result = analyze(&[blocked], &[]);
        let summary = summarize(&result, &AnalysisConfig::default());
        assert!(summary.recommendations[0].contains("'Design' is blocked"));
        assert_eq!(summary.recommendations.len(), 1);

        let result = analyze(&[Task::new("b", "t", "Build")], &[]);
        let summary = summarize(&result, &AnalysisConfig::default());
        assert!(summary
            .recommendations
            .iter()
            .any(|r| r == "Assign an owner to critical task 'Build'."));
    }

    #[test]
    fn test_empty_summary() {
        let summary = summarize(&CriticalPathResult::default(), &AnalysisConfig::default());
        assert_eq!(summary.total_tasks, 0);
        assert_eq!(summary.average_slack_days, 0.0);
        assert_eq!(summary.recommendations, vec!["No tasks to schedule."]);
    }
}
