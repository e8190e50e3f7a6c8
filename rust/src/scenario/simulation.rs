//! Scenario evaluation against a critical path snapshot.

use chrono::{DateTime, Duration, Utc};
use rustc_hash::{FxHashMap, FxHashSet};

use crate::buffer::RiskLevel;
use crate::cancellation::Cancellation;
use crate::config::AnalysisConfig;
use crate::critical_path::{calculate_critical_path, CriticalPathResult, ScheduledTask};
use crate::error::{PlanningError, Result};
use crate::graph::TaskGraph;
use crate::log_checks;
use crate::models::{Dependency, Task, TaskPriority};

use super::{CurrentState, Scenario, ScenarioDetail, ScenarioImpact};

/// Margin (days) under which a critical task's deadline is considered tight.
const TIGHT_MARGIN_DAYS: i64 = 2;

/// Evaluate `scenario` against `result` without mutating anything.
///
/// `now` anchors day offsets to calendar dates for deadline scenarios.
///
/// # Errors
/// * `NotFound` if the targeted task or dependency edge is not in the snapshot
/// * `InvalidArgument` for malformed parameters (non-positive delay, multiplier
///   below 1, a deadline earlier than the current one) or a projection outside
///   the representable day range
/// * `ComputationTimeout` if `cancel` fires while re-scheduling
pub fn simulate(
    result: &CriticalPathResult,
    scenario: &Scenario,
    now: DateTime<Utc>,
    config: &AnalysisConfig,
    cancel: &Cancellation,
) -> Result<ScenarioImpact> {
    let snapshot = Snapshot::new(result);
    log_checks!(
        config.verbosity,
        "simulating {} against {} tasks",
        scenario.kind().as_str(),
        result.len()
    );
    match scenario {
        Scenario::DelayTask {
            task_id,
            delay_days,
        } => delay_task(&snapshot, task_id, *delay_days),
        Scenario::AddResource {
            task_id,
            multiplier,
        } => add_resource(&snapshot, task_id.as_deref(), *multiplier, config, cancel),
        Scenario::ChangePriority {
            task_id,
            new_priority,
        } => change_priority(&snapshot, task_id, *new_priority),
        Scenario::RemoveDependency {
            blocked_task_id,
            blocking_task_id,
        } => remove_dependency(&snapshot, blocked_task_id, blocking_task_id, config, cancel),
        Scenario::ExtendDeadline {
            task_id,
            new_deadline,
        } => extend_deadline(&snapshot, task_id, *new_deadline, now),
    }
}

/// Id lookup over a critical path result.
struct Snapshot<'a> {
    result: &'a CriticalPathResult,
    by_id: FxHashMap<&'a str, &'a ScheduledTask>,
}

impl<'a> Snapshot<'a> {
    fn new(result: &'a CriticalPathResult) -> Self {
        let by_id = result.tasks().map(|t| (t.id(), t)).collect();
        Self { result, by_id }
    }

    fn task(&self, task_id: &str) -> Result<&'a ScheduledTask> {
        self.by_id
            .get(task_id)
            .copied()
            .ok_or_else(|| PlanningError::not_found(format!("task {task_id}")))
    }

    fn current_state(&self) -> CurrentState {
        CurrentState {
            project_duration: self.result.project_duration,
            critical_path_length: self.result.critical_path.len(),
            critical_path_duration: self.result.critical_path_duration(),
        }
    }

    /// The snapshot's graph with its scheduled durations, without the
    /// `removed` (blocking, blocked) edge.
    fn graph(&self, config: &AnalysisConfig, removed: Option<(&str, &str)>) -> Result<TaskGraph> {
        let tasks: Vec<Task> = self.result.tasks().map(|t| t.task.clone()).collect();
        let edges: Vec<Dependency> = self
            .result
            .tasks()
            .flat_map(|t| {
                t.dependencies
                    .iter()
                    .filter(move |d| removed != Some((d.as_str(), t.id())))
                    .map(move |d| Dependency::blocks(d.clone(), t.id()))
            })
            .collect();
        let mut graph = TaskGraph::topology(&tasks, &edges, config);
        for task in self.result.tasks() {
            graph.set_duration(task.id(), task.duration_days)?;
        }
        Ok(graph)
    }

    /// `start` followed by every task downstream of it, sorted.
    fn affected_from(&self, start: &'a ScheduledTask) -> Vec<String> {
        let mut seen: FxHashSet<&str> = FxHashSet::default();
        let mut stack: Vec<&str> = start.dependents.iter().map(String::as_str).collect();
        while let Some(id) = stack.pop() {
            if !seen.insert(id) {
                continue;
            }
            if let Some(task) = self.by_id.get(id) {
                stack.extend(task.dependents.iter().map(String::as_str));
            }
        }
        let mut downstream: Vec<String> = seen.into_iter().map(str::to_string).collect();
        downstream.sort();
        let mut affected = vec![start.id().to_string()];
        affected.extend(downstream);
        affected
    }
}

fn delay_task(snapshot: &Snapshot<'_>, task_id: &str, delay_days: i64) -> Result<ScenarioImpact> {
    if delay_days <= 0 {
        return Err(PlanningError::invalid(format!(
            "delay must be a positive number of days, got {delay_days}"
        )));
    }
    let target = snapshot.task(task_id)?;
    let critical = target.is_critical();
    let slack = target.timing.slack;
    let title = &target.task.title;

    let project_delay_days = if critical { delay_days } else { 0 };
    let projected_duration = snapshot
        .result
        .project_duration
        .checked_add(project_delay_days)
        .ok_or_else(|| PlanningError::invalid(format!("delay of {delay_days} days is out of range")))?;
    let absorbed_days = if critical { 0 } else { delay_days.min(slack) };

    let (risk_level, recommendation) = if critical {
        (
            RiskLevel::High,
            format!(
                "'{title}' is on the critical path; a {delay_days}-day delay moves the project end by {delay_days} day(s). Add resources or re-sequence its dependents."
            ),
        )
    } else if delay_days > slack {
        (
            RiskLevel::Medium,
            format!(
                "'{title}' has {slack} day(s) of slack; a {delay_days}-day delay exceeds it, so its dependents need close follow-up."
            ),
        )
    } else {
        (
            RiskLevel::Low,
            format!("'{title}' has {slack} day(s) of slack; the {delay_days}-day delay is absorbed."),
        )
    };

    Ok(ScenarioImpact {
        scenario_type: super::ScenarioKind::DelayTask,
        affected_task_ids: snapshot.affected_from(target),
        on_critical_path: critical,
        project_delay_days,
        projected_duration,
        current_state: snapshot.current_state(),
        risk_level,
        recommendation,
        detail: ScenarioDetail::Delay {
            delay_days,
            slack_days: slack,
            absorbed_days,
        },
    })
}

/// Days saved by scaling `duration` with `multiplier`: `round(d × (1 − 1/m))`.
fn time_saved(duration: i64, multiplier: f64) -> i64 {
    (duration as f64 * (1.0 - 1.0 / multiplier)).round() as i64
}

fn add_resource(
    snapshot: &Snapshot<'_>,
    task_id: Option<&str>,
    multiplier: f64,
    config: &AnalysisConfig,
    cancel: &Cancellation,
) -> Result<ScenarioImpact> {
    if !multiplier.is_finite() || multiplier < 1.0 {
        return Err(PlanningError::invalid(format!(
            "resource multiplier must be at least 1, got {multiplier}"
        )));
    }
    let project_duration = snapshot.result.project_duration;

    let (affected_task_ids, on_critical_path, projected_duration, recommendation) = match task_id {
        Some(id) => {
            let target = snapshot.task(id)?;
            let title = &target.task.title;
            if target.is_critical() {
                // Parallel critical work may still hold the end date
                let task_saved = time_saved(target.duration_days, multiplier);
                let mut graph = snapshot.graph(config, None)?;
                graph.set_duration(id, target.duration_days - task_saved)?;
                let projected = calculate_critical_path(&graph, cancel)?.project_duration;
                let saved = project_duration - projected;
                let recommendation = if saved > 0 {
                    format!("Scaling capacity on critical task '{title}' by {multiplier}x saves about {saved} day(s).")
                } else {
                    format!(
                        "Scaling capacity on critical task '{title}' by {multiplier}x shortens it by {task_saved} day(s), but parallel critical work keeps the end date."
                    )
                };
                (vec![target.id().to_string()], true, projected, recommendation)
            } else {
                (
                    vec![target.id().to_string()],
                    false,
                    project_duration,
                    format!(
                        "'{title}' has {} day(s) of slack; extra resources there do not shorten the project.",
                        target.timing.slack
                    ),
                )
            }
        }
        None => {
            let saved = time_saved(snapshot.result.critical_path_duration(), multiplier);
            (
                snapshot.result.critical_path_ids(),
                !snapshot.result.critical_path.is_empty(),
                (project_duration - saved).max(0),
                format!(
                    "Scaling capacity on the critical path by {multiplier}x saves about {saved} day(s); prioritise the earliest critical tasks."
                ),
            )
        }
    };

    Ok(ScenarioImpact {
        scenario_type: super::ScenarioKind::AddResource,
        affected_task_ids,
        on_critical_path,
        project_delay_days: 0,
        projected_duration,
        current_state: snapshot.current_state(),
        risk_level: RiskLevel::Low,
        recommendation,
        detail: ScenarioDetail::Resource {
            multiplier,
            time_saved_days: project_duration - projected_duration,
        },
    })
}

fn change_priority(
    snapshot: &Snapshot<'_>,
    task_id: &str,
    new_priority: TaskPriority,
) -> Result<ScenarioImpact> {
    let target = snapshot.task(task_id)?;
    let previous = target.task.priority;
    let critical = target.is_critical();
    let title = &target.task.title;
    let lowered = previous.is_some_and(|p| new_priority < p);
    let level = new_priority.as_str();

    let (risk_level, recommendation) = match (critical, lowered) {
        (true, true) => (
            RiskLevel::Medium,
            format!("Lowering critical task '{title}' to {level} puts pressure on the project end date."),
        ),
        (true, false) => (
            RiskLevel::Low,
            format!("'{title}' is critical; {level} priority keeps attention on the end date."),
        ),
        (false, false) => (
            RiskLevel::Low,
            format!(
                "'{title}' has {} day(s) of slack; raising it to {level} will not shorten the project, critical tasks should come first.",
                target.timing.slack
            ),
        ),
        (false, true) => (
            RiskLevel::Low,
            format!("'{title}' has slack; moving it to {level} does not affect the end date."),
        ),
    };

    Ok(ScenarioImpact {
        scenario_type: super::ScenarioKind::ChangePriority,
        affected_task_ids: vec![target.id().to_string()],
        on_critical_path: critical,
        project_delay_days: 0,
        projected_duration: snapshot.result.project_duration,
        current_state: snapshot.current_state(),
        risk_level,
        recommendation,
        detail: ScenarioDetail::Priority {
            previous,
            new: new_priority,
        },
    })
}

fn remove_dependency(
    snapshot: &Snapshot<'_>,
    blocked_task_id: &str,
    blocking_task_id: &str,
    config: &AnalysisConfig,
    cancel: &Cancellation,
) -> Result<ScenarioImpact> {
    let blocked = snapshot.task(blocked_task_id)?;
    if !blocked.dependencies.iter().any(|d| d == blocking_task_id) {
        return Err(PlanningError::not_found(format!(
            "dependency {blocking_task_id} -> {blocked_task_id}"
        )));
    }

    // Re-schedule the same snapshot without the edge
    let graph = snapshot.graph(config, Some((blocking_task_id, blocked_task_id)))?;
    let projected = calculate_critical_path(&graph, cancel)?;
    let days_gained = snapshot.result.project_duration - projected.project_duration;

    let blocking_open = snapshot
        .by_id
        .get(blocking_task_id)
        .is_some_and(|t| t.task.status.is_open());

    let mut recommendation = if days_gained > 0 {
        format!(
            "Removing {blocking_task_id} -> {blocked_task_id} shortens the project by {days_gained} day(s)."
        )
    } else {
        format!("Removing {blocking_task_id} -> {blocked_task_id} does not change the project duration.")
    };
    if blocking_open {
        recommendation.push_str(&format!(
            " Confirm '{}' can start before '{}' is finished.",
            blocked.task.title,
            snapshot
                .by_id
                .get(blocking_task_id)
                .map(|t| t.task.title.as_str())
                .unwrap_or(blocking_task_id)
        ));
    }

    Ok(ScenarioImpact {
        scenario_type: super::ScenarioKind::RemoveDependency,
        affected_task_ids: snapshot.affected_from(blocked),
        on_critical_path: blocked.is_critical(),
        project_delay_days: 0,
        projected_duration: projected.project_duration,
        current_state: snapshot.current_state(),
        risk_level: if blocking_open {
            RiskLevel::Medium
        } else {
            RiskLevel::Low
        },
        recommendation,
        detail: ScenarioDetail::Dependency {
            blocking_task_id: blocking_task_id.to_string(),
            blocked_task_id: blocked_task_id.to_string(),
            days_gained,
        },
    })
}

fn extend_deadline(
    snapshot: &Snapshot<'_>,
    task_id: &str,
    new_deadline: DateTime<Utc>,
    now: DateTime<Utc>,
) -> Result<ScenarioImpact> {
    let target = snapshot.task(task_id)?;
    let previous_due = target.task.due_date;
    if let Some(previous) = previous_due {
        if new_deadline < previous {
            return Err(PlanningError::invalid(format!(
                "new deadline {new_deadline} is earlier than the current one {previous}"
            )));
        }
    }

    let critical = target.is_critical();
    let title = &target.task.title;
    let projected_finish = Duration::try_days(target.timing.earliest_finish)
        .and_then(|days| now.date_naive().checked_add_signed(days))
        .ok_or_else(|| {
            PlanningError::invalid(format!("projected finish of task {task_id} is past the supported calendar"))
        })?;
    let margin_days = (new_deadline.date_naive() - projected_finish).num_days();
    let extension_days = previous_due.map(|p| (new_deadline.date_naive() - p.date_naive()).num_days());

    let (risk_level, recommendation) = if margin_days < 0 {
        (
            RiskLevel::High,
            format!(
                "Even with the new deadline '{title}' is projected to finish {} day(s) late, on {projected_finish}.",
                -margin_days
            ),
        )
    } else if critical && margin_days < TIGHT_MARGIN_DAYS {
        (
            RiskLevel::Medium,
            format!("The new deadline leaves critical task '{title}' only {margin_days} day(s) of margin."),
        )
    } else {
        (
            RiskLevel::Low,
            format!("The new deadline leaves '{title}' {margin_days} day(s) of margin after {projected_finish}."),
        )
    };

    Ok(ScenarioImpact {
        scenario_type: super::ScenarioKind::ExtendDeadline,
        affected_task_ids: vec![target.id().to_string()],
        on_critical_path: critical,
        project_delay_days: 0,
        projected_duration: snapshot.result.project_duration,
        current_state: snapshot.current_state(),
        risk_level,
        recommendation,
        detail: ScenarioDetail::Deadline {
            previous_due,
            new_deadline,
            extension_days,
            projected_finish,
            margin_days,
        },
    })
}
