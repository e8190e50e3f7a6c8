//! What-if simulation over a computed critical path.
//!
//! A scenario never touches the store: it reads the snapshot captured in a
//! [`CriticalPathResult`] and reports the projected impact of a hypothetical
//! change. Project delay follows one rule for every scenario type: it equals the
//! scenario's delay only when the targeted task is critical, otherwise slack
//! absorbs it and the delay is zero.
//!
//! [`CriticalPathResult`]: crate::critical_path::CriticalPathResult

mod simulation;

pub use simulation::simulate;

use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;

use crate::buffer::RiskLevel;
use crate::models::{Finding, FindingPayload, TaskPriority};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ScenarioKind {
    DelayTask,
    AddResource,
    ChangePriority,
    RemoveDependency,
    ExtendDeadline,
}

impl ScenarioKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::DelayTask => "delay_task",
            Self::AddResource => "add_resource",
            Self::ChangePriority => "change_priority",
            Self::RemoveDependency => "remove_dependency",
            Self::ExtendDeadline => "extend_deadline",
        }
    }
}

/// A hypothetical change to evaluate.
#[derive(Clone, Debug, PartialEq)]
pub enum Scenario {
    DelayTask {
        task_id: String,
        delay_days: i64,
    },
    /// Scale the working capacity by `multiplier` (>= 1), for one task or, when
    /// `task_id` is `None`, for the whole critical path.
    AddResource {
        task_id: Option<String>,
        multiplier: f64,
    },
    ChangePriority {
        task_id: String,
        new_priority: TaskPriority,
    },
    RemoveDependency {
        blocked_task_id: String,
        blocking_task_id: String,
    },
    ExtendDeadline {
        task_id: String,
        new_deadline: DateTime<Utc>,
    },
}

impl Scenario {
    pub fn kind(&self) -> ScenarioKind {
        match self {
            Self::DelayTask { .. } => ScenarioKind::DelayTask,
            Self::AddResource { .. } => ScenarioKind::AddResource,
            Self::ChangePriority { .. } => ScenarioKind::ChangePriority,
            Self::RemoveDependency { .. } => ScenarioKind::RemoveDependency,
            Self::ExtendDeadline { .. } => ScenarioKind::ExtendDeadline,
        }
    }
}

/// The schedule the scenario was evaluated against.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CurrentState {
    pub project_duration: i64,
    /// Number of tasks on the critical path.
    pub critical_path_length: usize,
    /// Duration of one start-to-end critical chain.
    pub critical_path_duration: i64,
}

/// Scenario-specific figures.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ScenarioDetail {
    #[serde(rename_all = "camelCase")]
    Delay {
        delay_days: i64,
        slack_days: i64,
        /// Part of the delay absorbed by slack.
        absorbed_days: i64,
    },
    #[serde(rename_all = "camelCase")]
    Resource { multiplier: f64, time_saved_days: i64 },
    #[serde(rename_all = "camelCase")]
    Priority {
        previous: Option<TaskPriority>,
        new: TaskPriority,
    },
    #[serde(rename_all = "camelCase")]
    Dependency {
        blocking_task_id: String,
        blocked_task_id: String,
        days_gained: i64,
    },
    #[serde(rename_all = "camelCase")]
    Deadline {
        previous_due: Option<DateTime<Utc>>,
        new_deadline: DateTime<Utc>,
        extension_days: Option<i64>,
        projected_finish: NaiveDate,
        margin_days: i64,
    },
}

/// Projected, non-mutating impact of a scenario.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScenarioImpact {
    pub scenario_type: ScenarioKind,
    pub affected_task_ids: Vec<String>,
    /// Whether the targeted task(s) lie on the critical path.
    pub on_critical_path: bool,
    pub project_delay_days: i64,
    pub projected_duration: i64,
    pub current_state: CurrentState,
    pub risk_level: RiskLevel,
    pub recommendation: String,
    pub detail: ScenarioDetail,
}

impl ScenarioImpact {
    /// A notification-worthy finding, for high-risk outcomes only.
    pub fn finding(&self) -> Option<Finding> {
        (self.risk_level == RiskLevel::High).then(|| Finding {
            title: format!("What-if {} puts the schedule at risk", self.scenario_type.as_str()),
            body: self.recommendation.clone(),
            payload: FindingPayload {
                kind: self.scenario_type.as_str().to_string(),
                task_ids: self.affected_task_ids.clone(),
            },
        })
    }
}
