//! Core data types for the planning engine.
//!
//! Tasks and dependencies are read-only snapshots handed over by the store; the
//! engine never mutates them.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::config::AnalysisConfig;
use crate::error::{PlanningError, Result};

/// Longest schedulable task: one hundred years of working days.
pub const MAX_DURATION_DAYS: i64 = 36_500;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TaskStatus {
    Todo,
    InProgress,
    InReview,
    Blocked,
    Completed,
    Cancelled,
}

impl TaskStatus {
    /// Open tasks still carry remaining work.
    pub fn is_open(self) -> bool {
        !matches!(self, Self::Completed | Self::Cancelled)
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.to_ascii_uppercase().as_str() {
            "TODO" => Some(Self::Todo),
            "IN_PROGRESS" => Some(Self::InProgress),
            "IN_REVIEW" => Some(Self::InReview),
            "BLOCKED" => Some(Self::Blocked),
            "COMPLETED" => Some(Self::Completed),
            "CANCELLED" => Some(Self::Cancelled),
            _ => None,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TaskPriority {
    Low,
    Medium,
    High,
    Urgent,
}

impl TaskPriority {
    pub fn parse(value: &str) -> Option<Self> {
        match value.to_ascii_uppercase().as_str() {
            "LOW" => Some(Self::Low),
            "MEDIUM" => Some(Self::Medium),
            "HIGH" => Some(Self::High),
            "URGENT" => Some(Self::Urgent),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Low => "LOW",
            Self::Medium => "MEDIUM",
            Self::High => "HIGH",
            Self::Urgent => "URGENT",
        }
    }
}

/// A task as read from the store.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub id: String,
    pub tenant_id: String,
    pub title: String,
    pub status: TaskStatus,
    /// `None` when the stored priority is not one of the known levels.
    pub priority: Option<TaskPriority>,
    pub due_date: Option<DateTime<Utc>>,
    pub start_date: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub estimated_hours: Option<f64>,
    pub actual_hours: Option<f64>,
    pub story_points: Option<u32>,
    pub sprint_id: Option<String>,
    pub assignee_id: Option<String>,
}

impl Task {
    pub fn new(id: impl Into<String>, tenant_id: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            tenant_id: tenant_id.into(),
            title: title.into(),
            status: TaskStatus::Todo,
            priority: Some(TaskPriority::Medium),
            due_date: None,
            start_date: None,
            completed_at: None,
            estimated_hours: None,
            actual_hours: None,
            story_points: None,
            sprint_id: None,
            assignee_id: None,
        }
    }

    pub fn with_status(mut self, status: TaskStatus) -> Self {
        self.status = status;
        self
    }

    pub fn with_priority(mut self, priority: TaskPriority) -> Self {
        self.priority = Some(priority);
        self
    }

    pub fn with_estimate(mut self, hours: f64) -> Self {
        self.estimated_hours = Some(hours);
        self
    }

    pub fn with_due_date(mut self, due: DateTime<Utc>) -> Self {
        self.due_date = Some(due);
        self
    }

    pub fn with_story_points(mut self, points: u32) -> Self {
        self.story_points = Some(points);
        self
    }

    /// Mark the task completed at `at`.
    pub fn completed(mut self, at: DateTime<Utc>) -> Self {
        self.status = TaskStatus::Completed;
        self.completed_at = Some(at);
        self
    }

    pub fn in_sprint(mut self, sprint_id: impl Into<String>) -> Self {
        self.sprint_id = Some(sprint_id.into());
        self
    }

    /// Hours used for scheduling: the estimate, or the configured default.
    pub fn effort_hours(&self, config: &AnalysisConfig) -> f64 {
        self.estimated_hours.unwrap_or(config.default_estimate_hours)
    }

    /// Schedule duration in whole days: `ceil(hours / hours_per_day)`.
    pub fn duration_days(&self, config: &AnalysisConfig) -> Result<i64> {
        let hours = self.effort_hours(config);
        if !hours.is_finite() || hours < 0.0 {
            return Err(PlanningError::invalid(format!(
                "task {} has an invalid estimate of {} hours",
                self.id, hours
            )));
        }
        if config.hours_per_day <= 0.0 {
            return Err(PlanningError::invalid("hours_per_day must be positive"));
        }
        let days = (hours / config.hours_per_day).ceil();
        if days > MAX_DURATION_DAYS as f64 {
            return Err(PlanningError::invalid(format!(
                "task {} needs {} days, above the limit of {} days",
                self.id, days, MAX_DURATION_DAYS
            )));
        }
        Ok(days as i64)
    }

    pub fn is_completed(&self) -> bool {
        self.status == TaskStatus::Completed
    }

    /// Completion date, only for tasks that are both COMPLETED and timestamped.
    pub fn completion_date(&self) -> Option<NaiveDate> {
        if self.is_completed() {
            self.completed_at.map(|at| at.date_naive())
        } else {
            None
        }
    }

    pub fn points(&self) -> u32 {
        self.story_points.unwrap_or(0)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DependencyKind {
    Blocks,
    Related,
    Duplicates,
}

/// A directed relation: `blocking_task_id` must finish before `blocked_task_id` starts.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Dependency {
    pub blocking_task_id: String,
    pub blocked_task_id: String,
    pub kind: DependencyKind,
}

impl Dependency {
    pub fn blocks(blocking: impl Into<String>, blocked: impl Into<String>) -> Self {
        Self {
            blocking_task_id: blocking.into(),
            blocked_task_id: blocked.into(),
            kind: DependencyKind::Blocks,
        }
    }

    pub fn is_scheduling(&self) -> bool {
        self.kind == DependencyKind::Blocks
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SprintStatus {
    Planned,
    Active,
    Completed,
    Cancelled,
}

/// A sprint window owned by its own store rather than encoded on tasks.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Sprint {
    pub id: String,
    pub tenant_id: String,
    pub name: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub status: SprintStatus,
}

/// The persisted result of "calculate and store" priority scoring.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoreRecord {
    pub task_id: String,
    pub score: u8,
    pub computed_at: DateTime<Utc>,
}

/// Typed attribute update for a task. Applying the same patch twice is a no-op.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttributePatch {
    pub scoring: Option<ScoreRecord>,
}

/// Aggregate estimated vs. actual hours from completed work.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct EstimateHistory {
    pub estimated_hours: f64,
    pub actual_hours: f64,
}

impl EstimateHistory {
    /// Sum the completed tasks that recorded both an estimate and actual hours.
    ///
    /// Returns `None` when no such task exists.
    pub fn from_tasks<'a>(tasks: impl IntoIterator<Item = &'a Task>) -> Option<Self> {
        let mut history = Self::default();
        let mut samples = 0usize;
        for task in tasks {
            if !task.is_completed() {
                continue;
            }
            if let (Some(estimated), Some(actual)) = (task.estimated_hours, task.actual_hours) {
                if estimated > 0.0 && actual >= 0.0 {
                    history.estimated_hours += estimated;
                    history.actual_hours += actual;
                    samples += 1;
                }
            }
        }
        (samples > 0).then_some(history)
    }

    /// `actual / estimated`, or `None` for an empty history.
    pub fn variance_ratio(&self) -> Option<f64> {
        (self.estimated_hours > 0.0).then(|| self.actual_hours / self.estimated_hours)
    }
}

/// Structured data attached to a notification.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FindingPayload {
    pub kind: String,
    pub task_ids: Vec<String>,
}

/// An actionable result the caller may forward to the notification dispatcher.
///
/// The engine only produces findings; deciding whether to notify is the caller's job.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Finding {
    pub title: String,
    pub body: String,
    pub payload: FindingPayload,
}
