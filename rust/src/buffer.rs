//! Buffer time and deadline risk estimation.
//!
//! The buffer absorbs historical estimation variance:
//! `ceil(estimated × (variance_ratio − 1) × multiplier)` hours, never negative.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::config::{AnalysisConfig, BufferConfig};
use crate::models::{EstimateHistory, Finding, FindingPayload, Task};

const SECONDS_PER_DAY: f64 = 86_400.0;

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BufferEstimate {
    pub task_id: String,
    pub title: String,
    pub estimated_hours: f64,
    pub variance_ratio: f64,
    pub recommended_buffer_hours: i64,
    pub recommended_buffer_days: i64,
    /// `None` when the task has no due date.
    pub days_until_deadline: Option<i64>,
    pub risk_level: RiskLevel,
    /// Incomplete predecessors.
    pub open_blockers: usize,
    /// Ids of incomplete predecessors already past their own due date.
    pub overdue_blockers: Vec<String>,
    pub suggestions: Vec<String>,
}

impl BufferEstimate {
    pub fn is_overdue(&self) -> bool {
        self.days_until_deadline.is_some_and(|days| days < 0)
    }

    pub fn is_blocked(&self) -> bool {
        self.open_blockers > 0
    }

    /// A notification-worthy finding when the deadline is at high risk.
    pub fn finding(&self) -> Option<Finding> {
        (self.risk_level == RiskLevel::High).then(|| Finding {
            title: format!("'{}' is at risk of missing its deadline", self.title),
            body: self.suggestions.join(" "),
            payload: FindingPayload {
                kind: "buffer_risk".to_string(),
                task_ids: vec![self.task_id.clone()],
            },
        })
    }
}

/// Recommended buffer hours for an estimate and a variance ratio.
///
/// Non-decreasing in `variance_ratio` for a fixed estimate; zero effort or a
/// ratio at or below 1.0 yields 0.
pub fn buffer_hours(estimated_hours: f64, variance_ratio: f64, multiplier: f64) -> i64 {
    let raw = (estimated_hours * (variance_ratio - 1.0) * multiplier).ceil();
    if raw.is_finite() && raw > 0.0 {
        raw as i64
    } else {
        0
    }
}

/// Whole days until `due`, rounded up; negative once overdue.
pub fn days_until(due: DateTime<Utc>, now: DateTime<Utc>) -> i64 {
    let seconds = (due - now).num_seconds() as f64;
    (seconds / SECONDS_PER_DAY).ceil() as i64
}

/// Estimate the buffer and risk for one task.
///
/// `predecessors` are the tasks blocking this one; completed ones are ignored.
/// `history` supplies the variance ratio when available.
pub fn estimate_buffer(
    task: &Task,
    predecessors: &[&Task],
    history: Option<&EstimateHistory>,
    now: DateTime<Utc>,
    analysis: &AnalysisConfig,
    config: &BufferConfig,
) -> BufferEstimate {
    let estimated_hours = task.effort_hours(analysis).max(0.0);
    let variance_ratio = history
        .and_then(EstimateHistory::variance_ratio)
        .unwrap_or(config.default_variance_ratio);

    let recommended_buffer_hours =
        buffer_hours(estimated_hours, variance_ratio, config.buffer_multiplier);
    let recommended_buffer_days = if analysis.hours_per_day > 0.0 {
        (recommended_buffer_hours as f64 / analysis.hours_per_day).ceil() as i64
    } else {
        0
    };

    let days_until_deadline = task.due_date.map(|due| days_until(due, now));

    let open: Vec<&&Task> = predecessors.iter().filter(|p| !p.is_completed()).collect();
    let mut overdue_blockers: Vec<String> = open
        .iter()
        .filter(|p| p.due_date.is_some_and(|due| due < now))
        .map(|p| p.id.clone())
        .collect();
    overdue_blockers.sort();

    let risk_level = match days_until_deadline {
        Some(days) if days < recommended_buffer_days => RiskLevel::High,
        _ if !overdue_blockers.is_empty() => RiskLevel::Medium,
        _ => RiskLevel::Low,
    };

    let suggestions = suggestions(
        risk_level,
        recommended_buffer_hours,
        recommended_buffer_days,
        days_until_deadline,
        &overdue_blockers,
    );

    BufferEstimate {
        task_id: task.id.clone(),
        title: task.title.clone(),
        estimated_hours,
        variance_ratio,
        recommended_buffer_hours,
        recommended_buffer_days,
        days_until_deadline,
        risk_level,
        open_blockers: open.len(),
        overdue_blockers,
        suggestions,
    }
}

fn suggestions(
    risk: RiskLevel,
    buffer_hours: i64,
    buffer_days: i64,
    days_until_deadline: Option<i64>,
    overdue_blockers: &[String],
) -> Vec<String> {
    let mut out = Vec::new();
    match risk {
        RiskLevel::High => {
            let shortfall = buffer_days - days_until_deadline.unwrap_or(0);
            out.push(format!(
                "Deadline leaves less than the recommended buffer; extend it by at least {shortfall} day(s) or reduce scope."
            ));
            if days_until_deadline.is_some_and(|d| d < 0) {
                out.push("Task is already overdue; agree a new date with stakeholders.".to_string());
            }
        }
        RiskLevel::Medium => {
            out.push(format!(
                "Follow up on overdue blocking task(s): {}.",
                overdue_blockers.join(", ")
            ));
        }
        RiskLevel::Low => {}
    }
    if buffer_hours > 0 {
        out.push(format!(
            "Reserve {buffer_hours} hour(s) ({buffer_days} day(s)) of buffer for estimation variance."
        ));
    } else {
        out.push("Estimates have been reliable; no extra buffer needed.".to_string());
    }
    if days_until_deadline.is_none() {
        out.push("Set a due date to enable deadline risk tracking.".to_string());
    }
    out
}

#[derive(Clone, Debug, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BufferSummary {
    pub high_risk: usize,
    pub medium_risk: usize,
    pub low_risk: usize,
    /// Tasks already past their due date.
    pub overdue: usize,
    /// Tasks with at least one incomplete predecessor.
    pub blocked: usize,
    /// Mean recommended buffer in hours, rounded.
    pub average_buffer: i64,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BufferReport {
    pub tasks: Vec<BufferEstimate>,
    pub summary: BufferSummary,
}

impl BufferReport {
    /// Order estimates by descending risk, then id, and compute the summary.
    pub fn from_estimates(mut tasks: Vec<BufferEstimate>) -> Self {
        tasks.sort_by(|a, b| {
            b.risk_level
                .cmp(&a.risk_level)
                .then_with(|| a.task_id.cmp(&b.task_id))
        });
        let count = |level: RiskLevel| tasks.iter().filter(|t| t.risk_level == level).count();
        let average_buffer = if tasks.is_empty() {
            0
        } else {
            let total: i64 = tasks.iter().map(|t| t.recommended_buffer_hours).sum();
            (total as f64 / tasks.len() as f64).round() as i64
        };
        let summary = BufferSummary {
            high_risk: count(RiskLevel::High),
            medium_risk: count(RiskLevel::Medium),
            low_risk: count(RiskLevel::Low),
            overdue: tasks.iter().filter(|t| t.is_overdue()).count(),
            blocked: tasks.iter().filter(|t| t.is_blocked()).count(),
            average_buffer,
        };
        Self { tasks, summary }
    }
}
