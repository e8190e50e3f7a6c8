//! Smart priority scoring.

use chrono::NaiveDate;
use serde::Serialize;

use crate::config::PriorityWeights;
use crate::models::Task;

pub const MIN_SCORE: i64 = 0;
pub const MAX_SCORE: i64 = 100;

/// Individual components of a score, before clamping.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoreBreakdown {
    pub urgency: i64,
    pub priority: i64,
    pub blocking: i64,
    pub blocked_penalty: i64,
    pub story_points: i64,
}

impl ScoreBreakdown {
    pub fn raw_total(&self) -> i64 {
        self.urgency + self.priority + self.blocking - self.blocked_penalty + self.story_points
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PriorityScore {
    pub task_id: String,
    /// Clamped to [0, 100].
    pub score: u8,
    pub days_until_due: Option<i64>,
    pub breakdown: ScoreBreakdown,
}

/// Whole calendar days from `today` to the task's due date.
pub fn days_until_due(task: &Task, today: NaiveDate) -> Option<i64> {
    task.due_date
        .map(|due| (due.date_naive() - today).num_days())
}

/// Score a task's urgency in [0, 100].
///
/// `successor_count` is the number of tasks it blocks, `predecessor_count` the
/// number of tasks still blocking it. Only the day-granularity distance to the
/// due date depends on `today`.
pub fn score_task(
    task: &Task,
    successor_count: usize,
    predecessor_count: usize,
    today: NaiveDate,
    weights: &PriorityWeights,
) -> PriorityScore {
    let days = days_until_due(task, today);
    let successors = i64::try_from(successor_count).unwrap_or(i64::MAX);

    let breakdown = ScoreBreakdown {
        urgency: weights.urgency_points(days),
        priority: weights.priority_weight(task.priority),
        blocking: successors
            .saturating_mul(weights.per_successor)
            .min(weights.successor_cap),
        blocked_penalty: if predecessor_count > 0 {
            weights.blocked_penalty
        } else {
            0
        },
        story_points: task
            .story_points
            .map(|p| i64::from(p).min(weights.story_point_cap))
            .unwrap_or(0),
    };

    let score = breakdown.raw_total().clamp(MIN_SCORE, MAX_SCORE) as u8;

    PriorityScore {
        task_id: task.id.clone(),
        score,
        days_until_due: days,
        breakdown,
    }
}
