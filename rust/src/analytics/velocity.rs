use chrono::{Datelike, Duration, NaiveDate};
use serde::Serialize;

use crate::config::TrendConfig;
use crate::models::{Sprint, SprintStatus, Task};

use super::round1;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Trend {
    Up,
    Down,
    Stable,
}

/// Completed work in one sprint or one week.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VelocityPoint {
    /// Sprint name, or ISO week such as `2025-W19`.
    pub label: String,
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub completed_count: usize,
    pub completed_points: u64,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VelocitySeries {
    /// Oldest first.
    pub points: Vec<VelocityPoint>,
    /// Mean completed points per period, one decimal.
    pub average_velocity: f64,
    /// Number of completed tasks across all periods.
    pub total_completed: usize,
    pub trend: Trend,
}

impl VelocitySeries {
    fn from_points(points: Vec<VelocityPoint>, config: &TrendConfig) -> Self {
        let values: Vec<f64> = points.iter().map(|p| p.completed_points as f64).collect();
        let average_velocity = if values.is_empty() {
            0.0
        } else {
            round1(values.iter().sum::<f64>() / values.len() as f64)
        };
        Self {
            total_completed: points.iter().map(|p| p.completed_count).sum(),
            average_velocity,
            trend: trend_of(&values, config.velocity_threshold),
            points,
        }
    }
}

/// Compare the mean of the recent half against the older half.
///
/// The older half is the first `len / 2` values. A relative change above
/// `threshold` is UP or DOWN; fewer than two values are always STABLE.
pub fn trend_of(values: &[f64], threshold: f64) -> Trend {
    if values.len() < 2 {
        return Trend::Stable;
    }
    let (older, recent) = values.split_at(values.len() / 2);
    let mean = |xs: &[f64]| xs.iter().sum::<f64>() / xs.len() as f64;
    let (older, recent) = (mean(older), mean(recent));

    if older == 0.0 {
        return if recent > 0.0 { Trend::Up } else { Trend::Stable };
    }
    let change = (recent - older) / older;
    if change > threshold {
        Trend::Up
    } else if change < -threshold {
        Trend::Down
    } else {
        Trend::Stable
    }
}

fn completed_between<'a>(
    tasks: impl Iterator<Item = &'a Task>,
    start: NaiveDate,
    end: NaiveDate,
) -> (usize, u64) {
    tasks
        .filter(|t| t.completion_date().is_some_and(|d| d >= start && d <= end))
        .fold((0, 0), |(count, points), t| (count + 1, points + u64::from(t.points())))
}

/// Velocity over the last `weeks` ISO weeks, the current week included.
pub fn velocity_by_week(
    tasks: &[Task],
    weeks: usize,
    today: NaiveDate,
    config: &TrendConfig,
) -> VelocitySeries {
    let this_monday = today - Duration::days(i64::from(today.weekday().num_days_from_monday()));
    // Weeks before the calendar's first date are dropped
    let points = (0..weeks as i64)
        .rev()
        .filter_map(|back| {
            let start = this_monday.checked_sub_signed(Duration::try_weeks(back)?)?;
            let end = start.checked_add_signed(Duration::days(6))?;
            let (completed_count, completed_points) = completed_between(tasks.iter(), start, end);
            Some(VelocityPoint {
                label: start.format("%G-W%V").to_string(),
                start,
                end,
                completed_count,
                completed_points,
            })
        })
        .collect();
    VelocitySeries::from_points(points, config)
}

/// Velocity of the `limit` most recently finished COMPLETED sprints.
///
/// A task counts toward a sprint when it belongs to it and is completed,
/// whatever its completion date.
pub fn velocity_by_sprint(
    sprints: &[Sprint],
    tasks: &[Task],
    limit: usize,
    config: &TrendConfig,
) -> VelocitySeries {
    let mut completed: Vec<&Sprint> = sprints
        .iter()
        .filter(|s| s.status == SprintStatus::Completed)
        .collect();
    completed.sort_by(|a, b| b.end_date.cmp(&a.end_date).then_with(|| b.id.cmp(&a.id)));
    completed.truncate(limit);
    completed.reverse();

    let points = completed
        .into_iter()
        .map(|sprint| {
            let (completed_count, completed_points) = tasks
                .iter()
                .filter(|t| t.is_completed() && t.sprint_id.as_deref() == Some(sprint.id.as_str()))
                .fold((0, 0), |(count, points), t| (count + 1, points + u64::from(t.points())));
            VelocityPoint {
                label: sprint.name.clone(),
                start: sprint.start_date,
                end: sprint.end_date,
                completed_count,
                completed_points,
            }
        })
        .collect();
    VelocitySeries::from_points(points, config)
}
