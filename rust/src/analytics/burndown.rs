use chrono::{Duration, NaiveDate};
use serde::Serialize;

use crate::config::TrendConfig;
use crate::error::{PlanningError, Result};
use crate::models::Task;

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BurndownPoint {
    pub date: NaiveDate,
    pub ideal_remaining: f64,
    /// `None` for days after today.
    pub actual_remaining: Option<f64>,
    /// Story points completed on or before this day.
    pub completed_by_date: u64,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BurndownSummary {
    pub total_points: u64,
    pub completed_points: u64,
    pub remaining_points: u64,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BurndownSeries {
    pub points: Vec<BurndownPoint>,
    /// `None` when today falls outside the window.
    pub is_on_track: Option<bool>,
    pub summary: BurndownSummary,
}

/// Build the daily burndown for `tasks` over `[start, end]`, inclusive.
///
/// The ideal line burns `total / days` per day, where `days` is the window
/// length (at least 1), and never drops below zero.
///
/// # Errors
/// * `InvalidArgument` if `end` precedes `start`
pub fn burndown(
    tasks: &[Task],
    start: NaiveDate,
    end: NaiveDate,
    today: NaiveDate,
    config: &TrendConfig,
) -> Result<BurndownSeries> {
    if end < start {
        return Err(PlanningError::invalid(format!(
            "burndown window ends ({end}) before it starts ({start})"
        )));
    }

    let total_points: u64 = tasks.iter().map(|t| u64::from(t.points())).sum();
    let total = total_points as f64;
    let span = (end - start).num_days();
    let daily_burn = total / span.max(1) as f64;

    let mut completions: Vec<(NaiveDate, u64)> = tasks
        .iter()
        .filter_map(|t| t.completion_date().map(|day| (day, u64::from(t.points()))))
        .collect();
    completions.sort_unstable();

    let mut points = Vec::with_capacity(span as usize + 1);
    let mut done = 0u64;
    let mut next = 0usize;
    for i in 0..=span {
        let date = start + Duration::days(i);
        while next < completions.len() && completions[next].0 <= date {
            done += completions[next].1;
            next += 1;
        }
        points.push(BurndownPoint {
            date,
            ideal_remaining: (total - daily_burn * i as f64).max(0.0),
            actual_remaining: (date <= today).then(|| total - done as f64),
            completed_by_date: done,
        });
    }

    let is_on_track = points
        .iter()
        .find(|p| p.date == today)
        .map(|p| match p.actual_remaining {
            Some(actual) => actual <= p.ideal_remaining * config.on_track_tolerance,
            None => true,
        });

    let completed_points: u64 = tasks
        .iter()
        .filter(|t| t.is_completed())
        .map(|t| u64::from(t.points()))
        .sum();

    Ok(BurndownSeries {
        points,
        is_on_track,
        summary: BurndownSummary {
            total_points,
            completed_points,
            remaining_points: total_points.saturating_sub(completed_points),
        },
    })
}
