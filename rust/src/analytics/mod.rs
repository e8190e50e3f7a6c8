//! Sprint burndown and team velocity.
//!
//! Both series work on calendar days (`NaiveDate`); a task counts as done on the
//! day of its completion timestamp, and only when its status is COMPLETED.

mod burndown;
mod velocity;

pub use burndown::{burndown, BurndownPoint, BurndownSeries, BurndownSummary};
pub use velocity::{
    trend_of, velocity_by_sprint, velocity_by_week, Trend, VelocityPoint, VelocitySeries,
};

/// Round to one decimal place.
pub(crate) fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}
