//! Smart priority scoring and ranking.
//!
//! The score is a bounded urgency measure that does not need a full critical
//! path computation: due date proximity, priority level, how much work the task
//! unblocks, whether it is itself blocked, and its size in story points.

mod ranking;
mod scoring;

pub use ranking::rank_tasks;
pub use scoring::{days_until_due, score_task, PriorityScore, ScoreBreakdown, MAX_SCORE, MIN_SCORE};
