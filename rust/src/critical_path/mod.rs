//! Critical Path Method scheduling.
//!
//! The forward pass computes earliest start/finish, the backward pass latest
//! start/finish; tasks whose slack is zero form the critical path.

mod calculation;
mod report;
mod types;

pub use calculation::{analyze_tasks, calculate_critical_path};
pub use report::{summarize, CriticalPathSummary};
pub use types::{CriticalPathResult, ScheduledTask, TaskTiming};
