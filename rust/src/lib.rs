//! Project planning analysis engine.
//!
//! Builds the BLOCKS dependency graph of a tenant's tasks and derives from it:
//! the critical path (CPM forward/backward passes), buffer and deadline risk,
//! a smart priority score, what-if scenario impacts, and burndown/velocity
//! series. Every computation is a pure function of an immutable snapshot; the
//! [`service`] layer owns the few writes (dependency insertion and the score
//! write-back).
//!
//! Python bindings are available behind the `python` feature.

pub mod analytics;
pub mod buffer;
pub mod cancellation;
pub mod config;
pub mod critical_path;
pub mod error;
pub mod graph;
pub mod interner;
pub mod logging;
pub mod models;
pub mod ports;
pub mod priority;
pub mod scenario;
pub mod service;

#[cfg(feature = "python")]
mod python;

pub use analytics::{BurndownSeries, Trend, VelocitySeries};
pub use buffer::{BufferEstimate, BufferReport, RiskLevel};
pub use cancellation::Cancellation;
pub use config::{AnalysisConfig, BufferConfig, PlanningConfig, PriorityWeights, TrendConfig};
pub use critical_path::{analyze_tasks, CriticalPathResult, CriticalPathSummary, ScheduledTask, TaskTiming};
pub use error::{PlanningError, Result};
pub use graph::TaskGraph;
pub use models::{Dependency, DependencyKind, Finding, Sprint, Task, TaskPriority, TaskStatus};
pub use ports::{InMemoryTaskStore, Notifier, RecordingNotifier, StoreError, TaskFilter, TaskStore};
pub use priority::PriorityScore;
pub use scenario::{Scenario, ScenarioImpact};
pub use service::PlanningService;
