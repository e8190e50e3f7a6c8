//! Configuration types for the planning engine.
//!
//! Every weighting table lives here and is passed explicitly into the scorers, so
//! two tenants can be evaluated under different policies in the same process.

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::models::TaskPriority;

/// Top-level configuration, loadable from TOML.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlanningConfig {
    pub analysis: AnalysisConfig,
    pub buffer: BufferConfig,
    pub priority: PriorityWeights,
    pub trend: TrendConfig,
}

impl PlanningConfig {
    /// Parse a configuration document; missing sections and keys fall back to defaults.
    pub fn from_toml_str(source: &str) -> Result<Self> {
        Ok(toml::from_str(source)?)
    }
}

/// Settings shared by the graph and critical-path phases.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    /// Verbosity level: 0=silent, 1=changes, 2=checks, 3=debug.
    pub verbosity: u8,
    /// Working hours in one schedule day.
    pub hours_per_day: f64,
    /// Estimate used for tasks that carry none.
    pub default_estimate_hours: f64,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            verbosity: 0,
            hours_per_day: 8.0,
            default_estimate_hours: 8.0,
        }
    }
}

/// Buffer/risk estimation parameters.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BufferConfig {
    /// Variance ratio assumed when no estimate history exists (20% contingency).
    pub default_variance_ratio: f64,
    /// Safety multiplier applied to the expected overrun.
    pub buffer_multiplier: f64,
}

impl Default for BufferConfig {
    fn default() -> Self {
        Self {
            default_variance_ratio: 1.2,
            buffer_multiplier: 1.5,
        }
    }
}

/// Smart priority weighting tables.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PriorityWeights {
    /// Urgency buckets as (max days until due, points), checked in order.
    pub urgency_buckets: Vec<(i64, i64)>,
    /// Points when the due date is further away than every bucket.
    pub urgency_far: i64,
    pub urgent: i64,
    pub high: i64,
    pub medium: i64,
    pub low: i64,
    /// Weight for tasks without a recognised priority.
    pub default_priority: i64,
    /// Points per task this one blocks.
    pub per_successor: i64,
    pub successor_cap: i64,
    /// Penalty applied once when the task is still blocked by something.
    pub blocked_penalty: i64,
    pub story_point_cap: i64,
}

impl Default for PriorityWeights {
    fn default() -> Self {
        Self {
            urgency_buckets: vec![(0, 40), (1, 35), (3, 25), (7, 15)],
            urgency_far: 5,
            urgent: 30,
            high: 22,
            medium: 12,
            low: 5,
            default_priority: 10,
            per_successor: 10,
            successor_cap: 20,
            blocked_penalty: 10,
            story_point_cap: 10,
        }
    }
}

impl PriorityWeights {
    pub fn priority_weight(&self, priority: Option<TaskPriority>) -> i64 {
        match priority {
            Some(TaskPriority::Urgent) => self.urgent,
            Some(TaskPriority::High) => self.high,
            Some(TaskPriority::Medium) => self.medium,
            Some(TaskPriority::Low) => self.low,
            None => self.default_priority,
        }
    }

    pub fn urgency_points(&self, days_until_due: Option<i64>) -> i64 {
        let Some(days) = days_until_due else {
            return 0;
        };
        self.urgency_buckets
            .iter()
            .find(|(max_days, _)| days <= *max_days)
            .map(|(_, points)| *points)
            .unwrap_or(self.urgency_far)
    }
}

/// Burndown and velocity thresholds.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrendConfig {
    /// Relative change between velocity halves needed to report UP or DOWN.
    pub velocity_threshold: f64,
    /// Actual remaining may exceed ideal by this factor and still be on track.
    pub on_track_tolerance: f64,
}

impl Default for TrendConfig {
    fn default() -> Self {
        Self {
            velocity_threshold: 0.10,
            on_track_tolerance: 1.10,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = PlanningConfig::default();
        assert_eq!(config.analysis.verbosity, 0);
        assert!((config.analysis.hours_per_day - 8.0).abs() < 1e-9);
        assert!((config.buffer.default_variance_ratio - 1.2).abs() < 1e-9);
        assert!((config.trend.on_track_tolerance - 1.1).abs() < 1e-9);
    }

    #[test]
    fn test_urgency_buckets() {
        let weights = PriorityWeights::default();
        assert_eq!(weights.urgency_points(None), 0);
        assert_eq!(weights.urgency_points(Some(-4)), 40);
        assert_eq!(weights.urgency_points(Some(0)), 40);
        assert_eq!(weights.urgency_points(Some(1)), 35);
        assert_eq!(weights.urgency_points(Some(2)), 25);
        assert_eq!(weights.urgency_points(Some(7)), 15);
        assert_eq!(weights.urgency_points(Some(8)), 5);
    }

    #[test]
    fn test_priority_table() {
        let weights = PriorityWeights::default();
        assert_eq!(weights.priority_weight(Some(TaskPriority::Urgent)), 30);
        assert_eq!(weights.priority_weight(Some(TaskPriority::Low)), 5);
        assert_eq!(weights.priority_weight(None), 10);
    }

    #[test]
    fn test_from_toml_partial() {
        let config = PlanningConfig::from_toml_str(
            r#"
            [analysis]
            verbosity = 2

            [priority]
            urgent = 50
            "#,
        )
        .unwrap();
        assert_eq!(config.analysis.verbosity, 2);
        assert!((config.analysis.default_estimate_hours - 8.0).abs() < 1e-9);
        assert_eq!(config.priority.urgent, 50);
        assert_eq!(config.priority.high, 22);
    }

    #[test]
    fn test_from_toml_rejects_bad_types() {
        let err = PlanningConfig::from_toml_str("[analysis]\nverbosity = \"loud\"").unwrap_err();
        assert!(matches!(err, crate::error::PlanningError::Config(_)));
    }
}
