//! Error taxonomy for the planning engine.

use std::time::Duration;

use thiserror::Error;

use crate::ports::StoreError;

/// Errors surfaced by graph construction, scheduling and the planning service.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PlanningError {
    /// A referenced task or dependency edge does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// Self dependency, malformed scenario parameter, negative duration, ...
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// The dependency graph contains (or would contain) a cycle.
    #[error("circular dependency detected: {0}")]
    CyclicGraph(String),

    /// The cancellation token fired or the deadline elapsed mid-computation.
    #[error("computation cancelled after {phase} ({elapsed:?} elapsed)")]
    ComputationTimeout { phase: String, elapsed: Duration },

    #[error("store error: {0}")]
    Store(#[from] StoreError),

    #[error("config error: {0}")]
    Config(String),
}

impl PlanningError {
    pub fn not_found(what: impl Into<String>) -> Self {
        Self::NotFound(what.into())
    }

    pub fn invalid(what: impl Into<String>) -> Self {
        Self::InvalidArgument(what.into())
    }

    /// Whether a caller may reasonably retry the same request.
    ///
    /// Only store failures are transient; every other variant is a property of the
    /// request or the snapshot.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Store(StoreError::Unavailable(_)))
    }
}

impl From<toml::de::Error> for PlanningError {
    fn from(err: toml::de::Error) -> Self {
        Self::Config(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, PlanningError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        assert_eq!(
            PlanningError::not_found("task t1").to_string(),
            "not found: task t1"
        );
        assert_eq!(
            PlanningError::CyclicGraph("a -> b -> a".to_string()).to_string(),
            "circular dependency detected: a -> b -> a"
        );
    }

    #[test]
    fn test_only_unavailable_store_is_retryable() {
        assert!(PlanningError::Store(StoreError::Unavailable("down".into())).is_retryable());
        assert!(!PlanningError::invalid("delay").is_retryable());
        assert!(!PlanningError::not_found("x").is_retryable());
    }
}
