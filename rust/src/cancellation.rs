//! Cooperative cancellation for long analyses.
//!
//! The algorithms never block, so cancellation is checked between phases rather
//! than awaited.

use std::time::{Duration, Instant};

use tokio_util::sync::CancellationToken;

use crate::error::{PlanningError, Result};

/// A cancellation token and/or a wall-clock budget for one computation.
#[derive(Clone, Debug)]
pub struct Cancellation {
    token: Option<CancellationToken>,
    started: Instant,
    deadline: Option<Instant>,
}

impl Cancellation {
    /// Never cancels.
    pub fn none() -> Self {
        Self {
            token: None,
            started: Instant::now(),
            deadline: None,
        }
    }

    pub fn with_token(token: CancellationToken) -> Self {
        Self {
            token: Some(token),
            ..Self::none()
        }
    }

    pub fn with_timeout(budget: Duration) -> Self {
        let started = Instant::now();
        Self {
            token: None,
            started,
            deadline: started.checked_add(budget),
        }
    }

    /// Add a wall-clock budget on top of an existing token.
    pub fn and_timeout(mut self, budget: Duration) -> Self {
        self.deadline = self.started.checked_add(budget);
        self
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.as_ref().is_some_and(|t| t.is_cancelled())
            || self.deadline.is_some_and(|d| Instant::now() >= d)
    }

    /// Fail with `ComputationTimeout` if cancellation was requested.
    ///
    /// `phase` names the phase that just completed.
    pub fn check(&self, phase: &str) -> Result<()> {
        if self.is_cancelled() {
            return Err(PlanningError::ComputationTimeout {
                phase: phase.to_string(),
                elapsed: self.started.elapsed(),
            });
        }
        Ok(())
    }
}

impl Default for Cancellation {
    fn default() -> Self {
        Self::none()
    }
}
