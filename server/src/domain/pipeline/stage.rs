//! Stage configuration and state machine
//!
//! A stage is configuration, not mutable state: the name used for its span
//! and response entry, the downstream call handle, the declared failure
//! policy, and the per-call deadline. Execution state lives in
//! [`StageState`] and advances `Pending → Running → {Succeeded, Failed} →
//! Ended` for every invoked stage.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::domain::downstream::DownstreamCall;

// =============================================================================
// Failure policy
// =============================================================================

/// Declared per-stage failure handling.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FailurePolicy {
    /// Record the failure, continue with a degraded result.
    Recoverable,
    /// Abort the remaining stages; the request fails.
    #[default]
    Fatal,
}

impl fmt::Display for FailurePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailurePolicy::Recoverable => write!(f, "recoverable"),
            FailurePolicy::Fatal => write!(f, "fatal"),
        }
    }
}

// =============================================================================
// Stage state machine
// =============================================================================

/// Execution state of one stage within one request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StageState {
    Pending,
    Running,
    Succeeded,
    Failed(FailurePolicy),
    Ended,
}

impl StageState {
    pub fn can_transition(self, next: StageState) -> bool {
        matches!(
            (self, next),
            (StageState::Pending, StageState::Running)
                | (StageState::Running, StageState::Succeeded)
                | (StageState::Running, StageState::Failed(_))
                | (StageState::Succeeded, StageState::Ended)
                | (StageState::Failed(_), StageState::Ended)
        )
    }

    /// Move to `next`, logging the transition. An invalid transition is a
    /// logic error; it is logged loudly and the state still advances so one
    /// request cannot wedge the machine.
    pub fn advance(self, next: StageState, stage: &str) -> StageState {
        if self.can_transition(next) {
            tracing::trace!(stage, from = %self, to = %next, "Stage transition");
        } else {
            tracing::error!(stage, from = %self, to = %next, "Invalid stage transition");
        }
        next
    }
}

impl fmt::Display for StageState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StageState::Pending => write!(f, "pending"),
            StageState::Running => write!(f, "running"),
            StageState::Succeeded => write!(f, "succeeded"),
            StageState::Failed(policy) => write!(f, "failed({})", policy),
            StageState::Ended => write!(f, "ended"),
        }
    }
}

// =============================================================================
// Stage
// =============================================================================

/// One downstream call within the orchestrated pipeline.
pub struct Stage {
    pub name: String,
    pub call: Arc<dyn DownstreamCall>,
    pub policy: FailurePolicy,
    pub timeout: Duration,
}

impl Stage {
    pub fn new(
        name: impl Into<String>,
        call: Arc<dyn DownstreamCall>,
        policy: FailurePolicy,
        timeout: Duration,
    ) -> Self {
        Self {
            name: name.into(),
            call,
            policy,
            timeout,
        }
    }
}

impl fmt::Debug for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Stage")
            .field("name", &self.name)
            .field("policy", &self.policy)
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}
