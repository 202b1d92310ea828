//! Scheduler error types.

use std::time::Duration;

use thiserror::Error;

use polyplace_core::ConfigError;

/// Errors that can occur during scheduling operations.
#[derive(Debug, Error)]
pub enum SchedulerError {
    #[error("no candidate providers for workload {workload_id}: {attempted} provider(s) attempted")]
    NoCandidates { workload_id: String, attempted: usize },

    #[error(
        "no provider satisfies reschedule constraints for workload {workload_id} ({constraints}): {attempted} provider(s) attempted"
    )]
    ConstraintViolation {
        workload_id: String,
        attempted: usize,
        constraints: String,
    },

    #[error("scheduling timed out after {0:?}")]
    Timeout(Duration),

    #[error("no providers registered")]
    NoProviders,

    #[error("invalid scheduling policy: {0}")]
    InvalidPolicy(#[source] ConfigError),
}

impl SchedulerError {
    /// Whether the sweep ran to completion and simply found nothing.
    pub fn is_no_candidates(&self) -> bool {
        matches!(self, Self::NoCandidates { .. } | Self::ConstraintViolation { .. })
    }
}

pub type SchedulerResult<T> = Result<T, SchedulerError>;
