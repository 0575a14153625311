//! Error types for the execution engine

use std::time::Duration;

use reattempt_common::error::{CommonError, ErrorSeverity};
use reattempt_common::impl_error_classification;
use thiserror::Error;

/// Errors raised by the delay scheduler
#[derive(Debug, Error)]
pub enum SchedulerError {
    /// `start` was called on a scheduler whose driver is already running
    #[error("scheduler already running")]
    AlreadyRunning,

    /// The scheduler has not been started yet
    #[error("scheduler not running")]
    NotRunning,

    /// The scheduler was shut down and no longer accepts callbacks
    #[error("scheduler has been shut down")]
    ShutDown,

    /// The requested delay is beyond what the timer can represent
    #[error("delay {delay:?} exceeds the scheduler limit of {max:?}")]
    DelayTooLong { delay: Duration, max: Duration },

    /// The driver task did not exit within the shutdown timeout
    #[error(transparent)]
    Common(#[from] CommonError),
}

impl_error_classification!(SchedulerError, Common,
    Self::AlreadyRunning => {
        retryable: false,
        severity: ErrorSeverity::Warning,
    },
    Self::NotRunning => {
        retryable: false,
        severity: ErrorSeverity::Error,
    },
    Self::ShutDown => {
        retryable: false,
        severity: ErrorSeverity::Warning,
    },
    Self::DelayTooLong { .. } => {
        retryable: false,
        severity: ErrorSeverity::Error,
    }
);

/// Errors raised when submitting work or building policies
#[derive(Debug, Error)]
pub enum ExecutionError {
    /// The orchestrator's scheduler has been shut down
    #[error("cannot submit request: scheduler has been shut down")]
    SchedulerShutDown,

    /// The orchestrator's scheduler was never started
    #[error("cannot submit request: scheduler not running")]
    SchedulerNotRunning,

    /// Policy parameters are out of range
    #[error("invalid retry configuration: {0}")]
    InvalidConfiguration(String),

    #[error(transparent)]
    Common(#[from] CommonError),
}

impl_error_classification!(ExecutionError, Common,
    Self::SchedulerShutDown => {
        retryable: false,
        severity: ErrorSeverity::Warning,
    },
    Self::SchedulerNotRunning => {
        retryable: false,
        severity: ErrorSeverity::Error,
    },
    Self::InvalidConfiguration(_) => {
        retryable: false,
        severity: ErrorSeverity::Error,
    }
);

impl From<SchedulerError> for ExecutionError {
    fn from(err: SchedulerError) -> Self {
        match err {
            SchedulerError::ShutDown => Self::SchedulerShutDown,
            SchedulerError::NotRunning => Self::SchedulerNotRunning,
            SchedulerError::AlreadyRunning => {
                Self::Common(CommonError::internal_with_context(err.to_string(), "scheduler"))
            }
            SchedulerError::DelayTooLong { .. } => Self::InvalidConfiguration(err.to_string()),
            SchedulerError::Common(common) => Self::Common(common),
        }
    }
}

/// Result type for scheduler operations
pub type SchedulerResult<T> = Result<T, SchedulerError>;

/// Result type for execution operations
pub type ExecutionResult<T> = Result<T, ExecutionError>;

#[cfg(test)]
mod tests {
    use reattempt_common::error::ErrorClassification;

    use super::*;

    /// Validates `ExecutionError::from` behavior for the scheduler error
    /// mapping scenario.
    ///
    /// Assertions:
    /// - Confirms `ShutDown` maps to `SchedulerShutDown`.
    /// - Confirms `NotRunning` maps to `SchedulerNotRunning`.
    #[test]
    fn test_scheduler_error_maps_to_execution_error() {
        assert!(matches!(
            ExecutionError::from(SchedulerError::ShutDown),
            ExecutionError::SchedulerShutDown
        ));
        assert!(matches!(
            ExecutionError::from(SchedulerError::NotRunning),
            ExecutionError::SchedulerNotRunning
        ));
        assert!(matches!(
            ExecutionError::from(SchedulerError::AlreadyRunning),
            ExecutionError::Common(CommonError::Internal { .. })
        ));
        assert!(matches!(
            ExecutionError::from(SchedulerError::DelayTooLong {
                delay: Duration::MAX,
                max: Duration::from_secs(1),
            }),
            ExecutionError::InvalidConfiguration(_)
        ));
    }

    /// Validates classification of execution errors.
    #[test]
    fn test_execution_error_classification() {
        let err = ExecutionError::InvalidConfiguration("max_attempts".into());
        assert!(!err.is_retryable());
        assert_eq!(err.severity(), ErrorSeverity::Error);
        assert!(err.to_string().contains("max_attempts"));

        let timeout: ExecutionError =
            CommonError::timeout("shutdown", Duration::from_secs(5)).into();
        assert!(timeout.is_retryable());
    }
}
