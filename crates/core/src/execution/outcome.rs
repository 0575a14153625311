//! Per-attempt outcomes and the caller-visible completion
//!
//! An [`Outcome`] is what one transport invocation produced. A
//! [`Completion`] is what the caller eventually receives: either the last
//! outcome, untouched, or a cancellation.

use std::fmt;
use std::time::Duration;

use reattempt_common::error::{CommonError, ErrorClassification};

/// Result of a single attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome<R, E> {
    Success(R),
    Failure(E),
}

impl<R, E> Outcome<R, E> {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success(_))
    }

    pub fn is_failure(&self) -> bool {
        matches!(self, Self::Failure(_))
    }

    pub fn kind(&self) -> OutcomeKind {
        match self {
            Self::Success(_) => OutcomeKind::Success,
            Self::Failure(_) => OutcomeKind::Failure,
        }
    }

    pub fn success(&self) -> Option<&R> {
        match self {
            Self::Success(response) => Some(response),
            Self::Failure(_) => None,
        }
    }

    pub fn failure(&self) -> Option<&E> {
        match self {
            Self::Success(_) => None,
            Self::Failure(error) => Some(error),
        }
    }

    pub fn into_result(self) -> Result<R, E> {
        match self {
            Self::Success(response) => Ok(response),
            Self::Failure(error) => Err(error),
        }
    }
}

impl<R, E> From<Result<R, E>> for Outcome<R, E> {
    fn from(result: Result<R, E>) -> Self {
        match result {
            Ok(response) => Self::Success(response),
            Err(error) => Self::Failure(error),
        }
    }
}

impl<R: RetrySignal, E: RetrySignal> Outcome<R, E> {
    /// Whether this outcome asks for another attempt
    ///
    /// Failures ask when the error is transient. Successes ask when the
    /// response is well-formed but signals unavailability (e.g. HTTP 503).
    pub fn wants_retry(&self) -> bool {
        match self {
            Self::Success(response) => response.is_retryable_failure(),
            Self::Failure(error) => error.is_retryable_failure(),
        }
    }

    /// Server-suggested wait carried by the outcome, if any
    pub fn retry_hint(&self) -> Option<Duration> {
        match self {
            Self::Success(response) => response.retry_hint(),
            Self::Failure(error) => error.retry_hint(),
        }
    }
}

/// Discriminant of an [`Outcome`], used in logs and attempt history
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OutcomeKind {
    Success,
    Failure,
}

impl fmt::Display for OutcomeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Success => write!(f, "success"),
            Self::Failure => write!(f, "failure"),
        }
    }
}

/// Retry-relevant information exposed by responses and errors
///
/// Policies read outcomes only through this trait, so transports decide what
/// "transient" means for their own types.
pub trait RetrySignal {
    /// `true` when another attempt could produce a different result
    fn is_retryable_failure(&self) -> bool;

    /// Suggested wait before the next attempt, such as a Retry-After value
    fn retry_hint(&self) -> Option<Duration> {
        None
    }
}

impl RetrySignal for CommonError {
    fn is_retryable_failure(&self) -> bool {
        self.is_retryable()
    }
}

/// Why a logical request ended without a transport result
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CancelReason {
    /// The caller cancelled through its handle or the orchestrator
    Caller,
    /// The scheduler shut down while a retry was pending
    SchedulerShutDown,
}

impl fmt::Display for CancelReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Caller => write!(f, "cancelled by caller"),
            Self::SchedulerShutDown => write!(f, "scheduler shut down"),
        }
    }
}

/// Final value delivered to the caller exactly once
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Completion<R, E> {
    /// The last attempt's outcome, exactly as the transport produced it
    Finished(Outcome<R, E>),
    /// The request was cancelled before a final outcome was accepted
    Cancelled(CancelReason),
}

impl<R, E> Completion<R, E> {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled(_))
    }

    pub fn outcome(&self) -> Option<&Outcome<R, E>> {
        match self {
            Self::Finished(outcome) => Some(outcome),
            Self::Cancelled(_) => None,
        }
    }

    pub fn into_outcome(self) -> Option<Outcome<R, E>> {
        match self {
            Self::Finished(outcome) => Some(outcome),
            Self::Cancelled(_) => None,
        }
    }

    pub fn cancel_reason(&self) -> Option<CancelReason> {
        match self {
            Self::Finished(_) => None,
            Self::Cancelled(reason) => Some(*reason),
        }
    }
}
