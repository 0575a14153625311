//! Request re-execution engine
//!
//! Submitting a request yields a [`ResultHandle`] immediately. The
//! [`ExecutionOrchestrator`] then drives the request through a
//! [`Transport`], asks a [`RetryPolicy`] after every attempt, and uses the
//! shared [`DelayScheduler`] to wait between attempts. The handle is
//! completed exactly once, with the last attempt's [`Outcome`] or with a
//! cancellation.
//!
//! # Example
//!
//! ```rust,ignore
//! let scheduler = DelayScheduler::started();
//! let orchestrator = ExecutionOrchestrator::new(Arc::new(transport), scheduler);
//! let policy = FixedRetryPolicy::new(3, Duration::from_millis(500))?;
//!
//! let handle = orchestrator.submit_with(request, policy)?;
//! match handle.wait().await {
//!     Completion::Finished(Outcome::Success(response)) => { /* ... */ }
//!     Completion::Finished(Outcome::Failure(error)) => { /* ... */ }
//!     Completion::Cancelled(reason) => { /* ... */ }
//! }
//! ```

pub mod constants;
pub mod error;
pub mod handle;
pub mod metrics;
pub mod orchestrator;
pub mod outcome;
pub mod policy;
pub mod ports;
pub mod scheduler;
pub mod tracing;
pub mod tracker;

pub use error::{ExecutionError, ExecutionResult, SchedulerError, SchedulerResult};
pub use handle::{CancelHandle, ResultHandle};
pub use metrics::{AttemptRecord, ExecutionMetrics};
pub use orchestrator::{ExecutionOrchestrator, ExecutionState, SharedPolicy};
pub use outcome::{CancelReason, Completion, Outcome, OutcomeKind, RetrySignal};
pub use policy::{
    ExponentialBackoffPolicy, FixedRetryPolicy, NeverRetry, RetryDecision, RetryPolicy,
};
pub use ports::Transport;
pub use scheduler::{DelayScheduler, ScheduleHandle};
pub use self::tracing::{ExecutionSpan, ExecutionTracer};
pub use tracker::AttemptTracker;
