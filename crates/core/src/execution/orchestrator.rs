//! Retry loop for logical requests
//!
//! ```text
//! NotStarted -> Attempting -> Deciding -> WaitingRetry -> Attempting -> ... -> Completed
//!                   |             |             |
//!                   +-------------+-------------+----> Cancelled
//! ```
//!
//! A retry delay the scheduler cannot hold is treated as `Stop`: the request
//! completes with the outcome at hand rather than failing or hanging.
//!
//! Each cycle runs on its own tokio task: the first is spawned by
//! [`ExecutionOrchestrator::submit`], later ones by the delay scheduler when
//! a retry delay elapses. Nothing blocks a worker thread while a request is
//! in flight or waiting.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, instrument};
use uuid::Uuid;

use super::constants::MAX_SCHEDULE_DELAY;
use super::error::{ExecutionError, ExecutionResult};
use super::handle::{RequestShared, ResultHandle};
use super::metrics::AttemptRecord;
use super::outcome::{CancelReason, Completion, Outcome};
use super::policy::{RetryDecision, RetryPolicy};
use super::ports::Transport;
use super::scheduler::DelayScheduler;
use super::tracing::ExecutionTracer;

/// Position of a logical request in the retry state machine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExecutionState {
    /// Submitted, first attempt not yet started
    NotStarted,
    /// Transport call in flight
    Attempting,
    /// Policy is being consulted
    Deciding,
    /// A retry is scheduled; no transport activity
    WaitingRetry,
    /// Final outcome delivered
    Completed,
    /// Ended by cancellation
    Cancelled,
}

impl ExecutionState {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Cancelled)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::NotStarted => "not_started",
            Self::Attempting => "attempting",
            Self::Deciding => "deciding",
            Self::WaitingRetry => "waiting_retry",
            Self::Completed => "completed",
            Self::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for ExecutionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Shared policy handle accepted by [`ExecutionOrchestrator::submit`]
pub type SharedPolicy<T> =
    Arc<dyn RetryPolicy<<T as Transport>::Response, <T as Transport>::Error>>;

/// Drives logical requests through a transport with retries
///
/// Cloning is cheap; clones share the transport and the scheduler.
pub struct ExecutionOrchestrator<T: Transport> {
    transport: Arc<T>,
    scheduler: DelayScheduler,
    tracer: ExecutionTracer,
}

impl<T: Transport> Clone for ExecutionOrchestrator<T> {
    fn clone(&self) -> Self {
        Self {
            transport: Arc::clone(&self.transport),
            scheduler: self.scheduler.clone(),
            tracer: self.tracer,
        }
    }
}

impl<T: Transport> ExecutionOrchestrator<T> {
    /// `scheduler` must be started before requests are submitted
    pub fn new(transport: Arc<T>, scheduler: DelayScheduler) -> Self {
        Self { transport, scheduler, tracer: ExecutionTracer::new() }
    }

    pub fn transport(&self) -> &Arc<T> {
        &self.transport
    }

    pub fn scheduler(&self) -> &DelayScheduler {
        &self.scheduler
    }

    /// Start executing `request` under `policy`
    ///
    /// Returns immediately; the first attempt runs on a spawned task. Must be
    /// called from within a tokio runtime.
    ///
    /// # Errors
    ///
    /// [`ExecutionError::SchedulerNotRunning`] or
    /// [`ExecutionError::SchedulerShutDown`] when retries could never be
    /// scheduled.
    #[instrument(skip_all, fields(policy = policy.name()))]
    pub fn submit(
        &self,
        request: T::Request,
        policy: SharedPolicy<T>,
    ) -> ExecutionResult<ResultHandle<T::Response, T::Error>> {
        if self.scheduler.is_shut_down() {
            return Err(ExecutionError::SchedulerShutDown);
        }
        if !self.scheduler.is_running() {
            return Err(ExecutionError::SchedulerNotRunning);
        }

        let span = self.tracer.start_span(Uuid::new_v4(), policy.name());
        let shared = Arc::new(RequestShared::new(span, self.scheduler.clone()));
        let execution = Arc::new(Execution {
            shared: Arc::clone(&shared),
            request,
            transport: Arc::clone(&self.transport),
            policy,
            scheduler: self.scheduler.clone(),
        });

        execution.spawn_cycle();
        Ok(ResultHandle::new(shared))
    }

    /// [`submit`](Self::submit) with an owned policy value
    ///
    /// # Errors
    ///
    /// Same as [`submit`](Self::submit).
    pub fn submit_with<P>(
        &self,
        request: T::Request,
        policy: P,
    ) -> ExecutionResult<ResultHandle<T::Response, T::Error>>
    where
        P: RetryPolicy<T::Response, T::Error> + 'static,
    {
        self.submit(request, Arc::new(policy))
    }

    /// Cancel a submitted request; idempotent
    pub fn cancel(&self, handle: &ResultHandle<T::Response, T::Error>) -> bool {
        handle.cancel()
    }
}

impl<T: Transport> fmt::Debug for ExecutionOrchestrator<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExecutionOrchestrator").field("scheduler", &self.scheduler).finish()
    }
}

struct Execution<T: Transport> {
    shared: Arc<RequestShared<T::Response, T::Error>>,
    request: T::Request,
    transport: Arc<T>,
    policy: SharedPolicy<T>,
    scheduler: DelayScheduler,
}

impl<T: Transport> Execution<T> {
    fn spawn_cycle(self: Arc<Self>) {
        tokio::spawn(async move { self.run_cycle().await });
    }

    async fn run_cycle(self: Arc<Self>) {
        let shared = &self.shared;
        if !shared.transition(ExecutionState::Attempting) {
            return;
        }

        let attempt = shared.tracker.begin();
        shared.span.record_attempt(attempt);

        let result = tokio::select! {
            biased;
            () = shared.tracker.cancelled() => None,
            result = self.transport.send(&self.request) => Some(result),
        };
        let Some(result) = result else {
            shared.finish(Completion::Cancelled(CancelReason::Caller));
            return;
        };

        let outcome = Outcome::from(result);
        shared.span.record_outcome(attempt, outcome.kind());

        if shared.tracker.is_cancelled() {
            shared.finish(Completion::Cancelled(CancelReason::Caller));
            return;
        }
        if !shared.transition(ExecutionState::Deciding) {
            return;
        }

        let decision = match self.policy.decide(&outcome, attempt) {
            RetryDecision::Retry { delay } if delay > MAX_SCHEDULE_DELAY => {
                shared.span.record_delay_out_of_range(attempt, delay);
                RetryDecision::Stop
            }
            decision => decision,
        };
        shared.record_attempt(AttemptRecord {
            attempt,
            outcome: outcome.kind(),
            scheduled_delay: decision.delay(),
        });

        match decision {
            RetryDecision::Stop => {
                shared.finish(Completion::Finished(outcome));
            }
            RetryDecision::Retry { delay } => {
                drop(outcome);
                self.schedule_retry(attempt, delay);
            }
        }
    }

    fn schedule_retry(self: &Arc<Self>, attempt: u32, delay: Duration) {
        if !self.shared.transition(ExecutionState::WaitingRetry) {
            return;
        }
        self.shared.span.record_retry_scheduled(attempt, delay);

        let guard = PendingRetry { shared: Arc::clone(&self.shared), armed: true };
        let next = Arc::clone(self);
        let callback = move || {
            guard.disarm();
            next.spawn_cycle();
        };

        match self.scheduler.after(delay, callback) {
            Ok(handle) => {
                if !self.shared.attach_pending(handle) {
                    debug!(request_id = %self.shared.span.request_id(), "Revoking retry of finished request");
                    self.scheduler.cancel(&handle);
                }
            }
            // The rejected callback was dropped, and its guard already
            // completed the request.
            Err(err) => self.shared.span.record_schedule_rejected(attempt, &err),
        }
    }
}

/// Completes the request as cancelled if its retry callback is dropped
/// without running, e.g. when the scheduler shuts down.
struct PendingRetry<R, E> {
    shared: Arc<RequestShared<R, E>>,
    armed: bool,
}

impl<R, E> PendingRetry<R, E> {
    fn disarm(mut self) {
        self.armed = false;
    }
}

impl<R, E> Drop for PendingRetry<R, E> {
    fn drop(&mut self) {
        if self.armed {
            self.shared.finish(Completion::Cancelled(CancelReason::SchedulerShutDown));
        }
    }
}
