//! Structured log records for request execution
//!
//! Every record carries the request id so a single logical request can be
//! followed across attempts, scheduler callbacks and cancellation.

use std::time::Duration;

use reattempt_common::error::ErrorClassification;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::constants::MAX_SCHEDULE_DELAY;
use super::error::SchedulerError;
use super::outcome::{CancelReason, OutcomeKind};

/// Entry point for execution log records
#[derive(Debug, Clone, Copy, Default)]
pub struct ExecutionTracer;

impl ExecutionTracer {
    pub fn new() -> Self {
        Self
    }

    /// Log the submission of a request and return its span
    pub fn start_span(&self, request_id: Uuid, policy: &'static str) -> ExecutionSpan {
        debug!(%request_id, policy, "Request submitted");
        ExecutionSpan { request_id, policy }
    }
}

/// Log helper bound to one logical request
#[derive(Debug, Clone)]
pub struct ExecutionSpan {
    request_id: Uuid,
    policy: &'static str,
}

impl ExecutionSpan {
    pub fn request_id(&self) -> Uuid {
        self.request_id
    }

    pub fn record_attempt(&self, attempt: u32) {
        debug!(request_id = %self.request_id, attempt, state = "attempting", "Attempt started");
    }

    pub fn record_outcome(&self, attempt: u32, outcome: OutcomeKind) {
        debug!(
            request_id = %self.request_id,
            attempt,
            outcome = %outcome,
            state = "deciding",
            "Attempt finished"
        );
    }

    pub fn record_retry_scheduled(&self, attempt: u32, delay: Duration) {
        info!(
            request_id = %self.request_id,
            attempt,
            delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
            policy = self.policy,
            state = "waiting_retry",
            "Retry scheduled"
        );
    }

    pub fn record_completed(&self, attempts: u32, outcome: OutcomeKind, total_delay: Duration) {
        info!(
            request_id = %self.request_id,
            attempts,
            outcome = %outcome,
            total_delay_ms = u64::try_from(total_delay.as_millis()).unwrap_or(u64::MAX),
            state = "completed",
            "Request completed"
        );
    }

    pub fn record_cancelled(&self, attempts: u32, reason: CancelReason) {
        warn!(
            request_id = %self.request_id,
            attempts,
            reason = %reason,
            state = "cancelled",
            "Request cancelled"
        );
    }

    pub fn record_schedule_rejected(&self, attempt: u32, error: &SchedulerError) {
        warn!(
            request_id = %self.request_id,
            attempt,
            error = %error,
            severity = %error.severity(),
            "Retry could not be scheduled"
        );
    }

    pub fn record_delay_out_of_range(&self, attempt: u32, delay: Duration) {
        warn!(
            request_id = %self.request_id,
            attempt,
            delay_s = delay.as_secs(),
            max_s = MAX_SCHEDULE_DELAY.as_secs(),
            policy = self.policy,
            "Retry delay beyond scheduler limit, keeping current outcome"
        );
    }
}
