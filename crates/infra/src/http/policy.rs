//! Default HTTP re-execution strategy
//!
//! - Responses are retried only for retriable status codes (429 and 503 by
//!   default), waiting for a positive `Retry-After` when the server sends
//!   one and `default_interval` otherwise. `Retry-After` values are clamped
//!   to [`MAX_RETRY_DELAY`].
//! - Transport failures are retried only when the failure is transient and
//!   the request method is idempotent.
//! - At most `max_retries` re-executions happen per logical request.

use std::collections::BTreeSet;
use std::time::Duration;

use reattempt_common::error::ErrorClassification;
use reattempt_core::execution::constants::{MAX_MAX_ATTEMPTS, MAX_RETRY_DELAY};
use reattempt_core::{ExecutionError, ExecutionResult, Outcome, RetryDecision, RetryPolicy};
use reqwest::StatusCode;

use super::error::HttpError;
use super::types::{is_idempotent, HttpResponse};

const DEFAULT_MAX_RETRIES: u32 = 1;
const DEFAULT_RETRY_INTERVAL: Duration = Duration::from_secs(1);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpRetryPolicy {
    max_retries: u32,
    default_interval: Duration,
    retriable_statuses: BTreeSet<u16>,
    respect_retry_after: bool,
}

impl HttpRetryPolicy {
    /// # Errors
    ///
    /// Returns [`ExecutionError::InvalidConfiguration`] if `max_retries` or
    /// `default_interval` exceeds the supported bound.
    pub fn new(max_retries: u32, default_interval: Duration) -> ExecutionResult<Self> {
        if max_retries > MAX_MAX_ATTEMPTS {
            return Err(ExecutionError::InvalidConfiguration(format!(
                "max_retries must be at most {MAX_MAX_ATTEMPTS}, got {max_retries}"
            )));
        }
        if default_interval > MAX_RETRY_DELAY {
            return Err(ExecutionError::InvalidConfiguration(format!(
                "default_interval must be at most {MAX_RETRY_DELAY:?}, got {default_interval:?}"
            )));
        }
        Ok(Self {
            max_retries,
            default_interval,
            ..Self::default()
        })
    }

    /// Replace the set of status codes that trigger a retry
    #[must_use]
    pub fn with_retriable_statuses(mut self, statuses: impl IntoIterator<Item = StatusCode>) -> Self {
        self.retriable_statuses = statuses.into_iter().map(|s| s.as_u16()).collect();
        self
    }

    /// Always wait `default_interval`, ignoring `Retry-After`
    #[must_use]
    pub fn ignore_retry_after(mut self) -> Self {
        self.respect_retry_after = false;
        self
    }

    pub fn max_retries(&self) -> u32 {
        self.max_retries
    }

    pub fn default_interval(&self) -> Duration {
        self.default_interval
    }

    pub fn is_retriable_status(&self, status: StatusCode) -> bool {
        self.retriable_statuses.contains(&status.as_u16())
    }

    fn response_delay(&self, response: &HttpResponse) -> Duration {
        if self.respect_retry_after {
            if let Some(hint) = response.retry_after() {
                return hint.min(MAX_RETRY_DELAY);
            }
        }
        self.default_interval
    }

    fn should_retry_error(err: &HttpError) -> bool {
        err.is_retryable() && err.method().is_some_and(is_idempotent)
    }
}

impl Default for HttpRetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: DEFAULT_MAX_RETRIES,
            default_interval: DEFAULT_RETRY_INTERVAL,
            retriable_statuses: [StatusCode::TOO_MANY_REQUESTS, StatusCode::SERVICE_UNAVAILABLE]
                .iter()
                .map(StatusCode::as_u16)
                .collect(),
            respect_retry_after: true,
        }
    }
}

impl RetryPolicy<HttpResponse, HttpError> for HttpRetryPolicy {
    fn decide(&self, outcome: &Outcome<HttpResponse, HttpError>, attempt: u32) -> RetryDecision {
        if attempt > self.max_retries {
            return RetryDecision::Stop;
        }

        match outcome {
            Outcome::Success(response) if self.is_retriable_status(response.status()) => {
                RetryDecision::retry_after(self.response_delay(response))
            }
            Outcome::Success(_) => RetryDecision::Stop,
            Outcome::Failure(err) if Self::should_retry_error(err) => {
                RetryDecision::retry_after(self.default_interval)
            }
            Outcome::Failure(_) => RetryDecision::Stop,
        }
    }

    fn name(&self) -> &'static str {
        "http"
    }
}
