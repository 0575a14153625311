//! Retry policies
//!
//! A policy is a pure decision function over `(outcome, attempt)`. It holds
//! no per-request state, so one `Arc<dyn RetryPolicy<_, _>>` can be shared by
//! every in-flight request.
//!
//! `attempt` is the number of attempts already made (1 after the first
//! transport call). `max_attempts` counts *additional* attempts: a policy
//! with `max_attempts = M` allows at most `M + 1` transport calls.
//!
//! No built-in policy asks for more than [`MAX_RETRY_DELAY`]: configured
//! delays above it are rejected at construction and server hints are clamped.

use std::time::Duration;

use tracing::warn;

use super::constants::{
    DEFAULT_BACKOFF_MULTIPLIER, DEFAULT_BASE_DELAY, DEFAULT_MAX_ATTEMPTS, DEFAULT_MAX_DELAY,
    MAX_BACKOFF_EXPONENT, MAX_MAX_ATTEMPTS, MAX_RETRY_DELAY,
};
use super::error::{ExecutionError, ExecutionResult};
use super::outcome::{Outcome, RetrySignal};

/// Verdict produced for every outcome
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    /// Run another attempt after `delay`
    Retry { delay: Duration },
    /// Deliver the current outcome as final
    Stop,
}

impl RetryDecision {
    pub fn retry_after(delay: Duration) -> Self {
        Self::Retry { delay }
    }

    pub fn is_retry(&self) -> bool {
        matches!(self, Self::Retry { .. })
    }

    /// Delay before the next attempt; `None` for `Stop`
    pub fn delay(&self) -> Option<Duration> {
        match self {
            Self::Retry { delay } => Some(*delay),
            Self::Stop => None,
        }
    }
}

/// Decides whether an outcome should be re-attempted
///
/// Implementations must always return a decision. Any internal computation
/// that cannot produce a sensible delay returns [`RetryDecision::Stop`].
pub trait RetryPolicy<R, E>: Send + Sync {
    fn decide(&self, outcome: &Outcome<R, E>, attempt: u32) -> RetryDecision;

    /// Short label for log records
    fn name(&self) -> &'static str {
        "custom"
    }
}

impl<R, E, F> RetryPolicy<R, E> for F
where
    F: Fn(&Outcome<R, E>, u32) -> RetryDecision + Send + Sync,
{
    fn decide(&self, outcome: &Outcome<R, E>, attempt: u32) -> RetryDecision {
        self(outcome, attempt)
    }
}

fn validate_max_attempts(max_attempts: u32) -> ExecutionResult<()> {
    if max_attempts > MAX_MAX_ATTEMPTS {
        return Err(ExecutionError::InvalidConfiguration(format!(
            "max_attempts must be at most {MAX_MAX_ATTEMPTS}, got {max_attempts}"
        )));
    }
    Ok(())
}

fn validate_delay(name: &str, delay: Duration) -> ExecutionResult<()> {
    if delay > MAX_RETRY_DELAY {
        return Err(ExecutionError::InvalidConfiguration(format!(
            "{name} must be at most {MAX_RETRY_DELAY:?}, got {delay:?}"
        )));
    }
    Ok(())
}

/// Constant delay between attempts
///
/// Retries failures and unavailable responses while `attempt <= max_attempts`.
/// When the outcome carries a server hint and hints are respected, the hint
/// replaces `base_delay` outright, even if it is shorter. Hints are clamped
/// to [`MAX_RETRY_DELAY`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FixedRetryPolicy {
    max_attempts: u32,
    base_delay: Duration,
    respect_hint: bool,
}

impl FixedRetryPolicy {
    /// # Errors
    ///
    /// Returns [`ExecutionError::InvalidConfiguration`] if `max_attempts` or
    /// `base_delay` exceeds the supported bound.
    pub fn new(max_attempts: u32, base_delay: Duration) -> ExecutionResult<Self> {
        validate_max_attempts(max_attempts)?;
        validate_delay("base_delay", base_delay)?;
        Ok(Self { max_attempts, base_delay, respect_hint: true })
    }

    /// Always wait `base_delay`, ignoring server hints
    #[must_use]
    pub fn ignore_hints(mut self) -> Self {
        self.respect_hint = false;
        self
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    pub fn base_delay(&self) -> Duration {
        self.base_delay
    }
}

impl Default for FixedRetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            base_delay: DEFAULT_BASE_DELAY,
            respect_hint: true,
        }
    }
}

impl<R: RetrySignal, E: RetrySignal> RetryPolicy<R, E> for FixedRetryPolicy {
    fn decide(&self, outcome: &Outcome<R, E>, attempt: u32) -> RetryDecision {
        if attempt > self.max_attempts || !outcome.wants_retry() {
            return RetryDecision::Stop;
        }

        let delay = match outcome.retry_hint() {
            Some(hint) if self.respect_hint => hint.min(MAX_RETRY_DELAY),
            _ => self.base_delay,
        };
        RetryDecision::retry_after(delay)
    }

    fn name(&self) -> &'static str {
        "fixed"
    }
}

/// Exponentially growing delay, capped at `max_delay`
///
/// The delay for attempt `n` is `base_delay * multiplier^(n - 1)`. A server
/// hint never shortens the wait: the policy waits `max(computed, hint)`.
#[derive(Debug, Clone, PartialEq)]
pub struct ExponentialBackoffPolicy {
    max_attempts: u32,
    base_delay: Duration,
    max_delay: Duration,
    multiplier: f64,
    respect_hint: bool,
}

impl ExponentialBackoffPolicy {
    /// # Errors
    ///
    /// Returns [`ExecutionError::InvalidConfiguration`] when `max_attempts`
    /// or `max_delay` is out of range, or `base_delay > max_delay`.
    pub fn new(
        max_attempts: u32,
        base_delay: Duration,
        max_delay: Duration,
    ) -> ExecutionResult<Self> {
        validate_max_attempts(max_attempts)?;
        validate_delay("max_delay", max_delay)?;
        if base_delay > max_delay {
            return Err(ExecutionError::InvalidConfiguration(format!(
                "base_delay ({base_delay:?}) must not exceed max_delay ({max_delay:?})"
            )));
        }
        Ok(Self {
            max_attempts,
            base_delay,
            max_delay,
            multiplier: DEFAULT_BACKOFF_MULTIPLIER,
            respect_hint: true,
        })
    }

    /// # Errors
    ///
    /// Returns [`ExecutionError::InvalidConfiguration`] unless `multiplier` is
    /// finite and at least 1.0.
    pub fn with_multiplier(mut self, multiplier: f64) -> ExecutionResult<Self> {
        if !multiplier.is_finite() || multiplier < 1.0 {
            return Err(ExecutionError::InvalidConfiguration(format!(
                "multiplier must be finite and >= 1.0, got {multiplier}"
            )));
        }
        self.multiplier = multiplier;
        Ok(self)
    }

    #[must_use]
    pub fn ignore_hints(mut self) -> Self {
        self.respect_hint = false;
        self
    }

    /// Computed delay for `attempt`, or `None` if the arithmetic breaks down
    pub fn delay_for(&self, attempt: u32) -> Option<Duration> {
        let exponent = attempt.saturating_sub(1).min(MAX_BACKOFF_EXPONENT);
        let exponent = i32::try_from(exponent).ok()?;
        let millis = self.base_delay.as_millis() as f64 * self.multiplier.powi(exponent);
        if !millis.is_finite() || millis < 0.0 {
            return None;
        }

        let capped = millis.min(self.max_delay.as_millis() as f64);
        Some(Duration::from_millis(capped as u64))
    }
}

impl Default for ExponentialBackoffPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            base_delay: DEFAULT_BASE_DELAY,
            max_delay: DEFAULT_MAX_DELAY,
            multiplier: DEFAULT_BACKOFF_MULTIPLIER,
            respect_hint: true,
        }
    }
}

impl<R: RetrySignal, E: RetrySignal> RetryPolicy<R, E> for ExponentialBackoffPolicy {
    fn decide(&self, outcome: &Outcome<R, E>, attempt: u32) -> RetryDecision {
        if attempt > self.max_attempts || !outcome.wants_retry() {
            return RetryDecision::Stop;
        }

        let Some(computed) = self.delay_for(attempt) else {
            warn!(attempt, multiplier = self.multiplier, "backoff delay not computable, giving up");
            return RetryDecision::Stop;
        };

        let delay = match outcome.retry_hint() {
            Some(hint) if self.respect_hint => computed.max(hint.min(MAX_RETRY_DELAY)),
            _ => computed,
        };
        RetryDecision::retry_after(delay)
    }

    fn name(&self) -> &'static str {
        "exponential"
    }
}

/// Never retries; every first outcome is final
#[derive(Debug, Clone, Copy, Default)]
pub struct NeverRetry;

impl<R, E> RetryPolicy<R, E> for NeverRetry {
    fn decide(&self, _outcome: &Outcome<R, E>, _attempt: u32) -> RetryDecision {
        RetryDecision::Stop
    }

    fn name(&self) -> &'static str {
        "never"
    }
}
