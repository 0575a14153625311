// Attempt metrics for a logical request
use std::fmt;
use std::time::Duration;

use super::outcome::OutcomeKind;

/// One processed attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttemptRecord {
    /// 1-based attempt number
    pub attempt: u32,
    /// What the transport produced
    pub outcome: OutcomeKind,
    /// Wait scheduled before the next attempt, if the policy asked for one
    pub scheduled_delay: Option<Duration>,
}

/// Metrics collected while a logical request runs
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExecutionMetrics {
    /// Number of attempts whose outcome was processed
    pub attempts: u32,
    /// Sum of all scheduled retry delays
    pub total_delay: Duration,
    /// Final outcome was `Outcome::Success`. Reflects the outcome variant
    /// only; a response the policy gave up on, such as a final 503, counts.
    pub finished_with_response: bool,
    /// Request ended through cancellation
    pub cancelled: bool,
    /// Ordered attempt history
    pub history: Vec<AttemptRecord>,
}

impl ExecutionMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn record_attempt(&mut self, record: AttemptRecord) {
        self.attempts = self.attempts.max(record.attempt);
        if let Some(delay) = record.scheduled_delay {
            self.total_delay = self.total_delay.saturating_add(delay);
        }
        self.history.push(record);
    }

    /// Average scheduled delay between attempts
    pub fn average_delay(&self) -> Option<Duration> {
        let retries = self.history.iter().filter(|r| r.scheduled_delay.is_some()).count();
        let retries = u32::try_from(retries).ok().filter(|n| *n > 0)?;
        Some(self.total_delay / retries)
    }

    pub fn last_attempt(&self) -> Option<&AttemptRecord> {
        self.history.last()
    }
}

impl fmt::Display for ExecutionMetrics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "ExecutionMetrics {{ attempts: {}, total_delay: {:?}, finished_with_response: {}, cancelled: {} }}",
            self.attempts, self.total_delay, self.finished_with_response, self.cancelled
        )
    }
}
