//! Retry settings
//!
//! Durations are written as integer milliseconds (`base_delay_ms`,
//! `max_delay_ms`). Every field is optional in files; missing fields take the
//! engine defaults.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use reattempt_common::error::{CommonError, CommonResult};
use reattempt_common::duration_millis;
use reattempt_core::execution::constants::{
    DEFAULT_BACKOFF_MULTIPLIER, DEFAULT_BASE_DELAY, DEFAULT_MAX_ATTEMPTS, DEFAULT_MAX_DELAY,
    MAX_MAX_ATTEMPTS, MAX_RETRY_DELAY,
};
use reattempt_core::{
    ExecutionResult, ExponentialBackoffPolicy, FixedRetryPolicy, RetryPolicy, RetrySignal,
};
use serde::{Deserialize, Serialize};

/// Delay growth between attempts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackoffKind {
    #[default]
    Fixed,
    Exponential,
}

impl BackoffKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Fixed => "fixed",
            Self::Exponential => "exponential",
        }
    }
}

impl fmt::Display for BackoffKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BackoffKind {
    type Err = CommonError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "fixed" => Ok(Self::Fixed),
            "exponential" => Ok(Self::Exponential),
            other => Err(CommonError::config_field(
                "backoff",
                format!("unknown backoff '{other}', expected 'fixed' or 'exponential'"),
            )),
        }
    }
}

/// User-facing retry configuration
///
/// `max_attempts` counts re-executions after the first call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrySettings {
    pub max_attempts: u32,
    #[serde(rename = "base_delay_ms", with = "duration_millis")]
    pub base_delay: Duration,
    #[serde(rename = "max_delay_ms", with = "duration_millis")]
    pub max_delay: Duration,
    pub respect_retry_after: bool,
    pub backoff: BackoffKind,
    /// Only read for exponential backoff
    pub multiplier: f64,
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            base_delay: DEFAULT_BASE_DELAY,
            max_delay: DEFAULT_MAX_DELAY,
            respect_retry_after: true,
            backoff: BackoffKind::Fixed,
            multiplier: DEFAULT_BACKOFF_MULTIPLIER,
        }
    }
}

impl RetrySettings {
    /// # Errors
    ///
    /// Returns [`CommonError::Config`] naming the first offending field.
    pub fn validate(&self) -> CommonResult<()> {
        if self.max_attempts > MAX_MAX_ATTEMPTS {
            return Err(CommonError::config_field(
                "max_attempts",
                format!("must be at most {MAX_MAX_ATTEMPTS}, got {}", self.max_attempts),
            ));
        }
        if self.max_delay > MAX_RETRY_DELAY {
            return Err(CommonError::config_field(
                "max_delay_ms",
                format!(
                    "must be at most {}ms, got {}ms",
                    MAX_RETRY_DELAY.as_millis(),
                    self.max_delay.as_millis()
                ),
            ));
        }
        if self.base_delay > self.max_delay {
            return Err(CommonError::config_field(
                "base_delay_ms",
                format!(
                    "base delay {}ms exceeds max delay {}ms",
                    self.base_delay.as_millis(),
                    self.max_delay.as_millis()
                ),
            ));
        }
        if !self.multiplier.is_finite() || self.multiplier < 1.0 {
            return Err(CommonError::config_field(
                "multiplier",
                format!("must be a finite value >= 1.0, got {}", self.multiplier),
            ));
        }
        Ok(())
    }

    /// Build the configured policy for any transport whose outcomes expose
    /// [`RetrySignal`]
    ///
    /// # Errors
    ///
    /// Returns an error if the settings fail [`validate`](Self::validate).
    pub fn into_policy<R, E>(self) -> ExecutionResult<Arc<dyn RetryPolicy<R, E>>>
    where
        R: RetrySignal + 'static,
        E: RetrySignal + 'static,
    {
        self.validate()?;

        let policy: Arc<dyn RetryPolicy<R, E>> = match self.backoff {
            BackoffKind::Fixed => {
                let policy = FixedRetryPolicy::new(self.max_attempts, self.base_delay)?;
                if self.respect_retry_after {
                    Arc::new(policy)
                } else {
                    Arc::new(policy.ignore_hints())
                }
            }
            BackoffKind::Exponential => {
                let policy = ExponentialBackoffPolicy::new(
                    self.max_attempts,
                    self.base_delay,
                    self.max_delay,
                )?
                .with_multiplier(self.multiplier)?;
                if self.respect_retry_after {
                    Arc::new(policy)
                } else {
                    Arc::new(policy.ignore_hints())
                }
            }
        };
        Ok(policy)
    }
}

#[cfg(test)]
mod tests {
    use reattempt_core::{ExecutionError, Outcome, RetryDecision};

    use super::*;

    #[derive(Debug)]
    struct Unavailable;

    impl RetrySignal for Unavailable {
        fn is_retryable_failure(&self) -> bool {
            true
        }

        fn retry_hint(&self) -> Option<Duration> {
            Some(Duration::from_secs(7))
        }
    }

    #[test]
    fn defaults_match_engine_constants() {
        let settings = RetrySettings::default();
        assert_eq!(settings.max_attempts, 1);
        assert_eq!(settings.base_delay, Duration::from_secs(1));
        assert_eq!(settings.backoff, BackoffKind::Fixed);
        assert!(settings.validate().is_ok());
    }

    /// Validates `RetrySettings::validate` behavior for the out-of-range
    /// scenario.
    ///
    /// Assertions:
    /// - Confirms an excessive attempt budget is rejected
    /// - Confirms base delay above max delay is rejected
    /// - Confirms a non-finite multiplier is rejected
    /// - Confirms delays beyond the engine ceiling are rejected
    #[test]
    fn validate_rejects_out_of_range_values() {
        let too_many = RetrySettings { max_attempts: MAX_MAX_ATTEMPTS + 1, ..Default::default() };
        assert!(matches!(
            too_many.validate(),
            Err(CommonError::Config { field: Some(ref f), .. }) if f == "max_attempts"
        ));

        let inverted = RetrySettings {
            base_delay: Duration::from_secs(10),
            max_delay: Duration::from_secs(1),
            ..Default::default()
        };
        assert!(inverted.validate().is_err());

        let nan = RetrySettings { multiplier: f64::NAN, ..Default::default() };
        assert!(nan.validate().is_err());

        let huge_base = RetrySettings {
            base_delay: Duration::from_secs(100_000_000),
            max_delay: Duration::from_secs(100_000_000),
            ..Default::default()
        };
        assert!(matches!(
            huge_base.validate(),
            Err(CommonError::Config { field: Some(ref f), .. }) if f == "max_delay_ms"
        ));
    }

    /// Validates `RetrySettings::into_policy` behavior for the hint handling
    /// scenario.
    ///
    /// Assertions:
    /// - Confirms fixed backoff prefers the server hint by default
    /// - Confirms disabling hints falls back to the base delay
    #[test]
    fn into_policy_respects_hint_setting() {
        let outcome: Outcome<Unavailable, Unavailable> = Outcome::Success(Unavailable);

        let policy =
            RetrySettings::default().into_policy::<Unavailable, Unavailable>().expect("policy");
        assert_eq!(policy.decide(&outcome, 1), RetryDecision::retry_after(Duration::from_secs(7)));
        assert_eq!(policy.decide(&outcome, 2), RetryDecision::Stop);

        let settings = RetrySettings {
            respect_retry_after: false,
            base_delay: Duration::from_millis(200),
            ..Default::default()
        };
        let policy = settings.into_policy::<Unavailable, Unavailable>().expect("policy");
        assert_eq!(
            policy.decide(&outcome, 1),
            RetryDecision::retry_after(Duration::from_millis(200))
        );
    }

    #[test]
    fn into_policy_builds_exponential_backoff() {
        let settings = RetrySettings {
            max_attempts: 5,
            base_delay: Duration::from_millis(100),
            max_delay: Duration::from_secs(1),
            respect_retry_after: false,
            backoff: BackoffKind::Exponential,
            multiplier: 3.0,
        };
        let policy = settings.into_policy::<Unavailable, Unavailable>().expect("policy");
        let outcome = Outcome::Failure(Unavailable);

        assert_eq!(policy.name(), "exponential");
        assert_eq!(
            policy.decide(&outcome, 2),
            RetryDecision::retry_after(Duration::from_millis(300))
        );
        assert_eq!(policy.decide(&outcome, 4), RetryDecision::retry_after(Duration::from_secs(1)));
    }

    #[test]
    fn into_policy_surfaces_validation_errors() {
        let settings = RetrySettings { max_attempts: 1_000, ..Default::default() };
        let err = settings.into_policy::<Unavailable, Unavailable>().err().expect("invalid");
        assert!(matches!(err, ExecutionError::Common(CommonError::Config { .. })));
    }

    #[test]
    fn backoff_kind_parses_case_insensitively() {
        assert_eq!("Exponential".parse::<BackoffKind>().expect("parse"), BackoffKind::Exponential);
        assert_eq!(" fixed ".parse::<BackoffKind>().expect("parse"), BackoffKind::Fixed);
        assert!("linear".parse::<BackoffKind>().is_err());
    }
}
