// Constants for the execution engine
use std::time::Duration;

/// Default number of additional attempts after the first one
pub const DEFAULT_MAX_ATTEMPTS: u32 = 1;

/// Default wait between attempts when no server hint is present
pub const DEFAULT_BASE_DELAY: Duration = Duration::from_secs(1);

/// Default cap for exponential backoff delays
pub const DEFAULT_MAX_DELAY: Duration = Duration::from_secs(60);

/// Default growth factor for exponential backoff
pub const DEFAULT_BACKOFF_MULTIPLIER: f64 = 2.0;

/// Maximum allowed max_attempts value
pub const MAX_MAX_ATTEMPTS: u32 = 100;

/// Maximum exponent for exponential backoff calculation to prevent overflow
pub const MAX_BACKOFF_EXPONENT: u32 = 30;

/// How long `DelayScheduler::shutdown` waits for the driver task to exit
pub const SCHEDULER_SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(5);

/// Longest wait any built-in policy requests; longer server hints are clamped
pub const MAX_RETRY_DELAY: Duration = Duration::from_secs(24 * 60 * 60);

/// Longest delay `DelayScheduler::after` accepts. The timer wheel behind the
/// scheduler cannot represent deadlines past roughly two years.
pub const MAX_SCHEDULE_DELAY: Duration = Duration::from_secs(365 * 24 * 60 * 60);
