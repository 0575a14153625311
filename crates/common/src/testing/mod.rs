//! Testing utilities
//!
//! - **[`async_utils`]**: timeouts and polling that cooperate with paused
//!   tokio time
//! - **[`tracing`]**: one-shot `tracing-subscriber` setup for test binaries
//!
//! Enabled with the `test-utils` feature.

pub mod async_utils;
pub mod tracing;

pub use async_utils::{poll_until, timeout_ok, wait_for_count};
pub use self::tracing::init_test_tracing;
