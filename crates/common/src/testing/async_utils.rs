//! Async test helpers
//!
//! All helpers measure time with `tokio::time`, so they behave the same
//! under `#[tokio::test(start_paused = true)]` as on a real clock.

#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]

use std::future::Future;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

/// Await a future with a timeout, returning `Err(Elapsed)` if it does not
/// finish in time
pub async fn timeout_ok<F, T>(duration: Duration, fut: F) -> Result<T, tokio::time::error::Elapsed>
where
    F: Future<Output = T>,
{
    tokio::time::timeout(duration, fut).await
}

/// Poll an async condition every `interval` until it holds or `timeout`
/// passes. Returns whether the condition was observed.
pub async fn poll_until<F, Fut>(timeout: Duration, interval: Duration, mut condition: F) -> bool
where
    F: FnMut() -> Fut,
    Fut: Future<Output = bool>,
{
    let deadline = tokio::time::Instant::now() + timeout;

    loop {
        if condition().await {
            return true;
        }
        if tokio::time::Instant::now() >= deadline {
            return false;
        }
        tokio::time::sleep(interval).await;
    }
}

/// Wait until an attempt counter reaches `expected`
///
/// Test transports bump an `AtomicU32` per invocation; this gives tests a
/// single line to wait for "the third attempt has started".
pub async fn wait_for_count(counter: &AtomicU32, expected: u32, timeout: Duration) -> bool {
    poll_until(timeout, Duration::from_millis(1), || async {
        counter.load(Ordering::SeqCst) >= expected
    })
    .await
}
