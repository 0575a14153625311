//! Per-request attempt accounting and cancellation flag

use std::sync::atomic::{AtomicU32, Ordering};

use tokio_util::sync::CancellationToken;

/// Attempt counter plus cancellation token for one logical request
///
/// Attempts are strictly sequential, so `begin` is never raced by another
/// `begin` for the same request; the atomics make it safe against `cancel`
/// arriving from any thread.
#[derive(Debug, Default)]
pub struct AttemptTracker {
    attempts: AtomicU32,
    cancelled: CancellationToken,
}

impl AttemptTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the start of a new attempt and return its 1-based number
    pub fn begin(&self) -> u32 {
        self.attempts.fetch_add(1, Ordering::AcqRel).saturating_add(1)
    }

    /// Number of attempts started so far
    pub fn attempts(&self) -> u32 {
        self.attempts.load(Ordering::Acquire)
    }

    pub fn cancel(&self) {
        self.cancelled.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.is_cancelled()
    }

    /// Resolves once [`cancel`](Self::cancel) has been called
    pub async fn cancelled(&self) {
        self.cancelled.cancelled().await;
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;

    /// Validates `AttemptTracker::begin` numbering starts at 1 and increases
    /// by one.
    #[test]
    fn test_begin_is_monotonic_from_one() {
        let tracker = AttemptTracker::new();
        assert_eq!(tracker.attempts(), 0);
        assert_eq!(tracker.begin(), 1);
        assert_eq!(tracker.begin(), 2);
        assert_eq!(tracker.begin(), 3);
        assert_eq!(tracker.attempts(), 3);
    }

    /// Validates cancellation is idempotent and observable from other tasks.
    ///
    /// Assertions:
    /// - Ensures `is_cancelled` flips after the first `cancel`.
    /// - Ensures a waiter on `cancelled()` is released.
    #[tokio::test(flavor = "multi_thread")]
    async fn test_cancel_is_idempotent_and_wakes_waiters() {
        let tracker = Arc::new(AttemptTracker::new());
        let waiter = {
            let tracker = Arc::clone(&tracker);
            tokio::spawn(async move { tracker.cancelled().await })
        };

        assert!(!tracker.is_cancelled());
        tracker.cancel();
        tracker.cancel();
        assert!(tracker.is_cancelled());

        tokio::time::timeout(std::time::Duration::from_secs(1), waiter)
            .await
            .expect("waiter released")
            .expect("waiter joined");
    }

    /// Validates concurrent `cancel` calls while attempts are counted.
    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_cancel_with_begin() {
        let tracker = Arc::new(AttemptTracker::new());
        let mut tasks = Vec::new();
        for _ in 0..8 {
            let tracker = Arc::clone(&tracker);
            tasks.push(tokio::spawn(async move { tracker.cancel() }));
        }

        let numbers: Vec<u32> = (0..5).map(|_| tracker.begin()).collect();
        for task in tasks {
            task.await.unwrap();
        }

        assert_eq!(numbers, vec![1, 2, 3, 4, 5]);
        assert!(tracker.is_cancelled());
    }
}
