//! Shared delay scheduler
//!
//! One driver task per scheduler owns a [`DelayQueue`] of pending entries.
//! Callbacks live in a shared map keyed by entry id; firing and cancelling
//! both remove from that map, so whichever gets there first wins and a
//! callback runs at most once.
//!
//! Callbacks always run on the driver task, never in the caller's stack,
//! including zero-delay entries. A panicking callback is logged and does not
//! take the driver down with it.

use std::collections::HashMap;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;

use futures::StreamExt;
use parking_lot::Mutex;
use reattempt_common::error::CommonError;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tokio_util::time::{delay_queue, DelayQueue};
use tracing::{debug, error, info, instrument, trace, warn};

use super::constants::{MAX_SCHEDULE_DELAY, SCHEDULER_SHUTDOWN_TIMEOUT};
use super::error::{SchedulerError, SchedulerResult};

type Callback = Box<dyn FnOnce() + Send + 'static>;

/// Identifies one scheduled callback
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ScheduleHandle(u64);

impl ScheduleHandle {
    pub fn id(&self) -> u64 {
        self.0
    }

    #[cfg(test)]
    pub(crate) fn for_tests(id: u64) -> Self {
        Self(id)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Lifecycle {
    Idle,
    Running,
    ShutDown,
}

enum Command {
    Schedule { id: u64, delay: Duration },
    Cancel { id: u64 },
}

struct Inner {
    lifecycle: Mutex<Lifecycle>,
    callbacks: Mutex<HashMap<u64, Callback>>,
    next_id: AtomicU64,
    commands: Mutex<Option<mpsc::UnboundedSender<Command>>>,
    shutdown: CancellationToken,
    driver: Mutex<Option<JoinHandle<()>>>,
}

/// Process-wide timer service for retry delays
///
/// Cheap to clone; all clones share one driver task.
#[derive(Clone)]
pub struct DelayScheduler {
    inner: Arc<Inner>,
}

impl DelayScheduler {
    /// Create a scheduler that does not accept callbacks until [`start`]ed
    ///
    /// [`start`]: Self::start
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Inner {
                lifecycle: Mutex::new(Lifecycle::Idle),
                callbacks: Mutex::new(HashMap::new()),
                next_id: AtomicU64::new(1),
                commands: Mutex::new(None),
                shutdown: CancellationToken::new(),
                driver: Mutex::new(None),
            }),
        }
    }

    /// Create and start a scheduler in one step
    ///
    /// Must be called from within a tokio runtime.
    pub fn started() -> Self {
        let scheduler = Self::new();
        // A fresh scheduler is always Idle, so start cannot fail here.
        let _ = scheduler.start();
        scheduler
    }

    /// Spawn the driver task
    ///
    /// # Errors
    ///
    /// [`SchedulerError::AlreadyRunning`] if started twice,
    /// [`SchedulerError::ShutDown`] after [`shutdown`](Self::shutdown).
    #[instrument(skip(self))]
    pub fn start(&self) -> SchedulerResult<()> {
        let mut lifecycle = self.inner.lifecycle.lock();
        match *lifecycle {
            Lifecycle::Running => return Err(SchedulerError::AlreadyRunning),
            Lifecycle::ShutDown => return Err(SchedulerError::ShutDown),
            Lifecycle::Idle => {}
        }

        let (tx, rx) = mpsc::unbounded_channel();
        *self.inner.commands.lock() = Some(tx);

        let inner = Arc::downgrade(&self.inner);
        let shutdown = self.inner.shutdown.clone();
        let handle = tokio::spawn(async move {
            drive(inner, rx, shutdown).await;
        });
        *self.inner.driver.lock() = Some(handle);
        *lifecycle = Lifecycle::Running;

        info!("Delay scheduler started");
        Ok(())
    }

    /// Run `callback` once, no earlier than `delay` from now
    ///
    /// # Errors
    ///
    /// [`SchedulerError::NotRunning`] before `start`,
    /// [`SchedulerError::ShutDown`] after `shutdown`, and
    /// [`SchedulerError::DelayTooLong`] for delays above
    /// [`MAX_SCHEDULE_DELAY`]. The callback is dropped without running in
    /// every case.
    pub fn after<F>(&self, delay: Duration, callback: F) -> SchedulerResult<ScheduleHandle>
    where
        F: FnOnce() + Send + 'static,
    {
        if delay > MAX_SCHEDULE_DELAY {
            return Err(SchedulerError::DelayTooLong { delay, max: MAX_SCHEDULE_DELAY });
        }

        let lifecycle = self.inner.lifecycle.lock();
        match *lifecycle {
            Lifecycle::Idle => return Err(SchedulerError::NotRunning),
            Lifecycle::ShutDown => return Err(SchedulerError::ShutDown),
            Lifecycle::Running => {}
        }

        let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);
        self.inner.callbacks.lock().insert(id, Box::new(callback));

        let sent = self
            .inner
            .commands
            .lock()
            .as_ref()
            .is_some_and(|tx| tx.send(Command::Schedule { id, delay }).is_ok());
        if !sent {
            let orphan = self.inner.callbacks.lock().remove(&id);
            drop(lifecycle);
            drop(orphan);
            return Err(SchedulerError::ShutDown);
        }

        trace!(entry = id, delay_ms = delay.as_millis() as u64, "Callback scheduled");
        Ok(ScheduleHandle(id))
    }

    /// Prevent a pending callback from running
    ///
    /// Returns `true` if the callback was still pending. Cancelling a callback
    /// that already fired, is firing, or was already cancelled is a no-op.
    pub fn cancel(&self, handle: &ScheduleHandle) -> bool {
        let removed = self.inner.callbacks.lock().remove(&handle.0);
        let Some(callback) = removed else {
            return false;
        };

        if let Some(tx) = self.inner.commands.lock().as_ref() {
            let _ = tx.send(Command::Cancel { id: handle.0 });
        }
        drop(callback);
        trace!(entry = handle.0, "Callback cancelled");
        true
    }

    /// Number of callbacks scheduled but not yet fired or cancelled
    pub fn pending(&self) -> usize {
        self.inner.callbacks.lock().len()
    }

    pub fn is_running(&self) -> bool {
        *self.inner.lifecycle.lock() == Lifecycle::Running
    }

    pub fn is_shut_down(&self) -> bool {
        *self.inner.lifecycle.lock() == Lifecycle::ShutDown
    }

    /// Stop the driver and drop every pending callback without running it
    ///
    /// Later calls to [`after`](Self::after) fail with
    /// [`SchedulerError::ShutDown`]. Calling `shutdown` again is a no-op.
    ///
    /// # Errors
    ///
    /// Returns a timeout error if the driver task does not exit in time.
    #[instrument(skip(self))]
    pub async fn shutdown(&self) -> SchedulerResult<()> {
        {
            let mut lifecycle = self.inner.lifecycle.lock();
            if *lifecycle == Lifecycle::ShutDown {
                return Ok(());
            }
            *lifecycle = Lifecycle::ShutDown;
        }

        info!("Shutting down delay scheduler");
        self.inner.shutdown.cancel();
        self.inner.commands.lock().take();

        let drained: Vec<Callback> =
            self.inner.callbacks.lock().drain().map(|(_, callback)| callback).collect();
        if !drained.is_empty() {
            debug!(count = drained.len(), "Dropping pending callbacks");
        }
        drop(drained);

        let driver = self.inner.driver.lock().take();
        if let Some(handle) = driver {
            match tokio::time::timeout(SCHEDULER_SHUTDOWN_TIMEOUT, handle).await {
                Ok(Ok(())) => {}
                Ok(Err(join_error)) => {
                    warn!(error = %join_error, "Delay scheduler driver ended abnormally");
                }
                Err(_) => {
                    return Err(CommonError::timeout(
                        "delay_scheduler_shutdown",
                        SCHEDULER_SHUTDOWN_TIMEOUT,
                    )
                    .into());
                }
            }
        }

        info!("Delay scheduler stopped");
        Ok(())
    }
}

impl Default for DelayScheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for DelayScheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DelayScheduler")
            .field("lifecycle", &*self.inner.lifecycle.lock())
            .field("pending", &self.pending())
            .finish()
    }
}

// Holds only a weak reference so dropping the last scheduler clone closes the
// command channel and ends the driver.
async fn drive(
    inner: Weak<Inner>,
    mut commands: mpsc::UnboundedReceiver<Command>,
    shutdown: CancellationToken,
) {
    let mut queue: DelayQueue<u64> = DelayQueue::new();
    let mut keys: HashMap<u64, delay_queue::Key> = HashMap::new();

    loop {
        tokio::select! {
            biased;
            () = shutdown.cancelled() => {
                debug!("Delay scheduler driver cancelled");
                break;
            }
            command = commands.recv() => match command {
                Some(Command::Schedule { id, delay }) => {
                    let key = queue.insert(id, delay);
                    keys.insert(id, key);
                }
                Some(Command::Cancel { id }) => {
                    if let Some(key) = keys.remove(&id) {
                        queue.try_remove(&key);
                    }
                }
                None => break,
            },
            Some(expired) = queue.next(), if !queue.is_empty() => {
                let id = expired.into_inner();
                keys.remove(&id);
                let Some(inner) = inner.upgrade() else {
                    break;
                };
                let callback = inner.callbacks.lock().remove(&id);
                drop(inner);
                if let Some(callback) = callback {
                    trace!(entry = id, "Callback fired");
                    if panic::catch_unwind(AssertUnwindSafe(callback)).is_err() {
                        error!(entry = id, "Scheduled callback panicked");
                    }
                }
            }
        }
    }
}
