//! Caller-facing result handle
//!
//! Each logical request owns one [`RequestShared`]: attempt tracker, state
//! machine, metrics and a single-assignment completion cell. The orchestrator
//! writes to it; the caller reads through [`ResultHandle`].
//!
//! Every terminal transition goes through [`RequestShared::finish`], which
//! flips the state under the control lock before touching the cell. That
//! lock is what makes completion exactly-once across the attempt task, the
//! scheduler driver and external cancellation.

use std::fmt;
use std::mem;
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::Notify;
use tracing::error;
use uuid::Uuid;

use super::metrics::{AttemptRecord, ExecutionMetrics};
use super::orchestrator::ExecutionState;
use super::outcome::{CancelReason, Completion};
use super::scheduler::{DelayScheduler, ScheduleHandle};
use super::tracing::ExecutionSpan;
use super::tracker::AttemptTracker;

type Listener<R, E> = Box<dyn FnOnce(&Completion<R, E>) + Send + 'static>;

enum Slot<R, E> {
    Pending(Vec<Listener<R, E>>),
    /// The value is out of the slot while listeners run; late listeners
    /// queue here and the running delivery drains them.
    Completing(Vec<Listener<R, E>>),
    Ready(Completion<R, E>),
    Taken,
}

/// Single-assignment cell with listeners and async waiters
struct CompletionCell<R, E> {
    slot: Mutex<Slot<R, E>>,
    notify: Notify,
}

impl<R, E> CompletionCell<R, E> {
    fn new() -> Self {
        Self { slot: Mutex::new(Slot::Pending(Vec::new())), notify: Notify::new() }
    }

    /// Store the completion and run listeners. Returns `false` if the cell
    /// was already complete, which is a programming error.
    fn complete(&self, completion: Completion<R, E>) -> bool {
        let listeners = {
            let mut slot = self.slot.lock();
            match &mut *slot {
                Slot::Pending(listeners) => {
                    let listeners = mem::take(listeners);
                    *slot = Slot::Completing(Vec::new());
                    Some(listeners)
                }
                Slot::Completing(_) | Slot::Ready(_) | Slot::Taken => None,
            }
        };

        debug_assert!(listeners.is_some(), "result handle completed twice");
        let Some(listeners) = listeners else {
            error!("Ignoring second completion of a result handle");
            return false;
        };

        self.deliver(completion, listeners);
        true
    }

    /// Run listeners outside the lock, then park the value as `Ready` and
    /// wake waiters.
    fn deliver(&self, completion: Completion<R, E>, mut listeners: Vec<Listener<R, E>>) {
        loop {
            for listener in mem::take(&mut listeners) {
                listener(&completion);
            }

            let mut slot = self.slot.lock();
            match &mut *slot {
                Slot::Completing(queued) if !queued.is_empty() => {
                    listeners = mem::take(queued);
                }
                _ => {
                    *slot = Slot::Ready(completion);
                    break;
                }
            }
        }
        self.notify.notify_waiters();
    }

    fn is_complete(&self) -> bool {
        !matches!(*self.slot.lock(), Slot::Pending(_))
    }

    fn on_complete(&self, listener: Listener<R, E>) {
        let completion = {
            let mut slot = self.slot.lock();
            match mem::replace(&mut *slot, Slot::Taken) {
                Slot::Pending(mut listeners) => {
                    listeners.push(listener);
                    *slot = Slot::Pending(listeners);
                    return;
                }
                Slot::Completing(mut listeners) => {
                    listeners.push(listener);
                    *slot = Slot::Completing(listeners);
                    return;
                }
                Slot::Ready(completion) => {
                    *slot = Slot::Completing(Vec::new());
                    completion
                }
                Slot::Taken => return,
            }
        };
        self.deliver(completion, vec![listener]);
    }

    fn take(&self) -> Option<Completion<R, E>> {
        let mut slot = self.slot.lock();
        match mem::replace(&mut *slot, Slot::Taken) {
            Slot::Ready(completion) => Some(completion),
            other => {
                *slot = other;
                None
            }
        }
    }

    /// Resolves once the value is `Ready`; a delivery in progress holds it
    /// back until its listeners return.
    async fn wait(&self) -> Completion<R, E> {
        loop {
            let notified = self.notify.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            if let Some(completion) = self.take() {
                return completion;
            }
            notified.await;
        }
    }
}

struct Control {
    state: ExecutionState,
    pending: Option<ScheduleHandle>,
}

/// State shared by the orchestration of one logical request and its handle
pub(crate) struct RequestShared<R, E> {
    request_id: Uuid,
    pub(crate) tracker: AttemptTracker,
    pub(crate) span: ExecutionSpan,
    scheduler: DelayScheduler,
    control: Mutex<Control>,
    metrics: Mutex<ExecutionMetrics>,
    cell: CompletionCell<R, E>,
}

impl<R, E> RequestShared<R, E> {
    pub(crate) fn new(span: ExecutionSpan, scheduler: DelayScheduler) -> Self {
        Self {
            request_id: span.request_id(),
            tracker: AttemptTracker::new(),
            span,
            scheduler,
            control: Mutex::new(Control { state: ExecutionState::NotStarted, pending: None }),
            metrics: Mutex::new(ExecutionMetrics::new()),
            cell: CompletionCell::new(),
        }
    }

    pub(crate) fn state(&self) -> ExecutionState {
        self.control.lock().state
    }

    /// Move to a non-terminal state. Returns `false` once the request is
    /// terminal; the caller must then stop driving it.
    pub(crate) fn transition(&self, next: ExecutionState) -> bool {
        let mut control = self.control.lock();
        if control.state.is_terminal() {
            return false;
        }
        control.state = next;
        if next != ExecutionState::WaitingRetry {
            control.pending = None;
        }
        true
    }

    /// Remember the scheduled retry so cancellation can revoke it. Returns
    /// `false` if the request became terminal meanwhile; the caller then
    /// cancels the handle itself.
    pub(crate) fn attach_pending(&self, handle: ScheduleHandle) -> bool {
        let mut control = self.control.lock();
        if control.state.is_terminal() {
            return false;
        }
        if control.state == ExecutionState::WaitingRetry {
            control.pending = Some(handle);
        }
        true
    }

    pub(crate) fn record_attempt(&self, record: AttemptRecord) {
        self.metrics.lock().record_attempt(record);
    }

    /// Terminal transition; completes the cell at most once
    pub(crate) fn finish(&self, completion: Completion<R, E>) -> bool {
        let terminal = if completion.is_cancelled() {
            ExecutionState::Cancelled
        } else {
            ExecutionState::Completed
        };

        let pending = {
            let mut control = self.control.lock();
            if control.state.is_terminal() {
                return false;
            }
            control.state = terminal;
            control.pending.take()
        };
        if let Some(handle) = pending {
            self.scheduler.cancel(&handle);
        }

        let attempts = self.tracker.attempts();
        {
            let mut metrics = self.metrics.lock();
            match &completion {
                Completion::Finished(outcome) => {
                    metrics.finished_with_response = outcome.is_success();
                    self.span.record_completed(attempts, outcome.kind(), metrics.total_delay);
                }
                Completion::Cancelled(reason) => {
                    metrics.cancelled = true;
                    self.span.record_cancelled(attempts, *reason);
                }
            }
        }

        self.cell.complete(completion)
    }

    pub(crate) fn cancel(&self, reason: CancelReason) -> bool {
        self.tracker.cancel();
        self.finish(Completion::Cancelled(reason))
    }
}

trait Cancel: Send + Sync {
    fn cancel(&self) -> bool;
    fn request_id(&self) -> Uuid;
}

impl<R: Send + Sync, E: Send + Sync> Cancel for RequestShared<R, E> {
    fn cancel(&self) -> bool {
        Self::cancel(self, CancelReason::Caller)
    }

    fn request_id(&self) -> Uuid {
        self.request_id
    }
}

/// Handle to the eventual result of a submitted request
///
/// The request keeps running if the handle is dropped.
pub struct ResultHandle<R, E> {
    shared: Arc<RequestShared<R, E>>,
}

impl<R, E> ResultHandle<R, E>
where
    R: Send + Sync + 'static,
    E: Send + Sync + 'static,
{
    pub(crate) fn new(shared: Arc<RequestShared<R, E>>) -> Self {
        Self { shared }
    }

    pub fn request_id(&self) -> Uuid {
        self.shared.request_id
    }

    /// Current position in the execution state machine
    pub fn state(&self) -> ExecutionState {
        self.shared.state()
    }

    pub fn is_complete(&self) -> bool {
        self.shared.cell.is_complete()
    }

    /// Snapshot of attempt metrics; final once the handle is complete
    pub fn metrics(&self) -> ExecutionMetrics {
        self.shared.metrics.lock().clone()
    }

    /// Register a listener run once with the completion
    ///
    /// Runs immediately on the calling thread if the request is already
    /// complete, otherwise on whichever task completes it. Listeners must not
    /// block.
    pub fn on_complete<F>(&self, listener: F)
    where
        F: FnOnce(&Completion<R, E>) + Send + 'static,
    {
        self.shared.cell.on_complete(Box::new(listener));
    }

    /// Cancel the request. Returns `true` if this call ended it; cancelling
    /// twice or after completion is a no-op returning `false`.
    pub fn cancel(&self) -> bool {
        self.shared.cancel(CancelReason::Caller)
    }

    /// Cloneable cancellation capability that can outlive the handle
    pub fn cancel_handle(&self) -> CancelHandle {
        let shared: Arc<dyn Cancel> = self.shared.clone();
        CancelHandle { shared }
    }

    /// Wait for the final completion
    pub async fn wait(self) -> Completion<R, E> {
        self.shared.cell.wait().await
    }
}

impl<R, E> fmt::Debug for ResultHandle<R, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResultHandle")
            .field("request_id", &self.shared.request_id)
            .field("state", &self.shared.state())
            .finish_non_exhaustive()
    }
}

/// Cancels one logical request; cheap to clone and send across tasks
#[derive(Clone)]
pub struct CancelHandle {
    shared: Arc<dyn Cancel>,
}

impl CancelHandle {
    pub fn cancel(&self) -> bool {
        self.shared.cancel()
    }

    pub fn request_id(&self) -> Uuid {
        self.shared.request_id()
    }
}

impl fmt::Debug for CancelHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CancelHandle").field("request_id", &self.shared.request_id()).finish()
    }
}
