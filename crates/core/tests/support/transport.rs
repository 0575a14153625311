use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use reattempt_core::{RetrySignal, Transport};

/// Minimal HTTP-like reply
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    pub status: u16,
    pub retry_after: Option<Duration>,
}

impl RetrySignal for Reply {
    fn is_retryable_failure(&self) -> bool {
        matches!(self.status, 429 | 503)
    }

    fn retry_hint(&self) -> Option<Duration> {
        self.retry_after
    }
}

/// Transport-level failure
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fault {
    pub transient: bool,
}

impl RetrySignal for Fault {
    fn is_retryable_failure(&self) -> bool {
        self.transient
    }
}

/// What the transport does for one call
#[derive(Debug, Clone)]
pub enum Step {
    Reply(Reply),
    Fail(Fault),
    /// Sleep before replying, to keep an attempt in flight
    Slow(Duration, Reply),
}

/// Scripted in-memory transport
///
/// The first `unavailable_for` calls answer 503 (with an optional
/// Retry-After hint); later calls answer 200. A custom script overrides that
/// behavior call by call.
pub struct ScriptedTransport {
    calls: AtomicU32,
    unavailable_for: u32,
    hint: Option<Duration>,
    script: Mutex<Vec<Step>>,
    requests: Mutex<Vec<String>>,
}

impl ScriptedTransport {
    pub fn unavailable_for(count: u32) -> Arc<Self> {
        Self::build(count, None, Vec::new())
    }

    pub fn unavailable_with_hint(count: u32, hint: Duration) -> Arc<Self> {
        Self::build(count, Some(hint), Vec::new())
    }

    pub fn scripted(steps: Vec<Step>) -> Arc<Self> {
        Self::build(0, None, steps)
    }

    fn build(unavailable_for: u32, hint: Option<Duration>, steps: Vec<Step>) -> Arc<Self> {
        let mut script = steps;
        script.reverse();
        Arc::new(Self {
            calls: AtomicU32::new(0),
            unavailable_for,
            hint,
            script: Mutex::new(script),
            requests: Mutex::new(Vec::new()),
        })
    }

    pub fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn call_counter(&self) -> &AtomicU32 {
        &self.calls
    }

    pub fn requests(&self) -> Vec<String> {
        self.requests.lock().clone()
    }
}

pub fn ok() -> Reply {
    Reply { status: 200, retry_after: None }
}

pub fn unavailable() -> Reply {
    Reply { status: 503, retry_after: None }
}

#[async_trait]
impl Transport for ScriptedTransport {
    type Request = String;
    type Response = Reply;
    type Error = Fault;

    async fn send(&self, request: &String) -> Result<Reply, Fault> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        self.requests.lock().push(request.clone());

        let step = self.script.lock().pop();
        match step {
            Some(Step::Reply(reply)) => Ok(reply),
            Some(Step::Fail(fault)) => Err(fault),
            Some(Step::Slow(delay, reply)) => {
                tokio::time::sleep(delay).await;
                Ok(reply)
            }
            None if call <= self.unavailable_for => {
                Ok(Reply { status: 503, retry_after: self.hint })
            }
            None => Ok(ok()),
        }
    }
}
