//! # Reattempt Core
//!
//! Transport-agnostic retry engine.
//!
//! This crate contains:
//! - The execution state machine and caller-facing result handles
//! - Retry policy contract and the stock policies
//! - The shared delay scheduler
//! - The transport port (trait) adapters implement
//!
//! ## Architecture Principles
//! - Only depends on `reattempt-common`
//! - No HTTP or platform code; transports plug in through [`Transport`]
//! - Policies are pure and shareable across requests

pub mod execution;

pub use execution::{
    CancelHandle, CancelReason, Completion, DelayScheduler, ExecutionError, ExecutionMetrics,
    ExecutionOrchestrator, ExecutionResult, ExecutionState, ExponentialBackoffPolicy,
    FixedRetryPolicy, NeverRetry, Outcome, ResultHandle, RetryDecision, RetryPolicy, RetrySignal,
    SchedulerError, Transport,
};
