//! Shared test helpers for `reattempt-core` integration tests.
//!
//! Provides an in-memory transport that imitates a server answering
//! "unavailable" for its first few requests, plus the reply/fault types the
//! policies inspect.

pub mod transport;
