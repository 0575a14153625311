//! # Reattempt Infrastructure
//!
//! Adapters that plug real I/O into `reattempt-core`.
//!
//! This crate contains:
//! - A reqwest-backed [`HttpTransport`] implementing the core transport port
//! - [`HttpRetryPolicy`], the status-code and Retry-After aware HTTP strategy
//! - [`RetrySettings`] and its env/file loader
//!
//! ## Architecture
//! - Implements traits defined in `reattempt-core`
//! - Depends on `reattempt-common` and `reattempt-core`
//! - Contains all "impure" code (network, filesystem, environment)

pub mod config;
pub mod http;

// Re-export commonly used items
pub use config::{BackoffKind, ConfigFormat, RetrySettings};
pub use http::{
    HttpError, HttpRequest, HttpResponse, HttpResult, HttpRetryPolicy, HttpTransport,
    HttpTransportBuilder,
};
