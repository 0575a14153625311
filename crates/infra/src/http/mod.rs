//! HTTP adapter
//!
//! [`HttpTransport`] sends an [`HttpRequest`] once per attempt and reports
//! either an [`HttpResponse`] (any status, including 503) or an
//! [`HttpError`]. Deciding whether a 503 deserves another attempt is left to
//! the policy, usually [`HttpRetryPolicy`].

pub mod error;
pub mod policy;
pub mod transport;
pub mod types;

pub use error::{HttpError, HttpResult};
pub use policy::HttpRetryPolicy;
pub use transport::{HttpTransport, HttpTransportBuilder};
pub use types::{HttpRequest, HttpResponse};
