//! HTTP transport errors

use reattempt_common::error::{CommonError, ErrorClassification, ErrorSeverity};
use reattempt_common::impl_error_classification;
use reattempt_core::RetrySignal;
use reqwest::{Method, Url};
use thiserror::Error;

/// Failure to obtain a well-formed HTTP response
///
/// Variants raised while talking to the server carry the request method, so
/// policies can restrict retries to idempotent requests.
#[derive(Debug, Error)]
pub enum HttpError {
    #[error("{method} {url}: connection failed: {message}")]
    Connect { method: Method, url: Url, message: String },

    #[error("{method} {url}: request timed out")]
    Timeout { method: Method, url: Url },

    /// Failure while sending the request or reading the response head
    #[error("{method} {url}: request failed: {message}")]
    Request { method: Method, url: Url, message: String },

    /// Failure while reading the response body
    #[error("{method} {url}: failed to read response body: {message}")]
    Body { method: Method, url: Url, message: String },

    #[error("{method} {url}: redirect policy violated: {message}")]
    Redirect { method: Method, url: Url, message: String },

    /// The request could not be turned into a valid wire request
    #[error("invalid request: {message}")]
    Builder { message: String },

    #[error("invalid URL '{url}': {message}")]
    InvalidUrl { url: String, message: String },

    #[error(transparent)]
    Common(#[from] CommonError),
}

impl_error_classification!(HttpError, Common,
    Self::Connect { .. } => {
        retryable: true,
        severity: ErrorSeverity::Warning,
    },
    Self::Timeout { .. } => {
        retryable: true,
        severity: ErrorSeverity::Warning,
    },
    Self::Request { .. } => {
        retryable: true,
        severity: ErrorSeverity::Warning,
    },
    Self::Body { .. } => {
        retryable: true,
        severity: ErrorSeverity::Warning,
    },
    Self::Redirect { .. } => {
        retryable: false,
        severity: ErrorSeverity::Error,
    },
    Self::Builder { .. } => {
        retryable: false,
        severity: ErrorSeverity::Error,
    },
    Self::InvalidUrl { .. } => {
        retryable: false,
        severity: ErrorSeverity::Error,
    }
);

impl HttpError {
    /// Map a reqwest failure for `method url` onto the adapter taxonomy
    pub fn from_reqwest(err: &reqwest::Error, method: &Method, url: &Url) -> Self {
        let method = method.clone();
        let url = err.url().cloned().unwrap_or_else(|| url.clone());
        let message = err.to_string();

        if err.is_builder() {
            return Self::Builder { message };
        }
        if err.is_timeout() {
            return Self::Timeout { method, url };
        }
        if err.is_connect() {
            return Self::Connect { method, url, message };
        }
        if err.is_redirect() {
            return Self::Redirect { method, url, message };
        }
        if err.is_body() || err.is_decode() {
            return Self::Body { method, url, message };
        }
        Self::Request { method, url, message }
    }

    /// Method of the request that failed, when the failure happened on the wire
    pub fn method(&self) -> Option<&Method> {
        match self {
            Self::Connect { method, .. }
            | Self::Timeout { method, .. }
            | Self::Request { method, .. }
            | Self::Body { method, .. }
            | Self::Redirect { method, .. } => Some(method),
            Self::Builder { .. } | Self::InvalidUrl { .. } | Self::Common(_) => None,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::Connect { .. } => "connect",
            Self::Timeout { .. } => "timeout",
            Self::Request { .. } => "request",
            Self::Body { .. } => "body",
            Self::Redirect { .. } => "redirect",
            Self::Builder { .. } => "builder",
            Self::InvalidUrl { .. } => "invalid_url",
            Self::Common(err) => err.kind(),
        }
    }
}

impl RetrySignal for HttpError {
    fn is_retryable_failure(&self) -> bool {
        self.is_retryable()
    }
}

/// Result type for HTTP adapter operations
pub type HttpResult<T> = Result<T, HttpError>;
