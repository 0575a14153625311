//! Logical HTTP request and response values

use std::borrow::Cow;
use std::time::Duration;

use chrono::{DateTime, Utc};
use reattempt_core::RetrySignal;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, RETRY_AFTER};
use reqwest::{Method, StatusCode, Url};

use super::error::{HttpError, HttpResult};

/// Immutable description of an HTTP request
///
/// The body is owned bytes, so the same request can be replayed on every
/// attempt without consuming anything.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpRequest {
    method: Method,
    url: Url,
    headers: HeaderMap,
    body: Option<Vec<u8>>,
}

impl HttpRequest {
    pub fn new(method: Method, url: Url) -> Self {
        Self { method, url, headers: HeaderMap::new(), body: None }
    }

    /// # Errors
    ///
    /// Returns [`HttpError::InvalidUrl`] if `url` does not parse.
    pub fn parse(method: Method, url: &str) -> HttpResult<Self> {
        let parsed = Url::parse(url)
            .map_err(|e| HttpError::InvalidUrl { url: url.to_string(), message: e.to_string() })?;
        Ok(Self::new(method, parsed))
    }

    /// # Errors
    ///
    /// Returns [`HttpError::InvalidUrl`] if `url` does not parse.
    pub fn get(url: &str) -> HttpResult<Self> {
        Self::parse(Method::GET, url)
    }

    #[must_use]
    pub fn with_header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.append(name, value);
        self
    }

    #[must_use]
    pub fn with_body(mut self, body: impl Into<Vec<u8>>) -> Self {
        self.body = Some(body.into());
        self
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn body(&self) -> Option<&[u8]> {
        self.body.as_deref()
    }

    /// Whether repeating the request cannot change server state beyond the
    /// first successful call
    pub fn is_idempotent(&self) -> bool {
        is_idempotent(&self.method)
    }
}

/// GET, HEAD, PUT, DELETE, OPTIONS and TRACE
pub fn is_idempotent(method: &Method) -> bool {
    matches!(
        *method,
        Method::GET | Method::HEAD | Method::PUT | Method::DELETE | Method::OPTIONS | Method::TRACE
    )
}

/// Fully read HTTP response
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    status: StatusCode,
    headers: HeaderMap,
    body: Vec<u8>,
}

impl HttpResponse {
    pub fn new(status: StatusCode, headers: HeaderMap, body: Vec<u8>) -> Self {
        Self { status, headers, body }
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn body(&self) -> &[u8] {
        &self.body
    }

    pub fn text(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.body)
    }

    /// 503 Service Unavailable or 429 Too Many Requests
    pub fn is_unavailable(&self) -> bool {
        matches!(self.status, StatusCode::SERVICE_UNAVAILABLE | StatusCode::TOO_MANY_REQUESTS)
    }

    /// Positive `Retry-After` value, relative to now
    pub fn retry_after(&self) -> Option<Duration> {
        self.retry_after_at(Utc::now())
    }

    /// `Retry-After` evaluated against `now`
    ///
    /// Accepts delta-seconds and HTTP-dates. Zero, past dates and
    /// unparseable values yield `None`.
    pub fn retry_after_at(&self, now: DateTime<Utc>) -> Option<Duration> {
        let raw = self.headers.get(RETRY_AFTER)?.to_str().ok()?.trim();

        if let Ok(seconds) = raw.parse::<u64>() {
            return (seconds > 0).then(|| Duration::from_secs(seconds));
        }

        let date = DateTime::parse_from_rfc2822(raw).ok()?.with_timezone(&Utc);
        let delta = date.signed_duration_since(now).to_std().ok()?;
        (!delta.is_zero()).then_some(delta)
    }
}

impl RetrySignal for HttpResponse {
    fn is_retryable_failure(&self) -> bool {
        self.is_unavailable()
    }

    fn retry_hint(&self) -> Option<Duration> {
        self.retry_after()
    }
}
