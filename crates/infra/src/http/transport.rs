use std::time::Duration;

use async_trait::async_trait;
use reattempt_common::error::CommonError;
use reattempt_core::Transport;
use reqwest::header::HeaderMap;
use reqwest::Client as ReqwestClient;
use tracing::debug;

use super::error::{HttpError, HttpResult};
use super::types::{HttpRequest, HttpResponse};

/// reqwest-backed transport that performs exactly one exchange per call
///
/// Retries belong to the orchestrator; the client only carries the
/// per-attempt timeout.
#[derive(Clone, Debug)]
pub struct HttpTransport {
    client: ReqwestClient,
}

impl HttpTransport {
    /// Start building a new HTTP transport.
    pub fn builder() -> HttpTransportBuilder {
        HttpTransportBuilder::default()
    }

    /// Convenience constructor with default configuration.
    ///
    /// # Errors
    ///
    /// Returns [`HttpError::Common`] if the TLS backend cannot be initialised.
    pub fn new() -> HttpResult<Self> {
        Self::builder().build()
    }

    /// Wrap an already configured reqwest client.
    pub fn from_client(client: ReqwestClient) -> Self {
        Self { client }
    }

    /// Perform one exchange for `request`
    ///
    /// A fresh wire request is built from the logical request on every call,
    /// so replays never depend on state consumed by an earlier attempt.
    ///
    /// # Errors
    ///
    /// Returns an [`HttpError`] when no complete response was received.
    pub async fn execute(&self, request: &HttpRequest) -> HttpResult<HttpResponse> {
        let method = request.method().clone();
        let url = request.url().clone();

        let mut builder =
            self.client.request(method.clone(), url.clone()).headers(request.headers().clone());
        if let Some(body) = request.body() {
            builder = builder.body(body.to_vec());
        }
        let wire = builder.build().map_err(|err| HttpError::from_reqwest(&err, &method, &url))?;

        debug!(%method, %url, "sending HTTP request");

        let response = match self.client.execute(wire).await {
            Ok(response) => response,
            Err(err) => {
                debug!(%method, %url, error = %err, "HTTP request failed");
                return Err(HttpError::from_reqwest(&err, &method, &url));
            }
        };

        let status = response.status();
        let headers = response.headers().clone();
        debug!(%method, %url, %status, "received HTTP response");

        let body = response
            .bytes()
            .await
            .map_err(|err| HttpError::from_reqwest(&err, &method, &url))?;

        Ok(HttpResponse::new(status, headers, body.to_vec()))
    }
}

#[async_trait]
impl Transport for HttpTransport {
    type Request = HttpRequest;
    type Response = HttpResponse;
    type Error = HttpError;

    async fn send(&self, request: &HttpRequest) -> HttpResult<HttpResponse> {
        self.execute(request).await
    }
}

/// Builder for [`HttpTransport`].
#[derive(Debug)]
pub struct HttpTransportBuilder {
    timeout: Duration,
    connect_timeout: Option<Duration>,
    user_agent: Option<String>,
    default_headers: Option<HeaderMap>,
}

impl Default for HttpTransportBuilder {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            connect_timeout: None,
            user_agent: None,
            default_headers: None,
        }
    }
}

impl HttpTransportBuilder {
    /// Per-attempt timeout covering connect, send and body read.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = Some(timeout);
        self
    }

    pub fn user_agent(mut self, agent: impl Into<String>) -> Self {
        self.user_agent = Some(agent.into());
        self
    }

    pub fn default_headers(mut self, headers: HeaderMap) -> Self {
        self.default_headers = Some(headers);
        self
    }

    /// # Errors
    ///
    /// Returns [`HttpError::Common`] if reqwest rejects the configuration.
    pub fn build(self) -> HttpResult<HttpTransport> {
        let mut builder = ReqwestClient::builder().timeout(self.timeout).no_proxy();

        if let Some(timeout) = self.connect_timeout {
            builder = builder.connect_timeout(timeout);
        }

        if let Some(agent) = self.user_agent {
            builder = builder.user_agent(agent);
        }

        if let Some(headers) = self.default_headers {
            builder = builder.default_headers(headers);
        }

        let client = builder.build().map_err(|err| {
            HttpError::Common(CommonError::config(format!("failed to build HTTP client: {err}")))
        })?;

        Ok(HttpTransport { client })
    }
}
