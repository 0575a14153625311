//! Integration tests for HTTP request re-execution.
//!
//! A wiremock server answers `GET /random/2048` with `503 Service
//! Unavailable` and `Retry-After: 1` for the first three requests and with
//! `200 OK` afterwards. The orchestrator drives [`HttpTransport`] against it
//! under different retry budgets.

use std::net::TcpListener;
use std::sync::Arc;
use std::time::{Duration, Instant};

use reattempt_common::testing::{init_test_tracing, timeout_ok};
use reattempt_core::{Completion, DelayScheduler, ExecutionOrchestrator, Outcome, ResultHandle};
use reattempt_infra::{
    HttpError, HttpRequest, HttpResponse, HttpRetryPolicy, HttpTransport, RetrySettings,
};
use reqwest::{Method, StatusCode};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const RESOURCE: &str = "/random/2048";

async fn flaky_server() -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(RESOURCE))
        .respond_with(ResponseTemplate::new(503).insert_header("Retry-After", "1"))
        .up_to_n_times(3)
        .with_priority(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(RESOURCE))
        .respond_with(ResponseTemplate::new(200).set_body_string("random bytes"))
        .with_priority(2)
        .mount(&server)
        .await;
    server
}

fn orchestrator() -> ExecutionOrchestrator<HttpTransport> {
    init_test_tracing();
    let transport = HttpTransport::builder()
        .timeout(Duration::from_secs(5))
        .build()
        .expect("http transport");
    ExecutionOrchestrator::new(Arc::new(transport), DelayScheduler::started())
}

fn request(server: &MockServer) -> HttpRequest {
    HttpRequest::get(&format!("{}{}", server.uri(), RESOURCE)).expect("request")
}

async fn attempts_when_complete(handle: &ResultHandle<HttpResponse, HttpError>) -> u32 {
    let (tx, rx) = tokio::sync::oneshot::channel();
    handle.on_complete(move |_| {
        let _ = tx.send(());
    });
    rx.await.expect("listener invoked");
    handle.metrics().attempts
}

async fn final_response(handle: ResultHandle<HttpResponse, HttpError>) -> HttpResponse {
    let completion =
        timeout_ok(Duration::from_secs(30), handle.wait()).await.expect("request settled in time");
    match completion {
        Completion::Finished(Outcome::Success(response)) => response,
        other => panic!("expected a response, got {other:?}"),
    }
}

/// Validates the give-up scenario against a real HTTP server.
///
/// Assertions:
/// - Confirms a single retry ends with the 503 response
/// - Confirms the server saw exactly two requests
/// - Confirms the one-second Retry-After was honored
#[tokio::test]
async fn gives_up_with_503_after_single_retry() {
    let server = flaky_server().await;
    let policy = HttpRetryPolicy::new(1, Duration::from_millis(10)).expect("policy");
    let started = Instant::now();

    let handle = orchestrator().submit_with(request(&server), policy).expect("submit");
    let response = final_response(handle).await;

    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    assert!(started.elapsed() >= Duration::from_secs(1), "Retry-After ignored");
    let requests = server.received_requests().await.expect("recorded requests");
    assert_eq!(requests.len(), 2);
}

/// Validates the eventual-success scenario against a real HTTP server.
///
/// Assertions:
/// - Confirms five permitted retries end with the 200 response
/// - Confirms the fourth request was the successful one
/// - Confirms the request was replayed unchanged
#[tokio::test]
async fn succeeds_once_server_recovers() {
    let server = flaky_server().await;
    let policy = HttpRetryPolicy::new(5, Duration::from_millis(20))
        .expect("policy")
        .ignore_retry_after();

    let handle = orchestrator().submit_with(request(&server), policy).expect("submit");
    let canceller = handle.cancel_handle();
    let response = final_response(handle).await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.text(), "random bytes");
    assert!(!canceller.cancel(), "completed request must not be cancellable");

    let requests = server.received_requests().await.expect("recorded requests");
    assert_eq!(requests.len(), 4);
    assert!(requests.iter().all(|r| r.url.path() == RESOURCE && r.method.as_str() == "GET"));
}

/// Validates settings-built policies driving the HTTP transport.
///
/// Assertions:
/// - Confirms the fixed policy from settings retries 503 responses
/// - Confirms the server saw every re-execution
#[tokio::test]
async fn settings_policy_drives_http_transport() {
    let server = flaky_server().await;
    let settings = RetrySettings {
        max_attempts: 3,
        base_delay: Duration::from_millis(10),
        respect_retry_after: false,
        ..RetrySettings::default()
    };
    let policy = settings.into_policy::<HttpResponse, HttpError>().expect("policy");

    let handle = orchestrator().submit(request(&server), policy).expect("submit");
    let canceller = handle.cancel_handle();
    let completion = handle.wait().await;

    assert!(matches!(
        completion,
        Completion::Finished(Outcome::Success(ref response)) if response.status() == StatusCode::OK
    ));
    assert!(!canceller.cancel());
    let requests = server.received_requests().await.expect("recorded requests");
    assert_eq!(requests.len(), 4);
}

/// Validates that non-idempotent requests are not re-sent after a transport
/// failure.
///
/// Assertions:
/// - Confirms POST fails after one attempt
/// - Confirms GET to the same dead endpoint uses the full budget
#[tokio::test]
async fn transport_failures_retry_only_idempotent_requests() {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
    let addr = listener.local_addr().expect("local addr");
    drop(listener); // release the port so that requests fail with ECONNREFUSED
    let url = format!("http://{addr}{RESOURCE}");

    let orchestrator = orchestrator();
    let policy = Arc::new(HttpRetryPolicy::new(2, Duration::from_millis(5)).expect("policy"));

    let post = HttpRequest::parse(Method::POST, &url).expect("request").with_body("{}");
    let handle = orchestrator.submit(post, policy.clone()).expect("submit");
    assert_eq!(attempts_when_complete(&handle).await, 1);
    assert!(matches!(
        handle.wait().await,
        Completion::Finished(Outcome::Failure(HttpError::Connect { .. }))
    ));

    let get = HttpRequest::get(&url).expect("request");
    let handle = orchestrator.submit(get, policy).expect("submit");
    assert_eq!(attempts_when_complete(&handle).await, 3);
    let completion = handle.wait().await;
    assert!(matches!(
        completion,
        Completion::Finished(Outcome::Failure(HttpError::Connect { .. }))
    ));
}

/// Validates attempt accounting across the whole exchange.
///
/// Assertions:
/// - Confirms metrics record one attempt per server request
#[tokio::test]
async fn metrics_count_http_attempts() {
    let server = flaky_server().await;
    let policy = HttpRetryPolicy::new(5, Duration::from_millis(5))
        .expect("policy")
        .ignore_retry_after();

    let handle = orchestrator().submit_with(request(&server), policy).expect("submit");
    let (tx, rx) = tokio::sync::oneshot::channel();
    handle.on_complete(move |completion| {
        let _ = tx.send(completion.outcome().is_some_and(Outcome::is_success));
    });

    assert!(rx.await.expect("listener invoked"));
    let metrics = handle.metrics();
    assert_eq!(metrics.attempts, 4);
    assert_eq!(server.received_requests().await.expect("recorded requests").len(), 4);
    assert!(metrics.finished_with_response);
    assert_eq!(metrics.history.len(), 4);
}
