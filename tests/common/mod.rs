//! Shared fixtures: a local HTTP endpoint and polling helpers.

#![allow(dead_code)]

use std::{
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    },
    time::Duration,
};

use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    routing::post,
    Router,
};
use parking_lot::Mutex;
use snsim::Settings;

/// One request as seen by the stub.
#[derive(Debug, Clone)]
pub struct Recorded {
    pub headers: HeaderMap,
    pub body: String,
}

#[derive(Clone)]
struct StubState {
    hits: Arc<AtomicUsize>,
    requests: Arc<Mutex<Vec<Recorded>>>,
    fail_first: usize,
    fail_status: StatusCode,
    ok_body: &'static str,
    delay: Duration,
}

/// Local endpoint that fails its first `fail_first` requests with
/// `fail_status`, then answers 200.
pub struct StubEndpoint {
    pub url: String,
    hits: Arc<AtomicUsize>,
    requests: Arc<Mutex<Vec<Recorded>>>,
}

impl StubEndpoint {
    pub fn hits(&self) -> usize {
        self.hits.load(Ordering::SeqCst)
    }

    pub fn requests(&self) -> Vec<Recorded> {
        self.requests.lock().clone()
    }
}

async fn handle(
    State(state): State<StubState>,
    headers: HeaderMap,
    body: String,
) -> (StatusCode, String) {
    let n = state.hits.fetch_add(1, Ordering::SeqCst);
    state.requests.lock().push(Recorded { headers, body });
    if !state.delay.is_zero() {
        tokio::time::sleep(state.delay).await;
    }
    if n < state.fail_first {
        (state.fail_status, format!("stub failure {}", n + 1))
    } else {
        (StatusCode::OK, state.ok_body.to_string())
    }
}

pub async fn spawn_stub(
    fail_first: usize,
    fail_status: StatusCode,
    ok_body: &'static str,
) -> StubEndpoint {
    serve(StubState {
        hits: Arc::new(AtomicUsize::new(0)),
        requests: Arc::new(Mutex::new(Vec::new())),
        fail_first,
        fail_status,
        ok_body,
        delay: Duration::ZERO,
    })
    .await
}

/// Records the request, then holds the response back for `delay`.
pub async fn slow_stub(delay: Duration) -> StubEndpoint {
    serve(StubState {
        hits: Arc::new(AtomicUsize::new(0)),
        requests: Arc::new(Mutex::new(Vec::new())),
        fail_first: 0,
        fail_status: StatusCode::OK,
        ok_body: "",
        delay,
    })
    .await
}

async fn serve(state: StubState) -> StubEndpoint {
    let hits = state.hits.clone();
    let requests = state.requests.clone();

    let app = Router::new().route("/", post(handle)).with_state(state);
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    StubEndpoint {
        url: format!("http://{addr}/"),
        hits,
        requests,
    }
}

/// Always answers 200.
pub async fn ok_stub() -> StubEndpoint {
    spawn_stub(0, StatusCode::OK, "").await
}

/// Always answers `status`.
pub async fn failing_stub(status: StatusCode) -> StubEndpoint {
    spawn_stub(usize::MAX, status, "").await
}

/// Address nothing listens on.
pub async fn closed_endpoint() -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("http://{addr}/")
}

pub fn settings(
    max_retries: u32,
    backoff_ms: u64,
) -> Settings {
    let mut settings = Settings::default();
    settings.http.max_retries = max_retries;
    settings.http.retry_backoff_ms = backoff_ms;
    settings.http.timeout_seconds = 2;
    settings
}

/// Polls `cond` every 10 ms for up to five seconds.
pub async fn wait_until<F>(cond: F)
where
    F: Fn() -> bool,
{
    for _ in 0..500 {
        if cond() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("condition not met within 5s");
}
