// Copyright 2025 Fleet Bench Contributors
// SPDX-License-Identifier: Apache-2.0

//! A throwaway collector for exercising submission end to end.
//!
//! The server runs on its own thread with a current-thread Tokio runtime and
//! listens on an ephemeral loopback port. It records every request and
//! answers with a fixed status and body.

use std::collections::HashMap;
use std::net::{SocketAddr, TcpListener as StdTcpListener};
use std::sync::{mpsc, Arc, Mutex};
use std::thread::JoinHandle;
use std::time::Duration;

use axum::body::Bytes;
use axum::extract::State;
use axum::http::{header, HeaderMap, Method, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use axum::Router;
use tokio::sync::oneshot;

/// Path the collector reports in [`TestCollector::url`].
pub const RESULTS_PATH: &str = "/api/results";

/// One request received by a [`TestCollector`].
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    /// HTTP method.
    pub method: String,
    /// Request path.
    pub path: String,
    /// Headers, lowercased names.
    pub headers: HashMap<String, String>,
    /// Body parsed as JSON, or `Null` if it was not JSON.
    pub body: serde_json::Value,
}

impl RecordedRequest {
    /// Value of a header by lowercase name.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).map(String::as_str)
    }
}

#[derive(Debug)]
struct Reply {
    status: StatusCode,
    body: String,
    location: Option<String>,
    delay: Duration,
}

#[derive(Debug)]
struct CollectorState {
    reply: Mutex<Reply>,
    requests: Mutex<Vec<RecordedRequest>>,
}

/// In-process HTTP collector. Shuts down when dropped.
#[derive(Debug)]
pub struct TestCollector {
    addr: SocketAddr,
    state: Arc<CollectorState>,
    shutdown: Option<oneshot::Sender<()>>,
    thread: Option<JoinHandle<()>>,
}

impl TestCollector {
    /// Start a collector answering every request with `status` and `body`.
    pub fn start(status: u16, body: &str) -> Self {
        Self::spawn(Reply {
            status: StatusCode::from_u16(status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR),
            body: body.to_string(),
            location: None,
            delay: Duration::ZERO,
        })
    }

    /// Start a collector answering `302 Found` pointing at `location`.
    pub fn redirecting(location: &str) -> Self {
        Self::spawn(Reply {
            status: StatusCode::FOUND,
            body: String::new(),
            location: Some(location.to_string()),
            delay: Duration::ZERO,
        })
    }

    /// Delay every reply by `delay`.
    pub fn with_delay(self, delay: Duration) -> Self {
        if let Ok(mut reply) = self.state.reply.lock() {
            reply.delay = delay;
        }
        self
    }

    /// A loopback URL nothing listens on.
    pub fn refused_url() -> String {
        let listener = StdTcpListener::bind("127.0.0.1:0").expect("bind ephemeral port");
        let addr = listener.local_addr().expect("local addr");
        drop(listener);
        format!("http://{}{}", addr, RESULTS_PATH)
    }

    /// Submission URL of this collector.
    pub fn url(&self) -> String {
        format!("http://{}{}", self.addr, RESULTS_PATH)
    }

    /// Requests received so far.
    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.state
            .requests
            .lock()
            .map(|requests| requests.clone())
            .unwrap_or_default()
    }

    fn spawn(reply: Reply) -> Self {
        let state = Arc::new(CollectorState {
            reply: Mutex::new(reply),
            requests: Mutex::new(Vec::new()),
        });
        let (addr_tx, addr_rx) = mpsc::channel();
        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
        let app = Router::new().fallback(record).with_state(Arc::clone(&state));

        let thread = std::thread::spawn(move || {
            let runtime = tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
                .expect("test collector runtime");
            runtime.block_on(async move {
                let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
                    .await
                    .expect("bind test collector");
                addr_tx
                    .send(listener.local_addr().expect("local addr"))
                    .expect("report collector address");
                axum::serve(listener, app)
                    .with_graceful_shutdown(async {
                        let _ = shutdown_rx.await;
                    })
                    .await
                    .expect("serve test collector");
            });
        });

        let addr = addr_rx.recv().expect("test collector failed to start");
        Self {
            addr,
            state,
            shutdown: Some(shutdown_tx),
            thread: Some(thread),
        }
    }
}

impl Drop for TestCollector {
    fn drop(&mut self) {
        if let Some(shutdown) = self.shutdown.take() {
            let _ = shutdown.send(());
        }
        if let Some(thread) = self.thread.take() {
            let _ = thread.join();
        }
    }
}

async fn record(
    State(state): State<Arc<CollectorState>>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let recorded = RecordedRequest {
        method: method.to_string(),
        path: uri.path().to_string(),
        headers: headers
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|v| (name.as_str().to_string(), v.to_string()))
            })
            .collect(),
        body: serde_json::from_slice(&body).unwrap_or(serde_json::Value::Null),
    };
    if let Ok(mut requests) = state.requests.lock() {
        requests.push(recorded);
    }

    let (status, body, location, delay) = match state.reply.lock() {
        Ok(reply) => (
            reply.status,
            reply.body.clone(),
            reply.location.clone(),
            reply.delay,
        ),
        Err(_) => (StatusCode::INTERNAL_SERVER_ERROR, String::new(), None, Duration::ZERO),
    };
    if !delay.is_zero() {
        tokio::time::sleep(delay).await;
    }

    match location {
        Some(location) => (status, [(header::LOCATION, location)], body).into_response(),
        None => (status, body).into_response(),
    }
}
