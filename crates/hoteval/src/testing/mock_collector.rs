//! HTTP mock collector for integration testing.
//!
//! Starts a local server that accepts any POST, records it, and answers with a
//! configurable status. Used to exercise [`HttpSender`](crate::HttpSender)
//! end to end.

use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, Method, StatusCode, Uri, header};
use axum::response::IntoResponse;
use axum::{Json, Router};
use hoteval_trace::Payload;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

/// One request received by the collector.
#[derive(Debug, Clone)]
pub struct ReceivedRequest {
    pub method: String,
    pub path: String,
    pub authorization: Option<String>,
    pub content_type: Option<String>,
    pub user_agent: Option<String>,
    /// Body parsed as JSON, or `Null` if it was not JSON.
    pub body: serde_json::Value,
}

impl ReceivedRequest {
    /// Body parsed as a payload.
    pub fn payload(&self) -> Option<Payload> {
        serde_json::from_value(self.body.clone()).ok()
    }
}

#[derive(Debug)]
struct CollectorState {
    requests: Mutex<Vec<ReceivedRequest>>,
    status: Mutex<StatusCode>,
    delay: Mutex<Option<Duration>>,
}

/// A local stand-in for the collection endpoint.
///
/// # Example
///
/// ```ignore
/// use hoteval::testing::MockCollector;
///
/// let collector = MockCollector::start().await;
/// client.configure(&Settings::new().with_api_key("k").with_base_url(collector.url()))?;
/// // ... instrument ...
/// collector.assert_request_count(3);
/// collector.shutdown().await;
/// ```
pub struct MockCollector {
    /// Server address.
    addr: SocketAddr,
    /// Shared with the request handler.
    state: Arc<CollectorState>,
    /// Shutdown signal sender.
    shutdown_tx: Option<oneshot::Sender<()>>,
    /// Server task handle.
    handle: Option<JoinHandle<()>>,
}

impl MockCollector {
    /// Start a collector on a random available port.
    pub async fn start() -> Self {
        let state = Arc::new(CollectorState {
            requests: Mutex::new(Vec::new()),
            status: Mutex::new(StatusCode::OK),
            delay: Mutex::new(None),
        });

        let app = Router::new()
            .fallback(handle_any)
            .with_state(Arc::clone(&state));

        // Bind to a random port
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind mock collector");
        let addr = listener.local_addr().expect("Failed to get local address");

        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();

        let handle = tokio::spawn(async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(async {
                    shutdown_rx.await.ok();
                })
                .await
                .ok();
        });

        // Give the server a moment to start
        tokio::time::sleep(Duration::from_millis(10)).await;

        Self {
            addr,
            state,
            shutdown_tx: Some(shutdown_tx),
            handle: Some(handle),
        }
    }

    /// The collector's base URL.
    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Answer every following request with `status`.
    pub fn respond_with(&self, status: u16) {
        *self.state.status.lock().unwrap() =
            StatusCode::from_u16(status).expect("Invalid status code");
    }

    /// Wait `delay` before answering each following request.
    pub fn delay_responses(&self, delay: Duration) {
        *self.state.delay.lock().unwrap() = Some(delay);
    }

    /// All received requests, in arrival order.
    pub fn requests(&self) -> Vec<ReceivedRequest> {
        self.state.requests.lock().unwrap().clone()
    }

    /// Received bodies that parsed as payloads.
    pub fn payloads(&self) -> Vec<Payload> {
        self.requests()
            .iter()
            .filter_map(ReceivedRequest::payload)
            .collect()
    }

    pub fn request_count(&self) -> usize {
        self.state.requests.lock().unwrap().len()
    }

    /// Assert that exactly N requests were received.
    pub fn assert_request_count(&self, expected: usize) {
        let actual = self.request_count();
        assert_eq!(
            actual, expected,
            "Expected {} requests, but got {}",
            expected, actual
        );
    }

    /// Shutdown the server.
    pub async fn shutdown(mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
        if let Some(handle) = self.handle.take() {
            let _ = handle.await;
        }
    }
}

async fn handle_any(
    State(state): State<Arc<CollectorState>>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> impl IntoResponse {
    let header_value = |name: header::HeaderName| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(String::from)
    };

    let request = ReceivedRequest {
        method: method.to_string(),
        path: uri.path().to_string(),
        authorization: header_value(header::AUTHORIZATION),
        content_type: header_value(header::CONTENT_TYPE),
        user_agent: header_value(header::USER_AGENT),
        body: serde_json::from_slice(&body).unwrap_or(serde_json::Value::Null),
    };
    state.requests.lock().unwrap().push(request);

    let delay = *state.delay.lock().unwrap();
    if let Some(delay) = delay {
        tokio::time::sleep(delay).await;
    }

    let status = *state.status.lock().unwrap();
    (status, Json(serde_json::json!({"status": "ok"})))
}
