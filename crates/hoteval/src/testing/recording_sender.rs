//! In-memory sender for testing.
//!
//! Captures delivered payloads and can be told to fail, so instrumentation can
//! be tested without a network.

use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use hoteval_trace::Payload;

use crate::config::TransportConfig;
use crate::error::TransportError;
use crate::sender::Sender;

/// A sender that records payloads instead of sending them.
///
/// Failed sends are counted as attempts but not recorded as payloads.
///
/// # Example
///
/// ```ignore
/// use hoteval::testing::RecordingSender;
///
/// let sender = Arc::new(RecordingSender::new());
/// let client = HotEval::new(sender.clone());
/// // ... instrument ...
/// sender.assert_send_count(3);
/// ```
#[derive(Debug, Default)]
pub struct RecordingSender {
    /// Delivered payloads, in order.
    payloads: Arc<Mutex<Vec<Payload>>>,
    /// Transport configs seen with each delivered payload.
    transports: Arc<Mutex<Vec<TransportConfig>>>,
    /// Every call to `send`, successful or not.
    attempts: Arc<Mutex<usize>>,
    /// Number of upcoming sends to fail.
    fail_next: Arc<Mutex<usize>>,
    /// Paths that always fail.
    failing_paths: Arc<Mutex<HashSet<String>>>,
}

impl RecordingSender {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail the next `n` sends with a 503.
    pub fn fail_next(&self, n: usize) {
        *self.fail_next.lock().unwrap() = n;
    }

    /// Fail every send to `path` with a 503.
    pub fn fail_path(&self, path: impl Into<String>) {
        self.failing_paths.lock().unwrap().insert(path.into());
    }

    /// Stop failing.
    pub fn recover(&self) {
        *self.fail_next.lock().unwrap() = 0;
        self.failing_paths.lock().unwrap().clear();
    }

    /// All delivered payloads.
    pub fn payloads(&self) -> Vec<Payload> {
        self.payloads.lock().unwrap().clone()
    }

    /// Delivered payloads with the given `type` tag.
    pub fn payloads_of_kind(&self, kind: &str) -> Vec<Payload> {
        self.payloads()
            .into_iter()
            .filter(|p| p.kind() == kind)
            .collect()
    }

    /// Paths of delivered payloads, in order.
    pub fn paths(&self) -> Vec<&'static str> {
        self.payloads.lock().unwrap().iter().map(Payload::path).collect()
    }

    pub fn last_payload(&self) -> Option<Payload> {
        self.payloads.lock().unwrap().last().cloned()
    }

    /// Transport config that accompanied the last delivered payload.
    pub fn last_transport(&self) -> Option<TransportConfig> {
        self.transports.lock().unwrap().last().cloned()
    }

    /// Number of delivered payloads.
    pub fn send_count(&self) -> usize {
        self.payloads.lock().unwrap().len()
    }

    /// Number of send calls, including failed ones.
    pub fn attempt_count(&self) -> usize {
        *self.attempts.lock().unwrap()
    }

    /// Assert that exactly N payloads were delivered.
    ///
    /// # Panics
    ///
    /// Panics if the count doesn't match.
    pub fn assert_send_count(&self, expected: usize) {
        let actual = self.send_count();
        assert_eq!(
            actual, expected,
            "Expected {} payloads, but got {}",
            expected, actual
        );
    }

    pub fn clear(&self) {
        self.payloads.lock().unwrap().clear();
        self.transports.lock().unwrap().clear();
        *self.attempts.lock().unwrap() = 0;
    }

    fn should_fail(&self, path: &str) -> bool {
        let mut remaining = self.fail_next.lock().unwrap();
        if *remaining > 0 {
            *remaining -= 1;
            return true;
        }
        self.failing_paths.lock().unwrap().contains(path)
    }
}

#[async_trait]
impl Sender for RecordingSender {
    async fn send(
        &self,
        transport: &TransportConfig,
        payload: &Payload,
    ) -> Result<(), TransportError> {
        *self.attempts.lock().unwrap() += 1;

        if self.should_fail(payload.path()) {
            return Err(TransportError::Status {
                url: transport.url_for(payload.path()),
                status: 503,
            });
        }

        self.payloads.lock().unwrap().push(payload.clone());
        self.transports.lock().unwrap().push(transport.clone());
        Ok(())
    }

    fn name(&self) -> &str {
        "recording"
    }
}
