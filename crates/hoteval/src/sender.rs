//! Sender trait and the HTTP implementation.
//!
//! The instrumentation layer hands every finished [`Payload`] to a [`Sender`]
//! together with the transport configuration that is live at call time. The
//! sender performs one delivery attempt: no retry, no queueing.

use async_trait::async_trait;
use hoteval_trace::Payload;
use reqwest::{Client, header};
use std::sync::Arc;

use crate::config::{TransportConfig, USER_AGENT};
use crate::error::{HotEvalError, Result, TransportError};

/// Delivers payloads to the collection endpoint.
#[async_trait]
pub trait Sender: Send + Sync {
    /// Deliver one payload to `transport.base_url` + `payload.path()`.
    async fn send(
        &self,
        transport: &TransportConfig,
        payload: &Payload,
    ) -> std::result::Result<(), TransportError>;

    /// Name used in logs.
    fn name(&self) -> &str;
}

/// A shared sender.
pub type SharedSender = Arc<dyn Sender>;

/// Sends payloads as JSON over HTTP(S).
#[derive(Debug, Clone)]
pub struct HttpSender {
    client: Client,
}

impl HttpSender {
    /// Create a sender with its own connection pool.
    pub fn new() -> Result<Self> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| {
                HotEvalError::Configuration(format!("Failed to create HTTP client: {}", e))
            })?;
        Ok(Self { client })
    }

    /// Use an existing reqwest client.
    pub fn with_client(client: Client) -> Self {
        Self { client }
    }

    /// Add authentication and content headers to a request.
    fn add_headers(
        &self,
        builder: reqwest::RequestBuilder,
        transport: &TransportConfig,
    ) -> reqwest::RequestBuilder {
        builder
            .header(
                header::AUTHORIZATION,
                format!("Bearer {}", transport.api_key),
            )
            .header(header::CONTENT_TYPE, "application/json")
            .header(header::USER_AGENT, USER_AGENT)
    }
}

#[async_trait]
impl Sender for HttpSender {
    async fn send(
        &self,
        transport: &TransportConfig,
        payload: &Payload,
    ) -> std::result::Result<(), TransportError> {
        let url = transport.url_for(payload.path());

        let request = self
            .add_headers(self.client.post(&url), transport)
            .timeout(transport.timeout)
            .json(payload);

        let response = request
            .send()
            .await
            .map_err(|e| TransportError::from_reqwest(&url, e))?;

        response
            .error_for_status()
            .map_err(|e| TransportError::from_reqwest(&url, e))?;
        Ok(())
    }

    fn name(&self) -> &str {
        "http"
    }
}

/// Send through `sender`, logging the attempt and any failure.
pub(crate) async fn deliver(
    sender: &dyn Sender,
    transport: &TransportConfig,
    payload: &Payload,
) -> std::result::Result<(), TransportError> {
    tracing::debug!(
        sender = sender.name(),
        kind = payload.kind(),
        path = payload.path(),
        run_id = payload.run_id(),
        "Sending payload"
    );

    let result = sender.send(transport, payload).await;
    if let Err(ref e) = result {
        tracing::warn!(
            sender = sender.name(),
            kind = payload.kind(),
            run_id = payload.run_id(),
            error = %e,
            "Failed to send payload"
        );
    }
    result
}
