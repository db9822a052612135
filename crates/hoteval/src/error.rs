//! Error types for the HotEval SDK.

use hoteval_trace::Run;
use thiserror::Error;

/// Result type alias for SDK operations.
pub type Result<T> = std::result::Result<T, HotEvalError>;

/// Errors surfaced by configuration and instrumentation calls.
#[derive(Debug, Error)]
pub enum HotEvalError {
    /// Required configuration is missing or invalid. Raised before any
    /// network activity.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// An operation was called before `configure` / `set_agent`.
    #[error("Not configured: {0}")]
    NotConfigured(String),

    /// The sender failed to deliver a payload.
    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    /// The run was created but its `run_start` message was not delivered.
    /// The run is carried here so the caller can keep using it.
    #[error("Run {} started but not synced: {source}", .run.id)]
    RunNotSynced {
        run: Box<Run>,
        #[source]
        source: TransportError,
    },

    /// A step was logged against a run that has already ended.
    #[error("Run {run_id} is closed")]
    RunClosed { run_id: String },
}

/// Failure delivering one payload.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TransportError {
    /// Connection failure or any other request-level error.
    #[error("request to {url} failed: {message}")]
    Request { url: String, message: String },

    /// The per-call timeout elapsed.
    #[error("request to {url} timed out")]
    Timeout { url: String },

    /// The endpoint answered with a non-success status.
    #[error("{url} returned HTTP {status}")]
    Status { url: String, status: u16 },
}

impl HotEvalError {
    /// True when the failure came from the sender.
    pub fn is_transport(&self) -> bool {
        matches!(self, Self::Transport(_) | Self::RunNotSynced { .. })
    }

    /// The underlying transport failure, if any.
    pub fn transport(&self) -> Option<&TransportError> {
        match self {
            Self::Transport(e) | Self::RunNotSynced { source: e, .. } => Some(e),
            _ => None,
        }
    }

    /// Recover the run from a failed `start_run`.
    pub fn into_run(self) -> Option<Run> {
        match self {
            Self::RunNotSynced { run, .. } => Some(*run),
            _ => None,
        }
    }
}

impl TransportError {
    /// The URL the failed request was sent to.
    pub fn url(&self) -> &str {
        match self {
            Self::Request { url, .. } | Self::Timeout { url } | Self::Status { url, .. } => url,
        }
    }

    pub(crate) fn from_reqwest(url: &str, e: reqwest::Error) -> Self {
        if e.is_timeout() {
            return Self::Timeout {
                url: url.to_string(),
            };
        }
        match e.status() {
            Some(status) => Self::Status {
                url: url.to_string(),
                status: status.as_u16(),
            },
            None => Self::Request {
                url: url.to_string(),
                message: e.to_string(),
            },
        }
    }
}
