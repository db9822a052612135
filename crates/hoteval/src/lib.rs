//! hoteval: client SDK for tracing AI agent runs
//!
//! Instrumented code records **runs** made of **steps** made of **events**,
//! and each lifecycle transition is forwarded to the HotEval collection
//! endpoint as soon as it happens:
//!
//! - `configure` resolves credentials, endpoint and defaults
//! - `Agent` binds a name/version/environment identity to the runs it starts
//! - `start_run`, `log_step`, `end_run` send `run_start`, `step`, `run_end`
//! - `Agent::with_run` ends the run on every exit path
//!
//! Sends are awaited one at a time. Failures come back as
//! [`HotEvalError::Transport`]; the SDK does not retry, buffer or drop them,
//! so the caller decides whether tracing failures matter.
//!
//! # Usage
//!
//! ```rust,no_run
//! use hoteval::{AgentOptions, Event, HotEval, Settings};
//!
//! # async fn demo() -> hoteval::Result<()> {
//! let client = HotEval::http()?;
//! client.configure(&Settings::new().with_api_key("hk_live_..."))?;
//!
//! let agent = client.agent(AgentOptions::new("support-bot", "2.1.0"))?;
//! let mut run = agent.start_run("support-chat-123", None).await?;
//! agent
//!     .log_step(
//!         &mut run,
//!         "llm.call",
//!         None,
//!         vec![Event::text("prompt", "I have a billing question")],
//!     )
//!     .await?;
//! agent.end_run(&mut run).await?;
//! # Ok(())
//! # }
//! ```

pub mod agent;
pub mod client;
pub mod config;
pub mod error;
pub mod sender;

// Testing utilities - available in test builds and with the `testing` feature
#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use agent::Agent;
pub use client::HotEval;
pub use config::{
    AgentOptions, CurrentConfiguration, DEFAULT_BASE_URL, DEFAULT_DATA_LOCATION,
    DEFAULT_ENVIRONMENT, DEFAULT_TIMEOUT_SECS, Registry, Settings, TransportConfig, USER_AGENT,
};
pub use error::{HotEvalError, Result, TransportError};
pub use sender::{HttpSender, Sender, SharedSender};

// Re-export the trace model
pub use hoteval_trace::{
    AgentConfig, Attributes, Event, EventContent, Payload, Run, Step, to_attributes,
};
