//! Trace data model for the HotEval SDK.
//!
//! This crate defines the entities an instrumented agent produces and the
//! messages that carry them to the collection endpoint:
//!
//! - **Types**: `Run`, `Step`, `Event` and `AgentConfig`
//! - **Payload**: the `run_start` / `step` / `run_end` wire messages
//!
//! It performs no I/O. Validation of agent identity happens where the identity
//! is declared (see the `hoteval` crate), not at serialization time.
//!
//! # Usage
//!
//! ```rust
//! use hoteval_trace::{AgentConfig, Event, Payload, Run, Step};
//!
//! let mut run = Run::new("support-chat").with_meta("customer_id", "cust_456");
//! let step = Step::new("llm.call")
//!     .with_attr("model", "gpt-4")
//!     .with_events(vec![
//!         Event::text("prompt", "I have a billing question"),
//!         Event::text("output", "Happy to help"),
//!     ]);
//! run.add_step(step);
//!
//! let agent = AgentConfig::new("support-bot", "2.1.0", "dev", "EU");
//! let payload = Payload::run_start(&run, &agent);
//! assert_eq!(payload.path(), "/v1/runs/start");
//! ```

pub mod payload;
pub mod types;

pub use payload::{AgentRun, Payload, RUN_END_PATH, RUN_START_PATH, STEP_PATH};
pub use types::{
    AgentConfig, Attributes, DEFAULT_AGENT_TYPE, Event, EventContent, Run, Step, to_attributes,
};
