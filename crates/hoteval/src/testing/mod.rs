//! Testing utilities for the HotEval SDK.
//!
//! # Components
//!
//! - [`recording_sender`]: in-memory sender that captures payloads and can fail on demand
//! - [`mock_collector`]: HTTP server standing in for the collection endpoint

pub mod mock_collector;
pub mod recording_sender;

pub use mock_collector::{MockCollector, ReceivedRequest};
pub use recording_sender::RecordingSender;
