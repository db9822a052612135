//! Wire payloads sent to the collection endpoint.
//!
//! Each lifecycle transition is one independent JSON message:
//!
//! | Message   | Path             | Body                                          |
//! |-----------|------------------|-----------------------------------------------|
//! | run start | `/v1/runs/start` | `{"type": "run_start", "run": {..run, agent_metadata}}` |
//! | run end   | `/v1/runs/end`   | `{"type": "run_end", "run": {..run}}`          |
//! | step      | `/v1/steps`      | `{"type": "step", "run_id": "..", "step": {..}}` |

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::types::{AgentConfig, Run, Step};

pub const RUN_START_PATH: &str = "/v1/runs/start";
pub const RUN_END_PATH: &str = "/v1/runs/end";
pub const STEP_PATH: &str = "/v1/steps";

/// A run annotated with the identity of the agent that started it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentRun {
    #[serde(flatten)]
    pub run: Run,
    pub agent_metadata: AgentConfig,
}

/// One message for the collection endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Payload {
    RunStart { run: AgentRun },
    RunEnd { run: Run },
    Step { run_id: String, step: Step },
}

impl Payload {
    pub fn run_start(run: &Run, agent: &AgentConfig) -> Self {
        Self::RunStart {
            run: AgentRun {
                run: run.clone(),
                agent_metadata: agent.clone(),
            },
        }
    }

    pub fn run_end(run: &Run) -> Self {
        Self::RunEnd { run: run.clone() }
    }

    pub fn step(run_id: impl Into<String>, step: &Step) -> Self {
        Self::Step {
            run_id: run_id.into(),
            step: step.clone(),
        }
    }

    /// Endpoint path, relative to the base URL.
    pub fn path(&self) -> &'static str {
        match self {
            Self::RunStart { .. } => RUN_START_PATH,
            Self::RunEnd { .. } => RUN_END_PATH,
            Self::Step { .. } => STEP_PATH,
        }
    }

    /// The `type` tag as it appears on the wire.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::RunStart { .. } => "run_start",
            Self::RunEnd { .. } => "run_end",
            Self::Step { .. } => "step",
        }
    }

    /// ID of the run this message belongs to.
    pub fn run_id(&self) -> &str {
        match self {
            Self::RunStart { run } => &run.run.id,
            Self::RunEnd { run } => &run.id,
            Self::Step { run_id, .. } => run_id,
        }
    }

    /// Agent identity, present on run start only.
    pub fn agent(&self) -> Option<&AgentConfig> {
        match self {
            Self::RunStart { run } => Some(&run.agent_metadata),
            _ => None,
        }
    }

    pub fn to_value(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }
}
