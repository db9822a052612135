//! Agent handles.
//!
//! An [`Agent`] carries its own resolved [`AgentConfig`]. Runs it starts are
//! attributed to that config even if another agent is declared later on the
//! same client, so several agents can trace concurrently in one process.

use std::panic::AssertUnwindSafe;

use chrono::{DateTime, Utc};
use futures::FutureExt;
use hoteval_trace::{AgentConfig, Attributes, Event, Run, Step};

use crate::client::HotEval;
use crate::config::AgentOptions;
use crate::error::{HotEvalError, Result};

/// A named, versioned agent bound to a client.
#[derive(Debug, Clone)]
pub struct Agent {
    client: HotEval,
    config: AgentConfig,
}

impl Agent {
    /// Resolve `options` against the client's configuration and declare the
    /// agent as the client's current agent.
    pub fn new(client: &HotEval, options: AgentOptions) -> Result<Self> {
        let config = client.set_agent(&options)?;
        Ok(Self {
            client: client.clone(),
            config,
        })
    }

    pub fn config(&self) -> &AgentConfig {
        &self.config
    }

    pub fn name(&self) -> &str {
        &self.config.name
    }

    pub fn version(&self) -> &str {
        &self.config.version
    }

    /// Start a run attributed to this agent.
    pub async fn start_run(&self, name: impl Into<String>, meta: Option<Attributes>) -> Result<Run> {
        self.client.start_run_as(&self.config, name, meta).await
    }

    /// See [`HotEval::log_step`].
    pub async fn log_step(
        &self,
        run: &mut Run,
        name: impl Into<String>,
        attrs: Option<Attributes>,
        events: Vec<Event>,
    ) -> Result<Step> {
        self.client.log_step(run, name, attrs, events).await
    }

    /// See [`HotEval::log_timed_step`].
    pub async fn log_timed_step(
        &self,
        run: &mut Run,
        name: impl Into<String>,
        started_at: DateTime<Utc>,
        attrs: Option<Attributes>,
        events: Vec<Event>,
    ) -> Result<Step> {
        self.client
            .log_timed_step(run, name, started_at, attrs, events)
            .await
    }

    /// See [`HotEval::end_run`].
    pub async fn end_run(&self, run: &mut Run) -> Result<()> {
        self.client.end_run(run).await
    }

    /// Run `body` inside a run.
    ///
    /// The run is started before `body` and ended after it on every exit path:
    /// success, error, or panic. If `body` fails, its error is returned and an
    /// `end_run` failure is only logged. If `body` panics, the run is ended and
    /// the panic resumed. If the run cannot be started, `body` is not called.
    ///
    /// ```rust,no_run
    /// # async fn demo(agent: hoteval::Agent) -> hoteval::Result<()> {
    /// use hoteval::{Event, HotEvalError};
    ///
    /// let answer = agent
    ///     .with_run("analytics-job", None, async |run| {
    ///         agent
    ///             .log_step(run, "load", None, vec![Event::text("data_loaded", "10k rows")])
    ///             .await?;
    ///         Ok::<_, HotEvalError>(42)
    ///     })
    ///     .await?;
    /// # Ok(())
    /// # }
    /// ```
    pub async fn with_run<T, E, F>(
        &self,
        name: impl Into<String>,
        meta: Option<Attributes>,
        body: F,
    ) -> std::result::Result<T, E>
    where
        F: AsyncFnOnce(&mut Run) -> std::result::Result<T, E>,
        E: From<HotEvalError>,
    {
        let mut run = self.start_run(name, meta).await?;

        let outcome = AssertUnwindSafe(body(&mut run)).catch_unwind().await;
        let ended = self.end_run(&mut run).await;

        match outcome {
            Ok(Ok(value)) => {
                ended?;
                Ok(value)
            }
            Ok(Err(e)) => {
                if let Err(end_err) = ended {
                    tracing::warn!(run_id = %run.id, error = %end_err, "Failed to end run after error");
                }
                Err(e)
            }
            Err(panic) => {
                if let Err(end_err) = ended {
                    tracing::warn!(run_id = %run.id, error = %end_err, "Failed to end run after panic");
                }
                std::panic::resume_unwind(panic)
            }
        }
    }
}
