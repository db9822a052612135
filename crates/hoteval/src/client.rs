//! Run and step lifecycle operations.
//!
//! [`HotEval`] owns the [`Registry`] and the [`Sender`]. Every operation reads
//! the configuration that is live at call time, builds the trace entity, and
//! awaits exactly one send. Sender failures are returned to the caller; nothing
//! is retried or queued.

use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use hoteval_trace::{AgentConfig, Attributes, Event, Payload, Run, Step};

use crate::agent::Agent;
use crate::config::{AgentOptions, CurrentConfiguration, Registry, Settings, TransportConfig};
use crate::error::{HotEvalError, Result};
use crate::sender::{HttpSender, SharedSender, deliver};

/// Client handle. Cheap to clone; clones share configuration and sender.
#[derive(Clone)]
pub struct HotEval {
    inner: Arc<Inner>,
}

struct Inner {
    registry: Registry,
    sender: SharedSender,
}

impl fmt::Debug for HotEval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HotEval")
            .field("registry", &self.inner.registry)
            .field("sender", &self.inner.sender.name())
            .finish()
    }
}

impl HotEval {
    /// Create an unconfigured client that sends through `sender`.
    pub fn new(sender: SharedSender) -> Self {
        Self {
            inner: Arc::new(Inner {
                registry: Registry::new(),
                sender,
            }),
        }
    }

    /// Create an unconfigured client that sends over HTTP.
    pub fn http() -> Result<Self> {
        Ok(Self::new(Arc::new(HttpSender::new()?)))
    }

    pub fn registry(&self) -> &Registry {
        &self.inner.registry
    }

    /// Replace the transport configuration. See [`Registry::configure`].
    pub fn configure(&self, settings: &Settings) -> Result<Arc<TransportConfig>> {
        self.inner.registry.configure(settings)
    }

    /// Declare the current agent used by [`start_run`](Self::start_run).
    pub fn set_agent(&self, options: &AgentOptions) -> Result<AgentConfig> {
        self.inner.registry.set_agent(options)
    }

    pub fn get_current_configuration(&self) -> Result<CurrentConfiguration> {
        self.inner.registry.get_current_configuration()
    }

    /// Create an [`Agent`] bound to this client. Also makes it the current agent.
    pub fn agent(&self, options: AgentOptions) -> Result<Agent> {
        Agent::new(self, options)
    }

    /// Alias of [`agent`](Self::agent).
    pub fn create_agent(&self, options: AgentOptions) -> Result<Agent> {
        self.agent(options)
    }

    /// Start a run for the current agent and send `run_start`.
    ///
    /// Fails with `NotConfigured` before sending anything if no agent is set.
    /// If the send fails, the run is returned inside
    /// [`HotEvalError::RunNotSynced`].
    pub async fn start_run(&self, name: impl Into<String>, meta: Option<Attributes>) -> Result<Run> {
        let current = self.inner.registry.get_current_configuration()?;
        let agent = current.agent.ok_or_else(|| {
            HotEvalError::NotConfigured(
                "No agent configured. Call set_agent() or create an Agent first.".to_string(),
            )
        })?;
        self.send_run_start(&current.transport, &agent, name.into(), meta)
            .await
    }

    /// Start a run attributed to `agent`, regardless of the current agent.
    pub(crate) async fn start_run_as(
        &self,
        agent: &AgentConfig,
        name: impl Into<String>,
        meta: Option<Attributes>,
    ) -> Result<Run> {
        let transport = self.inner.registry.transport()?;
        self.send_run_start(&transport, agent, name.into(), meta)
            .await
    }

    async fn send_run_start(
        &self,
        transport: &TransportConfig,
        agent: &AgentConfig,
        name: String,
        meta: Option<Attributes>,
    ) -> Result<Run> {
        let run = Run::new(name).with_meta_map(meta);
        let payload = Payload::run_start(&run, agent);

        match deliver(self.inner.sender.as_ref(), transport, &payload).await {
            Ok(()) => {
                tracing::debug!(
                    run_id = %run.id,
                    run = %run.name,
                    agent = %agent.name,
                    "Run started"
                );
                Ok(run)
            }
            Err(source) => Err(HotEvalError::RunNotSynced {
                run: Box::new(run),
                source,
            }),
        }
    }

    /// Log a completed step: start and end time are both now.
    ///
    /// Events without a timestamp are stamped with the logging time. The step
    /// is appended to `run` before sending and stays there if the send fails.
    pub async fn log_step(
        &self,
        run: &mut Run,
        name: impl Into<String>,
        attrs: Option<Attributes>,
        events: Vec<Event>,
    ) -> Result<Step> {
        self.record_step(run, Step::new(name), attrs, events).await
    }

    /// Log a step that started at `started_at` and ends now.
    pub async fn log_timed_step(
        &self,
        run: &mut Run,
        name: impl Into<String>,
        started_at: DateTime<Utc>,
        attrs: Option<Attributes>,
        events: Vec<Event>,
    ) -> Result<Step> {
        self.record_step(run, Step::started_at(name, started_at), attrs, events)
            .await
    }

    async fn record_step(
        &self,
        run: &mut Run,
        step: Step,
        attrs: Option<Attributes>,
        events: Vec<Event>,
    ) -> Result<Step> {
        if run.is_closed() {
            return Err(HotEvalError::RunClosed {
                run_id: run.id.clone(),
            });
        }
        let transport = self.inner.registry.transport()?;

        let step = step.with_attrs(attrs).with_events(events);
        run.add_step(step.clone());

        let payload = Payload::step(run.id.clone(), &step);
        deliver(self.inner.sender.as_ref(), &transport, &payload).await?;
        Ok(step)
    }

    /// Close the run and send `run_end`.
    ///
    /// Not idempotent: each call moves `end_time` forward and sends again.
    pub async fn end_run(&self, run: &mut Run) -> Result<()> {
        let transport = self.inner.registry.transport()?;
        run.close();

        let payload = Payload::run_end(run);
        deliver(self.inner.sender.as_ref(), &transport, &payload).await?;
        tracing::debug!(
            run_id = %run.id,
            steps = run.steps.len(),
            duration_ms = run.duration().map(|d| d.num_milliseconds()).unwrap_or_default(),
            "Run ended"
        );
        Ok(())
    }
}
