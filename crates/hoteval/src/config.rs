//! Transport settings, agent identity and the registry that holds them.
//!
//! Resolution order for every transport setting is: a non-empty explicit value,
//! then the environment variable (even when set to an empty string), then the
//! built-in default.
//!
//! | Setting            | Variable               | Default                   |
//! |--------------------|------------------------|---------------------------|
//! | API key            | `HOTEVAL_API_KEY`      | none (required)           |
//! | Base URL           | `HOTEVAL_BASE_URL`     | `https://api.hoteval.com` |
//! | Timeout (seconds)  | `HOTEVAL_TIMEOUT_SECS` | `30`                      |
//! | Environment        | `ENVIRONMENT`          | `dev`                     |
//! | Data location      | `DATA_LOCATION`        | `EU`                      |

use std::fmt;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::Duration;

use hoteval_trace::{AgentConfig, DEFAULT_AGENT_TYPE};
use serde::{Deserialize, Serialize};

use crate::error::{HotEvalError, Result};

pub const DEFAULT_BASE_URL: &str = "https://api.hoteval.com";
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_ENVIRONMENT: &str = "dev";
pub const DEFAULT_DATA_LOCATION: &str = "EU";

pub const API_KEY_ENV: &str = "HOTEVAL_API_KEY";
pub const BASE_URL_ENV: &str = "HOTEVAL_BASE_URL";
pub const TIMEOUT_ENV: &str = "HOTEVAL_TIMEOUT_SECS";
pub const ENVIRONMENT_ENV: &str = "ENVIRONMENT";
pub const DATA_LOCATION_ENV: &str = "DATA_LOCATION";

/// User agent sent with every request.
pub const USER_AGENT: &str = concat!("hoteval-rust-sdk/", env!("CARGO_PKG_VERSION"));

/// Explicit overrides passed to `configure`. Unset fields fall back to the
/// environment, then to defaults.
#[derive(Debug, Clone, Default)]
pub struct Settings {
    pub api_key: Option<String>,
    pub base_url: Option<String>,
    pub timeout: Option<Duration>,
    /// Default environment for agents that don't set their own.
    pub environment: Option<String>,
    /// Default data location for agents that don't set their own.
    pub data_location: Option<String>,
}

impl Settings {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn with_environment(mut self, environment: impl Into<String>) -> Self {
        self.environment = Some(environment.into());
        self
    }

    pub fn with_data_location(mut self, data_location: impl Into<String>) -> Self {
        self.data_location = Some(data_location.into());
        self
    }
}

/// Resolved transport configuration.
#[derive(Clone, PartialEq, Eq)]
pub struct TransportConfig {
    pub api_key: String,
    pub base_url: String,
    pub timeout: Duration,
    pub default_environment: String,
    pub default_data_location: String,
}

impl fmt::Debug for TransportConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TransportConfig")
            .field("api_key", &"<redacted>")
            .field("base_url", &self.base_url)
            .field("timeout", &self.timeout)
            .field("default_environment", &self.default_environment)
            .field("default_data_location", &self.default_data_location)
            .finish()
    }
}

fn non_empty(value: &Option<String>) -> Option<String> {
    value.as_ref().filter(|v| !v.is_empty()).cloned()
}

impl TransportConfig {
    /// Resolve settings against the process environment.
    pub fn resolve(settings: &Settings) -> Result<Self> {
        Self::resolve_with(settings, |key| std::env::var(key).ok())
    }

    /// Resolve settings against an arbitrary variable lookup.
    pub fn resolve_with<F>(settings: &Settings, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let pick =
            |explicit: &Option<String>, var: &str| non_empty(explicit).or_else(|| lookup(var));

        let api_key = pick(&settings.api_key, API_KEY_ENV)
            .filter(|k| !k.is_empty())
            .ok_or_else(|| {
                HotEvalError::Configuration(format!(
                    "API key required. Set {API_KEY_ENV} environment variable or pass an API key."
                ))
            })?;

        let base_url = pick(&settings.base_url, BASE_URL_ENV)
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());
        validate_base_url(&base_url)?;

        let timeout = match settings.timeout {
            Some(timeout) => timeout,
            None => match lookup(TIMEOUT_ENV) {
                Some(raw) => parse_timeout(&raw)?,
                None => Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            },
        };
        if timeout.is_zero() {
            return Err(HotEvalError::Configuration(
                "Timeout must be greater than zero".to_string(),
            ));
        }

        Ok(Self {
            api_key,
            base_url: base_url.trim_end_matches('/').to_string(),
            timeout,
            default_environment: pick(&settings.environment, ENVIRONMENT_ENV)
                .unwrap_or_else(|| DEFAULT_ENVIRONMENT.to_string()),
            default_data_location: pick(&settings.data_location, DATA_LOCATION_ENV)
                .unwrap_or_else(|| DEFAULT_DATA_LOCATION.to_string()),
        })
    }

    /// Full URL for an endpoint path.
    pub fn url_for(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }
}

fn validate_base_url(url: &str) -> Result<()> {
    let parsed = reqwest::Url::parse(url)
        .map_err(|e| HotEvalError::Configuration(format!("Invalid base URL {url:?}: {e}")))?;
    match parsed.scheme() {
        "http" | "https" => Ok(()),
        other => Err(HotEvalError::Configuration(format!(
            "Unsupported URL scheme {other:?} in base URL {url:?}"
        ))),
    }
}

fn parse_timeout(raw: &str) -> Result<Duration> {
    raw.trim()
        .parse::<f64>()
        .ok()
        .and_then(|secs| Duration::try_from_secs_f64(secs).ok())
        .ok_or_else(|| {
            HotEvalError::Configuration(format!("Invalid {TIMEOUT_ENV} value: {raw:?}"))
        })
}

/// Arguments for declaring an agent identity.
///
/// Deserializable so applications can keep agent identities in their own
/// config files.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct AgentOptions {
    pub name: String,
    pub version: String,
    /// Falls back to the transport's default environment.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub environment: Option<String>,
    /// Falls back to the transport's default data location.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_location: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Defaults to `sdk_configured`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub agent_type: Option<String>,
}

impl AgentOptions {
    pub fn new(name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
            environment: None,
            data_location: None,
            description: None,
            agent_type: None,
        }
    }

    pub fn with_environment(mut self, environment: impl Into<String>) -> Self {
        self.environment = Some(environment.into());
        self
    }

    pub fn with_data_location(mut self, data_location: impl Into<String>) -> Self {
        self.data_location = Some(data_location.into());
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_agent_type(mut self, agent_type: impl Into<String>) -> Self {
        self.agent_type = Some(agent_type.into());
        self
    }

    /// Validate the options and fill in defaults from `transport`.
    pub fn resolve(&self, transport: &TransportConfig) -> Result<AgentConfig> {
        if self.name.is_empty() {
            return Err(HotEvalError::Configuration(
                "Agent name is required".to_string(),
            ));
        }
        if self.version.is_empty() {
            return Err(HotEvalError::Configuration(
                "Agent version is required".to_string(),
            ));
        }

        let environment =
            non_empty(&self.environment).unwrap_or_else(|| transport.default_environment.clone());
        if environment.is_empty() {
            return Err(HotEvalError::Configuration(
                "Environment is required (set globally or per agent)".to_string(),
            ));
        }

        let data_location = non_empty(&self.data_location)
            .unwrap_or_else(|| transport.default_data_location.clone());
        if data_location.is_empty() {
            return Err(HotEvalError::Configuration(
                "Data location is required (set globally or per agent)".to_string(),
            ));
        }

        Ok(AgentConfig {
            name: self.name.clone(),
            environment,
            data_location,
            version: self.version.clone(),
            description: self.description.clone(),
            agent_type: non_empty(&self.agent_type)
                .unwrap_or_else(|| DEFAULT_AGENT_TYPE.to_string()),
        })
    }
}

/// Snapshot of the registry.
#[derive(Debug, Clone)]
pub struct CurrentConfiguration {
    pub transport: Arc<TransportConfig>,
    /// The current agent, if one has been declared since the last `configure`.
    pub agent: Option<AgentConfig>,
}

#[derive(Debug, Default)]
struct Slots {
    transport: Option<Arc<TransportConfig>>,
    agent: Option<AgentConfig>,
}

/// Holds one transport configuration and one "current agent".
///
/// Both slots are replaced wholesale under a single lock, so readers see either
/// the old or the new value, never a mix. Concurrent writers are last-write-wins.
#[derive(Debug, Default)]
pub struct Registry {
    slots: RwLock<Slots>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> RwLockReadGuard<'_, Slots> {
        self.slots.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, Slots> {
        self.slots.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Replace the transport configuration, resolving against the process
    /// environment. Clears the current agent.
    pub fn configure(&self, settings: &Settings) -> Result<Arc<TransportConfig>> {
        self.install(TransportConfig::resolve(settings)?)
    }

    /// Like [`configure`](Self::configure) with an explicit variable lookup.
    pub fn configure_with<F>(&self, settings: &Settings, lookup: F) -> Result<Arc<TransportConfig>>
    where
        F: Fn(&str) -> Option<String>,
    {
        self.install(TransportConfig::resolve_with(settings, lookup)?)
    }

    /// Install an already-resolved transport configuration. Clears the current agent.
    pub fn install(&self, transport: TransportConfig) -> Result<Arc<TransportConfig>> {
        let transport = Arc::new(transport);
        let mut slots = self.write();
        let replaced_agent = slots.agent.take();
        slots.transport = Some(Arc::clone(&transport));
        drop(slots);

        tracing::info!(
            base_url = %transport.base_url,
            timeout_ms = transport.timeout.as_millis() as u64,
            environment = %transport.default_environment,
            data_location = %transport.default_data_location,
            cleared_agent = replaced_agent.is_some(),
            "HotEval configured"
        );
        Ok(transport)
    }

    /// Declare the current agent. Replaces any previous agent.
    pub fn set_agent(&self, options: &AgentOptions) -> Result<AgentConfig> {
        let mut slots = self.write();
        let transport = slots.transport.as_ref().ok_or_else(not_configured)?;
        let agent = options.resolve(transport)?;
        slots.agent = Some(agent.clone());
        drop(slots);

        tracing::info!(
            agent = %agent.name,
            version = %agent.version,
            environment = %agent.environment,
            data_location = %agent.data_location,
            "Agent set"
        );
        Ok(agent)
    }

    /// The current transport configuration.
    pub fn transport(&self) -> Result<Arc<TransportConfig>> {
        self.read().transport.clone().ok_or_else(not_configured)
    }

    /// The current agent.
    pub fn current_agent(&self) -> Result<AgentConfig> {
        let slots = self.read();
        if slots.transport.is_none() {
            return Err(not_configured());
        }
        slots.agent.clone().ok_or_else(|| {
            HotEvalError::NotConfigured(
                "No agent configured. Call set_agent() or create an Agent first.".to_string(),
            )
        })
    }

    /// Transport and agent, read together.
    pub fn get_current_configuration(&self) -> Result<CurrentConfiguration> {
        let slots = self.read();
        let transport = slots.transport.clone().ok_or_else(not_configured)?;
        Ok(CurrentConfiguration {
            transport,
            agent: slots.agent.clone(),
        })
    }
}

fn not_configured() -> HotEvalError {
    HotEvalError::NotConfigured("HotEval client not configured. Call configure() first.".to_string())
}
