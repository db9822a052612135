//! Trace data types.
//!
//! A [`Run`] is the root of a trace. It owns an ordered list of [`Step`]s, and
//! each step owns an ordered list of [`Event`]s. Insertion order is occurrence
//! order and is preserved verbatim on the wire.
//!
//! Timestamps serialize as RFC 3339 strings when set and as an explicit `null`
//! when not, so consumers can tell "not ended yet" apart from a missing field.

use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Free-form key/value mapping used for run metadata, step attributes and
/// event metadata.
pub type Attributes = Map<String, Value>;

/// Agent type recorded when the identity was declared through the SDK.
pub const DEFAULT_AGENT_TYPE: &str = "sdk_configured";

/// A complete traced workflow execution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Run {
    /// Unique identifier for this run.
    pub id: String,

    /// Human-readable name (e.g., "support-chat-123").
    pub name: String,

    /// Caller-supplied context.
    pub meta: Option<Attributes>,

    /// Steps in the order they were logged.
    pub steps: Vec<Step>,

    /// When the run started.
    pub start_time: DateTime<Utc>,

    /// When the run ended. `None` while the run is open.
    pub end_time: Option<DateTime<Utc>>,
}

/// One unit of work inside a run, e.g. one model call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Step {
    /// Unique identifier for this step.
    pub id: String,

    /// Step name (e.g., "llm.call", "tool.search").
    pub name: String,

    /// Parameters describing the step (model name, temperature, ...).
    pub attrs: Option<Attributes>,

    /// Events in occurrence order.
    pub events: Vec<Event>,

    /// When the step started.
    pub start_time: DateTime<Utc>,

    /// When the step completed.
    pub end_time: DateTime<Utc>,
}

/// Content carried by an event: plain text or a structured mapping.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum EventContent {
    Text(String),
    Structured(Attributes),
}

/// One atomic occurrence inside a step (a prompt, a tool call, a model output).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    /// Free-form tag (e.g., "prompt", "tool_call", "output").
    #[serde(rename = "type")]
    pub event_type: String,

    /// Event payload.
    pub content: EventContent,

    /// When the event occurred.
    pub timestamp: Option<DateTime<Utc>>,

    /// Event-specific metadata.
    pub metadata: Option<Attributes>,
}

/// Identity and version binding attached to the runs of one agent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentConfig {
    pub name: String,
    /// Deployment environment, e.g. "dev", "staging", "production".
    pub environment: String,
    /// Data residency tag, e.g. "EU".
    pub data_location: String,
    /// Agent version, e.g. "1.0.0", "main".
    pub version: String,
    pub description: Option<String>,
    pub agent_type: String,
}

/// Convert a JSON object into [`Attributes`]. Any other value yields `None`.
pub fn to_attributes(value: Value) -> Option<Attributes> {
    match value {
        Value::Object(map) => Some(map),
        _ => None,
    }
}

fn insert_value(map: &mut Option<Attributes>, key: impl Into<String>, value: impl Serialize) {
    if let Ok(v) = serde_json::to_value(value) {
        map.get_or_insert_with(Map::new).insert(key.into(), v);
    }
}

fn to_json<T: Serialize>(value: &T) -> Value {
    // Every map in the model is keyed by String, so this cannot fail.
    serde_json::to_value(value).unwrap_or(Value::Null)
}

impl Run {
    /// Start a new run now, with a random UUID.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            name: name.into(),
            meta: None,
            steps: Vec::new(),
            start_time: Utc::now(),
            end_time: None,
        }
    }

    /// Replace the run metadata.
    pub fn with_meta_map(mut self, meta: Option<Attributes>) -> Self {
        self.meta = meta;
        self
    }

    /// Add one metadata entry.
    pub fn with_meta(mut self, key: impl Into<String>, value: impl Serialize) -> Self {
        insert_value(&mut self.meta, key, value);
        self
    }

    /// True until the run has been closed.
    pub fn is_open(&self) -> bool {
        self.end_time.is_none()
    }

    pub fn is_closed(&self) -> bool {
        !self.is_open()
    }

    /// Append a step. Steps are never removed.
    pub fn add_step(&mut self, step: Step) {
        self.steps.push(step);
    }

    /// Look up a step by ID.
    pub fn step(&self, id: &str) -> Option<&Step> {
        self.steps.iter().find(|s| s.id == id)
    }

    /// Mark the run as ended now.
    ///
    /// Closing again moves `end_time` forward; it never goes below
    /// `start_time` or the previous `end_time`.
    pub fn close(&mut self) -> DateTime<Utc> {
        let floor = self.end_time.unwrap_or(self.start_time);
        let now = Utc::now().max(floor);
        self.end_time = Some(now);
        now
    }

    /// Wall-clock duration, once closed.
    pub fn duration(&self) -> Option<TimeDelta> {
        self.end_time.map(|end| end - self.start_time)
    }

    /// JSON representation used as the wire body.
    pub fn to_value(&self) -> Value {
        to_json(self)
    }
}

impl Step {
    /// Create a step that starts and ends now.
    pub fn new(name: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            name: name.into(),
            attrs: None,
            events: Vec::new(),
            start_time: now,
            end_time: now,
        }
    }

    /// Create a step that started at `started_at` and ends now.
    pub fn started_at(name: impl Into<String>, started_at: DateTime<Utc>) -> Self {
        let mut step = Self::new(name);
        step.start_time = started_at.min(step.end_time);
        step
    }

    /// Replace the step attributes.
    pub fn with_attrs(mut self, attrs: Option<Attributes>) -> Self {
        self.attrs = attrs;
        self
    }

    /// Add one attribute.
    pub fn with_attr(mut self, key: impl Into<String>, value: impl Serialize) -> Self {
        insert_value(&mut self.attrs, key, value);
        self
    }

    /// Attach events, stamping any that have no timestamp with the step end time.
    pub fn with_events(mut self, events: Vec<Event>) -> Self {
        let at = self.end_time;
        self.events = events.into_iter().map(|e| e.stamped(at)).collect();
        self
    }

    /// Append one event.
    pub fn add_event(&mut self, event: Event) {
        self.events.push(event);
    }

    pub fn duration(&self) -> TimeDelta {
        self.end_time - self.start_time
    }

    pub fn to_value(&self) -> Value {
        to_json(self)
    }
}

impl Event {
    /// Create an event with no timestamp yet.
    pub fn new(event_type: impl Into<String>, content: impl Into<EventContent>) -> Self {
        Self {
            event_type: event_type.into(),
            content: content.into(),
            timestamp: None,
            metadata: None,
        }
    }

    /// Text event, e.g. a prompt or a model output.
    pub fn text(event_type: impl Into<String>, text: impl Into<String>) -> Self {
        Self::new(event_type, EventContent::Text(text.into()))
    }

    /// Structured event, e.g. a tool call with arguments.
    pub fn structured(event_type: impl Into<String>, content: Attributes) -> Self {
        Self::new(event_type, EventContent::Structured(content))
    }

    pub fn with_timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = Some(timestamp);
        self
    }

    /// Add one metadata entry.
    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Serialize) -> Self {
        insert_value(&mut self.metadata, key, value);
        self
    }

    /// Set the timestamp if the caller left it unset. An existing timestamp is kept.
    pub fn stamped(mut self, at: DateTime<Utc>) -> Self {
        self.timestamp.get_or_insert(at);
        self
    }

    pub fn to_value(&self) -> Value {
        to_json(self)
    }
}

impl EventContent {
    /// Text content, if this is a text event.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(t) => Some(t),
            Self::Structured(_) => None,
        }
    }
}

impl From<&str> for EventContent {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}

impl From<String> for EventContent {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}

impl From<Attributes> for EventContent {
    fn from(map: Attributes) -> Self {
        Self::Structured(map)
    }
}

impl AgentConfig {
    /// Build a config from already-resolved values. Validation happens when the
    /// agent is declared, not here.
    pub fn new(
        name: impl Into<String>,
        version: impl Into<String>,
        environment: impl Into<String>,
        data_location: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            environment: environment.into(),
            data_location: data_location.into(),
            version: version.into(),
            description: None,
            agent_type: DEFAULT_AGENT_TYPE.to_string(),
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_agent_type(mut self, agent_type: impl Into<String>) -> Self {
        self.agent_type = agent_type.into();
        self
    }

    pub fn to_value(&self) -> Value {
        to_json(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    #[test]
    fn test_run_creation() {
        let run = Run::new("agent.run");
        assert!(!run.id.is_empty());
        assert!(run.is_open());
        assert!(run.steps.is_empty());
        assert!(run.duration().is_none());
    }

    #[test]
    fn test_ids_are_unique() {
        assert_ne!(Run::new("a").id, Run::new("a").id);
        assert_ne!(Step::new("s").id, Step::new("s").id);
    }

    #[test]
    fn test_event_serialization() {
        let ts = Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap();
        let event = Event::text("prompt", "Hello world")
            .with_timestamp(ts)
            .with_metadata("key", "value");

        let value = event.to_value();
        assert_eq!(value["type"], "prompt");
        assert_eq!(value["content"], "Hello world");
        assert_eq!(value["timestamp"], "2024-01-01T12:00:00Z");
        assert_eq!(value["metadata"], json!({"key": "value"}));
    }

    #[test]
    fn test_unset_fields_serialize_as_null() {
        let event = Event::text("output", "done");
        let value = event.to_value();
        assert!(value["timestamp"].is_null());
        assert!(value.as_object().unwrap().contains_key("metadata"));

        let run = Run::new("open");
        let value = run.to_value();
        assert!(value.as_object().unwrap().contains_key("end_time"));
        assert!(value["end_time"].is_null());
        assert!(value["meta"].is_null());
    }

    #[test]
    fn test_structured_content() {
        let args = json!({"query": "weather", "limit": 3});
        let event = Event::structured("tool_call", args.as_object().unwrap().clone());
        assert!(event.content.as_text().is_none());
        assert_eq!(event.to_value()["content"], args);

        let back: Event = serde_json::from_value(event.to_value()).unwrap();
        assert_eq!(back.content, EventContent::Structured(args.as_object().unwrap().clone()));
    }

    #[test]
    fn test_nested_order_preserved() {
        let mut run = Run::new("agent.run").with_meta("user_id", "u_123");
        for i in 0..3 {
            let events = (0..4)
                .map(|j| Event::text(format!("e{j}"), format!("{i}-{j}")))
                .collect();
            run.add_step(Step::new(format!("step-{i}")).with_events(events));
        }

        let value = run.to_value();
        let steps = value["steps"].as_array().unwrap();
        assert_eq!(steps.len(), 3);
        for (i, step) in steps.iter().enumerate() {
            assert_eq!(step["name"], format!("step-{i}"));
            let events = step["events"].as_array().unwrap();
            assert_eq!(events.len(), 4);
            for (j, event) in events.iter().enumerate() {
                assert_eq!(event["type"], format!("e{j}"));
                assert_eq!(event["content"], format!("{i}-{j}"));
            }
        }
        assert_eq!(value["meta"]["user_id"], "u_123");
    }

    #[test]
    fn test_with_events_stamps_missing_timestamps() {
        let earlier = Utc.with_ymd_and_hms(2020, 5, 1, 0, 0, 0).unwrap();
        let step = Step::new("llm.call").with_events(vec![
            Event::text("prompt", "hi"),
            Event::text("output", "hello").with_timestamp(earlier),
        ]);
        assert_eq!(step.events[0].timestamp, Some(step.end_time));
        assert_eq!(step.events[1].timestamp, Some(earlier));
    }

    #[test]
    fn test_close_never_goes_backwards() {
        let mut run = Run::new("r");
        let first = run.close();
        assert!(first >= run.start_time);
        let second = run.close();
        assert!(second >= first);
        assert_eq!(run.end_time, Some(second));
        assert!(run.is_closed());
        assert!(run.duration().unwrap() >= TimeDelta::zero());
    }

    #[test]
    fn test_step_started_at() {
        let started = Utc::now() - TimeDelta::seconds(2);
        let step = Step::started_at("tool.search", started);
        assert_eq!(step.start_time, started);
        assert!(step.duration() >= TimeDelta::seconds(2));
    }

    #[test]
    fn test_agent_config_serialization() {
        let config = AgentConfig::new("bot", "1.0.0", "dev", "EU").with_description("helper");
        assert_eq!(
            config.to_value(),
            json!({
                "name": "bot",
                "environment": "dev",
                "data_location": "EU",
                "version": "1.0.0",
                "description": "helper",
                "agent_type": "sdk_configured",
            })
        );
    }

    #[test]
    fn test_to_attributes() {
        let attrs = to_attributes(json!({"model": "gpt-4", "temperature": 0.7})).unwrap();
        assert_eq!(attrs["model"], "gpt-4");
        assert!(to_attributes(json!(["not", "a", "map"])).is_none());
    }

    #[test]
    fn test_step_lookup() {
        let mut run = Run::new("r");
        let step = Step::new("s1").with_attr("model", "gpt-4");
        let id = step.id.clone();
        run.add_step(step);
        assert_eq!(run.step(&id).unwrap().attrs.as_ref().unwrap()["model"], "gpt-4");
        assert!(run.step("missing").is_none());
    }
}
