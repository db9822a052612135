//! Cross-crate integration and E2E tests
//!
//! These tests drive the public SDK API through the real HTTP sender against a
//! local mock collector and check what arrives on the wire.

use std::time::Duration;

use hoteval::testing::MockCollector;
use hoteval::{
    AgentOptions, Event, HotEval, HotEvalError, Settings, TransportError, USER_AGENT,
    to_attributes,
};
use hoteval_trace::Payload;
use serde_json::json;

/// Client configured against `collector` without reading the process environment.
fn client_for(collector: &MockCollector) -> HotEval {
    let client = HotEval::http().unwrap();
    client
        .registry()
        .configure_with(
            &Settings::new()
                .with_api_key("k")
                .with_base_url(collector.url()),
            |_| None,
        )
        .unwrap();
    client
}

/// E2E Test: configure, declare an agent, start/log/end a run
///
/// Verifies the three messages, their paths, bodies and headers.
#[tokio::test]
async fn test_e2e_run_lifecycle() {
    let collector = MockCollector::start().await;
    let client = client_for(&collector);
    client.set_agent(&AgentOptions::new("bot", "1.0.0")).unwrap();

    let mut run = client
        .start_run("r1", to_attributes(json!({"u": 1})))
        .await
        .unwrap();
    assert_eq!(run.name, "r1");
    assert!(run.end_time.is_none());
    collector.assert_request_count(1);

    let start = &collector.requests()[0];
    assert_eq!(start.method, "POST");
    assert_eq!(start.path, "/v1/runs/start");
    assert_eq!(start.authorization.as_deref(), Some("Bearer k"));
    assert_eq!(start.content_type.as_deref(), Some("application/json"));
    assert_eq!(start.user_agent.as_deref(), Some(USER_AGENT));
    assert_eq!(start.body["type"], "run_start");
    assert_eq!(start.body["run"]["id"], run.id.as_str());
    assert_eq!(start.body["run"]["meta"]["u"], 1);
    assert!(start.body["run"]["end_time"].is_null());
    assert_eq!(start.body["run"]["agent_metadata"]["name"], "bot");
    assert_eq!(start.body["run"]["agent_metadata"]["environment"], "dev");
    assert_eq!(start.body["run"]["agent_metadata"]["data_location"], "EU");

    client
        .log_step(
            &mut run,
            "s1",
            None,
            vec![Event::text("prompt", "hi")],
        )
        .await
        .unwrap();
    assert_eq!(run.steps.len(), 1);
    assert_eq!(run.steps[0].events.len(), 1);
    assert_eq!(run.steps[0].events[0].event_type, "prompt");

    let step = &collector.requests()[1];
    assert_eq!(step.path, "/v1/steps");
    assert_eq!(step.body["type"], "step");
    assert_eq!(step.body["run_id"], run.id.as_str());
    assert_eq!(step.body["step"]["events"][0]["content"], "hi");
    assert!(step.body["step"]["events"][0]["timestamp"].is_string());

    client.end_run(&mut run).await.unwrap();
    assert!(run.end_time.is_some());

    let ends: Vec<Payload> = collector
        .payloads()
        .into_iter()
        .filter(|p| p.kind() == "run_end")
        .collect();
    assert_eq!(ends.len(), 1);
    let end = ends[0].to_value();
    assert!(end["run"]["end_time"].is_string());
    assert!(end["run"].get("agent_metadata").is_none());
    assert_eq!(end["run"]["steps"].as_array().unwrap().len(), 1);

    collector.assert_request_count(3);
    collector.shutdown().await;
}

/// E2E Test: a non-success status surfaces as a transport error and the run
/// survives a failed start.
#[tokio::test]
async fn test_e2e_error_status() {
    let collector = MockCollector::start().await;
    let client = client_for(&collector);
    client.set_agent(&AgentOptions::new("bot", "1")).unwrap();

    collector.respond_with(500);
    let err = client.start_run("r1", None).await.unwrap_err();
    assert!(matches!(
        err.transport(),
        Some(TransportError::Status { status: 500, .. })
    ));
    let mut run = err.into_run().expect("run travels with the error");
    assert_eq!(run.name, "r1");
    assert!(!run.id.is_empty());

    collector.respond_with(200);
    client.log_step(&mut run, "s1", None, vec![]).await.unwrap();
    client.end_run(&mut run).await.unwrap();

    let paths: Vec<String> = collector.requests().into_iter().map(|r| r.path).collect();
    assert_eq!(paths, vec!["/v1/runs/start", "/v1/steps", "/v1/runs/end"]);
    collector.shutdown().await;
}

/// E2E Test: the configured timeout bounds each send.
#[tokio::test]
async fn test_e2e_timeout() {
    let collector = MockCollector::start().await;
    collector.delay_responses(Duration::from_millis(500));

    let client = HotEval::http().unwrap();
    client
        .registry()
        .configure_with(
            &Settings::new()
                .with_api_key("k")
                .with_base_url(collector.url())
                .with_timeout(Duration::from_millis(50)),
            |_| None,
        )
        .unwrap();
    client.set_agent(&AgentOptions::new("bot", "1")).unwrap();

    let err = client.start_run("slow", None).await.unwrap_err();
    assert!(matches!(
        err.transport(),
        Some(TransportError::Timeout { .. })
    ));
    collector.shutdown().await;
}

/// E2E Test: an unreachable endpoint is a transport error.
#[tokio::test]
async fn test_e2e_connection_refused() {
    let client = HotEval::http().unwrap();
    client
        .registry()
        .configure_with(
            &Settings::new()
                .with_api_key("k")
                .with_base_url("http://127.0.0.1:1"),
            |_| None,
        )
        .unwrap();
    let agent = client.agent(AgentOptions::new("bot", "1")).unwrap();

    let err = agent.start_run("r", None).await.unwrap_err();
    assert!(err.is_transport());
    assert_eq!(
        err.transport().unwrap().url(),
        "http://127.0.0.1:1/v1/runs/start"
    );
}

/// E2E Test: configuration errors happen before any network activity.
#[tokio::test]
async fn test_e2e_configuration_errors_send_nothing() {
    let collector = MockCollector::start().await;

    let client = HotEval::http().unwrap();
    let err = client
        .registry()
        .configure_with(&Settings::new().with_base_url(collector.url()), |_| None)
        .unwrap_err();
    assert!(matches!(err, HotEvalError::Configuration(_)));

    let err = client.start_run("r", None).await.unwrap_err();
    assert!(matches!(err, HotEvalError::NotConfigured(_)));

    let client = client_for(&collector);
    let err = client.start_run("r", None).await.unwrap_err();
    assert!(matches!(err, HotEvalError::NotConfigured(_)));

    let err = client.set_agent(&AgentOptions::new("bot", "")).unwrap_err();
    assert!(matches!(err, HotEvalError::Configuration(_)));

    collector.assert_request_count(0);
    collector.shutdown().await;
}

/// E2E Test: the scoped helper closes the run even when the body fails.
#[tokio::test]
async fn test_e2e_scoped_run_closes_on_error() {
    let collector = MockCollector::start().await;
    let client = client_for(&collector);
    let agent = client
        .agent(AgentOptions::new("analytics", "1.5.2").with_data_location("US"))
        .unwrap();

    let result: Result<(), HotEvalError> = agent
        .with_run("analytics-job-789", None, async |run| {
            agent
                .log_step(
                    run,
                    "data_processing",
                    to_attributes(json!({"algorithm": "linear_regression"})),
                    vec![Event::text("data_loaded", "Loaded 10,000 records")],
                )
                .await?;
            Err(HotEvalError::Configuration("analysis failed".to_string()))
        })
        .await;
    assert!(matches!(result, Err(HotEvalError::Configuration(_))));

    let payloads = collector.payloads();
    let kinds: Vec<&str> = payloads.iter().map(Payload::kind).collect();
    assert_eq!(kinds, vec!["run_start", "step", "run_end"]);
    assert_eq!(payloads[0].agent().unwrap().data_location, "US");
    assert!(payloads.iter().all(|p| p.run_id() == payloads[0].run_id()));

    collector.shutdown().await;
}

/// E2E Test: each send uses the configuration that is live at call time.
#[tokio::test]
async fn test_e2e_reconfigure_redirects_later_sends() {
    let first = MockCollector::start().await;
    let second = MockCollector::start().await;

    let client = client_for(&first);
    let agent = client.agent(AgentOptions::new("bot", "1")).unwrap();
    let mut run = agent.start_run("r", None).await.unwrap();

    client
        .registry()
        .configure_with(
            &Settings::new()
                .with_api_key("rotated")
                .with_base_url(second.url()),
            |_| None,
        )
        .unwrap();

    // The agent still carries its identity after the registry was reset.
    agent.end_run(&mut run).await.unwrap();
    first.assert_request_count(1);
    second.assert_request_count(1);
    assert_eq!(
        second.requests()[0].authorization.as_deref(),
        Some("Bearer rotated")
    );

    let next = agent.start_run("r2", None).await.unwrap();
    assert_eq!(second.payloads()[1].agent().unwrap().name, "bot");
    assert_eq!(second.payloads()[1].run_id(), next.id);

    first.shutdown().await;
    second.shutdown().await;
}

/// E2E Test: two agents tracing concurrently keep their runs apart.
#[tokio::test]
async fn test_e2e_concurrent_agents() {
    let collector = MockCollector::start().await;
    let client = client_for(&collector);
    let support = client.agent(AgentOptions::new("support", "2.1.0")).unwrap();
    let analytics = client.agent(AgentOptions::new("analytics", "1.5.2")).unwrap();

    let trace = |agent: hoteval::Agent| async move {
        let mut run = agent.start_run(format!("{}-run", agent.name()), None).await?;
        for i in 0..3 {
            agent
                .log_step(&mut run, format!("step-{i}"), None, vec![])
                .await?;
        }
        agent.end_run(&mut run).await?;
        Ok::<_, HotEvalError>(run)
    };

    let (a, b) = tokio::join!(trace(support), trace(analytics));
    let (a, b) = (a.unwrap(), b.unwrap());

    collector.assert_request_count(10);
    for payload in collector.payloads() {
        if let Some(agent) = payload.agent() {
            let expected = if payload.run_id() == a.id { "support" } else { "analytics" };
            assert_eq!(agent.name, expected);
        }
    }
    assert_ne!(a.id, b.id);
    assert_eq!(a.steps.len(), 3);
    assert_eq!(b.steps.len(), 3);

    collector.shutdown().await;
}
