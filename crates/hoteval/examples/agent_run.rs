//! Demo of tracing a support agent against a local mock collector.
//!
//! Run with `cargo run -p hoteval --example agent_run --features testing`.
//! Set `RUST_LOG=hoteval=debug` to see every send.

use std::time::Duration;

use chrono::Utc;
use hoteval::testing::MockCollector;
use hoteval::{AgentOptions, Event, HotEval, HotEvalError, Settings, to_attributes};
use serde_json::json;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(filter)
        .init();
}

async fn simulate_tool_call(name: &str) -> String {
    // Simulate some work
    tokio::time::sleep(Duration::from_millis(5)).await;
    format!("{name}: 3 results")
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_logging();

    let collector = MockCollector::start().await;

    let client = HotEval::http()?;
    client.configure(
        &Settings::new()
            .with_api_key("demo-key")
            .with_base_url(collector.url())
            .with_environment("staging"),
    )?;

    let support = client.agent(
        AgentOptions::new("customer-support-chatbot", "2.1.0")
            .with_description("AI chatbot for customer support inquiries"),
    )?;

    let answer = support
        .with_run(
            "support-chat-123",
            to_attributes(json!({"customer_id": "cust_456", "inquiry_type": "billing"})),
            async |run| {
                support
                    .log_step(
                        run,
                        "process_inquiry",
                        to_attributes(json!({"model": "gpt-4", "temperature": 0.7})),
                        vec![
                            Event::text("user_input", "I have a billing question"),
                            Event::text("response", "Happy to help with your billing question"),
                        ],
                    )
                    .await?;

                let started = Utc::now();
                let result = simulate_tool_call("search_invoices").await;
                support
                    .log_timed_step(
                        run,
                        "tool.search_invoices",
                        started,
                        None,
                        vec![
                            Event::structured(
                                "tool_call",
                                to_attributes(json!({"query": "last invoice"}))
                                    .unwrap_or_default(),
                            ),
                            Event::text("tool_result", result.clone()),
                        ],
                    )
                    .await?;

                Ok::<_, HotEvalError>(result)
            },
        )
        .await?;

    // Print summary
    println!("Agent answer: {answer}");
    println!("Requests received: {}", collector.request_count());
    for request in collector.requests() {
        println!("  {} {}", request.method, request.path);
    }

    // Print the final run as the collector saw it
    if let Some(end) = collector.payloads().iter().find(|p| p.kind() == "run_end") {
        println!("\n--- run_end payload ---");
        println!("{}", serde_json::to_string_pretty(end)?);
    }

    collector.shutdown().await;
    Ok(())
}
