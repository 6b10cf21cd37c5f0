//! Streams a scripting task step by step
//!
//! Run with: cargo run --example scripting

use futures::StreamExt;
use std::sync::Arc;
use toolpilot_agent::{build_agent, AgentEvent, RunConfig, StreamMode};
use toolpilot_core::{Config, Message, Profile};
use toolpilot_llm::OpenAiProvider;
use toolpilot_tools::Workspace;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .init();

    let config = Config::load(None)?;
    let llm = Arc::new(OpenAiProvider::from_config(&config.llm, config.api_key()?));
    let agent = build_agent(
        Profile::Scripting,
        &config,
        llm,
        &Workspace::from_config(&config),
        None,
    )?;

    let task = "Check the Python environment, then write hello.py that prints the current \
                date and run it.";
    let run = RunConfig::new("scripting-demo").with_mode(StreamMode::Updates);
    let mut events = agent.stream(vec![Message::user(task)], run);

    let mut step = 0;
    while let Some(event) = events.next().await {
        match event {
            AgentEvent::AgentStep { text, tool_calls, .. } => {
                step += 1;
                println!("--- step {} ---", step);
                if !text.is_empty() {
                    println!("{}", text);
                }
                for call in tool_calls {
                    println!("[calling {} {}]", call.name, call.input);
                }
            }
            AgentEvent::ToolStep { results } => {
                step += 1;
                println!("--- step {} ---", step);
                for result in results {
                    println!("[{}] {}", result.name, result.content);
                }
            }
            AgentEvent::MessageEnd { text, .. } => println!("\nFinal answer:\n{}", text),
            AgentEvent::Error { code, message } => eprintln!("\n[{}] {}", code, message),
            _ => {}
        }
    }

    Ok(())
}
