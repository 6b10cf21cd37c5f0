//! A coordinator handing AX project and build work to sub-agents
//!
//! Run with: cargo run --example delegated

use futures::StreamExt;
use std::sync::Arc;
use toolpilot_agent::{build_agent, AgentEvent, RunConfig, StreamMode};
use toolpilot_core::{Config, Message, Profile};
use toolpilot_llm::OpenAiProvider;
use toolpilot_tools::Workspace;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::load(None)?;
    let llm = Arc::new(OpenAiProvider::from_config(&config.llm, config.api_key()?));
    let agent = build_agent(
        Profile::Delegated,
        &config,
        llm,
        &Workspace::from_config(&config),
        None,
    )?;

    let task = "Check the AX environment, create an app project named conveyor in the \
                working directory, then install its packages and build it.";

    // Custom mode delivers only the progress lines reported by tools and sub-agents.
    let run = RunConfig::new("delegated-demo").with_mode(StreamMode::Custom);
    let mut events = agent.stream(vec![Message::user(task)], run);

    while let Some(event) = events.next().await {
        match event {
            AgentEvent::Progress { message } => println!("  > {}", message),
            AgentEvent::MessageEnd { text, .. } => println!("\n{}", text),
            AgentEvent::Error { code, message } => eprintln!("[{}] {}", code, message),
            _ => {}
        }
    }

    if let Some(state) = agent.state("delegated-demo") {
        println!(
            "\n{} messages on the coordinator thread, {} with tool calls",
            state.message_count(),
            state.tool_calling_messages()
        );
    }

    Ok(())
}
