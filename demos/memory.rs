//! Thread-keyed memory: the same thread remembers, a new thread does not
//!
//! Run with: cargo run --example memory

use std::sync::Arc;
use toolpilot_agent::{build_agent, RunConfig};
use toolpilot_core::{Config, Message, Profile};
use toolpilot_llm::OpenAiProvider;
use toolpilot_tools::Workspace;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::load(None)?;
    let llm = Arc::new(OpenAiProvider::from_config(&config.llm, config.api_key()?));
    let agent = build_agent(
        Profile::Scripting,
        &config,
        llm,
        &Workspace::from_config(&config),
        None,
    )?;

    let first = agent
        .invoke(
            vec![Message::user("Hi! My name is Ada and I write Python scripts.")],
            RunConfig::new("memory-1"),
        )
        .await?;
    println!("[memory-1] {}", first.text());

    let recall = agent
        .invoke(
            vec![Message::user("What is my name?")],
            RunConfig::new("memory-1"),
        )
        .await?;
    println!("[memory-1] {}", recall.text());

    let fresh = agent
        .invoke(
            vec![Message::user("What is my name?")],
            RunConfig::new("memory-2"),
        )
        .await?;
    println!("[memory-2] {}", fresh.text());

    for thread in ["memory-1", "memory-2"] {
        if let Some(state) = agent.state(thread) {
            println!(
                "{}: {} messages, {} tokens",
                thread,
                state.message_count(),
                state.total_usage().total()
            );
        }
    }

    Ok(())
}
