//! One question, no tools and no history
//!
//! Run with: cargo run --example ask -- "What is Structured Text?"

use std::sync::Arc;
use toolpilot_agent::Agent;
use toolpilot_core::Config;
use toolpilot_llm::OpenAiProvider;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::load(None)?;
    let llm = Arc::new(OpenAiProvider::from_config(&config.llm, config.api_key()?));

    let agent = Agent::builder()
        .system_prompt("You are a concise assistant for industrial automation engineers.")
        .llm(llm)
        .tools_enabled(false)
        .build()?;

    let question = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "What is IEC 61131-3 Structured Text?".to_string());

    let response = agent.ask(&question).await?;
    println!("{}", response.text_content());
    println!(
        "\n[{} in / {} out tokens]",
        response.usage.input_tokens, response.usage.output_tokens
    );

    Ok(())
}
