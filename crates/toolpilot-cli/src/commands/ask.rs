use colored::Colorize;
use toolpilot_agent::Agent;
use toolpilot_core::Config;

use super::create_provider;

pub async fn run(config: &Config, question: &str, system: Option<&str>) -> anyhow::Result<()> {
    let mut builder = Agent::builder()
        .model(&config.llm.model)
        .llm(create_provider(config)?)
        .tools_enabled(false);
    if let Some(system) = system {
        builder = builder.system_prompt(system);
    }
    if let Some(temperature) = config.llm.temperature {
        builder = builder.temperature(temperature);
    }
    let agent = builder
        .build()
        .map_err(|e| anyhow::anyhow!("Failed to create agent: {}", e))?;

    match agent.ask(question).await {
        Ok(response) => {
            println!("{}", response.text_content());
            if !response.usage.is_zero() {
                let usage = format!(
                    "tokens: {} in / {} out",
                    response.usage.input_tokens, response.usage.output_tokens
                );
                eprintln!("{}", usage.dimmed());
            }
        }
        Err(e) => {
            eprintln!("{} {}", "Error:".red().bold(), e);
            std::process::exit(1);
        }
    }

    Ok(())
}
