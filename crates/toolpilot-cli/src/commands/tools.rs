use colored::Colorize;
use std::sync::Arc;
use toolpilot_agent::registry_for;
use toolpilot_core::{Config, Profile};
use toolpilot_llm::{LlmProvider, ScriptedProvider};
use toolpilot_tools::Workspace;

/// Lists the tools of each requested profile with their parameters.
pub fn run(config: &Config, profile: Option<Profile>) -> anyhow::Result<()> {
    let workspace = Workspace::from_config(config);
    // Listing never calls the model; delegate tools only need a provider to exist.
    let llm: Arc<dyn LlmProvider> = Arc::new(ScriptedProvider::new());
    let profiles = match profile {
        Some(p) => vec![p],
        None => Profile::ALL.to_vec(),
    };

    for profile in profiles {
        let registry = registry_for(profile, config, llm.clone(), &workspace)
            .map_err(|e| anyhow::anyhow!("Failed to build {} tools: {}", profile, e))?;
        println!("{}", format!("[{}]", profile).green().bold());

        for def in registry.definitions() {
            let marker = if def.dangerous { " (dangerous)".red().to_string() } else { String::new() };
            println!("  {}{}", def.name.cyan(), marker);
            println!("      {}", def.description);
            if let Some(properties) = &def.parameters.properties {
                for (name, param) in properties {
                    let required = def
                        .parameters
                        .required
                        .as_ref()
                        .map(|r| r.contains(name))
                        .unwrap_or(false);
                    println!(
                        "      - {}: {}{}",
                        name,
                        param.schema_type.as_str(),
                        if required { "" } else { " (optional)" }
                    );
                }
            }
        }
        println!();
    }

    Ok(())
}
