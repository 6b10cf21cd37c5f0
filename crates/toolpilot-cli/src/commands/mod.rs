pub mod ask;
pub mod chat;
pub mod run;
pub mod tools;

use anyhow::Context as _;
use std::path::PathBuf;
use std::sync::Arc;
use toolpilot_agent::{build_agent, Agent};
use toolpilot_core::{Config, Profile};
use toolpilot_llm::{LlmProvider, OpenAiProvider};
use toolpilot_tools::Workspace;
use tokio_util::sync::CancellationToken;

/// Settings given on the command line; they win over the config file and environment.
#[derive(Debug, Default)]
pub struct Overrides {
    pub config: Option<PathBuf>,
    pub api_key: Option<String>,
    pub base_url: Option<String>,
    pub model: Option<String>,
    pub workspace: Option<PathBuf>,
}

pub fn load_config(overrides: &Overrides) -> anyhow::Result<Config> {
    let mut config = Config::load(overrides.config.as_deref()).context("failed to load configuration")?;

    if let Some(key) = &overrides.api_key {
        config.llm.api_key = Some(key.clone());
    }
    if let Some(url) = &overrides.base_url {
        config.llm.base_url = url.clone();
    }
    if let Some(model) = &overrides.model {
        config.llm.model = model.clone();
    }
    if let Some(dir) = &overrides.workspace {
        let dir = dir
            .to_str()
            .with_context(|| format!("workspace path is not valid UTF-8: {}", dir.display()))?;
        config.general.workspace_dir = dir.into();
    }
    Ok(config)
}

pub fn create_provider(config: &Config) -> anyhow::Result<Arc<dyn LlmProvider>> {
    let api_key = config.api_key().with_context(|| {
        format!(
            "API key required. Set llm.api_key, the {} env var, or use --api-key",
            config.llm.api_key_env
        )
    })?;
    Ok(Arc::new(OpenAiProvider::from_config(&config.llm, api_key)))
}

pub fn create_agent(config: &Config, profile: Profile, system: Option<&str>) -> anyhow::Result<Agent> {
    let llm = create_provider(config)?;
    let workspace = Workspace::from_config(config);
    build_agent(profile, config, llm, &workspace, system)
        .map_err(|e| anyhow::anyhow!("Failed to create agent: {}", e))
}

/// A token cancelled by the first Ctrl+C.
pub fn cancel_on_ctrl_c() -> CancellationToken {
    let token = CancellationToken::new();
    let cancel = token.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("Ctrl+C received, cancelling run");
            cancel.cancel();
        }
    });
    token
}
