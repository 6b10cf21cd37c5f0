use serde::{Deserialize, Serialize};
use std::time::Duration;
use toolpilot_core::Config;

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AgentConfig {
    #[serde(default = "default_name")]
    pub name: String,

    pub system_prompt: String,

    pub model: String,

    #[serde(default)]
    pub temperature: Option<f32>,

    #[serde(default)]
    pub max_tokens: Option<usize>,

    /// Model turns allowed per run before it ends with `MaxIterationsReached`.
    #[serde(default = "default_recursion_limit")]
    pub recursion_limit: usize,

    #[serde(default = "default_max_context_messages")]
    pub max_context_messages: usize,

    #[serde(default = "default_tool_timeout_secs")]
    pub tool_timeout_secs: u64,

    #[serde(default = "default_max_delegation_depth")]
    pub max_delegation_depth: usize,

    #[serde(default = "default_tools_enabled")]
    pub tools_enabled: bool,
}

fn default_name() -> String {
    "assistant".to_string()
}

fn default_recursion_limit() -> usize {
    50
}

fn default_max_context_messages() -> usize {
    100
}

fn default_tool_timeout_secs() -> u64 {
    600
}

fn default_max_delegation_depth() -> usize {
    2
}

fn default_tools_enabled() -> bool {
    true
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            name: default_name(),
            system_prompt: String::new(),
            model: String::new(),
            temperature: None,
            max_tokens: None,
            recursion_limit: default_recursion_limit(),
            max_context_messages: default_max_context_messages(),
            tool_timeout_secs: default_tool_timeout_secs(),
            max_delegation_depth: default_max_delegation_depth(),
            tools_enabled: default_tools_enabled(),
        }
    }
}

impl AgentConfig {
    pub fn new(model: impl Into<String>, system_prompt: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            system_prompt: system_prompt.into(),
            ..Default::default()
        }
    }

    /// Model, sampling and limits taken from the loaded configuration file.
    pub fn from_config(config: &Config, system_prompt: impl Into<String>) -> Self {
        Self {
            model: config.llm.model.clone(),
            system_prompt: system_prompt.into(),
            temperature: config.llm.temperature,
            max_tokens: config.llm.max_tokens,
            recursion_limit: config.agent.recursion_limit,
            max_context_messages: config.agent.max_context_messages,
            tool_timeout_secs: config.tools.tool_timeout_secs,
            max_delegation_depth: config.agent.max_delegation_depth,
            ..Default::default()
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: usize) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    pub fn with_recursion_limit(mut self, limit: usize) -> Self {
        self.recursion_limit = limit;
        self
    }

    pub fn with_max_context_messages(mut self, max_messages: usize) -> Self {
        self.max_context_messages = max_messages;
        self
    }

    pub fn with_tool_timeout(mut self, timeout: Duration) -> Self {
        self.tool_timeout_secs = timeout.as_secs();
        self
    }

    pub fn with_max_delegation_depth(mut self, depth: usize) -> Self {
        self.max_delegation_depth = depth;
        self
    }

    pub fn with_tools_enabled(mut self, enabled: bool) -> Self {
        self.tools_enabled = enabled;
        self
    }

    pub fn tool_timeout(&self) -> Duration {
        Duration::from_secs(self.tool_timeout_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_default() {
        let config = AgentConfig::default();
        assert_eq!(config.name, "assistant");
        assert_eq!(config.recursion_limit, 50);
        assert_eq!(config.max_delegation_depth, 2);
        assert!(config.tools_enabled);
        assert!(config.temperature.is_none());
    }

    #[test]
    fn test_config_builder() {
        let config = AgentConfig::new("qwen3-max", "You are helpful.")
            .with_name("my-agent")
            .with_temperature(0.5)
            .with_recursion_limit(5);

        assert_eq!(config.name, "my-agent");
        assert_eq!(config.model, "qwen3-max");
        assert_eq!(config.temperature, Some(0.5));
        assert_eq!(config.recursion_limit, 5);
    }

    #[test]
    fn test_from_config() {
        let mut config = Config::default();
        config.llm.model = "local-model".into();
        config.agent.recursion_limit = 7;
        config.tools.tool_timeout_secs = 30;

        let agent = AgentConfig::from_config(&config, "prompt");
        assert_eq!(agent.model, "local-model");
        assert_eq!(agent.recursion_limit, 7);
        assert_eq!(agent.tool_timeout(), Duration::from_secs(30));
        assert_eq!(agent.system_prompt, "prompt");
    }
}
