mod loader;
mod types;

pub use types::{AgentSettings, Config, GeneralConfig, LlmConfig, LogLevel, Profile, ToolsConfig};
