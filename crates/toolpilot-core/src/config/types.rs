use camino::Utf8PathBuf;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub general: GeneralConfig,
    #[serde(default)]
    pub llm: LlmConfig,
    #[serde(default)]
    pub agent: AgentSettings,
    #[serde(default)]
    pub tools: ToolsConfig,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct GeneralConfig {
    #[serde(default)]
    pub log_level: LogLevel,
    /// Root directory the file and process tools operate in.
    #[serde(default = "default_workspace_dir")]
    pub workspace_dir: Utf8PathBuf,
}

fn default_workspace_dir() -> Utf8PathBuf {
    Utf8PathBuf::from(".")
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: LogLevel::default(),
            workspace_dir: default_workspace_dir(),
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    #[default]
    Info,
    Warn,
    Error,
}

impl LogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "trace" => Some(LogLevel::Trace),
            "debug" => Some(LogLevel::Debug),
            "info" => Some(LogLevel::Info),
            "warn" => Some(LogLevel::Warn),
            "error" => Some(LogLevel::Error),
            _ => None,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct LlmConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_model")]
    pub model: String,
    /// Literal key. Prefer `api_key_env` so keys stay out of config files.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<usize>,
    #[serde(default = "default_llm_timeout")]
    pub timeout_secs: u64,
}

fn default_base_url() -> String {
    "https://dashscope.aliyuncs.com/compatible-mode/v1".to_string()
}

fn default_model() -> String {
    "qwen3-max".to_string()
}

fn default_api_key_env() -> String {
    "DASHSCOPE_API_KEY".to_string()
}

fn default_llm_timeout() -> u64 {
    120
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            model: default_model(),
            api_key: None,
            api_key_env: default_api_key_env(),
            temperature: None,
            max_tokens: None,
            timeout_secs: default_llm_timeout(),
        }
    }
}

/// Which tool set and prompt an agent is built with.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Profile {
    /// Python scripting helpers.
    #[default]
    Scripting,
    /// The full apax toolchain on one agent.
    Toolchain,
    /// A coordinator delegating to project and build sub-agents.
    Delegated,
}

impl Profile {
    pub const ALL: [Profile; 3] = [Profile::Scripting, Profile::Toolchain, Profile::Delegated];

    pub fn as_str(&self) -> &'static str {
        match self {
            Profile::Scripting => "scripting",
            Profile::Toolchain => "toolchain",
            Profile::Delegated => "delegated",
        }
    }
}

impl std::fmt::Display for Profile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Profile {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Profile::ALL
            .into_iter()
            .find(|p| p.as_str() == s.to_lowercase())
            .ok_or_else(|| format!("unknown profile '{}'", s))
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AgentSettings {
    #[serde(default)]
    pub profile: Profile,
    #[serde(default = "default_recursion_limit")]
    pub recursion_limit: usize,
    #[serde(default = "default_max_delegation_depth")]
    pub max_delegation_depth: usize,
    #[serde(default = "default_max_context_messages")]
    pub max_context_messages: usize,
}

fn default_recursion_limit() -> usize {
    50
}

fn default_max_delegation_depth() -> usize {
    2
}

fn default_max_context_messages() -> usize {
    100
}

impl Default for AgentSettings {
    fn default() -> Self {
        Self {
            profile: Profile::default(),
            recursion_limit: default_recursion_limit(),
            max_delegation_depth: default_max_delegation_depth(),
            max_context_messages: default_max_context_messages(),
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ToolsConfig {
    /// Bound on a single child process.
    #[serde(default = "default_command_timeout")]
    pub command_timeout_secs: u64,
    /// Bound on a whole tool call, fallbacks included.
    #[serde(default = "default_tool_timeout")]
    pub tool_timeout_secs: u64,
}

fn default_command_timeout() -> u64 {
    300
}

fn default_tool_timeout() -> u64 {
    600
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            command_timeout_secs: default_command_timeout(),
            tool_timeout_secs: default_tool_timeout(),
        }
    }
}
