use thiserror::Error;
use toolpilot_core::error::Error as CoreError;
use toolpilot_llm::LlmError;
use toolpilot_tools::ToolError;

#[derive(Error, Debug)]
pub enum AgentError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Session not found: {0}")]
    SessionNotFound(String),

    #[error("Max iterations reached: {0}")]
    MaxIterationsReached(usize),

    #[error("Delegation depth limit reached: depth {depth}, limit {limit}")]
    DelegationDepth { depth: usize, limit: usize },

    #[error("LLM error: {0}")]
    Llm(#[from] LlmError),

    #[error("Tool error: {0}")]
    Tool(#[from] ToolError),

    #[error("Core error: {0}")]
    Core(#[from] CoreError),

    #[error("Cancelled")]
    Cancelled,

    #[error("Internal error: {0}")]
    Internal(String),
}

pub type Result<T> = std::result::Result<T, AgentError>;

impl AgentError {
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// Short machine-readable tag, used in stream error events and logs.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Config(_) => "config",
            Self::SessionNotFound(_) => "session_not_found",
            Self::MaxIterationsReached(_) => "max_iterations",
            Self::DelegationDepth { .. } => "delegation_depth",
            Self::Llm(_) => "llm",
            Self::Tool(_) => "tool",
            Self::Core(_) => "core",
            Self::Cancelled => "cancelled",
            Self::Internal(_) => "internal",
        }
    }
}
