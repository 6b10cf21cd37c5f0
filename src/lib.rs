//! Tool-calling LLM agent for Python scripting and the apax build toolchain.
//!
//! This crate re-exports the workspace members under one name.

pub use toolpilot_agent as agent;
pub use toolpilot_core as core;
pub use toolpilot_llm as llm;
pub use toolpilot_tools as tools;

pub mod prelude {
    pub use toolpilot_agent::prelude::*;
    pub use toolpilot_core::prelude::{Config, Context, Message, Profile, TokenUsage};
    pub use toolpilot_llm::{LlmProvider, OpenAiProvider, ScriptedProvider};
    pub use toolpilot_tools::{Catalog, FallbackExecutor, ToolRegistry, Workspace};
}
