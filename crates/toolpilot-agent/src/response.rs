use serde::{Deserialize, Serialize};
use toolpilot_core::{Metadata, SessionId, TokenUsage};
use toolpilot_tools::ToolOutput;

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ToolCallRecord {
    pub id: String,
    pub name: String,
    pub input: serde_json::Value,
    pub output: String,
    pub is_error: bool,
    pub duration_ms: u64,
}

impl ToolCallRecord {
    pub fn success(
        id: impl Into<String>,
        name: impl Into<String>,
        input: serde_json::Value,
        output: &ToolOutput,
        duration_ms: u64,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            input,
            output: output.content.clone(),
            is_error: output.is_error,
            duration_ms,
        }
    }

    pub fn error(
        id: impl Into<String>,
        name: impl Into<String>,
        input: serde_json::Value,
        error_msg: impl Into<String>,
        duration_ms: u64,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            input,
            output: error_msg.into(),
            is_error: true,
            duration_ms,
        }
    }
}

/// Final answer of a run, with the tool calls made along the way.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AgentResponse {
    pub session_id: SessionId,
    pub thread_id: String,
    pub text: String,
    pub tool_calls: Vec<ToolCallRecord>,
    pub iterations: usize,
    pub usage: TokenUsage,
    pub metadata: Metadata,
}

impl AgentResponse {
    pub fn new(session_id: SessionId, thread_id: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            session_id,
            thread_id: thread_id.into(),
            text: text.into(),
            tool_calls: Vec::new(),
            iterations: 1,
            usage: TokenUsage::default(),
            metadata: Metadata::new(),
        }
    }

    pub fn with_tool_calls(mut self, tool_calls: Vec<ToolCallRecord>) -> Self {
        self.tool_calls = tool_calls;
        self
    }

    pub fn with_iterations(mut self, iterations: usize) -> Self {
        self.iterations = iterations;
        self
    }

    pub fn with_usage(mut self, usage: TokenUsage) -> Self {
        self.usage = usage;
        self
    }

    pub fn with_metadata<K: Into<String>, V: Serialize>(mut self, key: K, value: V) -> Self {
        self.metadata.insert(key, value);
        self
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn has_tool_calls(&self) -> bool {
        !self.tool_calls.is_empty()
    }

    pub fn tool_call_count(&self) -> usize {
        self.tool_calls.len()
    }

    pub fn failed_tool_calls(&self) -> impl Iterator<Item = &ToolCallRecord> {
        self.tool_calls.iter().filter(|tc| tc.is_error)
    }
}
