use super::content::{ContentBlock, ToolResult, ToolUse};
use super::role::Role;
use crate::types::{MessageId, Metadata, Timestamp};
use crate::usage::TokenUsage;
use serde::{Deserialize, Serialize};

const USAGE_KEY: &str = "usage";

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Message {
    pub id: MessageId,
    pub role: Role,
    pub content: Vec<ContentBlock>,
    pub created_at: Timestamp,
    #[serde(default, skip_serializing_if = "Metadata::is_empty")]
    pub metadata: Metadata,
}

impl Message {
    pub fn new(role: Role, content: Vec<ContentBlock>) -> Self {
        Self {
            id: MessageId::new(),
            role,
            content,
            created_at: Timestamp::now(),
            metadata: Metadata::new(),
        }
    }

    pub fn system(text: impl Into<String>) -> Self {
        Self::new(Role::System, vec![ContentBlock::text(text)])
    }

    pub fn user(text: impl Into<String>) -> Self {
        Self::new(Role::User, vec![ContentBlock::text(text)])
    }

    pub fn assistant(text: impl Into<String>) -> Self {
        Self::new(Role::Assistant, vec![ContentBlock::text(text)])
    }

    pub fn tool(results: Vec<ToolResult>) -> Self {
        Self::new(
            Role::Tool,
            results.into_iter().map(ContentBlock::tool_result).collect(),
        )
    }

    /// Records the token usage reported for the completion that produced this message.
    pub fn with_usage(mut self, usage: &TokenUsage) -> Self {
        self.metadata.insert(USAGE_KEY, usage);
        self
    }

    pub fn usage(&self) -> Option<TokenUsage> {
        self.metadata.get(USAGE_KEY)
    }

    pub fn text_content(&self) -> String {
        self.content
            .iter()
            .filter_map(|b| b.as_text())
            .collect::<Vec<_>>()
            .join("")
    }

    pub fn has_tool_use(&self) -> bool {
        self.content.iter().any(|b| b.is_tool_use())
    }

    pub fn tool_uses(&self) -> Vec<&ToolUse> {
        self.content
            .iter()
            .filter_map(|b| b.as_tool_use())
            .collect()
    }

    pub fn tool_results(&self) -> Vec<&ToolResult> {
        self.content
            .iter()
            .filter_map(|b| b.as_tool_result())
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.content.is_empty()
    }
}

#[derive(Default)]
pub struct MessageBuilder {
    role: Option<Role>,
    content: Vec<ContentBlock>,
    usage: Option<TokenUsage>,
}

impl MessageBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn role(mut self, role: Role) -> Self {
        self.role = Some(role);
        self
    }

    pub fn assistant(self) -> Self {
        self.role(Role::Assistant)
    }

    pub fn text(mut self, text: impl Into<String>) -> Self {
        let text = text.into();
        if !text.is_empty() {
            self.content.push(ContentBlock::text(text));
        }
        self
    }

    pub fn tool_use(mut self, tool_use: ToolUse) -> Self {
        self.content.push(ContentBlock::tool_use(tool_use));
        self
    }

    pub fn usage(mut self, usage: TokenUsage) -> Self {
        self.usage = Some(usage);
        self
    }

    pub fn build(self) -> Result<Message, &'static str> {
        let role = self.role.ok_or("role is required")?;
        if self.content.is_empty() {
            return Err("content is required");
        }
        let msg = Message::new(role, self.content);
        Ok(match self.usage {
            Some(usage) => msg.with_usage(&usage),
            None => msg,
        })
    }
}
