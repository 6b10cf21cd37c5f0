use crate::error::{LlmError, Result};
use crate::traits::LlmProvider;
use crate::types::{CompletionRequest, CompletionResponse, StopReason};
use async_trait::async_trait;
use serde_json::Value;
use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;
use toolpilot_core::message::ContentBlock;
use toolpilot_core::{Message, Role, TokenUsage, ToolUse};

type Responder = Box<dyn Fn(&CompletionRequest) -> Message + Send + Sync>;

/// Offline provider that replays queued replies, then falls back to a responder.
///
/// Records every request it receives so tests can inspect what the agent sent.
pub struct ScriptedProvider {
    replies: Mutex<VecDeque<Message>>,
    responder: Option<Responder>,
    requests: Mutex<Vec<CompletionRequest>>,
    usage: TokenUsage,
    latency: Option<Duration>,
}

impl ScriptedProvider {
    pub fn new() -> Self {
        Self {
            replies: Mutex::new(VecDeque::new()),
            responder: None,
            requests: Mutex::new(Vec::new()),
            usage: TokenUsage::new(10, 5),
            latency: None,
        }
    }

    pub fn reply(self, message: Message) -> Self {
        if let Ok(mut replies) = self.replies.lock() {
            replies.push_back(message);
        }
        self
    }

    pub fn reply_text(self, text: impl Into<String>) -> Self {
        self.reply(Message::assistant(text))
    }

    pub fn reply_tool_call(self, id: &str, name: &str, input: Value) -> Self {
        self.reply(Message::new(
            Role::Assistant,
            vec![ContentBlock::tool_use(ToolUse::new(id, name, input))],
        ))
    }

    /// Answers every request once the queue is empty.
    pub fn with_responder(
        mut self,
        responder: impl Fn(&CompletionRequest) -> Message + Send + Sync + 'static,
    ) -> Self {
        self.responder = Some(Box::new(responder));
        self
    }

    pub fn with_usage(mut self, usage: TokenUsage) -> Self {
        self.usage = usage;
        self
    }

    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    pub fn requests(&self) -> Vec<CompletionRequest> {
        self.requests
            .lock()
            .map(|r| r.clone())
            .unwrap_or_default()
    }

    pub fn request_count(&self) -> usize {
        self.requests.lock().map(|r| r.len()).unwrap_or(0)
    }

    fn next_reply(&self, request: &CompletionRequest) -> Option<Message> {
        let queued = self.replies.lock().ok().and_then(|mut q| q.pop_front());
        queued.or_else(|| self.responder.as_ref().map(|f| f(request)))
    }
}

impl Default for ScriptedProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl LlmProvider for ScriptedProvider {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse> {
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }

        let reply = self
            .next_reply(&request)
            .ok_or_else(|| LlmError::invalid_response("scripted provider has no reply left"))?;

        if let Ok(mut requests) = self.requests.lock() {
            requests.push(request);
        }

        let stop_reason = if reply.has_tool_use() {
            StopReason::ToolUse
        } else {
            StopReason::EndTurn
        };

        let message = reply.with_usage(&self.usage);
        Ok(CompletionResponse::new("scripted", "scripted-model", message)
            .with_usage(self.usage)
            .with_stop_reason(stop_reason))
    }

    fn default_model(&self) -> &str {
        "scripted-model"
    }
}
