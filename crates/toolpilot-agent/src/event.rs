use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use tokio::sync::mpsc::UnboundedSender;
use toolpilot_core::{TokenUsage, ToolResult, ToolUse};

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AgentEvent {
    MessageStart {
        thread_id: String,
    },

    /// One model turn: its text and the tool calls it requested.
    AgentStep {
        text: String,
        tool_calls: Vec<ToolUse>,
        #[serde(skip_serializing_if = "Option::is_none")]
        usage: Option<TokenUsage>,
    },

    /// Results of the tool calls requested by the preceding agent step.
    ToolStep {
        results: Vec<ToolResult>,
    },

    Progress {
        message: String,
    },

    MessageEnd {
        thread_id: String,
        text: String,
    },

    Error {
        code: String,
        message: String,
    },
}

impl AgentEvent {
    pub fn message_start(thread_id: impl Into<String>) -> Self {
        Self::MessageStart {
            thread_id: thread_id.into(),
        }
    }

    pub fn agent_step(text: impl Into<String>, tool_calls: Vec<ToolUse>, usage: Option<TokenUsage>) -> Self {
        Self::AgentStep {
            text: text.into(),
            tool_calls,
            usage,
        }
    }

    pub fn tool_step(results: Vec<ToolResult>) -> Self {
        Self::ToolStep { results }
    }

    pub fn progress(message: impl Into<String>) -> Self {
        Self::Progress {
            message: message.into(),
        }
    }

    pub fn message_end(thread_id: impl Into<String>, text: impl Into<String>) -> Self {
        Self::MessageEnd {
            thread_id: thread_id.into(),
            text: text.into(),
        }
    }

    pub fn error(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Error {
            code: code.into(),
            message: message.into(),
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Self::Error { .. })
    }

    pub fn is_end(&self) -> bool {
        matches!(self, Self::MessageEnd { .. } | Self::Error { .. })
    }

    /// Agent and tool steps, the events counted as run steps.
    pub fn is_step(&self) -> bool {
        matches!(self, Self::AgentStep { .. } | Self::ToolStep { .. })
    }
}

/// Which events a streamed run delivers besides start, end and error.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StreamMode {
    /// Agent steps and tool steps.
    #[default]
    Updates,
    /// Progress lines written by tools.
    Custom,
}

impl StreamMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            StreamMode::Updates => "updates",
            StreamMode::Custom => "custom",
        }
    }

    pub fn admits(&self, event: &AgentEvent) -> bool {
        match event {
            AgentEvent::MessageStart { .. }
            | AgentEvent::MessageEnd { .. }
            | AgentEvent::Error { .. } => true,
            AgentEvent::AgentStep { .. } | AgentEvent::ToolStep { .. } => {
                *self == StreamMode::Updates
            }
            AgentEvent::Progress { .. } => *self == StreamMode::Custom,
        }
    }
}

impl fmt::Display for StreamMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StreamMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "updates" => Ok(StreamMode::Updates),
            "custom" => Ok(StreamMode::Custom),
            other => Err(format!("unknown stream mode '{}'", other)),
        }
    }
}

/// Mode-filtering handle onto a run's event channel.
#[derive(Clone)]
pub(crate) struct EventSender {
    tx: UnboundedSender<AgentEvent>,
    mode: StreamMode,
}

impl EventSender {
    pub(crate) fn new(tx: UnboundedSender<AgentEvent>, mode: StreamMode) -> Self {
        Self { tx, mode }
    }

    /// Drops the event when the mode excludes it or the receiver is gone.
    pub(crate) fn send(&self, event: AgentEvent) {
        if self.mode.admits(&event) {
            let _ = self.tx.send(event);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::mpsc;

    #[test]
    fn test_event_serialization() {
        let event = AgentEvent::progress("Checking Python environment");
        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("\"type\":\"progress\""));
        assert!(json.contains("Checking Python environment"));
    }

    #[test]
    fn test_is_end() {
        assert!(AgentEvent::message_end("t", "done").is_end());
        assert!(AgentEvent::error("llm", "oops").is_end());
        assert!(!AgentEvent::progress("hi").is_end());
        assert!(AgentEvent::tool_step(vec![]).is_step());
    }

    #[test]
    fn test_mode_filtering() {
        let step = AgentEvent::agent_step("hi", vec![], None);
        let progress = AgentEvent::progress("line");
        let start = AgentEvent::message_start("t");

        assert!(StreamMode::Updates.admits(&step));
        assert!(!StreamMode::Updates.admits(&progress));
        assert!(StreamMode::Custom.admits(&progress));
        assert!(!StreamMode::Custom.admits(&step));
        assert!(StreamMode::Custom.admits(&start));
    }

    #[test]
    fn test_mode_parse() {
        assert_eq!("Updates".parse::<StreamMode>().unwrap(), StreamMode::Updates);
        assert_eq!("custom".parse::<StreamMode>().unwrap(), StreamMode::Custom);
        assert!("values".parse::<StreamMode>().is_err());
    }

    #[test]
    fn test_sender_filters() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let sender = EventSender::new(tx, StreamMode::Custom);
        sender.send(AgentEvent::tool_step(vec![]));
        sender.send(AgentEvent::progress("kept"));

        assert!(matches!(rx.try_recv(), Ok(AgentEvent::Progress { .. })));
        assert!(rx.try_recv().is_err());
    }
}
