pub mod config;
pub mod context;
pub mod error;
pub mod message;
pub mod tool;
pub mod types;
pub mod usage;

pub use config::{Config, LogLevel, Profile};
pub use context::{Context, ProgressWriter};
pub use error::{Error, Result};
pub use message::{ContentBlock, Message, MessageBuilder, Role, ToolResult, ToolUse};
pub use tool::{ToolDefinition, ToolParameter};
pub use types::{Id, MessageId, Metadata, RequestId, SessionId, Timestamp};
pub use usage::TokenUsage;

pub mod prelude {
    pub use crate::config::{Config, Profile};
    pub use crate::context::{Context, ProgressWriter};
    pub use crate::error::{Error, Result};
    pub use crate::message::{ContentBlock, Message, MessageBuilder, Role, ToolResult, ToolUse};
    pub use crate::tool::{JsonSchemaType, ToolDefinition, ToolParameter};
    pub use crate::types::{Id, MessageId, Metadata, RequestId, SessionId, Timestamp};
    pub use crate::usage::TokenUsage;
}
