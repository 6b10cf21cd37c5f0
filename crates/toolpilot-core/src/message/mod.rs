mod content;
mod message;
mod role;

pub use content::{ContentBlock, ToolResult, ToolUse};
pub use message::{Message, MessageBuilder};
pub use role::Role;
