mod tool;

pub(crate) use tool::parse_input;
pub use tool::{Tool, ToolOutput};
