use crate::error::{Result, ToolError};
use crate::registry::ToolRegistry;
use crate::traits::ToolOutput;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;
use toolpilot_core::Context;
use tracing::{debug, info, warn};

/// Looks tools up by name, validates their input and runs them under a deadline.
pub struct ToolExecutor {
    registry: Arc<ToolRegistry>,
    default_timeout: Duration,
}

impl ToolExecutor {
    pub fn new(registry: Arc<ToolRegistry>) -> Self {
        Self {
            registry,
            default_timeout: Duration::from_secs(600),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.default_timeout = timeout;
        self
    }

    pub async fn execute(&self, ctx: &Context, name: &str, input: Value) -> Result<ToolOutput> {
        let tool = self
            .registry
            .get(name)
            .ok_or_else(|| ToolError::not_found(name))?;

        if ctx.is_cancelled() {
            return Err(ToolError::Cancelled);
        }

        if let Err(e) = tool.validate_input(&input) {
            debug!(tool = name, error = %e, "Rejected tool input");
            return Err(e);
        }

        info!(tool = name, "Executing tool");

        let execute_timeout = ctx.bounded(self.default_timeout);
        let result = timeout(execute_timeout, tool.execute(ctx, input)).await;

        match result {
            Ok(Ok(output)) => {
                info!(tool = name, is_error = output.is_error, "Tool execution completed");
                Ok(output)
            }
            Ok(Err(e)) => {
                warn!(tool = name, error = %e, "Tool execution failed");
                Err(e)
            }
            Err(_) => {
                warn!(tool = name, timeout_ms = execute_timeout.as_millis() as u64, "Tool execution timed out");
                Err(ToolError::Timeout(execute_timeout.as_millis() as u64))
            }
        }
    }

    pub fn registry(&self) -> &ToolRegistry {
        &self.registry
    }

    pub fn is_dangerous(&self, name: &str) -> bool {
        self.registry
            .get(name)
            .map(|t| t.is_dangerous())
            .unwrap_or(false)
    }
}
