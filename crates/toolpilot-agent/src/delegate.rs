use crate::agent::Agent;
use crate::error::{AgentError, Result};
use crate::response::AgentResponse;
use crate::run::RunConfig;
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use tokio::sync::oneshot;
use toolpilot_core::{Context, Id, Message, ToolDefinition, ToolParameter};
use toolpilot_tools::{Tool, ToolOutput};
use tracing::{debug, info};

#[derive(Deserialize)]
struct DelegateInput {
    query: String,
}

struct DelegateRequest {
    query: String,
    run: RunConfig,
    reply: oneshot::Sender<Result<AgentResponse>>,
}

/// Exposes a sub-agent to a parent agent as a single tool.
///
/// Each call runs the sub-agent on its own task and a fresh thread, and only the
/// sub-agent's final text comes back as the tool result.
pub struct DelegateTool {
    def: ToolDefinition,
    agent: Agent,
    max_depth: usize,
}

impl DelegateTool {
    pub fn new(name: impl Into<String>, description: impl Into<String>, agent: Agent) -> Self {
        let def = ToolDefinition::new(name, description)
            .with_required_param(
                "query",
                ToolParameter::string().with_description("Task or question for the sub-agent"),
            )
            .with_category("delegate");
        let max_depth = agent.config().max_delegation_depth;
        Self {
            def,
            agent,
            max_depth,
        }
    }

    pub fn with_max_depth(mut self, depth: usize) -> Self {
        self.max_depth = depth;
        self
    }

    pub fn agent(&self) -> &Agent {
        &self.agent
    }

    fn spawn_worker(&self, request: DelegateRequest) {
        let agent = self.agent.clone();
        tokio::spawn(async move {
            let thread_id = request.run.thread_id.clone();
            let result = agent
                .invoke(vec![Message::user(request.query)], request.run)
                .await;
            agent.sessions().remove(&thread_id);
            let _ = request.reply.send(result);
        });
    }
}

#[async_trait]
impl Tool for DelegateTool {
    fn definition(&self) -> &ToolDefinition {
        &self.def
    }

    async fn execute(&self, ctx: &Context, input: Value) -> toolpilot_tools::Result<ToolOutput> {
        let input: DelegateInput = serde_json::from_value(input)?;

        if ctx.depth >= self.max_depth {
            let err = AgentError::DelegationDepth {
                depth: ctx.depth,
                limit: self.max_depth,
            };
            debug!(tool = self.name(), error = %err, "Refusing delegation");
            return Ok(ToolOutput::error(err.to_string()));
        }

        info!(tool = self.name(), depth = ctx.depth + 1, "Delegating to sub-agent");
        ctx.progress(format!("Delegating to {}: {}", self.name(), input.query));

        let (reply, rx) = oneshot::channel();
        let run = RunConfig::new(Id::thread_key(self.name())).with_context(ctx.descend());
        self.spawn_worker(DelegateRequest {
            query: input.query,
            run,
            reply,
        });

        let output = match rx.await {
            Ok(Ok(response)) => ToolOutput::text(&response.text)
                .with_metadata("thread_id", &response.thread_id)
                .with_metadata("tool_calls", response.tool_call_count())
                .with_metadata("usage", response.usage),
            Ok(Err(e)) => ToolOutput::error(format!("{} failed: {}", self.name(), e)),
            Err(_) => ToolOutput::error(format!("{} stopped before replying", self.name())),
        };
        Ok(output)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::Arc;
    use toolpilot_llm::ScriptedProvider;
    use toolpilot_tools::ToolRegistry;

    fn sub_agent(llm: ScriptedProvider) -> Agent {
        Agent::builder()
            .name("worker")
            .llm(Arc::new(llm))
            .build()
            .unwrap()
    }

    #[tokio::test]
    async fn test_returns_final_text_only() {
        let worker = sub_agent(ScriptedProvider::new().reply_text("apax 3.4.2 is installed"));
        let tool = DelegateTool::new("ax_project_agent", "project work", worker.clone());

        let output = tool
            .execute(&Context::new(), json!({"query": "check the apax environment"}))
            .await
            .unwrap();

        assert!(!output.is_error);
        assert_eq!(output.content, "apax 3.4.2 is installed");
        assert!(worker.sessions().is_empty());
    }

    #[tokio::test]
    async fn test_depth_limit() {
        let llm = Arc::new(ScriptedProvider::new().reply_text("unused"));
        let worker = Agent::builder().llm(llm.clone()).build().unwrap();
        let tool = DelegateTool::new("ax_build_agent", "build work", worker).with_max_depth(1);

        let output = tool
            .execute(&Context::new().descend(), json!({"query": "build"}))
            .await
            .unwrap();

        assert!(output.is_error);
        assert!(output.content.contains("depth"));
        assert_eq!(llm.request_count(), 0);
    }

    #[tokio::test]
    async fn test_worker_error_is_tool_output() {
        let worker = sub_agent(ScriptedProvider::new());
        let tool = DelegateTool::new("ax_build_agent", "build work", worker);

        let output = tool
            .execute(&Context::new(), json!({"query": "compile"}))
            .await
            .unwrap();

        assert!(output.is_error);
        assert!(output.content.starts_with("ax_build_agent failed"));
    }

    #[tokio::test]
    async fn test_parent_agent_delegates() {
        let worker = sub_agent(ScriptedProvider::new().reply_text("Project mixer created."));
        let mut registry = ToolRegistry::new();
        registry
            .register(Arc::new(DelegateTool::new("ax_project_agent", "project work", worker)))
            .unwrap();

        let parent_llm = ScriptedProvider::new()
            .reply_tool_call("call_1", "ax_project_agent", json!({"query": "create mixer"}))
            .reply_text("Done: the project exists.");
        let parent = Agent::builder()
            .llm(Arc::new(parent_llm))
            .tool_registry(Arc::new(registry))
            .build()
            .unwrap();

        let response = parent
            .invoke(vec![Message::user("Make a project")], RunConfig::new("coord"))
            .await
            .unwrap();

        assert_eq!(response.text, "Done: the project exists.");
        assert_eq!(response.tool_calls[0].output, "Project mixer created.");
    }
}
