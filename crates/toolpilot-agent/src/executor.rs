use crate::config::AgentConfig;
use crate::error::{AgentError, Result};
use crate::event::{AgentEvent, EventSender};
use crate::response::{AgentResponse, ToolCallRecord};
use crate::session::Session;
use std::sync::Arc;
use std::time::Instant;
use tokio::time::timeout;
use toolpilot_core::error::Error as CoreError;
use toolpilot_core::{Context, Message, Role, TokenUsage, ToolResult, ToolUse};
use toolpilot_llm::{CompletionRequest, CompletionResponse, LlmProvider};
use toolpilot_tools::{ToolError, ToolExecutor};
use tracing::{debug, info, warn};

/// The tool-calling loop: ask the model, run the tools it picks, repeat until it answers.
#[derive(Clone)]
pub(crate) struct Executor {
    config: AgentConfig,
    llm: Arc<dyn LlmProvider>,
    tools: Option<Arc<ToolExecutor>>,
}

impl Executor {
    pub(crate) fn new(
        config: AgentConfig,
        llm: Arc<dyn LlmProvider>,
        tools: Option<Arc<ToolExecutor>>,
    ) -> Self {
        Self { config, llm, tools }
    }

    /// Appends `input` to the session and loops until the model stops calling tools.
    ///
    /// A system message in `input` replaces the configured system prompt for this run
    /// and is not stored in the history.
    pub(crate) async fn run(
        &self,
        session: &Session,
        input: Vec<Message>,
        ctx: &Context,
        recursion_limit: usize,
        events: Option<&EventSender>,
    ) -> Result<AgentResponse> {
        let _guard = session.lock_run().await;
        session.increment_runs();

        let mut system_prompt = self.config.system_prompt.clone();
        let mut history = Vec::with_capacity(input.len());
        for message in input {
            if message.role == Role::System {
                system_prompt = message.text_content();
            } else {
                history.push(message);
            }
        }
        session.add_messages(history);

        let emit = |event: AgentEvent| {
            if let Some(sender) = events {
                sender.send(event);
            }
        };

        let mut tool_calls = Vec::new();
        let mut usage = TokenUsage::default();
        let mut iterations = 0;

        loop {
            if ctx.is_cancelled() {
                return Err(AgentError::Cancelled);
            }

            iterations += 1;
            if iterations > recursion_limit {
                warn!(thread_id = session.thread_id(), recursion_limit, "Recursion limit reached");
                return Err(AgentError::MaxIterationsReached(recursion_limit));
            }
            session.increment_iterations();

            info!(
                thread_id = session.thread_id(),
                iteration = iterations,
                "Starting agent loop iteration"
            );

            let request = self.build_request(session, &system_prompt);
            let response = self.complete(ctx, request).await?;
            usage += response.usage;

            let mut message = response.message;
            if message.usage().is_none() && !response.usage.is_zero() {
                message = message.with_usage(&response.usage);
            }
            let step_usage = message.usage();
            let text = message.text_content();
            let tool_uses: Vec<ToolUse> = message.tool_uses().into_iter().cloned().collect();
            session.add_message(message);
            emit(AgentEvent::agent_step(text.clone(), tool_uses.clone(), step_usage));

            if tool_uses.is_empty() {
                debug!(thread_id = session.thread_id(), iterations, "Agent produced final answer");
                return Ok(AgentResponse::new(*session.id(), session.thread_id(), text)
                    .with_tool_calls(tool_calls)
                    .with_iterations(iterations)
                    .with_usage(usage));
            }

            let (results, records) = self.execute_tools(ctx, session, &tool_uses).await;
            session.increment_tool_calls(results.len());
            tool_calls.extend(records);
            session.add_message(Message::tool(results.clone()));
            emit(AgentEvent::tool_step(results));
        }
    }

    fn build_request(&self, session: &Session, system_prompt: &str) -> CompletionRequest {
        let messages = session.last_messages(self.config.max_context_messages);

        let mut request = CompletionRequest::new(&self.config.model, messages);
        if !system_prompt.is_empty() {
            request = request.with_system(system_prompt);
        }
        if let Some(temperature) = self.config.temperature {
            request = request.with_temperature(temperature);
        }
        if let Some(max_tokens) = self.config.max_tokens {
            request = request.with_max_tokens(max_tokens as u32);
        }

        if self.config.tools_enabled {
            if let Some(tools) = &self.tools {
                request = request.with_tools(tools.registry().definitions());
            }
        }

        request
    }

    /// One model call, abandoned on cancellation or when the context deadline passes.
    async fn complete(&self, ctx: &Context, request: CompletionRequest) -> Result<CompletionResponse> {
        let token = ctx.cancellation_token();
        let call = async {
            match ctx.remaining() {
                Some(remaining) => match timeout(remaining, self.llm.complete(request)).await {
                    Ok(result) => result.map_err(AgentError::from),
                    Err(_) => Err(AgentError::Core(CoreError::Timeout(
                        remaining.as_millis() as u64,
                    ))),
                },
                None => self.llm.complete(request).await.map_err(AgentError::from),
            }
        };

        tokio::select! {
            biased;
            _ = token.cancelled() => Err(AgentError::Cancelled),
            result = call => result,
        }
    }

    async fn execute_tools(
        &self,
        ctx: &Context,
        session: &Session,
        tool_uses: &[ToolUse],
    ) -> (Vec<ToolResult>, Vec<ToolCallRecord>) {
        let mut results = Vec::with_capacity(tool_uses.len());
        let mut records = Vec::with_capacity(tool_uses.len());

        for tu in tool_uses {
            let start = Instant::now();
            debug!(tool = %tu.name, id = %tu.id, "Executing tool");

            let outcome = match &self.tools {
                Some(tools) if self.config.tools_enabled => {
                    let tool_ctx = ctx
                        .child()
                        .with_session(*session.id())
                        .with_timeout(self.config.tool_timeout());
                    tools.execute(&tool_ctx, &tu.name, tu.input.clone()).await
                }
                _ => Err(ToolError::not_found(&tu.name)),
            };
            let duration_ms = start.elapsed().as_millis() as u64;

            match outcome {
                Ok(output) => {
                    info!(tool = %tu.name, duration_ms, is_error = output.is_error, "Tool completed");
                    let result = if output.is_error {
                        ToolResult::error(&tu.id, &tu.name, &output.content)
                    } else {
                        ToolResult::success(&tu.id, &tu.name, &output.content)
                    };
                    records.push(ToolCallRecord::success(
                        &tu.id,
                        &tu.name,
                        tu.input.clone(),
                        &output,
                        duration_ms,
                    ));
                    results.push(result);
                }
                Err(e) => {
                    warn!(tool = %tu.name, error = %e, "Tool execution failed");
                    let message = e.to_string();
                    records.push(ToolCallRecord::error(
                        &tu.id,
                        &tu.name,
                        tu.input.clone(),
                        &message,
                        duration_ms,
                    ));
                    results.push(ToolResult::error(&tu.id, &tu.name, message));
                }
            }
        }

        (results, records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use toolpilot_llm::ScriptedProvider;
    use toolpilot_tools::ToolRegistry;

    fn executor(llm: Arc<ScriptedProvider>, limit: usize) -> Executor {
        let config = AgentConfig::new("scripted-model", "You are helpful.").with_recursion_limit(limit);
        Executor::new(config, llm, None)
    }

    #[tokio::test]
    async fn test_simple_response() {
        let llm = Arc::new(ScriptedProvider::new().reply_text("Hello!"));
        let session = Session::new();

        let response = executor(llm.clone(), 5)
            .run(&session, vec![Message::user("Hi")], &Context::new(), 5, None)
            .await
            .unwrap();

        assert_eq!(response.text(), "Hello!");
        assert_eq!(response.iterations, 1);
        assert_eq!(response.usage, TokenUsage::new(10, 5));
        assert!(!response.has_tool_calls());
        assert_eq!(llm.requests()[0].system.as_deref(), Some("You are helpful."));
    }

    #[tokio::test]
    async fn test_max_iterations() {
        let llm = Arc::new(
            ScriptedProvider::new()
                .reply_tool_call("call_1", "test_tool", json!({}))
                .reply_tool_call("call_2", "test_tool", json!({}))
                .reply_tool_call("call_3", "test_tool", json!({})),
        );
        let session = Session::new();

        let result = executor(llm.clone(), 2)
            .run(&session, vec![Message::user("Hi")], &Context::new(), 2, None)
            .await;

        assert!(matches!(result, Err(AgentError::MaxIterationsReached(2))));
        assert_eq!(llm.request_count(), 2);
    }

    #[tokio::test]
    async fn test_unknown_tool_becomes_error_result() {
        let llm = Arc::new(
            ScriptedProvider::new()
                .reply_tool_call("call_1", "missing_tool", json!({}))
                .reply_text("Sorry, that tool is unavailable."),
        );
        let tools = Arc::new(ToolExecutor::new(Arc::new(ToolRegistry::new())));
        let config = AgentConfig::new("scripted-model", "");
        let session = Session::new();

        let response = Executor::new(config, llm.clone(), Some(tools))
            .run(&session, vec![Message::user("go")], &Context::new(), 5, None)
            .await
            .unwrap();

        assert_eq!(response.failed_tool_calls().count(), 1);
        let messages = session.messages();
        let results = messages[2].tool_results();
        assert!(results[0].is_error);
        assert!(results[0].content.contains("missing_tool"));
        assert!(llm.requests()[0].system.is_none());
    }

    #[tokio::test]
    async fn test_system_message_overrides_prompt() {
        let llm = Arc::new(ScriptedProvider::new().reply_text("ok"));
        let session = Session::new();

        executor(llm.clone(), 5)
            .run(
                &session,
                vec![Message::system("Be brief."), Message::user("Hi")],
                &Context::new(),
                5,
                None,
            )
            .await
            .unwrap();

        assert_eq!(llm.requests()[0].system.as_deref(), Some("Be brief."));
        assert_eq!(session.message_count(), 2);
    }

    #[tokio::test]
    async fn test_cancelled_before_start() {
        let llm = Arc::new(ScriptedProvider::new().reply_text("never"));
        let ctx = Context::new();
        ctx.cancel();

        let result = executor(llm.clone(), 5)
            .run(&Session::new(), vec![Message::user("Hi")], &ctx, 5, None)
            .await;

        assert!(matches!(result, Err(AgentError::Cancelled)));
        assert_eq!(llm.request_count(), 0);
    }
}
