use crate::config::AgentConfig;
use crate::error::{AgentError, Result};
use crate::event::{AgentEvent, EventSender};
use crate::executor::Executor;
use crate::response::AgentResponse;
use crate::run::RunConfig;
use crate::session::{Session, SessionSnapshot, SessionStore};
use futures::stream::{BoxStream, StreamExt};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_stream::wrappers::UnboundedReceiverStream;
use toolpilot_core::{Context, Message, ProgressWriter};
use toolpilot_llm::{CompletionRequest, CompletionResponse, LlmProvider};
use toolpilot_tools::{ToolExecutor, ToolRegistry};
use tracing::warn;

/// A model, a fixed tool registry and the sessions of every thread it has served.
///
/// Cloning is cheap and clones share the session store.
#[derive(Clone)]
pub struct Agent {
    config: AgentConfig,
    llm: Arc<dyn LlmProvider>,
    tools: Option<Arc<ToolExecutor>>,
    sessions: Arc<SessionStore>,
}

impl Agent {
    pub fn builder() -> AgentBuilder {
        AgentBuilder::new()
    }

    pub fn config(&self) -> &AgentConfig {
        &self.config
    }

    pub fn llm(&self) -> &Arc<dyn LlmProvider> {
        &self.llm
    }

    pub fn tool_registry(&self) -> Option<&ToolRegistry> {
        self.tools.as_ref().map(|t| t.registry())
    }

    pub fn sessions(&self) -> &SessionStore {
        &self.sessions
    }

    /// A standalone session, not tracked by the store.
    pub fn create_session(&self) -> Session {
        Session::new()
    }

    /// The stored session for `thread_id`, created on first use.
    pub fn session(&self, thread_id: &str) -> Session {
        self.sessions.get_or_create(thread_id)
    }

    fn executor(&self) -> Executor {
        Executor::new(self.config.clone(), self.llm.clone(), self.tools.clone())
    }

    fn run_context(&self, run: &RunConfig, session: &Session) -> Context {
        run.context
            .clone()
            .with_thread(&run.thread_id)
            .with_session(*session.id())
    }

    pub async fn chat(&self, session: &Session, message: &str) -> Result<String> {
        let response = self.process(session, message).await?;
        Ok(response.text)
    }

    pub async fn process(&self, session: &Session, message: &str) -> Result<AgentResponse> {
        let ctx = Context::new()
            .with_thread(session.thread_id())
            .with_session(*session.id());
        self.executor()
            .run(
                session,
                vec![Message::user(message)],
                &ctx,
                self.config.recursion_limit,
                None,
            )
            .await
    }

    /// Runs to completion on the thread named by `run` and returns the final answer.
    pub async fn invoke(&self, input: Vec<Message>, run: RunConfig) -> Result<AgentResponse> {
        let session = self.sessions.get_or_create(&run.thread_id);
        let ctx = self.run_context(&run, &session);
        let limit = run.recursion_limit.unwrap_or(self.config.recursion_limit);
        self.executor().run(&session, input, &ctx, limit, None).await
    }

    /// Starts a run on a background task and returns its events in emission order.
    ///
    /// The stream always opens with `MessageStart` and closes with `MessageEnd` or
    /// `Error`. Tool progress lines are forwarded as `Progress` events; `run.mode`
    /// decides which of the step and progress events are delivered.
    pub fn stream(&self, input: Vec<Message>, run: RunConfig) -> BoxStream<'static, AgentEvent> {
        let (tx, rx) = mpsc::unbounded_channel();
        let events = EventSender::new(tx, run.mode);
        let agent = self.clone();

        tokio::spawn(async move {
            agent.run_streamed(input, run, events).await;
        });

        UnboundedReceiverStream::new(rx).boxed()
    }

    async fn run_streamed(&self, input: Vec<Message>, run: RunConfig, events: EventSender) {
        events.send(AgentEvent::message_start(&run.thread_id));

        let progress = events.clone();
        let writer: ProgressWriter =
            Arc::new(move |message: String| progress.send(AgentEvent::progress(message)));

        let session = self.sessions.get_or_create(&run.thread_id);
        let ctx = self.run_context(&run, &session).with_writer(writer);
        let limit = run.recursion_limit.unwrap_or(self.config.recursion_limit);

        match self.executor().run(&session, input, &ctx, limit, Some(&events)).await {
            Ok(response) => events.send(AgentEvent::message_end(&run.thread_id, response.text)),
            Err(e) => {
                warn!(thread_id = %run.thread_id, error = %e, "Streamed run failed");
                events.send(AgentEvent::error(e.code(), e.to_string()));
            }
        }
    }

    /// Snapshot of the thread's history, if the thread has been used.
    pub fn state(&self, thread_id: &str) -> Option<SessionSnapshot> {
        self.sessions.get(thread_id).map(|s| s.snapshot())
    }

    /// A single completion with the system prompt, without tools or stored history.
    pub async fn ask(&self, question: &str) -> Result<CompletionResponse> {
        let mut request = CompletionRequest::new(&self.config.model, vec![Message::user(question)]);
        if !self.config.system_prompt.is_empty() {
            request = request.with_system(&self.config.system_prompt);
        }
        if let Some(temperature) = self.config.temperature {
            request = request.with_temperature(temperature);
        }
        Ok(self.llm.complete(request).await?)
    }
}

#[derive(Default)]
pub struct AgentBuilder {
    config: Option<AgentConfig>,
    name: Option<String>,
    system_prompt: Option<String>,
    model: Option<String>,
    temperature: Option<f32>,
    max_tokens: Option<usize>,
    recursion_limit: Option<usize>,
    max_delegation_depth: Option<usize>,
    tools_enabled: Option<bool>,
    llm: Option<Arc<dyn LlmProvider>>,
    tool_registry: Option<Arc<ToolRegistry>>,
}

impl AgentBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn config(mut self, config: AgentConfig) -> Self {
        self.config = Some(config);
        self
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt = Some(prompt.into());
        self
    }

    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    pub fn temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    pub fn max_tokens(mut self, max_tokens: usize) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    pub fn recursion_limit(mut self, limit: usize) -> Self {
        self.recursion_limit = Some(limit);
        self
    }

    pub fn max_delegation_depth(mut self, depth: usize) -> Self {
        self.max_delegation_depth = Some(depth);
        self
    }

    pub fn tools_enabled(mut self, enabled: bool) -> Self {
        self.tools_enabled = Some(enabled);
        self
    }

    pub fn llm(mut self, llm: Arc<dyn LlmProvider>) -> Self {
        self.llm = Some(llm);
        self
    }

    pub fn tool_registry(mut self, registry: Arc<ToolRegistry>) -> Self {
        self.tool_registry = Some(registry);
        self
    }

    pub fn build(self) -> Result<Agent> {
        let llm = self.llm.ok_or_else(|| AgentError::config("LLM provider is required"))?;

        let mut config = self.config.unwrap_or_default();

        if let Some(name) = self.name {
            config.name = name;
        }
        if let Some(prompt) = self.system_prompt {
            config.system_prompt = prompt;
        }
        if let Some(model) = self.model {
            config.model = model;
        }
        if let Some(temp) = self.temperature {
            config.temperature = Some(temp);
        }
        if let Some(max) = self.max_tokens {
            config.max_tokens = Some(max);
        }
        if let Some(limit) = self.recursion_limit {
            config.recursion_limit = limit;
        }
        if let Some(depth) = self.max_delegation_depth {
            config.max_delegation_depth = depth;
        }
        if let Some(enabled) = self.tools_enabled {
            config.tools_enabled = enabled;
        }

        if config.recursion_limit == 0 {
            return Err(AgentError::config("recursion limit must be at least 1"));
        }
        if config.model.is_empty() {
            config.model = llm.default_model().to_string();
        }

        let tools = self.tool_registry.map(|registry| {
            Arc::new(ToolExecutor::new(registry).with_timeout(config.tool_timeout()))
        });

        Ok(Agent {
            config,
            llm,
            tools,
            sessions: Arc::new(SessionStore::new()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::StreamMode;
    use serde_json::json;
    use std::time::Duration;
    use tempfile::TempDir;
    use tokio_util::sync::CancellationToken;
    use toolpilot_llm::ScriptedProvider;
    use toolpilot_tools::{Catalog, Workspace};

    fn agent(llm: ScriptedProvider) -> Agent {
        Agent::builder()
            .system_prompt("You are helpful.")
            .llm(Arc::new(llm))
            .build()
            .unwrap()
    }

    async fn collect(stream: BoxStream<'static, AgentEvent>) -> Vec<AgentEvent> {
        stream.collect().await
    }

    #[test]
    fn test_builder_missing_llm() {
        let result = Agent::builder().system_prompt("You are helpful").build();
        assert!(matches!(result, Err(AgentError::Config(_))));
    }

    #[test]
    fn test_builder_defaults_model_from_provider() {
        let agent = agent(ScriptedProvider::new());
        assert_eq!(agent.config().model, "scripted-model");
        assert!(agent.tool_registry().is_none());
    }

    #[tokio::test]
    async fn test_agent_chat() {
        let agent = agent(ScriptedProvider::new().reply_text("Hello from mock!"));

        let session = agent.create_session();
        let response = agent.chat(&session, "Hi").await.unwrap();

        assert_eq!(response, "Hello from mock!");
        assert_eq!(session.message_count(), 2);
        assert!(agent.sessions().is_empty());
    }

    #[tokio::test]
    async fn test_invoke_keeps_thread_history() {
        let llm = Arc::new(ScriptedProvider::new().with_responder(|request| {
            let remembered = request
                .messages
                .iter()
                .map(|m| m.text_content())
                .find_map(|t| t.strip_prefix("My name is ").map(str::to_string));
            match remembered {
                Some(name) => Message::assistant(format!("Your name is {}", name)),
                None => Message::assistant("I don't know your name yet."),
            }
        }));
        let agent = Agent::builder().llm(llm).build().unwrap();

        agent
            .invoke(vec![Message::user("My name is Ada")], RunConfig::new("thread-a"))
            .await
            .unwrap();
        let same = agent
            .invoke(vec![Message::user("What is my name?")], RunConfig::new("thread-a"))
            .await
            .unwrap();
        let other = agent
            .invoke(vec![Message::user("What is my name?")], RunConfig::new("thread-b"))
            .await
            .unwrap();

        assert!(same.text.contains("Ada"));
        assert!(!other.text.contains("Ada"));
        assert_eq!(agent.state("thread-a").unwrap().message_count(), 4);
        assert_eq!(agent.state("thread-b").unwrap().message_count(), 2);
        assert!(agent.state("thread-c").is_none());
    }

    #[tokio::test]
    async fn test_stream_updates_with_tools() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("data.csv"), "a,b").unwrap();
        let ws = Workspace::new(dir.path(), Duration::from_secs(5));
        let registry = Arc::new(Catalog::Scripting.build(&ws).unwrap());

        let llm = ScriptedProvider::new()
            .reply_tool_call("call_1", "list_files", json!({}))
            .reply_text("There is one CSV file.");
        let agent = Agent::builder()
            .llm(Arc::new(llm))
            .tool_registry(registry)
            .build()
            .unwrap();

        let events = collect(agent.stream(
            vec![Message::user("What files are here?")],
            RunConfig::new("t-stream"),
        ))
        .await;

        assert!(matches!(events.first(), Some(AgentEvent::MessageStart { .. })));
        assert!(matches!(events.last(), Some(AgentEvent::MessageEnd { .. })));
        assert_eq!(events.iter().filter(|e| e.is_step()).count(), 3);
        assert!(!events.iter().any(|e| matches!(e, AgentEvent::Progress { .. })));

        let tool_step = events
            .iter()
            .find_map(|e| match e {
                AgentEvent::ToolStep { results } => Some(results.clone()),
                _ => None,
            })
            .unwrap();
        assert!(tool_step[0].content.contains("data.csv (file)"));

        let snapshot = agent.state("t-stream").unwrap();
        assert_eq!(snapshot.message_count(), 4);
        assert_eq!(snapshot.tool_calling_messages(), 1);
    }

    #[tokio::test]
    async fn test_stream_custom_mode_only_progress() {
        let dir = TempDir::new().unwrap();
        let ws = Workspace::new(dir.path(), Duration::from_secs(5));
        let registry = Arc::new(Catalog::Scripting.build(&ws).unwrap());

        let llm = ScriptedProvider::new()
            .reply_tool_call("call_1", "list_files", json!({}))
            .reply_text("Empty.");
        let agent = Agent::builder()
            .llm(Arc::new(llm))
            .tool_registry(registry)
            .build()
            .unwrap();

        let events = collect(agent.stream(
            vec![Message::user("List files")],
            RunConfig::new("t-custom").with_mode(StreamMode::Custom),
        ))
        .await;

        assert!(!events.iter().any(|e| e.is_step()));
        assert!(events.iter().any(|e| matches!(
            e,
            AgentEvent::Progress { message } if message.starts_with("Listing files")
        )));
        assert!(matches!(events.last(), Some(AgentEvent::MessageEnd { .. })));
    }

    #[tokio::test]
    async fn test_stream_recursion_limit_ends_with_error() {
        let llm = ScriptedProvider::new()
            .with_responder(|_| Message::new(
                toolpilot_core::Role::Assistant,
                vec![toolpilot_core::ContentBlock::tool_use(toolpilot_core::ToolUse::new(
                    "loop",
                    "nothing",
                    json!({}),
                ))],
            ));
        let agent = agent(llm);

        let events = collect(agent.stream(
            vec![Message::user("spin")],
            RunConfig::new("t-loop").with_recursion_limit(3),
        ))
        .await;

        match events.last() {
            Some(AgentEvent::Error { code, .. }) => assert_eq!(code, "max_iterations"),
            other => panic!("expected error event, got {:?}", other),
        }
        assert_eq!(events.iter().filter(|e| matches!(e, AgentEvent::AgentStep { .. })).count(), 3);
    }

    #[tokio::test]
    async fn test_stream_cancellation() {
        let llm = ScriptedProvider::new()
            .with_latency(Duration::from_secs(30))
            .reply_text("too late");
        let agent = agent(llm);
        let token = CancellationToken::new();

        let stream = agent.stream(
            vec![Message::user("Hi")],
            RunConfig::new("t-cancel").with_cancellation(token.clone()),
        );
        token.cancel();
        let events = collect(stream).await;

        match events.last() {
            Some(AgentEvent::Error { code, .. }) => assert_eq!(code, "cancelled"),
            other => panic!("expected error event, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_ask_skips_history_and_tools() {
        let llm = Arc::new(ScriptedProvider::new().reply_text("Paris"));
        let agent = Agent::builder()
            .system_prompt("Answer briefly.")
            .llm(llm.clone())
            .build()
            .unwrap();

        let response = agent.ask("Capital of France?").await.unwrap();

        assert_eq!(response.text_content(), "Paris");
        let requests = llm.requests();
        assert!(requests[0].tools.is_none());
        assert_eq!(requests[0].messages.len(), 1);
        assert!(agent.sessions().is_empty());
    }
}
