use crate::agent::Agent;
use crate::event::AgentEvent;
use crate::run::RunConfig;
use crate::session::SessionSnapshot;
use futures::StreamExt;
use serde::{Deserialize, Serialize};
use toolpilot_core::{Message, TokenUsage};
use tracing::{debug, info};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DriverState {
    Idle,
    /// Waiting for the next event of the run.
    Streaming,
    /// Handing a yielded event to the sink, or reading the thread state after the run.
    Draining,
    Terminal,
}

/// Receives the events of a driven run, one at a time and in order.
pub trait StepSink {
    fn begin(&mut self, _thread_id: &str) {}

    fn on_event(&mut self, event: &AgentEvent);

    /// Called on every driver state change.
    fn on_state(&mut self, _state: DriverState) {}

    fn finish(&mut self, _summary: &RunSummary) {}
}

/// What a run looked like from the stream, next to what the session holds afterwards.
///
/// The stream counts only this run and only the events its mode admitted, while the
/// snapshot covers the whole thread, so the two sets of numbers can differ.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct RunSummary {
    pub thread_id: String,
    pub agent_steps: usize,
    pub tool_steps: usize,
    pub tool_calls_streamed: usize,
    pub progress_lines: usize,
    pub streamed_usage: TokenUsage,
    pub message_count: usize,
    pub tool_calling_messages: usize,
    pub usage: TokenUsage,
    pub final_text: Option<String>,
    pub error: Option<String>,
}

impl RunSummary {
    fn new(thread_id: &str) -> Self {
        Self {
            thread_id: thread_id.to_string(),
            ..Default::default()
        }
    }

    fn record(&mut self, event: &AgentEvent) {
        match event {
            AgentEvent::AgentStep {
                tool_calls, usage, ..
            } => {
                self.agent_steps += 1;
                self.tool_calls_streamed += tool_calls.len();
                if let Some(usage) = usage {
                    self.streamed_usage += *usage;
                }
            }
            AgentEvent::ToolStep { .. } => self.tool_steps += 1,
            AgentEvent::Progress { .. } => self.progress_lines += 1,
            AgentEvent::MessageEnd { text, .. } => self.final_text = Some(text.clone()),
            AgentEvent::Error { message, .. } => self.error = Some(message.clone()),
            AgentEvent::MessageStart { .. } => {}
        }
    }

    fn absorb(&mut self, snapshot: &SessionSnapshot) {
        self.message_count = snapshot.message_count();
        self.tool_calling_messages = snapshot.tool_calling_messages();
        self.usage = snapshot.total_usage();
        if self.final_text.is_none() && self.error.is_none() {
            self.final_text = snapshot.last_text();
        }
    }

    pub fn steps_streamed(&self) -> usize {
        self.agent_steps + self.tool_steps
    }

    pub fn succeeded(&self) -> bool {
        self.error.is_none()
    }
}

/// Drives one streamed run at a time against an [`Agent`] and reports it to a [`StepSink`].
pub struct SessionDriver {
    agent: Agent,
    state: DriverState,
}

impl SessionDriver {
    pub fn new(agent: Agent) -> Self {
        Self {
            agent,
            state: DriverState::Idle,
        }
    }

    pub fn agent(&self) -> &Agent {
        &self.agent
    }

    pub fn state(&self) -> DriverState {
        self.state
    }

    fn enter(&mut self, state: DriverState, sink: &mut dyn StepSink) {
        if self.state != state {
            self.state = state;
            sink.on_state(state);
        }
    }

    /// An optional system message followed by the user's request.
    pub fn initial_messages(system: Option<&str>, user: &str) -> Vec<Message> {
        let mut messages = Vec::with_capacity(2);
        if let Some(system) = system {
            messages.push(Message::system(system));
        }
        messages.push(Message::user(user));
        messages
    }

    pub async fn drive(
        &mut self,
        input: Vec<Message>,
        run: RunConfig,
        sink: &mut dyn StepSink,
    ) -> RunSummary {
        let thread_id = run.thread_id.clone();
        info!(thread_id = %thread_id, mode = %run.mode, "Starting run");

        sink.begin(&thread_id);

        let mut summary = RunSummary::new(&thread_id);
        let mut stream = self.agent.stream(input, run);
        loop {
            self.enter(DriverState::Streaming, sink);
            let Some(event) = stream.next().await else {
                break;
            };
            self.enter(DriverState::Draining, sink);
            summary.record(&event);
            sink.on_event(&event);
        }

        self.enter(DriverState::Draining, sink);
        if let Some(snapshot) = self.agent.state(&thread_id) {
            summary.absorb(&snapshot);
        }
        debug!(
            thread_id = %thread_id,
            steps = summary.steps_streamed(),
            messages = summary.message_count,
            "Run drained"
        );

        self.enter(DriverState::Terminal, sink);
        sink.finish(&summary);
        summary
    }
}
