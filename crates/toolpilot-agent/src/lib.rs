pub mod agent;
pub mod config;
pub mod delegate;
pub mod driver;
pub mod error;
pub mod event;
pub mod profile;
pub mod response;
pub mod run;
pub mod session;

mod executor;

pub use agent::{Agent, AgentBuilder};
pub use config::AgentConfig;
pub use delegate::DelegateTool;
pub use driver::{DriverState, RunSummary, SessionDriver, StepSink};
pub use error::{AgentError, Result};
pub use event::{AgentEvent, StreamMode};
pub use profile::{build_agent, default_prompt, registry_for};
pub use response::{AgentResponse, ToolCallRecord};
pub use run::RunConfig;
pub use session::{Session, SessionSnapshot, SessionStats, SessionStore};

pub mod prelude {
    pub use crate::agent::{Agent, AgentBuilder};
    pub use crate::config::AgentConfig;
    pub use crate::driver::{DriverState, RunSummary, SessionDriver, StepSink};
    pub use crate::error::{AgentError, Result};
    pub use crate::event::{AgentEvent, StreamMode};
    pub use crate::response::{AgentResponse, ToolCallRecord};
    pub use crate::run::RunConfig;
    pub use crate::session::{Session, SessionSnapshot, SessionStats};
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use toolpilot_core::Message;
    use toolpilot_llm::ScriptedProvider;

    #[tokio::test]
    async fn test_full_agent_flow() {
        let agent = Agent::builder()
            .system_prompt("You are a helpful assistant.")
            .llm(Arc::new(
                ScriptedProvider::new().with_responder(|_| Message::assistant("Test response")),
            ))
            .build()
            .unwrap();

        let session = agent.session("demo");

        let response = agent.chat(&session, "Hello!").await.unwrap();
        assert_eq!(response, "Test response");

        let response2 = agent.chat(&session, "How are you?").await.unwrap();
        assert_eq!(response2, "Test response");

        let stats = agent.state("demo").unwrap().stats;
        assert_eq!(stats.message_count, 4);
        assert_eq!(stats.iteration_count, 2);
        assert_eq!(stats.run_count, 2);
    }

    #[tokio::test]
    async fn test_agent_with_config() {
        let config = AgentConfig::new("scripted-model", "System prompt")
            .with_name("test-agent")
            .with_recursion_limit(5)
            .with_temperature(0.3);

        let agent = Agent::builder()
            .config(config)
            .llm(Arc::new(ScriptedProvider::new()))
            .build()
            .unwrap();

        assert_eq!(agent.config().name, "test-agent");
        assert_eq!(agent.config().recursion_limit, 5);
        assert_eq!(agent.config().temperature, Some(0.3));
    }
}
