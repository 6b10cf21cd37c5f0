use crate::event::StreamMode;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use toolpilot_core::{Context, Id};

/// Per-run settings: which thread the run belongs to and how it is streamed.
#[derive(Clone)]
pub struct RunConfig {
    pub thread_id: String,
    pub mode: StreamMode,
    /// Overrides the agent's configured recursion limit for this run.
    pub recursion_limit: Option<usize>,
    pub context: Context,
}

impl RunConfig {
    pub fn new(thread_id: impl Into<String>) -> Self {
        Self {
            thread_id: thread_id.into(),
            mode: StreamMode::default(),
            recursion_limit: None,
            context: Context::new(),
        }
    }

    /// A run on a fresh, randomly named thread.
    pub fn ephemeral() -> Self {
        Self::new(Id::new().to_string())
    }

    pub fn with_mode(mut self, mode: StreamMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_recursion_limit(mut self, limit: usize) -> Self {
        self.recursion_limit = Some(limit);
        self
    }

    pub fn with_context(mut self, context: Context) -> Self {
        self.context = context;
        self
    }

    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.context = self.context.with_cancellation(token);
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.context = self.context.with_timeout(timeout);
        self
    }
}

impl std::fmt::Debug for RunConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RunConfig")
            .field("thread_id", &self.thread_id)
            .field("mode", &self.mode)
            .field("recursion_limit", &self.recursion_limit)
            .field("depth", &self.context.depth)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_run_config_builder() {
        let token = CancellationToken::new();
        let run = RunConfig::new("thread-1")
            .with_mode(StreamMode::Custom)
            .with_recursion_limit(3)
            .with_cancellation(token.clone());

        assert_eq!(run.thread_id, "thread-1");
        assert_eq!(run.mode, StreamMode::Custom);
        assert_eq!(run.recursion_limit, Some(3));

        token.cancel();
        assert!(run.context.is_cancelled());
    }

    #[test]
    fn test_ephemeral_threads_differ() {
        assert_ne!(RunConfig::ephemeral().thread_id, RunConfig::ephemeral().thread_id);
    }
}
