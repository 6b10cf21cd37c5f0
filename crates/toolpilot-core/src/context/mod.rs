use crate::types::{RequestId, SessionId, Timestamp};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Sink for free-form progress lines emitted while a tool runs.
pub type ProgressWriter = Arc<dyn Fn(String) + Send + Sync>;

#[derive(Clone)]
pub struct Context {
    pub request_id: RequestId,
    pub parent_request_id: Option<RequestId>,
    pub session_id: Option<SessionId>,
    pub thread_id: Option<String>,
    pub started_at: Timestamp,
    pub deadline: Option<Timestamp>,
    /// Number of delegate agents between this context and the top-level run.
    pub depth: usize,
    cancellation: CancellationToken,
    writer: Option<ProgressWriter>,
}

impl Context {
    pub fn new() -> Self {
        Self {
            request_id: RequestId::new(),
            parent_request_id: None,
            session_id: None,
            thread_id: None,
            started_at: Timestamp::now(),
            deadline: None,
            depth: 0,
            cancellation: CancellationToken::new(),
            writer: None,
        }
    }

    /// Bounds the context by `timeout` from now. An earlier existing deadline wins.
    pub fn with_timeout(self, timeout: Duration) -> Self {
        let deadline = Timestamp::now().after(timeout);
        self.with_deadline(deadline)
    }

    pub fn with_deadline(mut self, deadline: Timestamp) -> Self {
        self.deadline = Some(match self.deadline {
            Some(existing) => existing.min(deadline),
            None => deadline,
        });
        self
    }

    pub fn with_session(mut self, session_id: SessionId) -> Self {
        self.session_id = Some(session_id);
        self
    }

    pub fn with_thread(mut self, thread_id: impl Into<String>) -> Self {
        self.thread_id = Some(thread_id.into());
        self
    }

    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = token;
        self
    }

    pub fn with_writer(mut self, writer: ProgressWriter) -> Self {
        self.writer = Some(writer);
        self
    }

    pub fn without_writer(mut self) -> Self {
        self.writer = None;
        self
    }

    /// Derives a context for nested work. Cancelling the parent cancels the child.
    pub fn child(&self) -> Self {
        Self {
            request_id: RequestId::new(),
            parent_request_id: Some(self.request_id),
            session_id: self.session_id,
            thread_id: self.thread_id.clone(),
            started_at: Timestamp::now(),
            deadline: self.deadline,
            depth: self.depth,
            cancellation: self.cancellation.child_token(),
            writer: self.writer.clone(),
        }
    }

    /// Like [`Context::child`], one delegation level deeper.
    pub fn descend(&self) -> Self {
        let mut child = self.child();
        child.depth += 1;
        child
    }

    pub fn progress(&self, message: impl Into<String>) {
        if let Some(writer) = &self.writer {
            writer(message.into());
        }
    }

    pub fn has_writer(&self) -> bool {
        self.writer.is_some()
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancellation.is_cancelled()
    }

    pub fn cancel(&self) {
        self.cancellation.cancel()
    }

    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancellation.clone()
    }

    pub fn is_timeout(&self) -> bool {
        match self.deadline {
            Some(deadline) => Timestamp::now() > deadline,
            None => false,
        }
    }

    pub fn is_done(&self) -> bool {
        self.is_cancelled() || self.is_timeout()
    }

    pub fn remaining(&self) -> Option<Duration> {
        self.deadline.map(|d| {
            let now = Timestamp::now().unix_millis();
            let deadline = d.unix_millis();
            if deadline > now {
                Duration::from_millis((deadline - now) as u64)
            } else {
                Duration::ZERO
            }
        })
    }

    /// The smaller of `limit` and the time left before the deadline.
    pub fn bounded(&self, limit: Duration) -> Duration {
        match self.remaining() {
            Some(remaining) => remaining.min(limit),
            None => limit,
        }
    }

    pub fn elapsed(&self) -> Duration {
        self.started_at.elapsed()
    }
}

impl Default for Context {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Context {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Context")
            .field("request_id", &self.request_id)
            .field("session_id", &self.session_id)
            .field("thread_id", &self.thread_id)
            .field("deadline", &self.deadline)
            .field("depth", &self.depth)
            .field("is_cancelled", &self.is_cancelled())
            .field("has_writer", &self.writer.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[test]
    fn test_child_cancelled_with_parent() {
        let parent = Context::new();
        let child = parent.child();
        assert!(!child.is_cancelled());
        parent.cancel();
        assert!(child.is_cancelled());
    }

    #[test]
    fn test_timeout_keeps_earliest_deadline() {
        let ctx = Context::new().with_timeout(Duration::from_secs(1));
        let first = ctx.deadline.unwrap();
        let ctx = ctx.with_timeout(Duration::from_secs(60));
        assert_eq!(ctx.deadline.unwrap(), first);
        assert!(ctx.bounded(Duration::from_secs(30)) <= Duration::from_secs(1));
    }

    #[test]
    fn test_descend_increments_depth() {
        let ctx = Context::new();
        assert_eq!(ctx.child().depth, 0);
        assert_eq!(ctx.descend().descend().depth, 2);
    }

    #[test]
    fn test_progress_reaches_writer() {
        let lines = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&lines);
        let ctx = Context::new().with_writer(Arc::new(move |line| {
            sink.lock().unwrap().push(line);
        }));

        ctx.child().progress("running pip");
        Context::new().progress("dropped");

        assert_eq!(*lines.lock().unwrap(), vec!["running pip".to_string()]);
    }
}
