use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};
use tokio::sync::{Mutex, OwnedMutexGuard};
use toolpilot_core::{Id, Message, Role, SessionId, TokenUsage};

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct SessionStats {
    pub message_count: usize,
    pub tool_call_count: usize,
    pub iteration_count: usize,
    pub run_count: usize,
}

#[derive(Debug)]
struct SessionInner {
    messages: Vec<Message>,
    stats: SessionStats,
}

/// Conversation history for one thread id. Clones share the same state.
#[derive(Clone, Debug)]
pub struct Session {
    id: SessionId,
    thread_id: String,
    inner: Arc<RwLock<SessionInner>>,
    run_lock: Arc<Mutex<()>>,
}

impl Session {
    pub fn new() -> Self {
        Self::for_thread(Id::new().to_string())
    }

    pub fn for_thread(thread_id: impl Into<String>) -> Self {
        Self {
            id: Id::new(),
            thread_id: thread_id.into(),
            inner: Arc::new(RwLock::new(SessionInner {
                messages: Vec::new(),
                stats: SessionStats::default(),
            })),
            run_lock: Arc::new(Mutex::new(())),
        }
    }

    pub fn id(&self) -> &SessionId {
        &self.id
    }

    pub fn thread_id(&self) -> &str {
        &self.thread_id
    }

    fn read(&self) -> RwLockReadGuard<'_, SessionInner> {
        self.inner.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, SessionInner> {
        self.inner.write().unwrap_or_else(|e| e.into_inner())
    }

    /// Waits until no other run holds this session, then holds it until the guard drops.
    pub async fn lock_run(&self) -> OwnedMutexGuard<()> {
        self.run_lock.clone().lock_owned().await
    }

    pub fn is_running(&self) -> bool {
        self.run_lock.try_lock().is_err()
    }

    pub fn add_message(&self, message: Message) {
        let mut inner = self.write();
        inner.stats.message_count += 1;
        inner.messages.push(message);
    }

    pub fn add_messages(&self, messages: impl IntoIterator<Item = Message>) {
        let mut inner = self.write();
        for message in messages {
            inner.stats.message_count += 1;
            inner.messages.push(message);
        }
    }

    pub fn messages(&self) -> Vec<Message> {
        self.read().messages.clone()
    }

    pub fn message_count(&self) -> usize {
        self.read().messages.len()
    }

    /// The newest `n` messages, never starting on a tool result whose call was cut off.
    pub fn last_messages(&self, n: usize) -> Vec<Message> {
        let inner = self.read();
        let len = inner.messages.len();
        let mut start = len.saturating_sub(n);
        while start < len && inner.messages[start].role == Role::Tool {
            start += 1;
        }
        inner.messages[start..].to_vec()
    }

    pub fn stats(&self) -> SessionStats {
        self.read().stats.clone()
    }

    pub fn increment_tool_calls(&self, count: usize) {
        self.write().stats.tool_call_count += count;
    }

    pub fn increment_iterations(&self) {
        self.write().stats.iteration_count += 1;
    }

    pub fn increment_runs(&self) {
        self.write().stats.run_count += 1;
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        let inner = self.read();
        SessionSnapshot {
            session_id: self.id,
            thread_id: self.thread_id.clone(),
            messages: inner.messages.clone(),
            stats: inner.stats.clone(),
        }
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

/// Point-in-time copy of a session, read back after a run.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SessionSnapshot {
    pub session_id: SessionId,
    pub thread_id: String,
    pub messages: Vec<Message>,
    pub stats: SessionStats,
}

impl SessionSnapshot {
    pub fn message_count(&self) -> usize {
        self.messages.len()
    }

    /// Assistant messages that requested at least one tool.
    pub fn tool_calling_messages(&self) -> usize {
        self.messages
            .iter()
            .filter(|m| m.role == Role::Assistant && m.has_tool_use())
            .count()
    }

    pub fn total_usage(&self) -> TokenUsage {
        let mut total = TokenUsage::default();
        for usage in self.messages.iter().filter_map(Message::usage) {
            total += usage;
        }
        total
    }

    pub fn last_text(&self) -> Option<String> {
        self.messages
            .iter()
            .rev()
            .find(|m| m.role == Role::Assistant)
            .map(Message::text_content)
    }
}

/// Sessions keyed by thread id.
#[derive(Debug, Default)]
pub struct SessionStore {
    sessions: RwLock<HashMap<String, Session>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, thread_id: &str) -> Option<Session> {
        self.sessions
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .get(thread_id)
            .cloned()
    }

    pub fn get_or_create(&self, thread_id: &str) -> Session {
        if let Some(session) = self.get(thread_id) {
            return session;
        }
        self.sessions
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .entry(thread_id.to_string())
            .or_insert_with(|| Session::for_thread(thread_id))
            .clone()
    }

    pub fn remove(&self, thread_id: &str) -> Option<Session> {
        self.sessions
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .remove(thread_id)
    }

    pub fn thread_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self
            .sessions
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .keys()
            .cloned()
            .collect();
        ids.sort();
        ids
    }

    pub fn len(&self) -> usize {
        self.sessions.read().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use toolpilot_core::ToolResult;

    #[test]
    fn test_session_add_message() {
        let session = Session::new();
        session.add_message(Message::user("Hello"));
        session.add_message(Message::assistant("Hi there!"));

        assert_eq!(session.message_count(), 2);

        let messages = session.messages();
        assert_eq!(messages[0].role, Role::User);
        assert_eq!(messages[1].role, Role::Assistant);
    }

    #[test]
    fn test_last_messages_skips_orphaned_tool_results() {
        let session = Session::new();
        session.add_message(Message::user("check"));
        session.add_message(Message::assistant("calling"));
        session.add_message(Message::tool(vec![ToolResult::success("c1", "t", "ok")]));
        session.add_message(Message::assistant("done"));

        let last = session.last_messages(2);
        assert_eq!(last.len(), 1);
        assert_eq!(last[0].text_content(), "done");
        assert_eq!(session.last_messages(10).len(), 4);
    }

    #[test]
    fn test_session_clone_shares_state() {
        let session1 = Session::for_thread("t-1");
        let session2 = session1.clone();

        session1.add_message(Message::user("Hello"));

        assert_eq!(session2.message_count(), 1);
        assert_eq!(session2.thread_id(), "t-1");
    }

    #[test]
    fn test_snapshot_counts() {
        let session = Session::new();
        session.add_message(Message::user("hi"));
        session.add_message(
            Message::new(
                Role::Assistant,
                vec![toolpilot_core::ContentBlock::tool_use(toolpilot_core::ToolUse::new(
                    "c1",
                    "list_files",
                    serde_json::json!({}),
                ))],
            )
            .with_usage(&TokenUsage::new(10, 2)),
        );
        session.add_message(Message::tool(vec![ToolResult::success("c1", "list_files", "a")]));
        session.add_message(Message::assistant("done").with_usage(&TokenUsage::new(20, 3)));

        let snapshot = session.snapshot();
        assert_eq!(snapshot.message_count(), 4);
        assert_eq!(snapshot.tool_calling_messages(), 1);
        assert_eq!(snapshot.total_usage(), TokenUsage::new(30, 5));
        assert_eq!(snapshot.last_text().as_deref(), Some("done"));
    }

    #[test]
    fn test_store_isolates_threads() {
        let store = SessionStore::new();
        store.get_or_create("a").add_message(Message::user("I am A"));
        store.get_or_create("b");

        assert_eq!(store.get_or_create("a").message_count(), 1);
        assert_eq!(store.get("b").map(|s| s.message_count()), Some(0));
        assert_eq!(store.thread_ids(), vec!["a", "b"]);

        store.remove("a");
        assert!(store.get("a").is_none());
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn test_run_lock() {
        let session = Session::new();
        let guard = session.lock_run().await;
        assert!(session.is_running());
        drop(guard);
        assert!(!session.is_running());
    }
}
