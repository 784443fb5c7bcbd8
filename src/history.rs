//! Bounded conversation history.

use std::collections::VecDeque;

use tokio::sync::Mutex;

use crate::protocol::{ChatMessage, Role};

/// Maximum number of retained conversation entries.
pub const HISTORY_LIMIT: usize = 20;

/// Ordered sequence of chat turns, capped at the 20 most recent.
///
/// Append and trim happen under one lock so an entry can never be lost to
/// interleaved chat and completion calls.
pub struct ConversationHistory {
    entries: Mutex<VecDeque<ChatMessage>>,
}

impl ConversationHistory {
    pub fn new() -> Self {
        Self {
            entries: Mutex::new(VecDeque::new()),
        }
    }

    /// Append an entry, evicting the oldest once over the cap.
    pub async fn push(&self, role: Role, content: impl Into<String>) {
        let mut entries = self.entries.lock().await;
        entries.push_back(ChatMessage::new(role, content));
        while entries.len() > HISTORY_LIMIT {
            entries.pop_front();
        }
    }

    /// Snapshot of the current entries, oldest first.
    pub async fn messages(&self) -> Vec<ChatMessage> {
        self.entries.lock().await.iter().cloned().collect()
    }

    pub async fn len(&self) -> usize {
        self.entries.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.lock().await.is_empty()
    }
}

impl Default for ConversationHistory {
    fn default() -> Self {
        Self::new()
    }
}
