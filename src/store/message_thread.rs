use std::sync::Arc;

use chrono::Utc;
use tokio::sync::{broadcast, Mutex};
use tracing::debug;

use crate::models::{ChatMessage, NewMessage};

const RENDER_CHANNEL_CAPACITY: usize = 64;

/// Append-only, ordered log of chat turns owned by a single screen.
///
/// Cloning yields another handle to the same log, so in-flight submissions can
/// append their reply after the caller has moved on. Appends are serialized in
/// the order the lock is acquired.
#[derive(Clone)]
pub struct MessageThread {
    messages: Arc<Mutex<Vec<ChatMessage>>>,
    appended: broadcast::Sender<ChatMessage>,
}

impl MessageThread {
    pub fn new() -> Self {
        let (appended, _) = broadcast::channel(RENDER_CHANNEL_CAPACITY);
        Self { messages: Arc::new(Mutex::new(Vec::new())), appended }
    }

    /// Adds a turn to the end of the thread and returns it as stored.
    pub async fn append(&self, message: NewMessage) -> ChatMessage {
        let mut messages = self.messages.lock().await;
        let stored = ChatMessage {
            id: uuid::Uuid::new_v4().to_string(),
            seq: messages.len() as u64,
            role: message.role,
            text: message.text,
            is_attachment: message.is_attachment,
            in_reply_to: message.in_reply_to,
            created_at: Utc::now(),
        };
        messages.push(stored.clone());
        debug!(seq = stored.seq, role = %stored.role, "appended turn");
        // No subscribers is fine: nothing is rendering.
        let _ = self.appended.send(stored.clone());
        stored
    }

    /// All turns in insertion order.
    pub async fn all(&self) -> Vec<ChatMessage> {
        self.messages.lock().await.clone()
    }

    pub async fn len(&self) -> usize {
        self.messages.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    pub async fn last(&self) -> Option<ChatMessage> {
        self.messages.lock().await.last().cloned()
    }

    /// Receives every turn appended after this call, for rendering.
    pub fn subscribe(&self) -> broadcast::Receiver<ChatMessage> {
        self.appended.subscribe()
    }
}

impl Default for MessageThread {
    fn default() -> Self {
        Self::new()
    }
}
