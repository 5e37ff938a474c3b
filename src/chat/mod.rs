//! Chat Log
//!
//! Bounded history of side-channel chat messages. Oldest messages are
//! evicted first once the cap is reached.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::VecDeque;
use uuid::Uuid;

/// Messages kept for late joiners
pub const DEFAULT_CHAT_HISTORY: usize = 50;

/// A chat message as broadcast to clients
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    /// Server-assigned message ID
    pub id: String,
    /// Whatever the sender supplied (name, text, role, ...)
    #[serde(flatten)]
    pub fields: Map<String, Value>,
    /// When the server accepted the message (Unix ms)
    pub timestamp: i64,
}

/// Chat history for one session
#[derive(Debug)]
pub struct ChatLog {
    messages: VecDeque<ChatMessage>,
    capacity: usize,
}

impl Default for ChatLog {
    fn default() -> Self {
        Self::new(DEFAULT_CHAT_HISTORY)
    }
}

impl ChatLog {
    /// Create a chat log holding at most `capacity` messages
    pub fn new(capacity: usize) -> Self {
        Self {
            messages: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Stamp and append a message, evicting the oldest past the cap.
    /// `id` and `timestamp` keys in `fields` are replaced by server values.
    pub fn post(&mut self, mut fields: Map<String, Value>) -> ChatMessage {
        fields.remove("id");
        fields.remove("timestamp");

        let message = ChatMessage {
            id: Uuid::new_v4().to_string(),
            fields,
            timestamp: crate::now_ms(),
        };

        self.messages.push_back(message.clone());
        while self.messages.len() > self.capacity {
            self.messages.pop_front();
        }
        message
    }

    /// Full history, oldest first
    pub fn history(&self) -> Vec<ChatMessage> {
        self.messages.iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}
