//! Chat message types.

use serde::{Deserialize, Serialize};

/// Incoming message from a channel.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IncomingMessage {
    pub channel: String,
    pub thread_id: String,
    /// Platform message id, needed for reactions.
    pub message_id: String,
    pub sender_id: String,
    pub sender_name: Option<String>,
    pub content: String,
    pub thread_type: ThreadType,
    pub timestamp: chrono::DateTime<chrono::Utc>,
}

/// Outgoing message to a channel.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutgoingMessage {
    pub thread_id: String,
    pub content: String,
    pub thread_type: ThreadType,
}

impl OutgoingMessage {
    /// Plain text message to a channel.
    pub fn text(thread_id: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            thread_id: thread_id.into(),
            content: content.into(),
            thread_type: ThreadType::Group,
        }
    }
}

/// Thread type for channel messages.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ThreadType {
    Direct,
    Group,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_outgoing_text() {
        let msg = OutgoingMessage::text("123456", "hello");
        assert_eq!(msg.thread_id, "123456");
        assert_eq!(msg.content, "hello");
        assert_eq!(msg.thread_type, ThreadType::Group);
    }
}
