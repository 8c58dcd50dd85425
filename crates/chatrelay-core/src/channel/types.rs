//! Channel message types

use serde::{Deserialize, Serialize};

/// Inbound message from the chat platform
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InboundMessage {
    /// Unique message ID
    pub id: String,
    /// Sender identifier (user ID in the channel)
    pub sender_id: String,
    /// Sender display name (if available)
    pub sender_name: Option<String>,
    /// Conversation identifier (channel ID)
    pub conversation_id: String,
    /// Message content
    pub content: String,
    /// Timestamp (milliseconds since epoch)
    pub timestamp: i64,
}

impl InboundMessage {
    /// Create a new inbound message
    pub fn new(
        id: impl Into<String>,
        sender_id: impl Into<String>,
        conversation_id: impl Into<String>,
        content: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            sender_id: sender_id.into(),
            sender_name: None,
            conversation_id: conversation_id.into(),
            content: content.into(),
            timestamp: chrono::Utc::now().timestamp_millis(),
        }
    }

    /// Set sender name
    pub fn with_sender_name(mut self, name: impl Into<String>) -> Self {
        self.sender_name = Some(name.into());
        self
    }

    /// Display name for transcript lines: the sender name when the platform
    /// provided one, the raw sender ID otherwise.
    pub fn speaker(&self) -> &str {
        self.sender_name.as_deref().unwrap_or(&self.sender_id)
    }
}

/// Outbound message to the chat platform
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutboundMessage {
    /// Conversation identifier
    pub conversation_id: String,
    /// Message content
    pub content: String,
}

impl OutboundMessage {
    /// Create a new outbound message
    pub fn new(conversation_id: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            conversation_id: conversation_id.into(),
            content: content.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_inbound_message_builder() {
        let msg = InboundMessage::new("msg-1", "user-123", "chan-456", "Hello world")
            .with_sender_name("John");

        assert_eq!(msg.id, "msg-1");
        assert_eq!(msg.sender_id, "user-123");
        assert_eq!(msg.conversation_id, "chan-456");
        assert_eq!(msg.content, "Hello world");
        assert_eq!(msg.sender_name, Some("John".to_string()));
    }

    #[test]
    fn test_speaker_falls_back_to_sender_id() {
        let anon = InboundMessage::new("m", "user-123", "c", "hi");
        assert_eq!(anon.speaker(), "user-123");

        let named = anon.clone().with_sender_name("John");
        assert_eq!(named.speaker(), "John");
    }

    #[test]
    fn test_outbound_message() {
        let msg = OutboundMessage::new("chan-1", "reply text");
        assert_eq!(msg.conversation_id, "chan-1");
        assert_eq!(msg.content, "reply text");
    }
}
