//! Channel trait definition

use anyhow::Result;
use async_trait::async_trait;
use futures::Stream;
use std::pin::Pin;

use super::types::{InboundMessage, OutboundMessage};

/// A chat platform the bridge can listen on and reply through.
#[async_trait]
pub trait Channel: Send + Sync {
    /// Check if the channel has the credentials it needs
    fn is_configured(&self) -> bool;

    /// Send a message to the channel
    async fn send(&self, message: OutboundMessage) -> Result<()>;

    /// Send a simple text message
    async fn send_text(&self, conversation_id: &str, text: &str) -> Result<()> {
        self.send(OutboundMessage::new(conversation_id, text)).await
    }

    /// Show a typing indicator in the conversation, where the platform
    /// supports one. Best effort; the default is a no-op.
    async fn send_typing(&self, conversation_id: &str) -> Result<()> {
        let _ = conversation_id;
        Ok(())
    }

    /// Start receiving messages (returns None if the receive side could not
    /// be started, e.g. it is already running).
    ///
    /// The returned stream should be consumed from a single task; messages
    /// are yielded as they arrive from the platform.
    fn start_receiving(&self) -> Option<Pin<Box<dyn Stream<Item = InboundMessage> + Send>>>;
}

/// Test/mock channel for unit testing
#[cfg(test)]
pub mod mock {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// A mock channel that records everything sent through it
    #[derive(Default)]
    pub struct MockChannel {
        sent_messages: Arc<tokio::sync::Mutex<Vec<OutboundMessage>>>,
        typing_calls: Arc<AtomicUsize>,
    }

    impl MockChannel {
        pub fn new() -> Self {
            Self::default()
        }

        /// Get all sent messages
        pub async fn sent_messages(&self) -> Vec<OutboundMessage> {
            self.sent_messages.lock().await.clone()
        }

        /// How many typing indicators were requested
        pub fn typing_calls(&self) -> usize {
            self.typing_calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl Channel for MockChannel {
        fn is_configured(&self) -> bool {
            true
        }

        async fn send(&self, message: OutboundMessage) -> Result<()> {
            self.sent_messages.lock().await.push(message);
            Ok(())
        }

        async fn send_typing(&self, _conversation_id: &str) -> Result<()> {
            self.typing_calls.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }

        fn start_receiving(&self) -> Option<Pin<Box<dyn Stream<Item = InboundMessage> + Send>>> {
            None
        }
    }
}
