//! Completion backend trait

use async_trait::async_trait;

use crate::error::CompletionError;
use crate::history::Message;

/// A remote completion endpoint that turns a conversation into an assistant
/// reply. The seam that lets bridge tests script replies without a network.
#[async_trait]
pub trait CompletionBackend: Send + Sync {
    /// Model identifier sent with each request
    fn model(&self) -> &str;

    /// Submit `history` and return the resulting assistant message.
    async fn complete(&self, history: &[Message]) -> Result<Message, CompletionError>;
}
