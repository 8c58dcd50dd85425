//! The message bridge.
//!
//! Drives one inbound chat event through the pipeline: append the user
//! message to history, request a completion, append the reply, send it back
//! to the same conversation, and record both sides in the transcript.
//! Per-message failures are logged and the loop continues; nothing here
//! terminates the process.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use tokio::time::sleep;
use tokio_stream::StreamExt;
use tracing::{debug, error, info, warn};

use crate::channel::{Channel, InboundMessage};
use crate::history::{HistoryStore, Message};
use crate::llm::CompletionBackend;
use crate::transcript::Transcript;

#[cfg(test)]
const STREAM_RECONNECT_DELAY: Duration = Duration::from_millis(20);
#[cfg(not(test))]
const STREAM_RECONNECT_DELAY: Duration = Duration::from_secs(2);

/// Chat command that flushes the history store to its backing file.
const PRINT_COMMAND: &str = "/print";

/// Reply sent when the completion call fails.
const COMPLETION_FAILED_REPLY: &str =
    "Sorry, I couldn't reach the completion API. Please try again.";

/// Owns the conversation state and processes inbound messages one at a time.
pub struct Bridge {
    history: HistoryStore,
    backend: Arc<dyn CompletionBackend>,
    transcript: Transcript,
    bot_name: String,
}

impl Bridge {
    pub fn new(
        history: HistoryStore,
        backend: Arc<dyn CompletionBackend>,
        transcript: Transcript,
        bot_name: impl Into<String>,
    ) -> Self {
        Self {
            history,
            backend,
            transcript,
            bot_name: bot_name.into(),
        }
    }

    /// The conversation accumulated so far.
    pub fn history(&self) -> &HistoryStore {
        &self.history
    }

    /// Process one inbound message.
    ///
    /// A failed completion is reported back to the conversation and leaves
    /// the user message in history with no assistant entry; the error is not
    /// propagated so the receive loop keeps going.
    pub async fn handle(&mut self, msg: &InboundMessage, channel: &dyn Channel) -> Result<()> {
        if msg.content.trim() == PRINT_COMMAND {
            self.history.flush()?;
            channel
                .send_text(
                    &msg.conversation_id,
                    &format!(
                        "Exported {} history entries to {}",
                        self.history.len(),
                        self.history.path().display()
                    ),
                )
                .await?;
            return Ok(());
        }

        if let Err(e) = channel.send_typing(&msg.conversation_id).await {
            warn!("Failed to send typing indicator: {}", e);
        }

        self.history.append(Message::user(&msg.content));

        let reply = match self.backend.complete(self.history.entries()).await {
            Ok(reply) => reply,
            Err(e) => {
                error!("Completion request failed: {}", e);
                channel
                    .send_text(&msg.conversation_id, COMPLETION_FAILED_REPLY)
                    .await?;
                return Ok(());
            }
        };

        self.history.append(reply.clone());

        channel.send_text(&msg.conversation_id, &reply.content).await?;

        self.transcript.record(msg.speaker(), &msg.content)?;
        self.transcript.record(&self.bot_name, &reply.content)?;

        Ok(())
    }
}

/// Receive loop: consume the channel's inbound stream and feed each message
/// through the bridge, re-establishing the stream with a fixed delay when it
/// ends. Completion calls themselves are never retried.
pub async fn run_bridge(channel: Arc<dyn Channel>, mut bridge: Bridge) {
    info!("Starting bridge receive loop");

    loop {
        let Some(mut stream) = channel.start_receiving() else {
            warn!(
                "Failed to start message stream, retrying in {:?}",
                STREAM_RECONNECT_DELAY
            );
            sleep(STREAM_RECONNECT_DELAY).await;
            continue;
        };

        while let Some(message) = stream.next().await {
            debug!(
                "Bridge received message {} from {}",
                message.id, message.conversation_id
            );

            match bridge.handle(&message, channel.as_ref()).await {
                Ok(()) => {
                    debug!("Message {} handled", message.id);
                }
                Err(e) => {
                    error!(
                        "Error handling message {} from {}: {}",
                        message.id, message.conversation_id, e
                    );
                }
            }

            // Continue processing next message regardless of error
        }

        warn!(
            "Message stream ended, restarting in {:?}",
            STREAM_RECONNECT_DELAY
        );
        sleep(STREAM_RECONNECT_DELAY).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channel::{MockChannel, OutboundMessage};
    use crate::llm::client::mock::{MockBackend, MockReply};
    use anyhow::Result as AnyhowResult;
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::pin::Pin;
    use std::sync::Mutex;
    use tempfile::TempDir;
    use tokio::time::timeout;
    use tokio_stream::iter;

    fn test_bridge(dir: &TempDir, backend: MockBackend) -> Bridge {
        let history = HistoryStore::new(dir.path().join("msg.json"));
        let transcript = Transcript::new(dir.path().join("log.txt"));
        Bridge::new(history, Arc::new(backend), transcript, "assistant")
    }

    fn inbound(content: &str) -> InboundMessage {
        InboundMessage::new("msg-1", "user-1", "chan-1", content).with_sender_name("alice")
    }

    #[tokio::test]
    async fn test_exchange_appends_both_sides_and_replies() {
        let dir = TempDir::new().unwrap();
        let backend = MockBackend::from_replies(vec![MockReply::Text("hello".into())]);
        let mut bridge = test_bridge(&dir, backend.clone());
        let channel = MockChannel::new();

        bridge.handle(&inbound("hi"), &channel).await.unwrap();

        assert_eq!(
            bridge.history().entries(),
            &[Message::user("hi"), Message::assistant("hello")]
        );

        let sent = channel.sent_messages().await;
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].conversation_id, "chan-1");
        assert_eq!(sent[0].content, "hello");

        // The backend saw the history including the new user message
        let calls = backend.calls().await;
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0], vec![Message::user("hi")]);

        assert_eq!(channel.typing_calls(), 1);
    }

    #[tokio::test]
    async fn test_full_history_accumulates_across_exchanges() {
        let dir = TempDir::new().unwrap();
        let backend = MockBackend::from_replies(vec![
            MockReply::Text("hello".into()),
            MockReply::Text("fine".into()),
        ]);
        let mut bridge = test_bridge(&dir, backend.clone());
        let channel = MockChannel::new();

        bridge.handle(&inbound("hi"), &channel).await.unwrap();
        bridge.handle(&inbound("how are you?"), &channel).await.unwrap();

        assert_eq!(bridge.history().len(), 4);

        let calls = backend.calls().await;
        assert_eq!(calls[1].len(), 3);
        assert_eq!(calls[1][2], Message::user("how are you?"));
    }

    #[tokio::test]
    async fn test_print_command_flushes_without_calling_backend() {
        let dir = TempDir::new().unwrap();
        let backend = MockBackend::new();
        let mut bridge = test_bridge(&dir, backend.clone());
        let channel = MockChannel::new();

        bridge.handle(&inbound("hi"), &channel).await.ok();
        // The completion failed (empty script); only the user entry remains
        assert_eq!(bridge.history().len(), 1);
        let calls_before = backend.calls().await.len();

        bridge.handle(&inbound("/print"), &channel).await.unwrap();

        assert_eq!(backend.calls().await.len(), calls_before);

        let path = dir.path().join("msg.json");
        let reloaded = HistoryStore::load(&path).unwrap();
        assert_eq!(reloaded.entries(), bridge.history().entries());

        let sent = channel.sent_messages().await;
        assert!(sent.last().unwrap().content.contains("Exported"));
    }

    #[tokio::test]
    async fn test_failed_completion_sends_error_reply_and_keeps_user_entry() {
        let dir = TempDir::new().unwrap();
        let backend = MockBackend::from_replies(vec![MockReply::Error("down".into())]);
        let mut bridge = test_bridge(&dir, backend);
        let channel = MockChannel::new();

        let result = bridge.handle(&inbound("hi"), &channel).await;
        assert!(result.is_ok());

        assert_eq!(bridge.history().entries(), &[Message::user("hi")]);

        let sent = channel.sent_messages().await;
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].content, COMPLETION_FAILED_REPLY);
    }

    #[tokio::test]
    async fn test_successful_exchange_writes_transcript_lines() {
        let dir = TempDir::new().unwrap();
        let backend = MockBackend::from_replies(vec![MockReply::Text("hello".into())]);
        let mut bridge = test_bridge(&dir, backend);
        let channel = MockChannel::new();

        bridge.handle(&inbound("hi"), &channel).await.unwrap();

        let contents = std::fs::read_to_string(dir.path().join("log.txt")).unwrap();
        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].ends_with("\talice > hi"));
        assert!(lines[1].ends_with("\tassistant > hello"));
    }

    #[tokio::test]
    async fn test_failed_completion_writes_no_transcript() {
        let dir = TempDir::new().unwrap();
        let backend = MockBackend::from_replies(vec![MockReply::Error("down".into())]);
        let mut bridge = test_bridge(&dir, backend);
        let channel = MockChannel::new();

        bridge.handle(&inbound("hi"), &channel).await.unwrap();

        assert!(!dir.path().join("log.txt").exists());
    }

    struct ReconnectTestChannel {
        streams: Mutex<VecDeque<Vec<InboundMessage>>>,
        sent_messages: Arc<tokio::sync::Mutex<Vec<OutboundMessage>>>,
    }

    impl ReconnectTestChannel {
        fn new(batches: Vec<Vec<InboundMessage>>) -> Self {
            Self {
                streams: Mutex::new(VecDeque::from(batches)),
                sent_messages: Arc::new(tokio::sync::Mutex::new(Vec::new())),
            }
        }
    }

    #[async_trait]
    impl Channel for ReconnectTestChannel {
        fn is_configured(&self) -> bool {
            true
        }

        async fn send(&self, message: OutboundMessage) -> AnyhowResult<()> {
            self.sent_messages.lock().await.push(message);
            Ok(())
        }

        fn start_receiving(
            &self,
        ) -> Option<Pin<Box<dyn tokio_stream::Stream<Item = InboundMessage> + Send>>> {
            let mut streams = self.streams.lock().expect("lock reconnect test streams");
            let batch = streams.pop_front()?;
            Some(Box::pin(iter(batch)))
        }
    }

    #[tokio::test]
    async fn test_run_bridge_recovers_after_stream_ends() {
        let dir = TempDir::new().unwrap();
        let backend = MockBackend::from_replies(vec![
            MockReply::Text("first reply".into()),
            MockReply::Text("second reply".into()),
        ]);
        let bridge = test_bridge(&dir, backend);

        let first = InboundMessage::new("msg-1", "user-1", "chan-1", "first");
        let second = InboundMessage::new("msg-2", "user-1", "chan-1", "second");
        let channel = Arc::new(ReconnectTestChannel::new(vec![vec![first], vec![second]]));
        let sent_messages = channel.sent_messages.clone();

        tokio::spawn(run_bridge(channel, bridge));

        timeout(Duration::from_secs(2), async {
            loop {
                if sent_messages.lock().await.len() >= 2 {
                    break;
                }
                sleep(Duration::from_millis(10)).await;
            }
        })
        .await
        .expect("bridge should reconnect after stream end");

        let sent = sent_messages.lock().await;
        assert_eq!(sent[0].content, "first reply");
        assert_eq!(sent[1].content, "second reply");
    }
}
