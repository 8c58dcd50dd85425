//! chatrelay-core: the conversation bridge library.
//!
//! Listens for messages on a chat channel, forwards each message plus the
//! running conversation history to a remote completion API, relays the reply
//! back to the same conversation, and records both sides of the exchange in
//! a transcript file.

pub mod bridge;
pub mod channel;
pub mod error;
pub mod history;
pub mod llm;
pub mod transcript;

pub use bridge::{Bridge, run_bridge};
pub use channel::{Channel, DiscordChannel, InboundMessage, OutboundMessage};
pub use error::{CompletionError, HistoryError};
pub use history::{HistoryStore, Message, Role};
pub use llm::{CompletionBackend, OpenAiClient, RequestMode};
pub use transcript::Transcript;
