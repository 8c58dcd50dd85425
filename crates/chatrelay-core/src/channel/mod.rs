//! Chat channel layer
//!
//! The [`Channel`] trait abstracts the chat platform; [`DiscordChannel`] is
//! the one concrete implementation (Gateway WebSocket receive, REST send).

mod chunk;
mod discord;
mod traits;
mod types;

pub use chunk::split_message;
pub use discord::DiscordChannel;
pub use traits::Channel;
pub use types::{InboundMessage, OutboundMessage};

#[cfg(test)]
pub use traits::mock::MockChannel;
