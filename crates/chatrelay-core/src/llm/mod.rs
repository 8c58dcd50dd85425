//! Completion client layer

pub mod client;
pub mod openai;

pub use client::CompletionBackend;
pub use openai::{OpenAiClient, RequestMode};
