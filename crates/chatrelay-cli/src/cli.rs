//! Command-line interface definition

use std::path::PathBuf;

use clap::Parser;

use chatrelay_core::RequestMode;

/// Forward chat messages to a completion API and relay the replies back.
#[derive(Parser, Debug)]
#[command(name = "chatrelay", version, about)]
pub struct Cli {
    /// Discord bot token
    #[arg(long, env = "DISCORD_TOKEN", hide_env_values = true)]
    pub discord_token: String,

    /// API key for the completion endpoint
    #[arg(long, env = "OPENAI_API_KEY", hide_env_values = true)]
    pub openai_api_key: String,

    /// Model sent with each completion request
    #[arg(long, env = "CHATRELAY_MODEL", default_value = "gpt-3.5-turbo")]
    pub model: String,

    /// What each request carries: full-history or single-prompt
    #[arg(long, env = "CHATRELAY_REQUEST_MODE", default_value = "full-history")]
    pub request_mode: RequestMode,

    /// Conversation history file (line-delimited JSON)
    #[arg(long, env = "CHATRELAY_HISTORY_FILE", default_value = "msg.json")]
    pub history_file: PathBuf,

    /// Plain-text transcript of every exchange
    #[arg(long, env = "CHATRELAY_TRANSCRIPT_FILE", default_value = "log.txt")]
    pub transcript_file: PathBuf,

    /// Display name for the bot in transcript lines
    #[arg(long, env = "CHATRELAY_BOT_NAME", default_value = "assistant")]
    pub bot_name: String,

    /// Client-side timeout for completion requests, in seconds
    #[arg(long, env = "CHATRELAY_REQUEST_TIMEOUT_SECS")]
    pub request_timeout_secs: Option<u64>,

    /// Base URL of the completion API
    #[arg(
        long,
        env = "CHATRELAY_API_BASE_URL",
        default_value = "https://api.openai.com/v1"
    )]
    pub api_base_url: String,
}
