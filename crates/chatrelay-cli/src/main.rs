mod cli;

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use chatrelay_core::{Bridge, DiscordChannel, HistoryStore, OpenAiClient, Transcript, run_bridge};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = cli::Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let history = HistoryStore::load(&cli.history_file)?;
    info!(
        entries = history.len(),
        path = %cli.history_file.display(),
        "Loaded conversation history"
    );

    let mut client = OpenAiClient::new(cli.openai_api_key)
        .with_model(cli.model)
        .with_base_url(cli.api_base_url)
        .with_mode(cli.request_mode);
    if let Some(secs) = cli.request_timeout_secs {
        client = client.with_timeout(Duration::from_secs(secs));
    }

    let channel = Arc::new(DiscordChannel::with_token(&cli.discord_token));
    let transcript = Transcript::new(&cli.transcript_file);
    let bridge = Bridge::new(history, Arc::new(client), transcript, cli.bot_name);

    tokio::spawn(run_bridge(channel, bridge));

    info!("Bot is running, press Ctrl-C to stop");
    tokio::signal::ctrl_c().await?;
    info!("Shutting down");
    Ok(())
}
