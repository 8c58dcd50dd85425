//! Discord channel implementation.
//!
//! Uses the Discord Gateway WebSocket for receiving messages and the REST
//! API for sending.

use anyhow::{Context, Result};
use async_trait::async_trait;
use futures::stream::StreamExt;
use reqwest::Client;
use serde_json::{Value, json};
use std::pin::Pin;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use super::chunk::split_message;
use super::traits::Channel;
use super::types::{InboundMessage, OutboundMessage};

const DISCORD_API_BASE: &str = "https://discord.com/api/v10";
const DISCORD_MAX_MESSAGE_LEN: usize = 2000;

/// Intents: GUILDS (1) | GUILD_MESSAGES (512) | DIRECT_MESSAGES (4096) | MESSAGE_CONTENT (32768)
const GATEWAY_INTENTS: u64 = 1 | 512 | 4096 | 32768;

/// Discord channel that receives via Gateway WebSocket and sends via REST API.
pub struct DiscordChannel {
    bot_token: String,
    client: Client,
    polling: Arc<AtomicBool>,
}

impl DiscordChannel {
    pub fn with_token(token: impl Into<String>) -> Self {
        Self {
            bot_token: token.into(),
            client: Client::new(),
            polling: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Send a message to a Discord channel via REST API, splitting it when
    /// it exceeds the platform length limit.
    async fn send_message(&self, channel_id: &str, text: &str) -> Result<()> {
        let chunks = split_message(text, DISCORD_MAX_MESSAGE_LEN);
        for chunk in chunks {
            let resp = self
                .client
                .post(format!(
                    "{}/channels/{}/messages",
                    DISCORD_API_BASE, channel_id
                ))
                .header("Authorization", format!("Bot {}", self.bot_token))
                .json(&json!({ "content": chunk }))
                .send()
                .await?;

            if !resp.status().is_success() {
                let status = resp.status();
                let body = resp.text().await.unwrap_or_default();
                warn!("Discord send failed ({}): {}", status, body);
            }
        }
        Ok(())
    }

    /// Start the Gateway WebSocket connection and return a message stream.
    fn start_gateway(
        &self,
    ) -> Option<Pin<Box<dyn tokio_stream::Stream<Item = InboundMessage> + Send>>> {
        let token = self.bot_token.clone();
        let client = self.client.clone();
        let polling = self.polling.clone();

        if polling.swap(true, Ordering::SeqCst) {
            warn!("Discord gateway already running");
            return None;
        }

        let (tx, rx) = mpsc::channel::<InboundMessage>(256);

        tokio::spawn(async move {
            let _guard = scopeguard::guard((), |_| {
                polling.store(false, Ordering::SeqCst);
            });

            // Get gateway URL
            let gateway_url = match Self::fetch_gateway_url(&client, &token).await {
                Ok(url) => url,
                Err(e) => {
                    error!("Failed to get Discord gateway URL: {}", e);
                    return;
                }
            };

            info!("Connecting to Discord Gateway: {}", gateway_url);

            let ws_stream = match tokio_tungstenite::connect_async(&gateway_url).await {
                Ok((stream, _)) => stream,
                Err(e) => {
                    error!("Failed to connect to Discord Gateway: {}", e);
                    return;
                }
            };

            let (mut ws_write, mut ws_read) = ws_stream.split();

            // Read Hello (opcode 10) to get heartbeat interval
            let heartbeat_interval = match ws_read.next().await {
                Some(Ok(msg)) => {
                    let text = msg.to_text().unwrap_or("{}");
                    let payload: Value = serde_json::from_str(text).unwrap_or_default();
                    if payload["op"].as_u64() == Some(10) {
                        payload["d"]["heartbeat_interval"].as_u64().unwrap_or(41250)
                    } else {
                        warn!("Expected Hello (op 10), got: {}", text);
                        41250
                    }
                }
                _ => {
                    error!("No Hello from Discord Gateway");
                    return;
                }
            };

            debug!("Discord heartbeat interval: {}ms", heartbeat_interval);

            // Send Identify (opcode 2)
            let identify = json!({
                "op": 2,
                "d": {
                    "token": token,
                    "intents": GATEWAY_INTENTS,
                    "properties": {
                        "os": "linux",
                        "browser": "chatrelay",
                        "device": "chatrelay"
                    }
                }
            });

            use futures::SinkExt;
            use tokio_tungstenite::tungstenite::Message as WsMessage;

            if let Err(e) = ws_write
                .send(WsMessage::Text(identify.to_string().into()))
                .await
            {
                error!("Failed to send Identify: {}", e);
                return;
            }

            // Spawn heartbeat task
            let heartbeat_write = Arc::new(tokio::sync::Mutex::new(ws_write));
            let hb_write = heartbeat_write.clone();
            let hb_polling = polling.clone();
            tokio::spawn(async move {
                let mut interval =
                    tokio::time::interval(std::time::Duration::from_millis(heartbeat_interval));
                loop {
                    interval.tick().await;
                    if !hb_polling.load(Ordering::SeqCst) {
                        break;
                    }
                    let heartbeat = json!({"op": 1, "d": null});
                    let mut writer = hb_write.lock().await;
                    if let Err(e) = writer
                        .send(WsMessage::Text(heartbeat.to_string().into()))
                        .await
                    {
                        warn!("Discord heartbeat failed: {}", e);
                        break;
                    }
                }
            });

            // Read messages
            while let Some(msg_result) = ws_read.next().await {
                if !polling.load(Ordering::SeqCst) {
                    break;
                }

                let msg = match msg_result {
                    Ok(m) => m,
                    Err(e) => {
                        warn!("Discord WebSocket error: {}", e);
                        break;
                    }
                };

                let text = match msg.to_text() {
                    Ok(t) => t,
                    Err(_) => continue,
                };

                let payload: Value = match serde_json::from_str(text) {
                    Ok(v) => v,
                    Err(_) => continue,
                };

                // Only handle MESSAGE_CREATE (type "t")
                if payload["t"].as_str() != Some("MESSAGE_CREATE") {
                    continue;
                }

                let data = &payload["d"];

                // Skip bot messages, including our own replies
                if data["author"]["bot"].as_bool() == Some(true) {
                    continue;
                }

                let message_id = match data["id"].as_str() {
                    Some(id) => id,
                    None => continue,
                };

                let content = data["content"].as_str().unwrap_or("");
                if content.is_empty() {
                    continue;
                }

                let channel_id = data["channel_id"].as_str().unwrap_or("");
                let author_id = data["author"]["id"].as_str().unwrap_or("");
                let author_name = data["author"]["username"].as_str().map(|s| s.to_string());

                let mut inbound = InboundMessage::new(
                    format!("dc_{}", message_id),
                    author_id,
                    channel_id,
                    content,
                );
                inbound.sender_name = author_name;

                if tx.send(inbound).await.is_err() {
                    debug!("Discord message channel closed");
                    break;
                }
            }

            info!("Discord gateway connection ended");
        });

        Some(Box::pin(tokio_stream::wrappers::ReceiverStream::new(rx)))
    }

    async fn fetch_gateway_url(client: &Client, token: &str) -> Result<String> {
        let resp = client
            .get(format!("{}/gateway/bot", DISCORD_API_BASE))
            .header("Authorization", format!("Bot {}", token))
            .send()
            .await
            .context("Failed to get Discord gateway URL")?;

        let body: Value = resp.json().await?;
        let url = body["url"]
            .as_str()
            .context("Missing 'url' in gateway response")?;
        Ok(format!("{}/?v=10&encoding=json", url))
    }
}

#[async_trait]
impl Channel for DiscordChannel {
    fn is_configured(&self) -> bool {
        !self.bot_token.is_empty()
    }

    async fn send(&self, message: OutboundMessage) -> Result<()> {
        self.send_message(&message.conversation_id, &message.content)
            .await
    }

    async fn send_typing(&self, conversation_id: &str) -> Result<()> {
        let resp = self
            .client
            .post(format!(
                "{}/channels/{}/typing",
                DISCORD_API_BASE, conversation_id
            ))
            .header("Authorization", format!("Bot {}", self.bot_token))
            .send()
            .await?;

        if !resp.status().is_success() {
            warn!("Discord typing indicator failed ({})", resp.status());
        }
        Ok(())
    }

    fn start_receiving(
        &self,
    ) -> Option<Pin<Box<dyn tokio_stream::Stream<Item = InboundMessage> + Send>>> {
        self.start_gateway()
    }
}
