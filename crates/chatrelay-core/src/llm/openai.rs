//! OpenAI-style completion client

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::error::CompletionError;
use crate::history::Message;
use crate::llm::client::CompletionBackend;

/// What the remote endpoint receives per request.
///
/// `FullHistory` submits the whole conversation to the chat endpoint;
/// `SinglePrompt` submits only the latest message text to the legacy text
/// completion endpoint. Richer context versus cheaper requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RequestMode {
    #[default]
    FullHistory,
    SinglePrompt,
}

impl std::str::FromStr for RequestMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "full-history" => Ok(Self::FullHistory),
            "single-prompt" => Ok(Self::SinglePrompt),
            other => Err(format!(
                "unknown request mode '{}' (expected 'full-history' or 'single-prompt')",
                other
            )),
        }
    }
}

impl std::fmt::Display for RequestMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::FullHistory => write!(f, "full-history"),
            Self::SinglePrompt => write!(f, "single-prompt"),
        }
    }
}

/// OpenAI client
pub struct OpenAiClient {
    client: Client,
    api_key: String,
    model: String,
    base_url: String,
    mode: RequestMode,
}

impl OpenAiClient {
    /// Create a new client with default model and endpoint
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            api_key: api_key.into(),
            model: "gpt-3.5-turbo".to_string(),
            base_url: "https://api.openai.com/v1".to_string(),
            mode: RequestMode::default(),
        }
    }

    /// Set the model to use
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Set custom base URL (for API-compatible services)
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    /// Select the request mode
    pub fn with_mode(mut self, mode: RequestMode) -> Self {
        self.mode = mode;
        self
    }

    /// Set a fixed client-side timeout for completion requests
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.client = Client::builder()
            .timeout(timeout)
            .build()
            .expect("Failed to build reqwest client");
        self
    }

    async fn post_chat(&self, history: &[Message]) -> Result<String, CompletionError> {
        let body = ChatRequest {
            model: &self.model,
            messages: history,
        };

        let text = self.post_json("/chat/completions", &body).await?;
        let data: ChatResponse = serde_json::from_str(&text)?;
        let choice = data
            .choices
            .into_iter()
            .next()
            .ok_or(CompletionError::EmptyChoices)?;
        Ok(choice.message.content.unwrap_or_default())
    }

    async fn post_prompt(&self, history: &[Message]) -> Result<String, CompletionError> {
        let latest = history.last().map(|m| m.content.as_str()).unwrap_or("");
        let body = PromptRequest {
            model: &self.model,
            prompt: vec![latest],
        };

        let text = self.post_json("/completions", &body).await?;
        let data: PromptResponse = serde_json::from_str(&text)?;
        let choice = data
            .choices
            .into_iter()
            .next()
            .ok_or(CompletionError::EmptyChoices)?;
        Ok(choice.text)
    }

    async fn post_json<B: Serialize>(
        &self,
        endpoint: &str,
        body: &B,
    ) -> Result<String, CompletionError> {
        let response = self
            .client
            .post(format!("{}{}", self.base_url, endpoint))
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(CompletionError::Api { status, body });
        }

        Ok(response.text().await?)
    }
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: &'a [Message],
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Deserialize)]
struct ChatChoiceMessage {
    content: Option<String>,
}

#[derive(Serialize)]
struct PromptRequest<'a> {
    model: &'a str,
    prompt: Vec<&'a str>,
}

#[derive(Deserialize)]
struct PromptResponse {
    choices: Vec<PromptChoice>,
}

#[derive(Deserialize)]
struct PromptChoice {
    text: String,
}

#[async_trait]
impl CompletionBackend for OpenAiClient {
    fn model(&self) -> &str {
        &self.model
    }

    async fn complete(&self, history: &[Message]) -> Result<Message, CompletionError> {
        let content = match self.mode {
            RequestMode::FullHistory => self.post_chat(history).await?,
            RequestMode::SinglePrompt => self.post_prompt(history).await?,
        };
        Ok(Message::assistant(content.trim()))
    }
}
