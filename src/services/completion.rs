use crate::config::CompletionConfig;
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

/// Returned in place of an answer when the provider sends no choices
pub const NO_RESPONSE: &str = "No response from AI";

#[derive(Error, Debug)]
pub enum CompletionError {
    #[error("completion request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("completion provider returned status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("malformed completion response: {0}")]
    Malformed(#[from] serde_json::Error),
}

/// Trait for chat-completion backends
#[async_trait]
pub trait CompletionProvider: Send + Sync {
    /// Send `prompt` as a single user message and return the answer text
    async fn complete(&self, prompt: &str) -> Result<String, CompletionError>;
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    messages: Vec<ChatMessage<'a>>,
    model: &'a str,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    #[serde(default)]
    message: Option<ChoiceMessage>,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

impl ChatResponse {
    fn into_answer(self) -> String {
        self.choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message)
            .and_then(|message| message.content)
            .filter(|content| !content.is_empty())
            .unwrap_or_else(|| NO_RESPONSE.to_string())
    }
}

/// OpenAI-compatible chat completions client (Groq by default)
pub struct ChatCompletionClient {
    client: Client,
    endpoint: Url,
    api_key: String,
    model: String,
}

impl ChatCompletionClient {
    pub fn new(client: Client, config: &CompletionConfig) -> Self {
        Self {
            client,
            endpoint: config.endpoint.clone(),
            api_key: config.api_key.clone(),
            model: config.model.clone(),
        }
    }
}

#[async_trait]
impl CompletionProvider for ChatCompletionClient {
    async fn complete(&self, prompt: &str) -> Result<String, CompletionError> {
        let request = ChatRequest {
            messages: vec![ChatMessage {
                role: "user",
                content: prompt,
            }],
            model: &self.model,
        };

        tracing::debug!(
            "Requesting completion from {} (model: {})",
            self.endpoint,
            self.model
        );

        let response = self
            .client
            .post(self.endpoint.clone())
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(CompletionError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: ChatResponse = serde_json::from_str(&body)?;
        Ok(parsed.into_answer())
    }
}
