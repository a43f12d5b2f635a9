//! HTTP-backed `Embedder`/`ChatModel` adapter against the OpenAI-compatible
//! embeddings/chat-completions API. Gated entirely by presence of an API key
//! (§6); absence disables the embedder/chat/Scribe.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::backoff::{retry, RetryConfig};
use crate::config::ProviderConfig;
use crate::error::{MemoryError, Result};

use super::traits::{ChatMessage, ChatModel, ChatRole, Embedder};

const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
const DEFAULT_EMBEDDING_MODEL: &str = "text-embedding-3-small";
const DEFAULT_CHAT_MODEL: &str = "gpt-4o-mini";

pub struct OpenAiProvider {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
    embedding_model: String,
    chat_model: String,
    dimension: usize,
    retry: RetryConfig,
}

impl OpenAiProvider {
    /// Returns `None` when no API key is configured (embedder/chat/Scribe disabled).
    pub fn from_config(config: &ProviderConfig, dimension: usize) -> Result<Option<Self>> {
        let Some(api_key) = config.api_key.clone() else {
            return Ok(None);
        };

        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()?;

        Ok(Some(Self {
            client,
            api_key,
            base_url: DEFAULT_BASE_URL.to_string(),
            embedding_model: DEFAULT_EMBEDDING_MODEL.to_string(),
            chat_model: DEFAULT_CHAT_MODEL.to_string(),
            dimension,
            retry: RetryConfig::new(config.max_retries, config.retry_delay),
        }))
    }

    fn auth_header(&self) -> String {
        format!("Bearer {}", self.api_key)
    }
}

#[derive(Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a str,
}

#[derive(Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingDatum>,
}

#[derive(Deserialize)]
struct EmbeddingDatum {
    embedding: Vec<f64>,
}

#[async_trait]
impl Embedder for OpenAiProvider {
    async fn embed(&self, text: &str) -> Result<Vec<f64>> {
        let body = EmbeddingRequest {
            model: &self.embedding_model,
            input: text,
        };

        retry(&self.retry, || async {
            let response = self
                .client
                .post(format!("{}/embeddings", self.base_url))
                .header("Authorization", self.auth_header())
                .json(&body)
                .send()
                .await?;

            if !response.status().is_success() {
                return Err(MemoryError::provider(format!(
                    "embedding request failed with status {}",
                    response.status()
                )));
            }

            let parsed: EmbeddingResponse = response.json().await?;
            parsed
                .data
                .into_iter()
                .next()
                .map(|d| d.embedding)
                .ok_or_else(|| MemoryError::provider("embedding response contained no data"))
        })
        .await
    }

    fn dimension(&self) -> usize {
        self.dimension
    }
}

#[derive(Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: Vec<ChatCompletionMessage<'a>>,
}

#[derive(Serialize)]
struct ChatCompletionMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<ChatCompletionChoice>,
}

#[derive(Deserialize)]
struct ChatCompletionChoice {
    message: ChatCompletionChoiceMessage,
}

#[derive(Deserialize)]
struct ChatCompletionChoiceMessage {
    content: String,
}

fn role_str(role: ChatRole) -> &'static str {
    match role {
        ChatRole::System => "system",
        ChatRole::User => "user",
        ChatRole::Assistant => "assistant",
    }
}

#[async_trait]
impl ChatModel for OpenAiProvider {
    async fn chat(&self, messages: &[ChatMessage]) -> Result<String> {
        let payload_messages: Vec<ChatCompletionMessage> = messages
            .iter()
            .map(|m| ChatCompletionMessage {
                role: role_str(m.role),
                content: &m.content,
            })
            .collect();

        let body = ChatCompletionRequest {
            model: &self.chat_model,
            messages: payload_messages,
        };

        retry(&self.retry, || async {
            let response = self
                .client
                .post(format!("{}/chat/completions", self.base_url))
                .header("Authorization", self.auth_header())
                .json(&body)
                .send()
                .await?;

            if !response.status().is_success() {
                return Err(MemoryError::provider(format!(
                    "chat completion request failed with status {}",
                    response.status()
                )));
            }

            let parsed: ChatCompletionResponse = response.json().await?;
            parsed
                .choices
                .into_iter()
                .next()
                .map(|c| c.message.content)
                .ok_or_else(|| MemoryError::provider("chat completion response contained no choices"))
        })
        .await
    }
}
