//! LLM-driven key/value extraction, linked to a turn+thread (§4.4).

use std::sync::Arc;

use serde::Deserialize;
use tracing::warn;

use crate::backoff::{parse_retryable_json, retry, RetryConfig};
use crate::database::Store;
use crate::error::Result;
use crate::models::{normalize_key, Fact};
use crate::provider::{ChatMessage, ChatModel};

const SYSTEM_PROMPT: &str = "Extract factual key/value assertions from the following \
conversation turn. Respond with a JSON array of objects, each with \"key\" (lowercase, \
underscores), \"value\" (string), and \"confidence\" (0.0-1.0). Respond with an empty \
array if no facts are present. Respond with JSON only.";

#[derive(Debug, Deserialize)]
struct ExtractedFact {
    key: String,
    value: String,
    #[serde(default = "default_confidence")]
    confidence: f64,
}

fn default_confidence() -> f64 {
    1.0
}

pub struct FactScrubber {
    chat: Arc<dyn ChatModel>,
    retry: RetryConfig,
}

impl FactScrubber {
    pub fn new(chat: Arc<dyn ChatModel>, retry: RetryConfig) -> Self {
        Self { chat, retry }
    }

    /// Extracts facts from `text` and persists them against `thread_id`/`turn_id`.
    /// An empty extraction is a normal outcome; returns the count saved.
    pub async fn extract_and_save(
        &self,
        store: &Store,
        text: &str,
        thread_id: &str,
        turn_id: &str,
    ) -> Result<usize> {
        let messages = [
            ChatMessage::system(SYSTEM_PROMPT),
            ChatMessage::user(text),
        ];

        let extracted: Vec<ExtractedFact> = retry(&self.retry, || async {
            let raw = self.chat.chat(&messages).await?;
            parse_retryable_json(&raw)
        })
        .await?;

        let facts = store.facts();
        let mut saved = 0;
        for item in extracted {
            match Fact::new(
                normalize_key(&item.key),
                item.value,
                item.confidence,
                Some(thread_id.to_string()),
                Some(turn_id.to_string()),
            ) {
                Ok(fact) => {
                    facts.upsert(&fact).await?;
                    saved += 1;
                }
                Err(err) => warn!(error = %err, "skipping invalid extracted fact"),
            }
        }

        Ok(saved)
    }
}
