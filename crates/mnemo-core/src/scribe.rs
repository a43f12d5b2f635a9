//! Async profile-learning worker (§4.8). Runs off the ingest path; in-flight
//! tasks are tracked in a `JoinSet` so shutdown can await every one of them.

use std::sync::Arc;

use serde::Deserialize;
use tokio::sync::Mutex;
use tokio::task::JoinSet;
use tracing::{error, warn};

use crate::backoff::{parse_retryable_json, retry, RetryConfig};
use crate::database::Store;
use crate::error::Result;
use crate::models::ProfileExtraction;
use crate::provider::{ChatMessage, ChatModel};

const SYSTEM_PROMPT: &str = "Given the following user message, extract any new profile \
information. Respond with a JSON object with optional \"name\", \"preferences\" (array \
of strings), and \"topics_of_interest\" (array of strings) fields. Respond with JSON only.";

#[derive(Debug, Deserialize)]
struct RawExtraction {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    preferences: Option<Vec<String>>,
    #[serde(default)]
    topics_of_interest: Option<Vec<String>>,
}

impl From<RawExtraction> for ProfileExtraction {
    fn from(raw: RawExtraction) -> Self {
        Self {
            name: raw.name,
            preferences: raw.preferences,
            topics_of_interest: raw.topics_of_interest,
        }
    }
}

#[derive(Clone)]
pub struct Scribe {
    chat: Arc<dyn ChatModel>,
    retry: RetryConfig,
    tasks: Arc<Mutex<JoinSet<()>>>,
}

impl Scribe {
    pub fn new(chat: Arc<dyn ChatModel>, retry: RetryConfig) -> Self {
        Self {
            chat,
            retry,
            tasks: Arc::new(Mutex::new(JoinSet::new())),
        }
    }

    /// Spawns an off-path profile-learning task for `user_text`. Ignores
    /// empty/whitespace input without spawning.
    pub async fn schedule(&self, store: Arc<Store>, user_text: String) {
        if user_text.trim().is_empty() {
            return;
        }

        let chat = self.chat.clone();
        let retry_config = self.retry.clone();
        let mut tasks = self.tasks.lock().await;
        tasks.spawn(async move {
            if let Err(err) = Self::learn(store, chat, retry_config, user_text).await {
                error!(error = %err, "scribe: profile learning failed after retries");
            }
        });
    }

    async fn learn(
        store: Arc<Store>,
        chat: Arc<dyn ChatModel>,
        retry_config: RetryConfig,
        user_text: String,
    ) -> Result<()> {
        let messages = [
            ChatMessage::system(SYSTEM_PROMPT),
            ChatMessage::user(user_text),
        ];

        let extraction: ProfileExtraction = retry(&retry_config, || async {
            let raw = chat.chat(&messages).await?;
            parse_retryable_json::<RawExtraction>(&raw).map(Into::into)
        })
        .await?;

        // §4.8 step 3 / §5: exclusive profile lock around the reload-merge-save cycle.
        let _guard = store.profile_guard().await;
        let profile_repo = store.profile();
        let mut profile = profile_repo.get().await?.unwrap_or_default();
        profile.merge(&extraction);
        profile_repo.upsert(&profile).await?;
        Ok(())
    }

    /// Blocks until every in-flight Scribe task has terminated. Individual
    /// task failures are already logged by the task itself and are swallowed
    /// here so one does not block draining the rest.
    pub async fn shutdown(&self) {
        let mut tasks = self.tasks.lock().await;
        while let Some(result) = tasks.join_next().await {
            if let Err(join_err) = result {
                warn!(error = %join_err, "scribe task panicked during shutdown drain");
            }
        }
    }

    pub async fn in_flight_count(&self) -> usize {
        self.tasks.lock().await.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::DatabaseManager;
    use async_trait::async_trait;
    use std::time::Duration;

    struct StubChat(String);

    #[async_trait]
    impl ChatModel for StubChat {
        async fn chat(&self, _messages: &[ChatMessage]) -> Result<String> {
            Ok(self.0.clone())
        }
    }

    async fn store() -> Arc<Store> {
        let manager = DatabaseManager::open_in_memory().await.unwrap();
        Arc::new(Store::new(manager, None))
    }

    #[tokio::test]
    async fn empty_text_is_ignored_without_spawning() {
        let store = store().await;
        let chat = Arc::new(StubChat("{}".to_string()));
        let scribe = Scribe::new(chat, RetryConfig::new(3, Duration::from_millis(1)));

        scribe.schedule(store, "   ".to_string()).await;
        assert_eq!(scribe.in_flight_count().await, 0);
    }

    #[tokio::test]
    async fn successful_extraction_merges_into_profile() {
        let store = store().await;
        let chat = Arc::new(StubChat(r#"{"name":"Ada","preferences":["tea"]}"#.to_string()));
        let scribe = Scribe::new(chat, RetryConfig::new(3, Duration::from_millis(1)));

        scribe.schedule(store.clone(), "I like tea, I'm Ada".to_string()).await;
        scribe.shutdown().await;

        let profile = store.profile().get().await.unwrap().unwrap();
        assert_eq!(profile.name, "Ada");
        assert!(profile.preferences.contains("tea"));
    }

    #[tokio::test]
    async fn shutdown_drains_failing_tasks_without_blocking() {
        let store = store().await;
        let chat = Arc::new(StubChat("not json".to_string()));
        let scribe = Scribe::new(chat, RetryConfig::new(1, Duration::from_millis(1)));

        scribe.schedule(store, "hello there".to_string()).await;
        scribe.shutdown().await;
        assert_eq!(scribe.in_flight_count().await, 0);
    }
}
