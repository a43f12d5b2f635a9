//! `MemoryEngine`: the facade the dispatch surface talks to (§4.9). One
//! method per tool name in §6; owns the shared store handle, Governor (via
//! the Ingest Pipeline), Crawler, Hydrator, and Scribe handle.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::backoff::RetryConfig;
use crate::config::Config;
use crate::database::{DatabaseManager, Store};
use crate::error::Result;
use crate::fact_scrubber::FactScrubber;
use crate::governor::Governor;
use crate::ingest::{IngestOutcome, IngestPipeline};
use crate::keywords;
use crate::models::{normalize_key, Fact, ProfileExtraction, RoutingScenario, Thread, ThreadStatus, Turn, UserProfile};
use crate::provider::{ChatModel, Embedder, OpenAiProvider};
use crate::retrieval::{Candidate, Crawler, Hydrator};
use crate::scribe::Scribe;

const DEFAULT_MAX_RESULTS: usize = 5;
const DEFAULT_FACT_SEARCH_LIMIT: i64 = 5;
const DEFAULT_TOKEN_BUDGET: usize = 2048;

#[derive(Debug, Clone, Serialize)]
pub struct StoreConversationResult {
    pub block_id: String,
    pub turn_id: String,
    pub routing_scenario: RoutingScenario,
    pub facts_extracted: usize,
}

impl From<IngestOutcome> for StoreConversationResult {
    fn from(outcome: IngestOutcome) -> Self {
        Self {
            block_id: outcome.thread_id,
            turn_id: outcome.turn_id,
            routing_scenario: outcome.routing_scenario,
            facts_extracted: outcome.facts_extracted,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct MemorySummary {
    pub block_id: String,
    pub topic_label: String,
    pub relevance: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct RetrieveMemoryResult {
    pub memories: Vec<MemorySummary>,
    pub facts: Vec<Fact>,
}

#[derive(Debug, Clone, Serialize)]
pub struct TopicSummary {
    pub block_id: String,
    pub topic_label: String,
    pub status: ThreadStatus,
    pub turn_count: i64,
    pub created_at: DateTime<Utc>,
}

impl From<Thread> for TopicSummary {
    fn from(thread: Thread) -> Self {
        Self {
            block_id: thread.id,
            topic_label: thread.topic_label,
            status: thread.status,
            turn_count: thread.turn_count,
            created_at: thread.created_at,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ListActiveTopicsResult {
    pub topics: Vec<TopicSummary>,
}

#[derive(Debug, Clone, Serialize)]
pub struct TopicHistoryResult {
    pub block_id: String,
    pub topic_label: String,
    pub turns: Vec<Turn>,
    pub summary: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct UserProfileResult {
    pub profile: UserProfile,
}

#[derive(Debug, Clone, Serialize)]
pub struct UpdateProfileResult {
    pub success: bool,
    pub profile: UserProfile,
}

pub struct MemoryEngine {
    store: Arc<Store>,
    ingest: IngestPipeline,
    crawler: Crawler,
    hydrator: Hydrator,
    scribe: Option<Scribe>,
    token_budget: usize,
}

impl MemoryEngine {
    pub fn new(
        store: Arc<Store>,
        ingest: IngestPipeline,
        crawler: Crawler,
        hydrator: Hydrator,
        scribe: Option<Scribe>,
        token_budget: usize,
    ) -> Self {
        Self {
            store,
            ingest,
            crawler,
            hydrator,
            scribe,
            token_budget,
        }
    }

    /// Wires every component from a [`Config`]: opens the backing store at
    /// `config.db_path()`, constructs the OpenAI-backed provider when
    /// `OPENAI_API_KEY` is set (§6), and assembles the Governor, Ingest
    /// Pipeline, Crawler, Hydrator, and Scribe around it.
    pub async fn bootstrap(config: &Config) -> Result<Self> {
        let manager = DatabaseManager::new(config.db_path()).await?;
        let store = Arc::new(Store::new(manager, Some(config.vector_dimension)));

        let provider = OpenAiProvider::from_config(&config.provider, config.vector_dimension)?
            .map(Arc::new);

        let embedder: Option<Arc<dyn Embedder>> =
            provider.clone().map(|p| p as Arc<dyn Embedder>);
        let chat: Option<Arc<dyn ChatModel>> = provider.map(|p| p as Arc<dyn ChatModel>);

        let retry = RetryConfig::new(config.provider.max_retries, config.provider.retry_delay);

        let fact_scrubber = chat.clone().map(|c| FactScrubber::new(c, retry.clone()));
        let scribe = chat.map(|c| Scribe::new(c, retry));

        let governor = Governor::new(config.topic_match_threshold);
        let ingest = IngestPipeline::new(governor, embedder.clone(), fact_scrubber, scribe.clone());
        let crawler = Crawler::new(embedder.clone());
        let hydrator = Hydrator::new(Crawler::new(embedder));

        Ok(Self::new(store, ingest, crawler, hydrator, scribe, DEFAULT_TOKEN_BUDGET))
    }

    pub async fn store_conversation(&self, message: String, context: Option<String>) -> Result<StoreConversationResult> {
        let (keywords, topics) = keywords::extract(&message);
        let assistant_message = context.unwrap_or_default();

        let outcome = self
            .ingest
            .ingest(self.store.clone(), message, assistant_message, keywords, topics)
            .await?;

        Ok(outcome.into())
    }

    pub async fn retrieve_memory(&self, query: &str, max_results: Option<usize>) -> Result<RetrieveMemoryResult> {
        let k = max_results.unwrap_or(DEFAULT_MAX_RESULTS);

        let candidates = self.crawler.candidates(&self.store, query, k).await?;
        let memories = candidates
            .into_iter()
            .map(|c: Candidate| MemorySummary {
                block_id: c.thread.id,
                topic_label: c.thread.topic_label,
                relevance: c.score,
            })
            .collect();

        let facts = self.store.facts().search(query, k as i64).await?;

        Ok(RetrieveMemoryResult { memories, facts })
    }

    pub async fn list_active_topics(&self) -> Result<ListActiveTopicsResult> {
        let _guard = self.store.write_guard().await;
        self.store.repair_active_cardinality().await?;
        let actives = self.store.threads().list_by_status(ThreadStatus::Active).await?;
        Ok(ListActiveTopicsResult {
            topics: actives.into_iter().map(TopicSummary::from).collect(),
        })
    }

    pub async fn get_topic_history(&self, block_id: &str) -> Result<Option<TopicHistoryResult>> {
        let Some(thread) = self.store.threads().get(block_id).await? else {
            return Ok(None);
        };

        let turns = self.store.turns().list_by_thread(block_id).await?;
        Ok(Some(TopicHistoryResult {
            block_id: thread.id,
            topic_label: thread.topic_label,
            turns,
            summary: thread.summary,
        }))
    }

    pub async fn get_user_profile(&self) -> Result<UserProfileResult> {
        let profile = self.store.profile().get().await?.unwrap_or_default();
        Ok(UserProfileResult { profile })
    }

    pub async fn update_user_profile(
        &self,
        name: Option<String>,
        preferences: Option<Vec<String>>,
        topics_of_interest: Option<Vec<String>>,
    ) -> Result<UpdateProfileResult> {
        let _guard = self.store.profile_guard().await;
        let profile_repo = self.store.profile();
        let mut profile = profile_repo.get().await?.unwrap_or_default();

        // §3 invariant 6: route through the same merge as Scribe so this tool
        // never shrinks the existing preference/topic sets.
        profile.merge(&ProfileExtraction {
            name,
            preferences,
            topics_of_interest,
        });

        profile_repo.upsert(&profile).await?;
        Ok(UpdateProfileResult { success: true, profile })
    }

    pub async fn add_fact(&self, key: String, value: String, confidence: Option<f64>) -> Result<String> {
        let fact = Fact::new(normalize_key(&key), value, confidence.unwrap_or(1.0), None, None)?;
        let id = fact.id.clone();
        self.store.facts().upsert(&fact).await?;
        Ok(id)
    }

    pub async fn get_fact(&self, key: &str) -> Result<Option<Fact>> {
        self.store.facts().get_by_key(key).await
    }

    pub async fn delete_fact(&self, key: &str) -> Result<u64> {
        self.store.facts().delete_by_key(key).await
    }

    pub async fn archive_topic(&self, block_id: &str) -> Result<bool> {
        let _guard = self.store.write_guard().await;
        if self.store.threads().get(block_id).await?.is_none() {
            return Ok(false);
        }
        self.store.threads().update_status(block_id, ThreadStatus::Archived).await?;
        Ok(true)
    }

    pub async fn delete_topic(&self, block_id: &str) -> Result<bool> {
        let _guard = self.store.write_guard().await;
        if self.store.threads().get(block_id).await?.is_none() {
            return Ok(false);
        }
        self.store.threads().delete(block_id).await?;
        Ok(true)
    }

    /// Assembles a bounded prompt for `block_id`; not a named tool operation
    /// itself, but the Hydrator entry point other callers (e.g. a future
    /// chat-completion surface) would use.
    pub async fn hydrate_prompt(&self, block_id: &str, user_text: &str, token_budget: Option<usize>) -> Result<String> {
        self.hydrator
            .assemble(&self.store, block_id, user_text, token_budget.unwrap_or(self.token_budget))
            .await
    }

    /// Blocks until every in-flight Scribe task has terminated. Part of the
    /// documented shutdown sequence (§5); a no-op when no provider is configured.
    pub async fn shutdown(&self) {
        if let Some(scribe) = &self.scribe {
            scribe.shutdown().await;
        }
    }

    pub async fn health_check(&self) -> Result<()> {
        self.store.health_check().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::DatabaseManager;
    use crate::governor::Governor;

    async fn engine() -> MemoryEngine {
        let manager = DatabaseManager::open_in_memory().await.unwrap();
        let store = Arc::new(Store::new(manager, None));
        let ingest = IngestPipeline::new(Governor::new(0.3), None, None, None);
        let crawler = Crawler::new(None);
        let hydrator = Hydrator::new(Crawler::new(None));
        MemoryEngine::new(store, ingest, crawler, hydrator, None, DEFAULT_TOKEN_BUDGET)
    }

    #[tokio::test]
    async fn store_conversation_creates_a_new_active_topic() {
        let engine = engine().await;
        let result = engine
            .store_conversation("hello there, testing things".to_string(), None)
            .await
            .unwrap();

        assert_eq!(result.routing_scenario, RoutingScenario::NewTopicFirst);

        let topics = engine.list_active_topics().await.unwrap();
        assert_eq!(topics.topics.len(), 1);
        assert_eq!(topics.topics[0].block_id, result.block_id);
    }

    #[tokio::test]
    async fn add_fact_normalizes_a_non_snake_case_key() {
        let engine = engine().await;
        engine
            .add_fact("Favorite Color".to_string(), "blue".to_string(), None)
            .await
            .unwrap();

        let fetched = engine.get_fact("favorite_color").await.unwrap().unwrap();
        assert_eq!(fetched.value, "blue");
    }

    #[tokio::test]
    async fn add_get_delete_fact_roundtrip() {
        let engine = engine().await;
        engine
            .add_fact("favorite_color".to_string(), "blue".to_string(), None)
            .await
            .unwrap();

        let fetched = engine.get_fact("favorite_color").await.unwrap().unwrap();
        assert_eq!(fetched.value, "blue");

        let deleted = engine.delete_fact("favorite_color").await.unwrap();
        assert_eq!(deleted, 1);
        assert!(engine.get_fact("favorite_color").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn update_profile_sets_unset_fields() {
        let engine = engine().await;
        engine
            .update_user_profile(Some("Ada".to_string()), Some(vec!["tea".to_string()]), None)
            .await
            .unwrap();

        let result = engine
            .update_user_profile(None, None, Some(vec!["rust".to_string()]))
            .await
            .unwrap();

        assert_eq!(result.profile.name, "Ada");
        assert!(result.profile.preferences.contains("tea"));
        assert!(result.profile.topics_of_interest.contains("rust"));
    }

    #[tokio::test]
    async fn update_profile_never_shrinks_existing_preferences() {
        let engine = engine().await;
        engine
            .update_user_profile(None, Some(vec!["tea".to_string()]), None)
            .await
            .unwrap();

        let result = engine
            .update_user_profile(None, Some(vec!["coffee".to_string()]), None)
            .await
            .unwrap();

        assert!(result.profile.preferences.contains("tea"));
        assert!(result.profile.preferences.contains("coffee"));
    }

    #[tokio::test]
    async fn archive_and_delete_topic() {
        let engine = engine().await;
        let result = engine
            .store_conversation("discussing rust programming".to_string(), None)
            .await
            .unwrap();

        assert!(engine.archive_topic(&result.block_id).await.unwrap());
        let history = engine.get_topic_history(&result.block_id).await.unwrap().unwrap();
        assert_eq!(history.block_id, result.block_id);

        assert!(engine.delete_topic(&result.block_id).await.unwrap());
        assert!(engine.get_topic_history(&result.block_id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn unknown_topic_operations_return_false_or_none() {
        let engine = engine().await;
        assert!(!engine.archive_topic("missing").await.unwrap());
        assert!(!engine.delete_topic("missing").await.unwrap());
        assert!(engine.get_topic_history("missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn bootstrap_without_api_key_disables_scribe_and_embeddings() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config {
            data_dir: dir.path().to_path_buf(),
            vector_dimension: 4,
            topic_match_threshold: 0.3,
            provider: crate::config::ProviderConfig {
                api_key: None,
                timeout: std::time::Duration::from_secs(1),
                max_retries: 1,
                retry_delay: std::time::Duration::from_millis(1),
            },
        };

        let engine = MemoryEngine::bootstrap(&config).await.unwrap();
        assert!(engine.scribe.is_none());
        engine.health_check().await.unwrap();
        engine.shutdown().await;
    }
}
