//! Ingest Pipeline (§4.2): routes an incoming Turn, mutates the Thread
//! population accordingly, and fans out to embedding, fact extraction, and
//! Scribe scheduling.

use std::sync::Arc;

use serde::Serialize;
use tracing::warn;

use crate::chunker;
use crate::database::Store;
use crate::error::Result;
use crate::fact_scrubber::FactScrubber;
use crate::governor::Governor;
use crate::models::{Embedding, RoutingScenario, Thread, ThreadStatus, Turn, GENERAL_DISCUSSION};
use crate::provider::Embedder;
use crate::scribe::Scribe;

#[derive(Debug, Clone, Serialize)]
pub struct IngestOutcome {
    pub thread_id: String,
    pub turn_id: String,
    pub routing_scenario: RoutingScenario,
    pub facts_extracted: usize,
}

pub struct IngestPipeline {
    governor: Governor,
    embedder: Option<Arc<dyn Embedder>>,
    fact_scrubber: Option<FactScrubber>,
    scribe: Option<Scribe>,
}

impl IngestPipeline {
    pub fn new(
        governor: Governor,
        embedder: Option<Arc<dyn Embedder>>,
        fact_scrubber: Option<FactScrubber>,
        scribe: Option<Scribe>,
    ) -> Self {
        Self {
            governor,
            embedder,
            fact_scrubber,
            scribe,
        }
    }

    pub async fn ingest(
        &self,
        store: Arc<Store>,
        user_message: String,
        assistant_message: String,
        keywords: Vec<String>,
        topics: Vec<String>,
    ) -> Result<IngestOutcome> {
        // §5: the whole route-then-mutate sequence is one critical section —
        // two concurrent ingests must serialize, not interleave.
        let guard = store.write_guard().await;
        store.repair_active_cardinality().await?;

        let decision = self
            .governor
            .route(&store, &keywords, &topics)
            .await?;

        let thread_id = self
            .apply_decision(&store, &decision.scenario, decision.matched_thread_id.clone(), decision.active_thread_id.clone(), &topics, &keywords)
            .await?;

        let turn = Turn::new(
            thread_id.clone(),
            user_message.clone(),
            assistant_message.clone(),
            keywords,
            topics,
        );
        store.turns().upsert(&turn).await?;

        let threads = store.threads();
        if let Some(mut thread) = threads.get(&thread_id).await? {
            thread.record_turn_appended();
            threads.upsert(&thread).await?;
        }
        drop(guard);

        let combined_text = turn.combined_text();

        if let Some(embedder) = &self.embedder {
            if let Err(err) = self
                .embed_turn(&store, embedder.as_ref(), &combined_text, &turn.id, &thread_id)
                .await
            {
                warn!(error = %err, turn_id = %turn.id, "embedding failed, continuing ingest");
            }
        }

        let facts_extracted = if let Some(scrubber) = &self.fact_scrubber {
            match scrubber
                .extract_and_save(&store, &combined_text, &thread_id, &turn.id)
                .await
            {
                Ok(count) => count,
                Err(err) => {
                    warn!(error = %err, turn_id = %turn.id, "fact extraction failed, continuing ingest");
                    0
                }
            }
        } else {
            0
        };

        if let Some(scribe) = &self.scribe {
            scribe.schedule(store.clone(), user_message).await;
        }

        Ok(IngestOutcome {
            thread_id,
            turn_id: turn.id,
            routing_scenario: decision.scenario,
            facts_extracted,
        })
    }

    async fn apply_decision(
        &self,
        store: &Store,
        scenario: &RoutingScenario,
        matched_thread_id: Option<String>,
        active_thread_id: Option<String>,
        topics: &[String],
        keywords: &[String],
    ) -> Result<String> {
        let threads = store.threads();

        match scenario {
            RoutingScenario::TopicContinuation => {
                let thread_id = matched_thread_id.expect("continuation always references a thread");
                if let Some(mut thread) = threads.get(&thread_id).await? {
                    thread.merge_keywords(keywords);
                    threads.upsert(&thread).await?;
                }
                Ok(thread_id)
            }
            RoutingScenario::TopicResumption => {
                let active_id = active_thread_id.expect("resumption always references the active thread");
                threads.update_status(&active_id, ThreadStatus::Paused).await?;

                let matched_id = matched_thread_id.expect("resumption always references a matched thread");
                threads.update_status(&matched_id, ThreadStatus::Active).await?;
                if let Some(mut thread) = threads.get(&matched_id).await? {
                    thread.merge_keywords(keywords);
                    threads.upsert(&thread).await?;
                }
                Ok(matched_id)
            }
            RoutingScenario::NewTopicFirst => {
                let topic_label = topics.first().cloned().unwrap_or_else(|| GENERAL_DISCUSSION.to_string());
                let thread = Thread::new(topic_label, keywords.to_vec());
                let thread_id = thread.id.clone();
                threads.upsert(&thread).await?;
                Ok(thread_id)
            }
            RoutingScenario::TopicShift => {
                let active_id = active_thread_id.expect("shift always references the active thread");
                threads.update_status(&active_id, ThreadStatus::Paused).await?;

                let topic_label = topics.first().cloned().unwrap_or_else(|| GENERAL_DISCUSSION.to_string());
                let thread = Thread::new(topic_label, keywords.to_vec());
                let thread_id = thread.id.clone();
                threads.upsert(&thread).await?;
                Ok(thread_id)
            }
        }
    }

    async fn embed_turn(
        &self,
        store: &Store,
        embedder: &dyn Embedder,
        combined_text: &str,
        turn_id: &str,
        thread_id: &str,
    ) -> Result<()> {
        let chunks = chunker::chunk(combined_text, turn_id)?;
        let embeddings_repo = store.embeddings();

        for chunk in chunks {
            let vector = embedder.embed(&chunk.content).await?;
            let embedding = Embedding::new(chunk.id, turn_id, thread_id, vector);
            embeddings_repo.save(&embedding).await?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::DatabaseManager;

    async fn pipeline_and_store() -> (IngestPipeline, Arc<Store>) {
        let manager = DatabaseManager::open_in_memory().await.unwrap();
        let store = Arc::new(Store::new(manager, None));
        let pipeline = IngestPipeline::new(Governor::new(0.3), None, None, None);
        (pipeline, store)
    }

    #[tokio::test]
    async fn e1_new_topic_first() {
        let (pipeline, store) = pipeline_and_store().await;
        let outcome = pipeline
            .ingest(store.clone(), "hi".to_string(), "hello".to_string(), vec!["hi".to_string()], vec!["chat".to_string()])
            .await
            .unwrap();

        assert_eq!(outcome.routing_scenario, RoutingScenario::NewTopicFirst);
        let actives = store.threads().list_by_status(ThreadStatus::Active).await.unwrap();
        assert_eq!(actives.len(), 1);
        assert_eq!(actives[0].topic_label, "chat");
        assert_eq!(actives[0].turn_count, 1);
    }

    #[tokio::test]
    async fn e2_continuation() {
        let (pipeline, store) = pipeline_and_store().await;
        pipeline
            .ingest(store.clone(), "hi".to_string(), "hello".to_string(), vec!["hi".to_string()], vec!["chat".to_string()])
            .await
            .unwrap();

        let outcome = pipeline
            .ingest(store.clone(), "hi again".to_string(), "hello again".to_string(), vec!["hi".to_string()], vec!["chat".to_string()])
            .await
            .unwrap();

        assert_eq!(outcome.routing_scenario, RoutingScenario::TopicContinuation);
        let actives = store.threads().list_by_status(ThreadStatus::Active).await.unwrap();
        assert_eq!(actives.len(), 1);
        assert_eq!(actives[0].turn_count, 2);
    }

    #[tokio::test]
    async fn e3_shift_then_e4_resumption() {
        let (pipeline, store) = pipeline_and_store().await;
        pipeline
            .ingest(store.clone(), "hi".to_string(), "hello".to_string(), vec!["hi".to_string()], vec!["chat".to_string()])
            .await
            .unwrap();

        let shift_outcome = pipeline
            .ingest(store.clone(), "pasta?".to_string(), "sure".to_string(), vec!["pasta".to_string(), "recipe".to_string()], vec!["cooking".to_string()])
            .await
            .unwrap();
        assert_eq!(shift_outcome.routing_scenario, RoutingScenario::TopicShift);

        let paused = store.threads().list_by_status(ThreadStatus::Paused).await.unwrap();
        assert_eq!(paused.len(), 1);
        assert_eq!(paused[0].topic_label, "chat");

        let resumption_outcome = pipeline
            .ingest(store.clone(), "and testing".to_string(), "ok".to_string(), vec!["hi".to_string()], vec!["chat".to_string()])
            .await
            .unwrap();
        assert_eq!(resumption_outcome.routing_scenario, RoutingScenario::TopicResumption);

        let actives = store.threads().list_by_status(ThreadStatus::Active).await.unwrap();
        assert_eq!(actives.len(), 1);
        assert_eq!(actives[0].topic_label, "chat");

        let paused = store.threads().list_by_status(ThreadStatus::Paused).await.unwrap();
        assert_eq!(paused.len(), 1);
        assert_eq!(paused[0].topic_label, "cooking");
    }
}
