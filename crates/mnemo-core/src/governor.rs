//! Topic router (§4.1): classifies an incoming Turn against the current
//! Thread population into one of four routing scenarios.

use crate::database::Store;
use crate::error::Result;
use crate::models::{RoutingDecision, Thread, ThreadStatus};

pub struct Governor {
    topic_match_threshold: f32,
}

impl Governor {
    pub fn new(topic_match_threshold: f32) -> Self {
        Self {
            topic_match_threshold,
        }
    }

    pub async fn route(
        &self,
        store: &Store,
        turn_keywords: &[String],
        turn_topics: &[String],
    ) -> Result<RoutingDecision> {
        let threads = store.threads();
        // §9: store list order is updated_at desc, which is what makes this deterministic.
        let actives = threads.list_by_status(ThreadStatus::Active).await?;

        let Some(active) = actives.into_iter().next() else {
            return Ok(RoutingDecision::new_topic_first());
        };

        if self.topic_matches(&active, turn_keywords, turn_topics) {
            return Ok(RoutingDecision::continuation(active.id));
        }

        let paused = threads.list_by_status(ThreadStatus::Paused).await?;
        for candidate in paused {
            if self.topic_matches(&candidate, turn_keywords, turn_topics) {
                return Ok(RoutingDecision::resumption(candidate.id, active.id));
            }
        }

        Ok(RoutingDecision::shift(active.id))
    }

    /// §4.1 topic-match predicate.
    fn topic_matches(&self, thread: &Thread, turn_keywords: &[String], turn_topics: &[String]) -> bool {
        if turn_topics.iter().any(|t| t == &thread.topic_label) {
            return true;
        }

        if turn_keywords.is_empty() || thread.keywords.is_empty() {
            return false;
        }

        let overlap = turn_keywords
            .iter()
            .filter(|k| {
                thread
                    .keywords
                    .iter()
                    .any(|tk| tk.eq_ignore_ascii_case(k))
            })
            .count();

        (overlap as f32 / turn_keywords.len() as f32) >= self.topic_match_threshold
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::DatabaseManager;
    use crate::models::{RoutingScenario, Thread};

    async fn store() -> Store {
        let manager = DatabaseManager::open_in_memory().await.unwrap();
        Store::new(manager, None)
    }

    #[tokio::test]
    async fn empty_store_yields_new_topic_first() {
        let store = store().await;
        let governor = Governor::new(0.3);

        let decision = governor
            .route(&store, &["hi".to_string()], &["chat".to_string()])
            .await
            .unwrap();
        assert_eq!(decision.scenario, RoutingScenario::NewTopicFirst);
    }

    #[tokio::test]
    async fn matching_active_thread_yields_continuation() {
        let store = store().await;
        let active = Thread::new("chat", vec!["hi".to_string()]);
        store.threads().upsert(&active).await.unwrap();

        let governor = Governor::new(0.3);
        let decision = governor
            .route(&store, &["hi".to_string()], &["chat".to_string()])
            .await
            .unwrap();
        assert_eq!(decision.scenario, RoutingScenario::TopicContinuation);
        assert_eq!(decision.matched_thread_id.unwrap(), active.id);
    }

    #[tokio::test]
    async fn unmatched_active_yields_shift() {
        let store = store().await;
        let active = Thread::new("chat", vec!["hi".to_string()]);
        store.threads().upsert(&active).await.unwrap();

        let governor = Governor::new(0.3);
        let decision = governor
            .route(&store, &["pasta".to_string(), "recipe".to_string()], &["cooking".to_string()])
            .await
            .unwrap();
        assert_eq!(decision.scenario, RoutingScenario::TopicShift);
        assert_eq!(decision.active_thread_id.unwrap(), active.id);
    }

    #[tokio::test]
    async fn matching_paused_thread_yields_resumption() {
        let store = store().await;
        let mut paused = Thread::new("chat", vec!["hi".to_string()]);
        paused.set_status(ThreadStatus::Paused);
        store.threads().upsert(&paused).await.unwrap();

        let active = Thread::new("cooking", vec!["pasta".to_string()]);
        store.threads().upsert(&active).await.unwrap();

        let governor = Governor::new(0.3);
        let decision = governor
            .route(&store, &["hi".to_string()], &["chat".to_string()])
            .await
            .unwrap();
        assert_eq!(decision.scenario, RoutingScenario::TopicResumption);
        assert_eq!(decision.matched_thread_id.unwrap(), paused.id);
        assert_eq!(decision.active_thread_id.unwrap(), active.id);
    }
}
