//! Hybrid keyword + vector candidate search over Threads (§4.6).

use std::collections::HashMap;
use std::sync::Arc;

use crate::database::Store;
use crate::error::Result;
use crate::models::Thread;
use crate::provider::Embedder;

const KEYWORD_BASE_RELEVANCE: f64 = 0.5;

/// A Thread ranked against a query, with the combined relevance score that
/// produced its position.
#[derive(Debug, Clone)]
pub struct Candidate {
    pub thread: Thread,
    pub score: f64,
}

pub struct Crawler {
    embedder: Option<Arc<dyn Embedder>>,
}

impl Crawler {
    pub fn new(embedder: Option<Arc<dyn Embedder>>) -> Self {
        Self { embedder }
    }

    /// Hybrid path: keyword scan always runs; semantic scan runs too when an
    /// embedder is configured. See §4.6 for the merge rule.
    pub async fn candidates(&self, store: &Store, query: &str, k: usize) -> Result<Vec<Candidate>> {
        let mut scores = self.keyword_scores(store, query).await?;

        if let Some(embedder) = &self.embedder {
            let query_vector = embedder.embed(query).await?;
            self.merge_vector_scores(store, &query_vector, &mut scores).await?;
        }

        self.resolve_candidates(store, scores, k).await
    }

    /// Semantic-only path: skips the keyword scan and the query-embedding step.
    pub async fn candidates_by_vector(&self, store: &Store, query_vector: &[f64], k: usize) -> Result<Vec<Candidate>> {
        let mut scores = HashMap::new();
        self.merge_vector_scores(store, query_vector, &mut scores).await?;
        self.resolve_candidates(store, scores, k).await
    }

    async fn keyword_scores(&self, store: &Store, query: &str) -> Result<HashMap<String, f64>> {
        let query_lower = query.to_lowercase();
        let mut scores = HashMap::new();

        for thread in store.threads().list_all().await? {
            // §4.6: a Thread matches when its topic-label or any keyword is a
            // substring of the query — both checks share the same direction.
            let topic_matches = query_lower.contains(&thread.topic_label.to_lowercase());
            let keyword_matches = thread
                .keywords
                .iter()
                .any(|k| query_lower.contains(&k.to_lowercase()));

            if topic_matches || keyword_matches {
                scores.insert(thread.id.clone(), KEYWORD_BASE_RELEVANCE);
            }
        }

        Ok(scores)
    }

    /// Projects per-chunk similarity up to Threads by taking each Thread's
    /// maximum chunk similarity, then merges into `scores` by arithmetic mean
    /// where a keyword score already exists for that Thread.
    async fn merge_vector_scores(
        &self,
        store: &Store,
        query_vector: &[f64],
        scores: &mut HashMap<String, f64>,
    ) -> Result<()> {
        let matches = store.embeddings().search_similar(query_vector, usize::MAX).await?;

        let mut per_thread_max: HashMap<String, f64> = HashMap::new();
        for (embedding, similarity) in matches {
            let entry = per_thread_max.entry(embedding.thread_id).or_insert(similarity);
            if similarity > *entry {
                *entry = similarity;
            }
        }

        for (thread_id, semantic_score) in per_thread_max {
            scores
                .entry(thread_id)
                .and_modify(|keyword_score| *keyword_score = (*keyword_score + semantic_score) / 2.0)
                .or_insert(semantic_score);
        }

        Ok(())
    }

    async fn resolve_candidates(
        &self,
        store: &Store,
        scores: HashMap<String, f64>,
        k: usize,
    ) -> Result<Vec<Candidate>> {
        let threads = store.threads();
        let mut ranked = Vec::with_capacity(scores.len());

        for (thread_id, score) in scores {
            if let Some(thread) = threads.get(&thread_id).await? {
                ranked.push(Candidate { thread, score });
            }
            // Unreachable threads (deleted between scoring and hydration) are skipped.
        }

        ranked.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
        ranked.truncate(k);
        Ok(ranked)
    }
}
