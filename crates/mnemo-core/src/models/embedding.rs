use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A real-valued vector associated with a Chunk.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Embedding {
    pub id: String,
    pub chunk_id: String,
    pub turn_id: String,
    pub thread_id: String,
    pub vector: Vec<f64>,
    pub created_at: DateTime<Utc>,
}

impl Embedding {
    pub fn new(chunk_id: impl Into<String>, turn_id: impl Into<String>, thread_id: impl Into<String>, vector: Vec<f64>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            chunk_id: chunk_id.into(),
            turn_id: turn_id.into(),
            thread_id: thread_id.into(),
            vector,
            created_at: Utc::now(),
        }
    }
}

/// Cosine similarity of two equal-length vectors. Returns 0 if either norm is
/// zero or the lengths differ (§4.5).
pub fn cosine_similarity(a: &[f64], b: &[f64]) -> f64 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let dot: f64 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f64 = a.iter().map(|x| x * x).sum::<f64>().sqrt();
    let norm_b: f64 = b.iter().map(|x| x * x).sum::<f64>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    dot / (norm_a * norm_b)
}
