use chrono::{DateTime, Utc};
use sqlx::{sqlite::SqliteRow, Pool, Row, Sqlite};

use crate::error::{MemoryError, Result};
use crate::models::{cosine_similarity, Embedding};

use super::connection::DatabaseManager;
use super::vector::{decode_vector, encode_vector};

pub struct EmbeddingRepository {
    pool: Pool<Sqlite>,
    expected_dimension: Option<usize>,
}

impl EmbeddingRepository {
    pub fn new(db: &DatabaseManager, expected_dimension: Option<usize>) -> Self {
        Self {
            pool: db.pool().clone(),
            expected_dimension,
        }
    }

    /// Validates the vector's dimension unless `expected_dimension` is `None` (the
    /// test-only override described in §9; it must never be reachable externally).
    pub async fn save(&self, embedding: &Embedding) -> Result<()> {
        if let Some(expected) = self.expected_dimension {
            if embedding.vector.len() != expected {
                return Err(MemoryError::validation(
                    "vector",
                    format!(
                        "embedding dimension {} does not match expected {}",
                        embedding.vector.len(),
                        expected
                    ),
                ));
            }
        }

        let bytes = encode_vector(&embedding.vector);
        sqlx::query(
            r#"
            INSERT INTO embeddings (id, chunk_id, turn_id, thread_id, vector, created_at)
            VALUES (?, ?, ?, ?, ?, ?)
            ON CONFLICT(id) DO UPDATE SET vector = excluded.vector
            "#,
        )
        .bind(&embedding.id)
        .bind(&embedding.chunk_id)
        .bind(&embedding.turn_id)
        .bind(&embedding.thread_id)
        .bind(bytes)
        .bind(embedding.created_at.to_rfc3339())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    pub async fn get_by_chunk(&self, chunk_id: &str) -> Result<Option<Embedding>> {
        let row = sqlx::query(
            "SELECT id, chunk_id, turn_id, thread_id, vector, created_at FROM embeddings WHERE chunk_id = ?",
        )
        .bind(chunk_id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(|r| Self::row_to_embedding(&r)).transpose()
    }

    pub async fn list_by_thread(&self, thread_id: &str) -> Result<Vec<Embedding>> {
        let rows = sqlx::query(
            "SELECT id, chunk_id, turn_id, thread_id, vector, created_at FROM embeddings WHERE thread_id = ?",
        )
        .bind(thread_id)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(Self::row_to_embedding).collect()
    }

    /// Linear scan over all embeddings, ranked by cosine similarity to `query`.
    pub async fn search_similar(&self, query: &[f64], k: usize) -> Result<Vec<(Embedding, f64)>> {
        let rows = sqlx::query("SELECT id, chunk_id, turn_id, thread_id, vector, created_at FROM embeddings")
            .fetch_all(&self.pool)
            .await?;

        let mut scored = rows
            .iter()
            .map(Self::row_to_embedding)
            .collect::<Result<Vec<_>>>()?
            .into_iter()
            .map(|e| {
                let score = cosine_similarity(query, &e.vector);
                (e, score)
            })
            .collect::<Vec<_>>();

        scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
        scored.truncate(k);
        Ok(scored)
    }

    pub async fn delete_by_chunk(&self, chunk_id: &str) -> Result<()> {
        sqlx::query("DELETE FROM embeddings WHERE chunk_id = ?")
            .bind(chunk_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    fn row_to_embedding(row: &SqliteRow) -> Result<Embedding> {
        let vector_bytes: Vec<u8> = row.try_get("vector")?;
        let created_at_str: String = row.try_get("created_at")?;
        let created_at = DateTime::parse_from_rfc3339(&created_at_str)
            .map_err(|e| MemoryError::validation("created_at", e.to_string()))?
            .with_timezone(&Utc);

        Ok(Embedding {
            id: row.try_get("id")?,
            chunk_id: row.try_get("chunk_id")?,
            turn_id: row.try_get("turn_id")?,
            thread_id: row.try_get("thread_id")?,
            vector: decode_vector(&vector_bytes),
            created_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn repo(dimension: Option<usize>) -> EmbeddingRepository {
        let manager = DatabaseManager::open_in_memory().await.unwrap();
        EmbeddingRepository::new(&manager, dimension)
    }

    #[tokio::test]
    async fn save_rejects_wrong_dimension_in_production_mode() {
        let repo = repo(Some(4)).await;
        let embedding = Embedding::new("chunk", "turn", "thread", vec![1.0, 0.0]);
        assert!(repo.save(&embedding).await.is_err());
    }

    #[tokio::test]
    async fn save_allows_any_dimension_in_test_mode() {
        let repo = repo(None).await;
        let embedding = Embedding::new("chunk", "turn", "thread", vec![1.0, 0.0]);
        assert!(repo.save(&embedding).await.is_ok());
    }

    #[tokio::test]
    async fn search_similar_ranks_by_cosine_similarity() {
        let repo = repo(None).await;
        let e1 = Embedding::new("c1", "t1", "th1", vec![1.0, 0.0, 0.0, 0.0]);
        let e2 = Embedding::new("c2", "t2", "th2", vec![0.0, 1.0, 0.0, 0.0]);
        let e3 = Embedding::new("c3", "t3", "th3", vec![0.0, 0.0, 1.0, 0.0]);
        repo.save(&e1).await.unwrap();
        repo.save(&e2).await.unwrap();
        repo.save(&e3).await.unwrap();

        let results = repo.search_similar(&[0.9, 0.1, 0.0, 0.0], 3).await.unwrap();
        assert_eq!(results[0].0.thread_id, "th1");
        assert!(results[0].1 > 0.99);
    }
}
