use chrono::{DateTime, Utc};
use sqlx::{sqlite::SqliteRow, Pool, Row, Sqlite};

use crate::error::Result;
use crate::models::Fact;

use super::connection::DatabaseManager;

pub struct FactRepository {
    pool: Pool<Sqlite>,
}

impl FactRepository {
    pub fn new(db: &DatabaseManager) -> Self {
        Self {
            pool: db.pool().clone(),
        }
    }

    pub async fn upsert(&self, fact: &Fact) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO facts (id, thread_id, turn_id, key, value, confidence, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(id) DO UPDATE SET
                value = excluded.value,
                confidence = excluded.confidence
            "#,
        )
        .bind(&fact.id)
        .bind(&fact.thread_id)
        .bind(&fact.turn_id)
        .bind(&fact.key)
        .bind(&fact.value)
        .bind(fact.confidence)
        .bind(fact.created_at.to_rfc3339())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    pub async fn get_by_id(&self, id: &str) -> Result<Option<Fact>> {
        let row = sqlx::query(
            "SELECT id, thread_id, turn_id, key, value, confidence, created_at FROM facts WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(|r| Self::row_to_fact(&r)).transpose()
    }

    /// Most recent fact for a given key.
    pub async fn get_by_key(&self, key: &str) -> Result<Option<Fact>> {
        let row = sqlx::query(
            r#"
            SELECT id, thread_id, turn_id, key, value, confidence, created_at FROM facts
            WHERE key = ? ORDER BY created_at DESC LIMIT 1
            "#,
        )
        .bind(key)
        .fetch_optional(&self.pool)
        .await?;

        row.map(|r| Self::row_to_fact(&r)).transpose()
    }

    pub async fn list_by_thread(&self, thread_id: &str) -> Result<Vec<Fact>> {
        let rows = sqlx::query(
            "SELECT id, thread_id, turn_id, key, value, confidence, created_at FROM facts WHERE thread_id = ?",
        )
        .bind(thread_id)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(Self::row_to_fact).collect()
    }

    /// Substring search over key or value, ordered by confidence desc then recency, limited.
    pub async fn search(&self, query: &str, limit: i64) -> Result<Vec<Fact>> {
        let pattern = format!("%{}%", query.to_lowercase());
        let rows = sqlx::query(
            r#"
            SELECT id, thread_id, turn_id, key, value, confidence, created_at FROM facts
            WHERE LOWER(key) LIKE ? OR LOWER(value) LIKE ?
            ORDER BY confidence DESC, created_at DESC
            LIMIT ?
            "#,
        )
        .bind(&pattern)
        .bind(&pattern)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(Self::row_to_fact).collect()
    }

    pub async fn delete_by_id(&self, id: &str) -> Result<u64> {
        let result = sqlx::query("DELETE FROM facts WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    pub async fn delete_by_key(&self, key: &str) -> Result<u64> {
        let result = sqlx::query("DELETE FROM facts WHERE key = ?")
            .bind(key)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    fn row_to_fact(row: &SqliteRow) -> Result<Fact> {
        let created_at_str: String = row.try_get("created_at")?;
        let created_at = DateTime::parse_from_rfc3339(&created_at_str)
            .map_err(|e| crate::error::MemoryError::validation("created_at", e.to_string()))?
            .with_timezone(&Utc);

        Ok(Fact {
            id: row.try_get("id")?,
            key: row.try_get("key")?,
            value: row.try_get("value")?,
            confidence: row.try_get("confidence")?,
            thread_id: row.try_get("thread_id")?,
            turn_id: row.try_get("turn_id")?,
            created_at,
        })
    }
}
