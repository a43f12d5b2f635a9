use std::collections::BTreeSet;

use chrono::{DateTime, NaiveDate, Utc};
use sqlx::{sqlite::SqliteRow, Pool, Row, Sqlite};

use crate::error::Result;
use crate::models::{Thread, ThreadStatus};

use super::connection::DatabaseManager;

pub struct ThreadRepository {
    pool: Pool<Sqlite>,
}

impl ThreadRepository {
    pub fn new(db: &DatabaseManager) -> Self {
        Self {
            pool: db.pool().clone(),
        }
    }

    pub async fn upsert(&self, thread: &Thread) -> Result<()> {
        let keywords_json = serde_json::to_string(&thread.keywords)?;
        sqlx::query(
            r#"
            INSERT INTO threads (id, day_id, topic_label, keywords_json, status, summary, turn_count, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(id) DO UPDATE SET
                day_id = excluded.day_id,
                topic_label = excluded.topic_label,
                keywords_json = excluded.keywords_json,
                status = excluded.status,
                summary = excluded.summary,
                turn_count = excluded.turn_count,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(&thread.id)
        .bind(thread.day_bucket.to_string())
        .bind(&thread.topic_label)
        .bind(keywords_json)
        .bind(thread.status.as_str())
        .bind(&thread.summary)
        .bind(thread.turn_count)
        .bind(thread.created_at.to_rfc3339())
        .bind(thread.updated_at.to_rfc3339())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    pub async fn get(&self, id: &str) -> Result<Option<Thread>> {
        let row = sqlx::query(
            r#"
            SELECT id, day_id, topic_label, keywords_json, status, summary, turn_count, created_at, updated_at
            FROM threads WHERE id = ?
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(|r| Self::row_to_thread(&r)).transpose()
    }

    pub async fn list_by_status(&self, status: ThreadStatus) -> Result<Vec<Thread>> {
        let rows = sqlx::query(
            r#"
            SELECT id, day_id, topic_label, keywords_json, status, summary, turn_count, created_at, updated_at
            FROM threads WHERE status = ? ORDER BY updated_at DESC
            "#,
        )
        .bind(status.as_str())
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(Self::row_to_thread).collect()
    }

    pub async fn list_all(&self) -> Result<Vec<Thread>> {
        let rows = sqlx::query(
            r#"
            SELECT id, day_id, topic_label, keywords_json, status, summary, turn_count, created_at, updated_at
            FROM threads ORDER BY updated_at DESC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(Self::row_to_thread).collect()
    }

    pub async fn delete(&self, id: &str) -> Result<()> {
        sqlx::query("DELETE FROM threads WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    pub async fn update_status(&self, id: &str, status: ThreadStatus) -> Result<()> {
        sqlx::query("UPDATE threads SET status = ?, updated_at = ? WHERE id = ?")
            .bind(status.as_str())
            .bind(Utc::now().to_rfc3339())
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    fn row_to_thread(row: &SqliteRow) -> Result<Thread> {
        let keywords_json: String = row.try_get("keywords_json")?;
        let keywords: BTreeSet<String> = serde_json::from_str(&keywords_json)?;

        let day_id: String = row.try_get("day_id")?;
        let day_bucket = NaiveDate::parse_from_str(&day_id, "%Y-%m-%d")
            .map_err(|e| crate::error::MemoryError::validation("day_id", e.to_string()))?;

        let status_str: String = row.try_get("status")?;
        let status = ThreadStatus::parse(&status_str)?;

        let created_at_str: String = row.try_get("created_at")?;
        let created_at = DateTime::parse_from_rfc3339(&created_at_str)
            .map_err(|e| crate::error::MemoryError::validation("created_at", e.to_string()))?
            .with_timezone(&Utc);

        let updated_at_str: String = row.try_get("updated_at")?;
        let updated_at = DateTime::parse_from_rfc3339(&updated_at_str)
            .map_err(|e| crate::error::MemoryError::validation("updated_at", e.to_string()))?
            .with_timezone(&Utc);

        Ok(Thread {
            id: row.try_get("id")?,
            day_bucket,
            topic_label: row.try_get("topic_label")?,
            keywords,
            status,
            summary: row.try_get("summary")?,
            created_at,
            updated_at,
            turn_count: row.try_get("turn_count")?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn repo() -> ThreadRepository {
        let manager = DatabaseManager::open_in_memory().await.unwrap();
        ThreadRepository::new(&manager)
    }

    #[tokio::test]
    async fn upsert_then_get_round_trips() {
        let repo = repo().await;
        let thread = Thread::new("chat", vec!["hi".to_string()]);
        repo.upsert(&thread).await.unwrap();

        let fetched = repo.get(&thread.id).await.unwrap().unwrap();
        assert_eq!(fetched.topic_label, "chat");
        assert_eq!(fetched.status, ThreadStatus::Active);
        assert!(fetched.keywords.contains("hi"));
    }

    #[tokio::test]
    async fn list_by_status_filters() {
        let repo = repo().await;
        let mut active = Thread::new("chat", vec![]);
        let mut paused = Thread::new("cooking", vec![]);
        paused.set_status(ThreadStatus::Paused);
        repo.upsert(&active).await.unwrap();
        repo.upsert(&paused).await.unwrap();

        let actives = repo.list_by_status(ThreadStatus::Active).await.unwrap();
        assert_eq!(actives.len(), 1);
        assert_eq!(actives[0].id, active.id);

        active.set_status(ThreadStatus::Closed);
        repo.upsert(&active).await.unwrap();
        let actives = repo.list_by_status(ThreadStatus::Active).await.unwrap();
        assert!(actives.is_empty());
    }

    #[tokio::test]
    async fn delete_removes_thread() {
        let repo = repo().await;
        let thread = Thread::new("chat", vec![]);
        repo.upsert(&thread).await.unwrap();
        repo.delete(&thread.id).await.unwrap();
        assert!(repo.get(&thread.id).await.unwrap().is_none());
    }
}
