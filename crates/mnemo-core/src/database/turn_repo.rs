use chrono::{DateTime, Utc};
use sqlx::{sqlite::SqliteRow, Pool, Row, Sqlite};

use crate::error::Result;
use crate::models::Turn;

use super::connection::DatabaseManager;

pub struct TurnRepository {
    pool: Pool<Sqlite>,
}

impl TurnRepository {
    pub fn new(db: &DatabaseManager) -> Self {
        Self {
            pool: db.pool().clone(),
        }
    }

    pub async fn upsert(&self, turn: &Turn) -> Result<()> {
        let keywords_json = serde_json::to_string(&turn.keywords)?;
        let topics_json = serde_json::to_string(&turn.topics)?;

        sqlx::query(
            r#"
            INSERT INTO turns (id, thread_id, user_message, assistant_message, keywords_json, topics_json, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(id) DO UPDATE SET
                user_message = excluded.user_message,
                assistant_message = excluded.assistant_message,
                keywords_json = excluded.keywords_json,
                topics_json = excluded.topics_json
            "#,
        )
        .bind(&turn.id)
        .bind(&turn.thread_id)
        .bind(&turn.user_message)
        .bind(&turn.assistant_message)
        .bind(keywords_json)
        .bind(topics_json)
        .bind(turn.created_at.to_rfc3339())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    pub async fn list_by_thread(&self, thread_id: &str) -> Result<Vec<Turn>> {
        let rows = sqlx::query(
            r#"
            SELECT id, thread_id, user_message, assistant_message, keywords_json, topics_json, created_at
            FROM turns WHERE thread_id = ? ORDER BY created_at ASC
            "#,
        )
        .bind(thread_id)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(Self::row_to_turn).collect()
    }

    pub async fn delete(&self, id: &str) -> Result<()> {
        sqlx::query("DELETE FROM turns WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    fn row_to_turn(row: &SqliteRow) -> Result<Turn> {
        let keywords_json: String = row.try_get("keywords_json")?;
        let topics_json: String = row.try_get("topics_json")?;
        let created_at_str: String = row.try_get("created_at")?;
        let created_at = DateTime::parse_from_rfc3339(&created_at_str)
            .map_err(|e| crate::error::MemoryError::validation("created_at", e.to_string()))?
            .with_timezone(&Utc);

        Ok(Turn {
            id: row.try_get("id")?,
            thread_id: row.try_get("thread_id")?,
            created_at,
            user_message: row.try_get("user_message")?,
            assistant_message: row.try_get("assistant_message")?,
            keywords: serde_json::from_str(&keywords_json)?,
            topics: serde_json::from_str(&topics_json)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::thread_repo::ThreadRepository;
    use crate::models::Thread;

    #[tokio::test]
    async fn turns_are_ordered_by_creation() {
        let manager = DatabaseManager::open_in_memory().await.unwrap();
        let threads = ThreadRepository::new(&manager);
        let turns = TurnRepository::new(&manager);

        let thread = Thread::new("chat", vec![]);
        threads.upsert(&thread).await.unwrap();

        let t1 = Turn::new(&thread.id, "hi", "hello", vec![], vec![]);
        turns.upsert(&t1).await.unwrap();
        let t2 = Turn::new(&thread.id, "again", "yo", vec![], vec![]);
        turns.upsert(&t2).await.unwrap();

        let listed = turns.list_by_thread(&thread.id).await.unwrap();
        assert_eq!(listed.len(), 2);
        assert_eq!(listed[0].id, t1.id);
        assert_eq!(listed[1].id, t2.id);
    }

    #[tokio::test]
    async fn deleting_thread_cascades_to_turns() {
        let manager = DatabaseManager::open_in_memory().await.unwrap();
        let threads = ThreadRepository::new(&manager);
        let turns = TurnRepository::new(&manager);

        let thread = Thread::new("chat", vec![]);
        threads.upsert(&thread).await.unwrap();
        let turn = Turn::new(&thread.id, "hi", "hello", vec![], vec![]);
        turns.upsert(&turn).await.unwrap();

        threads.delete(&thread.id).await.unwrap();
        assert!(turns.list_by_thread(&thread.id).await.unwrap().is_empty());
    }
}
