use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use sqlx::{sqlite::SqliteRow, Pool, Row, Sqlite};

use crate::error::{MemoryError, Result};
use crate::models::UserProfile;

use super::connection::DatabaseManager;

pub struct ProfileRepository {
    pool: Pool<Sqlite>,
}

impl ProfileRepository {
    pub fn new(db: &DatabaseManager) -> Self {
        Self {
            pool: db.pool().clone(),
        }
    }

    pub async fn get(&self) -> Result<Option<UserProfile>> {
        let row = sqlx::query(
            "SELECT name, preferences_json, topics_json, updated_at FROM user_profile WHERE id = 1",
        )
        .fetch_optional(&self.pool)
        .await?;

        row.map(|r| Self::row_to_profile(&r)).transpose()
    }

    pub async fn upsert(&self, profile: &UserProfile) -> Result<()> {
        let preferences_json = serde_json::to_string(&profile.preferences)?;
        let topics_json = serde_json::to_string(&profile.topics_of_interest)?;
        let updated_at = profile.last_updated.unwrap_or_else(Utc::now).to_rfc3339();

        sqlx::query(
            r#"
            INSERT INTO user_profile (id, name, preferences_json, topics_json, updated_at)
            VALUES (1, ?, ?, ?, ?)
            ON CONFLICT(id) DO UPDATE SET
                name = excluded.name,
                preferences_json = excluded.preferences_json,
                topics_json = excluded.topics_json,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(&profile.name)
        .bind(preferences_json)
        .bind(topics_json)
        .bind(updated_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    fn row_to_profile(row: &SqliteRow) -> Result<UserProfile> {
        let preferences_json: String = row.try_get("preferences_json")?;
        let topics_json: String = row.try_get("topics_json")?;
        let preferences: BTreeSet<String> = serde_json::from_str(&preferences_json)?;
        let topics_of_interest: BTreeSet<String> = serde_json::from_str(&topics_json)?;

        let updated_at_str: String = row.try_get("updated_at")?;
        let last_updated = DateTime::parse_from_rfc3339(&updated_at_str)
            .map_err(|e| MemoryError::validation("updated_at", e.to_string()))?
            .with_timezone(&Utc);

        Ok(UserProfile {
            name: row.try_get("name")?,
            preferences,
            topics_of_interest,
            last_updated: Some(last_updated),
        })
    }
}
