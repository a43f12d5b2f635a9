use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One user/assistant exchange. Immutable once stored.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Turn {
    pub id: String,
    pub thread_id: String,
    pub created_at: DateTime<Utc>,
    pub user_message: String,
    pub assistant_message: String,
    pub keywords: Vec<String>,
    pub topics: Vec<String>,
}

impl Turn {
    pub fn new(
        thread_id: impl Into<String>,
        user_message: impl Into<String>,
        assistant_message: impl Into<String>,
        keywords: Vec<String>,
        topics: Vec<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            thread_id: thread_id.into(),
            created_at: Utc::now(),
            user_message: user_message.into(),
            assistant_message: assistant_message.into(),
            keywords,
            topics,
        }
    }

    /// `user-text + " " + assistant-text`, the text the Chunker/Fact Scrubber consume.
    pub fn combined_text(&self) -> String {
        format!("{} {}", self.user_message, self.assistant_message)
    }
}
