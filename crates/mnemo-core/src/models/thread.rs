use std::collections::BTreeSet;
use std::fmt;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{MemoryError, Result};

/// Thread status. Literal strings match the persisted schema exactly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ThreadStatus {
    Active,
    Paused,
    Closed,
    Archived,
}

impl ThreadStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ThreadStatus::Active => "ACTIVE",
            ThreadStatus::Paused => "PAUSED",
            ThreadStatus::Closed => "CLOSED",
            ThreadStatus::Archived => "ARCHIVED",
        }
    }

    pub fn parse(value: &str) -> Result<Self> {
        match value {
            "ACTIVE" => Ok(Self::Active),
            "PAUSED" => Ok(Self::Paused),
            "CLOSED" => Ok(Self::Closed),
            "ARCHIVED" => Ok(Self::Archived),
            other => Err(MemoryError::validation(
                "status",
                format!("invalid thread status: {other}"),
            )),
        }
    }
}

impl fmt::Display for ThreadStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// An ordered sequence of Turns sharing a topic ("Bridge Block").
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Thread {
    pub id: String,
    pub day_bucket: NaiveDate,
    pub topic_label: String,
    pub keywords: BTreeSet<String>,
    pub status: ThreadStatus,
    pub summary: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub turn_count: i64,
}

pub const GENERAL_DISCUSSION: &str = "General Discussion";

impl Thread {
    pub fn new(topic_label: impl Into<String>, keywords: Vec<String>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4().to_string(),
            day_bucket: now.date_naive(),
            topic_label: topic_label.into(),
            keywords: keywords.into_iter().collect(),
            status: ThreadStatus::Active,
            summary: None,
            created_at: now,
            updated_at: now,
            turn_count: 0,
        }
    }

    /// Merges new keywords into the thread's set (case-sensitive dedup, §3 Thread).
    pub fn merge_keywords(&mut self, keywords: &[String]) {
        for keyword in keywords {
            self.keywords.insert(keyword.clone());
        }
    }

    pub fn record_turn_appended(&mut self) {
        self.turn_count += 1;
        self.updated_at = Utc::now();
    }

    pub fn set_status(&mut self, status: ThreadStatus) {
        self.status = status;
        self.updated_at = Utc::now();
    }
}
