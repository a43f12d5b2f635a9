use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{MemoryError, Result};

/// A key/value assertion extracted from a turn.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Fact {
    pub id: String,
    pub key: String,
    pub value: String,
    pub confidence: f64,
    pub thread_id: Option<String>,
    pub turn_id: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Fact {
    pub fn new(
        key: impl Into<String>,
        value: impl Into<String>,
        confidence: f64,
        thread_id: Option<String>,
        turn_id: Option<String>,
    ) -> Result<Self> {
        let fact = Self {
            id: Uuid::new_v4().to_string(),
            key: key.into(),
            value: value.into(),
            confidence,
            thread_id,
            turn_id,
            created_at: Utc::now(),
        };
        fact.validate()?;
        Ok(fact)
    }

    /// §3 invariant 5: non-empty lowercase/underscore key, non-empty value,
    /// confidence in the closed unit interval.
    pub fn validate(&self) -> Result<()> {
        if self.key.is_empty() {
            return Err(MemoryError::validation("key", "fact key must not be empty"));
        }
        if !self
            .key
            .chars()
            .all(|c| c.is_ascii_lowercase() || c == '_' || c.is_ascii_digit())
        {
            return Err(MemoryError::validation(
                "key",
                "fact key must be lowercase ascii with underscores",
            ));
        }
        if self.value.is_empty() {
            return Err(MemoryError::validation("value", "fact value must not be empty"));
        }
        if !(0.0..=1.0).contains(&self.confidence) {
            return Err(MemoryError::validation(
                "confidence",
                "fact confidence must be within [0.0, 1.0]",
            ));
        }
        Ok(())
    }
}

/// Normalizes a raw extracted key into the `[a-z_]+` shape, best-effort.
pub fn normalize_key(raw: &str) -> String {
    raw.trim()
        .to_lowercase()
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect::<String>()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_empty_key() {
        assert!(Fact::new("", "v", 0.5, None, None).is_err());
    }

    #[test]
    fn rejects_out_of_range_confidence() {
        assert!(Fact::new("k", "v", 1.5, None, None).is_err());
        assert!(Fact::new("k", "v", -0.1, None, None).is_err());
    }

    #[test]
    fn accepts_boundary_confidence() {
        assert!(Fact::new("k", "v", 0.0, None, None).is_ok());
        assert!(Fact::new("k", "v", 1.0, None, None).is_ok());
    }

    #[test]
    fn normalize_key_lowercases_and_replaces_separators() {
        assert_eq!(normalize_key("Favorite Color"), "favorite_color");
    }
}
