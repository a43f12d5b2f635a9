use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Singleton user profile.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct UserProfile {
    pub name: String,
    pub preferences: BTreeSet<String>,
    pub topics_of_interest: BTreeSet<String>,
    pub last_updated: Option<DateTime<Utc>>,
}

/// The polymorphic, optional-everything shape an LLM extraction returns.
/// Modeled as a tagged record rather than an open map so merge logic is total.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProfileExtraction {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub preferences: Option<Vec<String>>,
    #[serde(default)]
    pub topics_of_interest: Option<Vec<String>>,
}

impl UserProfile {
    /// §3 invariant 6: merging only adds, never shrinks, never duplicates;
    /// name is overwritten only by a non-empty new value.
    pub fn merge(&mut self, extraction: &ProfileExtraction) {
        if let Some(name) = &extraction.name {
            if !name.trim().is_empty() {
                self.name = name.clone();
            }
        }

        if let Some(preferences) = &extraction.preferences {
            for pref in preferences {
                if !pref.trim().is_empty() {
                    self.preferences.insert(pref.clone());
                }
            }
        }

        if let Some(topics) = &extraction.topics_of_interest {
            for topic in topics {
                if !topic.trim().is_empty() {
                    self.topics_of_interest.insert(topic.clone());
                }
            }
        }

        self.last_updated = Some(Utc::now());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn merge_is_monotonic_and_deduplicates() {
        let mut profile = UserProfile::default();
        profile.preferences.insert("tea".to_string());

        let extraction = ProfileExtraction {
            name: Some("Ada".to_string()),
            preferences: Some(vec!["tea".to_string(), "cycling".to_string()]),
            topics_of_interest: Some(vec!["rust".to_string()]),
        };
        profile.merge(&extraction);

        assert_eq!(profile.name, "Ada");
        assert_eq!(profile.preferences.len(), 2);
        assert!(profile.preferences.contains("tea"));
        assert!(profile.preferences.contains("cycling"));
        assert_eq!(profile.topics_of_interest.len(), 1);
        assert!(profile.last_updated.is_some());
    }

    #[test]
    fn empty_name_never_overwrites() {
        let mut profile = UserProfile {
            name: "Existing".to_string(),
            ..Default::default()
        };
        profile.merge(&ProfileExtraction {
            name: Some(String::new()),
            ..Default::default()
        });
        assert_eq!(profile.name, "Existing");
    }

    #[test]
    fn merge_never_shrinks_existing_sets() {
        let mut profile = UserProfile::default();
        profile.preferences.insert("a".to_string());
        profile.preferences.insert("b".to_string());
        let before = profile.preferences.clone();

        profile.merge(&ProfileExtraction::default());

        assert!(before.is_subset(&profile.preferences));
    }
}
