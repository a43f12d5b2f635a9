//! Token-budgeted prompt assembly from a Thread, retrieved memories, facts,
//! and the user profile (§4.7).

use crate::database::Store;
use crate::error::Result;
use crate::retrieval::crawler::Crawler;

const SYSTEM_PREAMBLE: &str =
    "You are a helpful assistant with access to the user's conversation history, \
profile, and stored facts. Use them to answer naturally and consistently.";

const CHARS_PER_TOKEN: usize = 4;
const RETRIEVED_MEMORIES_K: usize = 3;
const RELEVANT_FACTS_K: i64 = 5;

pub struct Hydrator {
    crawler: Crawler,
}

impl Hydrator {
    pub fn new(crawler: Crawler) -> Self {
        Self { crawler }
    }

    /// Assembles the bounded prompt for `thread_id` given `user_text` and a
    /// token budget. See §4.7 for section order and the truncation ladder.
    pub async fn assemble(&self, store: &Store, thread_id: &str, user_text: &str, token_budget: usize) -> Result<String> {
        let char_budget = token_budget.saturating_mul(CHARS_PER_TOKEN);

        let system = format!("SYSTEM:\n{SYSTEM_PREAMBLE}");
        let current_message = format!("CURRENT USER MESSAGE:\n{user_text}");

        let profile_section = self.build_profile_section(store).await?;
        let history_section = self.build_history_section(store, thread_id).await?;
        let memories_section = self.build_memories_section(store, thread_id, user_text).await?;
        let facts_section = self.build_facts_section(store, user_text).await?;

        let full = join_sections(&[
            Some(system.clone()),
            profile_section.clone(),
            history_section.clone(),
            memories_section.clone(),
            facts_section.clone(),
            Some(current_message.clone()),
        ]);

        if full.len() <= char_budget {
            return Ok(full);
        }

        let mandatory = join_sections(&[Some(system.clone()), Some(current_message.clone())]);
        if mandatory.len() > char_budget {
            return Ok(self.fallback_truncate(&system, user_text, char_budget));
        }

        let mut remaining = char_budget - mandatory.len() - separator_len(1);

        // §4.7 priority order: history, retrieved memories, facts, profile.
        let mut ordered_optional = vec![
            ("history", history_section),
            ("memories", memories_section),
            ("facts", facts_section),
            ("profile", profile_section),
        ];

        let mut included = Vec::new();
        for (_, section) in ordered_optional.drain(..) {
            if let Some(text) = section {
                let cost = text.len() + separator_len(1);
                if cost <= remaining {
                    remaining -= cost;
                    included.push(text);
                }
            }
        }

        // Reassemble in the canonical section order, not insertion order.
        let mut parts = vec![system];
        for label in ["profile", "history", "memories"] {
            if let Some(text) = included.iter().find(|t| matches_label(t, label)) {
                parts.push(text.clone());
            }
        }
        if let Some(text) = included.iter().find(|t| matches_label(t, "facts")) {
            parts.push(text.clone());
        }
        parts.push(current_message);

        Ok(parts.join("\n\n"))
    }

    fn fallback_truncate(&self, system: &str, user_text: &str, char_budget: usize) -> String {
        let suffix = "... [truncated]";
        let system_with_sep = system.len() + separator_len(1) + "CURRENT USER MESSAGE:\n".len();

        if char_budget <= system_with_sep {
            return system.to_string();
        }

        let remaining_for_message = char_budget - system_with_sep;
        if remaining_for_message <= suffix.len() {
            return system.to_string();
        }

        let keep = remaining_for_message - suffix.len();
        let truncated: String = user_text.chars().take(keep).collect();
        format!("{system}\n\nCURRENT USER MESSAGE:\n{truncated}{suffix}")
    }

    async fn build_profile_section(&self, store: &Store) -> Result<Option<String>> {
        let Some(profile) = store.profile().get().await? else {
            return Ok(None);
        };

        let preferences: Vec<_> = profile.preferences.iter().cloned().collect();
        let topics: Vec<_> = profile.topics_of_interest.iter().cloned().collect();

        Ok(Some(format!(
            "USER PROFILE:\nName: {}\nPreferences: {}\nTopics of interest: {}",
            profile.name,
            preferences.join(", "),
            topics.join(", "),
        )))
    }

    async fn build_history_section(&self, store: &Store, thread_id: &str) -> Result<Option<String>> {
        let Some(thread) = store.threads().get(thread_id).await? else {
            return Ok(None);
        };

        let turns = store.turns().list_by_thread(thread_id).await?;
        let mut lines = vec![format!("CONVERSATION HISTORY:\n{}", thread.topic_label)];
        for (i, turn) in turns.iter().enumerate() {
            lines.push(format!(
                "Turn {}:\nUser: {}\nAI: {}",
                i + 1,
                turn.user_message,
                turn.assistant_message
            ));
        }

        Ok(Some(lines.join("\n")))
    }

    async fn build_memories_section(&self, store: &Store, thread_id: &str, user_text: &str) -> Result<Option<String>> {
        let candidates = self.crawler.candidates(store, user_text, RETRIEVED_MEMORIES_K + 1).await?;
        let mut lines = vec!["RETRIEVED MEMORIES (from other conversations):".to_string()];

        let mut count = 0;
        for candidate in candidates {
            if candidate.thread.id == thread_id {
                continue;
            }
            if count >= RETRIEVED_MEMORIES_K {
                break;
            }

            let body = if let Some(summary) = &candidate.thread.summary {
                summary.clone()
            } else {
                match store.turns().list_by_thread(&candidate.thread.id).await?.first() {
                    Some(turn) => format!("User: {}\nAI: {}", turn.user_message, turn.assistant_message),
                    None => String::new(),
                }
            };

            lines.push(format!(
                "Memory {} (Relevance: {:.2}):\n{}\n{}",
                count + 1,
                candidate.score,
                candidate.thread.topic_label,
                body
            ));
            count += 1;
        }

        if count == 0 {
            return Ok(None);
        }

        Ok(Some(lines.join("\n")))
    }

    async fn build_facts_section(&self, store: &Store, user_text: &str) -> Result<Option<String>> {
        let facts = store.facts().search(user_text, RELEVANT_FACTS_K).await?;
        if facts.is_empty() {
            return Ok(None);
        }

        let mut lines = vec!["RELEVANT FACTS:".to_string()];
        for fact in facts {
            lines.push(format!("- {}: {} (confidence: {:.2})", fact.key, fact.value, fact.confidence));
        }

        Ok(Some(lines.join("\n")))
    }
}

fn matches_label(text: &str, label: &str) -> bool {
    match label {
        "profile" => text.starts_with("USER PROFILE:"),
        "history" => text.starts_with("CONVERSATION HISTORY:"),
        "memories" => text.starts_with("RETRIEVED MEMORIES"),
        "facts" => text.starts_with("RELEVANT FACTS:"),
        _ => false,
    }
}

fn join_sections(sections: &[Option<String>]) -> String {
    sections
        .iter()
        .filter_map(|s| s.as_ref())
        .cloned()
        .collect::<Vec<_>>()
        .join("\n\n")
}

fn separator_len(count: usize) -> usize {
    count * "\n\n".len()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::DatabaseManager;
    use crate::models::{Thread, Turn};

    async fn store() -> Store {
        let manager = DatabaseManager::open_in_memory().await.unwrap();
        Store::new(manager, None)
    }

    #[tokio::test]
    async fn assembles_unbounded_prompt_with_all_sections() {
        let store = store().await;
        let thread = Thread::new("chat", vec![]);
        store.threads().upsert(&thread).await.unwrap();
        let turn = Turn::new(thread.id.clone(), "hi".to_string(), "hello".to_string(), vec![], vec![]);
        store.turns().upsert(&turn).await.unwrap();

        let hydrator = Hydrator::new(Crawler::new(None));
        let prompt = hydrator.assemble(&store, &thread.id, "what's up", 10_000).await.unwrap();

        assert!(prompt.contains("SYSTEM:"));
        assert!(prompt.contains("CONVERSATION HISTORY:"));
        assert!(prompt.contains("CURRENT USER MESSAGE:\nwhat's up"));
    }

    #[tokio::test]
    async fn omits_profile_section_when_unset() {
        let store = store().await;
        let thread = Thread::new("chat", vec![]);
        store.threads().upsert(&thread).await.unwrap();

        let hydrator = Hydrator::new(Crawler::new(None));
        let prompt = hydrator.assemble(&store, &thread.id, "hi", 10_000).await.unwrap();
        assert!(!prompt.contains("USER PROFILE:"));
    }

    #[tokio::test]
    async fn tiny_budget_falls_back_to_truncated_message() {
        let store = store().await;
        let thread = Thread::new("chat", vec![]);
        store.threads().upsert(&thread).await.unwrap();
        for _ in 0..5 {
            let turn = Turn::new(
                thread.id.clone(),
                "a fairly long user message about something".to_string(),
                "a fairly long assistant reply about something".to_string(),
                vec![],
                vec![],
            );
            store.turns().upsert(&turn).await.unwrap();
        }

        let hydrator = Hydrator::new(Crawler::new(None));
        let prompt = hydrator
            .assemble(&store, &thread.id, "a long current user message that will not fit", 15)
            .await
            .unwrap();

        assert!(prompt.starts_with("SYSTEM:"));
        assert!(!prompt.contains("CONVERSATION HISTORY:"));
    }

    #[tokio::test]
    async fn system_only_fallback_when_nothing_fits() {
        let store = store().await;
        let thread = Thread::new("chat", vec![]);
        store.threads().upsert(&thread).await.unwrap();

        let hydrator = Hydrator::new(Crawler::new(None));
        let prompt = hydrator.assemble(&store, &thread.id, "hi", 1).await.unwrap();
        assert_eq!(prompt, format!("SYSTEM:\n{SYSTEM_PREAMBLE}"));
    }
}
