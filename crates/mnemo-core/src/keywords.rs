//! Lightweight keyword/topic extraction from raw message text.
//!
//! The Governor and Ingest Pipeline operate on a Turn's keyword/topic lists;
//! this module is what derives those lists from the plain-text `message` the
//! tool surface actually receives. Deliberately not LLM-backed: a simple
//! stopword-filtered tokenizer.

const STOPWORDS: &[&str] = &[
    "a", "an", "and", "are", "as", "at", "be", "been", "but", "by", "can", "could", "did", "do",
    "does", "for", "from", "had", "has", "have", "how", "i", "if", "in", "into", "is", "it",
    "its", "just", "me", "my", "of", "on", "or", "our", "so", "that", "the", "their", "then",
    "there", "these", "this", "to", "was", "we", "were", "what", "when", "where", "which",
    "who", "why", "will", "with", "would", "you", "your",
];

const MAX_KEYWORDS: usize = 12;
const MAX_TOPICS: usize = 3;

/// Tokenizes `text` into a deduplicated, stopword-filtered keyword list
/// (insertion order, capped at [`MAX_KEYWORDS`]) and a topic shortlist (the
/// longest surviving keywords, capped at [`MAX_TOPICS`]).
pub fn extract(text: &str) -> (Vec<String>, Vec<String>) {
    let mut keywords = Vec::new();

    for raw_word in text.split(|c: char| !c.is_alphanumeric()) {
        let word = raw_word.to_lowercase();
        if word.len() < 3 || STOPWORDS.contains(&word.as_str()) {
            continue;
        }
        if !keywords.contains(&word) {
            keywords.push(word);
        }
        if keywords.len() >= MAX_KEYWORDS {
            break;
        }
    }

    let mut topics = keywords.clone();
    topics.sort_by(|a, b| b.len().cmp(&a.len()));
    topics.truncate(MAX_TOPICS);

    (keywords, topics)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn filters_stopwords_and_short_tokens() {
        let (keywords, _) = extract("is it a test of the system");
        assert_eq!(keywords, vec!["test".to_string(), "system".to_string()]);
    }

    #[test]
    fn deduplicates_repeated_words() {
        let (keywords, _) = extract("pasta recipe pasta dinner");
        assert_eq!(keywords, vec!["pasta".to_string(), "recipe".to_string(), "dinner".to_string()]);
    }

    #[test]
    fn empty_text_yields_empty_lists() {
        let (keywords, topics) = extract("   ");
        assert!(keywords.is_empty());
        assert!(topics.is_empty());
    }

    #[test]
    fn topics_prefer_longer_keywords() {
        let (_, topics) = extract("cat database replication");
        assert_eq!(topics[0], "replication");
    }
}
