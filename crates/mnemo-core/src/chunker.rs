//! Hierarchical TURN/PARAGRAPH/SENTENCE chunking (§4.3).

use crate::error::{MemoryError, Result};
use crate::models::{Chunk, ChunkType};

/// Splits `text` into a TURN chunk, its PARAGRAPH children, and their
/// SENTENCE grandchildren. Empty/whitespace-only input is an error.
pub fn chunk(text: &str, turn_id: &str) -> Result<Vec<Chunk>> {
    if text.trim().is_empty() {
        return Err(MemoryError::validation("text", "cannot chunk empty text"));
    }

    let mut chunks = Vec::new();

    let turn_chunk = Chunk::new(ChunkType::Turn, text, None, turn_id);
    let turn_chunk_id = turn_chunk.id.clone();
    chunks.push(turn_chunk);

    for paragraph in split_paragraphs(text) {
        let paragraph_chunk = Chunk::new(
            ChunkType::Paragraph,
            paragraph.clone(),
            Some(turn_chunk_id.clone()),
            turn_id,
        );
        let paragraph_chunk_id = paragraph_chunk.id.clone();
        chunks.push(paragraph_chunk);

        for sentence in split_sentences(&paragraph) {
            chunks.push(Chunk::new(
                ChunkType::Sentence,
                sentence,
                Some(paragraph_chunk_id.clone()),
                turn_id,
            ));
        }
    }

    Ok(chunks)
}

fn split_paragraphs(text: &str) -> Vec<String> {
    text.replace("\r\n\r\n", "\n\n")
        .split("\n\n")
        .map(|p| p.trim().to_string())
        .filter(|p| !p.is_empty())
        .collect()
}

fn split_sentences(paragraph: &str) -> Vec<String> {
    let parts: Vec<&str> = paragraph.split(". ").collect();
    let last_index = parts.len().saturating_sub(1);

    parts
        .into_iter()
        .enumerate()
        .filter_map(|(i, part)| {
            let trimmed = part.trim();
            if trimmed.is_empty() {
                return None;
            }

            if i == last_index || trimmed.ends_with('.') {
                Some(trimmed.to_string())
            } else {
                Some(format!("{trimmed}."))
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_text_is_rejected() {
        assert!(chunk("   ", "turn-1").is_err());
    }

    #[test]
    fn single_sentence_produces_turn_paragraph_sentence() {
        let chunks = chunk("Hello world.", "turn-1").unwrap();
        assert_eq!(chunks.iter().filter(|c| c.chunk_type == ChunkType::Turn).count(), 1);
        assert_eq!(chunks.iter().filter(|c| c.chunk_type == ChunkType::Paragraph).count(), 1);
        assert_eq!(chunks.iter().filter(|c| c.chunk_type == ChunkType::Sentence).count(), 1);
    }

    #[test]
    fn blank_line_separates_paragraphs() {
        let chunks = chunk("First paragraph.\n\nSecond paragraph.", "turn-1").unwrap();
        assert_eq!(chunks.iter().filter(|c| c.chunk_type == ChunkType::Paragraph).count(), 2);
    }

    #[test]
    fn sentence_split_reappends_period() {
        let sentences = split_sentences("One. Two. Three");
        assert_eq!(sentences, vec!["One.", "Two.", "Three"]);
    }

    #[test]
    fn every_non_turn_chunk_has_valid_parent_one_level_up() {
        let chunks = chunk("First sentence. Second sentence.\n\nAnother paragraph.", "turn-1").unwrap();

        for c in &chunks {
            if c.chunk_type == ChunkType::Turn {
                assert!(c.parent_chunk_id.is_none());
                continue;
            }
            let parent_id = c.parent_chunk_id.as_ref().unwrap();
            let parent = chunks.iter().find(|p| &p.id == parent_id).unwrap();
            match c.chunk_type {
                ChunkType::Paragraph => assert_eq!(parent.chunk_type, ChunkType::Turn),
                ChunkType::Sentence => assert_eq!(parent.chunk_type, ChunkType::Paragraph),
                ChunkType::Turn => unreachable!(),
            }
        }
    }
}
