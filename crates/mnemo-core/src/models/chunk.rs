use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Hierarchy level of a transient text fragment used for embedding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChunkType {
    Turn,
    Paragraph,
    Sentence,
}

/// A hierarchical fragment produced by the Chunker. Transient: never persisted
/// on its own, only the Embeddings derived from it are.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Chunk {
    pub id: String,
    pub chunk_type: ChunkType,
    pub content: String,
    pub parent_chunk_id: Option<String>,
    pub turn_id: String,
}

impl Chunk {
    pub fn new(
        chunk_type: ChunkType,
        content: impl Into<String>,
        parent_chunk_id: Option<String>,
        turn_id: impl Into<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            chunk_type,
            content: content.into(),
            parent_chunk_id,
            turn_id: turn_id.into(),
        }
    }
}
