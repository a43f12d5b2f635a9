pub mod chunk;
pub mod embedding;
pub mod fact;
pub mod routing;
pub mod thread;
pub mod turn;
pub mod user_profile;

pub use chunk::{Chunk, ChunkType};
pub use embedding::{cosine_similarity, Embedding};
pub use fact::{normalize_key, Fact};
pub use routing::{RoutingDecision, RoutingScenario};
pub use thread::{Thread, ThreadStatus, GENERAL_DISCUSSION};
pub use turn::Turn;
pub use user_profile::{ProfileExtraction, UserProfile};
