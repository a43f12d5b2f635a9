//! Environment variable names recognized by mnemo-core.
//!
//! Centralized here so configuration surfaces never drift between the
//! places that read them.

/// Data directory / storage location overrides.
pub mod storage {
    /// Overrides the data directory (defaults to `$XDG_DATA_HOME/memory` or equivalent).
    pub const DATA_DIR: &str = "MEMORY_DATA_DIR";
}

/// LLM/embedding provider configuration.
pub mod provider {
    /// Gates embedder/chat/Scribe features; absent disables all three.
    pub const API_KEY: &str = "OPENAI_API_KEY";

    /// Per-call deadline, in seconds.
    pub const TIMEOUT: &str = "OPENAI_TIMEOUT";

    /// Maximum retry attempts, clamped to 0..=10.
    pub const MAX_RETRIES: &str = "OPENAI_MAX_RETRIES";

    /// Base retry delay, in milliseconds.
    pub const RETRY_DELAY: &str = "OPENAI_RETRY_DELAY";
}

/// Governor tuning.
pub mod routing {
    /// Overrides the topic-match threshold τ, clamped to [0, 1].
    pub const TOPIC_MATCH_THRESHOLD: &str = "TOPIC_MATCH_THRESHOLD";
}

/// Embedding dimensionality.
pub mod embedding {
    /// Overrides the fixed embedding dimension D.
    pub const VECTOR_DIMENSION: &str = "VECTOR_DIMENSION";
}

/// Logging configuration (standard `tracing-subscriber` convention).
pub mod logging {
    pub const RUST_LOG: &str = "RUST_LOG";
}
