use thiserror::Error;

/// Crate-wide error type for mnemo-core.
#[derive(Error, Debug)]
pub enum MemoryError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("task join error: {0}")]
    TaskJoin(#[from] tokio::task::JoinError),

    #[error("validation error: {field}: {message}")]
    Validation { field: String, message: String },

    #[error("not found: {resource}")]
    NotFound { resource: String },

    #[error("invariant violation: {message}")]
    Invariant { message: String },

    #[error("provider error: {message}")]
    Provider { message: String },

    #[error("provider unavailable: {reason}")]
    ProviderUnavailable { reason: String },

    #[error("configuration error: {message}")]
    Configuration { message: String },
}

impl MemoryError {
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Validation {
            field: field.into(),
            message: message.into(),
        }
    }

    pub fn not_found(resource: impl Into<String>) -> Self {
        Self::NotFound {
            resource: resource.into(),
        }
    }

    pub fn invariant(message: impl Into<String>) -> Self {
        Self::Invariant {
            message: message.into(),
        }
    }

    pub fn provider(message: impl Into<String>) -> Self {
        Self::Provider {
            message: message.into(),
        }
    }

    /// True for errors worth retrying with backoff (transient network/provider failures).
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Network(_) | Self::Provider { .. } | Self::Json(_))
    }
}

pub type Result<T> = std::result::Result<T, MemoryError>;
