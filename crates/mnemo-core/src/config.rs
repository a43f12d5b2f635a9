//! Runtime configuration, read from environment variables.
//!
//! There is no on-disk config file here: only environment variables are named,
//! and this system has no CLI surface of its own to edit a config file through.
//! See DESIGN.md.

use std::path::PathBuf;
use std::time::Duration;

use crate::env;

pub const DEFAULT_VECTOR_DIMENSION: usize = 1536;
pub const DEFAULT_TOPIC_MATCH_THRESHOLD: f32 = 0.3;
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_MAX_RETRIES: u32 = 3;
pub const DEFAULT_RETRY_DELAY_MS: u64 = 500;

/// Provider (embed/chat) configuration, gated by presence of an API key.
#[derive(Debug, Clone)]
pub struct ProviderConfig {
    pub api_key: Option<String>,
    pub timeout: Duration,
    pub max_retries: u32,
    pub retry_delay: Duration,
}

impl ProviderConfig {
    pub fn from_env() -> Self {
        let api_key = std::env::var(env::provider::API_KEY)
            .ok()
            .filter(|s| !s.is_empty());

        let timeout = std::env::var(env::provider::TIMEOUT)
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
            .map(Duration::from_secs)
            .unwrap_or(Duration::from_secs(DEFAULT_TIMEOUT_SECS));

        let max_retries = std::env::var(env::provider::MAX_RETRIES)
            .ok()
            .and_then(|v| v.parse::<u32>().ok())
            .map(|v| v.min(10))
            .unwrap_or(DEFAULT_MAX_RETRIES);

        let retry_delay = std::env::var(env::provider::RETRY_DELAY)
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
            .map(Duration::from_millis)
            .unwrap_or(Duration::from_millis(DEFAULT_RETRY_DELAY_MS));

        Self {
            api_key,
            timeout,
            max_retries,
            retry_delay,
        }
    }

    /// Embedder/chat/Scribe are only available when an API key was configured.
    pub fn is_enabled(&self) -> bool {
        self.api_key.is_some()
    }
}

/// Top-level application configuration.
#[derive(Debug, Clone)]
pub struct Config {
    pub data_dir: PathBuf,
    pub vector_dimension: usize,
    pub topic_match_threshold: f32,
    pub provider: ProviderConfig,
}

impl Config {
    pub fn from_env() -> Self {
        Self {
            data_dir: Self::resolve_data_dir(),
            vector_dimension: Self::resolve_vector_dimension(),
            topic_match_threshold: Self::resolve_topic_match_threshold(),
            provider: ProviderConfig::from_env(),
        }
    }

    fn resolve_data_dir() -> PathBuf {
        if let Ok(dir) = std::env::var(env::storage::DATA_DIR) {
            if !dir.is_empty() {
                return PathBuf::from(dir);
            }
        }

        dirs::data_dir()
            .unwrap_or_else(std::env::temp_dir)
            .join("memory")
    }

    fn resolve_vector_dimension() -> usize {
        std::env::var(env::embedding::VECTOR_DIMENSION)
            .ok()
            .and_then(|v| v.parse::<usize>().ok())
            .filter(|v| *v > 0)
            .unwrap_or(DEFAULT_VECTOR_DIMENSION)
    }

    fn resolve_topic_match_threshold() -> f32 {
        std::env::var(env::routing::TOPIC_MATCH_THRESHOLD)
            .ok()
            .and_then(|v| v.parse::<f32>().ok())
            .map(|v| v.clamp(0.0, 1.0))
            .unwrap_or(DEFAULT_TOPIC_MATCH_THRESHOLD)
    }

    pub fn db_path(&self) -> PathBuf {
        self.data_dir.join("memory.db")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_topic_match_threshold_is_point_three() {
        assert!((DEFAULT_TOPIC_MATCH_THRESHOLD - 0.3).abs() < f32::EPSILON);
    }

    #[test]
    fn provider_disabled_without_api_key() {
        let config = ProviderConfig {
            api_key: None,
            timeout: Duration::from_secs(1),
            max_retries: 0,
            retry_delay: Duration::from_millis(1),
        };
        assert!(!config.is_enabled());
    }
}
