pub mod backoff;
pub mod chunker;
pub mod config;
pub mod database;
pub mod engine;
pub mod env;
pub mod error;
pub mod fact_scrubber;
pub mod governor;
pub mod ingest;
pub mod keywords;
pub mod logging;
pub mod models;
pub mod provider;
pub mod retrieval;
pub mod scribe;

pub use config::Config;
pub use engine::MemoryEngine;
pub use error::{MemoryError, Result};
