//! Feed-Harvest: a rental-post ingestion pipeline
//!
//! This crate scrolls a social feed through a browser automation driver,
//! deduplicates the posts it finds by content fingerprint, and hands unseen
//! posts to a pool of workers that run them through a generative-model
//! extraction stage before persisting the normalized listing.

pub mod config;
pub mod crawler;
pub mod dedup;
pub mod extractor;
pub mod fingerprint;
pub mod output;
pub mod pipeline;
pub mod retry;
pub mod storage;

use thiserror::Error;

/// Main error type for Feed-Harvest operations
#[derive(Debug, Error)]
pub enum HarvestError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Storage error: {0}")]
    Storage(#[from] storage::StorageError),

    #[error("Automation driver error: {0}")]
    Driver(#[from] crawler::DriverError),

    #[error("Queue error: {0}")]
    Queue(#[from] pipeline::QueueClosed),

    #[error("Pipeline task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),
}

/// Result type alias for Feed-Harvest operations
pub type Result<T> = std::result::Result<T, HarvestError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

// Re-export commonly used types
pub use config::Config;
pub use dedup::DedupIndex;
pub use fingerprint::{fingerprint, Fingerprint};
pub use pipeline::{run_pipeline, Item, QueueMessage};

#[cfg(test)]
mod tests {
    use super::*;

    fn closed_queue() -> Result<()> {
        Err(pipeline::QueueClosed)?
    }

    fn broken_driver() -> Result<()> {
        Err(crawler::DriverError::Stale("detached".to_string()))?
    }

    #[test]
    fn test_stage_errors_convert_into_harvest_error() {
        assert!(matches!(closed_queue(), Err(HarvestError::Queue(_))));
        assert!(matches!(broken_driver(), Err(HarvestError::Driver(_))));

        let err: HarvestError = storage::StorageError::Database("locked".to_string()).into();
        assert_eq!(err.to_string(), "Storage error: Database error: locked");

        let err: HarvestError = ConfigError::Validation("workers must be at least 1".into()).into();
        assert!(matches!(err, HarvestError::Config(_)));
    }
}
