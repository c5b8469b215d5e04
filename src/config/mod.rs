//! Configuration module for Feed-Harvest
//!
//! This module handles loading, parsing, and validating TOML configuration
//! files. Secrets and deployment-specific values can be overridden from the
//! environment (a `.env` file is loaded by the binary).
//!
//! # Example
//!
//! ```no_run
//! use feed_harvest::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("feed-harvest.toml")).unwrap();
//! println!("Extraction retries: {}", config.extractor.retry_attempts);
//! ```

mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{
    Config, CrawlerConfig, ExtractorConfig, FeedConfig, InferenceMode, OutputConfig,
    WebDriverConfig, WorkersConfig,
};

// Re-export parser functions
pub use parser::{
    apply_env_overrides, compute_config_hash, load_config, load_config_from_env,
    load_config_str, load_config_with_hash, ENV_OVERRIDES,
};
pub use validation::validate;
