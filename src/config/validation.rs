use crate::config::types::{Config, CrawlerConfig, ExtractorConfig, FeedConfig, WorkersConfig};
use crate::ConfigError;
use url::Url;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_feed_config(&config.feed)?;
    validate_crawler_config(&config.crawler)?;
    validate_url("webdriver.url", &config.webdriver.url)?;
    validate_extractor_config(&config.extractor)?;
    validate_workers_config(&config.workers)?;

    if config.output.database_path.is_empty() {
        return Err(ConfigError::Validation(
            "database_path cannot be empty".to_string(),
        ));
    }

    Ok(())
}

/// Validates the feed location and selectors
fn validate_feed_config(config: &FeedConfig) -> Result<(), ConfigError> {
    if config.group_url.is_empty() {
        return Err(ConfigError::Validation(
            "group_url must be set (in [feed] or via FEED_GROUP_URL)".to_string(),
        ));
    }

    validate_url("feed.home-url", &config.home_url)?;
    validate_url("feed.group-url", &config.group_url)?;

    if config.post_selector.trim().is_empty() {
        return Err(ConfigError::Validation(
            "post_selector cannot be empty".to_string(),
        ));
    }

    if config.expand_labels.iter().any(|l| l.trim().is_empty()) {
        return Err(ConfigError::Validation(
            "expand_labels cannot contain empty labels".to_string(),
        ));
    }

    Ok(())
}

/// Validates crawler tuning
fn validate_crawler_config(config: &CrawlerConfig) -> Result<(), ConfigError> {
    if config.stagnation_threshold < 1 {
        return Err(ConfigError::Validation(format!(
            "stagnation_threshold must be >= 1, got {}",
            config.stagnation_threshold
        )));
    }

    if config.force_scroll_pixels <= 0 {
        return Err(ConfigError::Validation(format!(
            "force_scroll_pixels must be positive, got {}",
            config.force_scroll_pixels
        )));
    }

    if config.stale_retry_attempts < 1 {
        return Err(ConfigError::Validation(format!(
            "stale_retry_attempts must be >= 1, got {}",
            config.stale_retry_attempts
        )));
    }

    Ok(())
}

/// Validates extraction settings
fn validate_extractor_config(config: &ExtractorConfig) -> Result<(), ConfigError> {
    if config.server_address.trim().is_empty() {
        return Err(ConfigError::Validation(
            "server_address cannot be empty".to_string(),
        ));
    }

    if config.model.trim().is_empty() {
        return Err(ConfigError::Validation("model cannot be empty".to_string()));
    }

    if config.retry_attempts < 1 {
        return Err(ConfigError::Validation(format!(
            "retry_attempts must be >= 1, got {}",
            config.retry_attempts
        )));
    }

    if !(config.size_ceiling > 0.0) {
        return Err(ConfigError::Validation(format!(
            "size_ceiling must be positive, got {}",
            config.size_ceiling
        )));
    }

    Ok(())
}

fn validate_workers_config(config: &WorkersConfig) -> Result<(), ConfigError> {
    if config.count == Some(0) {
        return Err(ConfigError::Validation(
            "workers.count must be >= 1".to_string(),
        ));
    }
    Ok(())
}

fn validate_url(field: &str, value: &str) -> Result<(), ConfigError> {
    Url::parse(value)
        .map(|_| ())
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid {}: {}", field, e)))
}
