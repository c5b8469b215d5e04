use crate::config::types::{Config, InferenceMode};
use crate::config::validation::validate;
use crate::ConfigError;
use sha2::{Digest, Sha256};
use std::path::Path;

/// Environment variables that override file values
///
/// | Variable | Field |
/// |----------|-------|
/// | `FEED_GROUP_URL` | `feed.group-url` |
/// | `LLM_SERVER_ADDRESS` | `extractor.server-address` |
/// | `LLM_SERVER_PORT` | `extractor.server-port` |
/// | `LLM_MODEL_TYPE` | `extractor.model` |
/// | `LLM_CLIENT_TOKEN` | `extractor.token` |
/// | `LLM_MODE` | `extractor.mode` |
/// | `DATABASE_PATH` | `output.database-path` |
/// | `WEBDRIVER_URL` | `webdriver.url` |
pub const ENV_OVERRIDES: &[&str] = &[
    "FEED_GROUP_URL",
    "LLM_SERVER_ADDRESS",
    "LLM_SERVER_PORT",
    "LLM_MODEL_TYPE",
    "LLM_CLIENT_TOKEN",
    "LLM_MODE",
    "DATABASE_PATH",
    "WEBDRIVER_URL",
];

/// Loads, overrides from the process environment, and validates a configuration file
///
/// # Arguments
///
/// * `path` - Path to the TOML configuration file
///
/// # Returns
///
/// * `Ok(Config)` - Successfully loaded and validated configuration
/// * `Err(ConfigError)` - Failed to load, parse, or validate the configuration
///
/// # Example
///
/// ```no_run
/// use std::path::Path;
/// use feed_harvest::config::load_config;
///
/// let config = load_config(Path::new("feed-harvest.toml")).unwrap();
/// println!("Harvesting: {}", config.feed.group_url);
/// ```
pub fn load_config(path: &Path) -> Result<Config, ConfigError> {
    let content = std::fs::read_to_string(path)?;
    load_config_str(&content, |key| std::env::var(key).ok())
}

/// Builds a configuration from defaults plus the process environment
///
/// Used when no configuration file exists.
pub fn load_config_from_env() -> Result<Config, ConfigError> {
    load_config_str("", |key| std::env::var(key).ok())
}

/// Parses TOML content, applies overrides from `lookup`, and validates the result
pub fn load_config_str<F>(content: &str, lookup: F) -> Result<Config, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let mut config: Config = toml::from_str(content)?;
    apply_env_overrides(&mut config, lookup)?;
    validate(&config)?;
    Ok(config)
}

/// Applies every set variable in [`ENV_OVERRIDES`] to the configuration
pub fn apply_env_overrides<F>(config: &mut Config, lookup: F) -> Result<(), ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

    if let Some(url) = get("FEED_GROUP_URL") {
        config.feed.group_url = url;
    }
    if let Some(address) = get("LLM_SERVER_ADDRESS") {
        config.extractor.server_address = address;
    }
    if let Some(port) = get("LLM_SERVER_PORT") {
        let port = port.trim().parse::<u16>().map_err(|_| {
            ConfigError::Validation(format!(
                "LLM_SERVER_PORT must be a port number, got '{}'",
                port
            ))
        })?;
        config.extractor.server_port = Some(port);
    }
    if let Some(model) = get("LLM_MODEL_TYPE") {
        config.extractor.model = model;
    }
    if let Some(token) = get("LLM_CLIENT_TOKEN") {
        config.extractor.token = Some(token);
    }
    if let Some(mode) = get("LLM_MODE") {
        config.extractor.mode = match mode.trim().to_ascii_lowercase().as_str() {
            "chat" => InferenceMode::Chat,
            "generate" => InferenceMode::Generate,
            other => {
                return Err(ConfigError::Validation(format!(
                    "LLM_MODE must be 'chat' or 'generate', got '{}'",
                    other
                )))
            }
        };
    }
    if let Some(path) = get("DATABASE_PATH") {
        config.output.database_path = path;
    }
    if let Some(url) = get("WEBDRIVER_URL") {
        config.webdriver.url = url;
    }

    Ok(())
}

/// Computes a SHA-256 hash of the configuration file content
///
/// Logged at startup so a run can be traced back to the settings it used.
pub fn compute_config_hash(path: &Path) -> Result<String, ConfigError> {
    let content = std::fs::read_to_string(path)?;
    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    Ok(hex::encode(hasher.finalize()))
}

/// Loads a configuration and returns both the config and its hash
pub fn load_config_with_hash(path: &Path) -> Result<(Config, String), ConfigError> {
    let config = load_config(path)?;
    let hash = compute_config_hash(path)?;
    Ok((config, hash))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn create_temp_config(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file.flush().unwrap();
        file
    }

    fn no_env(_: &str) -> Option<String> {
        None
    }

    #[test]
    fn test_load_valid_config() {
        let config_content = r#"
[feed]
group-url = "https://www.facebook.com/groups/rentals"

[crawler]
stagnation-threshold = 3
force-scroll-pixels = 1500

[extractor]
server-address = "http://llm.internal"
server-port = 11434
model = "qwen2:7b"
mode = "generate"
retry-attempts = 2

[output]
database-path = "./test.db"

[workers]
count = 4
"#;

        let file = create_temp_config(config_content);
        let config = load_config(file.path()).unwrap();

        assert_eq!(config.feed.group_url, "https://www.facebook.com/groups/rentals");
        assert_eq!(config.crawler.stagnation_threshold, 3);
        assert_eq!(config.crawler.force_scroll_pixels, 1500);
        assert_eq!(config.extractor.server_port, Some(11434));
        assert_eq!(config.extractor.mode, InferenceMode::Generate);
        assert_eq!(config.extractor.retry_attempts, 2);
        assert_eq!(config.workers.count, Some(4));
    }

    #[test]
    fn test_defaults_fill_missing_sections() {
        let config = load_config_str(
            "[feed]\ngroup-url = \"https://www.facebook.com/groups/rentals\"\n",
            no_env,
        )
        .unwrap();

        assert_eq!(config.crawler.stagnation_threshold, 2);
        assert_eq!(config.crawler.force_scroll_pixels, 2000);
        assert_eq!(config.crawler.stale_retry_attempts, 3);
        assert_eq!(config.extractor.retry_attempts, 1);
        assert_eq!(config.extractor.size_ceiling, 100.0);
        assert_eq!(config.extractor.model, "llama3:8b");
        assert_eq!(config.feed.expand_labels, vec!["查看更多", "See more"]);
        assert_eq!(config.webdriver.url, "http://localhost:9515");
    }

    #[test]
    fn test_env_overrides_file_values() {
        let env: HashMap<&str, &str> = [
            ("FEED_GROUP_URL", "https://www.facebook.com/groups/other"),
            ("LLM_SERVER_PORT", "8080"),
            ("LLM_CLIENT_TOKEN", "secret"),
            ("LLM_MODE", "Generate"),
            ("DATABASE_PATH", "/var/lib/harvest.db"),
        ]
        .into_iter()
        .collect();

        let config = load_config_str(
            "[feed]\ngroup-url = \"https://www.facebook.com/groups/rentals\"\n",
            |key| env.get(key).map(|v| v.to_string()),
        )
        .unwrap();

        assert_eq!(config.feed.group_url, "https://www.facebook.com/groups/other");
        assert_eq!(config.extractor.server_port, Some(8080));
        assert_eq!(config.extractor.token.as_deref(), Some("secret"));
        assert_eq!(config.extractor.mode, InferenceMode::Generate);
        assert_eq!(config.output.database_path, "/var/lib/harvest.db");
    }

    #[test]
    fn test_blank_env_values_are_ignored() {
        let config = load_config_str(
            "[feed]\ngroup-url = \"https://www.facebook.com/groups/rentals\"\n",
            |key| (key == "LLM_CLIENT_TOKEN").then(|| "  ".to_string()),
        )
        .unwrap();
        assert_eq!(config.extractor.token, None);
    }

    #[test]
    fn test_bad_port_in_env() {
        let result = load_config_str(
            "[feed]\ngroup-url = \"https://www.facebook.com/groups/rentals\"\n",
            |key| (key == "LLM_SERVER_PORT").then(|| "eleven".to_string()),
        );
        assert!(matches!(result, Err(ConfigError::Validation(_))));
    }

    #[test]
    fn test_missing_group_url_rejected() {
        let result = load_config_str("", no_env);
        assert!(matches!(result, Err(ConfigError::Validation(_))));
    }

    #[test]
    fn test_invalid_toml() {
        let file = create_temp_config("this is not [ valid toml");
        let result = load_config(file.path());
        assert!(matches!(result, Err(ConfigError::Parse(_))));
    }

    #[test]
    fn test_missing_file() {
        let result = load_config(Path::new("/nonexistent/feed-harvest.toml"));
        assert!(matches!(result, Err(ConfigError::Io(_))));
    }

    #[test]
    fn test_config_hash_stable() {
        let file = create_temp_config("[feed]\ngroup-url = \"https://example.com/g\"\n");
        let a = compute_config_hash(file.path()).unwrap();
        let b = compute_config_hash(file.path()).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.len(), 64);
    }
}
