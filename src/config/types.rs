use serde::Deserialize;
use std::time::Duration;

/// Main configuration structure for Feed-Harvest
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub feed: FeedConfig,
    #[serde(default)]
    pub crawler: CrawlerConfig,
    #[serde(default)]
    pub webdriver: WebDriverConfig,
    #[serde(default)]
    pub extractor: ExtractorConfig,
    #[serde(default)]
    pub output: OutputConfig,
    #[serde(default)]
    pub workers: WorkersConfig,
}

/// Where the feed lives and how its posts look in the DOM
#[derive(Debug, Clone, Deserialize)]
pub struct FeedConfig {
    /// Site landing page, visited first so the session cookie applies
    #[serde(rename = "home-url", default = "default_home_url")]
    pub home_url: String,

    /// The group feed to harvest
    #[serde(rename = "group-url", default)]
    pub group_url: String,

    /// CSS selector matching one post body
    #[serde(rename = "post-selector", default = "default_post_selector")]
    pub post_selector: String,

    /// Link labels that expand a truncated post; also used as truncation markers
    #[serde(rename = "expand-labels", default = "default_expand_labels")]
    pub expand_labels: Vec<String>,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            home_url: default_home_url(),
            group_url: String::new(),
            post_selector: default_post_selector(),
            expand_labels: default_expand_labels(),
        }
    }
}

/// Scroll cadence and recovery tuning
#[derive(Debug, Clone, Deserialize)]
pub struct CrawlerConfig {
    /// Consecutive cycles without new posts before a forced scroll burst
    #[serde(rename = "stagnation-threshold", default = "default_stagnation_threshold")]
    pub stagnation_threshold: u32,

    /// Pixels per jump in a forced scroll burst
    #[serde(rename = "force-scroll-pixels", default = "default_force_scroll_pixels")]
    pub force_scroll_pixels: i64,

    /// Pause after scrolling to the last post (milliseconds)
    #[serde(rename = "scroll-pause-ms", default = "default_scroll_pause_ms")]
    pub scroll_pause_ms: u64,

    /// Pause at the end of every cycle and after each forced jump (milliseconds)
    #[serde(rename = "cycle-pause-ms", default = "default_cycle_pause_ms")]
    pub cycle_pause_ms: u64,

    /// Pause after clicking an expand label (milliseconds)
    #[serde(rename = "click-pause-ms", default = "default_click_pause_ms")]
    pub click_pause_ms: u64,

    /// Attempts to read a post that keeps going stale
    #[serde(rename = "stale-retry-attempts", default = "default_stale_retry_attempts")]
    pub stale_retry_attempts: u32,

    /// Pause between stale-read attempts (milliseconds)
    #[serde(rename = "stale-retry-pause-ms", default = "default_stale_retry_pause_ms")]
    pub stale_retry_pause_ms: u64,

    /// How long to wait for navigation to land (milliseconds)
    #[serde(rename = "navigation-timeout-ms", default = "default_navigation_timeout_ms")]
    pub navigation_timeout_ms: u64,
}

impl CrawlerConfig {
    pub fn scroll_pause(&self) -> Duration {
        Duration::from_millis(self.scroll_pause_ms)
    }

    pub fn cycle_pause(&self) -> Duration {
        Duration::from_millis(self.cycle_pause_ms)
    }

    pub fn click_pause(&self) -> Duration {
        Duration::from_millis(self.click_pause_ms)
    }

    pub fn stale_retry_pause(&self) -> Duration {
        Duration::from_millis(self.stale_retry_pause_ms)
    }

    pub fn navigation_timeout(&self) -> Duration {
        Duration::from_millis(self.navigation_timeout_ms)
    }

    /// Same behavior with every pause set to zero, for tests
    pub fn without_pauses(mut self) -> Self {
        self.scroll_pause_ms = 0;
        self.cycle_pause_ms = 0;
        self.click_pause_ms = 0;
        self.stale_retry_pause_ms = 0;
        self
    }
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            stagnation_threshold: default_stagnation_threshold(),
            force_scroll_pixels: default_force_scroll_pixels(),
            scroll_pause_ms: default_scroll_pause_ms(),
            cycle_pause_ms: default_cycle_pause_ms(),
            click_pause_ms: default_click_pause_ms(),
            stale_retry_attempts: default_stale_retry_attempts(),
            stale_retry_pause_ms: default_stale_retry_pause_ms(),
            navigation_timeout_ms: default_navigation_timeout_ms(),
        }
    }
}

/// WebDriver endpoint (e.g. a local chromedriver)
#[derive(Debug, Clone, Deserialize)]
pub struct WebDriverConfig {
    #[serde(default = "default_webdriver_url")]
    pub url: String,

    /// Chrome profile directory holding the logged-in session
    #[serde(rename = "user-data-dir", default)]
    pub user_data_dir: Option<String>,

    #[serde(default)]
    pub headless: bool,
}

impl Default for WebDriverConfig {
    fn default() -> Self {
        Self {
            url: default_webdriver_url(),
            user_data_dir: None,
            headless: false,
        }
    }
}

/// Which Ollama endpoint to call
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InferenceMode {
    #[default]
    Chat,
    Generate,
}

/// Structured-extraction service settings
#[derive(Debug, Clone, Deserialize)]
pub struct ExtractorConfig {
    /// Host or base URL of the inference server
    #[serde(rename = "server-address", default = "default_server_address")]
    pub server_address: String,

    /// Optional port appended to the address
    #[serde(rename = "server-port", default)]
    pub server_port: Option<u16>,

    #[serde(default = "default_model")]
    pub model: String,

    /// Bearer token, if the server sits behind an auth proxy
    #[serde(default)]
    pub token: Option<String>,

    #[serde(default)]
    pub mode: InferenceMode,

    /// Attempts per post before giving up on it
    #[serde(rename = "retry-attempts", default = "default_retry_attempts")]
    pub retry_attempts: u32,

    /// Sizes at or above this value are treated as unrecognized
    #[serde(rename = "size-ceiling", default = "default_size_ceiling")]
    pub size_ceiling: f64,

    #[serde(rename = "request-timeout-secs", default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

impl ExtractorConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

impl Default for ExtractorConfig {
    fn default() -> Self {
        Self {
            server_address: default_server_address(),
            server_port: None,
            model: default_model(),
            token: None,
            mode: InferenceMode::default(),
            retry_attempts: default_retry_attempts(),
            size_ceiling: default_size_ceiling(),
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

/// Output configuration
#[derive(Debug, Clone, Deserialize)]
pub struct OutputConfig {
    /// Path to the SQLite database file
    #[serde(rename = "database-path", default = "default_database_path")]
    pub database_path: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
        }
    }
}

/// Extraction worker pool sizing
#[derive(Debug, Clone, Default, Deserialize)]
pub struct WorkersConfig {
    /// Fixed worker count; when absent the pool scales with the cycle count
    #[serde(default)]
    pub count: Option<usize>,
}

impl WorkersConfig {
    /// Resolves the pool size for a run of `cycles` scroll cycles
    ///
    /// An explicit count wins; otherwise one worker per two cycles, at least one.
    pub fn resolve(&self, cycles: u32) -> usize {
        self.count.unwrap_or((cycles / 2) as usize).max(1)
    }
}

fn default_home_url() -> String {
    "https://www.facebook.com/".to_string()
}

fn default_post_selector() -> String {
    "div[data-ad-preview='message']".to_string()
}

fn default_expand_labels() -> Vec<String> {
    vec!["查看更多".to_string(), "See more".to_string()]
}

fn default_stagnation_threshold() -> u32 {
    2
}

fn default_force_scroll_pixels() -> i64 {
    2000
}

fn default_scroll_pause_ms() -> u64 {
    600
}

fn default_cycle_pause_ms() -> u64 {
    1000
}

fn default_click_pause_ms() -> u64 {
    1000
}

fn default_stale_retry_attempts() -> u32 {
    3
}

fn default_stale_retry_pause_ms() -> u64 {
    500
}

fn default_navigation_timeout_ms() -> u64 {
    3000
}

fn default_webdriver_url() -> String {
    "http://localhost:9515".to_string()
}

fn default_server_address() -> String {
    "http://localhost".to_string()
}

fn default_model() -> String {
    "llama3:8b".to_string()
}

fn default_retry_attempts() -> u32 {
    1
}

fn default_size_ceiling() -> f64 {
    100.0
}

fn default_request_timeout_secs() -> u64 {
    120
}

fn default_database_path() -> String {
    "./feed-harvest.db".to_string()
}
