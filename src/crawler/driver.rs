//! Browser automation interface
//!
//! The crawler only talks to the page through [`AutomationDriver`]. Each call
//! is expected to work most of the time but may fail individually; the
//! crawler decides per call whether a failure skips a step or a block.

use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;

/// Errors raised by an automation driver
#[derive(Debug, Error)]
pub enum DriverError {
    #[error("Stale element reference: {0}")]
    Stale(String),

    #[error("No such element: {0}")]
    NoSuchElement(String),

    #[error("Timed out after {timeout:?} waiting for {what}")]
    Timeout { what: String, timeout: Duration },

    #[error("Script error: {0}")]
    Script(String),

    #[error("WebDriver HTTP error: {0}")]
    Http(String),

    #[error("WebDriver protocol error ({code}): {message}")]
    Protocol { code: String, message: String },
}

impl DriverError {
    /// True for failures worth retrying on the same element
    ///
    /// Only staleness qualifies: the element was re-rendered between being
    /// located and being read, and a second read usually succeeds.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Stale(_))
    }
}

impl From<reqwest::Error> for DriverError {
    fn from(err: reqwest::Error) -> Self {
        DriverError::Http(err.to_string())
    }
}

/// Result type for driver operations
pub type DriverResult<T> = Result<T, DriverError>;

/// Opaque handle to an element located on the page
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ElementHandle(pub String);

impl ElementHandle {
    pub fn id(&self) -> &str {
        &self.0
    }
}

/// Page-automation operations the crawler depends on
#[async_trait]
pub trait AutomationDriver: Send + Sync {
    /// Loads a URL in the current window
    async fn navigate_to(&self, url: &str) -> DriverResult<()>;

    /// Polls the current URL until it contains `fragment`
    async fn wait_until_url_contains(&self, fragment: &str, timeout: Duration) -> DriverResult<()>;

    /// Locates every element matching a CSS selector
    async fn find_visible_elements(&self, selector: &str) -> DriverResult<Vec<ElementHandle>>;

    /// Locates `div` elements whose own text is exactly `text`
    async fn find_elements_with_text(&self, text: &str) -> DriverResult<Vec<ElementHandle>>;

    async fn is_displayed(&self, element: &ElementHandle) -> DriverResult<bool>;

    /// Scrolls so the element's bottom edge is in view
    async fn scroll_into_view(&self, element: &ElementHandle) -> DriverResult<()>;

    async fn click(&self, element: &ElementHandle) -> DriverResult<()>;

    /// Scrolls the viewport vertically by `pixels`
    async fn scroll_by(&self, pixels: i64) -> DriverResult<()>;

    /// Reads the rendered text of an element
    ///
    /// Fails with [`DriverError::Stale`] if the element was detached.
    async fn read_text(&self, element: &ElementHandle) -> DriverResult<String>;

    /// Ends the browser session
    async fn quit(&self) -> DriverResult<()>;
}
