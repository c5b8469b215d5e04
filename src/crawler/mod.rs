//! Crawler module - the producer side of the pipeline
//!
//! This module contains everything that touches the browser, including:
//! - The automation driver interface and its WebDriver implementation
//! - Scroll-stagnation detection and recovery sizing
//! - The feed crawl loop that turns visible posts into queue items

mod driver;
mod feed;
mod stagnation;
mod webdriver;

pub use driver::{AutomationDriver, DriverError, DriverResult, ElementHandle};
pub use feed::{CrawlReport, FeedCrawler};
pub use stagnation::{ScrollBurst, StagnationTracker};
pub use webdriver::WebDriverClient;
