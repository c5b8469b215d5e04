//! Feed crawler - the pipeline's producer
//!
//! Each cycle expands truncated posts, reads every visible post, drops the
//! ones already in the dedup index, enqueues the rest, and scrolls one post
//! further. Between cycles a [`StagnationTracker`] decides whether the feed
//! is stuck and needs a forced scroll burst.
//!
//! Whatever happens inside the loop, [`FeedCrawler::run`] enqueues exactly
//! one [`QueueMessage::Shutdown`] before returning so workers never wait on a
//! producer that is gone.

use crate::config::{CrawlerConfig, FeedConfig};
use crate::crawler::driver::{AutomationDriver, DriverError, ElementHandle};
use crate::crawler::stagnation::{ScrollBurst, StagnationTracker};
use crate::dedup::DedupIndex;
use crate::fingerprint::fingerprint;
use crate::pipeline::{Item, QueueClosed, QueueMessage, QueueSender};
use crate::retry::{Backoff, RetryPolicy, Verdict};
use crate::HarvestError;
use std::sync::Arc;
use std::time::Duration;

/// What the crawler did during a run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CrawlReport {
    /// Scroll cycles fully completed
    pub cycles_completed: u32,
    /// Items handed to the queue
    pub items_emitted: u64,
    /// Posts skipped because their fingerprint was already indexed
    pub duplicates_skipped: u64,
    /// Posts that were empty or still truncated
    pub blocks_rejected: u64,
    /// Posts whose text could not be read
    pub blocks_abandoned: u64,
    /// Forced scroll bursts performed
    pub recovery_bursts: u32,
    /// True if the loop ended on an error rather than the cycle budget
    pub failed: bool,
}

/// The producer side of the pipeline
pub struct FeedCrawler {
    driver: Arc<dyn AutomationDriver>,
    feed: FeedConfig,
    settings: CrawlerConfig,
    index: DedupIndex,
    queue: QueueSender,
    stale_policy: RetryPolicy,
}

impl FeedCrawler {
    /// Creates a crawler
    ///
    /// # Arguments
    ///
    /// * `driver` - Browser automation backend
    /// * `feed` - Feed location, post selector and expand labels
    /// * `settings` - Pauses and recovery tuning
    /// * `index` - Dedup index, already seeded from the store
    /// * `queue` - Where unseen posts are sent
    pub fn new(
        driver: Arc<dyn AutomationDriver>,
        feed: FeedConfig,
        settings: CrawlerConfig,
        index: DedupIndex,
        queue: QueueSender,
    ) -> Self {
        let stale_policy = RetryPolicy::new(
            settings.stale_retry_attempts,
            Backoff::Fixed(settings.stale_retry_pause()),
        );

        Self {
            driver,
            feed,
            settings,
            index,
            queue,
            stale_policy,
        }
    }

    /// Runs `cycles` scroll cycles, then signals shutdown and closes the browser
    ///
    /// Never fails: errors end the loop early and are reflected in the report.
    pub async fn run(mut self, cycles: u32) -> CrawlReport {
        let mut report = CrawlReport::default();
        tracing::info!(
            "Starting feed crawl: {} cycles, {} fingerprints already known",
            cycles,
            self.index.len()
        );

        match self.crawl(cycles, &mut report).await {
            Ok(()) => tracing::info!(
                "Feed crawl finished: {} new posts over {} cycles",
                report.items_emitted,
                report.cycles_completed
            ),
            Err(e) => {
                tracing::error!(
                    "Feed crawl aborted after {} cycles: {}",
                    report.cycles_completed,
                    e
                );
                report.failed = true;
            }
        }

        if self.queue.enqueue(QueueMessage::Shutdown).is_err() {
            tracing::warn!("No workers left to receive the shutdown signal");
        }

        if let Err(e) = self.driver.quit().await {
            tracing::warn!("Failed to close browser session: {}", e);
        }

        report
    }

    async fn crawl(&mut self, cycles: u32, report: &mut CrawlReport) -> Result<(), HarvestError> {
        self.open_feed().await?;

        // Starts from zero, so the first cycle counts as growth even on a seeded index
        let mut tracker = StagnationTracker::new(self.settings.stagnation_threshold, 0);

        for cycle in 1..=cycles {
            self.expand_truncated_posts().await;
            self.scan_visible_posts(report).await?;
            self.scroll_one_post().await;
            pause(self.settings.cycle_pause()).await;

            let size = self.index.len();
            tracing::debug!("Cycle {}/{}: {} fingerprints indexed", cycle, cycles, size);

            if let Some(burst) = tracker.observe(size) {
                tracing::info!(
                    "No new posts for {} cycles, forcing {} scroll jump(s)",
                    self.settings.stagnation_threshold,
                    burst.jumps
                );
                self.force_scroll(burst).await;
                report.recovery_bursts += 1;
            }

            report.cycles_completed = cycle;
        }

        Ok(())
    }

    /// Lands on the home page (for the session) and then the group feed
    async fn open_feed(&self) -> Result<(), DriverError> {
        let timeout = self.settings.navigation_timeout();
        for url in [&self.feed.home_url, &self.feed.group_url] {
            tracing::info!("Navigating to {}", url);
            self.driver.navigate_to(url).await?;
            self.driver.wait_until_url_contains(url, timeout).await?;
        }
        Ok(())
    }

    /// Clicks every visible expand link
    ///
    /// Labels are tried in order and the first one that matches anything
    /// wins. Failures only skip the link in question.
    async fn expand_truncated_posts(&self) {
        let mut links = Vec::new();
        for label in &self.feed.expand_labels {
            match self.driver.find_elements_with_text(label).await {
                Ok(found) if !found.is_empty() => {
                    links = found;
                    break;
                }
                Ok(_) => {}
                Err(e) => tracing::warn!("Failed to look for '{}' links: {}", label, e),
            }
        }

        for link in &links {
            if let Err(e) = self.expand(link).await {
                tracing::warn!("Skipping an expand link: {}", e);
            }
        }

        if !links.is_empty() {
            pause(self.settings.click_pause()).await;
        }
    }

    async fn expand(&self, link: &ElementHandle) -> Result<(), DriverError> {
        if !self.driver.is_displayed(link).await? {
            return Ok(());
        }
        self.driver.scroll_into_view(link).await?;
        self.driver.click(link).await?;
        pause(self.settings.click_pause()).await;
        Ok(())
    }

    /// Reads every visible post and enqueues the unseen ones in page order
    ///
    /// Only fails if the queue is closed.
    async fn scan_visible_posts(&mut self, report: &mut CrawlReport) -> Result<(), QueueClosed> {
        let posts = match self
            .driver
            .find_visible_elements(&self.feed.post_selector)
            .await
        {
            Ok(posts) => posts,
            Err(e) => {
                tracing::warn!("Failed to list posts: {}", e);
                return Ok(());
            }
        };

        for post in &posts {
            match self.read_post(post).await {
                Ok(text) => self.accept(&text, report)?,
                Err(e) => {
                    tracing::warn!("Abandoning post {}: {}", post.id(), e);
                    report.blocks_abandoned += 1;
                }
            }
        }

        Ok(())
    }

    /// Reads a post's text, retrying while the element is stale
    async fn read_post(&self, post: &ElementHandle) -> Result<String, DriverError> {
        let driver: &dyn AutomationDriver = self.driver.as_ref();
        let outcome = self
            .stale_policy
            .run(
                move |attempt| {
                    if attempt > 1 {
                        tracing::debug!(
                            "Re-reading stale post {} (attempt {})",
                            post.id(),
                            attempt
                        );
                    }
                    driver.read_text(post)
                },
                |e: &DriverError| {
                    if e.is_transient() {
                        Verdict::Retry
                    } else {
                        Verdict::Abort
                    }
                },
            )
            .await;
        outcome.result
    }

    /// Applies the content checks and dedup to one post's text
    fn accept(&mut self, text: &str, report: &mut CrawlReport) -> Result<(), QueueClosed> {
        let text = text.trim();
        if text.is_empty() || self.is_truncated(text) {
            report.blocks_rejected += 1;
            return Ok(());
        }

        let fp = fingerprint(text);
        if self.index.contains(&fp) {
            tracing::debug!("Skipping duplicate post {}", fp);
            report.duplicates_skipped += 1;
            return Ok(());
        }

        self.index.insert(fp.clone());
        tracing::debug!("New post {} ({} chars)", fp, text.chars().count());
        self.queue.enqueue(QueueMessage::Item(Item {
            fingerprint: fp,
            raw_text: text.to_string(),
        }))?;
        report.items_emitted += 1;
        Ok(())
    }

    /// A post still showing an expand label was not fully expanded
    fn is_truncated(&self, text: &str) -> bool {
        self.feed
            .expand_labels
            .iter()
            .any(|label| text.contains(label.as_str()))
    }

    /// Brings the last visible post into view so the feed loads more
    async fn scroll_one_post(&self) {
        let posts = match self
            .driver
            .find_visible_elements(&self.feed.post_selector)
            .await
        {
            Ok(posts) => posts,
            Err(e) => {
                tracing::error!("Scrolling error: {}", e);
                return;
            }
        };

        let Some(last) = posts.last() else {
            tracing::warn!("Unable to find any posts to scroll to");
            return;
        };

        if let Err(e) = self.driver.scroll_into_view(last).await {
            tracing::error!("Scrolling error: {}", e);
            return;
        }
        pause(self.settings.scroll_pause()).await;
    }

    async fn force_scroll(&self, burst: ScrollBurst) {
        for _ in 0..burst.jumps {
            if let Err(e) = self.driver.scroll_by(self.settings.force_scroll_pixels).await {
                tracing::error!("Force scroll error: {}", e);
            }
            pause(self.settings.cycle_pause()).await;
        }
    }
}

async fn pause(duration: Duration) {
    if !duration.is_zero() {
        tokio::time::sleep(duration).await;
    }
}
