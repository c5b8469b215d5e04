//! Pipeline module - wires the crawler to the extraction workers
//!
//! ```text
//! FeedCrawler --Item--> work queue --Item--> Worker x N --record--> RecordStore
//!             --Shutdown-->          <--Shutdown relay--
//! ```
//!
//! The dedup index is seeded from the store before the crawl starts, so a
//! post stored by an earlier run is never queued again.

mod queue;
mod worker;

pub use queue::{work_queue, Item, QueueClosed, QueueMessage, QueueReceiver, QueueSender};
pub use worker::{Worker, WorkerPool, WorkerReport};

use crate::config::Config;
use crate::crawler::{AutomationDriver, FeedCrawler};
use crate::dedup::DedupIndex;
use crate::extractor::Extractor;
use crate::output::RunStatistics;
use crate::storage::RecordStore;
use crate::Result;
use std::sync::Arc;
use std::time::Instant;

/// Runs one complete harvest
///
/// # Arguments
///
/// * `driver` - Browser automation backend, handed to the crawler
/// * `extractor` - Extraction stage shared by the workers
/// * `store` - Record store; seeds the dedup index and receives records
/// * `config` - Feed and crawler settings
/// * `cycles` - Number of scroll cycles
/// * `workers` - Number of extraction workers
///
/// # Returns
///
/// * `Ok(RunStatistics)` - The crawler and every worker have stopped
/// * `Err(HarvestError)` - The store could not be read, or the crawler task panicked
pub async fn run_pipeline(
    driver: Arc<dyn AutomationDriver>,
    extractor: Arc<Extractor>,
    store: Arc<dyn RecordStore>,
    config: &Config,
    cycles: u32,
    workers: usize,
) -> Result<RunStatistics> {
    let started = Instant::now();

    let known = store.list_existing_keys().await?;
    tracing::info!("Seeding dedup index with {} stored listing(s)", known.len());
    let index = DedupIndex::seeded(known);

    let (sender, receiver) = work_queue();
    let pool = WorkerPool::spawn(
        workers,
        receiver,
        sender.clone(),
        extractor,
        Arc::clone(&store),
    );
    let worker_count = pool.len();

    let crawler = FeedCrawler::new(
        driver,
        config.feed.clone(),
        config.crawler.clone(),
        index,
        sender.clone(),
    );
    let crawl = match tokio::spawn(crawler.run(cycles)).await {
        Ok(report) => report,
        Err(e) => {
            tracing::error!("Crawler task failed: {}", e);
            let _ = sender.enqueue(QueueMessage::Shutdown);
            pool.join().await;
            return Err(e.into());
        }
    };
    drop(sender);

    let workers = pool.join().await;
    let stored_records = store.count().await?;

    tracing::info!(
        "Harvest complete: {} queued, {} stored, {} lost",
        crawl.items_emitted,
        workers.records_persisted,
        workers.extraction_failures + workers.persistence_failures
    );

    Ok(RunStatistics {
        crawl,
        workers,
        worker_count,
        stored_records,
        elapsed: started.elapsed(),
    })
}
