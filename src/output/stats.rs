//! Run and store statistics
//!
//! This module provides functionality for summarizing a finished run and
//! for reporting what the record store currently holds.

use crate::crawler::CrawlReport;
use crate::pipeline::WorkerReport;
use crate::storage::{RecordStore, StorageResult};
use std::fmt::Write;
use std::time::Duration;

/// Everything a single run did
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunStatistics {
    /// Producer side
    pub crawl: CrawlReport,

    /// Consumer side, summed over all workers
    pub workers: WorkerReport,

    /// Number of workers that ran
    pub worker_count: usize,

    /// Records in the store once the run finished
    pub stored_records: u64,

    /// Wall-clock duration of the run
    pub elapsed: Duration,
}

impl RunStatistics {
    /// Items that entered the queue but produced no stored record
    pub fn items_lost(&self) -> u64 {
        self.workers.extraction_failures + self.workers.persistence_failures
    }
}

/// What the store holds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StoreStatistics {
    pub total_records: u64,
}

/// Loads statistics from the store
///
/// # Arguments
///
/// * `store` - The store to query
///
/// # Returns
///
/// * `Ok(StoreStatistics)` - Successfully loaded statistics
/// * `Err(StorageError)` - Failed to query the store
pub async fn load_statistics(store: &dyn RecordStore) -> StorageResult<StoreStatistics> {
    Ok(StoreStatistics {
        total_records: store.count().await?,
    })
}

/// Renders run statistics as a plain-text report
pub fn render_statistics(stats: &RunStatistics) -> String {
    let mut out = String::new();
    let crawl = &stats.crawl;
    let workers = &stats.workers;

    // Writing into a String cannot fail
    let _ = writeln!(out, "=== Harvest Statistics ===\n");

    let _ = writeln!(out, "Crawl:");
    let _ = writeln!(out, "  Cycles completed: {}", crawl.cycles_completed);
    let _ = writeln!(out, "  New posts queued: {}", crawl.items_emitted);
    let _ = writeln!(out, "  Duplicates skipped: {}", crawl.duplicates_skipped);
    let _ = writeln!(out, "  Posts rejected (empty/truncated): {}", crawl.blocks_rejected);
    let _ = writeln!(out, "  Posts abandoned (unreadable): {}", crawl.blocks_abandoned);
    let _ = writeln!(out, "  Forced scroll bursts: {}", crawl.recovery_bursts);
    if crawl.failed {
        let _ = writeln!(out, "  Crawl ended early on an error");
    }
    let _ = writeln!(out);

    let _ = writeln!(out, "Extraction ({} worker(s)):", stats.worker_count);
    let _ = writeln!(out, "  Items received: {}", workers.items_received);
    let _ = writeln!(out, "  Records stored: {}", workers.records_persisted);
    let _ = writeln!(out, "  Extraction failures: {}", workers.extraction_failures);
    let _ = writeln!(out, "  Persistence failures: {}", workers.persistence_failures);
    let _ = writeln!(out);

    let success_rate = if workers.items_received > 0 {
        (workers.records_persisted as f64 / workers.items_received as f64) * 100.0
    } else {
        0.0
    };

    let _ = writeln!(
        out,
        "Success Rate: {:.1}% ({} / {} posts stored)",
        success_rate, workers.records_persisted, workers.items_received
    );
    let _ = writeln!(out, "Records in store: {}", stats.stored_records);
    let _ = write!(out, "Elapsed: {:.1}s", stats.elapsed.as_secs_f64());

    out
}

/// Prints run statistics to stdout
///
/// # Arguments
///
/// * `stats` - The statistics to display
pub fn print_statistics(stats: &RunStatistics) {
    println!("{}", render_statistics(stats));
}

/// Prints store statistics to stdout
pub fn print_store_statistics(stats: &StoreStatistics) {
    println!("=== Store Statistics ===\n");
    println!("  Stored listings: {}", stats.total_records);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStore;

    fn sample() -> RunStatistics {
        RunStatistics {
            crawl: CrawlReport {
                cycles_completed: 10,
                items_emitted: 8,
                duplicates_skipped: 30,
                ..CrawlReport::default()
            },
            workers: WorkerReport {
                items_received: 8,
                records_persisted: 6,
                extraction_failures: 2,
                persistence_failures: 0,
            },
            worker_count: 5,
            stored_records: 120,
            elapsed: Duration::from_millis(42_500),
        }
    }

    #[test]
    fn test_items_lost() {
        assert_eq!(sample().items_lost(), 2);
    }

    #[test]
    fn test_render_statistics() {
        let text = render_statistics(&sample());

        assert!(text.contains("Cycles completed: 10"));
        assert!(text.contains("Duplicates skipped: 30"));
        assert!(text.contains("Extraction (5 worker(s)):"));
        assert!(text.contains("Success Rate: 75.0% (6 / 8 posts stored)"));
        assert!(text.contains("Records in store: 120"));
        assert!(text.contains("Elapsed: 42.5s"));
        assert!(!text.contains("ended early"));
    }

    #[test]
    fn test_render_failed_crawl_with_no_items() {
        let mut stats = RunStatistics::default();
        stats.crawl.failed = true;

        let text = render_statistics(&stats);

        assert!(text.contains("Crawl ended early on an error"));
        assert!(text.contains("Success Rate: 0.0% (0 / 0 posts stored)"));
    }

    #[tokio::test]
    async fn test_load_statistics_empty_store() {
        let store = MemoryStore::new();
        let stats = load_statistics(&store).await.unwrap();
        assert_eq!(stats.total_records, 0);
    }
}
