//! Extraction workers - the pipeline's consumers
//!
//! Every worker loops on the shared queue: an item is extracted and, if that
//! succeeds, persisted. When a worker dequeues [`QueueMessage::Shutdown`] it
//! puts the signal back before exiting, so one sentinel from the crawler
//! reaches every worker and is still in the queue after the last one stops.

use crate::extractor::Extractor;
use crate::pipeline::queue::{Item, QueueMessage, QueueReceiver, QueueSender};
use crate::storage::RecordStore;
use std::ops::AddAssign;
use std::sync::Arc;
use tokio::task::JoinHandle;

/// What one worker (or the whole pool) did
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WorkerReport {
    /// Items taken off the queue
    pub items_received: u64,
    /// Records written to the store
    pub records_persisted: u64,
    /// Items dropped after the extraction retry budget ran out
    pub extraction_failures: u64,
    /// Records the store refused
    pub persistence_failures: u64,
}

impl AddAssign for WorkerReport {
    fn add_assign(&mut self, other: Self) {
        self.items_received += other.items_received;
        self.records_persisted += other.records_persisted;
        self.extraction_failures += other.extraction_failures;
        self.persistence_failures += other.persistence_failures;
    }
}

/// One consumer
pub struct Worker {
    id: usize,
    receiver: QueueReceiver,
    relay: QueueSender,
    extractor: Arc<Extractor>,
    store: Arc<dyn RecordStore>,
}

impl Worker {
    pub fn new(
        id: usize,
        receiver: QueueReceiver,
        relay: QueueSender,
        extractor: Arc<Extractor>,
        store: Arc<dyn RecordStore>,
    ) -> Self {
        Self {
            id,
            receiver,
            relay,
            extractor,
            store,
        }
    }

    /// Consumes items until the shutdown signal arrives
    pub async fn run(self) -> WorkerReport {
        let mut report = WorkerReport::default();
        tracing::debug!("Worker {} started", self.id);

        loop {
            match self.receiver.dequeue().await {
                Some(QueueMessage::Item(item)) => {
                    report.items_received += 1;
                    self.process(item, &mut report).await;
                }
                Some(QueueMessage::Shutdown) => {
                    if self.relay.enqueue(QueueMessage::Shutdown).is_err() {
                        tracing::warn!("Worker {} could not relay shutdown", self.id);
                    }
                    break;
                }
                None => {
                    tracing::warn!("Worker {}: queue closed without a shutdown signal", self.id);
                    break;
                }
            }
        }

        tracing::debug!(
            "Worker {} stopped after {} item(s), {} persisted",
            self.id,
            report.items_received,
            report.records_persisted
        );
        report
    }

    async fn process(&self, item: Item, report: &mut WorkerReport) {
        let Some(record) = self.extractor.extract(&item.raw_text).await else {
            report.extraction_failures += 1;
            return;
        };

        match self.store.upsert(&item.fingerprint, &record).await {
            Ok(()) => {
                report.records_persisted += 1;
                tracing::info!("Worker {}: stored listing {}", self.id, item.fingerprint);
            }
            Err(e) => {
                report.persistence_failures += 1;
                tracing::error!(
                    "Worker {}: failed to store listing {}: {}",
                    self.id,
                    item.fingerprint,
                    e
                );
            }
        }
    }
}

/// A fixed set of running workers
pub struct WorkerPool {
    handles: Vec<JoinHandle<WorkerReport>>,
}

impl WorkerPool {
    /// Starts `count` workers on the shared queue
    ///
    /// # Arguments
    ///
    /// * `count` - Number of workers; at least one is always started
    /// * `receiver` - Shared dequeue handle
    /// * `relay` - Sender each worker uses to pass the shutdown signal on
    /// * `extractor` - Extraction stage shared by all workers
    /// * `store` - Destination for extracted records
    pub fn spawn(
        count: usize,
        receiver: QueueReceiver,
        relay: QueueSender,
        extractor: Arc<Extractor>,
        store: Arc<dyn RecordStore>,
    ) -> Self {
        let count = count.max(1);
        tracing::info!("Starting {} extraction worker(s)", count);

        let handles = (1..=count)
            .map(|id| {
                let worker = Worker::new(
                    id,
                    receiver.clone(),
                    relay.clone(),
                    Arc::clone(&extractor),
                    Arc::clone(&store),
                );
                tokio::spawn(worker.run())
            })
            .collect();

        Self { handles }
    }

    pub(crate) fn len(&self) -> usize {
        self.handles.len()
    }

    /// Waits for every worker and sums their reports
    ///
    /// A worker that panicked is logged and contributes nothing.
    pub async fn join(self) -> WorkerReport {
        let mut total = WorkerReport::default();
        for handle in self.handles {
            match handle.await {
                Ok(report) => total += report,
                Err(e) => tracing::error!("Worker task failed: {}", e),
            }
        }
        total
    }
}
