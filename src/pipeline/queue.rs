//! Producer/consumer handoff queue
//!
//! An unbounded tokio channel carrying [`QueueMessage`]s. The crawler holds a
//! [`QueueSender`]; the workers share one [`QueueReceiver`] and each keeps a
//! sender of its own so it can relay the shutdown signal to its siblings.

use crate::fingerprint::Fingerprint;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::{mpsc, Mutex};

/// A post waiting for extraction
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Item {
    pub fingerprint: Fingerprint,
    pub raw_text: String,
}

/// Value carried by the queue
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueueMessage {
    Item(Item),
    /// No more items will ever be produced
    Shutdown,
}

/// The receiving side has been dropped
#[derive(Debug, Error)]
#[error("work queue is closed")]
pub struct QueueClosed;

/// Creates a connected sender/receiver pair
pub fn work_queue() -> (QueueSender, QueueReceiver) {
    let (tx, rx) = mpsc::unbounded_channel();
    (
        QueueSender { tx },
        QueueReceiver {
            rx: Arc::new(Mutex::new(rx)),
        },
    )
}

/// Enqueue handle; cheap to clone
#[derive(Debug, Clone)]
pub struct QueueSender {
    tx: mpsc::UnboundedSender<QueueMessage>,
}

impl QueueSender {
    pub fn enqueue(&self, message: QueueMessage) -> Result<(), QueueClosed> {
        self.tx.send(message).map_err(|_| QueueClosed)
    }
}

/// Shared dequeue handle; clones read from the same queue
#[derive(Debug, Clone)]
pub struct QueueReceiver {
    rx: Arc<Mutex<mpsc::UnboundedReceiver<QueueMessage>>>,
}

impl QueueReceiver {
    /// Waits for the next message
    ///
    /// Returns `None` once every sender is gone and the queue is drained.
    pub async fn dequeue(&self) -> Option<QueueMessage> {
        self.rx.lock().await.recv().await
    }

    /// Takes the next message without waiting
    pub async fn try_dequeue(&self) -> Option<QueueMessage> {
        self.rx.lock().await.try_recv().ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fingerprint::fingerprint;

    fn item(text: &str) -> QueueMessage {
        QueueMessage::Item(Item {
            fingerprint: fingerprint(text),
            raw_text: text.to_string(),
        })
    }

    #[tokio::test]
    async fn test_fifo_order() {
        let (tx, rx) = work_queue();
        tx.enqueue(item("a")).unwrap();
        tx.enqueue(item("b")).unwrap();
        tx.enqueue(QueueMessage::Shutdown).unwrap();

        assert_eq!(rx.dequeue().await, Some(item("a")));
        assert_eq!(rx.dequeue().await, Some(item("b")));
        assert_eq!(rx.dequeue().await, Some(QueueMessage::Shutdown));
        assert_eq!(rx.try_dequeue().await, None);
    }

    #[tokio::test]
    async fn test_cloned_receivers_share_one_queue() {
        let (tx, rx) = work_queue();
        let other = rx.clone();
        tx.enqueue(item("a")).unwrap();

        assert_eq!(other.dequeue().await, Some(item("a")));
        assert_eq!(rx.try_dequeue().await, None);
    }

    #[tokio::test]
    async fn test_enqueue_after_receiver_dropped() {
        let (tx, rx) = work_queue();
        drop(rx);
        assert!(tx.enqueue(QueueMessage::Shutdown).is_err());
    }

    #[tokio::test]
    async fn test_dequeue_ends_when_senders_dropped() {
        let (tx, rx) = work_queue();
        tx.enqueue(item("a")).unwrap();
        drop(tx);
        assert_eq!(rx.dequeue().await, Some(item("a")));
        assert_eq!(rx.dequeue().await, None);
    }
}
