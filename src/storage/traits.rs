//! Storage traits and error types
//!
//! This module defines the trait interface for record stores and
//! associated error types.

use crate::extractor::ExtractedRecord;
use crate::fingerprint::Fingerprint;
use async_trait::async_trait;
use std::collections::HashSet;
use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Database error: {0}")]
    Database(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Document store for extracted listings
///
/// Implementations are shared by every worker, so they must be safe to call
/// concurrently.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Returns the key of every stored record
    ///
    /// Used at startup to seed the dedup index.
    async fn list_existing_keys(&self) -> StorageResult<HashSet<Fingerprint>>;

    /// Inserts a record under `key`
    ///
    /// Writing a key that already exists is a no-op.
    async fn upsert(&self, key: &Fingerprint, record: &ExtractedRecord) -> StorageResult<()>;

    /// Number of stored records
    async fn count(&self) -> StorageResult<u64>;
}
