//! Storage module for persisting extracted listings
//!
//! This module handles the document store behind the workers, including:
//! - The `RecordStore` interface shared by every worker
//! - A SQLite implementation with schema management
//! - An in-memory implementation for dry runs

mod memory;
mod schema;
mod sqlite;
mod traits;

pub use memory::MemoryStore;
pub use sqlite::SqliteStore;
pub use traits::{RecordStore, StorageError, StorageResult};

use std::path::Path;
use std::sync::Arc;

/// Opens the record store for a run
///
/// # Arguments
///
/// * `path` - Path to the SQLite database file
/// * `dry_run` - Use an empty in-memory store instead of the file
///
/// # Returns
///
/// * `Ok(Arc<dyn RecordStore>)` - Store ready to be shared with workers
/// * `Err(StorageError)` - Failed to open the database
pub fn open_store(path: &Path, dry_run: bool) -> StorageResult<Arc<dyn RecordStore>> {
    if dry_run {
        tracing::info!("Dry run: records are kept in memory only");
        return Ok(Arc::new(MemoryStore::new()));
    }

    tracing::info!("Opening database at {}", path.display());
    Ok(Arc::new(SqliteStore::new(path)?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_dry_run_leaves_no_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("listings.db");

        let store = open_store(&path, true).unwrap();

        assert_eq!(store.count().await.unwrap(), 0);
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn test_opens_sqlite_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("listings.db");

        let store = open_store(&path, false).unwrap();

        assert_eq!(store.count().await.unwrap(), 0);
        assert!(path.exists());
    }
}
