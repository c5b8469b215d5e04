//! SQLite storage implementation
//!
//! This module provides a SQLite-based implementation of the RecordStore trait.

use crate::extractor::ExtractedRecord;
use crate::fingerprint::Fingerprint;
use crate::storage::schema::initialize_schema;
use crate::storage::traits::{RecordStore, StorageError, StorageResult};
use async_trait::async_trait;
use rusqlite::{params, Connection};
use std::collections::HashSet;
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

/// SQLite storage backend
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Opens or creates a database file
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the SQLite database file
    ///
    /// # Returns
    ///
    /// * `Ok(SqliteStore)` - Successfully opened/created database
    /// * `Err(StorageError)` - Failed to open database
    pub fn new(path: &Path) -> StorageResult<Self> {
        let conn = Connection::open(path)?;

        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA temp_store = MEMORY;
        ",
        )?;

        initialize_schema(&conn)?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Creates an in-memory database
    pub fn new_in_memory() -> StorageResult<Self> {
        let conn = Connection::open_in_memory()?;
        initialize_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn conn(&self) -> StorageResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| StorageError::Database("connection lock poisoned".to_string()))
    }
}

#[async_trait]
impl RecordStore for SqliteStore {
    async fn list_existing_keys(&self) -> StorageResult<HashSet<Fingerprint>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare("SELECT id FROM listings")?;
        let ids = stmt.query_map([], |row| row.get::<_, String>(0))?;

        let mut keys = HashSet::new();
        for id in ids {
            let id = id?;
            match Fingerprint::from_hex(&id) {
                Some(key) => {
                    keys.insert(key);
                }
                None => tracing::warn!("Ignoring listing with malformed id {:?}", id),
            }
        }

        Ok(keys)
    }

    async fn upsert(&self, key: &Fingerprint, record: &ExtractedRecord) -> StorageResult<()> {
        let document = serde_json::to_string(record)?;
        let conn = self.conn()?;

        let inserted = conn.execute(
            "INSERT INTO listings (id, document, raw_text, extracted_at)
             VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT(id) DO NOTHING",
            params![
                key.as_str(),
                document,
                record.raw_text,
                record.extracted_at.to_rfc3339()
            ],
        )?;

        if inserted == 0 {
            tracing::debug!("Listing {} already stored", key);
        }

        Ok(())
    }

    async fn count(&self) -> StorageResult<u64> {
        let conn = self.conn()?;
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM listings", [], |row| row.get(0))?;
        Ok(count as u64)
    }
}
