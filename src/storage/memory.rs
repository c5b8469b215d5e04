//! In-process record store
//!
//! Backs `--dry-run` and the pipeline tests. Nothing outlives the process.

use crate::extractor::ExtractedRecord;
use crate::fingerprint::Fingerprint;
use crate::storage::traits::{RecordStore, StorageError, StorageResult};
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::{Mutex, MutexGuard};

#[derive(Default)]
pub struct MemoryStore {
    records: Mutex<HashMap<Fingerprint, ExtractedRecord>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store that already holds `records`
    pub fn with_records(records: impl IntoIterator<Item = ExtractedRecord>) -> Self {
        let records = records.into_iter().map(|r| (r.id.clone(), r)).collect();
        Self {
            records: Mutex::new(records),
        }
    }

    /// Snapshot of every stored record
    pub fn records(&self) -> Vec<ExtractedRecord> {
        match self.lock() {
            Ok(records) => records.values().cloned().collect(),
            Err(_) => Vec::new(),
        }
    }

    fn lock(&self) -> StorageResult<MutexGuard<'_, HashMap<Fingerprint, ExtractedRecord>>> {
        self.records
            .lock()
            .map_err(|_| StorageError::Database("record map lock poisoned".to_string()))
    }
}

#[async_trait]
impl RecordStore for MemoryStore {
    async fn list_existing_keys(&self) -> StorageResult<HashSet<Fingerprint>> {
        Ok(self.lock()?.keys().cloned().collect())
    }

    async fn upsert(&self, key: &Fingerprint, record: &ExtractedRecord) -> StorageResult<()> {
        self.lock()?
            .entry(key.clone())
            .or_insert_with(|| record.clone());
        Ok(())
    }

    async fn count(&self) -> StorageResult<u64> {
        Ok(self.lock()?.len() as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extractor::normalize;
    use crate::fingerprint::fingerprint;
    use serde_json::json;

    fn record(text: &str) -> ExtractedRecord {
        let listing = normalize(json!({ "address": text }), 100.0).unwrap();
        ExtractedRecord::new(fingerprint(text), listing, text)
    }

    #[tokio::test]
    async fn test_first_write_wins() {
        let store = MemoryStore::new();
        let first = record("post");
        let mut second = record("post");
        second.raw_text = "post, edited".to_string();

        store.upsert(&first.id, &first).await.unwrap();
        store.upsert(&second.id, &second).await.unwrap();

        assert_eq!(store.count().await.unwrap(), 1);
        assert_eq!(store.records()[0].raw_text, "post");
    }

    #[tokio::test]
    async fn test_seeded_keys_listed() {
        let store = MemoryStore::with_records(vec![record("a"), record("b")]);
        let keys = store.list_existing_keys().await.unwrap();
        assert_eq!(
            keys,
            [fingerprint("a"), fingerprint("b")].into_iter().collect()
        );
    }
}
