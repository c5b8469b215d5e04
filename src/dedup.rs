//! Dedup index of fingerprints already seen
//!
//! The index is owned by the crawler task and never shared, so it is a
//! plain `HashSet` with no locking.

use crate::fingerprint::Fingerprint;
use std::collections::HashSet;

/// Set of fingerprints that must not be enqueued again
#[derive(Debug, Default, Clone)]
pub struct DedupIndex {
    seen: HashSet<Fingerprint>,
}

impl DedupIndex {
    /// Creates an empty index
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an index seeded with the store's existing keys
    pub fn seeded<I>(keys: I) -> Self
    where
        I: IntoIterator<Item = Fingerprint>,
    {
        Self {
            seen: keys.into_iter().collect(),
        }
    }

    pub fn contains(&self, fingerprint: &Fingerprint) -> bool {
        self.seen.contains(fingerprint)
    }

    /// Records a fingerprint
    ///
    /// Returns `false` if it was already present.
    pub fn insert(&mut self, fingerprint: Fingerprint) -> bool {
        self.seen.insert(fingerprint)
    }

    pub fn len(&self) -> usize {
        self.seen.len()
    }

    pub fn is_empty(&self) -> bool {
        self.seen.is_empty()
    }
}
