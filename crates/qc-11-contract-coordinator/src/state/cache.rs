//! Copy-on-write branch over a parent store.
//!
//! Writes and deletes land in an overlay; reads fall through to the parent
//! for untouched keys. `commit` writes the overlay into the parent, dropping
//! the branch discards it. Branches nest: a `CacheStore` is itself a
//! `KvStore`.

use crate::ports::outbound::{KvPair, KvStore, Order};
use std::collections::BTreeMap;
use std::ops::Bound;

/// Overlay of pending writes (`None` = delete) on top of a parent store.
pub struct CacheStore<'a> {
    parent: &'a mut dyn KvStore,
    writes: BTreeMap<Vec<u8>, Option<Vec<u8>>>,
}

impl<'a> CacheStore<'a> {
    /// Opens a branch over `parent`.
    pub fn new(parent: &'a mut dyn KvStore) -> Self {
        Self {
            parent,
            writes: BTreeMap::new(),
        }
    }

    /// Number of pending writes and deletes.
    #[must_use]
    pub fn pending(&self) -> usize {
        self.writes.len()
    }

    /// Writes the overlay into the parent.
    pub fn commit(self) {
        let Self { parent, writes } = self;
        for (key, value) in writes {
            match value {
                Some(value) => parent.set(&key, &value),
                None => parent.delete(&key),
            }
        }
    }

    /// Drops the overlay.
    pub fn discard(self) {}
}

impl KvStore for CacheStore<'_> {
    fn get(&self, key: &[u8]) -> Option<Vec<u8>> {
        match self.writes.get(key) {
            Some(pending) => pending.clone(),
            None => self.parent.get(key),
        }
    }

    fn set(&mut self, key: &[u8], value: &[u8]) {
        self.writes.insert(key.to_vec(), Some(value.to_vec()));
    }

    fn delete(&mut self, key: &[u8]) {
        self.writes.insert(key.to_vec(), None);
    }

    fn range_limited(
        &self,
        start: Option<&[u8]>,
        end: Option<&[u8]>,
        order: Order,
        limit: usize,
    ) -> Vec<KvPair> {
        if let (Some(s), Some(e)) = (start, end) {
            if s >= e {
                return Vec::new();
            }
        }
        let lower = start.map_or(Bound::Unbounded, |s| Bound::Included(s.to_vec()));
        let upper = end.map_or(Bound::Unbounded, |e| Bound::Excluded(e.to_vec()));
        let overlay = self.writes.range((lower, upper));

        // Each overlay entry hides at most one parent entry, so this many
        // parent entries always cover the first `limit` merged ones.
        let parent_limit = limit.saturating_add(overlay.clone().count());
        let mut merged: BTreeMap<Vec<u8>, Vec<u8>> = self
            .parent
            .range_limited(start, end, order, parent_limit)
            .into_iter()
            .collect();

        for (key, value) in overlay {
            match value {
                Some(value) => {
                    merged.insert(key.clone(), value.clone());
                }
                None => {
                    merged.remove(key);
                }
            }
        }

        match order {
            Order::Ascending => merged.into_iter().take(limit).collect(),
            Order::Descending => merged.into_iter().rev().take(limit).collect(),
        }
    }
}
