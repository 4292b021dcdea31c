//! # Memory Store
//!
//! Ordered in-memory ledger store. Used by the service and by tests;
//! a node would plug its persistent store in behind `KvStore` instead.

use crate::ports::outbound::{KvPair, KvStore, Order};
use std::collections::BTreeMap;
use std::ops::Bound;

/// In-memory ordered key-value store.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct MemoryStore {
    entries: BTreeMap<Vec<u8>, Vec<u8>>,
}

impl MemoryStore {
    /// Create a new empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored keys.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if the store holds no keys.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl KvStore for MemoryStore {
    fn get(&self, key: &[u8]) -> Option<Vec<u8>> {
        self.entries.get(key).cloned()
    }

    fn set(&mut self, key: &[u8], value: &[u8]) {
        self.entries.insert(key.to_vec(), value.to_vec());
    }

    fn delete(&mut self, key: &[u8]) {
        self.entries.remove(key);
    }

    fn range_limited(
        &self,
        start: Option<&[u8]>,
        end: Option<&[u8]>,
        order: Order,
        limit: usize,
    ) -> Vec<KvPair> {
        let lower = start.map_or(Bound::Unbounded, |s| Bound::Included(s.to_vec()));
        let upper = end.map_or(Bound::Unbounded, |e| Bound::Excluded(e.to_vec()));
        if let (Bound::Included(s), Bound::Excluded(e)) = (&lower, &upper) {
            if s >= e {
                return Vec::new();
            }
        }
        let iter = self
            .entries
            .range((lower, upper))
            .map(|(k, v)| (k.clone(), v.clone()));
        match order {
            Order::Ascending => iter.take(limit).collect(),
            Order::Descending => iter.rev().take(limit).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_set_delete() {
        let mut store = MemoryStore::new();
        assert!(store.is_empty());
        store.set(b"a", b"1");
        assert_eq!(store.get(b"a"), Some(b"1".to_vec()));
        store.delete(b"a");
        store.delete(b"missing");
        assert!(store.is_empty());
    }

    #[test]
    fn test_range_bounds_and_order() {
        let mut store = MemoryStore::new();
        for key in [b"a", b"b", b"c", b"d"] {
            store.set(key, key);
        }
        let asc: Vec<_> = store
            .range(Some(b"b"), Some(b"d"), Order::Ascending)
            .into_iter()
            .map(|(k, _)| k)
            .collect();
        assert_eq!(asc, vec![b"b".to_vec(), b"c".to_vec()]);

        let desc = store.range(None, None, Order::Descending);
        assert_eq!(desc[0].0, b"d".to_vec());
        assert!(store.range(Some(b"d"), Some(b"a"), Order::Ascending).is_empty());

        let first = store.range_limited(None, None, Order::Descending, 2);
        assert_eq!(first.len(), 2);
        assert_eq!(first[1].0, b"c".to_vec());
    }

    #[test]
    fn test_prefix_range() {
        let mut store = MemoryStore::new();
        store.set(&[1, 1], b"x");
        store.set(&[1, 2], b"y");
        store.set(&[2, 0], b"z");
        assert_eq!(store.prefix_range(&[1], Order::Ascending).len(), 2);
    }
}
