//! The bi-indexed Idle/Pending sets (spec §4.2): objects are keyed both
//! by identity (for O(log n) removal) and by `next_check` (for
//! take-smallest). Insertion order breaks ties between equal timestamps.

use std::collections::{BTreeSet, HashMap};
use std::sync::atomic::{AtomicU64, Ordering};

use clustermon_types::CheckableId;

/// `next_check` wrapped so it orders total (NaN never appears in practice:
/// callers only ever insert wall-clock seconds).
#[derive(Debug, Clone, Copy, PartialEq)]
struct OrderedTime(f64);

impl Eq for OrderedTime {}
impl PartialOrd for OrderedTime {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}
impl Ord for OrderedTime {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.0.total_cmp(&other.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
struct Key {
    next_check: OrderedTime,
    sequence: u64,
    id: CheckableId,
}

/// A set ordered by `(next_check, insertion sequence)`, with an identity
/// index for removal/reinsertion when `next_check` changes out of band.
#[derive(Debug, Default)]
pub struct TimeIndex {
    ordered: BTreeSet<Key>,
    by_id: HashMap<CheckableId, Key>,
    next_sequence: AtomicU64,
}

impl TimeIndex {
    pub fn new() -> Self {
        TimeIndex {
            ordered: BTreeSet::new(),
            by_id: HashMap::new(),
            next_sequence: AtomicU64::new(0),
        }
    }

    pub fn len(&self) -> usize {
        self.ordered.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ordered.is_empty()
    }

    pub fn contains(&self, id: &CheckableId) -> bool {
        self.by_id.contains_key(id)
    }

    /// Insert or reposition `id` at `next_check`. A fresh sequence number
    /// is assigned on every call, so an out-of-band `next_check` update
    /// also resets FIFO order among same-timestamp peers — matching the
    /// "this is the only mutation allowed while Idle" rule in spec §4.2.
    pub fn upsert(&mut self, id: CheckableId, next_check: f64) {
        if let Some(old) = self.by_id.remove(&id) {
            self.ordered.remove(&old);
        }
        let sequence = self.next_sequence.fetch_add(1, Ordering::Relaxed);
        let key = Key {
            next_check: OrderedTime(next_check),
            sequence,
            id,
        };
        self.by_id.insert(key.id.clone(), key.clone());
        self.ordered.insert(key);
    }

    pub fn remove(&mut self, id: &CheckableId) -> bool {
        match self.by_id.remove(id) {
            Some(key) => {
                self.ordered.remove(&key);
                true
            }
            None => false,
        }
    }

    /// The smallest `next_check` currently indexed, without removing it.
    pub fn peek_due(&self) -> Option<f64> {
        self.ordered.iter().next().map(|k| k.next_check.0)
    }

    /// Remove and return the identity with the smallest `next_check`.
    pub fn pop_front(&mut self) -> Option<CheckableId> {
        let key = self.ordered.iter().next().cloned()?;
        self.ordered.remove(&key);
        self.by_id.remove(&key.id);
        Some(key.id)
    }

    /// Shift every indexed deadline by `delta` seconds (spec §4.2
    /// clock-step handling): rebuilds the set preserving relative order
    /// and insertion sequence.
    pub fn shift_all(&mut self, delta: f64) {
        let keys: Vec<Key> = self.ordered.iter().cloned().collect();
        self.ordered.clear();
        for mut key in keys {
            key.next_check = OrderedTime(key.next_check.0 + delta);
            self.by_id.insert(key.id.clone(), key.clone());
            self.ordered.insert(key);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn host(name: &str) -> CheckableId {
        CheckableId::host(name)
    }

    #[test]
    fn pop_front_returns_smallest_next_check() {
        let mut idx = TimeIndex::new();
        idx.upsert(host("c"), 30.0);
        idx.upsert(host("a"), 10.0);
        idx.upsert(host("b"), 20.0);

        assert_eq!(idx.pop_front(), Some(host("a")));
        assert_eq!(idx.pop_front(), Some(host("b")));
        assert_eq!(idx.pop_front(), Some(host("c")));
        assert!(idx.pop_front().is_none());
    }

    #[test]
    fn equal_timestamps_break_tie_by_insertion_order() {
        let mut idx = TimeIndex::new();
        idx.upsert(host("first"), 10.0);
        idx.upsert(host("second"), 10.0);

        assert_eq!(idx.pop_front(), Some(host("first")));
        assert_eq!(idx.pop_front(), Some(host("second")));
    }

    #[test]
    fn upsert_repositions_existing_entry() {
        let mut idx = TimeIndex::new();
        idx.upsert(host("a"), 100.0);
        idx.upsert(host("b"), 10.0);
        idx.upsert(host("a"), 5.0);

        assert_eq!(idx.pop_front(), Some(host("a")));
        assert_eq!(idx.pop_front(), Some(host("b")));
    }

    #[test]
    fn remove_drops_entry_from_both_indices() {
        let mut idx = TimeIndex::new();
        idx.upsert(host("a"), 10.0);
        assert!(idx.remove(&host("a")));
        assert!(!idx.contains(&host("a")));
        assert!(idx.pop_front().is_none());
    }

    #[test]
    fn shift_all_preserves_relative_order() {
        let mut idx = TimeIndex::new();
        idx.upsert(host("a"), 10.0);
        idx.upsert(host("b"), 20.0);
        idx.shift_all(100.0);

        assert_eq!(idx.peek_due(), Some(110.0));
        assert_eq!(idx.pop_front(), Some(host("a")));
        assert_eq!(idx.pop_front(), Some(host("b")));
    }
}
