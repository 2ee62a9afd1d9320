//! Shared "last POST state wins" dedup helper for the stateful-entry
//! extractors (spec.md §4.3).

use std::collections::HashMap;
use std::hash::Hash;

use crate::decode::LedgerChangeEntry;

/// Deduplicates `changes` by `key_fn`, keeping the last (highest-index)
/// change observed for each key, while preserving first-seen key order.
/// `key_fn` returns `None` for changes that don't belong to the entry type
/// being extracted and are skipped.
pub fn dedup_last_by_key<'a, K, F>(
    changes: &[&'a LedgerChangeEntry],
    key_fn: F,
) -> Vec<&'a LedgerChangeEntry>
where
    K: Eq + Hash + Clone,
    F: Fn(&LedgerChangeEntry) -> Option<K>,
{
    let mut order: Vec<K> = Vec::new();
    let mut slots: HashMap<K, &'a LedgerChangeEntry> = HashMap::new();

    for change in changes {
        let Some(key) = key_fn(change) else {
            continue;
        };
        if !slots.contains_key(&key) {
            order.push(key.clone());
        }
        slots.insert(key, change);
    }

    order.into_iter().filter_map(|k| slots.get(&k).copied()).collect()
}
