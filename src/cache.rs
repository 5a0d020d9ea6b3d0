//! Coat-check resource cache (§3.9, §9 "storable cache with masquerade"):
//! a server-side LRU of refcounted blobs keyed either by a content
//! fingerprint or by a caller-chosen "masquerade" string, used to hold a
//! `fixed` iterator's backing array across a freeze/thaw boundary so the
//! cursor text itself does not need to carry it.
//!
//! The reference storage engine this crate descends from runs its LRU
//! (`clru`) behind a lock for multi-threaded access; this engine's
//! single-threaded cooperative runloop (§5) needs no such thing, so this
//! is a plain, unsynchronized cache rather than an adaptation of `clru`.

use std::collections::HashMap;

struct Entry<V> {
    value: V,
    last_used: u64,
}

/// An LRU cache from token (masquerade string or content fingerprint) to
/// an arbitrary cached value, evicting the least-recently-touched entry
/// once `capacity` is exceeded.
pub struct CoatCheck<V> {
    capacity: usize,
    entries: HashMap<String, Entry<V>>,
    tick: u64,
}

impl<V> CoatCheck<V> {
    pub fn new(capacity: usize) -> CoatCheck<V> {
        CoatCheck { capacity, entries: HashMap::new(), tick: 0 }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn next_tick(&mut self) -> u64 {
        self.tick += 1;
        self.tick
    }

    /// Insert or overwrite `token`'s value, marking it most-recently-used.
    pub fn put(&mut self, token: impl Into<String>, value: V) {
        let tick = self.next_tick();
        self.entries.insert(token.into(), Entry { value, last_used: tick });
        self.evict_if_over_capacity();
    }

    /// Look up `token`, marking it most-recently-used on a hit. A miss is
    /// tolerated by callers per §4.3's cursor discipline: the iterator
    /// falls back to reconstructing state from set+position.
    pub fn get(&mut self, token: &str) -> Option<&V>
    where
        V: Clone,
    {
        let tick = self.next_tick();
        match self.entries.get_mut(token) {
            Some(entry) => {
                entry.last_used = tick;
                Some(&entry.value)
            }
            None => None,
        }
    }

    pub fn contains(&self, token: &str) -> bool {
        self.entries.contains_key(token)
    }

    pub fn remove(&mut self, token: &str) -> Option<V> {
        self.entries.remove(token).map(|e| e.value)
    }

    fn evict_if_over_capacity(&mut self) {
        while self.entries.len() > self.capacity {
            let victim = self
                .entries
                .iter()
                .min_by_key(|(_, e)| e.last_used)
                .map(|(k, _)| k.clone());
            match victim {
                Some(k) => {
                    self.entries.remove(&k);
                }
                None => break,
            }
        }
    }
}

#[cfg(test)]
#[path = "cache_test.rs"]
mod cache_test;
