//! Time-to-live cache backing the in-memory nonce store.
//!
//! Entries expire a fixed duration after insertion; an entry is still live at
//! exactly its TTL. Expired entries are invisible to lookups but stay in
//! memory until [`TtlCache::cleanup`] runs.

use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::hash::Hash;
use std::time::{Duration, Instant};

/// A cache whose entries expire after a configurable TTL.
#[derive(Debug)]
pub struct TtlCache<K, V> {
    cache: HashMap<K, (V, Instant)>,
    ttl: Duration,
}

impl<K, V> TtlCache<K, V>
where
    K: Hash + Eq,
{
    /// Create a new TTL cache with the specified time-to-live duration.
    pub fn new(ttl: Duration) -> Self {
        Self {
            cache: HashMap::new(),
            ttl,
        }
    }

    /// Insert the entry unless a live one already exists for the key.
    ///
    /// An expired entry counts as absent and is replaced. Returns `true` if
    /// the value was inserted.
    pub fn insert_if_absent(&mut self, key: K, value: V) -> bool {
        let now = Instant::now();
        match self.cache.entry(key) {
            Entry::Occupied(mut entry) => {
                if now.duration_since(entry.get().1) <= self.ttl {
                    false
                } else {
                    entry.insert((value, now));
                    true
                }
            }
            Entry::Vacant(entry) => {
                entry.insert((value, now));
                true
            }
        }
    }

    /// Get a reference to a value if it exists and hasn't expired.
    #[cfg(test)]
    pub fn get(&self, key: &K) -> Option<&V> {
        self.cache.get(key).and_then(|(value, timestamp)| {
            if timestamp.elapsed() <= self.ttl {
                Some(value)
            } else {
                None
            }
        })
    }

    /// Check if a key exists and hasn't expired.
    #[cfg(test)]
    pub fn contains(&self, key: &K) -> bool {
        self.get(key).is_some()
    }

    /// Remove all expired entries from the cache.
    pub fn cleanup(&mut self) {
        let ttl = self.ttl;
        self.cache.retain(|_, (_, timestamp)| timestamp.elapsed() <= ttl);
    }

    /// Get the number of entries in the cache (including expired ones).
    pub fn len(&self) -> usize {
        self.cache.len()
    }

    /// Check if the cache is empty.
    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        self.cache.is_empty()
    }

    /// Get the number of non-expired entries.
    pub fn active_count(&self) -> usize {
        let ttl = self.ttl;
        self.cache
            .values()
            .filter(|(_, timestamp)| timestamp.elapsed() <= ttl)
            .count()
    }

    /// Get the TTL duration for this cache.
    pub fn ttl(&self) -> Duration {
        self.ttl
    }
}
