//! Nonce store contract and the in-memory store.

use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use crate::nonce::TtlCache;

/// Minimum number of records before the in-memory store purges expired ones.
const CLEANUP_THRESHOLD: usize = 1024;

/// Storage for nonces that have already been seen.
///
/// Implementations must make [`NonceStore::try_record`] a single atomic
/// check-and-insert: two concurrent calls with the same tuple must never both
/// return `true`. Records may be forgotten once they are older than the
/// replay window.
pub trait NonceStore: Send + Sync {
    /// Record a nonce.
    ///
    /// Returns `true` if the tuple was newly recorded and `false` if the nonce
    /// was already used for this consumer key and token.
    fn try_record(&self, consumer_key: &str, token: &str, nonce: &str, timestamp: i64) -> bool;
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct NonceKey {
    consumer_key: String,
    token: String,
    nonce: String,
}

#[derive(Debug)]
struct Records {
    cache: TtlCache<NonceKey, i64>,
    next_cleanup: usize,
}

/// Nonce store kept in process memory.
///
/// Check and insert happen under one lock acquisition. A record is retained
/// for twice the timestamp window plus one second. A message stays
/// acceptable until the end of the second one window after its timestamp,
/// and that timestamp may itself be one window ahead of the local clock.
///
/// # Example
///
/// ```rust
/// use std::time::Duration;
/// use oauth1_channel::nonce::{MemoryNonceStore, NonceStore};
///
/// let store = MemoryNonceStore::new(Duration::from_secs(300));
/// assert!(store.try_record("consumer", "token", "abc", 1_700_000_000));
/// assert!(!store.try_record("consumer", "token", "abc", 1_700_000_000));
/// ```
#[derive(Debug)]
pub struct MemoryNonceStore {
    records: Mutex<Records>,
}

impl MemoryNonceStore {
    /// Create a store for the given timestamp window.
    pub fn new(timestamp_window: Duration) -> Self {
        Self::with_retention(retention_for(timestamp_window))
    }

    /// Create a store that keeps records for exactly `retention`.
    pub fn with_retention(retention: Duration) -> Self {
        Self {
            records: Mutex::new(Records {
                cache: TtlCache::new(retention),
                next_cleanup: CLEANUP_THRESHOLD,
            }),
        }
    }

    /// How long a record is kept.
    pub fn retention(&self) -> Duration {
        self.lock().cache.ttl()
    }

    /// Number of live records.
    pub fn active_count(&self) -> usize {
        self.lock().cache.active_count()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Records> {
        self.records.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Longest time a message accepted under `timestamp_window` stays acceptable.
///
/// Timestamps are whole seconds checked inclusively, so acceptance lasts
/// until just before `timestamp + window + 1`, while the first acceptance can
/// happen as early as `timestamp - window`.
fn retention_for(timestamp_window: Duration) -> Duration {
    timestamp_window
        .saturating_mul(2)
        .saturating_add(Duration::from_secs(1))
}

impl NonceStore for MemoryNonceStore {
    fn try_record(&self, consumer_key: &str, token: &str, nonce: &str, timestamp: i64) -> bool {
        let mut records = self.lock();

        if records.cache.len() >= records.next_cleanup {
            records.cache.cleanup();
            let remaining = records.cache.len();
            records.next_cleanup = CLEANUP_THRESHOLD.max(remaining * 2);
            tracing::debug!(remaining, "Purged expired nonce records");
        }

        let key = NonceKey {
            consumer_key: consumer_key.to_string(),
            token: token.to_string(),
            nonce: nonce.to_string(),
        };
        records.cache.insert_if_absent(key, timestamp)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Barrier};
    use std::thread;

    #[test]
    fn test_replay_rejected() {
        let store = MemoryNonceStore::new(Duration::from_secs(300));
        assert!(store.try_record("key", "token", "n1", 100));
        assert!(!store.try_record("key", "token", "n1", 100));
        assert!(store.try_record("key", "token", "n2", 100));
    }

    #[test]
    fn test_same_nonce_different_timestamp_is_replay() {
        let store = MemoryNonceStore::new(Duration::from_secs(300));
        assert!(store.try_record("key", "token", "n1", 100));
        assert!(!store.try_record("key", "token", "n1", 101));
    }

    #[test]
    fn test_nonce_scoped_by_consumer_and_token() {
        let store = MemoryNonceStore::new(Duration::from_secs(300));
        assert!(store.try_record("key", "token", "n1", 100));
        assert!(store.try_record("other", "token", "n1", 100));
        assert!(store.try_record("key", "", "n1", 100));
        assert!(store.try_record("key", "token2", "n1", 100));
    }

    #[test]
    fn test_retention_covers_both_window_edges() {
        let store = MemoryNonceStore::new(Duration::from_secs(300));
        assert_eq!(store.retention(), Duration::from_secs(601));
    }

    #[test]
    fn test_record_outlives_twice_window() {
        let store = MemoryNonceStore::new(Duration::from_secs(1));
        assert!(store.try_record("key", "token", "n1", 100));
        thread::sleep(Duration::from_millis(2050));
        assert!(!store.try_record("key", "token", "n1", 100));
    }

    #[test]
    fn test_records_expire() {
        let store = MemoryNonceStore::with_retention(Duration::from_millis(50));
        assert!(store.try_record("key", "token", "n1", 100));
        thread::sleep(Duration::from_millis(60));
        assert_eq!(store.active_count(), 0);
        assert!(store.try_record("key", "token", "n1", 100));
    }

    #[test]
    fn test_growth_is_bounded() {
        let store = MemoryNonceStore::with_retention(Duration::from_millis(20));
        for i in 0..CLEANUP_THRESHOLD {
            store.try_record("key", "", &format!("a{i}"), 100);
        }
        thread::sleep(Duration::from_millis(30));
        store.try_record("key", "", "trigger", 100);
        assert_eq!(store.lock().cache.len(), 1);
    }

    #[test]
    fn test_concurrent_same_tuple_records_once() {
        let store = Arc::new(MemoryNonceStore::new(Duration::from_secs(300)));

        for round in 0..50 {
            let nonce = format!("nonce-{round}");
            let barrier = Arc::new(Barrier::new(8));
            let handles: Vec<_> = (0..8)
                .map(|_| {
                    let store = store.clone();
                    let barrier = barrier.clone();
                    let nonce = nonce.clone();
                    thread::spawn(move || {
                        barrier.wait();
                        store.try_record("key", "token", &nonce, 100)
                    })
                })
                .collect();

            let recorded = handles
                .into_iter()
                .map(|h| h.join().unwrap())
                .filter(|recorded| *recorded)
                .count();
            assert_eq!(recorded, 1, "exactly one thread may record {nonce}");
        }
    }
}
