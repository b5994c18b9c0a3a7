//! TTL-stamped entry storage.
//!
//! Entries carry the time they were produced and their TTL; freshness is
//! computed on read and reads never touch the stored timestamp. Without a
//! configured capacity the store keeps every key it is given.

use std::num::NonZeroUsize;
use std::sync::{Arc, RwLock};
use std::time::Duration;

use lru::LruCache;

use super::clock::Clock;
use super::keys::CacheKey;
use super::lock::{read_guard, write_guard};

const SOURCE: &str = "cache::store";

struct Entry<V> {
    value: V,
    created_at_ms: u64,
    ttl_ms: u64,
}

impl<V> Entry<V> {
    fn age_ms(&self, now_ms: u64) -> u64 {
        now_ms.saturating_sub(self.created_at_ms)
    }
}

/// Result of a store lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Lookup<V> {
    pub value: V,
    pub fresh: bool,
    pub age_ms: u64,
}

pub struct CacheStore<V> {
    entries: RwLock<LruCache<CacheKey, Entry<V>>>,
    clock: Arc<dyn Clock>,
}

impl<V: Clone> CacheStore<V> {
    pub fn new(capacity: Option<NonZeroUsize>, clock: Arc<dyn Clock>) -> Self {
        let entries = match capacity {
            Some(capacity) => LruCache::new(capacity),
            None => LruCache::unbounded(),
        };
        Self {
            entries: RwLock::new(entries),
            clock,
        }
    }

    /// Look up `key` without altering recency or timestamps.
    pub fn get(&self, key: &CacheKey) -> Option<Lookup<V>> {
        let now_ms = self.clock.now_ms();
        let entries = read_guard(&self.entries, SOURCE, "get");
        entries.peek(key).map(|entry| {
            let age_ms = entry.age_ms(now_ms);
            Lookup {
                value: entry.value.clone(),
                fresh: age_ms < entry.ttl_ms,
                age_ms,
            }
        })
    }

    /// Store `value` under `key`, replacing whatever was there.
    ///
    /// Returns the key pushed out by the capacity bound, if any.
    pub fn put(&self, key: CacheKey, value: V, ttl: Duration) -> Option<CacheKey> {
        let entry = Entry {
            value,
            created_at_ms: self.clock.now_ms(),
            ttl_ms: u64::try_from(ttl.as_millis()).unwrap_or(u64::MAX),
        };
        let mut entries = write_guard(&self.entries, SOURCE, "put");
        let inserted = key.clone();
        entries
            .push(key, entry)
            .map(|(previous, _)| previous)
            .filter(|previous| *previous != inserted)
    }

    pub fn invalidate(&self, key: &CacheKey) -> bool {
        write_guard(&self.entries, SOURCE, "invalidate")
            .pop(key)
            .is_some()
    }

    /// Drop every entry, returning how many were removed.
    pub fn invalidate_all(&self) -> usize {
        let mut entries = write_guard(&self.entries, SOURCE, "invalidate_all");
        let removed = entries.len();
        entries.clear();
        removed
    }

    pub fn len(&self) -> usize {
        read_guard(&self.entries, SOURCE, "len").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use std::panic::{AssertUnwindSafe, catch_unwind};

    use super::*;
    use crate::cache::clock::ManualClock;
    use crate::cache::keys::Namespace;

    const TTL: Duration = Duration::from_millis(300_000);

    fn key(chapter: &str) -> CacheKey {
        CacheKey::builder(Namespace::ChapterCounts)
            .code("category", Some("gate"))
            .name("chapter", Some(chapter))
            .build()
    }

    fn store_with_clock(capacity: Option<usize>) -> (CacheStore<u32>, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::new(0));
        let store = CacheStore::new(capacity.and_then(NonZeroUsize::new), clock.clone());
        (store, clock)
    }

    #[test]
    fn put_then_get_is_fresh() {
        let (store, _clock) = store_with_clock(None);
        store.put(key("graphs"), 7, TTL);

        let lookup = store.get(&key("graphs")).expect("entry present");
        assert_eq!(lookup.value, 7);
        assert!(lookup.fresh);
    }

    #[test]
    fn freshness_boundary_is_exclusive() {
        let (store, clock) = store_with_clock(None);
        store.put(key("graphs"), 1, TTL);

        clock.set(299_999);
        assert!(store.get(&key("graphs")).expect("entry").fresh);

        clock.set(300_000);
        let stale = store.get(&key("graphs")).expect("stale entry still retrievable");
        assert!(!stale.fresh);
        assert_eq!(stale.age_ms, 300_000);
    }

    #[test]
    fn reads_do_not_refresh_timestamp() {
        let (store, clock) = store_with_clock(None);
        store.put(key("graphs"), 1, TTL);

        clock.set(200_000);
        assert!(store.get(&key("graphs")).expect("entry").fresh);
        clock.set(300_000);
        assert!(!store.get(&key("graphs")).expect("entry").fresh);
    }

    #[test]
    fn overwrite_restarts_the_ttl() {
        let (store, clock) = store_with_clock(None);
        store.put(key("graphs"), 1, TTL);
        clock.set(250_000);
        assert!(store.put(key("graphs"), 2, TTL).is_none());

        clock.set(400_000);
        let lookup = store.get(&key("graphs")).expect("entry");
        assert_eq!(lookup.value, 2);
        assert!(lookup.fresh);
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn invalidate_removes_single_key() {
        let (store, _clock) = store_with_clock(None);
        store.put(key("graphs"), 1, TTL);
        store.put(key("trees"), 2, TTL);

        assert!(store.invalidate(&key("graphs")));
        assert!(!store.invalidate(&key("graphs")));
        assert!(store.get(&key("graphs")).is_none());
        assert!(store.get(&key("trees")).is_some());
    }

    #[test]
    fn invalidate_all_reports_removed_count() {
        let (store, _clock) = store_with_clock(None);
        store.put(key("graphs"), 1, TTL);
        store.put(key("trees"), 2, TTL);

        assert_eq!(store.invalidate_all(), 2);
        assert!(store.is_empty());
        assert_eq!(store.invalidate_all(), 0);
    }

    #[test]
    fn bounded_store_evicts_least_recent() {
        let (store, _clock) = store_with_clock(Some(2));
        assert!(store.put(key("graphs"), 1, TTL).is_none());
        assert!(store.put(key("trees"), 2, TTL).is_none());

        let evicted = store.put(key("heaps"), 3, TTL);
        assert_eq!(evicted, Some(key("graphs")));
        assert!(store.get(&key("graphs")).is_none());
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn store_recovers_from_poisoned_lock() {
        let (store, _clock) = store_with_clock(None);

        let _ = catch_unwind(AssertUnwindSafe(|| {
            let _guard = store
                .entries
                .write()
                .expect("entries lock should be acquired");
            panic!("poison entries lock");
        }));

        store.put(key("graphs"), 1, TTL);
        assert!(store.get(&key("graphs")).is_some());
    }
}
