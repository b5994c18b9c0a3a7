//! Read-through aggregate cache.
//!
//! A lookup is served from the store while fresh. On a miss or a stale entry
//! the caller joins the running computation for the key, or starts one on a
//! spawned task. The task stores a successful value before the key's marker
//! is removed, so every caller coalesced onto one computation sees the same
//! result and later callers see the stored value. Failures are never stored.

use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::{Duration, Instant};

use futures::FutureExt;
use metrics::{counter, histogram};
use tracing::{debug, info, warn};

use super::clock::Clock;
use super::config::CacheConfig;
use super::error::CacheError;
use super::inflight::{Claim, InFlightRegistry, SharedComputation};
use super::keys::{CacheKey, CacheTag};
use super::registry::TagRegistry;
use super::store::{CacheStore, Lookup};
use super::trigger::InvalidationListener;

pub const METRIC_CACHE_HIT: &str = "examprep_cache_hit_total";
pub const METRIC_CACHE_MISS: &str = "examprep_cache_miss_total";
pub const METRIC_CACHE_COALESCED: &str = "examprep_cache_coalesced_total";
pub const METRIC_CACHE_INVALIDATE: &str = "examprep_cache_invalidate_total";
pub const METRIC_CACHE_EVICT: &str = "examprep_cache_evict_total";
pub const METRIC_AGGREGATE_MS: &str = "examprep_aggregate_ms";

struct Inner<V> {
    name: &'static str,
    enabled: bool,
    store: CacheStore<V>,
    inflight: InFlightRegistry<V>,
    tags: TagRegistry,
}

/// Named, cloneable handle to one aggregate cache.
pub struct ReadThroughCache<V> {
    inner: Arc<Inner<V>>,
}

impl<V> Clone for ReadThroughCache<V> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<V> ReadThroughCache<V>
where
    V: Clone + Send + Sync + 'static,
{
    pub fn new(name: &'static str, config: &CacheConfig, clock: Arc<dyn Clock>) -> Self {
        Self {
            inner: Arc::new(Inner {
                name,
                enabled: config.enabled,
                store: CacheStore::new(config.capacity(), clock),
                inflight: InFlightRegistry::new(),
                tags: TagRegistry::new(),
            }),
        }
    }

    pub fn name(&self) -> &'static str {
        self.inner.name
    }

    pub fn is_enabled(&self) -> bool {
        self.inner.enabled
    }

    /// Return the value for `key`, computing it at most once across
    /// concurrent callers.
    ///
    /// `tags` are attached to the key for later [`invalidate_tag`] calls.
    /// The computation runs to completion even if every caller stops
    /// waiting; a panic inside it surfaces as [`CacheError::Aborted`].
    ///
    /// [`invalidate_tag`]: Self::invalidate_tag
    pub async fn get_or_compute<F, Fut>(
        &self,
        key: CacheKey,
        ttl: Duration,
        tags: &[CacheTag],
        compute: F,
    ) -> Result<V, CacheError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<V, CacheError>> + Send + 'static,
    {
        if !self.inner.enabled {
            return compute().await;
        }

        if let Some(hit) = self.fresh(&key) {
            self.record_hit(&key);
            return Ok(hit);
        }

        let claim = self.inner.inflight.claim(
            &key,
            || self.fresh(&key),
            |generation| {
                self.inner.tags.register(&key, tags);
                self.spawn_computation(key.clone(), generation, ttl, tags.to_vec(), compute())
            },
        );

        match claim {
            Claim::Hit(value) => {
                self.record_hit(&key);
                Ok(value)
            }
            Claim::Joined(computation) => {
                counter!(METRIC_CACHE_COALESCED, "cache" => self.inner.name).increment(1);
                debug!(cache = self.inner.name, key = %key, "Joined in-flight aggregate");
                computation.await
            }
            Claim::Started(computation) => {
                counter!(METRIC_CACHE_MISS, "cache" => self.inner.name).increment(1);
                debug!(cache = self.inner.name, key = %key, "Cache miss; aggregating");
                computation.await
            }
        }
    }

    /// Stored entry for `key`, fresh or not. Never triggers a computation.
    pub fn peek(&self, key: &CacheKey) -> Option<Lookup<V>> {
        self.inner.store.get(key)
    }

    /// Store `value` directly, bypassing the coalescer.
    pub fn put(&self, key: CacheKey, value: V, ttl: Duration, tags: &[CacheTag]) {
        self.inner.tags.register(&key, tags);
        self.inner.store_value(key, value, ttl);
    }

    /// Drop `key` and detach any computation running for it.
    ///
    /// A detached computation still answers the callers already waiting on
    /// it, but its value is not stored. Returns whether anything was removed.
    pub fn invalidate(&self, key: &CacheKey) -> bool {
        let detached = self.inner.inflight.detach(key);
        let removed = self.inner.store.invalidate(key);
        if detached || removed {
            counter!(METRIC_CACHE_INVALIDATE, "cache" => self.inner.name).increment(1);
            info!(
                cache = self.inner.name,
                key = %key,
                detached,
                removed,
                "Invalidated cache key"
            );
        }
        detached || removed
    }

    /// Invalidate every key carrying `tag`, returning how many were affected.
    pub fn invalidate_tag(&self, tag: &CacheTag) -> usize {
        let keys = self.inner.tags.unregister_tag(tag);
        let affected = keys.iter().filter(|key| self.invalidate(key)).count();
        if affected > 0 {
            info!(cache = self.inner.name, tag = %tag, affected, "Revalidated cache tag");
        }
        affected
    }

    /// Drop every entry and detach every running computation.
    pub fn invalidate_all(&self) -> usize {
        let detached = self.inner.inflight.detach_all();
        let removed = self.inner.store.invalidate_all();
        self.inner.tags.clear();
        let affected = removed.max(detached);
        if affected > 0 {
            counter!(METRIC_CACHE_INVALIDATE, "cache" => self.inner.name)
                .increment(affected as u64);
            info!(cache = self.inner.name, removed, detached, "Cleared cache");
        }
        affected
    }

    pub fn len(&self) -> usize {
        self.inner.store.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.store.is_empty()
    }

    pub fn in_flight(&self) -> usize {
        self.inner.inflight.len()
    }

    fn fresh(&self, key: &CacheKey) -> Option<V> {
        self.inner
            .store
            .get(key)
            .filter(|lookup| lookup.fresh)
            .map(|lookup| lookup.value)
    }

    fn record_hit(&self, key: &CacheKey) {
        counter!(METRIC_CACHE_HIT, "cache" => self.inner.name).increment(1);
        debug!(cache = self.inner.name, key = %key, "Cache hit");
    }

    fn spawn_computation<Fut>(
        &self,
        key: CacheKey,
        generation: u64,
        ttl: Duration,
        tags: Vec<CacheTag>,
        future: Fut,
    ) -> SharedComputation<V>
    where
        Fut: Future<Output = Result<V, CacheError>> + Send + 'static,
    {
        let inner = Arc::clone(&self.inner);
        let task = tokio::spawn(async move {
            let started_at = Instant::now();
            let result = match AssertUnwindSafe(future).catch_unwind().await {
                Ok(result) => result,
                Err(_) => Err(CacheError::aborted("aggregate computation panicked")),
            };
            histogram!(METRIC_AGGREGATE_MS, "cache" => inner.name)
                .record(started_at.elapsed().as_secs_f64() * 1000.0);
            inner.settle(&key, generation, ttl, &tags, &result);
            result
        });

        async move {
            task.await
                .unwrap_or_else(|err| Err(CacheError::aborted(err.to_string())))
        }
        .boxed()
        .shared()
    }
}

impl<V> Inner<V>
where
    V: Clone + Send + Sync + 'static,
{
    fn settle(
        &self,
        key: &CacheKey,
        generation: u64,
        ttl: Duration,
        tags: &[CacheTag],
        result: &Result<V, CacheError>,
    ) {
        let current = self.inflight.settle(key, generation, || {
            if let Ok(value) = result {
                self.tags.register(key, tags);
                self.store_value(key.clone(), value.clone(), ttl);
            }
        });

        match result {
            Ok(_) if current => {
                debug!(cache = self.name, key = %key, "Stored aggregate");
            }
            Ok(_) => {
                debug!(
                    cache = self.name,
                    key = %key,
                    "Discarded aggregate invalidated while computing"
                );
            }
            Err(err) => {
                warn!(
                    cache = self.name,
                    key = %key,
                    error = %err,
                    "Aggregate computation failed; nothing cached"
                );
            }
        }
    }

    fn store_value(&self, key: CacheKey, value: V, ttl: Duration) {
        if let Some(evicted) = self.store.put(key, value, ttl) {
            self.tags.unregister(&evicted);
            counter!(METRIC_CACHE_EVICT, "cache" => self.name).increment(1);
            debug!(cache = self.name, key = %evicted, "Evicted least recently stored key");
        }
    }
}

impl<V> InvalidationListener for ReadThroughCache<V>
where
    V: Clone + Send + Sync + 'static,
{
    fn name(&self) -> &'static str {
        self.inner.name
    }

    fn on_invalidate(&self, tag: &CacheTag) -> usize {
        self.invalidate_tag(tag)
    }

    fn on_invalidate_all(&self) -> usize {
        self.invalidate_all()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use tokio::sync::oneshot;

    use super::*;
    use crate::cache::clock::ManualClock;
    use crate::cache::keys::Namespace;

    const TTL: Duration = Duration::from_millis(300_000);

    fn counts_key(chapter: &str) -> CacheKey {
        CacheKey::builder(Namespace::ChapterCounts)
            .code("category", Some("gate"))
            .name("chapter", Some(chapter))
            .build()
    }

    fn cache_with_clock(config: CacheConfig) -> (ReadThroughCache<u32>, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::new(0));
        (ReadThroughCache::new("test", &config, clock.clone()), clock)
    }

    #[tokio::test]
    async fn fresh_hit_skips_compute() {
        let (cache, _clock) = cache_with_clock(CacheConfig::default());
        let key = counts_key("graphs");

        let first = cache
            .get_or_compute(key.clone(), TTL, &[], || async { Ok(1) })
            .await
            .expect("first compute");
        let second = cache
            .get_or_compute(key, TTL, &[], || async { Ok(2) })
            .await
            .expect("cached value");

        assert_eq!((first, second), (1, 1));
    }

    #[tokio::test]
    async fn stale_entry_is_recomputed() {
        let (cache, clock) = cache_with_clock(CacheConfig::default());
        let key = counts_key("graphs");

        cache
            .get_or_compute(key.clone(), TTL, &[], || async { Ok(1) })
            .await
            .expect("first compute");
        clock.advance(300_000);

        let value = cache
            .get_or_compute(key.clone(), TTL, &[], || async { Ok(2) })
            .await
            .expect("recompute");
        assert_eq!(value, 2);
        assert_eq!(cache.peek(&key).map(|lookup| lookup.fresh), Some(true));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_callers_share_one_computation() {
        let (cache, _clock) = cache_with_clock(CacheConfig::default());
        let calls = Arc::new(AtomicUsize::new(0));
        let (release_tx, release_rx) = oneshot::channel::<()>();
        let release_rx = Arc::new(tokio::sync::Mutex::new(Some(release_rx)));

        let mut handles = Vec::new();
        for _ in 0..10 {
            let cache = cache.clone();
            let calls = calls.clone();
            let release_rx = release_rx.clone();
            handles.push(tokio::spawn(async move {
                cache
                    .get_or_compute(counts_key("graphs"), TTL, &[], move || async move {
                        calls.fetch_add(1, Ordering::SeqCst);
                        if let Some(rx) = release_rx.lock().await.take() {
                            let _ = rx.await;
                        }
                        Ok(42)
                    })
                    .await
            }));
        }

        while cache.in_flight() == 0 {
            tokio::task::yield_now().await;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
        release_tx.send(()).expect("computation still waiting");

        for handle in handles {
            assert_eq!(handle.await.expect("task joined"), Ok(42));
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(cache.in_flight(), 0);
    }

    #[tokio::test]
    async fn failures_are_not_cached() {
        let (cache, _clock) = cache_with_clock(CacheConfig::default());
        let key = counts_key("graphs");

        let err = cache
            .get_or_compute(key.clone(), TTL, &[], || async {
                Err(CacheError::upstream("store offline"))
            })
            .await
            .expect_err("failure propagates");
        assert_eq!(err, CacheError::upstream("store offline"));
        assert!(cache.peek(&key).is_none());
        assert_eq!(cache.in_flight(), 0);

        let value = cache
            .get_or_compute(key, TTL, &[], || async { Ok(5) })
            .await
            .expect("retry succeeds");
        assert_eq!(value, 5);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_callers_share_one_failure() {
        let (cache, _clock) = cache_with_clock(CacheConfig::default());
        let calls = Arc::new(AtomicUsize::new(0));
        let (release_tx, release_rx) = oneshot::channel::<()>();
        let release_rx = Arc::new(tokio::sync::Mutex::new(Some(release_rx)));

        let mut handles = Vec::new();
        for _ in 0..8 {
            let cache = cache.clone();
            let calls = calls.clone();
            let release_rx = release_rx.clone();
            handles.push(tokio::spawn(async move {
                cache
                    .get_or_compute(counts_key("graphs"), TTL, &[], move || async move {
                        calls.fetch_add(1, Ordering::SeqCst);
                        if let Some(rx) = release_rx.lock().await.take() {
                            let _ = rx.await;
                        }
                        Err::<u32, _>(CacheError::upstream("store offline"))
                    })
                    .await
            }));
        }

        while cache.in_flight() == 0 {
            tokio::task::yield_now().await;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
        release_tx.send(()).expect("computation still waiting");

        for handle in handles {
            assert_eq!(
                handle.await.expect("task joined"),
                Err(CacheError::upstream("store offline"))
            );
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(cache.in_flight(), 0);
        assert!(cache.peek(&counts_key("graphs")).is_none());

        let value = cache
            .get_or_compute(counts_key("graphs"), TTL, &[], || async { Ok(7) })
            .await
            .expect("retry after shared failure");
        assert_eq!(value, 7);
    }

    #[tokio::test]
    async fn panicking_computation_reports_aborted() {
        let (cache, _clock) = cache_with_clock(CacheConfig::default());
        let key = counts_key("graphs");

        let err = cache
            .get_or_compute(key.clone(), TTL, &[], || async {
                if std::hint::black_box(true) {
                    panic!("aggregate blew up");
                }
                Ok(0)
            })
            .await
            .expect_err("panic surfaces as error");
        assert!(matches!(err, CacheError::Aborted { .. }));
        assert_eq!(cache.in_flight(), 0);
        assert!(cache.peek(&key).is_none());
    }

    #[tokio::test]
    async fn invalidation_during_compute_discards_value() {
        let (cache, _clock) = cache_with_clock(CacheConfig::default());
        let key = counts_key("graphs");
        let (started_tx, started_rx) = oneshot::channel::<()>();
        let (release_tx, release_rx) = oneshot::channel::<()>();

        let waiter = {
            let cache = cache.clone();
            let key = key.clone();
            tokio::spawn(async move {
                cache
                    .get_or_compute(key, TTL, &[], move || async move {
                        let _ = started_tx.send(());
                        let _ = release_rx.await;
                        Ok(1)
                    })
                    .await
            })
        };

        started_rx.await.expect("computation started");
        assert!(cache.invalidate(&key));
        release_tx.send(()).expect("computation waiting");

        assert_eq!(waiter.await.expect("waiter joined"), Ok(1));
        assert!(cache.peek(&key).is_none());
    }

    #[tokio::test]
    async fn invalidate_tag_removes_tagged_keys_only() {
        let (cache, _clock) = cache_with_clock(CacheConfig::default());
        let graphs = counts_key("graphs");
        let trees = counts_key("trees");

        cache
            .get_or_compute(graphs.clone(), TTL, &[CacheTag::chapter("gate", "graphs")], || async {
                Ok(1)
            })
            .await
            .expect("graphs");
        cache
            .get_or_compute(trees.clone(), TTL, &[CacheTag::chapter("gate", "trees")], || async {
                Ok(2)
            })
            .await
            .expect("trees");

        assert_eq!(cache.invalidate_tag(&CacheTag::chapter("gate", "Graphs")), 1);
        assert!(cache.peek(&graphs).is_none());
        assert!(cache.peek(&trees).is_some());
        assert_eq!(cache.invalidate_tag(&CacheTag::chapter("gate", "graphs")), 0);
    }

    #[tokio::test]
    async fn invalidate_is_idempotent() {
        let (cache, _clock) = cache_with_clock(CacheConfig::default());
        let key = counts_key("graphs");
        assert!(!cache.invalidate(&key));

        cache.put(key.clone(), 3, TTL, &[]);
        assert!(cache.invalidate(&key));
        assert!(!cache.invalidate(&key));
        assert_eq!(cache.invalidate_all(), 0);
    }

    #[tokio::test]
    async fn disabled_cache_always_computes() {
        let config = CacheConfig {
            enabled: false,
            ..CacheConfig::default()
        };
        let (cache, _clock) = cache_with_clock(config);
        let calls = AtomicUsize::new(0);

        for _ in 0..3 {
            cache
                .get_or_compute(counts_key("graphs"), TTL, &[], || {
                    calls.fetch_add(1, Ordering::SeqCst);
                    async { Ok(1) }
                })
                .await
                .expect("compute");
        }

        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert!(cache.is_empty());
    }

    #[tokio::test]
    async fn eviction_forgets_tags_of_evicted_key() {
        let config = CacheConfig {
            max_entries: Some(1),
            ..CacheConfig::default()
        };
        let (cache, _clock) = cache_with_clock(config);
        let tag = CacheTag::category("gate");

        cache.put(counts_key("graphs"), 1, TTL, &[tag.clone()]);
        cache.put(counts_key("trees"), 2, TTL, &[tag.clone()]);

        assert_eq!(cache.len(), 1);
        assert_eq!(cache.invalidate_tag(&tag), 1);
        assert!(cache.is_empty());
    }
}
