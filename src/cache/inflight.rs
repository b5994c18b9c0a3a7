//! Per-key registry of running aggregate computations.
//!
//! At most one marker exists per key. Claiming a key is a single
//! check-then-insert under the map's shard lock, so two callers that miss the
//! store at the same instant cannot both start a computation.

use std::sync::atomic::{AtomicU64, Ordering};

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use futures::future::{BoxFuture, Shared};

use super::error::CacheError;
use super::keys::CacheKey;

/// A computation every coalesced caller can await; all see the same result.
pub type SharedComputation<V> = Shared<BoxFuture<'static, Result<V, CacheError>>>;

struct Marker<V> {
    generation: u64,
    computation: SharedComputation<V>,
}

/// Outcome of [`InFlightRegistry::claim`].
pub enum Claim<V> {
    /// The store turned fresh while the claim was being made.
    Hit(V),
    /// Another caller already started the computation.
    Joined(SharedComputation<V>),
    /// This caller registered a new computation.
    Started(SharedComputation<V>),
}

pub struct InFlightRegistry<V> {
    markers: DashMap<CacheKey, Marker<V>>,
    next_generation: AtomicU64,
}

impl<V> InFlightRegistry<V>
where
    V: Clone + Send + Sync + 'static,
{
    pub fn new() -> Self {
        Self {
            markers: DashMap::new(),
            next_generation: AtomicU64::new(0),
        }
    }

    /// Join the running computation for `key`, or start one.
    ///
    /// `recheck` runs first while the key's shard is locked; `start` receives
    /// the generation of the new marker and must not block.
    pub fn claim<R, S>(&self, key: &CacheKey, recheck: R, start: S) -> Claim<V>
    where
        R: FnOnce() -> Option<V>,
        S: FnOnce(u64) -> SharedComputation<V>,
    {
        match self.markers.entry(key.clone()) {
            Entry::Occupied(occupied) => Claim::Joined(occupied.get().computation.clone()),
            Entry::Vacant(vacant) => {
                if let Some(value) = recheck() {
                    return Claim::Hit(value);
                }
                let generation = self.next_generation.fetch_add(1, Ordering::Relaxed);
                let computation = start(generation);
                vacant.insert(Marker {
                    generation,
                    computation: computation.clone(),
                });
                Claim::Started(computation)
            }
        }
    }

    /// Remove the marker for `key` if it still belongs to `generation`.
    ///
    /// `on_current` runs before removal while the marker is held, so a reader
    /// never finds the key both unmarked and not yet stored. Returns false
    /// when the marker was detached by an invalidation in the meantime.
    pub fn settle<F>(&self, key: &CacheKey, generation: u64, on_current: F) -> bool
    where
        F: FnOnce(),
    {
        match self.markers.entry(key.clone()) {
            Entry::Occupied(occupied) if occupied.get().generation == generation => {
                on_current();
                occupied.remove();
                true
            }
            _ => false,
        }
    }

    /// Forget the running computation for `key`; its result will not be stored.
    pub fn detach(&self, key: &CacheKey) -> bool {
        self.markers.remove(key).is_some()
    }

    pub fn detach_all(&self) -> usize {
        let detached = self.markers.len();
        self.markers.clear();
        detached
    }

    pub fn contains(&self, key: &CacheKey) -> bool {
        self.markers.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.markers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.markers.is_empty()
    }
}

impl<V> Default for InFlightRegistry<V>
where
    V: Clone + Send + Sync + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}
