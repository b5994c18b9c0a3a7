//! Examprep aggregate cache.
//!
//! Expensive aggregate queries (difficulty counts, the subject → topic
//! catalogue, chapter listings) are served through [`ReadThroughCache`]:
//!
//! - **Store**: TTL-stamped entries, optionally bounded with LRU eviction
//! - **Coalescer**: at most one running computation per key
//! - **Invalidation**: by key, by tag through [`CacheTrigger`], or wholesale
//!
//! ## Configuration
//!
//! Cache behavior is controlled via the `[cache]` table of `examprep.toml`:
//!
//! ```toml
//! [cache]
//! enabled = true
//! chapter_counts_ttl_ms = 300000
//! # max_entries = 10000
//! # ... see config.rs for all options
//! ```

mod clock;
mod config;
mod error;
mod inflight;
mod keys;
mod lock;
mod read_through;
mod registry;
mod store;
mod trigger;

pub use clock::{Clock, ManualClock, SystemClock};
pub use config::CacheConfig;
pub use error::CacheError;
pub use keys::{CacheKey, CacheTag, KeyBuilder, Namespace, UNSPECIFIED};
pub use read_through::{
    METRIC_AGGREGATE_MS, METRIC_CACHE_COALESCED, METRIC_CACHE_EVICT, METRIC_CACHE_HIT,
    METRIC_CACHE_INVALIDATE, METRIC_CACHE_MISS, ReadThroughCache,
};
pub use registry::TagRegistry;
pub use store::{CacheStore, Lookup};
pub use trigger::{CacheTrigger, InvalidationListener};
