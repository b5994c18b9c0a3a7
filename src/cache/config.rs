//! Cache configuration.
//!
//! Controls the aggregate caches via the `[cache]` table of `examprep.toml`.

use std::num::NonZeroUsize;
use std::time::Duration;

use serde::Deserialize;

const DEFAULT_CHAPTER_COUNTS_TTL_MS: u64 = 300_000;
const DEFAULT_CHAPTER_QUESTIONS_TTL_MS: u64 = 60_000;
const DEFAULT_SUBTOPICS_TTL_MS: u64 = 300_000;
const DEFAULT_CHAPTERS_TTL_MS: u64 = 10_000;
const DEFAULT_AGGREGATE_PAGE_SIZE: usize = 1000;

/// Cache configuration from `examprep.toml`.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Serve aggregates through the read-through caches.
    pub enabled: bool,
    /// Upper bound on entries per cache; `None` keeps every key.
    pub max_entries: Option<usize>,
    /// TTL (ms) for chapter difficulty counts.
    pub chapter_counts_ttl_ms: u64,
    /// TTL (ms) for paged chapter question listings.
    pub chapter_questions_ttl_ms: u64,
    /// TTL (ms) for the subject → topic catalogue.
    pub subtopics_ttl_ms: u64,
    /// TTL (ms) for the per-category chapter list.
    pub chapters_ttl_ms: u64,
    /// Rows requested per page while aggregating.
    pub aggregate_page_size: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_entries: None,
            chapter_counts_ttl_ms: DEFAULT_CHAPTER_COUNTS_TTL_MS,
            chapter_questions_ttl_ms: DEFAULT_CHAPTER_QUESTIONS_TTL_MS,
            subtopics_ttl_ms: DEFAULT_SUBTOPICS_TTL_MS,
            chapters_ttl_ms: DEFAULT_CHAPTERS_TTL_MS,
            aggregate_page_size: DEFAULT_AGGREGATE_PAGE_SIZE,
        }
    }
}

impl From<&crate::config::CacheSettings> for CacheConfig {
    fn from(settings: &crate::config::CacheSettings) -> Self {
        Self {
            enabled: settings.enabled,
            max_entries: settings.max_entries.map(NonZeroUsize::get),
            chapter_counts_ttl_ms: millis(settings.chapter_counts_ttl),
            chapter_questions_ttl_ms: millis(settings.chapter_questions_ttl),
            subtopics_ttl_ms: millis(settings.subtopics_ttl),
            chapters_ttl_ms: millis(settings.chapters_ttl),
            aggregate_page_size: settings.aggregate_page_size.get(),
        }
    }
}

// Saturates instead of truncating durations beyond u64 milliseconds.
fn millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

impl CacheConfig {
    /// Entry bound as `NonZeroUsize`; a configured zero means unbounded.
    pub fn capacity(&self) -> Option<NonZeroUsize> {
        self.max_entries.and_then(NonZeroUsize::new)
    }

    /// Page size, clamped to at least one row.
    pub fn page_size(&self) -> usize {
        self.aggregate_page_size.max(1)
    }

    pub fn chapter_counts_ttl(&self) -> Duration {
        Duration::from_millis(self.chapter_counts_ttl_ms)
    }

    pub fn chapter_questions_ttl(&self) -> Duration {
        Duration::from_millis(self.chapter_questions_ttl_ms)
    }

    pub fn subtopics_ttl(&self) -> Duration {
        Duration::from_millis(self.subtopics_ttl_ms)
    }

    pub fn chapters_ttl(&self) -> Duration {
        Duration::from_millis(self.chapters_ttl_ms)
    }
}
