//! Bidirectional tag registry.
//!
//! Tracks which cache keys carry which invalidation tags, so a mutation can
//! revalidate every dependent key without knowing how those keys were built.

use std::collections::{HashMap, HashSet};
use std::sync::RwLock;

use super::keys::{CacheKey, CacheTag};
use super::lock::{read_guard, write_guard};

const SOURCE: &str = "cache::registry";

/// Tracks tag → cache_keys and cache_key → tags mappings.
///
/// Lock order is always `tag_to_keys` then `key_to_tags`.
pub struct TagRegistry {
    tag_to_keys: RwLock<HashMap<CacheTag, HashSet<CacheKey>>>,
    key_to_tags: RwLock<HashMap<CacheKey, HashSet<CacheTag>>>,
}

impl TagRegistry {
    pub fn new() -> Self {
        Self {
            tag_to_keys: RwLock::new(HashMap::new()),
            key_to_tags: RwLock::new(HashMap::new()),
        }
    }

    /// Attach `tags` to `cache_key`. Registering again merges the tag sets.
    pub fn register(&self, cache_key: &CacheKey, tags: &[CacheTag]) {
        if tags.is_empty() {
            return;
        }
        let mut t2k = write_guard(&self.tag_to_keys, SOURCE, "register");
        let mut k2t = write_guard(&self.key_to_tags, SOURCE, "register");

        for tag in tags {
            t2k.entry(tag.clone())
                .or_default()
                .insert(cache_key.clone());
        }
        k2t.entry(cache_key.clone())
            .or_default()
            .extend(tags.iter().cloned());
    }

    pub fn keys_for_tag(&self, tag: &CacheTag) -> HashSet<CacheKey> {
        read_guard(&self.tag_to_keys, SOURCE, "keys_for_tag")
            .get(tag)
            .cloned()
            .unwrap_or_default()
    }

    pub fn tags_for_key(&self, cache_key: &CacheKey) -> HashSet<CacheTag> {
        read_guard(&self.key_to_tags, SOURCE, "tags_for_key")
            .get(cache_key)
            .cloned()
            .unwrap_or_default()
    }

    /// Remove a cache key and clean up its tag mappings.
    ///
    /// Called when the store evicts the key.
    pub fn unregister(&self, cache_key: &CacheKey) {
        let mut t2k = write_guard(&self.tag_to_keys, SOURCE, "unregister");
        let mut k2t = write_guard(&self.key_to_tags, SOURCE, "unregister");

        if let Some(tags) = k2t.remove(cache_key) {
            for tag in tags {
                if let Some(keys) = t2k.get_mut(&tag) {
                    keys.remove(cache_key);
                    if keys.is_empty() {
                        t2k.remove(&tag);
                    }
                }
            }
        }
    }

    /// Remove all mappings for a tag, returning the keys that carried it.
    pub fn unregister_tag(&self, tag: &CacheTag) -> HashSet<CacheKey> {
        let mut t2k = write_guard(&self.tag_to_keys, SOURCE, "unregister_tag");
        let mut k2t = write_guard(&self.key_to_tags, SOURCE, "unregister_tag");

        let affected_keys = t2k.remove(tag).unwrap_or_default();

        for cache_key in &affected_keys {
            if let Some(tags) = k2t.get_mut(cache_key) {
                tags.remove(tag);
                if tags.is_empty() {
                    k2t.remove(cache_key);
                }
            }
        }

        affected_keys
    }

    pub fn clear(&self) {
        write_guard(&self.tag_to_keys, SOURCE, "clear").clear();
        write_guard(&self.key_to_tags, SOURCE, "clear").clear();
    }

    pub fn tag_count(&self) -> usize {
        read_guard(&self.tag_to_keys, SOURCE, "tag_count").len()
    }

    pub fn key_count(&self) -> usize {
        read_guard(&self.key_to_tags, SOURCE, "key_count").len()
    }
}

impl Default for TagRegistry {
    fn default() -> Self {
        Self::new()
    }
}
