//! Cache trigger service.
//!
//! Write paths call into the trigger after a successful mutation; the
//! trigger fans the invalidation out to every subscribed cache.

use std::sync::{Arc, RwLock};

use tracing::{debug, info};

use super::keys::CacheTag;
use super::lock::{read_guard, write_guard};

const SOURCE: &str = "cache::trigger";

/// Something that holds cached values derived from tagged data.
pub trait InvalidationListener: Send + Sync {
    fn name(&self) -> &'static str;

    /// Drop every entry carrying `tag`; returns how many were affected.
    fn on_invalidate(&self, tag: &CacheTag) -> usize;

    fn on_invalidate_all(&self) -> usize;
}

/// Broadcast point for cache invalidation.
///
/// # Usage
///
/// ```ignore
/// // After a question was inserted:
/// trigger.questions_changed(&question.category, &question.chapter);
/// ```
#[derive(Default)]
pub struct CacheTrigger {
    listeners: RwLock<Vec<Arc<dyn InvalidationListener>>>,
}

impl CacheTrigger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&self, listener: Arc<dyn InvalidationListener>) {
        debug!(listener = listener.name(), "Cache listener subscribed");
        write_guard(&self.listeners, SOURCE, "subscribe").push(listener);
    }

    pub fn listener_count(&self) -> usize {
        read_guard(&self.listeners, SOURCE, "listener_count").len()
    }

    /// Invalidate `tag` in every listener. Empty tags are ignored.
    pub fn revalidate_tag(&self, tag: &CacheTag) -> usize {
        if tag.is_empty() {
            debug!("Ignoring empty revalidation tag");
            return 0;
        }
        let invalidated = self
            .snapshot()
            .iter()
            .map(|listener| listener.on_invalidate(tag))
            .sum();
        info!(tag = %tag, invalidated, "Revalidated tag");
        invalidated
    }

    /// Drop everything from every listener.
    pub fn clear_all(&self) -> usize {
        let cleared = self
            .snapshot()
            .iter()
            .map(|listener| listener.on_invalidate_all())
            .sum();
        info!(cleared, "Cleared all caches");
        cleared
    }

    /// A question was written to `chapter` of `category`.
    ///
    /// Revalidates the chapter's aggregates and the category-wide listings,
    /// returning the tags that were fanned out.
    pub fn questions_changed(&self, category: &str, chapter: &str) -> Vec<CacheTag> {
        let tags = vec![
            CacheTag::chapter(category, chapter),
            CacheTag::catalog(category),
        ];
        for tag in &tags {
            self.revalidate_tag(tag);
        }
        tags
    }

    // Listeners are called outside the lock so they may subscribe or revalidate.
    fn snapshot(&self) -> Vec<Arc<dyn InvalidationListener>> {
        read_guard(&self.listeners, SOURCE, "snapshot").clone()
    }
}
