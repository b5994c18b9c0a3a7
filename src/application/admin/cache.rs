use std::sync::Arc;

use thiserror::Error;
use tracing::info;

use crate::cache::{CacheTag, CacheTrigger};

#[derive(Debug, Error)]
pub enum AdminCacheError {
    #[error("revalidation tag must not be empty")]
    EmptyTag,
}

/// Manual cache controls exposed to operators.
#[derive(Clone)]
pub struct AdminCacheService {
    trigger: Arc<CacheTrigger>,
}

impl AdminCacheService {
    pub fn new(trigger: Arc<CacheTrigger>) -> Self {
        Self { trigger }
    }

    pub fn revalidate(&self, raw_tag: &str) -> Result<(CacheTag, usize), AdminCacheError> {
        let tag = CacheTag::parse(raw_tag);
        if tag.is_empty() {
            return Err(AdminCacheError::EmptyTag);
        }
        let invalidated = self.trigger.revalidate_tag(&tag);
        info!(tag = %tag, invalidated, "Manual revalidation");
        Ok((tag, invalidated))
    }

    pub fn clear(&self) -> usize {
        let cleared = self.trigger.clear_all();
        info!(cleared, "Manual cache clear");
        cleared
    }
}
