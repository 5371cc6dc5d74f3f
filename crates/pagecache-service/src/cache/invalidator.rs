//! Explicit, best-effort cache invalidation.

use super::KvCache;
use std::sync::Arc;
use tracing::{debug, warn};

/// Deletes cache keys after a committed write.
///
/// Failures are logged and swallowed. A key that survives a failed delete
/// lives until its TTL expires.
#[derive(Clone)]
pub struct CacheInvalidator {
    cache: Arc<dyn KvCache>,
}

impl CacheInvalidator {
    /// Creates an invalidator over `cache`.
    #[must_use]
    pub fn new(cache: Arc<dyn KvCache>) -> Self {
        Self { cache }
    }

    /// Removes one key.
    pub async fn delete(&self, key: &str) {
        match self.cache.delete(key).await {
            Ok(existed) => debug!(key, existed, "Invalidated cache key"),
            Err(e) => warn!(key, error = %e, "Failed to invalidate cache key"),
        }
    }

    /// Removes several keys in one round trip.
    pub async fn delete_in_batch(&self, keys: &[String]) {
        if keys.is_empty() {
            return;
        }
        match self.cache.delete_many(keys).await {
            Ok(deleted) => debug!(?keys, deleted, "Invalidated cache keys"),
            Err(e) => warn!(?keys, error = %e, "Failed to invalidate cache keys"),
        }
    }
}

impl std::fmt::Debug for CacheInvalidator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CacheInvalidator").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::MemoryKvCache;
    use std::time::Duration;

    #[tokio::test]
    async fn test_delete_in_batch_removes_all_keys() {
        let cache = Arc::new(MemoryKvCache::new());
        for key in ["boxes:id_asc:latest", "boxes:3:id_asc:latest", "box:1"] {
            cache.set_raw(key, b"x", Duration::from_secs(60)).await.unwrap();
        }
        let invalidator = CacheInvalidator::new(cache.clone());

        invalidator
            .delete_in_batch(&["boxes:id_asc:latest".to_string(), "boxes:3:id_asc:latest".to_string()])
            .await;

        assert_eq!(cache.keys_with_prefix(""), vec!["box:1".to_string()]);
        assert_eq!(cache.calls().delete_many, 1);
    }

    #[tokio::test]
    async fn test_failures_are_swallowed() {
        let cache = Arc::new(MemoryKvCache::new());
        cache.set_failing(true);
        let invalidator = CacheInvalidator::new(cache.clone());

        invalidator.delete("box:1").await;
        invalidator.delete_in_batch(&["a".to_string()]).await;

        assert_eq!(cache.calls().delete, 1);
        assert_eq!(cache.calls().delete_many, 1);
    }

    #[tokio::test]
    async fn test_empty_batch_issues_no_command() {
        let cache = Arc::new(MemoryKvCache::new());
        CacheInvalidator::new(cache.clone()).delete_in_batch(&[]).await;
        assert_eq!(cache.calls(), Default::default());
    }
}
