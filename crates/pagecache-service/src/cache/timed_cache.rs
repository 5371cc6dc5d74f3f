//! Cache decorator that bounds every command with a deadline.

use super::KvCache;
use async_trait::async_trait;
use pagecache_core::PageCacheResult;
use pagecache_resilience::timeout::with_timeout;
use std::sync::Arc;
use std::time::Duration;

/// Wraps a [`KvCache`] so a stalled command fails with
/// [`PageCacheError::Timeout`](pagecache_core::PageCacheError::Timeout)
/// rather than hanging or being mistaken for a miss.
pub struct TimedKvCache {
    inner: Arc<dyn KvCache>,
    timeout: Duration,
}

impl TimedKvCache {
    /// Creates the decorator.
    #[must_use]
    pub fn new(inner: Arc<dyn KvCache>, timeout: Duration) -> Self {
        Self { inner, timeout }
    }
}

impl std::fmt::Debug for TimedKvCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TimedKvCache")
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl KvCache for TimedKvCache {
    async fn get_raw(&self, key: &str) -> PageCacheResult<Option<Vec<u8>>> {
        with_timeout(self.timeout, "cache get", || self.inner.get_raw(key)).await
    }

    async fn set_raw(&self, key: &str, value: &[u8], ttl: Duration) -> PageCacheResult<()> {
        with_timeout(self.timeout, "cache set", || self.inner.set_raw(key, value, ttl)).await
    }

    async fn delete(&self, key: &str) -> PageCacheResult<bool> {
        with_timeout(self.timeout, "cache delete", || self.inner.delete(key)).await
    }

    async fn delete_many(&self, keys: &[String]) -> PageCacheResult<u64> {
        with_timeout(self.timeout, "cache delete_many", || self.inner.delete_many(keys)).await
    }

    async fn exists(&self, key: &str) -> PageCacheResult<bool> {
        with_timeout(self.timeout, "cache exists", || self.inner.exists(key)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::MemoryKvCache;
    use pagecache_core::PageCacheError;

    #[tokio::test]
    async fn test_stalled_get_is_timeout_not_miss() {
        let inner = Arc::new(MemoryKvCache::new());
        inner.set_latency(Some(Duration::from_millis(200)));
        let cache = TimedKvCache::new(inner, Duration::from_millis(20));

        let err = cache.get_raw("box:1").await.unwrap_err();
        assert!(matches!(err, PageCacheError::Timeout(_)));
    }

    #[tokio::test]
    async fn test_fast_commands_pass_through() {
        let inner = Arc::new(MemoryKvCache::new());
        let cache = TimedKvCache::new(inner.clone(), Duration::from_secs(1));

        cache.set_raw("k", b"v", Duration::from_secs(60)).await.unwrap();
        assert_eq!(cache.get_raw("k").await.unwrap(), Some(b"v".to_vec()));
        assert_eq!(cache.get_raw("missing").await.unwrap(), None);
        assert_eq!(inner.calls().get, 2);
    }
}
