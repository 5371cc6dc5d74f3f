//! Store decorator that bounds every query with a deadline.

use crate::traits::EntityStore;
use async_trait::async_trait;
use pagecache_core::{ListQuery, Model, PageCacheResult};
use pagecache_resilience::timeout::with_timeout;
use std::sync::Arc;
use std::time::Duration;

/// Wraps an [`EntityStore`] so each call fails with
/// [`PageCacheError::Timeout`](pagecache_core::PageCacheError::Timeout)
/// once `timeout` elapses.
pub struct TimedEntityStore<T> {
    inner: Arc<dyn EntityStore<T>>,
    timeout: Duration,
}

impl<T: Model> TimedEntityStore<T> {
    /// Creates the decorator.
    #[must_use]
    pub fn new(inner: Arc<dyn EntityStore<T>>, timeout: Duration) -> Self {
        Self { inner, timeout }
    }
}

impl<T> std::fmt::Debug for TimedEntityStore<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TimedEntityStore")
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl<T: Model> EntityStore<T> for TimedEntityStore<T> {
    async fn find_by_id(&self, id: i64) -> PageCacheResult<Option<T>> {
        with_timeout(self.timeout, "store find_by_id", || self.inner.find_by_id(id)).await
    }

    async fn find_by_ids(&self, ids: &[i64]) -> PageCacheResult<Vec<T>> {
        with_timeout(self.timeout, "store find_by_ids", || self.inner.find_by_ids(ids)).await
    }

    async fn pluck_ids(&self, query: &ListQuery) -> PageCacheResult<Vec<i64>> {
        with_timeout(self.timeout, "store pluck_ids", || self.inner.pluck_ids(query)).await
    }

    async fn first_or_create(&self, entity: &T) -> PageCacheResult<T> {
        with_timeout(self.timeout, "store first_or_create", || {
            self.inner.first_or_create(entity)
        })
        .await
    }

    async fn update_columns(&self, entity: &T, columns: &[&str]) -> PageCacheResult<()> {
        with_timeout(self.timeout, "store update_columns", || {
            self.inner.update_columns(entity, columns)
        })
        .await
    }

    async fn delete(&self, entity: &T) -> PageCacheResult<bool> {
        with_timeout(self.timeout, "store delete", || self.inner.delete(entity)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::MemoryEntityStore;
    use pagecache_core::PageCacheError;
    use serde::{Deserialize, Serialize};

    #[derive(Debug, Clone, Serialize, Deserialize)]
    struct Item {
        id: i64,
        name: String,
    }

    impl Model for Item {
        const COLLECTION: &'static str = "item";

        fn id(&self) -> i64 {
            self.id
        }

        fn set_id(&mut self, id: i64) {
            self.id = id;
        }
    }

    struct StalledStore;

    #[async_trait]
    impl EntityStore<Item> for StalledStore {
        async fn find_by_id(&self, _id: i64) -> PageCacheResult<Option<Item>> {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok(None)
        }

        async fn find_by_ids(&self, _ids: &[i64]) -> PageCacheResult<Vec<Item>> {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok(Vec::new())
        }

        async fn pluck_ids(&self, _query: &ListQuery) -> PageCacheResult<Vec<i64>> {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok(Vec::new())
        }

        async fn first_or_create(&self, entity: &Item) -> PageCacheResult<Item> {
            Ok(entity.clone())
        }

        async fn update_columns(&self, _entity: &Item, _columns: &[&str]) -> PageCacheResult<()> {
            Ok(())
        }

        async fn delete(&self, _entity: &Item) -> PageCacheResult<bool> {
            Ok(false)
        }
    }

    #[tokio::test]
    async fn test_stalled_query_times_out() {
        let store = TimedEntityStore::new(Arc::new(StalledStore), Duration::from_millis(20));

        let err = store.find_by_ids(&[1, 2]).await.unwrap_err();
        assert!(matches!(err, PageCacheError::Timeout(_)));

        let err = store.pluck_ids(&ListQuery::new()).await.unwrap_err();
        assert!(matches!(err, PageCacheError::Timeout(_)));
    }

    #[tokio::test]
    async fn test_fast_query_passes_through() {
        let inner = Arc::new(MemoryEntityStore::<Item>::new());
        inner.insert(Item {
            id: 0,
            name: "a".to_string(),
        });
        let store = TimedEntityStore::new(inner, Duration::from_secs(1));

        let found = store.find_by_id(1).await.unwrap();
        assert_eq!(found.map(|i| i.name), Some("a".to_string()));
    }
}
