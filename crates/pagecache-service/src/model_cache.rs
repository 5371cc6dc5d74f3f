//! Cache-aside access to single entities.

use crate::cache::{cache_keys, CacheInvalidator, KvCache, KvCacheExt};
use pagecache_core::{Model, PageCacheError, PageCacheResult};
use pagecache_repository::EntityStore;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// Load, create, update and delete one entity, keeping its
/// `{collection}:{id}` replica in step with the store.
pub struct ModelCache<T> {
    cache: Arc<dyn KvCache>,
    store: Arc<dyn EntityStore<T>>,
    invalidator: CacheInvalidator,
    entity_ttl: Duration,
}

impl<T: Model> ModelCache<T> {
    /// Creates an entity cache.
    #[must_use]
    pub fn new(cache: Arc<dyn KvCache>, store: Arc<dyn EntityStore<T>>, entity_ttl: Duration) -> Self {
        Self {
            invalidator: CacheInvalidator::new(Arc::clone(&cache)),
            cache,
            store,
            entity_ttl,
        }
    }

    fn key(id: i64) -> String {
        cache_keys::entity(T::COLLECTION, id)
    }

    /// Returns the entity with `id`, from cache when present.
    ///
    /// A store miss is [`PageCacheError::NotFound`].
    pub async fn load_model(&self, id: i64) -> PageCacheResult<T> {
        let key = Self::key(id);
        if let Some(entity) = self.cache.get::<T>(&key).await? {
            return Ok(entity);
        }

        let entity = self
            .store
            .find_by_id(id)
            .await?
            .ok_or_else(|| PageCacheError::not_found(T::COLLECTION, id))?;
        self.cache.set(&key, &entity, self.entity_ttl).await?;
        debug!(collection = T::COLLECTION, id, "Loaded from store");
        Ok(entity)
    }

    /// Persists `entity`, returning the existing row instead when one with
    /// the same natural key is already stored, and caches the result.
    pub async fn create_model(&self, entity: &T) -> PageCacheResult<T> {
        let stored = self.store.first_or_create(entity).await?;
        self.cache
            .set(&Self::key(stored.id()), &stored, self.entity_ttl)
            .await?;
        debug!(collection = T::COLLECTION, id = stored.id(), "Created");
        Ok(stored)
    }

    /// Writes `changed_fields` of `entity` to the store, then caches the
    /// whole of `entity`.
    ///
    /// `entity` must already hold the post-update values of every field;
    /// fields outside `changed_fields` are cached as given, not re-read.
    pub async fn update_model(&self, entity: &T, changed_fields: &[&str]) -> PageCacheResult<T> {
        self.store.update_columns(entity, changed_fields).await?;
        self.cache
            .set(&Self::key(entity.id()), entity, self.entity_ttl)
            .await?;
        debug!(collection = T::COLLECTION, id = entity.id(), ?changed_fields, "Updated");
        Ok(entity.clone())
    }

    /// Deletes the row and drops its cached replica.
    ///
    /// The cache delete is best-effort; its failure is logged, not returned.
    pub async fn delete_model(&self, entity: &T) -> PageCacheResult<()> {
        let removed = self.store.delete(entity).await?;
        self.invalidator.delete(&Self::key(entity.id())).await;
        debug!(collection = T::COLLECTION, id = entity.id(), removed, "Deleted");
        Ok(())
    }
}

impl<T> Clone for ModelCache<T> {
    fn clone(&self) -> Self {
        Self {
            cache: Arc::clone(&self.cache),
            store: Arc::clone(&self.store),
            invalidator: self.invalidator.clone(),
            entity_ttl: self.entity_ttl,
        }
    }
}

impl<T> std::fmt::Debug for ModelCache<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModelCache")
            .field("entity_ttl", &self.entity_ttl)
            .finish_non_exhaustive()
    }
}
