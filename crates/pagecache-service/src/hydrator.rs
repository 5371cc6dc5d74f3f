//! Batched, partially cached hydration of ordered id lists.

use crate::cache::{cache_keys, KvCache, KvCacheExt};
use pagecache_core::{Model, PageCacheResult};
use pagecache_repository::EntityStore;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// Outcome of hydrating an id list.
#[derive(Debug, Clone, PartialEq)]
pub struct Hydrated<T> {
    /// Resolved entities, in the relative order of the input ids.
    pub entities: Vec<T>,
    /// Input ids with no backing row, in input order.
    pub missing: Vec<i64>,
}

impl<T> Hydrated<T> {
    /// Returns true if some ids could not be resolved.
    #[must_use]
    pub fn is_partial(&self) -> bool {
        !self.missing.is_empty()
    }

    /// Discards the missing ids.
    #[must_use]
    pub fn into_entities(self) -> Vec<T> {
        self.entities
    }
}

impl<T> Default for Hydrated<T> {
    fn default() -> Self {
        Self {
            entities: Vec::new(),
            missing: Vec::new(),
        }
    }
}

/// Resolves id lists with one cache get per id and at most one store query.
pub struct BatchHydrator<T> {
    cache: Arc<dyn KvCache>,
    store: Arc<dyn EntityStore<T>>,
    entity_ttl: Duration,
}

impl<T: Model> BatchHydrator<T> {
    /// Creates a hydrator.
    #[must_use]
    pub fn new(cache: Arc<dyn KvCache>, store: Arc<dyn EntityStore<T>>, entity_ttl: Duration) -> Self {
        Self {
            cache,
            store,
            entity_ttl,
        }
    }

    /// Loads the entities for `ids`.
    ///
    /// Cached entities are used as-is. All misses are fetched together with
    /// a single `find_by_ids` and written back to the cache. Ids that still
    /// have no row are reported in [`Hydrated::missing`].
    pub async fn load_by_ids(&self, ids: &[i64]) -> PageCacheResult<Hydrated<T>> {
        if ids.is_empty() {
            return Ok(Hydrated::default());
        }

        let mut slots: Vec<Option<T>> = vec![None; ids.len()];
        let mut misses: Vec<(i64, usize)> = Vec::new();
        for (slot, &id) in ids.iter().enumerate() {
            match self.cache.get::<T>(&cache_keys::entity(T::COLLECTION, id)).await? {
                Some(entity) => slots[slot] = Some(entity),
                None => misses.push((id, slot)),
            }
        }

        if !misses.is_empty() {
            let miss_ids: Vec<i64> = misses.iter().map(|(id, _)| *id).collect();
            debug!(
                collection = T::COLLECTION,
                hits = ids.len() - misses.len(),
                misses = misses.len(),
                "Hydrating misses from store"
            );
            let rows = self.store.find_by_ids(&miss_ids).await?;

            let mut by_id = HashMap::with_capacity(rows.len());
            for row in rows {
                self.cache
                    .set(&cache_keys::entity(T::COLLECTION, row.id()), &row, self.entity_ttl)
                    .await?;
                by_id.insert(row.id(), row);
            }
            for (id, slot) in misses {
                if let Some(row) = by_id.get(&id) {
                    slots[slot] = Some(row.clone());
                }
            }
        }

        let mut hydrated = Hydrated {
            entities: Vec::with_capacity(ids.len()),
            missing: Vec::new(),
        };
        for (slot, id) in slots.into_iter().zip(ids) {
            match slot {
                Some(entity) => hydrated.entities.push(entity),
                None => hydrated.missing.push(*id),
            }
        }
        Ok(hydrated)
    }
}

impl<T> Clone for BatchHydrator<T> {
    fn clone(&self) -> Self {
        Self {
            cache: Arc::clone(&self.cache),
            store: Arc::clone(&self.store),
            entity_ttl: self.entity_ttl,
        }
    }
}

impl<T> std::fmt::Debug for BatchHydrator<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BatchHydrator")
            .field("entity_ttl", &self.entity_ttl)
            .finish_non_exhaustive()
    }
}
