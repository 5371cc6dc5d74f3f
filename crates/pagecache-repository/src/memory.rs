//! In-process entity store.
//!
//! Used when no database is configured and as the store behind the cache
//! layer's tests. It counts calls so callers can assert how many queries a
//! code path issued.

use crate::traits::EntityStore;
use async_trait::async_trait;
use pagecache_core::{ColumnValue, Direction, ListQuery, Model, PageCacheError, PageCacheResult};
use parking_lot::{Mutex, RwLock};
use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::time::Duration;
use tracing::debug;

/// Number of calls made to each store operation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StoreCalls {
    pub find_by_id: usize,
    pub find_by_ids: usize,
    pub pluck_ids: usize,
    pub first_or_create: usize,
    pub update_columns: usize,
    pub delete: usize,
}

impl StoreCalls {
    /// Total number of queries issued.
    #[must_use]
    pub const fn total(&self) -> usize {
        self.find_by_id
            + self.find_by_ids
            + self.pluck_ids
            + self.first_or_create
            + self.update_columns
            + self.delete
    }
}

/// [`EntityStore`] over a `BTreeMap` keyed by id.
pub struct MemoryEntityStore<T> {
    rows: RwLock<BTreeMap<i64, T>>,
    next_id: Mutex<i64>,
    calls: Mutex<StoreCalls>,
    latency: RwLock<Option<Duration>>,
    failing: RwLock<bool>,
}

impl<T: Model> MemoryEntityStore<T> {
    /// Creates an empty store. Ids are assigned from 1.
    #[must_use]
    pub fn new() -> Self {
        Self {
            rows: RwLock::new(BTreeMap::new()),
            next_id: Mutex::new(1),
            calls: Mutex::new(StoreCalls::default()),
            latency: RwLock::new(None),
            failing: RwLock::new(false),
        }
    }

    /// Stores a row directly, bypassing call accounting.
    ///
    /// A zero id is replaced by the next free id. Returns the stored row.
    pub fn insert(&self, mut entity: T) -> T {
        let mut next_id = self.next_id.lock();
        if entity.id() == 0 {
            entity.set_id(*next_id);
        }
        *next_id = (*next_id).max(entity.id() + 1);
        self.rows.write().insert(entity.id(), entity.clone());
        entity
    }

    /// Removes a row directly, bypassing call accounting.
    pub fn remove(&self, id: i64) -> Option<T> {
        self.rows.write().remove(&id)
    }

    /// Returns a row directly, bypassing call accounting.
    #[must_use]
    pub fn get(&self, id: i64) -> Option<T> {
        self.rows.read().get(&id).cloned()
    }

    /// Number of stored rows.
    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.read().len()
    }

    /// Returns true if no rows are stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.read().is_empty()
    }

    /// Returns the call counters.
    #[must_use]
    pub fn calls(&self) -> StoreCalls {
        *self.calls.lock()
    }

    /// Resets the call counters.
    pub fn reset_calls(&self) {
        *self.calls.lock() = StoreCalls::default();
    }

    /// Delays every operation by `latency`.
    pub fn set_latency(&self, latency: Option<Duration>) {
        *self.latency.write() = latency;
    }

    /// Makes every operation fail with a database error while `failing`.
    pub fn set_failing(&self, failing: bool) {
        *self.failing.write() = failing;
    }

    async fn enter(&self, record: impl FnOnce(&mut StoreCalls)) -> PageCacheResult<()> {
        record(&mut *self.calls.lock());
        let latency = *self.latency.read();
        if let Some(latency) = latency {
            tokio::time::sleep(latency).await;
        }
        if *self.failing.read() {
            return Err(PageCacheError::Database("store unavailable".to_string()));
        }
        Ok(())
    }

    fn matches(entity: &T, query: &ListQuery) -> PageCacheResult<bool> {
        for filter in query.filters() {
            let value = entity.column(&filter.column)?.unwrap_or(ColumnValue::Null);
            if value != filter.value {
                return Ok(false);
            }
        }
        Ok(true)
    }

    fn natural_key_matches(candidate: &T, entity: &T) -> PageCacheResult<bool> {
        for column in T::NATURAL_KEY {
            if candidate.column(column)? != entity.column(column)? {
                return Ok(false);
            }
        }
        Ok(true)
    }
}

impl<T: Model> Default for MemoryEntityStore<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> std::fmt::Debug for MemoryEntityStore<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryEntityStore")
            .field("rows", &self.rows.read().len())
            .finish_non_exhaustive()
    }
}

fn compare(a: &[ColumnValue], b: &[ColumnValue], directions: &[Direction]) -> Ordering {
    for ((x, y), direction) in a.iter().zip(b).zip(directions) {
        let ord = x.partial_cmp(y).unwrap_or(Ordering::Equal);
        let ord = match direction {
            Direction::Asc => ord,
            Direction::Desc => ord.reverse(),
        };
        if ord != Ordering::Equal {
            return ord;
        }
    }
    Ordering::Equal
}

#[async_trait]
impl<T: Model> EntityStore<T> for MemoryEntityStore<T> {
    async fn find_by_id(&self, id: i64) -> PageCacheResult<Option<T>> {
        self.enter(|c| c.find_by_id += 1).await?;
        Ok(self.get(id))
    }

    async fn find_by_ids(&self, ids: &[i64]) -> PageCacheResult<Vec<T>> {
        self.enter(|c| c.find_by_ids += 1).await?;
        let rows = self.rows.read();
        Ok(ids.iter().filter_map(|id| rows.get(id).cloned()).collect())
    }

    async fn pluck_ids(&self, query: &ListQuery) -> PageCacheResult<Vec<i64>> {
        self.enter(|c| c.pluck_ids += 1).await?;
        query.validate()?;

        let directions: Vec<Direction> = query.orders().iter().map(|o| o.direction).collect();
        let mut keyed = Vec::new();
        for entity in self.rows.read().values() {
            if !Self::matches(entity, query)? {
                continue;
            }
            let key = query
                .orders()
                .iter()
                .map(|o| Ok(entity.column(&o.column)?.unwrap_or(ColumnValue::Null)))
                .collect::<PageCacheResult<Vec<_>>>()?;
            keyed.push((key, entity.id()));
        }
        // BTreeMap iteration is id ascending and the sort is stable
        keyed.sort_by(|(a, _), (b, _)| compare(a, b, &directions));

        debug!("Plucked {} {} ids", keyed.len(), T::COLLECTION);
        Ok(keyed.into_iter().map(|(_, id)| id).collect())
    }

    async fn first_or_create(&self, entity: &T) -> PageCacheResult<T> {
        self.enter(|c| c.first_or_create += 1).await?;

        if entity.id() != 0 {
            if let Some(existing) = self.get(entity.id()) {
                return Ok(existing);
            }
        }
        if !T::NATURAL_KEY.is_empty() {
            for candidate in self.rows.read().values() {
                if Self::natural_key_matches(candidate, entity)? {
                    return Ok(candidate.clone());
                }
            }
        }
        Ok(self.insert(entity.clone()))
    }

    async fn update_columns(&self, entity: &T, columns: &[&str]) -> PageCacheResult<()> {
        self.enter(|c| c.update_columns += 1).await?;

        let source = serde_json::to_value(entity)?;
        let mut rows = self.rows.write();
        let Some(stored) = rows.get_mut(&entity.id()) else {
            return Ok(());
        };
        let mut merged = serde_json::to_value(&*stored)?;
        for column in columns {
            if *column == "id" {
                return Err(PageCacheError::validation("Cannot update column 'id'"));
            }
            let value = source.get(*column).cloned().ok_or_else(|| {
                PageCacheError::validation(format!(
                    "Unknown column '{}' for {}",
                    column,
                    T::COLLECTION
                ))
            })?;
            merged[*column] = value;
        }
        *stored = serde_json::from_value(merged)?;
        Ok(())
    }

    async fn delete(&self, entity: &T) -> PageCacheResult<bool> {
        self.enter(|c| c.delete += 1).await?;
        Ok(self.remove(entity.id()).is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::{Deserialize, Serialize};

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Item {
        id: i64,
        group: i64,
        name: String,
        rank: i64,
    }

    impl Item {
        fn new(group: i64, name: &str, rank: i64) -> Self {
            Self {
                id: 0,
                group,
                name: name.to_string(),
                rank,
            }
        }
    }

    impl Model for Item {
        const COLLECTION: &'static str = "item";
        const NATURAL_KEY: &'static [&'static str] = &["group", "name"];

        fn id(&self) -> i64 {
            self.id
        }

        fn set_id(&mut self, id: i64) {
            self.id = id;
        }
    }

    fn seeded() -> MemoryEntityStore<Item> {
        let store = MemoryEntityStore::new();
        store.insert(Item::new(1, "a", 3));
        store.insert(Item::new(1, "b", 1));
        store.insert(Item::new(2, "c", 2));
        store.insert(Item::new(1, "d", 3));
        store
    }

    #[tokio::test]
    async fn test_pluck_ids_filters_and_orders_with_id_tie_break() {
        let store = seeded();
        let query = ListQuery::new()
            .filter_eq("group", 1)
            .order_by("rank", Direction::Desc);

        let ids = store.pluck_ids(&query).await.unwrap();
        assert_eq!(ids, vec![1, 4, 2]);
        assert_eq!(store.calls().pluck_ids, 1);
    }

    #[tokio::test]
    async fn test_pluck_ids_default_order_is_id_ascending() {
        let store = seeded();
        let ids = store.pluck_ids(&ListQuery::new()).await.unwrap();
        assert_eq!(ids, vec![1, 2, 3, 4]);
    }

    #[tokio::test]
    async fn test_find_by_ids_skips_missing() {
        let store = seeded();
        let rows = store.find_by_ids(&[4, 99, 1]).await.unwrap();
        let ids: Vec<i64> = rows.iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![4, 1]);
        assert_eq!(store.calls().find_by_ids, 1);
    }

    #[tokio::test]
    async fn test_first_or_create_is_idempotent_on_natural_key() {
        let store = seeded();
        let first = store.first_or_create(&Item::new(5, "new", 0)).await.unwrap();
        let second = store.first_or_create(&Item::new(5, "new", 9)).await.unwrap();

        assert_eq!(first.id, 5);
        assert_eq!(second, first);
        assert_eq!(store.len(), 5);
    }

    #[tokio::test]
    async fn test_update_columns_writes_only_listed_fields() {
        let store = seeded();
        let mut changed = store.get(1).unwrap();
        changed.name = "renamed".to_string();
        changed.rank = 100;

        store.update_columns(&changed, &["name"]).await.unwrap();

        let stored = store.get(1).unwrap();
        assert_eq!(stored.name, "renamed");
        assert_eq!(stored.rank, 3);
        assert!(store.update_columns(&changed, &["nope"]).await.is_err());
    }

    #[tokio::test]
    async fn test_delete() {
        let store = seeded();
        let row = store.get(2).unwrap();
        assert!(store.delete(&row).await.unwrap());
        assert!(!store.delete(&row).await.unwrap());
        assert_eq!(store.len(), 3);
    }

    #[tokio::test]
    async fn test_failing_store_counts_the_attempt() {
        let store = seeded();
        store.set_failing(true);

        let err = store.find_by_id(1).await.unwrap_err();
        assert!(matches!(err, PageCacheError::Database(_)));
        assert_eq!(store.calls().find_by_id, 1);
        assert_eq!(store.calls().total(), 1);
    }
}
