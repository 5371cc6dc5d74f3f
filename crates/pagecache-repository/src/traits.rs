//! Store trait definitions.

use async_trait::async_trait;
use pagecache_core::{ListQuery, Model, PageCacheResult};

/// Authoritative row store for one collection.
///
/// Every method is a blocking I/O boundary from the caller's point of view.
/// Implementations acquire their own connection per call, so no
/// transactional state leaks between a listing query and the hydration of
/// its pages.
#[async_trait]
pub trait EntityStore<T: Model>: Send + Sync {
    /// Finds a live row by id.
    async fn find_by_id(&self, id: i64) -> PageCacheResult<Option<T>>;

    /// Finds all live rows whose id is in `ids`, in no particular order.
    ///
    /// Ids without a row are simply absent from the result.
    async fn find_by_ids(&self, ids: &[i64]) -> PageCacheResult<Vec<T>>;

    /// Returns every id matching `query`, in the query's order.
    ///
    /// Ties are broken by id ascending so the ordering is deterministic.
    async fn pluck_ids(&self, query: &ListQuery) -> PageCacheResult<Vec<i64>>;

    /// Returns the row matching the entity's natural key, inserting it first
    /// if no such row exists.
    async fn first_or_create(&self, entity: &T) -> PageCacheResult<T>;

    /// Writes only `columns` of `entity` to the row with the entity's id.
    async fn update_columns(&self, entity: &T, columns: &[&str]) -> PageCacheResult<()>;

    /// Deletes the entity's row. Returns `true` if a live row was removed.
    async fn delete(&self, entity: &T) -> PageCacheResult<bool>;
}
