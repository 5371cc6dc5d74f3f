//! Versioned, snapshot-backed pagination.
//!
//! A listing is frozen into a [`Snapshot`] the first time it is requested:
//! the full ordered id list is plucked from the store and cached twice,
//!
//! ```text
//! {list_key}:{version}   id array            snapshot TTL (10 min)
//! {list_key}:latest      {version, id_array}  latest TTL   (9 min)
//! ```
//!
//! with the versioned entry written first. Pages are sliced out of the
//! frozen ids and hydrated through [`BatchHydrator`], so a client that pins
//! `version` sees the same ordering on every page until the snapshot
//! expires.

use crate::cache::{cache_keys, KvCache, KvCacheExt};
use crate::coalesce::KeyedLock;
use crate::hydrator::BatchHydrator;
use crate::policy::CachePolicy;
use pagecache_core::{
    ListQuery, Model, PageCacheError, PageCacheResult, PageRequest, Snapshot, VersionedPage,
};
use pagecache_repository::EntityStore;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Serves pages of filtered, ordered listings from cached snapshots.
pub struct SnapshotPaginator<T> {
    cache: Arc<dyn KvCache>,
    store: Arc<dyn EntityStore<T>>,
    hydrator: BatchHydrator<T>,
    policy: CachePolicy,
    mint_locks: Arc<KeyedLock>,
    last_version: Arc<AtomicI64>,
}

impl<T: Model> SnapshotPaginator<T> {
    /// Creates a paginator.
    #[must_use]
    pub fn new(cache: Arc<dyn KvCache>, store: Arc<dyn EntityStore<T>>, policy: CachePolicy) -> Self {
        Self {
            hydrator: BatchHydrator::new(Arc::clone(&cache), Arc::clone(&store), policy.entity_ttl),
            cache,
            store,
            policy,
            mint_locks: Arc::new(KeyedLock::new()),
            last_version: Arc::new(AtomicI64::new(0)),
        }
    }

    /// Returns the hydrator pages are resolved through.
    #[must_use]
    pub fn hydrator(&self) -> &BatchHydrator<T> {
        &self.hydrator
    }

    /// Returns one page of the listing `list_key`, whose contents are the
    /// rows matching `query`.
    ///
    /// Without a version the latest snapshot is used, minting one if none
    /// is cached. A pinned version is served from its own snapshot; if that
    /// has expired a fresh snapshot is minted, or [`PageCacheError::SessionExpired`]
    /// is returned when strict versions are enabled.
    pub async fn page_load(
        &self,
        query: &ListQuery,
        list_key: &str,
        request: PageRequest,
    ) -> PageCacheResult<VersionedPage<T>> {
        request.validate()?;

        let snapshot = match request.version {
            Some(version) => self.pinned(query, list_key, version).await?,
            None => self.latest_or_mint(query, list_key).await?,
        };

        let total = snapshot.total();
        let ids = snapshot.page_ids(&request);
        if ids.is_empty() {
            debug!(list_key, version = snapshot.version, total, page = request.page_num, "Page out of range");
            return Ok(VersionedPage::empty(snapshot.version, total));
        }

        let hydrated = self.hydrator.load_by_ids(ids).await?;
        if hydrated.is_partial() {
            warn!(
                list_key,
                version = snapshot.version,
                missing = ?hydrated.missing,
                "Snapshot references rows that no longer exist"
            );
        }

        Ok(VersionedPage {
            version: snapshot.version,
            total,
            items: hydrated.entities,
            missing: hydrated.missing,
        })
    }

    /// Plucks the ordered ids for `query` and caches them as a new version
    /// of `list_key`, replacing the latest pointer.
    ///
    /// An empty result is returned under a fresh version but not cached.
    pub async fn mint_snapshot(&self, query: &ListQuery, list_key: &str) -> PageCacheResult<Snapshot> {
        let ids = self.store.pluck_ids(query).await?;
        let snapshot = Snapshot::new(self.next_version(), ids);
        if snapshot.id_array.is_empty() {
            debug!(list_key, version = snapshot.version, "Empty listing, not cached");
            return Ok(snapshot);
        }

        // the versioned entry must exist before any reader can follow latest to it
        self.cache
            .set(
                &cache_keys::snapshot(list_key, snapshot.version),
                &snapshot.id_array,
                self.policy.snapshot_ttl,
            )
            .await?;
        self.cache
            .set(&cache_keys::latest(list_key), &snapshot, self.policy.latest_ttl)
            .await?;

        info!(list_key, version = snapshot.version, total = snapshot.total(), "Minted snapshot");
        Ok(snapshot)
    }

    async fn pinned(&self, query: &ListQuery, list_key: &str, version: i64) -> PageCacheResult<Snapshot> {
        let key = cache_keys::snapshot(list_key, version);
        if let Some(ids) = self.cache.get::<Vec<i64>>(&key).await? {
            return Ok(Snapshot::new(version, ids));
        }
        if self.policy.strict_versions {
            return Err(PageCacheError::SessionExpired {
                list_key: list_key.to_string(),
                version,
            });
        }
        info!(list_key, version, "Pinned version expired, serving latest");
        self.latest_or_mint(query, list_key).await
    }

    async fn latest_or_mint(&self, query: &ListQuery, list_key: &str) -> PageCacheResult<Snapshot> {
        if let Some(snapshot) = self.read_latest(list_key).await? {
            return Ok(snapshot);
        }
        if !self.policy.coalesce_minting {
            return self.mint_snapshot(query, list_key).await;
        }

        let _guard = self.mint_locks.lock(list_key).await;
        if let Some(snapshot) = self.read_latest(list_key).await? {
            debug!(list_key, version = snapshot.version, "Reusing concurrently minted snapshot");
            return Ok(snapshot);
        }
        self.mint_snapshot(query, list_key).await
    }

    async fn read_latest(&self, list_key: &str) -> PageCacheResult<Option<Snapshot>> {
        let Some(snapshot) = self.cache.get::<Snapshot>(&cache_keys::latest(list_key)).await? else {
            return Ok(None);
        };
        if self.policy.verify_latest
            && !self
                .cache
                .exists(&cache_keys::snapshot(list_key, snapshot.version))
                .await?
        {
            warn!(list_key, version = snapshot.version, "Latest pointer outlived its snapshot");
            return Ok(None);
        }
        Ok(Some(snapshot))
    }

    /// Current time in microseconds, strictly increasing within this
    /// paginator.
    fn next_version(&self) -> i64 {
        let now = chrono::Utc::now().timestamp_micros();
        let previous = self
            .last_version
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |last| Some(now.max(last + 1)))
            .unwrap_or(now);
        now.max(previous + 1)
    }
}

impl<T> Clone for SnapshotPaginator<T> {
    fn clone(&self) -> Self {
        Self {
            cache: Arc::clone(&self.cache),
            store: Arc::clone(&self.store),
            hydrator: self.hydrator.clone(),
            policy: self.policy,
            mint_locks: Arc::clone(&self.mint_locks),
            last_version: Arc::clone(&self.last_version),
        }
    }
}

impl<T> std::fmt::Debug for SnapshotPaginator<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SnapshotPaginator")
            .field("policy", &self.policy)
            .finish_non_exhaustive()
    }
}
