//! Message box listings and the mutations that keep them fresh.
//!
//! Boxes are listed under `boxes[:{owner}]:{order}` for every order in
//! [`MessageBox::ORDERS`]. A mutation drops the `:latest` pointer of each
//! listing whose membership or order it can change, so the next unpinned
//! request mints a new snapshot. Pinned versions keep serving until their
//! snapshot expires.

mod dto;

pub use dto::*;

use crate::cache::{CacheInvalidator, KvCache, ListKey};
use crate::model_cache::ModelCache;
use crate::paginator::SnapshotPaginator;
use crate::policy::CachePolicy;
use pagecache_core::{ListQuery, PageCacheError, PageCacheResult, VersionedPage};
use pagecache_domain::MessageBox;
use pagecache_repository::EntityStore;
use std::sync::Arc;
use tracing::{info, instrument};

/// Name of the box listing.
pub const LISTING: &str = "boxes";

const UPDATED_AT_DESC: &str = "updated_at desc";

/// Lists, creates, renames and deletes message boxes through the cache.
#[derive(Clone)]
pub struct BoxListingService {
    models: ModelCache<MessageBox>,
    paginator: SnapshotPaginator<MessageBox>,
    invalidator: CacheInvalidator,
}

impl BoxListingService {
    /// Creates the service over a cache and a box store.
    #[must_use]
    pub fn new(
        cache: Arc<dyn KvCache>,
        store: Arc<dyn EntityStore<MessageBox>>,
        policy: CachePolicy,
    ) -> Self {
        Self {
            models: ModelCache::new(Arc::clone(&cache), Arc::clone(&store), policy.entity_ttl),
            paginator: SnapshotPaginator::new(Arc::clone(&cache), store, policy),
            invalidator: CacheInvalidator::new(cache),
        }
    }

    /// Key of the listing of `owner`'s boxes (every box when `None`) in
    /// `order`.
    #[must_use]
    pub fn list_key(owner: Option<i64>, order: &str) -> ListKey {
        ListKey::new(LISTING).scope_opt(owner).order(order)
    }

    /// Returns one page of the requested listing.
    #[instrument(skip(self), fields(owner = ?request.owner_scope()))]
    pub async fn list(&self, request: &BoxListRequest) -> PageCacheResult<VersionedPage<MessageBox>> {
        request.validate()?;
        let owner = request.owner_scope();
        let order = request.order()?;

        let mut query = ListQuery::new();
        if let Some(owner) = owner {
            query = query.filter_eq("owner_id", owner);
        }
        let query = query.order_by_clause(order)?;

        let list_key = Self::list_key(owner, order).to_string();
        self.paginator.page_load(&query, &list_key, request.page).await
    }

    /// Returns one box.
    pub async fn get(&self, box_id: i64) -> PageCacheResult<MessageBox> {
        self.models.load_model(box_id).await
    }

    /// Creates a box for `owner_id`, or returns the owner's existing box
    /// with the same title.
    #[instrument(skip(self, request))]
    pub async fn create(&self, owner_id: i64, request: &BoxCreateRequest) -> PageCacheResult<MessageBox> {
        let title = request.checked()?;
        let created = self.models.create_model(&MessageBox::new(owner_id, title)).await?;

        self.invalidate_listings(owner_id, &MessageBox::ORDERS).await;
        info!(box_id = created.id, owner_id, "Box created");
        Ok(created)
    }

    /// Applies `request` to a box owned by `user_id`.
    ///
    /// Only the `updated_at` ordered listings move, so the `id` ordered
    /// ones keep their latest pointers.
    #[instrument(skip(self, request))]
    pub async fn modify(
        &self,
        user_id: i64,
        box_id: i64,
        request: &BoxModifyRequest,
    ) -> PageCacheResult<MessageBox> {
        request.checked()?;
        let mut message_box = self.owned(user_id, box_id).await?;

        let mut changed = Vec::with_capacity(2);
        if let Some(title) = &request.title {
            message_box.rename(title.trim());
            changed.push("title");
        }
        changed.push("updated_at");

        let updated = self.models.update_model(&message_box, &changed).await?;
        self.invalidate_listings(updated.owner_id, &[UPDATED_AT_DESC]).await;
        info!(box_id, user_id, ?changed, "Box modified");
        Ok(updated)
    }

    /// Deletes a box owned by `user_id`.
    #[instrument(skip(self))]
    pub async fn delete(&self, user_id: i64, box_id: i64) -> PageCacheResult<()> {
        let message_box = self.owned(user_id, box_id).await?;
        self.models.delete_model(&message_box).await?;

        self.invalidate_listings(message_box.owner_id, &MessageBox::ORDERS).await;
        info!(box_id, user_id, "Box deleted");
        Ok(())
    }

    /// Refreshes a listing eagerly, returning the new version.
    pub async fn refresh(&self, owner: Option<i64>, order: &str) -> PageCacheResult<i64> {
        let order = BoxListRequest::default().ordered_by(order).order()?;
        let mut query = ListQuery::new();
        if let Some(owner) = owner {
            query = query.filter_eq("owner_id", owner);
        }
        let query = query.order_by_clause(order)?;
        let snapshot = self
            .paginator
            .mint_snapshot(&query, &Self::list_key(owner, order).to_string())
            .await?;
        Ok(snapshot.version)
    }

    async fn owned(&self, user_id: i64, box_id: i64) -> PageCacheResult<MessageBox> {
        let message_box = self.models.load_model(box_id).await?;
        if message_box.owner_id != user_id {
            return Err(PageCacheError::Forbidden(format!(
                "box {} does not belong to user {}",
                box_id, user_id
            )));
        }
        Ok(message_box)
    }

    async fn invalidate_listings(&self, owner_id: i64, orders: &[&str]) {
        let keys: Vec<String> = orders
            .iter()
            .flat_map(|order| {
                [
                    Self::list_key(Some(owner_id), order).latest(),
                    Self::list_key(None, order).latest(),
                ]
            })
            .collect();
        self.invalidator.delete_in_batch(&keys).await;
    }
}

impl std::fmt::Debug for BoxListingService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BoxListingService").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::MemoryKvCache;
    use chrono::{Duration as ChronoDuration, Utc};
    use pagecache_core::PageRequest;
    use pagecache_repository::MemoryEntityStore;

    struct Fixture {
        cache: Arc<MemoryKvCache>,
        store: Arc<MemoryEntityStore<MessageBox>>,
        service: BoxListingService,
    }

    /// Owner 1 holds boxes 1-3, owner 2 holds box 4. Box 1 is the most
    /// recently updated.
    fn fixture() -> Fixture {
        let cache = Arc::new(MemoryKvCache::new());
        let store = Arc::new(MemoryEntityStore::new());
        let base = Utc::now() - ChronoDuration::hours(1);
        for (id, owner, minutes) in [(1, 1, 40), (2, 1, 30), (3, 1, 20), (4, 2, 10)] {
            let mut message_box = MessageBox::new(owner, format!("box {}", id));
            message_box.id = id;
            message_box.updated_at = base + ChronoDuration::minutes(minutes);
            store.insert(message_box);
        }
        let service = BoxListingService::new(cache.clone(), store.clone(), CachePolicy::default());
        Fixture {
            cache,
            store,
            service,
        }
    }

    fn ids(page: &VersionedPage<MessageBox>) -> Vec<i64> {
        page.items.iter().map(|b| b.id).collect()
    }

    async fn prime_all(f: &Fixture, owner: i64) {
        for order in MessageBox::ORDERS {
            for scope in [Some(owner), None] {
                let mut request = BoxListRequest::new(PageRequest::first()).ordered_by(order);
                request.owner = scope;
                f.service.list(&request).await.unwrap();
            }
        }
    }

    async fn has_latest(f: &Fixture, owner: Option<i64>, order: &str) -> bool {
        let key = BoxListingService::list_key(owner, order).latest();
        f.cache.get_raw(&key).await.unwrap().is_some()
    }

    #[test]
    fn test_list_key_format() {
        assert_eq!(
            BoxListingService::list_key(Some(3), "updated_at desc").to_string(),
            "boxes:3:updated_at_desc"
        );
        assert_eq!(BoxListingService::list_key(None, "id asc").to_string(), "boxes:id_asc");
        assert_eq!(
            BoxListingService::list_key(None, "id asc").latest(),
            "boxes:id_asc:latest"
        );
    }

    #[tokio::test]
    async fn test_list_orders_and_scopes() {
        let f = fixture();

        let all = f
            .service
            .list(&BoxListRequest::new(PageRequest::first()))
            .await
            .unwrap();
        assert_eq!(ids(&all), vec![1, 2, 3, 4]);

        let owned = f
            .service
            .list(&BoxListRequest::new(PageRequest::first()).owned_by(1).ordered_by("id asc"))
            .await
            .unwrap();
        assert_eq!(ids(&owned), vec![1, 2, 3]);
        assert_eq!(owned.total, 3);
        assert!(has_latest(&f, Some(1), "id asc").await);
    }

    #[tokio::test]
    async fn test_list_rejects_unknown_order() {
        let f = fixture();
        let err = f
            .service
            .list(&BoxListRequest::new(PageRequest::first()).ordered_by("title asc"))
            .await
            .unwrap_err();
        assert!(matches!(err, PageCacheError::Validation(_)));
        assert_eq!(f.store.calls().total(), 0);
    }

    #[tokio::test]
    async fn test_create_drops_every_affected_latest_pointer() {
        let f = fixture();
        prime_all(&f, 1).await;
        prime_all(&f, 2).await;

        let created = f.service.create(1, &BoxCreateRequest::new("fresh")).await.unwrap();
        assert_eq!(created.owner_id, 1);

        for order in MessageBox::ORDERS {
            assert!(!has_latest(&f, Some(1), order).await);
            assert!(!has_latest(&f, None, order).await);
            assert!(has_latest(&f, Some(2), order).await);
        }

        let owned = f
            .service
            .list(&BoxListRequest::new(PageRequest::first()).owned_by(1).ordered_by("id asc"))
            .await
            .unwrap();
        assert_eq!(ids(&owned), vec![1, 2, 3, created.id]);
    }

    #[tokio::test]
    async fn test_create_same_title_returns_existing_box() {
        let f = fixture();
        let first = f.service.create(5, &BoxCreateRequest::new("questions")).await.unwrap();
        let second = f.service.create(5, &BoxCreateRequest::new("questions")).await.unwrap();
        assert_eq!(first.id, second.id);
        assert_eq!(f.store.len(), 5);
    }

    #[tokio::test]
    async fn test_pinned_version_survives_create() {
        let f = fixture();
        let request = BoxListRequest::new(PageRequest::new(1, 2)).owned_by(1).ordered_by("id asc");
        let first = f.service.list(&request).await.unwrap();

        f.service.create(1, &BoxCreateRequest::new("late")).await.unwrap();

        let mut pinned = request.clone();
        pinned.page = PageRequest::new(2, 2).with_version(first.version);
        let second = f.service.list(&pinned).await.unwrap();
        assert_eq!(second.version, first.version);
        assert_eq!(second.total, 3);
        assert_eq!(ids(&second), vec![3]);
    }

    #[tokio::test]
    async fn test_modify_only_drops_updated_at_listings() {
        let f = fixture();
        prime_all(&f, 1).await;

        let renamed = f
            .service
            .modify(1, 3, &BoxModifyRequest::title("renamed"))
            .await
            .unwrap();
        assert_eq!(renamed.title, "renamed");
        assert_eq!(f.store.get(3).unwrap().title, "renamed");

        assert!(!has_latest(&f, Some(1), "updated_at desc").await);
        assert!(!has_latest(&f, None, "updated_at desc").await);
        assert!(has_latest(&f, Some(1), "id asc").await);
        assert!(has_latest(&f, None, "id asc").await);

        let page = f
            .service
            .list(&BoxListRequest::new(PageRequest::first()).owned_by(1))
            .await
            .unwrap();
        assert_eq!(ids(&page), vec![3, 1, 2]);
        assert_eq!(page.items[0].title, "renamed");
    }

    #[tokio::test]
    async fn test_modify_checks_owner_and_body() {
        let f = fixture();

        let err = f
            .service
            .modify(2, 1, &BoxModifyRequest::title("mine now"))
            .await
            .unwrap_err();
        assert!(matches!(err, PageCacheError::Forbidden(_)));
        assert_eq!(f.store.get(1).unwrap().title, "box 1");

        let err = f.service.modify(1, 1, &BoxModifyRequest::default()).await.unwrap_err();
        assert!(matches!(err, PageCacheError::Validation(_)));

        let err = f
            .service
            .modify(1, 99, &BoxModifyRequest::title("ghost"))
            .await
            .unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_delete_removes_box_and_listings() {
        let f = fixture();
        prime_all(&f, 1).await;
        f.service.get(2).await.unwrap();

        f.service.delete(1, 2).await.unwrap();

        assert!(f.service.get(2).await.unwrap_err().is_not_found());
        for order in MessageBox::ORDERS {
            assert!(!has_latest(&f, Some(1), order).await);
            assert!(!has_latest(&f, None, order).await);
        }
        let page = f
            .service
            .list(&BoxListRequest::new(PageRequest::first()).owned_by(1).ordered_by("id asc"))
            .await
            .unwrap();
        assert_eq!(ids(&page), vec![1, 3]);
    }

    #[tokio::test]
    async fn test_create_after_delete_reuses_title() {
        let f = fixture();
        f.service.delete(1, 2).await.unwrap();

        let recreated = f.service.create(1, &BoxCreateRequest::new("box 2")).await.unwrap();
        assert_ne!(recreated.id, 2);
        assert_eq!(f.service.get(recreated.id).await.unwrap().title, "box 2");
    }

    #[tokio::test]
    async fn test_delete_by_other_user_is_forbidden() {
        let f = fixture();
        let err = f.service.delete(1, 4).await.unwrap_err();
        assert!(matches!(err, PageCacheError::Forbidden(_)));
        assert!(f.store.get(4).is_some());
    }

    #[tokio::test]
    async fn test_refresh_moves_latest_pointer() {
        let f = fixture();
        let before = f
            .service
            .list(&BoxListRequest::new(PageRequest::first()))
            .await
            .unwrap();

        let version = f.service.refresh(None, "updated_at desc").await.unwrap();
        assert!(version > before.version);

        let after = f
            .service
            .list(&BoxListRequest::new(PageRequest::first()))
            .await
            .unwrap();
        assert_eq!(after.version, version);
    }
}
