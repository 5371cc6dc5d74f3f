//! Integration tests for MySqlEntityStore.
//!
//! These tests run against a real MySQL database using testcontainers.
//! Requires Docker to be available on the system.

mod common;

use common::TestDatabase;
use pagecache_core::{Direction, ListQuery};
use pagecache_domain::MessageBox;
use pagecache_repository::{DatabasePoolInterface, EntityStore, MySqlEntityStore};

async fn seed(store: &MySqlEntityStore<MessageBox>, owner_id: i64, titles: &[&str]) -> Vec<MessageBox> {
    let mut created = Vec::new();
    for title in titles {
        created.push(
            store
                .first_or_create(&MessageBox::new(owner_id, *title))
                .await
                .expect("Failed to create box"),
        );
    }
    created
}

#[tokio::test]
#[ignore = "requires Docker"]
async fn test_first_or_create_and_find_by_id() {
    let db = TestDatabase::new().await;
    let store = MySqlEntityStore::<MessageBox>::new(db.pool());

    let created = store
        .first_or_create(&MessageBox::new(1, "questions"))
        .await
        .expect("Failed to create box");
    assert!(created.id > 0);

    let again = store
        .first_or_create(&MessageBox::new(1, "questions"))
        .await
        .expect("Failed to re-create box");
    assert_eq!(again.id, created.id);

    let found = store
        .find_by_id(created.id)
        .await
        .expect("Query failed")
        .expect("Box not found");
    assert_eq!(found.title, "questions");
    assert_eq!(found.owner_id, 1);
}

#[tokio::test]
#[ignore = "requires Docker"]
async fn test_find_by_ids_skips_missing_rows() {
    let db = TestDatabase::new().await;
    let store = MySqlEntityStore::<MessageBox>::new(db.pool());
    let boxes = seed(&store, 1, &["a", "b", "c"]).await;

    let rows = store
        .find_by_ids(&[boxes[2].id, 999_999, boxes[0].id])
        .await
        .expect("Query failed");
    let mut ids: Vec<i64> = rows.iter().map(|b| b.id).collect();
    ids.sort_unstable();
    assert_eq!(ids, vec![boxes[0].id, boxes[2].id]);

    assert!(store.find_by_ids(&[]).await.expect("Query failed").is_empty());
}

#[tokio::test]
#[ignore = "requires Docker"]
async fn test_pluck_ids_filters_and_orders() {
    let db = TestDatabase::new().await;
    let store = MySqlEntityStore::<MessageBox>::new(db.pool());
    let mine = seed(&store, 1, &["a", "b", "c"]).await;
    seed(&store, 2, &["other"]).await;

    let query = ListQuery::new()
        .filter_eq("owner_id", 1)
        .order_by("id", Direction::Desc);
    let ids = store.pluck_ids(&query).await.expect("Query failed");
    assert_eq!(ids, vec![mine[2].id, mine[1].id, mine[0].id]);

    let all = store.pluck_ids(&ListQuery::new()).await.expect("Query failed");
    assert_eq!(all.len(), 4);
    assert!(all.windows(2).all(|w| w[0] < w[1]));
}

#[tokio::test]
#[ignore = "requires Docker"]
async fn test_pluck_ids_rejects_unknown_column() {
    let db = TestDatabase::new().await;
    let store = MySqlEntityStore::<MessageBox>::new(db.pool());

    let query = ListQuery::new().filter_eq("password", "x");
    assert!(store.pluck_ids(&query).await.is_err());
}

#[tokio::test]
#[ignore = "requires Docker"]
async fn test_update_columns_writes_only_listed_columns() {
    let db = TestDatabase::new().await;
    let store = MySqlEntityStore::<MessageBox>::new(db.pool());
    let mut b = seed(&store, 1, &["before"]).await.remove(0);

    b.rename("after");
    b.view_count = 42;
    store
        .update_columns(&b, &["title", "updated_at"])
        .await
        .expect("Update failed");

    let found = store.find_by_id(b.id).await.expect("Query failed").expect("Box not found");
    assert_eq!(found.title, "after");
    assert_eq!(found.view_count, 0);
}

#[tokio::test]
#[ignore = "requires Docker"]
async fn test_delete_is_soft() {
    let db = TestDatabase::new().await;
    let store = MySqlEntityStore::<MessageBox>::new(db.pool());
    let boxes = seed(&store, 1, &["a", "b"]).await;

    assert!(store.delete(&boxes[0]).await.expect("Delete failed"));
    assert!(!store.delete(&boxes[0]).await.expect("Delete failed"));

    assert!(store.find_by_id(boxes[0].id).await.expect("Query failed").is_none());
    let ids = store.pluck_ids(&ListQuery::new()).await.expect("Query failed");
    assert_eq!(ids, vec![boxes[1].id]);

    let remaining: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM box")
        .fetch_one(db.pool().inner())
        .await
        .expect("Count failed");
    assert_eq!(remaining, 2);
}

#[tokio::test]
#[ignore = "requires Docker"]
async fn test_recreate_after_soft_delete() {
    let db = TestDatabase::new().await;
    let store = MySqlEntityStore::<MessageBox>::new(db.pool());
    let first = seed(&store, 1, &["questions"]).await.remove(0);

    assert!(store.delete(&first).await.expect("Delete failed"));

    let second = store
        .first_or_create(&MessageBox::new(1, "questions"))
        .await
        .expect("Failed to re-create box after delete");
    assert_ne!(second.id, first.id);
    assert_eq!(second.title, "questions");

    // a second live row with the same title is still refused by the index
    let duplicate = sqlx::query(
        "INSERT INTO box (title, owner_id, post_count, view_count, created_at, updated_at) \
         VALUES ('questions', 1, 0, 0, NOW(6), NOW(6))",
    )
    .execute(db.pool().inner())
    .await;
    assert!(duplicate.is_err());

    let ids = store.pluck_ids(&ListQuery::new()).await.expect("Query failed");
    assert_eq!(ids, vec![second.id]);
}
