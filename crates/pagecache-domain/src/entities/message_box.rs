//! Message box entity.

use chrono::{DateTime, Utc};
use pagecache_core::Model;
use serde::{Deserialize, Serialize};
use validator::Validate;

/// A question box owned by a user. Visitors post questions into it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct MessageBox {
    /// Row identifier, zero until persisted.
    pub id: i64,

    /// Box title, unique per owner.
    #[validate(length(min = 1, max = 64))]
    pub title: String,

    /// Owning user.
    pub owner_id: i64,

    /// Number of posts in the box.
    pub post_count: i64,

    /// Number of views.
    pub view_count: i64,

    /// Creation timestamp.
    pub created_at: DateTime<Utc>,

    /// Last update timestamp.
    pub updated_at: DateTime<Utc>,
}

impl MessageBox {
    /// Sort orders the box listings are served in.
    pub const ORDERS: [&'static str; 2] = ["id asc", "updated_at desc"];

    /// Creates an unsaved box.
    #[must_use]
    pub fn new(owner_id: i64, title: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: 0,
            title: title.into(),
            owner_id,
            post_count: 0,
            view_count: 0,
            created_at: now,
            updated_at: now,
        }
    }

    /// Renames the box and bumps `updated_at`.
    pub fn rename(&mut self, title: impl Into<String>) {
        self.title = title.into();
        self.updated_at = Utc::now();
    }

    /// Records a new post.
    pub fn record_post(&mut self) {
        self.post_count += 1;
        self.updated_at = Utc::now();
    }
}

impl Model for MessageBox {
    const COLLECTION: &'static str = "box";
    const NATURAL_KEY: &'static [&'static str] = &["owner_id", "title"];

    fn id(&self) -> i64 {
        self.id
    }

    fn set_id(&mut self, id: i64) {
        self.id = id;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pagecache_core::ColumnValue;

    #[test]
    fn test_new_box_is_unsaved() {
        let b = MessageBox::new(3, "ask me anything");
        assert_eq!(b.id(), 0);
        assert_eq!(b.owner_id, 3);
        assert_eq!(b.post_count, 0);
    }

    #[test]
    fn test_rename_bumps_updated_at() {
        let mut b = MessageBox::new(3, "old");
        let before = b.updated_at;
        b.rename("new");
        assert_eq!(b.title, "new");
        assert!(b.updated_at >= before);
    }

    #[test]
    fn test_validation() {
        assert!(MessageBox::new(1, "ok").validate().is_ok());
        assert!(MessageBox::new(1, "").validate().is_err());
        assert!(MessageBox::new(1, "x".repeat(65)).validate().is_err());
    }

    #[test]
    fn test_natural_key_columns_readable() {
        let b = MessageBox::new(9, "hello");
        for column in MessageBox::NATURAL_KEY {
            assert!(b.column(column).unwrap().is_some());
        }
        assert_eq!(b.column("owner_id").unwrap(), Some(ColumnValue::Int(9)));
    }
}
