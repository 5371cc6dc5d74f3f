//! `box` table mapping.

use super::SqlModel;
use pagecache_domain::MessageBox;

impl SqlModel for MessageBox {
    const COLUMNS: &'static [&'static str] = &[
        "title",
        "owner_id",
        "post_count",
        "view_count",
        "created_at",
        "updated_at",
    ];
    const SOFT_DELETE: Option<&'static str> = Some("deleted_at");
}

#[cfg(test)]
mod tests {
    use super::*;
    use pagecache_core::{ColumnValue, Direction, ListQuery};

    #[test]
    fn test_select_list() {
        assert_eq!(
            MessageBox::select_list(),
            "id, title, owner_id, post_count, view_count, created_at, updated_at"
        );
        assert_eq!(MessageBox::TABLE, "box");
    }

    #[test]
    fn test_check_query() {
        let ok = ListQuery::new()
            .filter_eq("owner_id", 1)
            .order_by("updated_at", Direction::Desc);
        assert!(MessageBox::check_query(&ok).is_ok());

        let unknown = ListQuery::new().filter_eq("password", "x");
        assert!(MessageBox::check_query(&unknown).is_err());
    }

    #[test]
    fn test_timestamp_column_binds_as_timestamp() {
        let b = MessageBox::new(1, "hello");
        assert!(matches!(
            b.column_value("created_at").unwrap(),
            ColumnValue::Timestamp(_)
        ));
        assert!(b.column_value("nope").is_err());
    }
}
