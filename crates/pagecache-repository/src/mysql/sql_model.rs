//! Table mapping for models stored in MySQL.

use pagecache_core::{validate_identifier, ColumnValue, ListQuery, Model, PageCacheError, PageCacheResult};
use sqlx::mysql::MySqlRow;
use sqlx::FromRow;

/// A [`Model`] backed by a MySQL table.
///
/// Column values are read through the model's serialized form, so most
/// implementations only declare their table layout.
pub trait SqlModel: Model + for<'r> FromRow<'r, MySqlRow> + Unpin {
    /// Table name.
    const TABLE: &'static str = Self::COLLECTION;

    /// Writable columns, `id` excluded, in insert order.
    const COLUMNS: &'static [&'static str];

    /// Nullable timestamp column marking soft-deleted rows, if any.
    const SOFT_DELETE: Option<&'static str> = None;

    /// Returns the value to bind for `column`.
    fn column_value(&self, column: &str) -> PageCacheResult<ColumnValue> {
        self.column(column)?.ok_or_else(|| {
            PageCacheError::validation(format!(
                "{} has no column '{}'",
                Self::COLLECTION,
                column
            ))
        })
    }

    /// Comma separated select list, `id` first.
    fn select_list() -> String {
        std::iter::once("id")
            .chain(Self::COLUMNS.iter().copied())
            .collect::<Vec<_>>()
            .join(", ")
    }

    /// Checks that `column` is `id` or one of [`Self::COLUMNS`].
    fn check_column(column: &str) -> PageCacheResult<()> {
        validate_identifier(column)?;
        if column == "id" || Self::COLUMNS.contains(&column) {
            Ok(())
        } else {
            Err(PageCacheError::validation(format!(
                "Unknown column '{}' for {}",
                column,
                Self::TABLE
            )))
        }
    }

    /// Checks every column a listing query references.
    fn check_query(query: &ListQuery) -> PageCacheResult<()> {
        query.validate()?;
        query
            .filters()
            .iter()
            .map(|f| f.column.as_str())
            .chain(query.orders().iter().map(|o| o.column.as_str()))
            .try_for_each(Self::check_column)
    }
}
