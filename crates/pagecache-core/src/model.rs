//! Cached entity contract and listing query descriptions.

use crate::{PageCacheError, PageCacheResult};
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fmt::{self, Display};

/// A record that can be cached by collection name and integer id.
///
/// The store owns the authoritative copy; the cache holds a JSON-encoded
/// replica keyed by `{COLLECTION}:{id}`. Collection names must be globally
/// distinct so a key resolves to at most one logical entity.
pub trait Model: Serialize + DeserializeOwned + Clone + Send + Sync + 'static {
    /// Collection (table) name.
    const COLLECTION: &'static str;

    /// Columns that identify a row independently of its id.
    ///
    /// Used by idempotent creation: a row matching all of these columns is
    /// returned instead of inserting a duplicate. An empty slice means every
    /// create inserts.
    const NATURAL_KEY: &'static [&'static str] = &[];

    /// Returns the identifier. Zero means "not yet persisted".
    fn id(&self) -> i64;

    /// Sets the identifier after an insert.
    fn set_id(&mut self, id: i64);

    /// Reads a column through the entity's serialized form.
    ///
    /// Returns `None` when the entity has no such field.
    fn column(&self, name: &str) -> PageCacheResult<Option<ColumnValue>> {
        let value = serde_json::to_value(self)?;
        Ok(value.get(name).map(ColumnValue::from_json))
    }
}

/// A scalar column value used in filters and parameter binding.
#[derive(Debug, Clone, PartialEq)]
pub enum ColumnValue {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    Timestamp(DateTime<Utc>),
}

impl ColumnValue {
    /// Converts a JSON scalar into a column value.
    ///
    /// RFC 3339 strings are recognised as timestamps; arrays and objects are
    /// kept as their JSON text.
    #[must_use]
    pub fn from_json(value: &serde_json::Value) -> Self {
        match value {
            serde_json::Value::Null => Self::Null,
            serde_json::Value::Bool(b) => Self::Bool(*b),
            serde_json::Value::Number(n) => n
                .as_i64()
                .map(Self::Int)
                .unwrap_or_else(|| Self::Float(n.as_f64().unwrap_or_default())),
            serde_json::Value::String(s) => DateTime::parse_from_rfc3339(s)
                .map(|dt| Self::Timestamp(dt.with_timezone(&Utc)))
                .unwrap_or_else(|_| Self::Text(s.clone())),
            other => Self::Text(other.to_string()),
        }
    }

    /// Returns true if this is SQL `NULL`.
    #[must_use]
    pub const fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }
}

impl PartialOrd for ColumnValue {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        use ColumnValue::{Bool, Float, Int, Null, Text, Timestamp};
        match (self, other) {
            (Null, Null) => Some(std::cmp::Ordering::Equal),
            // NULLs sort first, as MySQL does for ascending order
            (Null, _) => Some(std::cmp::Ordering::Less),
            (_, Null) => Some(std::cmp::Ordering::Greater),
            (Bool(a), Bool(b)) => a.partial_cmp(b),
            (Int(a), Int(b)) => a.partial_cmp(b),
            (Float(a), Float(b)) => a.partial_cmp(b),
            #[allow(clippy::cast_precision_loss)]
            (Int(a), Float(b)) => (*a as f64).partial_cmp(b),
            #[allow(clippy::cast_precision_loss)]
            (Float(a), Int(b)) => a.partial_cmp(&(*b as f64)),
            (Text(a), Text(b)) => a.partial_cmp(b),
            (Timestamp(a), Timestamp(b)) => a.partial_cmp(b),
            _ => None,
        }
    }
}

impl Display for ColumnValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => write!(f, "NULL"),
            Self::Bool(b) => write!(f, "{}", b),
            Self::Int(i) => write!(f, "{}", i),
            Self::Float(x) => write!(f, "{}", x),
            Self::Text(s) => write!(f, "{}", s),
            Self::Timestamp(ts) => write!(f, "{}", ts.to_rfc3339()),
        }
    }
}

impl From<i64> for ColumnValue {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<i32> for ColumnValue {
    fn from(v: i32) -> Self {
        Self::Int(i64::from(v))
    }
}

impl From<bool> for ColumnValue {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<f64> for ColumnValue {
    fn from(v: f64) -> Self {
        Self::Float(v)
    }
}

impl From<&str> for ColumnValue {
    fn from(v: &str) -> Self {
        Self::Text(v.to_string())
    }
}

impl From<String> for ColumnValue {
    fn from(v: String) -> Self {
        Self::Text(v)
    }
}

impl From<DateTime<Utc>> for ColumnValue {
    fn from(v: DateTime<Utc>) -> Self {
        Self::Timestamp(v)
    }
}

impl<T: Into<ColumnValue>> From<Option<T>> for ColumnValue {
    fn from(v: Option<T>) -> Self {
        v.map_or(Self::Null, Into::into)
    }
}

/// Sort direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    Asc,
    Desc,
}

impl Direction {
    /// SQL keyword for this direction.
    #[must_use]
    pub const fn as_sql(self) -> &'static str {
        match self {
            Self::Asc => "ASC",
            Self::Desc => "DESC",
        }
    }
}

impl std::str::FromStr for Direction {
    type Err = PageCacheError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "asc" => Ok(Self::Asc),
            "desc" => Ok(Self::Desc),
            other => Err(PageCacheError::validation(format!(
                "Unknown sort direction '{}'",
                other
            ))),
        }
    }
}

/// One `column = value` condition.
#[derive(Debug, Clone, PartialEq)]
pub struct Filter {
    pub column: String,
    pub value: ColumnValue,
}

/// One ordering term.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderBy {
    pub column: String,
    pub direction: Direction,
}

/// Filtered, ordered description of a listing.
///
/// The store resolves it to the full ordered id list when a snapshot is
/// minted. Column names are validated as plain identifiers so they can be
/// interpolated into SQL safely.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ListQuery {
    filters: Vec<Filter>,
    order_by: Vec<OrderBy>,
}

impl ListQuery {
    /// Creates an unfiltered query ordered by id ascending.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an equality filter.
    #[must_use]
    pub fn filter_eq(mut self, column: impl Into<String>, value: impl Into<ColumnValue>) -> Self {
        self.filters.push(Filter {
            column: column.into(),
            value: value.into(),
        });
        self
    }

    /// Appends an ordering term.
    #[must_use]
    pub fn order_by(mut self, column: impl Into<String>, direction: Direction) -> Self {
        self.order_by.push(OrderBy {
            column: column.into(),
            direction,
        });
        self
    }

    /// Appends ordering terms parsed from a clause such as
    /// `"updated_at desc, id asc"`.
    pub fn order_by_clause(mut self, clause: &str) -> PageCacheResult<Self> {
        for term in clause.split(',').map(str::trim).filter(|t| !t.is_empty()) {
            let mut parts = term.split_whitespace();
            let column = parts
                .next()
                .ok_or_else(|| PageCacheError::validation("Empty order term"))?;
            let direction = match parts.next() {
                Some(d) => d.parse()?,
                None => Direction::Asc,
            };
            if parts.next().is_some() {
                return Err(PageCacheError::validation(format!(
                    "Malformed order term '{}'",
                    term
                )));
            }
            self = self.order_by(column, direction);
        }
        Ok(self)
    }

    /// Returns the filters.
    #[must_use]
    pub fn filters(&self) -> &[Filter] {
        &self.filters
    }

    /// Returns the ordering terms.
    #[must_use]
    pub fn orders(&self) -> &[OrderBy] {
        &self.order_by
    }

    /// Checks that every referenced column is a plain identifier.
    pub fn validate(&self) -> PageCacheResult<()> {
        self.filters
            .iter()
            .map(|f| f.column.as_str())
            .chain(self.order_by.iter().map(|o| o.column.as_str()))
            .try_for_each(validate_identifier)
    }
}

/// Validates a SQL identifier: ASCII letters, digits and `_`, not starting
/// with a digit.
pub fn validate_identifier(name: &str) -> PageCacheResult<()> {
    let mut chars = name.chars();
    let valid = match chars.next() {
        Some(first) => {
            (first.is_ascii_alphabetic() || first == '_')
                && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        }
        None => false,
    };
    if valid {
        Ok(())
    } else {
        Err(PageCacheError::validation(format!(
            "Invalid column name '{}'",
            name
        )))
    }
}
