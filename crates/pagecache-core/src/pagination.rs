//! Pagination types for versioned, snapshot-backed listings.

use crate::{PageCacheError, PageCacheResult};
use serde::{Deserialize, Deserializer, Serialize};
use std::ops::Range;

/// A request for one page of a versioned listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageRequest {
    /// The page number (1-indexed).
    pub page_num: usize,
    /// The number of items per page.
    pub page_size: usize,
    /// Pinned snapshot version. `None` (or `0` on the wire) means latest.
    #[serde(default, deserialize_with = "zero_as_none")]
    pub version: Option<i64>,
}

fn zero_as_none<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<i64>::deserialize(deserializer)?;
    Ok(raw.filter(|v| *v != 0))
}

impl PageRequest {
    /// The default page size.
    pub const DEFAULT_SIZE: usize = 20;
    /// The maximum allowed page size.
    pub const MAX_SIZE: usize = 100;

    /// Creates a request for the latest version.
    #[must_use]
    pub const fn new(page_num: usize, page_size: usize) -> Self {
        Self {
            page_num,
            page_size,
            version: None,
        }
    }

    /// Creates a request for the first page with default size.
    #[must_use]
    pub const fn first() -> Self {
        Self::new(1, Self::DEFAULT_SIZE)
    }

    /// Pins the request to a snapshot version.
    #[must_use]
    pub const fn with_version(mut self, version: i64) -> Self {
        self.version = if version == 0 { None } else { Some(version) };
        self
    }

    /// Checks `page_num >= 1` and `1 <= page_size <= MAX_SIZE`.
    pub fn validate(&self) -> PageCacheResult<()> {
        if self.page_num < 1 {
            return Err(PageCacheError::validation("page_num must be at least 1"));
        }
        if self.page_size < 1 || self.page_size > Self::MAX_SIZE {
            return Err(PageCacheError::validation(format!(
                "page_size must be between 1 and {}",
                Self::MAX_SIZE
            )));
        }
        if matches!(self.version, Some(v) if v < 0) {
            return Err(PageCacheError::validation("version must not be negative"));
        }
        Ok(())
    }

    /// Returns the zero-based offset of the first item.
    #[must_use]
    pub const fn offset(&self) -> usize {
        self.page_num.saturating_sub(1).saturating_mul(self.page_size)
    }

    /// Returns the slice of a `total`-long id array this page covers.
    ///
    /// `None` when the page starts at or beyond the end; the final page is
    /// clamped to `total - offset` items.
    #[must_use]
    pub fn slice_bounds(&self, total: usize) -> Option<Range<usize>> {
        let offset = self.offset();
        if total == 0 || offset >= total {
            return None;
        }
        let len = self.page_size.min(total - offset);
        Some(offset..offset + len)
    }
}

impl Default for PageRequest {
    fn default() -> Self {
        Self::first()
    }
}

/// A frozen ordering of a listing's ids.
///
/// Cached under `{listKey}:{version}` and, with a shorter TTL, under
/// `{listKey}:latest`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    /// Mint time in microseconds since the Unix epoch.
    pub version: i64,
    /// Ordered ids matching the listing query at mint time.
    pub id_array: Vec<i64>,
}

impl Snapshot {
    /// Creates a snapshot.
    #[must_use]
    pub fn new(version: i64, id_array: Vec<i64>) -> Self {
        Self { version, id_array }
    }

    /// Number of ids in the snapshot.
    #[must_use]
    pub fn total(&self) -> usize {
        self.id_array.len()
    }

    /// Returns the ids covered by `request`, empty when out of range.
    #[must_use]
    pub fn page_ids(&self, request: &PageRequest) -> &[i64] {
        request
            .slice_bounds(self.id_array.len())
            .map_or(&[][..], |range| &self.id_array[range])
    }
}

/// One page of a versioned listing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VersionedPage<T> {
    /// Snapshot version that served this page.
    pub version: i64,
    /// Number of ids in the snapshot.
    pub total: usize,
    /// Entities on this page, in snapshot order.
    pub items: Vec<T>,
    /// Ids on this page whose rows no longer exist in the store.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub missing: Vec<i64>,
}

impl<T> VersionedPage<T> {
    /// Creates an empty page that still reports the snapshot's total.
    #[must_use]
    pub fn empty(version: i64, total: usize) -> Self {
        Self {
            version,
            total,
            items: Vec::new(),
            missing: Vec::new(),
        }
    }

    /// Returns true if some ids on this page could not be hydrated.
    #[must_use]
    pub fn is_partial(&self) -> bool {
        !self.missing.is_empty()
    }

    /// Returns the number of items on this page.
    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Returns true if the page has no items.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Number of pages of `page_size` needed to cover `total`.
    #[must_use]
    pub fn total_pages(&self, page_size: usize) -> usize {
        if page_size == 0 {
            0
        } else {
            self.total.div_ceil(page_size)
        }
    }

    /// Maps the page items to a different type.
    #[must_use]
    pub fn map<U, F: FnMut(T) -> U>(self, f: F) -> VersionedPage<U> {
        VersionedPage {
            version: self.version,
            total: self.total,
            items: self.items.into_iter().map(f).collect(),
            missing: self.missing,
        }
    }
}
