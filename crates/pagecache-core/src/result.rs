//! Result type aliases for the pagination cache.

use crate::PageCacheError;

/// A specialized `Result` type for cache and store operations.
pub type PageCacheResult<T> = Result<T, PageCacheError>;

