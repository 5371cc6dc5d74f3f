//! Timeout wrapper for async operations.

use pagecache_core::PageCacheError;
use std::time::Duration;
use tracing::warn;

/// Wraps an async operation with a timeout.
///
/// `operation` names the call in the resulting error and log line.
pub async fn with_timeout<F, Fut, T>(
    duration: Duration,
    operation: &str,
    f: F,
) -> Result<T, PageCacheError>
where
    F: FnOnce() -> Fut,
    Fut: std::future::Future<Output = Result<T, PageCacheError>>,
{
    if let Ok(result) = tokio::time::timeout(duration, f()).await {
        result
    } else {
        warn!(operation, timeout_ms = duration.as_millis() as u64, "Operation timed out");
        Err(PageCacheError::Timeout(format!(
            "{} timed out after {:?}",
            operation, duration
        )))
    }
}
