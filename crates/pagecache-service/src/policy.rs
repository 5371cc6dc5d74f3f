//! Cache timing and consistency settings.

use pagecache_config::CacheConfig;
use pagecache_core::{PageCacheError, PageCacheResult};
use std::time::Duration;

/// Settings shared by the entity cache, hydrator and paginator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CachePolicy {
    /// TTL of `{collection}:{id}` entries.
    pub entity_ttl: Duration,
    /// TTL of `{list_key}:{version}` entries.
    pub snapshot_ttl: Duration,
    /// TTL of `{list_key}:latest` entries. Always shorter than `snapshot_ttl`.
    pub latest_ttl: Duration,
    /// Fail with `SessionExpired` instead of re-minting when a pinned
    /// version is gone.
    pub strict_versions: bool,
    /// Confirm the versioned entry exists before trusting a latest pointer.
    pub verify_latest: bool,
    /// Serialise minting per list key within this process.
    pub coalesce_minting: bool,
}

impl CachePolicy {
    /// Checks that a latest pointer cannot outlive its snapshot.
    pub fn validate(&self) -> PageCacheResult<()> {
        if self.entity_ttl.is_zero() || self.latest_ttl.is_zero() {
            return Err(PageCacheError::Configuration("cache TTLs must be positive".to_string()));
        }
        if self.latest_ttl >= self.snapshot_ttl {
            return Err(PageCacheError::Configuration(format!(
                "latest TTL {:?} must be shorter than snapshot TTL {:?}",
                self.latest_ttl, self.snapshot_ttl
            )));
        }
        Ok(())
    }
}

impl Default for CachePolicy {
    fn default() -> Self {
        Self::from(&CacheConfig::default())
    }
}

impl From<&CacheConfig> for CachePolicy {
    fn from(config: &CacheConfig) -> Self {
        Self {
            entity_ttl: config.entity_ttl(),
            snapshot_ttl: config.snapshot_ttl(),
            latest_ttl: config.latest_ttl(),
            strict_versions: config.strict_versions,
            verify_latest: config.verify_latest,
            coalesce_minting: config.coalesce_minting,
        }
    }
}
