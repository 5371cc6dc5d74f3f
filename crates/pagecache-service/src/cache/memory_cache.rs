//! In-process cache implementation.
//!
//! Selected when Redis is disabled, and used as the cache fake in tests.
//! Expiry is measured with `tokio::time::Instant`, so paused-clock tests can
//! advance past a TTL without sleeping. Expired entries are purged on write,
//! at most once per [`SWEEP_INTERVAL`].

use super::KvCache;
use async_trait::async_trait;
use pagecache_core::{PageCacheError, PageCacheResult};
use parking_lot::{Mutex, RwLock};
use shaku::Component;
use std::collections::HashMap;
use std::time::Duration;
use tokio::time::Instant;
use tracing::debug;

/// Number of commands issued against a [`MemoryKvCache`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheCalls {
    pub get: usize,
    pub set: usize,
    pub delete: usize,
    pub delete_many: usize,
    pub exists: usize,
}

/// Minimum time between two purges of expired entries.
pub const SWEEP_INTERVAL: Duration = Duration::from_secs(1);

/// A stored value and its expiry.
#[derive(Debug, Clone)]
pub struct CacheEntry {
    value: Vec<u8>,
    expires_at: Instant,
}

/// `HashMap`-backed [`KvCache`] with per-entry expiry.
#[derive(Component, Default)]
#[shaku(interface = KvCache)]
pub struct MemoryKvCache {
    #[shaku(default)]
    entries: RwLock<HashMap<String, CacheEntry>>,
    #[shaku(default)]
    next_sweep: Mutex<Option<Instant>>,
    #[shaku(default)]
    calls: Mutex<CacheCalls>,
    #[shaku(default)]
    failing: RwLock<bool>,
    #[shaku(default)]
    latency: RwLock<Option<Duration>>,
}

impl MemoryKvCache {
    /// Creates an empty cache.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the remaining TTL of `key`, or `None` if absent or expired.
    #[must_use]
    pub fn ttl(&self, key: &str) -> Option<Duration> {
        let now = Instant::now();
        self.entries
            .read()
            .get(key)
            .filter(|e| e.expires_at > now)
            .map(|e| e.expires_at - now)
    }

    /// Drops `key` as if it had expired or been evicted.
    pub fn evict(&self, key: &str) {
        self.entries.write().remove(key);
    }

    /// Returns the unexpired keys starting with `prefix`, sorted.
    #[must_use]
    pub fn keys_with_prefix(&self, prefix: &str) -> Vec<String> {
        let now = Instant::now();
        let mut keys: Vec<String> = self
            .entries
            .read()
            .iter()
            .filter(|(k, e)| k.starts_with(prefix) && e.expires_at > now)
            .map(|(k, _)| k.clone())
            .collect();
        keys.sort();
        keys
    }

    /// Number of stored entries, including expired ones not yet purged.
    #[must_use]
    pub fn entry_count(&self) -> usize {
        self.entries.read().len()
    }

    /// Returns the command counters.
    #[must_use]
    pub fn calls(&self) -> CacheCalls {
        *self.calls.lock()
    }

    /// Resets the command counters.
    pub fn reset_calls(&self) {
        *self.calls.lock() = CacheCalls::default();
    }

    /// Makes every command fail with a cache error while `failing`.
    pub fn set_failing(&self, failing: bool) {
        *self.failing.write() = failing;
    }

    /// Delays every command by `latency`.
    pub fn set_latency(&self, latency: Option<Duration>) {
        *self.latency.write() = latency;
    }

    async fn enter(&self, record: impl FnOnce(&mut CacheCalls)) -> PageCacheResult<()> {
        record(&mut *self.calls.lock());
        let latency = *self.latency.read();
        if let Some(latency) = latency {
            tokio::time::sleep(latency).await;
        }
        if *self.failing.read() {
            return Err(PageCacheError::cache("cache unavailable"));
        }
        Ok(())
    }

    fn sweep(&self, entries: &mut HashMap<String, CacheEntry>, now: Instant) {
        let mut next_sweep = self.next_sweep.lock();
        if next_sweep.is_some_and(|at| now < at) {
            return;
        }
        *next_sweep = Some(now + SWEEP_INTERVAL);

        let before = entries.len();
        entries.retain(|_, e| e.expires_at > now);
        let purged = before - entries.len();
        if purged > 0 {
            debug!(purged, remaining = entries.len(), "Purged expired cache entries");
        }
    }

    fn live(&self, key: &str) -> Option<Vec<u8>> {
        let now = Instant::now();
        self.entries
            .read()
            .get(key)
            .filter(|e| e.expires_at > now)
            .map(|e| e.value.clone())
    }
}

impl std::fmt::Debug for MemoryKvCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryKvCache")
            .field("entries", &self.entries.read().len())
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl KvCache for MemoryKvCache {
    async fn get_raw(&self, key: &str) -> PageCacheResult<Option<Vec<u8>>> {
        self.enter(|c| c.get += 1).await?;
        let value = self.live(key);
        match &value {
            Some(_) => debug!("Cache hit for key '{}'", key),
            None => debug!("Cache miss for key '{}'", key),
        }
        Ok(value)
    }

    async fn set_raw(&self, key: &str, value: &[u8], ttl: Duration) -> PageCacheResult<()> {
        self.enter(|c| c.set += 1).await?;
        let now = Instant::now();
        let entry = CacheEntry {
            value: value.to_vec(),
            expires_at: now + ttl,
        };
        let mut entries = self.entries.write();
        self.sweep(&mut entries, now);
        entries.insert(key.to_string(), entry);
        Ok(())
    }

    async fn delete(&self, key: &str) -> PageCacheResult<bool> {
        self.enter(|c| c.delete += 1).await?;
        let now = Instant::now();
        Ok(self
            .entries
            .write()
            .remove(key)
            .is_some_and(|e| e.expires_at > now))
    }

    async fn delete_many(&self, keys: &[String]) -> PageCacheResult<u64> {
        self.enter(|c| c.delete_many += 1).await?;
        let now = Instant::now();
        let mut entries = self.entries.write();
        let deleted = keys
            .iter()
            .filter_map(|k| entries.remove(k))
            .filter(|e| e.expires_at > now)
            .count();
        Ok(deleted as u64)
    }

    async fn exists(&self, key: &str) -> PageCacheResult<bool> {
        self.enter(|c| c.exists += 1).await?;
        Ok(self.live(key).is_some())
    }
}
