//! Key-value cache interface.

use async_trait::async_trait;
use pagecache_core::PageCacheResult;
use serde::de::DeserializeOwned;
use serde::Serialize;
use shaku::Interface;
use std::time::Duration;

/// TTL key-value store over opaque byte payloads.
///
/// A miss is `Ok(None)`, never an error. Connectivity failures and
/// timeouts are errors and must not be read as misses.
#[async_trait]
pub trait KvCache: Interface + Send + Sync {
    /// Returns the payload stored under `key`, or `None` on a miss.
    async fn get_raw(&self, key: &str) -> PageCacheResult<Option<Vec<u8>>>;

    /// Stores `value` under `key` for `ttl`.
    async fn set_raw(&self, key: &str, value: &[u8], ttl: Duration) -> PageCacheResult<()>;

    /// Removes `key`. Returns `true` if it existed.
    async fn delete(&self, key: &str) -> PageCacheResult<bool>;

    /// Removes every key in `keys` in one round trip where supported.
    ///
    /// Returns the number of keys that existed.
    async fn delete_many(&self, keys: &[String]) -> PageCacheResult<u64>;

    /// Returns true if `key` is present and unexpired.
    async fn exists(&self, key: &str) -> PageCacheResult<bool>;
}

/// JSON encoding on top of [`KvCache`].
#[async_trait]
pub trait KvCacheExt: KvCache {
    /// Reads and decodes a value.
    async fn get<T: DeserializeOwned + Send>(&self, key: &str) -> PageCacheResult<Option<T>> {
        match self.get_raw(key).await? {
            Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            None => Ok(None),
        }
    }

    /// Encodes and stores a value.
    async fn set<T: Serialize + Send + Sync>(
        &self,
        key: &str,
        value: &T,
        ttl: Duration,
    ) -> PageCacheResult<()> {
        let bytes = serde_json::to_vec(value)?;
        self.set_raw(key, &bytes, ttl).await
    }
}

impl<T: KvCache + ?Sized> KvCacheExt for T {}
