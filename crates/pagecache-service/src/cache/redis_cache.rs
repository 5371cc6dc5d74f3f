//! Redis-based cache implementation.

use super::KvCache;
use async_trait::async_trait;
use deadpool_redis::{redis::AsyncCommands, Pool};
use pagecache_core::{PageCacheError, PageCacheResult};
use shaku::Component;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// Redis-backed [`KvCache`].
///
/// Every key is stored under `key_prefix` so several deployments can share
/// one Redis database. An unreachable server is a [`PageCacheError::Cache`],
/// never a miss.
#[derive(Component)]
#[shaku(interface = KvCache)]
pub struct RedisKvCache {
    /// Redis connection pool.
    pool: Arc<Pool>,
    /// Namespace prepended to every key as `{key_prefix}:`.
    #[shaku(default)]
    key_prefix: String,
}

impl RedisKvCache {
    fn full_key(&self, key: &str) -> String {
        if self.key_prefix.is_empty() {
            key.to_string()
        } else {
            format!("{}:{}", self.key_prefix, key)
        }
    }

    async fn get_conn(&self) -> PageCacheResult<deadpool_redis::Connection> {
        self.pool.get().await.map_err(|e| {
            PageCacheError::Cache(format!("Failed to get Redis connection: {}", e))
        })
    }
}

impl std::fmt::Debug for RedisKvCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedisKvCache")
            .field("pool_size", &self.pool.status().size)
            .field("key_prefix", &self.key_prefix)
            .finish()
    }
}

#[async_trait]
impl KvCache for RedisKvCache {
    async fn get_raw(&self, key: &str) -> PageCacheResult<Option<Vec<u8>>> {
        let mut conn = self.get_conn().await?;
        let value: Option<Vec<u8>> = conn.get(self.full_key(key)).await.map_err(|e| {
            PageCacheError::Cache(format!("Failed to get key '{}': {}", key, e))
        })?;

        match &value {
            Some(_) => debug!("Cache hit for key '{}'", key),
            None => debug!("Cache miss for key '{}'", key),
        }

        Ok(value)
    }

    async fn set_raw(&self, key: &str, value: &[u8], ttl: Duration) -> PageCacheResult<()> {
        let mut conn = self.get_conn().await?;
        let ttl_ms = u64::try_from(ttl.as_millis()).unwrap_or(u64::MAX).max(1);

        conn.pset_ex::<_, _, ()>(self.full_key(key), value, ttl_ms)
            .await
            .map_err(|e| PageCacheError::Cache(format!("Failed to set key '{}': {}", key, e)))?;

        debug!("Cached key '{}' with TTL {}ms", key, ttl_ms);
        Ok(())
    }

    async fn delete(&self, key: &str) -> PageCacheResult<bool> {
        let mut conn = self.get_conn().await?;
        let deleted: i64 = conn.del(self.full_key(key)).await.map_err(|e| {
            PageCacheError::Cache(format!("Failed to delete key '{}': {}", key, e))
        })?;

        debug!("Deleted key '{}': {}", key, deleted > 0);
        Ok(deleted > 0)
    }

    async fn delete_many(&self, keys: &[String]) -> PageCacheResult<u64> {
        if keys.is_empty() {
            return Ok(0);
        }

        let mut conn = self.get_conn().await?;
        let full_keys: Vec<String> = keys.iter().map(|k| self.full_key(k)).collect();
        let deleted: u64 = conn
            .del(&full_keys)
            .await
            .map_err(|e| PageCacheError::Cache(format!("Failed to delete keys: {}", e)))?;

        debug!("Deleted {} of {} keys", deleted, keys.len());
        Ok(deleted)
    }

    async fn exists(&self, key: &str) -> PageCacheResult<bool> {
        let mut conn = self.get_conn().await?;
        let exists: bool = conn.exists(self.full_key(key)).await.map_err(|e| {
            PageCacheError::Cache(format!("Failed to check key '{}': {}", key, e))
        })?;

        Ok(exists)
    }
}
