//! Key-value cache layer.
//!
//! [`KvCache`] is the injected cache interface. [`RedisKvCache`] is the
//! production backend, [`MemoryKvCache`] the in-process fallback, and
//! [`TimedKvCache`] bounds every command with a deadline.

pub mod cache_keys;
mod invalidator;
mod kv_cache;
mod memory_cache;
mod redis_cache;
mod timed_cache;

pub use cache_keys::ListKey;
pub use invalidator::CacheInvalidator;
pub use kv_cache::{KvCache, KvCacheExt};
pub use memory_cache::{CacheCalls, CacheEntry, MemoryKvCache, MemoryKvCacheParameters};
pub use redis_cache::{RedisKvCache, RedisKvCacheParameters};
pub use timed_cache::TimedKvCache;
