//! Dependency injection using Shaku.
//!
//! - `RedisCacheModule`: Redis-backed [`KvCache`]
//! - `LocalCacheModule`: in-process [`KvCache`], used when Redis is disabled
//! - `RepositoryModule`: MySQL connection pool

use crate::boxes::BoxListingService;
use crate::cache::{
    KvCache, MemoryKvCache, RedisKvCache, RedisKvCacheParameters, TimedKvCache,
};
use crate::policy::CachePolicy;
use deadpool_redis::{Pool, PoolConfig, Runtime};
use pagecache_config::{AppConfig, DatabaseConfig, RedisConfig};
use pagecache_core::{PageCacheError, PageCacheResult};
use pagecache_domain::MessageBox;
use pagecache_repository::{
    DatabasePool, DatabasePoolInterface, DatabasePoolParameters, EntityStore, MySqlEntityStore,
    SqlModel, TimedEntityStore,
};
use shaku::{module, HasComponent};
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

module! {
    pub RedisCacheModule {
        components = [RedisKvCache],
        providers = [],
    }
}

module! {
    pub LocalCacheModule {
        components = [MemoryKvCache],
        providers = [],
    }
}

module! {
    pub RepositoryModule {
        components = [DatabasePool],
        providers = [],
    }
}

/// Creates the Redis pool, or `None` when Redis is disabled.
///
/// No connection is opened until the first command.
pub fn redis_pool(config: &RedisConfig) -> PageCacheResult<Option<Arc<Pool>>> {
    if !config.enabled {
        return Ok(None);
    }

    let mut redis_cfg = deadpool_redis::Config::from_url(&config.url);
    redis_cfg.pool = Some(PoolConfig::new(config.pool_size));
    let pool = redis_cfg
        .create_pool(Some(Runtime::Tokio1))
        .map_err(|e| PageCacheError::Cache(format!("Failed to create Redis pool: {}", e)))?;
    Ok(Some(Arc::new(pool)))
}

/// Resolves the configured cache backend, with every command bounded by
/// `cache_timeout_ms`.
pub fn build_cache(config: &AppConfig) -> PageCacheResult<Arc<dyn KvCache>> {
    let cache: Arc<dyn KvCache> = match redis_pool(&config.redis)? {
        Some(pool) => {
            let module = RedisCacheModule::builder()
                .with_component_parameters::<RedisKvCache>(RedisKvCacheParameters {
                    pool,
                    key_prefix: config.cache.key_prefix.clone(),
                })
                .build();
            info!(url = %config.redis.url, "Using Redis cache");
            module.resolve()
        }
        None => {
            let module = LocalCacheModule::builder().build();
            info!("Redis disabled, using in-process cache");
            module.resolve()
        }
    };

    Ok(Arc::new(TimedKvCache::new(cache, config.cache.cache_timeout())))
}

/// Connects to MySQL and builds the repository module.
pub async fn build_repository_module(config: &DatabaseConfig) -> PageCacheResult<Arc<RepositoryModule>> {
    let db_pool = DatabasePool::connect(config).await?;

    let module = RepositoryModule::builder()
        .with_component_parameters::<DatabasePool>(DatabasePoolParameters {
            pool: db_pool.inner().clone(),
        })
        .build();

    Ok(Arc::new(module))
}

/// Everything the cache layer needs from the outside world.
#[derive(Clone)]
pub struct Backends {
    pub pool: Arc<dyn DatabasePoolInterface>,
    pub cache: Arc<dyn KvCache>,
    pub policy: CachePolicy,
    pub store_timeout: Duration,
}

impl Backends {
    /// Validates the cache policy, connects to MySQL and resolves the cache.
    pub async fn connect(config: &AppConfig) -> PageCacheResult<Self> {
        let policy = CachePolicy::from(&config.cache);
        policy.validate()?;

        let cache = build_cache(config)?;
        let repository = build_repository_module(&config.database).await?;
        let pool: Arc<dyn DatabasePoolInterface> = repository.resolve();

        Ok(Self {
            pool,
            cache,
            policy,
            store_timeout: config.cache.store_timeout(),
        })
    }

    /// A MySQL store for `T`, with every query bounded by the store timeout.
    #[must_use]
    pub fn store<T: SqlModel>(&self) -> Arc<dyn EntityStore<T>> {
        let store: Arc<dyn EntityStore<T>> = Arc::new(MySqlEntityStore::<T>::new(Arc::clone(&self.pool)));
        Arc::new(TimedEntityStore::new(store, self.store_timeout))
    }

    /// The message box service over these backends.
    #[must_use]
    pub fn box_service(&self) -> BoxListingService {
        BoxListingService::new(Arc::clone(&self.cache), self.store::<MessageBox>(), self.policy)
    }
}

impl std::fmt::Debug for Backends {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Backends")
            .field("policy", &self.policy)
            .field("store_timeout", &self.store_timeout)
            .finish_non_exhaustive()
    }
}
