//! Configuration validation module.
//!
//! Fails fast on invalid configuration rather than at runtime.

use crate::AppConfig;
use std::fmt;
use url::Url;

/// Configuration validation error variants.
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigValidationError {
    /// Pool size configuration is invalid (min must be <= max).
    InvalidPoolSize { min: u32, max: u32 },
    /// Pool size exceeds maximum allowed.
    PoolSizeTooLarge { value: u64, maximum: u64 },
    /// URL format is invalid.
    InvalidUrl { url_type: String, message: String },
    /// Timeout or TTL value must be positive.
    NonPositiveDuration { name: String },
    /// The latest pointer would outlive the snapshot it references.
    LatestOutlivesSnapshot { latest_secs: u64, snapshot_secs: u64 },
    /// Key prefix contains characters that would break key parsing.
    InvalidKeyPrefix { value: String },
    /// Log format is not `pretty` or `json`.
    InvalidLogFormat { value: String },
}

impl fmt::Display for ConfigValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidPoolSize { min, max } => {
                write!(
                    f,
                    "Invalid pool size: min ({}) cannot be greater than max ({})",
                    min, max
                )
            }
            Self::PoolSizeTooLarge { value, maximum } => {
                write!(f, "Pool size {} exceeds maximum allowed ({})", value, maximum)
            }
            Self::InvalidUrl { url_type, message } => {
                write!(f, "Invalid {} URL: {}", url_type, message)
            }
            Self::NonPositiveDuration { name } => {
                write!(f, "'{}' must be positive", name)
            }
            Self::LatestOutlivesSnapshot {
                latest_secs,
                snapshot_secs,
            } => {
                write!(
                    f,
                    "latest_ttl_secs ({}) must be shorter than snapshot_ttl_secs ({})",
                    latest_secs, snapshot_secs
                )
            }
            Self::InvalidKeyPrefix { value } => {
                write!(f, "Invalid key prefix '{}': must not contain whitespace or ':' at its ends", value)
            }
            Self::InvalidLogFormat { value } => {
                write!(f, "Invalid log format: '{}' (valid: pretty, json)", value)
            }
        }
    }
}

impl std::error::Error for ConfigValidationError {}

/// Configuration validator.
pub struct ConfigValidator;

impl ConfigValidator {
    /// Maximum connection pool size.
    const MAX_POOL_SIZE: u64 = 1000;

    /// Validates the entire application configuration.
    ///
    /// Returns Ok(()) if valid, or Err with all validation errors found.
    pub fn validate(config: &AppConfig) -> Result<(), Vec<ConfigValidationError>> {
        let mut errors = Vec::new();

        Self::validate_database(&config.database, &mut errors);
        Self::validate_redis(&config.redis, &mut errors);
        Self::validate_cache(&config.cache, &mut errors);
        Self::validate_observability(&config.observability, &mut errors);

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    fn validate_database(config: &crate::DatabaseConfig, errors: &mut Vec<ConfigValidationError>) {
        if config.url.is_empty() {
            errors.push(ConfigValidationError::InvalidUrl {
                url_type: "database".to_string(),
                message: "URL cannot be empty".to_string(),
            });
        } else if !config.url.starts_with("mysql://") {
            errors.push(ConfigValidationError::InvalidUrl {
                url_type: "database".to_string(),
                message: "URL must start with mysql://".to_string(),
            });
        }

        if config.min_connections > config.max_connections {
            errors.push(ConfigValidationError::InvalidPoolSize {
                min: config.min_connections,
                max: config.max_connections,
            });
        }
        if u64::from(config.max_connections) > Self::MAX_POOL_SIZE {
            errors.push(ConfigValidationError::PoolSizeTooLarge {
                value: u64::from(config.max_connections),
                maximum: Self::MAX_POOL_SIZE,
            });
        }
        if config.connect_timeout_secs == 0 {
            errors.push(ConfigValidationError::NonPositiveDuration {
                name: "database.connect_timeout_secs".to_string(),
            });
        }
    }

    fn validate_redis(config: &crate::RedisConfig, errors: &mut Vec<ConfigValidationError>) {
        if !config.enabled {
            return;
        }

        match Url::parse(&config.url) {
            Ok(url) if url.scheme() == "redis" || url.scheme() == "rediss" => {}
            Ok(_) => errors.push(ConfigValidationError::InvalidUrl {
                url_type: "redis".to_string(),
                message: "URL must start with redis:// or rediss://".to_string(),
            }),
            Err(e) => errors.push(ConfigValidationError::InvalidUrl {
                url_type: "redis".to_string(),
                message: e.to_string(),
            }),
        }

        if config.pool_size as u64 > Self::MAX_POOL_SIZE {
            errors.push(ConfigValidationError::PoolSizeTooLarge {
                value: config.pool_size as u64,
                maximum: Self::MAX_POOL_SIZE,
            });
        }
    }

    fn validate_cache(config: &crate::CacheConfig, errors: &mut Vec<ConfigValidationError>) {
        for (name, value) in [
            ("cache.entity_ttl_secs", config.entity_ttl_secs),
            ("cache.snapshot_ttl_secs", config.snapshot_ttl_secs),
            ("cache.latest_ttl_secs", config.latest_ttl_secs),
            ("cache.cache_timeout_ms", config.cache_timeout_ms),
            ("cache.store_timeout_ms", config.store_timeout_ms),
        ] {
            if value == 0 {
                errors.push(ConfigValidationError::NonPositiveDuration {
                    name: name.to_string(),
                });
            }
        }

        if config.latest_ttl_secs >= config.snapshot_ttl_secs {
            errors.push(ConfigValidationError::LatestOutlivesSnapshot {
                latest_secs: config.latest_ttl_secs,
                snapshot_secs: config.snapshot_ttl_secs,
            });
        }

        let prefix = &config.key_prefix;
        if prefix.chars().any(char::is_whitespace) || prefix.starts_with(':') || prefix.ends_with(':') {
            errors.push(ConfigValidationError::InvalidKeyPrefix {
                value: prefix.clone(),
            });
        }
    }

    fn validate_observability(
        config: &pagecache_core::TelemetryConfig,
        errors: &mut Vec<ConfigValidationError>,
    ) {
        let format = config.log_format.to_lowercase();
        if format != "pretty" && format != "json" {
            errors.push(ConfigValidationError::InvalidLogFormat {
                value: config.log_format.clone(),
            });
        }
    }
}
