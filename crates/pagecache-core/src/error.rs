//! Unified error types for the cache and store layers.

use std::fmt::Debug;
use thiserror::Error;

/// Unified error type for the versioned pagination cache.
///
/// A cache miss is deliberately absent: reads return `Option` and every
/// caller branches on `None` explicitly. Everything here is a real failure
/// and is propagated to the calling handler unchanged.
#[derive(Error, Debug)]
pub enum PageCacheError {
    // ============ Domain Errors ============
    /// No backing row exists for the requested id.
    #[error("Resource not found: {collection} with id {id}")]
    NotFound {
        collection: &'static str,
        id: String,
    },

    /// Invalid input such as a malformed page request or unknown column.
    #[error("Validation error: {0}")]
    Validation(String),

    /// Conflict error (e.g., duplicate natural key)
    #[error("Conflict: {0}")]
    Conflict(String),

    /// The caller may not modify this resource.
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// A pinned pagination version is no longer cached and strict
    /// versioning is enabled.
    #[error("Pagination session expired: {list_key} version {version}")]
    SessionExpired { list_key: String, version: i64 },

    // ============ Transient Backend Errors ============
    /// Relational store connectivity or query failure.
    #[error("Database error: {0}")]
    Database(String),

    /// Key-value cache connectivity or command failure.
    #[error("Cache error: {0}")]
    Cache(String),

    /// A cache or store call exceeded its deadline.
    #[error("Operation timed out: {0}")]
    Timeout(String),

    // ============ Infrastructure Errors ============
    /// A cached payload or entity could not be encoded or decoded.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Configuration(String),

    // ============ Internal Errors ============
    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),

    /// Generic error wrapper
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl PageCacheError {
    /// Returns a machine-readable error code.
    #[must_use]
    pub const fn error_code(&self) -> &'static str {
        match self {
            Self::NotFound { .. } => "NOT_FOUND",
            Self::Validation(_) => "VALIDATION_ERROR",
            Self::Conflict(_) => "CONFLICT",
            Self::Forbidden(_) => "FORBIDDEN",
            Self::SessionExpired { .. } => "SESSION_EXPIRED",
            Self::Database(_) => "DATABASE_ERROR",
            Self::Cache(_) => "CACHE_ERROR",
            Self::Timeout(_) => "TIMEOUT",
            Self::Serialization(_) => "SERIALIZATION_ERROR",
            Self::Configuration(_) => "CONFIGURATION_ERROR",
            Self::Internal(_) | Self::Other(_) => "INTERNAL_ERROR",
        }
    }

    /// Creates a not found error for a row of `collection`.
    #[must_use]
    pub fn not_found<T: ToString>(collection: &'static str, id: T) -> Self {
        Self::NotFound {
            collection,
            id: id.to_string(),
        }
    }

    /// Creates a validation error.
    #[must_use]
    pub fn validation<T: Into<String>>(message: T) -> Self {
        Self::Validation(message.into())
    }

    /// Creates a conflict error.
    #[must_use]
    pub fn conflict<T: Into<String>>(message: T) -> Self {
        Self::Conflict(message.into())
    }

    /// Creates a cache error.
    #[must_use]
    pub fn cache<T: Into<String>>(message: T) -> Self {
        Self::Cache(message.into())
    }

    /// Creates an internal error.
    #[must_use]
    pub fn internal<T: Into<String>>(message: T) -> Self {
        Self::Internal(message.into())
    }

    /// Returns true for cache or store connectivity and timeout failures.
    ///
    /// These are never retried here; callers decide.
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        matches!(self, Self::Database(_) | Self::Cache(_) | Self::Timeout(_))
    }

    /// Returns true if this is a not-found condition from the store.
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

#[cfg(feature = "sqlx")]
impl From<sqlx::Error> for PageCacheError {
    fn from(err: sqlx::Error) -> Self {
        match &err {
            sqlx::Error::RowNotFound => Self::NotFound {
                collection: "database_row",
                id: "unknown".to_string(),
            },
            sqlx::Error::Database(db_err) => {
                if let Some(code) = db_err.code() {
                    if code == "23505" || code == "1062" {
                        // PostgreSQL / MySQL unique violation
                        return Self::Conflict(db_err.message().to_string());
                    }
                }
                Self::Database(err.to_string())
            }
            sqlx::Error::PoolTimedOut => Self::Timeout(err.to_string()),
            _ => Self::Database(err.to_string()),
        }
    }
}

impl From<serde_json::Error> for PageCacheError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(format!("JSON serialization error: {}", err))
    }
}
