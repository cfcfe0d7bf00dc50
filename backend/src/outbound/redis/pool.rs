//! Async connection pool for Redis.
//!
//! Wraps `bb8` over `bb8-redis`'s multiplexed connection manager. Checkout
//! respects the configured timeout and every failure is mapped to
//! [`PoolError`].

use std::time::Duration;

use bb8_redis::RedisConnectionManager;
use bb8_redis::bb8::{Pool, PooledConnection};

/// Errors that can occur during pool operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PoolError {
    /// Failed to check out a connection from the pool.
    #[error("failed to get connection from pool: {message}")]
    Checkout { message: String },

    /// Failed to build the connection pool.
    #[error("failed to build connection pool: {message}")]
    Build { message: String },
}

impl PoolError {
    /// Create a checkout error with the given message.
    pub fn checkout(message: impl Into<String>) -> Self {
        Self::Checkout {
            message: message.into(),
        }
    }

    /// Create a build error with the given message.
    pub fn build(message: impl Into<String>) -> Self {
        Self::Build {
            message: message.into(),
        }
    }
}

/// Configuration for the Redis connection pool.
///
/// # Example
///
/// ```
/// use std::time::Duration;
/// use field_conquest::outbound::redis::RedisPoolConfig;
///
/// let config = RedisPoolConfig::new("redis://127.0.0.1:6379")
///     .with_max_size(32)
///     .with_connection_timeout(Duration::from_secs(2));
/// assert_eq!(config.redis_url(), "redis://127.0.0.1:6379");
/// ```
#[derive(Debug, Clone)]
pub struct RedisPoolConfig {
    redis_url: String,
    max_size: u32,
    connection_timeout: Duration,
}

impl RedisPoolConfig {
    /// Create a configuration for `redis_url` with 16 connections and a
    /// 5 second checkout timeout.
    pub fn new(redis_url: impl Into<String>) -> Self {
        Self {
            redis_url: redis_url.into(),
            max_size: 16,
            connection_timeout: Duration::from_secs(5),
        }
    }

    /// Set the maximum number of connections in the pool.
    pub fn with_max_size(mut self, max_size: u32) -> Self {
        self.max_size = max_size;
        self
    }

    /// Set the connection checkout timeout.
    pub fn with_connection_timeout(mut self, timeout: Duration) -> Self {
        self.connection_timeout = timeout;
        self
    }

    /// Get the Redis URL.
    pub fn redis_url(&self) -> &str {
        &self.redis_url
    }
}

/// Pooled Redis connections.
#[derive(Clone)]
pub struct RedisPool {
    inner: Pool<RedisConnectionManager>,
}

impl RedisPool {
    /// Create a pool with the given configuration.
    ///
    /// # Errors
    ///
    /// Returns `PoolError::Build` if the URL is invalid or the initial
    /// connections cannot be established.
    pub async fn new(config: RedisPoolConfig) -> Result<Self, PoolError> {
        let manager = RedisConnectionManager::new(config.redis_url.as_str())
            .map_err(|err| PoolError::build(err.to_string()))?;

        let pool = Pool::builder()
            .max_size(config.max_size)
            .connection_timeout(config.connection_timeout)
            .build(manager)
            .await
            .map_err(|err| PoolError::build(err.to_string()))?;

        Ok(Self { inner: pool })
    }

    /// Get a connection from the pool.
    ///
    /// # Errors
    ///
    /// Returns `PoolError::Checkout` if a connection cannot be obtained within
    /// the configured timeout.
    pub async fn get(&self) -> Result<PooledConnection<'_, RedisConnectionManager>, PoolError> {
        self.inner
            .get()
            .await
            .map_err(|err| PoolError::checkout(err.to_string()))
    }
}
