//! Store and session configuration loaded via OrthoConfig.
//!
//! Values come from `CONQUEST_*` environment variables or a configuration
//! file; anything unset falls back to the defaults below.

use std::ffi::OsString;
use std::time::Duration;

use ortho_config::OrthoConfig;
use serde::Deserialize;

use crate::outbound::redis::RedisPoolConfig;

const DEFAULT_REDIS_URL: &str = "redis://127.0.0.1:6379";

/// Runtime settings for the conquest service.
#[derive(Debug, Clone, Deserialize, OrthoConfig)]
#[ortho_config(prefix = "CONQUEST")]
pub struct ConquestSettings {
    /// Redis connection URL.
    pub redis_url: Option<String>,
    /// Maximum pooled Redis connections.
    #[ortho_config(default = 16)]
    pub pool_max_size: u32,
    /// Seconds to wait for a pooled connection.
    #[ortho_config(default = 5)]
    pub connection_timeout_secs: u64,
    /// Lifetime of issued session tokens, in seconds.
    #[ortho_config(default = 900)]
    pub token_ttl_secs: u64,
}

impl ConquestSettings {
    /// Load settings from the environment and configuration files only.
    ///
    /// Command-line arguments belong to the CLI, so none are forwarded.
    pub fn load_from_environment() -> ortho_config::OrthoResult<Self> {
        Self::load_from_iter([OsString::from("field-conquest")])
    }

    /// Configured Redis URL, falling back to the local default.
    pub fn redis_url(&self) -> &str {
        self.redis_url.as_deref().unwrap_or(DEFAULT_REDIS_URL)
    }

    /// Configured token lifetime.
    pub fn token_ttl(&self) -> Duration {
        Duration::from_secs(self.token_ttl_secs)
    }

    /// Pool configuration derived from these settings.
    pub fn pool_config(&self) -> RedisPoolConfig {
        RedisPoolConfig::new(self.redis_url())
            .with_max_size(self.pool_max_size)
            .with_connection_timeout(Duration::from_secs(self.connection_timeout_secs))
    }
}
