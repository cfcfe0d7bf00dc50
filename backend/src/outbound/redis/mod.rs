//! Redis adapter for the conquest store port.
//!
//! # Example
//!
//! ```ignore
//! use field_conquest::outbound::redis::{RedisConquestStore, RedisPool, RedisPoolConfig};
//!
//! let pool = RedisPool::new(RedisPoolConfig::new("redis://127.0.0.1:6379")).await?;
//! let store = RedisConquestStore::new(pool);
//! ```

mod pool;
mod store;

pub use pool::{PoolError, RedisPool, RedisPoolConfig};
pub use store::RedisConquestStore;
