//! Redis-backed [`ConquestStore`].
//!
//! Every operation is a single Redis command on a pooled multiplexed
//! connection; hash creation runs as one server-side script. Bitmap ranges
//! are sent with the `BIT` unit, so this adapter needs Redis 7 or later.

use std::time::Duration;

use async_trait::async_trait;
use bb8_redis::redis::{self, RedisError};
use tracing::debug;

use super::pool::{PoolError, RedisPool};
use crate::domain::ports::{BitRange, ConquestStore, RankedMember, StoreError};

/// Creates `KEYS[1]` from the field/value pairs in `ARGV` unless it exists.
const CREATE_HASH_SCRIPT: &str = r"
if redis.call('EXISTS', KEYS[1]) == 1 then
  return 0
end
redis.call('HSET', KEYS[1], unpack(ARGV))
return 1
";

/// Store adapter issuing raw Redis commands.
#[derive(Clone)]
pub struct RedisConquestStore {
    pool: RedisPool,
}

impl RedisConquestStore {
    /// Create a store over an existing pool.
    pub fn new(pool: RedisPool) -> Self {
        Self { pool }
    }

    async fn run<T>(&self, command: &'static str, cmd: redis::Cmd) -> Result<T, StoreError>
    where
        T: redis::FromRedisValue,
    {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        cmd.query_async(&mut *conn)
            .await
            .map_err(|err| map_redis_error(command, err))
    }
}

fn map_pool_error(error: PoolError) -> StoreError {
    debug!(error = %error, "redis pool checkout failed");
    let message = match error {
        PoolError::Checkout { message } | PoolError::Build { message } => message,
    };
    StoreError::connection(message)
}

fn map_redis_error(command: &'static str, error: RedisError) -> StoreError {
    debug!(command, kind = ?error.kind(), error = %error, "redis command failed");
    if error.is_io_error() || error.is_connection_dropped() || error.is_timeout() {
        StoreError::connection(format!("{command}: {error}"))
    } else if matches!(
        error.kind(),
        redis::ErrorKind::UnexpectedReturnType | redis::ErrorKind::Parse
    ) {
        StoreError::decode(format!("{command}: {error}"))
    } else {
        StoreError::command(format!("{command}: {error}"))
    }
}

/// Convert a sorted-set score to a counter, rejecting fractional or negative
/// values that this game never writes.
fn score_to_u64(member: &str, score: f64) -> Result<u64, StoreError> {
    if score.is_finite() && score >= 0.0 && score.fract() == 0.0 && score <= 2f64.powi(53) {
        #[expect(
            clippy::cast_possible_truncation,
            clippy::cast_sign_loss,
            reason = "integral, non-negative and within f64's exact range"
        )]
        let counter = score as u64;
        Ok(counter)
    } else {
        Err(StoreError::decode(format!(
            "score {score} for {member:?} is not a counter"
        )))
    }
}

#[async_trait]
impl ConquestStore for RedisConquestStore {
    async fn ping(&self) -> Result<(), StoreError> {
        let _: String = self.run("PING", redis::cmd("PING")).await?;
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let mut cmd = redis::cmd("GET");
        cmd.arg(key);
        self.run("GET", cmd).await
    }

    async fn set_with_ttl(&self, key: &str, value: &str, ttl: Duration) -> Result<(), StoreError> {
        let mut cmd = redis::cmd("SET");
        cmd.arg(key).arg(value).arg("EX").arg(ttl.as_secs().max(1));
        let _: () = self.run("SET", cmd).await?;
        Ok(())
    }

    async fn increment(&self, key: &str) -> Result<u64, StoreError> {
        let mut cmd = redis::cmd("INCR");
        cmd.arg(key);
        self.run("INCR", cmd).await
    }

    async fn hash_get(
        &self,
        key: &str,
        fields: &[String],
    ) -> Result<Vec<Option<String>>, StoreError> {
        if fields.is_empty() {
            return Ok(Vec::new());
        }
        let mut cmd = redis::cmd("HMGET");
        cmd.arg(key);
        for field in fields {
            cmd.arg(field.as_str());
        }
        self.run("HMGET", cmd).await
    }

    async fn hash_set(&self, key: &str, entries: &[(String, String)]) -> Result<(), StoreError> {
        if entries.is_empty() {
            return Ok(());
        }
        let mut cmd = redis::cmd("HSET");
        cmd.arg(key);
        for (field, value) in entries {
            cmd.arg(field.as_str()).arg(value.as_str());
        }
        let _: u64 = self.run("HSET", cmd).await?;
        Ok(())
    }

    async fn hash_create(
        &self,
        key: &str,
        entries: &[(String, String)],
    ) -> Result<bool, StoreError> {
        let mut cmd = redis::cmd("EVAL");
        cmd.arg(CREATE_HASH_SCRIPT).arg(1).arg(key);
        for (field, value) in entries {
            cmd.arg(field.as_str()).arg(value.as_str());
        }
        let written: u8 = self.run("EVAL", cmd).await?;
        Ok(written == 1)
    }

    async fn set_bit(&self, key: &str, offset: u64, value: bool) -> Result<bool, StoreError> {
        let mut cmd = redis::cmd("SETBIT");
        cmd.arg(key).arg(offset).arg(u8::from(value));
        let previous: u8 = self.run("SETBIT", cmd).await?;
        Ok(previous == 1)
    }

    async fn bit_count(&self, key: &str, range: BitRange) -> Result<u64, StoreError> {
        let mut cmd = redis::cmd("BITCOUNT");
        cmd.arg(key).arg(range.start()).arg(range.end()).arg("BIT");
        self.run("BITCOUNT", cmd).await
    }

    async fn first_set_bit(&self, key: &str, range: BitRange) -> Result<Option<u64>, StoreError> {
        let mut cmd = redis::cmd("BITPOS");
        cmd.arg(key)
            .arg(1)
            .arg(range.start())
            .arg(range.end())
            .arg("BIT");
        let position: i64 = self.run("BITPOS", cmd).await?;
        Ok(u64::try_from(position).ok())
    }

    async fn ranked_add(&self, key: &str, member: &str, score: u64) -> Result<(), StoreError> {
        let mut cmd = redis::cmd("ZADD");
        cmd.arg(key).arg(score).arg(member);
        let _: u64 = self.run("ZADD", cmd).await?;
        Ok(())
    }

    async fn ranked_increment(
        &self,
        key: &str,
        member: &str,
        delta: u64,
    ) -> Result<u64, StoreError> {
        let mut cmd = redis::cmd("ZINCRBY");
        cmd.arg(key).arg(delta).arg(member);
        let score: f64 = self.run("ZINCRBY", cmd).await?;
        score_to_u64(member, score)
    }

    async fn ranked_members(&self, key: &str) -> Result<Vec<RankedMember>, StoreError> {
        let mut cmd = redis::cmd("ZRANGE");
        cmd.arg(key).arg(0).arg(-1).arg("WITHSCORES");
        let pairs: Vec<(String, f64)> = self.run("ZRANGE", cmd).await?;
        pairs
            .into_iter()
            .map(|(member, score)| {
                let score = score_to_u64(&member, score)?;
                Ok(RankedMember { member, score })
            })
            .collect()
    }
}
