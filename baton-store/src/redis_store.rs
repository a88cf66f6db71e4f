//! # Redis Lease Store
//!
//! Maps the lease store primitives onto Redis commands:
//!
//! | Primitive | Command |
//! |---|---|
//! | `set_if_absent` | `SET key value NX PX ttl` |
//! | `get` | `GET key` |
//! | `extend_expiry` | `PEXPIRE key ttl` |
//! | `enqueue` | `RPUSH list value` |
//! | `blocking_dequeue` | `BLPOP list timeout` |
//! | `drain_list` | `MULTI; LRANGE list 0 -1; DEL list; EXEC` |

use crate::{ConnectionPool, PoolStats, StoreConfig};
use async_trait::async_trait;
use baton_core::{LeaseStore, StoreError, StoreResult};
use redis::{RedisError, RedisResult, Value};
use std::time::Duration;
use tracing::debug;

pub(crate) fn store_error(err: RedisError) -> StoreError {
    if err.is_timeout() {
        StoreError::timeout(err.to_string())
    } else if err.is_io_error() || err.is_connection_dropped() || err.is_connection_refusal() {
        StoreError::connection(err.to_string())
    } else {
        StoreError::protocol(err.to_string())
    }
}

fn ttl_millis(ttl: Duration) -> u64 {
    (ttl.as_millis() as u64).max(1)
}

/// `BLPOP` takes whole seconds and treats 0 as "block forever", so round up
/// and never go below one second.
fn blpop_seconds(timeout: Duration) -> u64 {
    let millis = timeout.as_millis() as u64;
    millis.div_ceil(1000).max(1)
}

/// `SET .. NX` answers OK when it wrote and nil when the key already existed.
fn decode_set_reply(reply: &Value) -> RedisResult<bool> {
    let reply: Option<String> = redis::from_redis_value(reply)?;
    Ok(reply.is_some())
}

/// `PEXPIRE` answers 1 when the key existed, 0 otherwise.
fn decode_expire_reply(reply: &Value) -> RedisResult<bool> {
    redis::from_redis_value(reply)
}

/// `BLPOP` answers nil on timeout, otherwise a `[list, value]` pair.
fn decode_blpop_reply(reply: &Value) -> RedisResult<Option<String>> {
    let reply: Option<(String, String)> = redis::from_redis_value(reply)?;
    Ok(reply.map(|(_list, value)| value))
}

/// The drain transaction yields one result, the `LRANGE` array; `DEL` is ignored.
fn decode_drain_reply(reply: &Value) -> RedisResult<Vec<String>> {
    let (records,): (Vec<String>,) = redis::from_redis_value(reply)?;
    Ok(records)
}

/// [`LeaseStore`] backed by a Redis server.
pub struct RedisStore {
    pool: ConnectionPool,
}

impl RedisStore {
    pub fn new(config: StoreConfig) -> StoreResult<Self> {
        debug!("Creating Redis store for {}", config.url);
        Ok(Self {
            pool: ConnectionPool::new(config)?,
        })
    }

    pub fn pool_stats(&self) -> PoolStats {
        self.pool.stats()
    }
}

#[async_trait]
impl LeaseStore for RedisStore {
    async fn set_if_absent(&self, key: &str, value: &str, ttl: Duration) -> StoreResult<bool> {
        let mut conn = self.pool.get().await?;
        let reply: Value = redis::cmd("SET")
            .arg(key)
            .arg(value)
            .arg("NX")
            .arg("PX")
            .arg(ttl_millis(ttl))
            .query_async(&mut *conn)
            .await
            .map_err(store_error)?;
        decode_set_reply(&reply).map_err(store_error)
    }

    async fn get(&self, key: &str) -> StoreResult<Option<String>> {
        let mut conn = self.pool.get().await?;
        let value: Option<String> = redis::cmd("GET")
            .arg(key)
            .query_async(&mut *conn)
            .await
            .map_err(store_error)?;
        Ok(value)
    }

    async fn extend_expiry(&self, key: &str, ttl: Duration) -> StoreResult<bool> {
        let mut conn = self.pool.get().await?;
        let reply: Value = redis::cmd("PEXPIRE")
            .arg(key)
            .arg(ttl_millis(ttl))
            .query_async(&mut *conn)
            .await
            .map_err(store_error)?;
        decode_expire_reply(&reply).map_err(store_error)
    }

    async fn enqueue(&self, list: &str, value: &str) -> StoreResult<()> {
        let mut conn = self.pool.get().await?;
        let _length: i64 = redis::cmd("RPUSH")
            .arg(list)
            .arg(value)
            .query_async(&mut *conn)
            .await
            .map_err(store_error)?;
        Ok(())
    }

    async fn blocking_dequeue(&self, list: &str, timeout: Duration) -> StoreResult<Option<String>> {
        let mut conn = self.pool.get().await?;
        let reply: Value = redis::cmd("BLPOP")
            .arg(list)
            .arg(blpop_seconds(timeout))
            .query_async(&mut *conn)
            .await
            .map_err(store_error)?;
        decode_blpop_reply(&reply).map_err(store_error)
    }

    async fn drain_list(&self, list: &str) -> StoreResult<Vec<String>> {
        let mut conn = self.pool.get().await?;
        let reply: Value = redis::pipe()
            .atomic()
            .cmd("LRANGE")
            .arg(list)
            .arg(0)
            .arg(-1)
            .cmd("DEL")
            .arg(list)
            .ignore()
            .query_async(&mut *conn)
            .await
            .map_err(store_error)?;
        decode_drain_reply(&reply).map_err(store_error)
    }
}
