//! # Connection Pool
//!
//! Keeps a bounded set of idle Redis connections. A [`PooledConnection`] is
//! handed out per store operation and goes back to the idle set when it is
//! dropped, on success and error paths alike.

use crate::redis_store::store_error;
use crate::StoreConfig;
use baton_core::{StoreError, StoreResult};
use parking_lot::Mutex;
use redis::aio::MultiplexedConnection;
use std::collections::VecDeque;
use std::ops::{Deref, DerefMut};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tracing::debug;

/// Idle connections ordered by the time they were returned, oldest first.
#[derive(Debug)]
struct IdleSet<C> {
    entries: VecDeque<(C, Instant)>,
    max_idle: usize,
    idle_timeout: Duration,
}

impl<C> IdleSet<C> {
    fn new(max_idle: usize, idle_timeout: Duration) -> Self {
        Self {
            entries: VecDeque::with_capacity(max_idle),
            max_idle,
            idle_timeout,
        }
    }

    /// Evict entries idle longer than the timeout, then hand out the most
    /// recently returned one.
    fn checkout(&mut self) -> Option<C> {
        while let Some((_, returned_at)) = self.entries.front() {
            if returned_at.elapsed() <= self.idle_timeout {
                break;
            }
            debug!("Dropping connection idle for {:?}", returned_at.elapsed());
            self.entries.pop_front();
        }
        self.entries.pop_back().map(|(connection, _)| connection)
    }

    /// Returns false when the set is full and the connection was dropped.
    fn checkin(&mut self, connection: C) -> bool {
        if self.entries.len() >= self.max_idle {
            return false;
        }
        self.entries.push_back((connection, Instant::now()));
        true
    }

    fn len(&self) -> usize {
        self.entries.len()
    }
}

/// Pool of Redis connections built from one client.
pub struct ConnectionPool {
    client: redis::Client,
    idle: Arc<Mutex<IdleSet<MultiplexedConnection>>>,
    config: StoreConfig,
}

impl ConnectionPool {
    pub fn new(config: StoreConfig) -> StoreResult<Self> {
        let client = redis::Client::open(config.url.as_str())
            .map_err(|e| StoreError::connection(format!("Invalid store URL {}: {}", config.url, e)))?;

        Ok(Self {
            client,
            idle: Arc::new(Mutex::new(IdleSet::new(
                config.max_idle,
                config.idle_timeout,
            ))),
            config,
        })
    }

    /// Get a connection, reusing an idle one when it is still fresh and healthy.
    pub async fn get(&self) -> StoreResult<PooledConnection> {
        loop {
            let candidate = self.idle.lock().checkout();
            let Some(mut connection) = candidate else {
                break;
            };

            if self.config.test_on_borrow {
                let ping: redis::RedisResult<String> =
                    redis::cmd("PING").query_async(&mut connection).await;
                if let Err(e) = ping {
                    debug!("Dropping pooled connection that failed PING: {}", e);
                    continue;
                }
            }

            return Ok(self.wrap(connection));
        }

        let connection = self
            .client
            .get_multiplexed_async_connection()
            .await
            .map_err(store_error)?;
        debug!("Opened new store connection");
        Ok(self.wrap(connection))
    }

    pub fn stats(&self) -> PoolStats {
        PoolStats {
            idle_connections: self.idle.lock().len(),
            max_idle: self.config.max_idle,
        }
    }

    fn wrap(&self, connection: MultiplexedConnection) -> PooledConnection {
        PooledConnection {
            connection,
            pool: Arc::clone(&self.idle),
        }
    }
}

/// A connection that returns to the pool when dropped
pub struct PooledConnection {
    connection: MultiplexedConnection,
    pool: Arc<Mutex<IdleSet<MultiplexedConnection>>>,
}

impl Deref for PooledConnection {
    type Target = MultiplexedConnection;

    fn deref(&self) -> &Self::Target {
        &self.connection
    }
}

impl DerefMut for PooledConnection {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.connection
    }
}

impl Drop for PooledConnection {
    fn drop(&mut self) {
        if !self.pool.lock().checkin(self.connection.clone()) {
            debug!("Idle set full, closing connection");
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PoolStats {
    pub idle_connections: usize,
    pub max_idle: usize,
}
