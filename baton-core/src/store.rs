//! # Store Capability
//!
//! The six primitives the election and queueing logic need from the shared
//! store. The election algorithm only ever talks to this trait, so it runs
//! unchanged against Redis in production and against an in-memory fake in
//! tests.

use crate::StoreResult;
use async_trait::async_trait;
use std::time::Duration;

/// Shared key-value store used as the only coordination medium.
///
/// Implementations must make [`set_if_absent`](Self::set_if_absent) atomic
/// store-wide: it is the sole source of mutual exclusion between workers.
#[async_trait]
pub trait LeaseStore: Send + Sync {
    /// Set `key` to `value` with the given time-to-live, only if the key has
    /// no value.
    ///
    /// # Returns
    /// * `Ok(true)` if this call created the key
    /// * `Ok(false)` if the key was already held
    async fn set_if_absent(&self, key: &str, value: &str, ttl: Duration) -> StoreResult<bool>;

    /// Read the current value of `key`, `None` when absent or expired.
    async fn get(&self, key: &str) -> StoreResult<Option<String>>;

    /// Refresh the time-to-live of an existing key without touching its value.
    ///
    /// Returns `Ok(false)` when there was no key to extend.
    async fn extend_expiry(&self, key: &str, ttl: Duration) -> StoreResult<bool>;

    /// Append `value` to the tail of the list `list`.
    async fn enqueue(&self, list: &str, value: &str) -> StoreResult<()>;

    /// Remove and return the head of `list`, waiting up to `timeout` for one
    /// to arrive. `Ok(None)` means the timeout elapsed.
    async fn blocking_dequeue(&self, list: &str, timeout: Duration) -> StoreResult<Option<String>>;

    /// Atomically return the whole contents of `list` and delete it.
    ///
    /// On error the list must be left untouched.
    async fn drain_list(&self, list: &str) -> StoreResult<Vec<String>>;
}
