//! # In-Memory Lease Store
//!
//! A single-process stand-in for the shared store. Keys carry an optional
//! expiry measured on the tokio clock, so tests running with a paused clock
//! see leases expire deterministically.

use async_trait::async_trait;
use baton_core::{LeaseStore, StoreError, StoreResult};
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;
use tokio::sync::Notify;
use tokio::time::Instant;
use tracing::debug;

#[derive(Debug, Clone)]
struct Entry {
    value: String,
    expires_at: Option<Instant>,
}

impl Entry {
    fn is_expired(&self, now: Instant) -> bool {
        self.expires_at.is_some_and(|at| now >= at)
    }
}

#[derive(Debug, Default)]
struct State {
    keys: HashMap<String, Entry>,
    lists: HashMap<String, VecDeque<String>>,
}

impl State {
    /// Returns the live entry for `key`, evicting it first if it has expired.
    fn live_entry(&mut self, key: &str, now: Instant) -> Option<&mut Entry> {
        if self.keys.get(key).is_some_and(|entry| entry.is_expired(now)) {
            self.keys.remove(key);
            debug!("Key {} expired", key);
        }
        self.keys.get_mut(key)
    }
}

/// Operation counters for the in-memory store
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MemoryStoreStats {
    pub total_operations: u64,
    pub failed_operations: u64,
}

/// In-memory [`LeaseStore`] with a switch for simulating an unreachable store.
///
/// Share it between workers with an `Arc`; every worker then sees the same
/// keys and lists, just as separate processes would see one Redis instance.
#[derive(Debug)]
pub struct InMemoryStore {
    state: Mutex<State>,
    pushed: Notify,
    available: AtomicBool,
    unavailable_lists: Mutex<HashSet<String>>,
    total_operations: AtomicU64,
    failed_operations: AtomicU64,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(State::default()),
            pushed: Notify::new(),
            available: AtomicBool::new(true),
            unavailable_lists: Mutex::new(HashSet::new()),
            total_operations: AtomicU64::new(0),
            failed_operations: AtomicU64::new(0),
        }
    }

    /// While unavailable every operation fails with [`StoreError::Unavailable`]
    /// and leaves the data untouched.
    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    pub fn is_available(&self) -> bool {
        self.available.load(Ordering::SeqCst)
    }

    /// Fail only the list operations on `list`, leaving keys and other lists
    /// reachable.
    pub fn set_list_available(&self, list: &str, available: bool) {
        let mut lists = self.unavailable_lists.lock();
        if available {
            lists.remove(list);
        } else {
            lists.insert(list.to_string());
        }
    }

    /// Remaining time-to-live of `key`, `None` if it is absent, expired or
    /// has no expiry.
    pub fn ttl(&self, key: &str) -> Option<Duration> {
        let now = Instant::now();
        let mut state = self.state.lock();
        state
            .live_entry(key, now)
            .and_then(|entry| entry.expires_at)
            .map(|at| at.saturating_duration_since(now))
    }

    /// Current contents of `list`, head first, without removing anything.
    pub fn list_snapshot(&self, list: &str) -> Vec<String> {
        self.state
            .lock()
            .lists
            .get(list)
            .map(|items| items.iter().cloned().collect())
            .unwrap_or_default()
    }

    pub fn list_len(&self, list: &str) -> usize {
        self.state.lock().lists.get(list).map_or(0, VecDeque::len)
    }

    /// Removes `key` regardless of its expiry.
    pub fn delete(&self, key: &str) -> bool {
        self.state.lock().keys.remove(key).is_some()
    }

    pub fn stats(&self) -> MemoryStoreStats {
        MemoryStoreStats {
            total_operations: self.total_operations.load(Ordering::Relaxed),
            failed_operations: self.failed_operations.load(Ordering::Relaxed),
        }
    }

    fn begin_operation(&self) -> StoreResult<()> {
        self.total_operations.fetch_add(1, Ordering::Relaxed);
        if self.is_available() {
            Ok(())
        } else {
            self.failed_operations.fetch_add(1, Ordering::Relaxed);
            Err(StoreError::Unavailable)
        }
    }

    fn begin_list_operation(&self, list: &str) -> StoreResult<()> {
        self.begin_operation()?;
        if self.unavailable_lists.lock().contains(list) {
            self.failed_operations.fetch_add(1, Ordering::Relaxed);
            return Err(StoreError::Unavailable);
        }
        Ok(())
    }

    fn pop_front(&self, list: &str) -> Option<String> {
        let mut state = self.state.lock();
        let items = state.lists.get_mut(list)?;
        let head = items.pop_front();
        if items.is_empty() {
            state.lists.remove(list);
        }
        head
    }
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl LeaseStore for InMemoryStore {
    async fn set_if_absent(&self, key: &str, value: &str, ttl: Duration) -> StoreResult<bool> {
        self.begin_operation()?;
        let now = Instant::now();
        let mut state = self.state.lock();

        if state.live_entry(key, now).is_some() {
            return Ok(false);
        }

        state.keys.insert(
            key.to_string(),
            Entry {
                value: value.to_string(),
                expires_at: Some(now + ttl),
            },
        );
        debug!("SET NX: key={}, value={}, ttl={:?}", key, value, ttl);
        Ok(true)
    }

    async fn get(&self, key: &str) -> StoreResult<Option<String>> {
        self.begin_operation()?;
        let now = Instant::now();
        let mut state = self.state.lock();
        Ok(state.live_entry(key, now).map(|entry| entry.value.clone()))
    }

    async fn extend_expiry(&self, key: &str, ttl: Duration) -> StoreResult<bool> {
        self.begin_operation()?;
        let now = Instant::now();
        let mut state = self.state.lock();
        match state.live_entry(key, now) {
            Some(entry) => {
                entry.expires_at = Some(now + ttl);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn enqueue(&self, list: &str, value: &str) -> StoreResult<()> {
        self.begin_list_operation(list)?;
        self.state
            .lock()
            .lists
            .entry(list.to_string())
            .or_default()
            .push_back(value.to_string());
        self.pushed.notify_waiters();
        Ok(())
    }

    async fn blocking_dequeue(&self, list: &str, timeout: Duration) -> StoreResult<Option<String>> {
        self.begin_list_operation(list)?;
        let deadline = Instant::now() + timeout;

        loop {
            // Register interest before checking, so a push landing between the
            // check and the wait still wakes us.
            let notified = self.pushed.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            if let Some(value) = self.pop_front(list) {
                return Ok(Some(value));
            }

            if tokio::time::timeout_at(deadline, notified).await.is_err() {
                return Ok(None);
            }
        }
    }

    async fn drain_list(&self, list: &str) -> StoreResult<Vec<String>> {
        self.begin_list_operation(list)?;
        let drained = self.state.lock().lists.remove(list);
        Ok(drained.map(Vec::from).unwrap_or_default())
    }
}
