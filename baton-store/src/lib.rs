//! # Baton Store
//!
//! Concrete [`LeaseStore`](baton_core::LeaseStore) backends.
//!
//! - [`RedisStore`]: the production backend, one pooled connection per operation
//! - [`InMemoryStore`]: a TTL-aware fake sharing state through an `Arc`, with a
//!   switch for simulating store outages
//!
//! ## Example
//!
//! ```rust
//! use baton_core::LeaseStore;
//! use baton_store::InMemoryStore;
//! use std::time::Duration;
//!
//! # tokio_test::block_on(async {
//! let store = InMemoryStore::new();
//! let ttl = Duration::from_secs(2);
//! assert!(store.set_if_absent("MAIN_KEY", "101", ttl).await.unwrap());
//! assert!(!store.set_if_absent("MAIN_KEY", "202", ttl).await.unwrap());
//! # });
//! ```

pub mod config;
pub mod memory;
pub mod pool;
pub mod redis_store;

pub use config::StoreConfig;
pub use memory::{InMemoryStore, MemoryStoreStats};
pub use pool::{ConnectionPool, PoolStats, PooledConnection};
pub use redis_store::RedisStore;
