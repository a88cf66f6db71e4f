//! # Baton Worker
//!
//! Runs one of several identical worker processes that agree on a single
//! leader through a shared store.
//!
//! This crate provides:
//! - The [`ElectionController`], which takes the lease with a conditional
//!   write and owns the process's [`Role`](baton_core::Role)
//! - The [`LeaderLoop`], which renews the lease and produces messages
//! - The [`FollowerLoop`], which consumes messages, flags simulated delivery
//!   failures into the [`ErrorSink`], and retries the election
//! - The [`DiagnosticReporter`], which reads and clears the error list
//! - The [`Worker`] driver tying the pieces together
//!
//! ## Example
//!
//! ```rust,no_run
//! use baton_core::ProcessId;
//! use baton_store::{RedisStore, StoreConfig};
//! use baton_worker::{Worker, WorkerConfig};
//! use std::sync::Arc;
//!
//! # async fn example() -> baton_core::Result<()> {
//! let store = Arc::new(RedisStore::new(StoreConfig::default())?);
//! let worker = Worker::new(store, ProcessId::current(), WorkerConfig::default())?;
//! let handle = worker.handle();
//! tokio::spawn(async move {
//!     tokio::signal::ctrl_c().await.ok();
//!     handle.shutdown();
//! });
//! worker.run().await?;
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod election;
pub mod follower;
pub mod leader;
pub mod policy;
pub mod report;
pub mod schedule;
pub mod sink;
pub mod worker;

pub use config::WorkerConfig;
pub use election::{ElectionController, WorkerStats};
pub use follower::FollowerLoop;
pub use leader::LeaderLoop;
pub use policy::FailureInjector;
pub use report::{DiagnosticReporter, ErrorReport};
pub use schedule::LoopOutcome;
pub use sink::ErrorSink;
pub use worker::{Worker, WorkerHandle};
