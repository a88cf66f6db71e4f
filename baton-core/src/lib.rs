//! # Baton Core
//!
//! Shared building blocks for running several identical workers that agree
//! on a single leader through an external key-value store.
//!
//! ## Components
//!
//! - **Types**: [`ProcessId`], [`Role`], [`Message`] and the [`LeaseKeys`]
//!   naming the store-resident objects
//! - **Store capability**: the [`LeaseStore`] trait with the six primitives
//!   the election and queueing logic rely on
//! - **Errors**: [`StoreError`] for backend faults and [`BatonError`] for
//!   everything above the store
//!
//! The election algorithm itself lives in `baton-worker`; concrete stores
//! live in `baton-store`.

pub mod error;
pub mod store;
pub mod types;

pub use error::*;
pub use store::LeaseStore;
pub use types::*;
