//! # Error Types
//!
//! Error handling for store access and worker setup.

use thiserror::Error;

/// Failures reported by a [`LeaseStore`](crate::LeaseStore) backend.
///
/// Every variant is a communication-level fault. Inside the role loops these
/// are logged and the loop continues on its next tick; none of them is fatal
/// in run mode.
///
/// # Examples
///
/// ```rust
/// use baton_core::StoreError;
///
/// let error = StoreError::connection("Connection refused");
/// assert_eq!(error.to_string(), "Connection error: Connection refused");
/// ```
#[derive(Error, Debug, Clone, PartialEq)]
pub enum StoreError {
    /// Could not reach the store or the connection dropped mid-command
    #[error("Connection error: {message}")]
    Connection { message: String },

    /// The store did not answer in time
    #[error("Store operation timed out: {operation}")]
    Timeout { operation: String },

    /// The store answered with something the client could not interpret
    #[error("Protocol error: {message}")]
    Protocol { message: String },

    /// The store is deliberately refusing requests
    #[error("Store unavailable")]
    Unavailable,
}

impl StoreError {
    pub fn connection(message: impl Into<String>) -> Self {
        Self::Connection {
            message: message.into(),
        }
    }

    pub fn timeout(operation: impl Into<String>) -> Self {
        Self::Timeout {
            operation: operation.into(),
        }
    }

    pub fn protocol(message: impl Into<String>) -> Self {
        Self::Protocol {
            message: message.into(),
        }
    }
}

/// Top-level error for building and driving a worker.
#[derive(Error, Debug)]
pub enum BatonError {
    /// Store access failed
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// Configuration rejected by validation
    #[error("Configuration error: {reason}")]
    Config { reason: String },

    /// Unexpected internal error
    #[error("Internal error: {reason}")]
    Internal { reason: String },
}

impl BatonError {
    pub fn config(reason: impl Into<String>) -> Self {
        Self::Config {
            reason: reason.into(),
        }
    }

    pub fn internal(reason: impl Into<String>) -> Self {
        Self::Internal {
            reason: reason.into(),
        }
    }
}

/// Result alias used across the Baton crates.
pub type Result<T> = std::result::Result<T, BatonError>;

/// Result alias for raw store operations.
pub type StoreResult<T> = std::result::Result<T, StoreError>;
