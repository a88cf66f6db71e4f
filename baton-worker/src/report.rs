//! Diagnostic read-and-clear of the error list.

use baton_core::{BatonError, LeaseStore, Result};
use serde::Serialize;
use std::fmt;
use std::sync::Arc;
use tracing::{error, info};

/// Everything that was in the error list at the moment it was cleared.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ErrorReport {
    pub list: String,
    pub records: Vec<String>,
}

impl ErrorReport {
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self)
            .map_err(|e| BatonError::internal(format!("Failed to encode report: {}", e)))
    }
}

impl fmt::Display for ErrorReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.records.is_empty() {
            return write!(f, "No failed messages recorded in {}", self.list);
        }

        writeln!(f, "{} failed message(s) in {}:", self.records.len(), self.list)?;
        for (index, record) in self.records.iter().enumerate() {
            writeln!(f, "  {:>4}  {}", index + 1, record)?;
        }
        Ok(())
    }
}

/// Reads and clears the error list in one atomic store transaction.
pub struct DiagnosticReporter<S: LeaseStore> {
    store: Arc<S>,
    list: String,
}

impl<S: LeaseStore> DiagnosticReporter<S> {
    pub fn new(store: Arc<S>, list: impl Into<String>) -> Self {
        Self {
            store,
            list: list.into(),
        }
    }

    /// Return every recorded failure and leave the list empty.
    ///
    /// If the store cannot be reached the list is left exactly as it was.
    pub async fn report_and_clear(&self) -> Result<ErrorReport> {
        let records = self.store.drain_list(&self.list).await.map_err(|e| {
            error!("Failed to read and clear {}: {}", self.list, e);
            e
        })?;

        info!(
            "Cleared {} failed message(s) from {}",
            records.len(),
            self.list
        );

        Ok(ErrorReport {
            list: self.list.clone(),
            records,
        })
    }
}
