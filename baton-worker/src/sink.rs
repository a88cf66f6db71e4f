use baton_core::{LeaseStore, Message, StoreResult};
use std::sync::Arc;
use tracing::debug;

/// Write-only handle on the durable list of flagged payloads.
pub struct ErrorSink<S: LeaseStore> {
    store: Arc<S>,
    list: String,
}

impl<S: LeaseStore> ErrorSink<S> {
    pub fn new(store: Arc<S>, list: impl Into<String>) -> Self {
        Self {
            store,
            list: list.into(),
        }
    }

    /// Append a flagged payload to the error list.
    pub async fn record(&self, message: &Message) -> StoreResult<()> {
        self.store.enqueue(&self.list, message.payload()).await?;
        debug!("Recorded failed message {} in {}", message, self.list);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use baton_store::InMemoryStore;

    #[tokio::test]
    async fn test_records_append_in_order() {
        let store = Arc::new(InMemoryStore::new());
        let sink = ErrorSink::new(Arc::clone(&store), "errors");

        sink.record(&Message::new("first")).await.unwrap();
        sink.record(&Message::new("second")).await.unwrap();

        assert_eq!(store.list_snapshot("errors"), vec!["first", "second"]);
    }

    #[tokio::test]
    async fn test_record_surfaces_store_failure() {
        let store = Arc::new(InMemoryStore::new());
        store.set_available(false);
        let sink = ErrorSink::new(Arc::clone(&store), "errors");

        assert!(sink.record(&Message::new("lost")).await.is_err());
        store.set_available(true);
        assert_eq!(store.list_len("errors"), 0);
    }
}
