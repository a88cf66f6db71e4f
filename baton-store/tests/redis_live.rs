//! Runs against a live Redis server: `BATON_REDIS_URL=redis://... cargo test -- --ignored`

use baton_core::LeaseStore;
use baton_store::{RedisStore, StoreConfig};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

fn live_store(max_idle: usize) -> RedisStore {
    let url = std::env::var("BATON_REDIS_URL")
        .unwrap_or_else(|_| "redis://127.0.0.1:6379".to_string());
    RedisStore::new(StoreConfig::new(url).with_max_idle(max_idle)).unwrap()
}

/// Key prefix unique to one test run.
fn scoped(name: &str) -> String {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_nanos();
    format!("baton-test:{}:{}:{}", std::process::id(), nanos, name)
}

#[tokio::test]
#[ignore = "needs a running Redis server"]
async fn test_lease_commands() {
    let store = live_store(5);
    let key = scoped("lease");
    let ttl = Duration::from_millis(2000);

    assert!(store.set_if_absent(&key, "1", ttl).await.unwrap());
    assert!(!store.set_if_absent(&key, "2", ttl).await.unwrap());
    assert_eq!(store.get(&key).await.unwrap().as_deref(), Some("1"));
    assert!(store.extend_expiry(&key, ttl).await.unwrap());

    let missing = scoped("missing");
    assert_eq!(store.get(&missing).await.unwrap(), None);
    assert!(!store.extend_expiry(&missing, ttl).await.unwrap());

    // Expire quickly so the key does not linger.
    assert!(store.extend_expiry(&key, Duration::from_millis(50)).await.unwrap());
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(store.get(&key).await.unwrap(), None);
}

#[tokio::test]
#[ignore = "needs a running Redis server"]
async fn test_queue_and_drain_commands() {
    let store = live_store(5);
    let queue = scoped("messages");
    let errors = scoped("errors");

    store.enqueue(&queue, "a").await.unwrap();
    store.enqueue(&queue, "b").await.unwrap();
    let timeout = Duration::from_millis(1000);
    assert_eq!(store.blocking_dequeue(&queue, timeout).await.unwrap().as_deref(), Some("a"));
    assert_eq!(store.blocking_dequeue(&queue, timeout).await.unwrap().as_deref(), Some("b"));
    assert_eq!(store.blocking_dequeue(&queue, timeout).await.unwrap(), None);

    assert!(store.drain_list(&errors).await.unwrap().is_empty());
    for payload in ["x", "y"] {
        store.enqueue(&errors, payload).await.unwrap();
    }
    assert_eq!(store.drain_list(&errors).await.unwrap(), vec!["x", "y"]);
    assert!(store.drain_list(&errors).await.unwrap().is_empty());
}

#[tokio::test]
#[ignore = "needs a running Redis server"]
async fn test_connections_return_to_pool() {
    let store = live_store(1);
    let key = scoped("pooled");
    assert_eq!(store.pool_stats().idle_connections, 0);

    assert_eq!(store.get(&key).await.unwrap(), None);
    assert_eq!(store.pool_stats().idle_connections, 1);

    // Reused after a PING on borrow; the idle set never grows past max_idle.
    for _ in 0..3 {
        assert_eq!(store.get(&key).await.unwrap(), None);
    }
    assert_eq!(store.pool_stats().idle_connections, 1);
}
