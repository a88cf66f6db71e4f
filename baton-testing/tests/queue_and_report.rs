//! Queue delivery, failure recording and the diagnostic report.

use baton_core::{LeaseStore, ProcessId, Role};
use baton_store::InMemoryStore;
use baton_testing::{init_test_logging, ClusterHarness};
use baton_worker::{
    DiagnosticReporter, ElectionController, ErrorSink, FailureInjector, FollowerLoop,
    WorkerConfig,
};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

#[tokio::test]
async fn test_queue_is_fifo() {
    let store = InMemoryStore::new();
    for payload in ["first", "second", "third"] {
        store.enqueue("messages", payload).await.unwrap();
    }

    let mut received = Vec::new();
    while let Some(payload) = store
        .blocking_dequeue("messages", Duration::from_millis(10))
        .await
        .unwrap()
    {
        received.push(payload);
    }

    assert_eq!(received, vec!["first", "second", "third"]);
}

#[tokio::test(start_paused = true)]
async fn test_each_message_is_consumed_once() {
    init_test_logging();
    let store = Arc::new(InMemoryStore::new());
    let config = WorkerConfig::default().with_randomization_seed(5);
    let mut cluster = ClusterHarness::with_store(Arc::clone(&store), config);

    let leader = cluster.spawn_worker(1).unwrap();
    assert!(leader.wait_for_role(Role::Leader, Duration::from_millis(50)).await);
    for id in 2..=4 {
        // Every consumed message ends up in the error list.
        let follower = cluster
            .spawn_worker_with(id, FailureInjector::always())
            .unwrap();
        assert!(follower.wait_for_role(Role::Follower, Duration::from_millis(50)).await);
    }

    tokio::time::sleep(Duration::from_secs(6)).await;
    let stats = cluster.shutdown().await;
    assert_eq!(stats.len(), 4);

    let produced: u64 = stats.iter().map(|(_, s)| s.messages_produced).sum();
    let consumed: u64 = stats.iter().map(|(_, s)| s.messages_consumed).sum();
    let flagged: u64 = stats.iter().map(|(_, s)| s.messages_flagged).sum();
    assert!(produced >= 25);
    assert!(consumed > 0);
    assert_eq!(consumed, flagged);
    assert_eq!(produced, consumed + store.list_len("messages") as u64);

    let recorded = store.list_snapshot("errors");
    let unique: HashSet<_> = recorded.iter().collect();
    assert_eq!(recorded.len() as u64, consumed);
    assert_eq!(unique.len(), recorded.len());

    let leaders: Vec<ProcessId> = stats
        .iter()
        .filter(|(_, s)| s.messages_produced > 0)
        .map(|(id, _)| *id)
        .collect();
    assert_eq!(leaders, vec![ProcessId::new(1)]);
}

#[tokio::test]
async fn test_failure_rate_matches_probability() {
    let store = Arc::new(InMemoryStore::new());
    let config = WorkerConfig::default();
    store
        .set_if_absent(&config.keys.lease, "1", Duration::from_secs(60))
        .await
        .unwrap();

    const MESSAGES: usize = 10_000;
    for i in 0..MESSAGES {
        store
            .enqueue(&config.keys.queue, &format!("m{}", i))
            .await
            .unwrap();
    }

    let mut controller = ElectionController::new(Arc::clone(&store), ProcessId::new(2), &config);
    assert_eq!(controller.attempt_election().await, Role::Follower);
    let mut injector = FailureInjector::new(0.05, Some(2024)).unwrap();
    let sink = ErrorSink::new(Arc::clone(&store), config.keys.errors.clone());

    let mut follower = FollowerLoop::new(&mut controller, &config, &mut injector, &sink);
    for _ in 0..MESSAGES {
        assert!(follower.consume_tick().await.is_some());
    }

    let flagged = store.list_len(&config.keys.errors);
    let rate = flagged as f64 / MESSAGES as f64;
    assert!((rate - 0.05).abs() < 0.01, "observed rate {}", rate);
    assert_eq!(controller.stats().messages_flagged, flagged as u64);
    assert_eq!(controller.stats().messages_consumed, MESSAGES as u64);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_report_races_with_recording_without_loss() {
    init_test_logging();
    let store = Arc::new(InMemoryStore::new());
    let reporter = DiagnosticReporter::new(Arc::clone(&store), "errors");

    const RECORDS: usize = 2_000;
    let writer = {
        let store = Arc::clone(&store);
        tokio::spawn(async move {
            for i in 0..RECORDS {
                store.enqueue("errors", &format!("e{}", i)).await.unwrap();
                if i % 50 == 0 {
                    tokio::task::yield_now().await;
                }
            }
        })
    };

    let mut seen = Vec::new();
    while !writer.is_finished() {
        seen.extend(reporter.report_and_clear().await.unwrap().records);
        tokio::task::yield_now().await;
    }
    writer.await.unwrap();
    seen.extend(reporter.report_and_clear().await.unwrap().records);

    assert_eq!(seen.len(), RECORDS);
    let unique: HashSet<_> = seen.iter().collect();
    assert_eq!(unique.len(), RECORDS);
    assert!(reporter.report_and_clear().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_report_lists_records_in_order() {
    let store = Arc::new(InMemoryStore::new());
    for payload in ["x1", "x2"] {
        store.enqueue("errors", payload).await.unwrap();
    }

    let report = DiagnosticReporter::new(Arc::clone(&store), "errors")
        .report_and_clear()
        .await
        .unwrap();

    assert_eq!(report.records, vec!["x1", "x2"]);
    assert!(report.to_string().starts_with("2 failed message(s) in errors"));
    assert_eq!(store.list_len("errors"), 0);
}
