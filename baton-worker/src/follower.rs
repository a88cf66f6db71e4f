//! Follower role: drain the work queue and wait for a chance to lead.

use crate::schedule::{periodic, LoopOutcome};
use crate::{ElectionController, ErrorSink, FailureInjector, WorkerConfig};
use baton_core::{LeaseStore, Message, Role};
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

/// Runs while this process is Follower.
///
/// The consume timer performs one blocking dequeue (bounded by half the
/// lease TTL) per tick; the re-election timer retries the election once per
/// lease lifetime.
pub struct FollowerLoop<'a, S: LeaseStore> {
    controller: &'a mut ElectionController<S>,
    config: &'a WorkerConfig,
    injector: &'a mut FailureInjector,
    sink: &'a ErrorSink<S>,
}

impl<'a, S: LeaseStore> FollowerLoop<'a, S> {
    pub fn new(
        controller: &'a mut ElectionController<S>,
        config: &'a WorkerConfig,
        injector: &'a mut FailureInjector,
        sink: &'a ErrorSink<S>,
    ) -> Self {
        Self {
            controller,
            config,
            injector,
            sink,
        }
    }

    pub async fn run(&mut self, shutdown: &mut watch::Receiver<bool>) -> LoopOutcome {
        info!("Process {} running as follower", self.controller.process_id());

        let mut consume = periodic(self.config.consume_interval);
        let mut reelect = periodic(self.config.reelection_interval());

        loop {
            if *shutdown.borrow() {
                return LoopOutcome::Shutdown;
            }

            // Polled in order: a due re-election runs before a due dequeue.
            tokio::select! {
                biased;

                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        return LoopOutcome::Shutdown;
                    }
                }
                _ = reelect.tick() => {
                    if let Some(role) = self.reelection_tick().await {
                        return LoopOutcome::Transition(role);
                    }
                }
                _ = consume.tick() => {
                    self.consume_tick().await;
                }
            }
        }
    }

    /// Wait for one message and run the delivery check on it.
    ///
    /// Returns the consumed message, if any arrived before the timeout.
    pub async fn consume_tick(&mut self) -> Option<Message> {
        let timeout = self.config.dequeue_timeout();
        let message = match self
            .controller
            .store()
            .blocking_dequeue(&self.config.keys.queue, timeout)
            .await
        {
            Ok(Some(payload)) => Message::from(payload),
            Ok(None) => {
                debug!("No message within {:?}", timeout);
                return None;
            }
            Err(e) => {
                self.controller.update_stats(|s| s.store_errors += 1);
                error!("Failed to dequeue message: {}", e);
                return None;
            }
        };

        self.controller.update_stats(|s| s.messages_consumed += 1);
        debug!(
            "Follower {} received message {}",
            self.controller.process_id(),
            message
        );

        if self.injector.should_fail() {
            warn!("Delivery of message {} failed, recording it", message);
            match self.sink.record(&message).await {
                Ok(()) => self.controller.update_stats(|s| s.messages_flagged += 1),
                Err(e) => {
                    self.controller.update_stats(|s| s.store_errors += 1);
                    error!("Failed to record failed message {}: {}", message, e);
                }
            }
        }

        Some(message)
    }

    /// Retry the election; returns `Some(Role::Leader)` when it was won.
    pub async fn reelection_tick(&mut self) -> Option<Role> {
        let role = self.controller.attempt_election().await;
        role.is_leader().then_some(role)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use baton_core::ProcessId;
    use baton_store::InMemoryStore;
    use std::sync::Arc;
    use std::time::Duration;
    use tokio::time::Instant;

    struct Fixture {
        store: Arc<InMemoryStore>,
        controller: ElectionController<InMemoryStore>,
        config: WorkerConfig,
        sink: ErrorSink<InMemoryStore>,
    }

    /// Process 20 is Follower because process 10 already holds the lease.
    async fn follower() -> Fixture {
        let store = Arc::new(InMemoryStore::new());
        let config = WorkerConfig::default();
        store
            .set_if_absent("MAIN_KEY", "10", config.lease_ttl)
            .await
            .unwrap();

        let mut controller =
            ElectionController::new(Arc::clone(&store), ProcessId::new(20), &config);
        assert_eq!(controller.attempt_election().await, Role::Follower);
        let sink = ErrorSink::new(Arc::clone(&store), config.keys.errors.clone());

        Fixture {
            store,
            controller,
            config,
            sink,
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_empty_queue_times_out_after_half_ttl() {
        let mut f = follower().await;
        let mut injector = FailureInjector::never();
        let mut follower = FollowerLoop::new(&mut f.controller, &f.config, &mut injector, &f.sink);

        let started = Instant::now();
        assert_eq!(follower.consume_tick().await, None);
        assert!(started.elapsed() >= Duration::from_millis(1000));
        assert_eq!(f.controller.stats().store_errors, 0);
    }

    #[tokio::test]
    async fn test_delivered_message_is_not_recorded() {
        let mut f = follower().await;
        f.store.enqueue("messages", "ok-1").await.unwrap();
        let mut injector = FailureInjector::never();

        let mut follower = FollowerLoop::new(&mut f.controller, &f.config, &mut injector, &f.sink);
        assert_eq!(follower.consume_tick().await, Some(Message::new("ok-1")));

        assert_eq!(f.store.list_len("errors"), 0);
        assert_eq!(f.controller.stats().messages_consumed, 1);
    }

    #[tokio::test]
    async fn test_flagged_message_goes_to_error_list() {
        let mut f = follower().await;
        f.store.enqueue("messages", "bad-1").await.unwrap();
        let mut injector = FailureInjector::always();

        let mut follower = FollowerLoop::new(&mut f.controller, &f.config, &mut injector, &f.sink);
        follower.consume_tick().await;

        assert_eq!(f.store.list_snapshot("errors"), vec!["bad-1"]);
        assert_eq!(f.controller.stats().messages_flagged, 1);
    }

    #[tokio::test]
    async fn test_dequeue_failure_is_logged_and_skipped() {
        let mut f = follower().await;
        f.store.set_available(false);
        let mut injector = FailureInjector::always();

        let mut follower = FollowerLoop::new(&mut f.controller, &f.config, &mut injector, &f.sink);
        assert_eq!(follower.consume_tick().await, None);
        assert_eq!(f.controller.stats().store_errors, 1);
        assert_eq!(f.controller.role(), Role::Follower);
    }

    #[tokio::test]
    async fn test_error_list_failure_is_logged_and_consumption_continues() {
        let mut f = follower().await;
        f.store.enqueue("messages", "bad-1").await.unwrap();
        f.store.enqueue("messages", "bad-2").await.unwrap();
        f.store.set_list_available("errors", false);
        let mut injector = FailureInjector::always();

        let mut follower = FollowerLoop::new(&mut f.controller, &f.config, &mut injector, &f.sink);
        assert_eq!(follower.consume_tick().await, Some(Message::new("bad-1")));
        assert_eq!(follower.consume_tick().await, Some(Message::new("bad-2")));

        let stats = f.controller.stats();
        assert_eq!(stats.messages_consumed, 2);
        assert_eq!(stats.messages_flagged, 0);
        assert_eq!(stats.store_errors, 2);
        assert_eq!(f.controller.role(), Role::Follower);
        assert_eq!(f.store.list_len("messages"), 0);
        assert_eq!(f.store.list_len("errors"), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_reelection_wins_after_lease_expires() {
        let mut f = follower().await;
        let mut injector = FailureInjector::never();
        let mut follower = FollowerLoop::new(&mut f.controller, &f.config, &mut injector, &f.sink);

        assert_eq!(follower.reelection_tick().await, None);
        tokio::time::advance(Duration::from_millis(2000)).await;
        assert_eq!(follower.reelection_tick().await, Some(Role::Leader));
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_hands_over_when_lease_frees_up() {
        let mut f = follower().await;
        let (_shutdown_tx, mut shutdown_rx) = watch::channel(false);
        let mut injector = FailureInjector::never();

        let mut follower = FollowerLoop::new(&mut f.controller, &f.config, &mut injector, &f.sink);
        let started = Instant::now();
        let outcome = follower.run(&mut shutdown_rx).await;

        assert_eq!(outcome, LoopOutcome::Transition(Role::Leader));
        assert!(started.elapsed() >= Duration::from_millis(2000));
        assert_eq!(f.store.get("MAIN_KEY").await.unwrap().as_deref(), Some("20"));
    }
}
