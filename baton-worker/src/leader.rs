//! Leader role: keep the lease alive and feed the work queue.

use crate::schedule::{periodic, LoopOutcome};
use crate::{ElectionController, WorkerConfig};
use baton_core::{LeaseStore, Message, ProcessId, Role};
use rand::rngs::StdRng;
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

/// Runs while this process is Leader.
///
/// Two timers share one `select!`: the produce timer re-checks lease
/// ownership and enqueues a message, the renew timer extends the lease at
/// half its lifetime. Only one of them runs at a time.
pub struct LeaderLoop<'a, S: LeaseStore> {
    controller: &'a mut ElectionController<S>,
    config: &'a WorkerConfig,
    payload_rng: &'a mut StdRng,
}

impl<'a, S: LeaseStore> LeaderLoop<'a, S> {
    pub fn new(
        controller: &'a mut ElectionController<S>,
        config: &'a WorkerConfig,
        payload_rng: &'a mut StdRng,
    ) -> Self {
        Self {
            controller,
            config,
            payload_rng,
        }
    }

    pub async fn run(&mut self, shutdown: &mut watch::Receiver<bool>) -> LoopOutcome {
        info!("Process {} running as leader", self.controller.process_id());

        let mut produce = periodic(self.config.produce_interval);
        let mut renew = periodic(self.config.renew_interval());

        loop {
            if *shutdown.borrow() {
                return LoopOutcome::Shutdown;
            }

            tokio::select! {
                _ = produce.tick() => {
                    if let Some(role) = self.produce_tick().await {
                        return LoopOutcome::Transition(role);
                    }
                }
                _ = renew.tick() => {
                    self.renew_tick().await;
                }
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        return LoopOutcome::Shutdown;
                    }
                }
            }
        }
    }

    /// Check ownership, then produce one message.
    ///
    /// Returns the new role when the ownership check failed and the
    /// re-election did not keep this process Leader.
    pub async fn produce_tick(&mut self) -> Option<Role> {
        if !self.holds_lease().await {
            self.controller.update_stats(|s| s.abdications += 1);
            let role = self.controller.attempt_election().await;
            return (!role.is_leader()).then_some(role);
        }

        let message = Message::random(&mut *self.payload_rng, self.config.payload_len);
        match self
            .controller
            .store()
            .enqueue(&self.config.keys.queue, message.payload())
            .await
        {
            Ok(()) => {
                self.controller.update_stats(|s| s.messages_produced += 1);
                debug!(
                    "Leader {} produced message {}",
                    self.controller.process_id(),
                    message
                );
            }
            Err(e) => {
                self.controller.update_stats(|s| s.store_errors += 1);
                warn!("Failed to enqueue message {}: {}", message, e);
            }
        }

        None
    }

    /// Extend the lease TTL.
    ///
    /// Ownership is not re-checked before extending: a displaced leader that
    /// has not yet run its produce tick can refresh a lease another process
    /// now holds. Failures are logged and never change the role.
    pub async fn renew_tick(&mut self) -> bool {
        let key = self.controller.lease_key();
        let ttl = self.controller.lease_ttl();

        match self.controller.store().extend_expiry(key, ttl).await {
            Ok(true) => {
                self.controller.update_stats(|s| s.renewals += 1);
                debug!("Leader {} renewed lease for {:?}", self.controller.process_id(), ttl);
                true
            }
            Ok(false) => {
                warn!("Lease {} was missing at renewal", key);
                false
            }
            Err(e) => {
                self.controller.update_stats(|s| s.store_errors += 1);
                error!("Failed to renew lease {}: {}", key, e);
                false
            }
        }
    }

    async fn holds_lease(&self) -> bool {
        let me = self.controller.process_id();

        match self.controller.store().get(self.controller.lease_key()).await {
            Ok(Some(value)) => match value.parse::<ProcessId>() {
                Ok(holder) if holder == me => true,
                Ok(holder) => {
                    warn!("Lease is held by {} instead of {}", holder, me);
                    false
                }
                Err(_) => {
                    warn!("Lease holds unrecognised value {:?}", value);
                    false
                }
            },
            Ok(None) => {
                warn!("Lease expired while {} was leader", me);
                false
            }
            Err(e) => {
                self.controller.update_stats(|s| s.store_errors += 1);
                error!("Failed to verify lease ownership for {}: {}", me, e);
                false
            }
        }
    }
}
