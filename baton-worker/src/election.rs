//! Lease-based election for a single worker process.

use crate::WorkerConfig;
use baton_core::{LeaseStore, ProcessId, Role};
use parking_lot::RwLock;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tracing::{debug, error, info};

/// Counters describing what a worker has done since it started
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct WorkerStats {
    pub elections_attempted: u64,
    pub elections_won: u64,
    pub elections_lost: u64,
    pub role_changes: u64,
    pub abdications: u64,
    pub renewals: u64,
    pub messages_produced: u64,
    pub messages_consumed: u64,
    pub messages_flagged: u64,
    pub store_errors: u64,
}

/// Owns this process's identity and role.
///
/// Only [`attempt_election`](Self::attempt_election) changes the role. The
/// leader and follower loops borrow the controller mutably and call back into
/// it whenever they need the role re-decided.
pub struct ElectionController<S: LeaseStore> {
    store: Arc<S>,
    process_id: ProcessId,
    lease_key: String,
    lease_ttl: Duration,
    role: Role,
    role_tx: watch::Sender<Role>,
    stats: Arc<RwLock<WorkerStats>>,
}

impl<S: LeaseStore> ElectionController<S> {
    pub fn new(store: Arc<S>, process_id: ProcessId, config: &WorkerConfig) -> Self {
        let (role_tx, _) = watch::channel(Role::Unelected);

        Self {
            store,
            process_id,
            lease_key: config.keys.lease.clone(),
            lease_ttl: config.lease_ttl,
            role: Role::Unelected,
            role_tx,
            stats: Arc::new(RwLock::new(WorkerStats::default())),
        }
    }

    pub fn process_id(&self) -> ProcessId {
        self.process_id
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    pub fn lease_key(&self) -> &str {
        &self.lease_key
    }

    pub fn lease_ttl(&self) -> Duration {
        self.lease_ttl
    }

    /// Receiver that observes every role transition.
    pub fn subscribe(&self) -> watch::Receiver<Role> {
        self.role_tx.subscribe()
    }

    pub fn stats(&self) -> WorkerStats {
        self.stats.read().clone()
    }

    pub(crate) fn shared_stats(&self) -> Arc<RwLock<WorkerStats>> {
        Arc::clone(&self.stats)
    }

    pub(crate) fn update_stats(&self, update: impl FnOnce(&mut WorkerStats)) {
        update(&mut self.stats.write());
    }

    /// Try to take the lease and settle the role accordingly.
    ///
    /// Winning the conditional write makes this process Leader. Finding the
    /// lease held, or failing to reach the store, makes it Follower. Store
    /// errors are logged and never retried here.
    pub async fn attempt_election(&mut self) -> Role {
        self.update_stats(|s| s.elections_attempted += 1);

        let holder = self.process_id.to_string();
        let won = match self
            .store
            .set_if_absent(&self.lease_key, &holder, self.lease_ttl)
            .await
        {
            Ok(won) => won,
            Err(e) => {
                error!("Election attempt by process {} failed: {}", self.process_id, e);
                self.update_stats(|s| s.store_errors += 1);
                false
            }
        };

        debug!("Election by process {}: won={}", self.process_id, won);

        if won {
            self.update_stats(|s| s.elections_won += 1);
            self.transition(Role::Leader);
        } else {
            self.update_stats(|s| s.elections_lost += 1);
            self.transition(Role::Follower);
        }

        self.role
    }

    fn transition(&mut self, next: Role) {
        if self.role == next {
            return;
        }

        info!(
            "Process {} changing role from {} to {}",
            self.process_id, self.role, next
        );
        self.role = next;
        self.update_stats(|s| s.role_changes += 1);
        self.role_tx.send_replace(next);
    }
}
