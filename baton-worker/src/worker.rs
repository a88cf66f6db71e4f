//! Per-process driver: one initial election, then whichever role loop the
//! controller settles on, until shutdown.

use crate::election::WorkerStats;
use crate::schedule::LoopOutcome;
use crate::{ElectionController, ErrorSink, FailureInjector, FollowerLoop, LeaderLoop, WorkerConfig};
use baton_core::{LeaseStore, ProcessId, Result, Role};
use parking_lot::RwLock;
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tracing::{info, warn};

/// A single worker process.
pub struct Worker<S: LeaseStore> {
    config: WorkerConfig,
    controller: ElectionController<S>,
    injector: FailureInjector,
    sink: ErrorSink<S>,
    payload_rng: StdRng,
    shutdown_tx: Arc<watch::Sender<bool>>,
    shutdown_rx: watch::Receiver<bool>,
}

impl<S: LeaseStore> Worker<S> {
    /// Create a worker; the configuration is validated here.
    pub fn new(store: Arc<S>, process_id: ProcessId, config: WorkerConfig) -> Result<Self> {
        config.validate()?;

        let injector = FailureInjector::from_config(&config)?;
        let payload_rng = match config.randomization_seed {
            // Offset keeps payloads and injector verdicts on separate streams.
            Some(seed) => StdRng::seed_from_u64(seed.wrapping_add(1)),
            None => StdRng::from_entropy(),
        };
        let sink = ErrorSink::new(Arc::clone(&store), config.keys.errors.clone());
        let controller = ElectionController::new(store, process_id, &config);
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        Ok(Self {
            config,
            controller,
            injector,
            sink,
            payload_rng,
            shutdown_tx: Arc::new(shutdown_tx),
            shutdown_rx,
        })
    }

    /// Replace the failure injector built from the configuration.
    pub fn with_failure_injector(mut self, injector: FailureInjector) -> Self {
        self.injector = injector;
        self
    }

    pub fn process_id(&self) -> ProcessId {
        self.controller.process_id()
    }

    pub fn role(&self) -> Role {
        self.controller.role()
    }

    pub fn handle(&self) -> WorkerHandle {
        WorkerHandle {
            process_id: self.controller.process_id(),
            shutdown_tx: Arc::clone(&self.shutdown_tx),
            role_rx: self.controller.subscribe(),
            stats: self.controller.shared_stats(),
        }
    }

    /// Run until shutdown is requested through a [`WorkerHandle`].
    ///
    /// Store failures never end the run; they are logged and retried on the
    /// next tick.
    pub async fn run(mut self) -> Result<WorkerStats> {
        info!(
            "Starting worker {} (lease ttl {:?})",
            self.controller.process_id(),
            self.config.lease_ttl
        );

        let mut role = self.controller.attempt_election().await;

        loop {
            let outcome = match role {
                Role::Leader => {
                    LeaderLoop::new(&mut self.controller, &self.config, &mut self.payload_rng)
                        .run(&mut self.shutdown_rx)
                        .await
                }
                Role::Follower => {
                    FollowerLoop::new(
                        &mut self.controller,
                        &self.config,
                        &mut self.injector,
                        &self.sink,
                    )
                    .run(&mut self.shutdown_rx)
                    .await
                }
                Role::Unelected => {
                    LoopOutcome::Transition(self.controller.attempt_election().await)
                }
            };

            match outcome {
                LoopOutcome::Transition(next) => role = next,
                LoopOutcome::Shutdown => break,
            }
        }

        info!(
            "Worker {} stopped as {}",
            self.controller.process_id(),
            self.controller.role()
        );
        Ok(self.controller.stats())
    }
}

/// Observe and stop a running [`Worker`] from another task.
#[derive(Clone)]
pub struct WorkerHandle {
    process_id: ProcessId,
    shutdown_tx: Arc<watch::Sender<bool>>,
    role_rx: watch::Receiver<Role>,
    stats: Arc<RwLock<WorkerStats>>,
}

impl WorkerHandle {
    pub fn process_id(&self) -> ProcessId {
        self.process_id
    }

    /// Ask the worker to stop after its current action. The lease is not
    /// released; it expires on its own.
    pub fn shutdown(&self) {
        if self.shutdown_tx.send(true).is_err() {
            warn!("Worker {} already stopped", self.process_id);
        }
    }

    pub fn role(&self) -> Role {
        *self.role_rx.borrow()
    }

    pub fn subscribe_role(&self) -> watch::Receiver<Role> {
        self.role_rx.clone()
    }

    pub fn stats(&self) -> WorkerStats {
        self.stats.read().clone()
    }

    /// Wait until the worker reports `role`, or give up after `timeout`.
    pub async fn wait_for_role(&self, role: Role, timeout: Duration) -> bool {
        let mut role_rx = self.role_rx.clone();
        tokio::time::timeout(timeout, role_rx.wait_for(|current| *current == role))
            .await
            .is_ok_and(|result| result.is_ok())
    }
}
