use std::sync::Arc;

use futures_util::future::join_all;
use tokio::task::JoinHandle;
use tracing::{error, info};

use baton_core::{LeaseStore, ProcessId, Result, Role};
use baton_store::InMemoryStore;
use baton_worker::{FailureInjector, Worker, WorkerConfig, WorkerHandle, WorkerStats};

struct Member {
    handle: WorkerHandle,
    task: JoinHandle<Result<WorkerStats>>,
}

/// Runs several workers in one process against a single shared store, the
/// way separate processes would share one Redis instance.
pub struct ClusterHarness {
    store: Arc<InMemoryStore>,
    config: WorkerConfig,
    members: Vec<Member>,
}

impl ClusterHarness {
    pub fn new(config: WorkerConfig) -> Self {
        Self::with_store(Arc::new(InMemoryStore::new()), config)
    }

    pub fn with_store(store: Arc<InMemoryStore>, config: WorkerConfig) -> Self {
        Self {
            store,
            config,
            members: Vec::new(),
        }
    }

    pub fn store(&self) -> &Arc<InMemoryStore> {
        &self.store
    }

    pub fn config(&self) -> &WorkerConfig {
        &self.config
    }

    /// Start a worker using the harness configuration's failure policy.
    pub fn spawn_worker(&mut self, id: u32) -> Result<WorkerHandle> {
        let injector = FailureInjector::from_config(&self.config)?;
        self.spawn_worker_with(id, injector)
    }

    pub fn spawn_worker_with(&mut self, id: u32, injector: FailureInjector) -> Result<WorkerHandle> {
        let worker = Worker::new(
            Arc::clone(&self.store),
            ProcessId::new(id),
            self.config.clone(),
        )?
        .with_failure_injector(injector);

        let handle = worker.handle();
        let task = tokio::spawn(worker.run());
        info!("Spawned worker {}", id);

        self.members.push(Member {
            handle: handle.clone(),
            task,
        });
        Ok(handle)
    }

    pub fn handle(&self, id: u32) -> Option<&WorkerHandle> {
        self.members
            .iter()
            .map(|member| &member.handle)
            .find(|handle| handle.process_id() == ProcessId::new(id))
    }

    /// Running workers that currently believe they are Leader.
    pub fn leaders(&self) -> Vec<ProcessId> {
        self.members
            .iter()
            .filter(|member| !member.task.is_finished())
            .filter(|member| member.handle.role() == Role::Leader)
            .map(|member| member.handle.process_id())
            .collect()
    }

    /// Identity currently recorded in the lease key.
    pub async fn lease_holder(&self) -> Option<ProcessId> {
        match self.store.get(&self.config.keys.lease).await {
            Ok(value) => value.and_then(|value| value.parse().ok()),
            Err(e) => {
                error!("Failed to read lease holder: {}", e);
                None
            }
        }
    }

    /// Stop one worker and wait for it to finish.
    pub async fn stop(&mut self, id: u32) -> Option<WorkerStats> {
        let index = self
            .members
            .iter()
            .position(|member| member.handle.process_id() == ProcessId::new(id))?;
        let member = self.members.remove(index);
        member.handle.shutdown();
        Self::collect(member).await.map(|(_, stats)| stats)
    }

    /// Stop every worker and return their final statistics.
    pub async fn shutdown(self) -> Vec<(ProcessId, WorkerStats)> {
        for member in &self.members {
            member.handle.shutdown();
        }

        join_all(self.members.into_iter().map(Self::collect))
            .await
            .into_iter()
            .flatten()
            .collect()
    }

    async fn collect(member: Member) -> Option<(ProcessId, WorkerStats)> {
        let id = member.handle.process_id();
        match member.task.await {
            Ok(Ok(stats)) => Some((id, stats)),
            Ok(Err(e)) => {
                error!("Worker {} failed: {}", id, e);
                None
            }
            Err(e) => {
                error!("Worker {} task panicked: {}", id, e);
                None
            }
        }
    }
}

/// Install a WARN-level subscriber once per test binary.
pub fn init_test_logging() {
    let _ = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::WARN)
        .with_test_writer()
        .try_init();
}
