use std::{sync::Arc, time::Duration};

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::{
    client::{ClientError, QueueConsumer},
    config::LaunchConfig,
    worker::{StateCell, Worker, WorkerState},
};

/// Bound on the shutdown join across all workers.
pub const SHUTDOWN_TIMEOUT: Duration = Duration::from_millis(5000);

/// Handle the pool keeps per dispatched worker.
pub struct WorkerHandle {
    id: Uuid,
    state: Arc<StateCell>,
    token: CancellationToken,
    join: Option<JoinHandle<()>>,
}

impl WorkerHandle {
    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn state(&self) -> WorkerState {
        self.state.load()
    }

    /// Cooperatively interrupts the worker: a poll blocked inside the
    /// worker returns promptly instead of waiting out its timeout.
    /// Idempotent; only the first call has any effect.
    pub fn interrupt(&self) {
        if self.state.advance(WorkerState::ShuttingDown) >= WorkerState::ShuttingDown {
            return;
        }
        info!(id = %self.id, "wakeup received");
        self.token.cancel();
    }
}

/// Owns every worker of the process, from launch to shutdown.
pub struct ConsumerPool {
    workers: Vec<WorkerHandle>,
}

impl ConsumerPool {
    /// Creates one worker per configured consumer, each with a fresh id and
    /// its own connection from `connect`, and dispatches them all. Returns
    /// as soon as every worker task is spawned; the workers run until
    /// [`shutdown`](Self::shutdown).
    pub fn launch<F>(config: &LaunchConfig, connect: F) -> Result<Self, ClientError>
    where
        F: Fn(Uuid) -> Result<Box<dyn QueueConsumer>, ClientError>,
    {
        info!(
            consumers = config.consumers,
            topics = ?config.topics,
            "starting consumers"
        );

        let mut workers = Vec::with_capacity(config.consumers);
        for _ in 0..config.consumers {
            let id = Uuid::new_v4();
            let consumer = connect(id)?;
            let state = Arc::new(StateCell::new());
            let token = CancellationToken::new();

            let worker = Worker::new(
                id,
                config.topics.clone(),
                consumer,
                state.clone(),
                token.clone(),
            );

            workers.push(WorkerHandle {
                id,
                state,
                token,
                join: Some(tokio::spawn(worker.run())),
            });
        }

        Ok(ConsumerPool { workers })
    }

    pub fn workers(&self) -> &[WorkerHandle] {
        &self.workers
    }

    /// Interrupts every worker, then waits for all of them under a single
    /// bounded deadline. On timeout the stragglers are left to process
    /// exit; nothing is force-killed.
    pub async fn shutdown(&mut self, timeout: Duration) {
        info!(consumers = self.workers.len(), "shutting down consumers");

        for worker in &self.workers {
            worker.interrupt();
        }

        let join_all = async {
            for worker in &mut self.workers {
                let Some(join) = worker.join.take() else {
                    continue;
                };
                if let Err(e) = join.await {
                    error!(id = %worker.id, error = %e, "consumer task failed");
                }
            }
        };

        match tokio::time::timeout(timeout, join_all).await {
            Ok(()) => info!("all consumers stopped"),
            Err(_) => warn!(
                timeout_ms = timeout.as_millis() as u64,
                "shutdown wait timed out, some consumers may still be running"
            ),
        }
    }
}
