use std::sync::{
    atomic::{AtomicU8, Ordering},
    Arc,
};
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{error, info};
use uuid::Uuid;

use crate::client::QueueConsumer;

/// Wait bound for a single poll call.
pub const POLL_TIMEOUT: Duration = Duration::from_millis(1000);

/// Worker lifecycle. Transitions only move forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[repr(u8)]
pub enum WorkerState {
    Created = 0,
    Running = 1,
    ShuttingDown = 2,
    Closed = 3,
}

impl WorkerState {
    fn from_u8(raw: u8) -> Self {
        match raw {
            0 => WorkerState::Created,
            1 => WorkerState::Running,
            2 => WorkerState::ShuttingDown,
            _ => WorkerState::Closed,
        }
    }
}

/// State cell shared between the worker task and its handle in the pool.
#[derive(Debug)]
pub(crate) struct StateCell(AtomicU8);

impl StateCell {
    pub(crate) fn new() -> Self {
        StateCell(AtomicU8::new(WorkerState::Created as u8))
    }

    pub(crate) fn load(&self) -> WorkerState {
        WorkerState::from_u8(self.0.load(Ordering::SeqCst))
    }

    /// Moves the state forward, never backward. Returns the previous state.
    pub(crate) fn advance(&self, to: WorkerState) -> WorkerState {
        WorkerState::from_u8(self.0.fetch_max(to as u8, Ordering::SeqCst))
    }
}

/// One consumer: owns its queue connection, polls its topics and logs every
/// record until interrupted or the first fault.
pub(crate) struct Worker {
    id: Uuid,
    topics: Arc<[String]>,
    consumer: Box<dyn QueueConsumer>,
    state: Arc<StateCell>,
    token: CancellationToken,
}

impl Worker {
    pub(crate) fn new(
        id: Uuid,
        topics: Arc<[String]>,
        consumer: Box<dyn QueueConsumer>,
        state: Arc<StateCell>,
        token: CancellationToken,
    ) -> Self {
        Worker {
            id,
            topics,
            consumer,
            state,
            token,
        }
    }

    /// Poll-and-log loop. The connection is released on every exit path:
    /// cancellation, subscribe failure or a poll fault.
    pub(crate) async fn run(self) {
        self.state.advance(WorkerState::Running);
        info!(id = %self.id, "consumer starting");

        match self.consumer.subscribe(&self.topics) {
            Ok(()) => self.poll_loop().await,
            Err(e) => error!(id = %self.id, error = %e, "subscribe failed"),
        }

        self.state.advance(WorkerState::ShuttingDown);
        self.consumer.close();
        self.state.advance(WorkerState::Closed);
        info!(id = %self.id, "consumer closed");
    }

    async fn poll_loop(&self) {
        loop {
            tokio::select! {
                _ = self.token.cancelled() => break,
                polled = self.consumer.poll(POLL_TIMEOUT) => match polled {
                    Ok(batch) => {
                        info!(id = %self.id, count = batch.len(), "polled messages");
                        for record in &batch {
                            info!(
                                id = %self.id,
                                partition = record.partition,
                                offset = record.offset,
                                value = %record.value,
                                "received"
                            );
                        }
                    }
                    // faults are not retried; the loop unwinds and the
                    // caller releases the connection
                    Err(e) => {
                        error!(id = %self.id, error = %e, "poll failed");
                        break;
                    }
                },
            }
        }
    }
}
