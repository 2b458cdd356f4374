use std::time::Duration;

use futures::FutureExt;
use rdkafka::{
    config::ClientConfig,
    consumer::{Consumer, StreamConsumer},
    message::BorrowedMessage,
    Message,
};
use tracing::debug;
use uuid::Uuid;

use crate::client::{ClientError, QueueConsumer, Record};

/// Most records drained from the client buffer in a single poll.
const BATCH_LIMIT: usize = 500;

pub struct KafkaQueueConsumer {
    inner: StreamConsumer,
}

/// Builds a consumer from the shared connection properties. Every worker
/// gets its own `ClientConfig`; the shared pairs are never mutated.
pub fn connect(
    properties: &[(String, String)],
    worker_id: Uuid,
) -> Result<Box<dyn QueueConsumer>, ClientError> {
    let mut config = ClientConfig::new();
    for (key, value) in properties {
        config.set(key.as_str(), value.as_str());
    }

    let inner: StreamConsumer = config.create()?;
    debug!(id = %worker_id, "kafka consumer created");

    Ok(Box::new(KafkaQueueConsumer { inner }))
}

#[async_trait::async_trait]
impl QueueConsumer for KafkaQueueConsumer {
    fn subscribe(&self, topics: &[String]) -> Result<(), ClientError> {
        let topics: Vec<&str> = topics.iter().map(String::as_str).collect();
        self.inner.subscribe(&topics)?;
        Ok(())
    }

    async fn poll(&self, max_wait: Duration) -> Result<Vec<Record>, ClientError> {
        let mut batch = Vec::new();

        match tokio::time::timeout(max_wait, self.inner.recv()).await {
            Err(_) => return Ok(batch),
            Ok(Err(e)) => return Err(e.into()),
            Ok(Ok(message)) => batch.push(to_record(&message)),
        }

        // Drain whatever the client already buffered, without waiting.
        while batch.len() < BATCH_LIMIT {
            match self.inner.recv().now_or_never() {
                Some(Ok(message)) => batch.push(to_record(&message)),
                Some(Err(e)) => return Err(e.into()),
                None => break,
            }
        }

        Ok(batch)
    }

    fn close(self: Box<Self>) {
        // dropping the StreamConsumer leaves the group and releases the
        // connection
        drop(self);
    }
}

fn to_record(message: &BorrowedMessage<'_>) -> Record {
    let value = message
        .payload()
        .map(|p| String::from_utf8_lossy(p).into_owned())
        .unwrap_or_default();

    Record {
        partition: message.partition(),
        offset: message.offset(),
        value,
    }
}
