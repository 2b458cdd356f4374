use std::time::Duration;

use async_trait::async_trait;

/// One record pulled from the queue.
#[derive(Debug, Clone)]
pub struct Record {
    pub partition: i32,
    pub offset: i64,
    pub value: String,
}

#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("kafka error: {0}")]
    Kafka(#[from] rdkafka::error::KafkaError),
    /// Failure raised by a non-Kafka consumer implementation.
    #[error("consumer error: {0}")]
    Other(String),
}

/// Connection to the message queue. Each worker owns exactly one.
///
/// `close` consumes the client, so the connection is released at most once
/// no matter how the worker's poll loop exits.
#[async_trait]
pub trait QueueConsumer: Send + Sync {
    fn subscribe(&self, topics: &[String]) -> Result<(), ClientError>;

    /// Waits up to `max_wait` for the next batch of records. An empty batch
    /// means the wait elapsed with nothing to consume.
    async fn poll(&self, max_wait: Duration) -> Result<Vec<Record>, ClientError>;

    fn close(self: Box<Self>);
}
