// Rust guideline compliant 2026-10-19

//! `MessageSink` adapter over `rdkafka::producer::FutureProducer`.

use super::kafka_error::{broker_error, publish_error};
use domain::{BrokerError, Delivery, MessageSink, OutboundMessage, PublishError};
use rdkafka::ClientConfig;
use rdkafka::producer::{FutureProducer, FutureRecord, Producer as _};
use std::time::Duration;

/// Producer bound to one output topic.
pub struct KafkaSink {
    producer: FutureProducer,
    topic: String,
    timeout: Duration,
}

impl std::fmt::Debug for KafkaSink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KafkaSink")
            .field("topic", &self.topic)
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

impl KafkaSink {
    /// Create a producer for `topic`. `timeout` bounds queueing and the final
    /// flush.
    ///
    /// # Errors
    ///
    /// Returns a `BrokerError` if the client cannot be created.
    pub fn new(config: &ClientConfig, topic: &str, timeout: Duration) -> Result<Self, BrokerError> {
        let producer: FutureProducer = config.create().map_err(|e| broker_error(&e))?;
        Ok(Self { producer, topic: topic.to_owned(), timeout })
    }
}

impl MessageSink for KafkaSink {
    async fn publish(&self, message: OutboundMessage) -> Result<Delivery, PublishError> {
        let mut record = FutureRecord::<[u8], [u8]>::to(&self.topic).payload(message.payload.as_slice());
        if let Some(key) = message.key.as_deref() {
            record = record.key(key);
        }
        match self.producer.send(record, self.timeout).await {
            Ok((partition, offset)) => Ok(Delivery { partition, offset }),
            Err((e, _unsent)) => Err(publish_error(&e)),
        }
    }

    async fn close(self) -> Result<(), PublishError> {
        let Self { producer, topic, timeout } = self;
        let flushed = tokio::task::spawn_blocking(move || producer.flush(timeout))
            .await
            .map_err(|e| PublishError::Fatal { reason: format!("producer flush task failed: {e}") })?;
        flushed.map_err(|e| publish_error(&e))?;
        tracing::info!("kafka_sink.closed: topic={topic} flushed");
        Ok(())
    }
}
