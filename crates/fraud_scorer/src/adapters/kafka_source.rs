// Rust guideline compliant 2026-10-19

//! `MessageSource` adapter over `rdkafka::consumer::StreamConsumer`.

use super::kafka_error::{broker_error, receive_error};
use domain::{BrokerError, InboundMessage, MessageSource, ReceiveError};
use rdkafka::ClientConfig;
use rdkafka::Message as _;
use rdkafka::consumer::{Consumer as _, StreamConsumer};

/// A group member subscribed to a single topic.
pub struct KafkaSource {
    consumer: StreamConsumer,
    topic: String,
}

impl std::fmt::Debug for KafkaSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KafkaSource").field("topic", &self.topic).finish_non_exhaustive()
    }
}

impl KafkaSource {
    /// Create a consumer from `config` and subscribe it to `topic`.
    ///
    /// # Errors
    ///
    /// Returns a `BrokerError` if the client cannot be created or subscribed.
    pub fn subscribe(config: &ClientConfig, topic: &str) -> Result<Self, BrokerError> {
        let consumer: StreamConsumer = config.create().map_err(|e| broker_error(&e))?;
        consumer.subscribe(&[topic]).map_err(|e| broker_error(&e))?;
        tracing::info!("kafka_source.subscribed: topic={topic}");
        Ok(Self { consumer, topic: topic.to_owned() })
    }
}

impl MessageSource for KafkaSource {
    async fn recv(&self) -> Result<InboundMessage, ReceiveError> {
        let message = self.consumer.recv().await.map_err(|e| receive_error(&e))?;
        // A tombstone carries no payload; it decodes as malformed downstream.
        let mut inbound = InboundMessage::new(message.payload().unwrap_or_default())
            .at(message.partition(), message.offset());
        if let Some(key) = message.key() {
            inbound = inbound.with_key(key);
        }
        Ok(inbound)
    }

    async fn close(self) -> Result<(), ReceiveError> {
        let topic = self.topic;
        let consumer = self.consumer;
        consumer.unsubscribe();
        // Dropping leaves the group and commits stored offsets; it blocks.
        tokio::task::spawn_blocking(move || drop(consumer))
            .await
            .map_err(|e| ReceiveError::Fatal { reason: format!("consumer close task failed: {e}") })?;
        tracing::info!("kafka_source.closed: topic={topic}");
        Ok(())
    }
}
