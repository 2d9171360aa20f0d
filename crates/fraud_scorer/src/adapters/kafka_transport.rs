// Rust guideline compliant 2026-10-19

//! `Transport` adapter: builds admin, consumer, and producer clients that
//! share one bootstrap list and client id.

use super::kafka_admin::{KafkaAdmin, KafkaAdminConnector};
use super::kafka_sink::KafkaSink;
use super::kafka_source::KafkaSource;
use domain::{AdminConnector, BrokerError, Transport};
use rdkafka::ClientConfig;
use std::time::Duration;

/// Connection settings shared by every client this process creates.
#[derive(Debug, Clone)]
pub struct KafkaSettings {
    /// Comma-separated broker list.
    pub bootstrap_servers: String,
    /// Admin request and message delivery timeout.
    pub timeout: Duration,
    /// `auto.offset.reset` for a new consumer group.
    pub auto_offset_reset: &'static str,
    /// Per-process `client.id`, visible in broker logs and metrics.
    pub client_id: String,
}

/// Per-process client id: `<group>-<uuid v4>`.
#[must_use]
pub fn client_id(group_id: &str) -> String {
    format!("{group_id}-{}", uuid::Uuid::new_v4())
}

/// Kafka implementation of the `domain::Transport` port.
#[derive(Debug)]
pub struct KafkaTransport {
    settings: KafkaSettings,
    admin: KafkaAdminConnector,
}

impl KafkaTransport {
    /// Create a transport. No connection is made until a client is used.
    #[must_use]
    pub fn new(settings: KafkaSettings) -> Self {
        let admin = KafkaAdminConnector::new(base_config(&settings), settings.timeout);
        Self { settings, admin }
    }

    fn consumer_config(&self, group_id: &str) -> ClientConfig {
        let mut config = base_config(&self.settings);
        config
            .set("group.id", group_id)
            .set("enable.auto.commit", "true")
            .set("auto.offset.reset", self.settings.auto_offset_reset)
            .set("enable.partition.eof", "false");
        config
    }

    fn producer_config(&self) -> ClientConfig {
        let mut config = base_config(&self.settings);
        config.set("message.timeout.ms", millis(self.settings.timeout));
        config
    }
}

fn base_config(settings: &KafkaSettings) -> ClientConfig {
    let mut config = ClientConfig::new();
    config
        .set("bootstrap.servers", &settings.bootstrap_servers)
        .set("client.id", &settings.client_id)
        .set("socket.timeout.ms", millis(settings.timeout));
    config
}

fn millis(duration: Duration) -> String {
    duration.as_millis().to_string()
}

impl AdminConnector for KafkaTransport {
    type Admin = KafkaAdmin;

    async fn connect(&self) -> Result<KafkaAdmin, BrokerError> {
        self.admin.connect().await
    }
}

impl Transport for KafkaTransport {
    type Source = KafkaSource;
    type Sink = KafkaSink;

    async fn open_source(&self, topic: &str, group_id: &str) -> Result<KafkaSource, BrokerError> {
        KafkaSource::subscribe(&self.consumer_config(group_id), topic)
    }

    async fn open_sink(&self, topic: &str) -> Result<KafkaSink, BrokerError> {
        KafkaSink::new(&self.producer_config(), topic, self.settings.timeout)
    }
}
