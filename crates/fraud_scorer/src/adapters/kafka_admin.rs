// Rust guideline compliant 2026-10-19

//! `AdminConnector` / `BrokerAdmin` adapters over `rdkafka::admin::AdminClient`.
//!
//! Metadata fetches block inside librdkafka, so they run on tokio's blocking
//! pool. Dropping the client joins its background thread, so closing does too.

use super::kafka_error::{broker_error, topic_error};
use domain::{AdminConnector, BrokerAdmin, BrokerError, TopicCreation, TopicDescriptor};
use rdkafka::ClientConfig;
use rdkafka::admin::{AdminClient, AdminOptions, NewTopic, TopicReplication};
use rdkafka::client::DefaultClientContext;
use std::sync::Arc;
use std::time::Duration;

type Client = AdminClient<DefaultClientContext>;

/// Opens a fresh [`KafkaAdmin`] per call from a shared client configuration.
#[derive(Debug, Clone)]
pub struct KafkaAdminConnector {
    config: ClientConfig,
    timeout: Duration,
}

impl KafkaAdminConnector {
    /// Create a connector. `timeout` bounds every admin request.
    #[must_use]
    pub fn new(config: ClientConfig, timeout: Duration) -> Self {
        Self { config, timeout }
    }
}

impl AdminConnector for KafkaAdminConnector {
    type Admin = KafkaAdmin;

    async fn connect(&self) -> Result<KafkaAdmin, BrokerError> {
        let client: Client = self.config.create().map_err(|e| broker_error(&e))?;
        Ok(KafkaAdmin { client: Arc::new(client), timeout: self.timeout })
    }
}

/// One administrative connection.
pub struct KafkaAdmin {
    client: Arc<Client>,
    timeout: Duration,
}

impl std::fmt::Debug for KafkaAdmin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KafkaAdmin").field("timeout", &self.timeout).finish_non_exhaustive()
    }
}

impl KafkaAdmin {
    fn options(&self) -> AdminOptions {
        AdminOptions::new().request_timeout(Some(self.timeout)).operation_timeout(Some(self.timeout))
    }
}

impl BrokerAdmin for KafkaAdmin {
    async fn list_topics(&self) -> Result<Vec<String>, BrokerError> {
        let client = Arc::clone(&self.client);
        let timeout = self.timeout;
        let metadata = tokio::task::spawn_blocking(move || client.inner().fetch_metadata(None, timeout))
            .await
            .map_err(|e| BrokerError::Rejected { reason: format!("metadata task failed: {e}") })?
            .map_err(|e| broker_error(&e))?;
        Ok(metadata.topics().iter().map(|t| t.name().to_owned()).collect())
    }

    async fn create_topics(&self, topics: &[TopicDescriptor]) -> Result<Vec<TopicCreation>, BrokerError> {
        let requests: Vec<NewTopic<'_>> = topics
            .iter()
            .map(|t| NewTopic::new(&t.name, t.partitions, TopicReplication::Fixed(t.replication_factor)))
            .collect();
        let results = self.client.create_topics(&requests, &self.options()).await.map_err(|e| broker_error(&e))?;
        Ok(results
            .into_iter()
            .map(|result| match result {
                Ok(topic) => TopicCreation { topic, result: Ok(()) },
                Err((topic, code)) => {
                    let result = Err(topic_error(&topic, code));
                    TopicCreation { topic, result }
                }
            })
            .collect())
    }

    async fn close(self) -> Result<(), BrokerError> {
        tokio::task::spawn_blocking(move || drop(self.client))
            .await
            .map_err(|e| BrokerError::Rejected { reason: format!("admin close task failed: {e}") })
    }
}
