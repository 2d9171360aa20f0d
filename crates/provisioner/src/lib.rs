// Rust guideline compliant 2026-10-19

//! Topic provisioner: makes sure every topic the relay needs exists.
//!
//! Lists existing topics once and creates the missing ones in a single batched
//! request. A topic created concurrently by another instance is not an error.
//!
//! Entry point: [`TopicProvisioner::ensure_topics`].

use domain::{AdminConnector, BrokerAdmin, BrokerError, TopicDescriptor};
use std::collections::HashSet;

// ---------------------------------------------------------------------------
// ProvisionError
// ---------------------------------------------------------------------------

/// Errors that abort provisioning (and therefore startup).
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProvisionError {
    /// A required topic descriptor is invalid.
    #[error("invalid topic descriptor: {reason}")]
    InvalidTopic {
        /// Human-readable description of the problem.
        reason: String,
    },
    /// Connecting, listing, or the batched creation request failed.
    #[error("broker error during provisioning: {0}")]
    Broker(BrokerError),
    /// The broker refused to create one topic for a reason other than
    /// "already exists".
    #[error("failed to create topic {topic}: {source}")]
    Creation {
        /// Topic that could not be created.
        topic: String,
        /// The broker's per-topic error.
        source: BrokerError,
    },
}

// ---------------------------------------------------------------------------
// ProvisionReport
// ---------------------------------------------------------------------------

/// What a successful [`TopicProvisioner::ensure_topics`] call found and did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProvisionReport {
    /// Topics created by this call.
    pub created: Vec<String>,
    /// Topics that already existed when listed.
    pub existing: Vec<String>,
    /// Topics that were missing when listed but created by someone else before
    /// our creation request landed.
    pub raced: Vec<String>,
}

// ---------------------------------------------------------------------------
// TopicProvisioner
// ---------------------------------------------------------------------------

/// Ensures a fixed set of topics exists on the broker.
#[derive(Debug, Clone)]
pub struct TopicProvisioner {
    topics: Vec<TopicDescriptor>,
}

impl TopicProvisioner {
    /// Create a provisioner for `topics`.
    ///
    /// Descriptors repeating an earlier name are dropped; the first one wins.
    ///
    /// # Errors
    ///
    /// Returns [`ProvisionError::InvalidTopic`] for an empty name or a
    /// partition count / replication factor below one.
    pub fn new(topics: impl IntoIterator<Item = TopicDescriptor>) -> Result<Self, ProvisionError> {
        let mut seen = HashSet::new();
        let mut unique = Vec::new();
        for topic in topics {
            if topic.name.trim().is_empty() {
                return Err(ProvisionError::InvalidTopic {
                    reason: "topic name must not be empty".to_owned(),
                });
            }
            if topic.partitions < 1 || topic.replication_factor < 1 {
                return Err(ProvisionError::InvalidTopic {
                    reason: format!(
                        "{}: partitions ({}) and replication factor ({}) must be >= 1",
                        topic.name, topic.partitions, topic.replication_factor
                    ),
                });
            }
            if seen.insert(topic.name.clone()) {
                unique.push(topic);
            }
        }
        Ok(Self { topics: unique })
    }

    /// The de-duplicated set of required topics.
    #[must_use]
    pub fn topics(&self) -> &[TopicDescriptor] {
        &self.topics
    }

    /// Create whichever required topics are missing.
    ///
    /// Opens one admin connection and closes it whatever the outcome.
    ///
    /// # Errors
    ///
    /// Returns [`ProvisionError::Broker`] if connecting, listing, or the
    /// creation request fails, or [`ProvisionError::Creation`] if the broker
    /// refuses a topic for any reason other than "already exists".
    pub async fn ensure_topics<C: AdminConnector>(
        &self,
        connector: &C,
    ) -> Result<ProvisionReport, ProvisionError> {
        let admin = connector.connect().await.map_err(ProvisionError::Broker)?;
        let result = self.ensure_with(&admin).await;
        if let Err(e) = admin.close().await {
            tracing::debug!("provisioner.close_failed: error={e}");
        }
        result
    }

    async fn ensure_with<A: BrokerAdmin>(&self, admin: &A) -> Result<ProvisionReport, ProvisionError> {
        let listed: HashSet<String> =
            admin.list_topics().await.map_err(ProvisionError::Broker)?.into_iter().collect();

        let (present, missing): (Vec<&TopicDescriptor>, Vec<&TopicDescriptor>) =
            self.topics.iter().partition(|t| listed.contains(&t.name));

        let mut report = ProvisionReport {
            existing: present.iter().map(|t| t.name.clone()).collect(),
            ..ProvisionReport::default()
        };

        if missing.is_empty() {
            tracing::info!("provisioner.up_to_date: topics={:?}", report.existing);
            return Ok(report);
        }

        let missing: Vec<TopicDescriptor> = missing.into_iter().cloned().collect();
        let outcomes = admin.create_topics(&missing).await.map_err(ProvisionError::Broker)?;

        for outcome in outcomes {
            match outcome.result {
                Ok(()) => report.created.push(outcome.topic),
                Err(BrokerError::TopicAlreadyExists { .. }) => {
                    tracing::info!("provisioner.raced: topic={} created concurrently", outcome.topic);
                    report.raced.push(outcome.topic);
                }
                Err(source) => {
                    tracing::error!("provisioner.create_failed: topic={} error={source}", outcome.topic);
                    return Err(ProvisionError::Creation { topic: outcome.topic, source });
                }
            }
        }

        tracing::info!(
            "provisioner.created: created={:?} existing={:?} raced={:?}",
            report.created,
            report.existing,
            report.raced
        );
        Ok(report)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use domain::TopicCreation;
    use std::cell::{Cell, RefCell};
    use std::collections::{BTreeSet, HashMap};
    use std::rc::Rc;

    // ------------------------------------------------------------------
    // Mock broker
    // ------------------------------------------------------------------

    /// Broker state shared by every connection opened from one connector.
    #[derive(Default)]
    struct BrokerState {
        topics: BTreeSet<String>,
        /// Topics "another instance" creates right after we list.
        created_by_peer: Vec<String>,
        /// Per-topic errors to return from creation.
        create_errors: HashMap<String, BrokerError>,
        list_error: Option<BrokerError>,
        create_calls: Vec<Vec<TopicDescriptor>>,
        closes: u32,
    }

    struct MockAdmin {
        state: Rc<RefCell<BrokerState>>,
    }

    impl BrokerAdmin for MockAdmin {
        async fn list_topics(&self) -> Result<Vec<String>, BrokerError> {
            let mut state = self.state.borrow_mut();
            if let Some(e) = &state.list_error {
                return Err(e.clone());
            }
            let listed = state.topics.iter().cloned().collect();
            let peer = std::mem::take(&mut state.created_by_peer);
            state.topics.extend(peer);
            Ok(listed)
        }

        async fn create_topics(
            &self,
            topics: &[TopicDescriptor],
        ) -> Result<Vec<TopicCreation>, BrokerError> {
            let mut state = self.state.borrow_mut();
            state.create_calls.push(topics.to_vec());
            let mut outcomes = Vec::new();
            for t in topics {
                let result = if let Some(e) = state.create_errors.get(&t.name) {
                    Err(e.clone())
                } else if state.topics.insert(t.name.clone()) {
                    Ok(())
                } else {
                    Err(BrokerError::TopicAlreadyExists { topic: t.name.clone() })
                };
                outcomes.push(TopicCreation { topic: t.name.clone(), result });
            }
            Ok(outcomes)
        }

        async fn close(self) -> Result<(), BrokerError> {
            self.state.borrow_mut().closes += 1;
            Ok(())
        }
    }

    struct MockConnector {
        state: Rc<RefCell<BrokerState>>,
        refuse: Cell<bool>,
    }

    impl MockConnector {
        fn with_topics(names: &[&str]) -> Self {
            let state = BrokerState {
                topics: names.iter().map(|n| (*n).to_owned()).collect(),
                ..BrokerState::default()
            };
            Self { state: Rc::new(RefCell::new(state)), refuse: Cell::new(false) }
        }

        fn create_calls(&self) -> usize {
            self.state.borrow().create_calls.len()
        }

        fn closes(&self) -> u32 {
            self.state.borrow().closes
        }
    }

    impl AdminConnector for MockConnector {
        type Admin = MockAdmin;

        async fn connect(&self) -> Result<MockAdmin, BrokerError> {
            if self.refuse.get() {
                return Err(BrokerError::Unreachable { reason: "refused".to_owned() });
            }
            Ok(MockAdmin { state: Rc::clone(&self.state) })
        }
    }

    fn relay_topics() -> TopicProvisioner {
        TopicProvisioner::new([
            TopicDescriptor::new("transactions"),
            TopicDescriptor::new("scored-transactions"),
        ])
        .unwrap()
    }

    // ------------------------------------------------------------------
    // Set difference + single batched request
    // ------------------------------------------------------------------

    #[tokio::test]
    async fn creates_only_missing_topics_in_one_batch() {
        let broker = MockConnector::with_topics(&["transactions", "unrelated"]);
        let report = relay_topics().ensure_topics(&broker).await.unwrap();

        assert_eq!(report.created, ["scored-transactions"]);
        assert_eq!(report.existing, ["transactions"]);
        assert!(report.raced.is_empty());
        let state = broker.state.borrow();
        assert_eq!(state.create_calls.len(), 1);
        assert_eq!(state.create_calls[0], [TopicDescriptor::new("scored-transactions")]);
    }

    #[tokio::test]
    async fn creates_all_on_empty_broker() {
        let broker = MockConnector::with_topics(&[]);
        let report = relay_topics().ensure_topics(&broker).await.unwrap();

        assert_eq!(report.created, ["transactions", "scored-transactions"]);
        assert_eq!(broker.create_calls(), 1);
    }

    #[tokio::test]
    async fn no_creation_request_when_nothing_is_missing() {
        let broker = MockConnector::with_topics(&["transactions", "scored-transactions"]);
        let report = relay_topics().ensure_topics(&broker).await.unwrap();

        assert!(report.created.is_empty());
        assert_eq!(report.existing.len(), 2);
        assert_eq!(broker.create_calls(), 0);
    }

    #[tokio::test]
    async fn creation_parameters_are_forwarded() {
        let broker = MockConnector::with_topics(&[]);
        let provisioner =
            TopicProvisioner::new([TopicDescriptor::new("wide").partitions(12).replication_factor(3)])
                .unwrap();
        provisioner.ensure_topics(&broker).await.unwrap();

        let state = broker.state.borrow();
        assert_eq!(state.create_calls[0][0].partitions, 12);
        assert_eq!(state.create_calls[0][0].replication_factor, 3);
    }

    // ------------------------------------------------------------------
    // Idempotence
    // ------------------------------------------------------------------

    #[tokio::test]
    async fn ensuring_twice_creates_at_most_once() {
        let broker = MockConnector::with_topics(&[]);
        let provisioner = relay_topics();

        let first = provisioner.ensure_topics(&broker).await.unwrap();
        let second = provisioner.ensure_topics(&broker).await.unwrap();

        assert_eq!(broker.create_calls(), 1, "second call must not issue a creation request");
        assert_eq!(first.created.len(), 2);
        assert_eq!(second.existing.len(), 2);
        assert!(second.created.is_empty());
    }

    #[tokio::test]
    async fn concurrent_creation_by_peer_is_success() {
        let broker = MockConnector::with_topics(&[]);
        broker.state.borrow_mut().created_by_peer = vec!["transactions".to_owned()];

        let report = relay_topics().ensure_topics(&broker).await.unwrap();

        assert_eq!(report.raced, ["transactions"]);
        assert_eq!(report.created, ["scored-transactions"]);
    }

    // ------------------------------------------------------------------
    // Fatal errors + connection release
    // ------------------------------------------------------------------

    #[tokio::test]
    async fn other_creation_error_is_fatal() {
        let broker = MockConnector::with_topics(&["transactions"]);
        let denied = BrokerError::Rejected { reason: "replication factor larger than brokers".to_owned() };
        broker
            .state
            .borrow_mut()
            .create_errors
            .insert("scored-transactions".to_owned(), denied.clone());

        let result = relay_topics().ensure_topics(&broker).await;

        assert_eq!(
            result,
            Err(ProvisionError::Creation { topic: "scored-transactions".to_owned(), source: denied })
        );
        assert_eq!(broker.closes(), 1, "connection must be closed on failure");
    }

    #[tokio::test]
    async fn list_failure_is_fatal_and_closes_connection() {
        let broker = MockConnector::with_topics(&[]);
        broker.state.borrow_mut().list_error =
            Some(BrokerError::Unreachable { reason: "timed out".to_owned() });

        let result = relay_topics().ensure_topics(&broker).await;

        assert!(matches!(result, Err(ProvisionError::Broker(BrokerError::Unreachable { .. }))));
        assert_eq!(broker.create_calls(), 0);
        assert_eq!(broker.closes(), 1);
    }

    #[tokio::test]
    async fn connect_failure_is_fatal() {
        let broker = MockConnector::with_topics(&[]);
        broker.refuse.set(true);

        let result = relay_topics().ensure_topics(&broker).await;

        assert!(matches!(result, Err(ProvisionError::Broker(_))));
        assert_eq!(broker.closes(), 0, "nothing was opened, nothing to close");
    }

    #[tokio::test]
    async fn success_closes_connection() {
        let broker = MockConnector::with_topics(&[]);
        relay_topics().ensure_topics(&broker).await.unwrap();
        assert_eq!(broker.closes(), 1);
    }

    // ------------------------------------------------------------------
    // Descriptor validation
    // ------------------------------------------------------------------

    #[test]
    fn duplicate_names_collapse_first_wins() {
        let provisioner = TopicProvisioner::new([
            TopicDescriptor::new("transactions").partitions(3),
            TopicDescriptor::new("transactions").partitions(9),
            TopicDescriptor::new("scored-transactions"),
        ])
        .unwrap();

        assert_eq!(provisioner.topics().len(), 2);
        assert_eq!(provisioner.topics()[0].partitions, 3);
    }

    #[test]
    fn rejects_empty_name() {
        let result = TopicProvisioner::new([TopicDescriptor::new("  ")]);
        assert!(matches!(result, Err(ProvisionError::InvalidTopic { .. })));
    }

    #[test]
    fn rejects_zero_partitions_or_replication() {
        let zero_partitions = TopicProvisioner::new([TopicDescriptor::new("t").partitions(0)]);
        let zero_replication =
            TopicProvisioner::new([TopicDescriptor::new("t").replication_factor(0)]);
        assert!(matches!(zero_partitions, Err(ProvisionError::InvalidTopic { .. })));
        assert!(matches!(zero_replication, Err(ProvisionError::InvalidTopic { .. })));
    }
}
