// Rust guideline compliant 2026-10-19

//! Lifecycle controller -- sequences startup and shutdown of the scoring relay.
//!
//! Startup order: readiness gate, topic provisioning (input + output), open
//! consumer, open producer, then hand both to the [`relay::Relay`]. Any fatal
//! startup result aborts before a single message is consumed.
//!
//! Entry point: [`Lifecycle::run`]. Configuration via
//! [`LifecycleConfig::builder`].

use domain::{AdminConnector, BrokerError, FraudScorer, MessageSource, RetryPolicy, TopicDescriptor, Transport};
use provisioner::{ProvisionError, TopicProvisioner};
use readiness::{ReadinessError, ReadinessGate};
use relay::shutdown::ShutdownSignal;
use relay::{Relay, RelayConfig, RelayError, RelayReport};
use scoring::Enricher;
use tracing::Instrument as _;

// ---------------------------------------------------------------------------
// LifecycleError
// ---------------------------------------------------------------------------

/// Errors that end the process with a non-zero status.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LifecycleError {
    /// The supplied configuration is invalid.
    #[error("invalid lifecycle configuration: {reason}")]
    InvalidConfig {
        /// Human-readable description of the problem.
        reason: String,
    },
    /// The broker never became ready.
    #[error("broker not ready: {0}")]
    NotReady(ReadinessError),
    /// Required topics could not be ensured.
    #[error("topic provisioning failed: {0}")]
    Provisioning(ProvisionError),
    /// The consumer or producer could not be opened.
    #[error("failed to open broker client: {0}")]
    Open(BrokerError),
    /// The relay stopped on a fatal fault.
    #[error("relay failed: {0}")]
    Relay(RelayError),
}

// ---------------------------------------------------------------------------
// LifecycleConfig + builder
// ---------------------------------------------------------------------------

/// Everything needed to bring the relay up.
///
/// Construct via [`LifecycleConfig::builder`].
#[derive(Debug, Clone)]
pub struct LifecycleConfig {
    /// Retry policy for the readiness gate.
    pub readiness: RetryPolicy,
    /// Jitter readiness delays.
    pub jitter: bool,
    /// Topic consumed from.
    pub input: TopicDescriptor,
    /// Topic enriched records are published to.
    pub output: TopicDescriptor,
    /// Consumer group shared by all relay instances.
    pub group_id: String,
    /// Relay loop configuration.
    pub relay: RelayConfig,
}

/// Builder for [`LifecycleConfig`].
///
/// Obtain via [`LifecycleConfig::builder`]; finalize with [`build`](Self::build).
#[derive(Debug)]
pub struct LifecycleConfigBuilder {
    readiness: RetryPolicy,
    jitter: bool,
    input: String,
    output: String,
    group_id: String,
    partitions: i32,
    replication_factor: i32,
    relay: RelayConfig,
}

impl LifecycleConfig {
    /// Create a builder for the given topics and consumer group.
    ///
    /// Default values: `readiness = RetryPolicy::default()`, `jitter = false`,
    /// one partition and replication factor one for both topics,
    /// `relay = RelayConfig::default()`.
    #[must_use]
    pub fn builder(
        input: impl Into<String>,
        output: impl Into<String>,
        group_id: impl Into<String>,
    ) -> LifecycleConfigBuilder {
        LifecycleConfigBuilder {
            readiness: RetryPolicy::default(),
            jitter: false,
            input: input.into(),
            output: output.into(),
            group_id: group_id.into(),
            partitions: 1,
            replication_factor: 1,
            relay: RelayConfig::default(),
        }
    }
}

impl LifecycleConfigBuilder {
    /// Override the readiness retry policy.
    #[must_use]
    pub fn readiness(mut self, policy: RetryPolicy) -> Self {
        self.readiness = policy;
        self
    }

    /// Enable or disable readiness jitter.
    #[must_use]
    pub fn jitter(mut self, jitter: bool) -> Self {
        self.jitter = jitter;
        self
    }

    /// Partition count used when a topic has to be created.
    #[must_use]
    pub fn partitions(mut self, partitions: i32) -> Self {
        self.partitions = partitions;
        self
    }

    /// Replication factor used when a topic has to be created.
    #[must_use]
    pub fn replication_factor(mut self, replication_factor: i32) -> Self {
        self.replication_factor = replication_factor;
        self
    }

    /// Override the relay configuration.
    #[must_use]
    pub fn relay(mut self, relay: RelayConfig) -> Self {
        self.relay = relay;
        self
    }

    /// Validate and build the configuration.
    ///
    /// # Errors
    ///
    /// Returns [`LifecycleError::InvalidConfig`] when a topic name or the group
    /// id is empty, or when input and output name the same topic (the relay
    /// would consume its own output).
    #[must_use = "the Result must be checked; use ? or unwrap"]
    pub fn build(self) -> Result<LifecycleConfig, LifecycleError> {
        for (what, value) in [("input topic", &self.input), ("output topic", &self.output), ("group id", &self.group_id)] {
            if value.trim().is_empty() {
                return Err(LifecycleError::InvalidConfig { reason: format!("{what} must not be empty") });
            }
        }
        if self.input == self.output {
            return Err(LifecycleError::InvalidConfig {
                reason: format!("input and output topic are both {:?}", self.input),
            });
        }
        let descriptor = |name: String| {
            TopicDescriptor::new(name).partitions(self.partitions).replication_factor(self.replication_factor)
        };
        Ok(LifecycleConfig {
            readiness: self.readiness,
            jitter: self.jitter,
            input: descriptor(self.input),
            output: descriptor(self.output),
            group_id: self.group_id,
            relay: self.relay,
        })
    }
}

// ---------------------------------------------------------------------------
// Lifecycle
// ---------------------------------------------------------------------------

/// Drives one process lifetime: startup, relay, shutdown.
#[derive(Debug)]
pub struct Lifecycle<S: FraudScorer> {
    config: LifecycleConfig,
    scorer: S,
}

impl<S: FraudScorer> Lifecycle<S> {
    /// Create a controller scoring with `scorer`.
    #[must_use]
    pub fn new(config: LifecycleConfig, scorer: S) -> Self {
        Self { config, scorer }
    }

    /// Bring the relay up, run it until it stops, and return its report.
    ///
    /// A shutdown requested while the gate or provisioning is still in
    /// progress aborts startup and returns [`RelayReport::empty`].
    ///
    /// # Errors
    ///
    /// Returns the first fatal startup failure, or the relay's fatal error.
    pub async fn run<T: Transport>(
        self,
        transport: &T,
        mut shutdown: ShutdownSignal,
    ) -> Result<RelayReport, LifecycleError> {
        let prepare = self.prepare(transport).instrument(tracing::info_span!("startup"));
        tokio::select! {
            biased;
            () = shutdown.wait() => {
                tracing::info!("lifecycle.aborted: shutdown requested during startup");
                return Ok(RelayReport::empty());
            }
            prepared = prepare => prepared?,
        }

        let Self { config, scorer } = self;
        let source = transport
            .open_source(&config.input.name, &config.group_id)
            .await
            .map_err(LifecycleError::Open)?;
        let sink = match transport.open_sink(&config.output.name).await {
            Ok(sink) => sink,
            Err(e) => {
                tracing::error!("lifecycle.open_sink_failed: {e}");
                if let Err(close) = source.close().await {
                    tracing::warn!("lifecycle.consumer_close_failed: {close}");
                }
                return Err(LifecycleError::Open(e));
            }
        };

        tracing::info!(
            "lifecycle.started: {} -> {} group={}",
            config.input.name,
            config.output.name,
            config.group_id
        );
        let relay = Relay::new(config.relay, Enricher::new(scorer), source, sink);
        relay.run(&mut shutdown).await.map_err(LifecycleError::Relay)
    }

    /// Readiness gate, then topic provisioning.
    async fn prepare<C: AdminConnector>(&self, connector: &C) -> Result<(), LifecycleError> {
        let gate = ReadinessGate::builder(self.config.readiness).jitter(self.config.jitter).build();
        gate.await_ready(connector).await.map_err(LifecycleError::NotReady)?;

        let provisioner = TopicProvisioner::new([self.config.input.clone(), self.config.output.clone()])
            .map_err(LifecycleError::Provisioning)?;
        provisioner.ensure_topics(connector).await.map_err(LifecycleError::Provisioning)?;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
