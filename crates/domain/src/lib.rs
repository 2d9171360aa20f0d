// Rust guideline compliant 2026-10-19

//! Shared domain types for the fraud-scoring relay.
//!
//! Defines the record types (`RawTransaction`, `ScoredTransaction`), the
//! provisioning and retry configuration (`TopicDescriptor`, `RetryPolicy`),
//! the error enums, and the hexagonal port traits: `FraudScorer`,
//! `BrokerAdmin`, `AdminConnector`, `MessageSource`, `MessageSink`, and
//! `Transport`. All relay crates depend on this crate; it knows nothing about
//! any concrete broker client.

use std::time::Duration;

use serde_json::{Map, Number, Value};

/// Name of the field attached to every scored record.
pub const SCORE_FIELD: &str = "fraud_score";

/// Field map of a transaction document; insertion order is preserved.
pub type Fields = Map<String, Value>;

// ---------------------------------------------------------------------------
// Records
// ---------------------------------------------------------------------------

/// An inbound transaction, decoded from a JSON object payload.
///
/// The relay treats the content opaquely: no field is required.
#[derive(Debug, Clone, PartialEq)]
pub struct RawTransaction {
    fields: Fields,
}

impl RawTransaction {
    /// Decode a payload as a JSON object.
    ///
    /// # Errors
    ///
    /// Returns [`DecodeError::Syntax`] when the bytes are not valid UTF-8 JSON,
    /// or [`DecodeError::NotAnObject`] when the document is valid JSON but not
    /// an object (there is no mapping to attach a score to).
    pub fn decode(payload: &[u8]) -> Result<Self, DecodeError> {
        let value: Value = serde_json::from_slice(payload).map_err(|e| DecodeError::Syntax {
            reason: e.to_string(),
        })?;
        match value {
            Value::Object(fields) => Ok(Self::from_fields(fields)),
            other => Err(DecodeError::NotAnObject { kind: json_kind(&other) }),
        }
    }

    /// Wrap an already-built field map.
    #[must_use]
    pub fn from_fields(fields: Fields) -> Self {
        Self { fields }
    }

    /// All fields, in document order.
    #[must_use]
    pub fn fields(&self) -> &Fields {
        &self.fields
    }

    /// Look up a single field.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.fields.get(name)
    }
}

/// A transaction enriched with a fraud score.
///
/// Carries every source field unchanged plus [`SCORE_FIELD`]. If the source
/// already had a score field it is overwritten in place.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredTransaction {
    fields: Fields,
    score: f64,
}

impl ScoredTransaction {
    /// Attach `score` to `raw`.
    ///
    /// # Errors
    ///
    /// Returns [`EnrichError::NonFinite`] for NaN or infinite scores, which
    /// JSON cannot represent.
    pub fn new(raw: RawTransaction, score: f64) -> Result<Self, EnrichError> {
        let number = Number::from_f64(score).ok_or(EnrichError::NonFinite { value: score })?;
        let mut fields = raw.fields;
        fields.insert(SCORE_FIELD.to_owned(), Value::Number(number));
        Ok(Self { fields, score })
    }

    /// The attached score.
    #[must_use]
    pub fn score(&self) -> f64 {
        self.score
    }

    /// All fields including the score, in document order.
    #[must_use]
    pub fn fields(&self) -> &Fields {
        &self.fields
    }

    /// Serialize to a JSON payload.
    ///
    /// # Errors
    ///
    /// Returns [`EnrichError::Encode`] if serialization fails.
    pub fn encode(&self) -> Result<Vec<u8>, EnrichError> {
        serde_json::to_vec(&self.fields).map_err(|e| EnrichError::Encode { reason: e.to_string() })
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

// ---------------------------------------------------------------------------
// Broker messages
// ---------------------------------------------------------------------------

/// One message read from the input topic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundMessage {
    /// Message key, forwarded unchanged to the output topic.
    pub key: Option<Vec<u8>>,
    /// Raw payload bytes.
    pub payload: Vec<u8>,
    /// Source partition.
    pub partition: i32,
    /// Source offset within `partition`.
    pub offset: i64,
}

impl InboundMessage {
    /// Build an unkeyed message at partition 0, offset 0.
    #[must_use]
    pub fn new(payload: impl Into<Vec<u8>>) -> Self {
        Self { key: None, payload: payload.into(), partition: 0, offset: 0 }
    }

    /// Set the message key.
    #[must_use]
    pub fn with_key(mut self, key: impl Into<Vec<u8>>) -> Self {
        self.key = Some(key.into());
        self
    }

    /// Set the source position.
    #[must_use]
    pub fn at(mut self, partition: i32, offset: i64) -> Self {
        self.partition = partition;
        self.offset = offset;
        self
    }
}

/// One message to publish to the output topic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundMessage {
    /// Message key.
    pub key: Option<Vec<u8>>,
    /// Serialized [`ScoredTransaction`].
    pub payload: Vec<u8>,
}

/// Broker acknowledgment of a published message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Delivery {
    /// Partition the message landed in.
    pub partition: i32,
    /// Offset assigned by the broker.
    pub offset: i64,
}

/// Per-topic outcome of a batched creation request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TopicCreation {
    /// Topic name.
    pub topic: String,
    /// `Ok(())` if created, otherwise the broker's per-topic error.
    pub result: Result<(), BrokerError>,
}

// ---------------------------------------------------------------------------
// Provisioning and retry configuration
// ---------------------------------------------------------------------------

/// A topic the relay requires, with its creation parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TopicDescriptor {
    /// Topic name.
    pub name: String,
    /// Partition count used if the topic has to be created.
    pub partitions: i32,
    /// Replication factor used if the topic has to be created.
    pub replication_factor: i32,
}

impl TopicDescriptor {
    /// Describe `name` with one partition and replication factor one.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into(), partitions: 1, replication_factor: 1 }
    }

    /// Override the partition count.
    #[must_use]
    pub fn partitions(mut self, partitions: i32) -> Self {
        self.partitions = partitions;
        self
    }

    /// Override the replication factor.
    #[must_use]
    pub fn replication_factor(mut self, replication_factor: i32) -> Self {
        self.replication_factor = replication_factor;
        self
    }
}

/// Shape of the delay sequence between retry attempts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backoff {
    /// The base delay after every failed attempt.
    Fixed,
    /// Base delay doubled after each failed attempt, capped at `max_delay`.
    Exponential {
        /// Upper bound for any single delay.
        max_delay: Duration,
    },
}

/// Immutable bounded-retry configuration.
///
/// Construct via [`RetryPolicy::builder`] or use [`RetryPolicy::default`]
/// (10 attempts, 2 s fixed delay).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    max_attempts: u32,
    delay: Duration,
    backoff: Backoff,
}

impl RetryPolicy {
    /// Default attempt budget.
    pub const DEFAULT_MAX_ATTEMPTS: u32 = 10;
    /// Default base delay.
    pub const DEFAULT_DELAY: Duration = Duration::from_secs(2);

    /// Create a builder preloaded with the defaults.
    #[must_use]
    pub fn builder() -> RetryPolicyBuilder {
        RetryPolicyBuilder {
            max_attempts: Self::DEFAULT_MAX_ATTEMPTS,
            delay: Self::DEFAULT_DELAY,
            backoff: Backoff::Fixed,
        }
    }

    /// Total number of attempts, including the first one. Always `>= 1`.
    #[must_use]
    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Base delay.
    #[must_use]
    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Backoff shape.
    #[must_use]
    pub fn backoff(&self) -> Backoff {
        self.backoff
    }

    /// Delay to wait after failed attempt number `attempt` (1-based).
    #[must_use]
    pub fn delay_for(&self, attempt: u32) -> Duration {
        match self.backoff {
            Backoff::Fixed => self.delay,
            Backoff::Exponential { max_delay } => {
                let doublings = attempt.saturating_sub(1).min(31);
                self.delay
                    .checked_mul(1_u32 << doublings)
                    .map_or(max_delay, |d| d.min(max_delay))
            }
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: Self::DEFAULT_MAX_ATTEMPTS,
            delay: Self::DEFAULT_DELAY,
            backoff: Backoff::Fixed,
        }
    }
}

/// Builder for [`RetryPolicy`].
#[derive(Debug, Clone)]
pub struct RetryPolicyBuilder {
    max_attempts: u32,
    delay: Duration,
    backoff: Backoff,
}

impl RetryPolicyBuilder {
    /// Set the total attempt budget.
    #[must_use]
    pub fn max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts;
        self
    }

    /// Set the base delay.
    #[must_use]
    pub fn delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Double the delay after each failure, never exceeding `max_delay`.
    #[must_use]
    pub fn exponential(mut self, max_delay: Duration) -> Self {
        self.backoff = Backoff::Exponential { max_delay };
        self
    }

    /// Validate and build the policy.
    ///
    /// # Errors
    ///
    /// Returns [`PolicyError::InvalidConfig`] when `max_attempts` is zero or the
    /// exponential cap is below the base delay.
    #[must_use = "the Result must be checked; use ? or unwrap"]
    pub fn build(self) -> Result<RetryPolicy, PolicyError> {
        if self.max_attempts == 0 {
            return Err(PolicyError::InvalidConfig {
                reason: "max_attempts must be >= 1".to_owned(),
            });
        }
        if let Backoff::Exponential { max_delay } = self.backoff
            && max_delay < self.delay
        {
            return Err(PolicyError::InvalidConfig {
                reason: format!(
                    "max_delay ({max_delay:?}) must be >= delay ({:?})",
                    self.delay
                ),
            });
        }
        Ok(RetryPolicy {
            max_attempts: self.max_attempts,
            delay: self.delay,
            backoff: self.backoff,
        })
    }
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Invalid retry configuration.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PolicyError {
    /// The supplied configuration is invalid.
    #[error("invalid retry policy: {reason}")]
    InvalidConfig {
        /// Human-readable description of the problem.
        reason: String,
    },
}

/// A payload that cannot become a [`RawTransaction`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DecodeError {
    /// Not valid JSON (or not UTF-8).
    #[error("invalid json: {reason}")]
    Syntax {
        /// Parser message.
        reason: String,
    },
    /// Valid JSON, but not an object.
    #[error("expected a json object, found {kind}")]
    NotAnObject {
        /// JSON type that was found.
        kind: &'static str,
    },
}

/// A record that was decoded but cannot be enriched and re-encoded.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum EnrichError {
    /// The scorer returned NaN or an infinity.
    #[error("score is not a finite number: {value}")]
    NonFinite {
        /// The offending score.
        value: f64,
    },
    /// Serialization of the enriched record failed.
    #[error("encode failed: {reason}")]
    Encode {
        /// Serializer message.
        reason: String,
    },
}

/// Errors from the broker control plane.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BrokerError {
    /// The broker could not be reached (transport failure, timeout, no brokers up).
    #[error("broker unreachable: {reason}")]
    Unreachable {
        /// Human-readable description.
        reason: String,
    },
    /// The topic already exists; benign during provisioning.
    #[error("topic already exists: {topic}")]
    TopicAlreadyExists {
        /// Topic name.
        topic: String,
    },
    /// Any other broker or client failure.
    #[error("broker request rejected: {reason}")]
    Rejected {
        /// Human-readable description.
        reason: String,
    },
}

impl BrokerError {
    /// `true` for connection-class failures that are worth retrying.
    #[must_use]
    pub fn is_connection(&self) -> bool {
        matches!(self, Self::Unreachable { .. })
    }
}

/// Errors from the consuming side.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ReceiveError {
    /// A recoverable consumption error; the client keeps going.
    #[error("transient receive error: {reason}")]
    Transient {
        /// Human-readable description.
        reason: String,
    },
    /// The consumer cannot continue.
    #[error("fatal receive error: {reason}")]
    Fatal {
        /// Human-readable description.
        reason: String,
    },
    /// The stream has ended; no further messages will arrive.
    #[error("source closed")]
    Closed,
}

/// Errors from the producing side.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PublishError {
    /// The broker rejected or could not deliver this message.
    #[error("publish rejected: {reason}")]
    Rejected {
        /// Human-readable description.
        reason: String,
    },
    /// The producer cannot continue.
    #[error("fatal publish error: {reason}")]
    Fatal {
        /// Human-readable description.
        reason: String,
    },
}

// ---------------------------------------------------------------------------
// Ports
// ---------------------------------------------------------------------------

/// Capability: map a transaction to a fraud score.
///
/// Must be pure and must not panic for any decoded record; unknown or missing
/// fields are tolerated. Any `Fn(&RawTransaction) -> f64` is a scorer.
pub trait FraudScorer {
    /// Score `record`.
    fn score(&self, record: &RawTransaction) -> f64;
}

impl<F> FraudScorer for F
where
    F: Fn(&RawTransaction) -> f64,
{
    fn score(&self, record: &RawTransaction) -> f64 {
        self(record)
    }
}

/// Hexagonal port: a transient administrative connection to the broker.
///
/// Obtained from an [`AdminConnector`]; callers close it when done.
#[expect(
    async_fn_in_trait,
    reason = "no dyn dispatch needed; internal workspace only"
)]
pub trait BrokerAdmin {
    /// List the names of all existing topics.
    ///
    /// # Errors
    ///
    /// Returns `BrokerError::Unreachable` on connection-class failures.
    async fn list_topics(&self) -> Result<Vec<String>, BrokerError>;

    /// Create `topics` in a single batched request.
    ///
    /// Returns one [`TopicCreation`] per requested topic.
    ///
    /// # Errors
    ///
    /// Returns a `BrokerError` if the request as a whole failed.
    async fn create_topics(
        &self,
        topics: &[TopicDescriptor],
    ) -> Result<Vec<TopicCreation>, BrokerError>;

    /// Release the connection.
    ///
    /// # Errors
    ///
    /// Returns a `BrokerError` if the client reported a failure while closing.
    async fn close(self) -> Result<(), BrokerError>
    where
        Self: Sized;
}

/// Hexagonal port: opens [`BrokerAdmin`] connections.
#[expect(
    async_fn_in_trait,
    reason = "no dyn dispatch needed; internal workspace only"
)]
pub trait AdminConnector {
    /// Connection type.
    type Admin: BrokerAdmin;

    /// Open a new administrative connection.
    ///
    /// # Errors
    ///
    /// Returns a `BrokerError` if the client cannot be created.
    async fn connect(&self) -> Result<Self::Admin, BrokerError>;
}

/// Hexagonal port: the consuming side of the relay.
#[expect(
    async_fn_in_trait,
    reason = "no dyn dispatch needed; internal workspace only"
)]
pub trait MessageSource {
    /// Wait for the next message. Must be cancel-safe.
    ///
    /// # Errors
    ///
    /// `ReceiveError::Transient` for recoverable errors, `Fatal` when the
    /// consumer cannot continue, `Closed` when the stream has ended.
    async fn recv(&self) -> Result<InboundMessage, ReceiveError>;

    /// Stop consuming and release the consumer.
    ///
    /// # Errors
    ///
    /// Returns a `ReceiveError` if the client reported a failure while closing.
    async fn close(self) -> Result<(), ReceiveError>
    where
        Self: Sized;
}

/// Hexagonal port: the producing side of the relay.
#[expect(
    async_fn_in_trait,
    reason = "no dyn dispatch needed; internal workspace only"
)]
pub trait MessageSink {
    /// Publish `message` and wait for the broker's acknowledgment.
    ///
    /// # Errors
    ///
    /// `PublishError::Rejected` when this message could not be delivered,
    /// `Fatal` when the producer cannot continue.
    async fn publish(&self, message: OutboundMessage) -> Result<Delivery, PublishError>;

    /// Flush outstanding deliveries and release the producer.
    ///
    /// # Errors
    ///
    /// Returns a `PublishError` if the flush did not complete.
    async fn close(self) -> Result<(), PublishError>
    where
        Self: Sized;
}

/// Hexagonal port: everything the lifecycle needs from a broker.
#[expect(
    async_fn_in_trait,
    reason = "no dyn dispatch needed; internal workspace only"
)]
pub trait Transport: AdminConnector {
    /// Consumer type.
    type Source: MessageSource;
    /// Producer type.
    type Sink: MessageSink;

    /// Open a consumer subscribed to `topic` as a member of `group_id`.
    ///
    /// # Errors
    ///
    /// Returns a `BrokerError` if the consumer cannot be created or subscribed.
    async fn open_source(&self, topic: &str, group_id: &str) -> Result<Self::Source, BrokerError>;

    /// Open a producer bound to `topic`.
    ///
    /// # Errors
    ///
    /// Returns a `BrokerError` if the producer cannot be created.
    async fn open_sink(&self, topic: &str) -> Result<Self::Sink, BrokerError>;
}
