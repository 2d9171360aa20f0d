// Rust guideline compliant 2026-10-19

//! Relay component -- consumes raw transactions, scores them, and publishes the
//! enriched records, one message at a time.
//!
//! A single message never stops the loop: malformed payloads, unscorable
//! records, and rejected publishes are counted and skipped. Only shutdown, end
//! of stream, the optional iteration limit, or a fatal client fault end it, and
//! every exit path drains (consumer closed, then producer).
//!
//! Entry points: [`Relay::run`], [`Relay::handle`]. Configuration via
//! [`RelayConfig::builder`].

pub mod shutdown;

use domain::{
    Delivery, DecodeError, EnrichError, FraudScorer, InboundMessage, MessageSink, MessageSource,
    OutboundMessage, PublishError, RawTransaction, ReceiveError, RetryPolicy,
};
use scoring::Enricher;
use shutdown::ShutdownSignal;
use std::cell::Cell;
use tracing::Instrument;

// ---------------------------------------------------------------------------
// RelayError
// ---------------------------------------------------------------------------

/// Errors that end the relay.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RelayError {
    /// The supplied configuration is invalid.
    #[error("invalid relay configuration: {reason}")]
    InvalidConfig {
        /// Human-readable description of the problem.
        reason: String,
    },
    /// The consumer failed unrecoverably (or failed to close).
    #[error("consumer error: {0}")]
    Receive(ReceiveError),
    /// The producer failed unrecoverably (or failed to flush on close).
    #[error("producer error: {0}")]
    Publish(PublishError),
}

// ---------------------------------------------------------------------------
// RelayConfig + builder
// ---------------------------------------------------------------------------

/// What to do with a message whose publish the broker rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PublishFailurePolicy {
    /// Pause once, drop the message, move on.
    #[default]
    Drop,
    /// Re-publish up to the retry budget with its backoff, then drop. There
    /// is no pause after the last attempt.
    Retry,
}

/// Runtime configuration for a [`Relay`].
///
/// Construct via [`RelayConfig::builder`].
#[derive(Debug, Clone)]
pub struct RelayConfig {
    /// Handling of rejected publishes.
    pub failure_policy: PublishFailurePolicy,
    /// Pause after a rejected publish, and attempt budget under
    /// [`PublishFailurePolicy::Retry`]. Under `Retry` the pause only separates
    /// attempts; under `Drop` it follows the single attempt.
    pub publish_retry: RetryPolicy,
    /// Optional upper bound on the number of messages handled. `None` means
    /// until shutdown or end of stream.
    pub iterations: Option<u64>,
}

/// Builder for [`RelayConfig`].
///
/// Obtain via [`RelayConfig::builder`]; finalize with [`build`](Self::build).
#[derive(Debug)]
pub struct RelayConfigBuilder {
    failure_policy: PublishFailurePolicy,
    publish_retry: RetryPolicy,
    iterations: Option<u64>,
}

impl RelayConfig {
    /// Create a builder.
    ///
    /// Default values: `failure_policy = Drop`, `publish_retry =
    /// RetryPolicy::default()` (2 s pause), `iterations = None`.
    #[must_use]
    pub fn builder() -> RelayConfigBuilder {
        RelayConfigBuilder {
            failure_policy: PublishFailurePolicy::Drop,
            publish_retry: RetryPolicy::default(),
            iterations: None,
        }
    }
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            failure_policy: PublishFailurePolicy::Drop,
            publish_retry: RetryPolicy::default(),
            iterations: None,
        }
    }
}

impl RelayConfigBuilder {
    /// Choose how rejected publishes are handled.
    #[must_use]
    pub fn failure_policy(mut self, policy: PublishFailurePolicy) -> Self {
        self.failure_policy = policy;
        self
    }

    /// Override the publish pause / retry policy.
    #[must_use]
    pub fn publish_retry(mut self, policy: RetryPolicy) -> Self {
        self.publish_retry = policy;
        self
    }

    /// Stop after `n` messages. Without this the relay runs until shutdown or
    /// end of stream.
    #[must_use]
    pub fn iterations(mut self, n: u64) -> Self {
        self.iterations = Some(n);
        self
    }

    /// Validate and build the configuration.
    ///
    /// # Errors
    ///
    /// Returns [`RelayError::InvalidConfig`] when `iterations` is zero.
    #[must_use = "the Result must be checked; use ? or unwrap"]
    pub fn build(self) -> Result<RelayConfig, RelayError> {
        if self.iterations == Some(0) {
            return Err(RelayError::InvalidConfig {
                reason: "iterations must be >= 1 when set".to_owned(),
            });
        }
        Ok(RelayConfig {
            failure_policy: self.failure_policy,
            publish_retry: self.publish_retry,
            iterations: self.iterations,
        })
    }
}

// ---------------------------------------------------------------------------
// State, outcome, report
// ---------------------------------------------------------------------------

/// Loop state machine: `Starting -> Running -> Draining -> Stopped`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RelayState {
    /// Handles are open; `run` not yet entered.
    #[default]
    Starting,
    /// Processing messages.
    Running,
    /// Closing the consumer, then the producer.
    Draining,
    /// Both handles released.
    Stopped,
}

/// What happened to one inbound message.
#[derive(Debug, Clone, PartialEq)]
pub enum MessageOutcome {
    /// Scored and acknowledged by the broker.
    Forwarded(Delivery),
    /// Payload was not a JSON object; discarded.
    Malformed(DecodeError),
    /// The score could not be attached; discarded.
    Unscorable(EnrichError),
    /// The broker rejected the enriched record; dropped after the pause (and
    /// retries, if enabled).
    PublishFailed(PublishError),
}

/// Counters accumulated over one [`Relay::run`], plus the final state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RelayReport {
    /// Messages taken from the consumer.
    pub received: u64,
    /// Messages published and acknowledged.
    pub forwarded: u64,
    /// Payloads that were not JSON objects.
    pub malformed: u64,
    /// Records whose score could not be attached.
    pub unscorable: u64,
    /// Records dropped after a rejected publish.
    pub publish_failed: u64,
    /// State when the report was taken.
    pub state: RelayState,
}

impl RelayReport {
    /// Report for a relay that stopped without handling anything.
    #[must_use]
    pub fn empty() -> Self {
        Self { state: RelayState::Stopped, ..Self::default() }
    }

    /// Messages received but not forwarded.
    #[must_use]
    pub fn skipped(&self) -> u64 {
        self.malformed + self.unscorable + self.publish_failed
    }

    fn record(&mut self, outcome: &MessageOutcome) {
        match outcome {
            MessageOutcome::Forwarded(_) => self.forwarded += 1,
            MessageOutcome::Malformed(_) => self.malformed += 1,
            MessageOutcome::Unscorable(_) => self.unscorable += 1,
            MessageOutcome::PublishFailed(_) => self.publish_failed += 1,
        }
    }
}

// ---------------------------------------------------------------------------
// Relay
// ---------------------------------------------------------------------------

/// Consume-score-produce loop.
///
/// Owns the consumer and producer handles exclusively; they are released when
/// [`run`](Self::run) returns. Generic over the source, sink, and scorer ports
/// for static dispatch.
#[derive(Debug)]
pub struct Relay<S: FraudScorer, Src: MessageSource, Snk: MessageSink> {
    config: RelayConfig,
    enricher: Enricher<S>,
    source: Src,
    sink: Snk,
    state: Cell<RelayState>,
}

impl<S, Src, Snk> Relay<S, Src, Snk>
where
    S: FraudScorer,
    Src: MessageSource,
    Snk: MessageSink,
{
    /// Create a relay in state [`RelayState::Starting`] from already opened
    /// handles.
    #[must_use]
    pub fn new(config: RelayConfig, enricher: Enricher<S>, source: Src, sink: Snk) -> Self {
        Self { config, enricher, source, sink, state: Cell::new(RelayState::Starting) }
    }

    /// Current loop state.
    #[must_use]
    pub fn state(&self) -> RelayState {
        self.state.get()
    }

    fn transition(&self, next: RelayState) {
        tracing::debug!("relay.state: {:?} -> {next:?}", self.state());
        self.state.set(next);
    }

    /// Decode, score, and publish one message.
    ///
    /// Per-message failures are returned as `Ok` outcomes so the caller can
    /// keep going.
    ///
    /// # Errors
    ///
    /// Returns [`RelayError::Publish`] only when the producer reports a fatal
    /// fault.
    pub async fn handle(&self, message: InboundMessage) -> Result<MessageOutcome, RelayError> {
        let InboundMessage { key, payload, partition, offset } = message;

        let raw = match RawTransaction::decode(&payload) {
            Ok(raw) => raw,
            Err(e) => {
                tracing::error!(
                    "relay.malformed: partition={partition} offset={offset} error={e} payload={} bytes={payload:?}",
                    String::from_utf8_lossy(&payload)
                );
                return Ok(MessageOutcome::Malformed(e));
            }
        };

        let transaction_id = raw.get("transaction_id").map_or_else(|| "-".to_owned(), ToString::to_string);
        let scored = self.enricher.enrich(raw).and_then(|scored| scored.encode());
        let encoded = match scored {
            Ok(bytes) => bytes,
            Err(e) => {
                tracing::warn!(
                    "relay.unscorable: partition={partition} offset={offset} transaction_id={transaction_id} error={e}"
                );
                return Ok(MessageOutcome::Unscorable(e));
            }
        };

        let outcome = self.publish(OutboundMessage { key, payload: encoded }).await?;
        if let MessageOutcome::Forwarded(delivery) = &outcome {
            tracing::debug!(
                "relay.forwarded: transaction_id={transaction_id} from={partition}/{offset} to={}/{}",
                delivery.partition,
                delivery.offset
            );
        }
        Ok(outcome)
    }

    async fn publish(&self, message: OutboundMessage) -> Result<MessageOutcome, RelayError> {
        let policy = &self.config.publish_retry;
        let budget = match self.config.failure_policy {
            PublishFailurePolicy::Drop => 1,
            PublishFailurePolicy::Retry => policy.max_attempts(),
        };

        let mut attempt = 0u32;
        loop {
            attempt += 1;
            match self.sink.publish(message.clone()).await {
                Ok(delivery) => return Ok(MessageOutcome::Forwarded(delivery)),
                Err(e @ PublishError::Fatal { .. }) => {
                    tracing::error!("relay.publish_fatal: attempt={attempt} error={e}");
                    return Err(RelayError::Publish(e));
                }
                Err(e) => {
                    let pause = policy.delay_for(attempt);
                    if attempt >= budget {
                        if self.config.failure_policy == PublishFailurePolicy::Retry {
                            tracing::error!("relay.publish_failed: dropped after {attempt} attempt(s): {e}");
                            return Ok(MessageOutcome::PublishFailed(e));
                        }
                        tracing::error!(
                            "relay.publish_failed: dropped after {attempt} attempt(s), pausing {}ms: {e}",
                            pause.as_millis()
                        );
                        tokio::time::sleep(pause).await;
                        return Ok(MessageOutcome::PublishFailed(e));
                    }
                    tracing::warn!(
                        "relay.publish_retry: attempt={attempt}/{budget} delay_ms={} error={e}",
                        pause.as_millis()
                    );
                    tokio::time::sleep(pause).await;
                }
            }
        }
    }

    /// Run until shutdown, end of stream, the iteration limit, or a fatal
    /// fault, then drain.
    ///
    /// Shutdown is observed only while waiting for the next message; a message
    /// already taken is always finished first.
    ///
    /// # Errors
    ///
    /// Returns [`RelayError::Receive`] / [`RelayError::Publish`] for a fatal
    /// client fault, after draining. If the loop ended cleanly but closing a
    /// handle failed, that failure is returned instead.
    pub async fn run(self, shutdown: &mut ShutdownSignal) -> Result<RelayReport, RelayError> {
        self.run_inner(shutdown).instrument(tracing::info_span!("relay")).await
    }

    async fn run_inner(self, shutdown: &mut ShutdownSignal) -> Result<RelayReport, RelayError> {
        self.transition(RelayState::Running);
        tracing::info!("relay.running: waiting for messages");

        let mut report = RelayReport::default();
        let loop_result = self.pump(shutdown, &mut report).await;

        self.transition(RelayState::Draining);
        let Self { source, sink, state, .. } = self;
        let drain_result = drain(source, sink).await;
        state.set(RelayState::Stopped);
        report.state = RelayState::Stopped;

        tracing::info!(
            "relay.stopped: received={} forwarded={} malformed={} unscorable={} publish_failed={}",
            report.received,
            report.forwarded,
            report.malformed,
            report.unscorable,
            report.publish_failed
        );

        loop_result?;
        drain_result?;
        Ok(report)
    }

    async fn pump(&self, shutdown: &mut ShutdownSignal, report: &mut RelayReport) -> Result<(), RelayError> {
        loop {
            if let Some(max) = self.config.iterations
                && report.received >= max
            {
                tracing::info!("relay.run.stopped: iteration limit reached");
                return Ok(());
            }

            let received = tokio::select! {
                biased;
                () = shutdown.wait() => {
                    tracing::info!("relay.shutdown: signal received after {} message(s)", report.received);
                    return Ok(());
                }
                received = self.source.recv() => received,
            };

            match received {
                Ok(message) => {
                    report.received += 1;
                    let outcome = self.handle(message).await?;
                    report.record(&outcome);
                }
                Err(ReceiveError::Transient { reason }) => {
                    tracing::warn!("relay.receive_transient: {reason}");
                }
                Err(ReceiveError::Closed) => {
                    tracing::info!("relay.run.stopped: end of stream after {} message(s)", report.received);
                    return Ok(());
                }
                Err(e @ ReceiveError::Fatal { .. }) => {
                    tracing::error!("relay.receive_fatal: {e}");
                    return Err(RelayError::Receive(e));
                }
            }
        }
    }
}

/// Close the consumer, then the producer. Both are attempted; the first
/// failure is returned.
async fn drain<Src: MessageSource, Snk: MessageSink>(source: Src, sink: Snk) -> Result<(), RelayError> {
    let source_result = source.close().await.map_err(RelayError::Receive);
    if let Err(e) = &source_result {
        tracing::warn!("relay.drain: consumer close failed: {e}");
    }
    let sink_result = sink.close().await.map_err(RelayError::Publish);
    if let Err(e) = &sink_result {
        tracing::error!("relay.drain: producer flush failed, deliveries may be lost: {e}");
    }
    source_result.and(sink_result)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
