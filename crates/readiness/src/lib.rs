// Rust guideline compliant 2026-10-19

//! Readiness gate -- probes the broker control plane until it answers or the
//! retry budget is spent.
//!
//! Entry point: [`ReadinessGate::await_ready`]. Configuration via
//! [`ReadinessGate::builder`].

use domain::{AdminConnector, BrokerAdmin, BrokerError, RetryPolicy};
use rand::{Rng, SeedableRng, rngs::StdRng};
use std::cell::RefCell;
use std::time::Duration;

// ---------------------------------------------------------------------------
// ReadinessError
// ---------------------------------------------------------------------------

/// The broker did not become ready; startup must not continue.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ReadinessError {
    /// Every attempt failed with a connection-class error.
    #[error("broker not ready after {attempts} attempt(s): {last_error}")]
    Exhausted {
        /// Number of probes performed.
        attempts: u32,
        /// Error from the final probe.
        last_error: BrokerError,
    },
    /// A probe failed with an error that retrying cannot fix.
    #[error("broker probe failed on attempt {attempt}: {source}")]
    Fatal {
        /// Attempt number (1-based) that failed.
        attempt: u32,
        /// The underlying broker error.
        source: BrokerError,
    },
}

// ---------------------------------------------------------------------------
// ReadinessGate + builder
// ---------------------------------------------------------------------------

/// Builder for [`ReadinessGate`].
///
/// Obtain via [`ReadinessGate::builder`]; finalize with [`build`](Self::build).
#[derive(Debug)]
pub struct ReadinessGateBuilder {
    policy: RetryPolicy,
    jitter: bool,
    seed: Option<u64>,
}

impl ReadinessGateBuilder {
    /// Randomize each delay within `[delay / 2, delay]`.
    ///
    /// Spreads the probes of many instances starting at once.
    #[must_use]
    pub fn jitter(mut self, jitter: bool) -> Self {
        self.jitter = jitter;
        self
    }

    /// Fix the jitter RNG seed (useful in tests).
    #[must_use]
    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Build the gate.
    #[must_use]
    pub fn build(self) -> ReadinessGate {
        let rng = match self.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };
        ReadinessGate { policy: self.policy, jitter: self.jitter, rng: RefCell::new(rng) }
    }
}

/// Waits for the broker to answer a lightweight control-plane call.
///
/// Each probe opens its own admin connection and closes it before the next
/// step, whatever the outcome. Only connection-class failures are retried.
#[derive(Debug)]
pub struct ReadinessGate {
    policy: RetryPolicy,
    jitter: bool,
    /// Interior mutability required because all public methods take `&self`.
    rng: RefCell<StdRng>,
}

impl ReadinessGate {
    /// Create a builder for a gate driven by `policy`. Jitter is off by default.
    #[must_use]
    pub fn builder(policy: RetryPolicy) -> ReadinessGateBuilder {
        ReadinessGateBuilder { policy, jitter: false, seed: None }
    }

    /// The retry policy in use.
    #[must_use]
    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Probe until the broker lists its topics.
    ///
    /// Returns the number of attempts it took. No delay follows the final
    /// attempt.
    ///
    /// # Errors
    ///
    /// Returns [`ReadinessError::Exhausted`] when `max_attempts` probes all
    /// failed with connection errors, or [`ReadinessError::Fatal`] on the first
    /// non-connection error.
    pub async fn await_ready<C: AdminConnector>(&self, connector: &C) -> Result<u32, ReadinessError> {
        let max = self.policy.max_attempts();
        let mut attempt = 0u32;
        loop {
            attempt += 1;
            match probe(connector).await {
                Ok(topic_count) => {
                    tracing::info!(
                        "readiness.ready: attempt={attempt}/{max} topics={topic_count}"
                    );
                    return Ok(attempt);
                }
                Err(e) if e.is_connection() => {
                    if attempt >= max {
                        tracing::error!("readiness.exhausted: attempts={attempt} error={e}");
                        return Err(ReadinessError::Exhausted { attempts: attempt, last_error: e });
                    }
                    let delay = self.next_delay(attempt);
                    tracing::warn!(
                        "readiness.retry: attempt={attempt}/{max} delay_ms={} error={e}",
                        delay.as_millis()
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(e) => {
                    tracing::error!("readiness.fatal: attempt={attempt} error={e}");
                    return Err(ReadinessError::Fatal { attempt, source: e });
                }
            }
        }
    }

    /// Delay after failed attempt `attempt`, jittered if enabled.
    fn next_delay(&self, attempt: u32) -> Duration {
        let base = self.policy.delay_for(attempt);
        if !self.jitter {
            return base;
        }
        let half = base / 2;
        let spread_ms = u64::try_from(base.saturating_sub(half).as_millis()).unwrap_or(u64::MAX);
        let extra = self.rng.borrow_mut().random_range(0..=spread_ms);
        half + Duration::from_millis(extra)
    }
}

/// One probe: open, list, close. The connection is closed even if listing failed.
async fn probe<C: AdminConnector>(connector: &C) -> Result<usize, BrokerError> {
    let admin = connector.connect().await?;
    let listed = admin.list_topics().await;
    if let Err(e) = admin.close().await {
        tracing::debug!("readiness.probe.close_failed: error={e}");
    }
    listed.map(|topics| topics.len())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
