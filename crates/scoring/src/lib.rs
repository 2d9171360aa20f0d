// Rust guideline compliant 2026-10-19

//! Fraud scoring for the relay.
//!
//! [`Enricher`] turns a `RawTransaction` into a `ScoredTransaction` by
//! delegating the score itself to an injected `domain::FraudScorer`. It owns
//! no scoring logic; [`ConstantScorer`] is the placeholder used until a real
//! model is plugged in.

use domain::{EnrichError, FraudScorer, RawTransaction, ScoredTransaction};

// ---------------------------------------------------------------------------
// ConstantScorer
// ---------------------------------------------------------------------------

/// Scorer that returns the same value for every record.
///
/// The default value is `0.0`.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ConstantScorer {
    value: f64,
}

impl ConstantScorer {
    /// Create a scorer that always returns `value`.
    #[must_use]
    pub const fn new(value: f64) -> Self {
        Self { value }
    }
}

impl FraudScorer for ConstantScorer {
    fn score(&self, _record: &RawTransaction) -> f64 {
        self.value
    }
}

// ---------------------------------------------------------------------------
// Enricher
// ---------------------------------------------------------------------------

/// Applies a [`FraudScorer`] and attaches its result to the record.
///
/// Generic over any scorer; the relay only ever talks to the enricher, so
/// swapping the scorer never touches relay code.
#[derive(Debug)]
pub struct Enricher<S: FraudScorer> {
    scorer: S,
}

impl<S: FraudScorer> Enricher<S> {
    /// Create an enricher wrapping `scorer`.
    #[must_use]
    pub fn new(scorer: S) -> Self {
        Self { scorer }
    }

    /// Score `raw` and attach the result.
    ///
    /// # Errors
    ///
    /// Returns [`EnrichError::NonFinite`] if the scorer produced NaN or an
    /// infinity.
    pub fn enrich(&self, raw: RawTransaction) -> Result<ScoredTransaction, EnrichError> {
        let score = self.scorer.score(&raw);
        tracing::trace!("scoring.enrich: score={score}");
        ScoredTransaction::new(raw, score)
    }
}
