//! The metric interface.

use argtutor_core::{Aar, Field, Prover};
use argtutor_oracle::ScoringOracle;
use async_trait::async_trait;

use crate::artifacts::{ArtifactKind, DerivedArtifacts};

/// A metric score; `None` means the metric has no opinion.
pub type Score = Option<f64>;

/// Everything a metric may read while scoring one record.
pub struct MetricContext<'a> {
    pub aar: &'a Aar,
    pub artifacts: &'a DerivedArtifacts,
    pub oracle: &'a dyn ScoringOracle,
    pub prover: &'a dyn Prover,
}

/// One scoring rule over an analysis record.
#[async_trait]
pub trait Metric: Send + Sync {
    /// Registry name.
    fn name(&self) -> &'static str;

    /// Fields whose change triggers recalculation.
    fn critical_fields(&self) -> &'static [Field];

    /// Derived artifacts read by [`Metric::calculate`].
    fn artifacts(&self) -> &'static [ArtifactKind] {
        &[]
    }

    async fn calculate(&self, ctx: &MetricContext<'_>) -> Score;

    /// Whether the score passes; by default any non-zero score does.
    fn is_satisfied(&self, score: Score) -> bool {
        is_truthy(score)
    }
}

/// Whether a score is defined and non-zero.
pub fn is_truthy(score: Score) -> bool {
    score.is_some_and(|s| s != 0.0)
}

/// Score is 1 up to five decimal places.
pub(crate) fn is_full(score: Score) -> bool {
    score.is_some_and(|s| (s * 1e5).round() / 1e5 >= 1.0)
}

pub(crate) fn bool_score(value: bool) -> Score {
    Some(if value { 1.0 } else { 0.0 })
}

/// `1 - 0.9^n`: zero for nothing, approaching one with diminishing returns.
pub(crate) fn saturating(n: usize) -> f64 {
    1.0 - 0.9_f64.powi(n as i32)
}
