//! Metrics on reasons and conjectures quoted from the source text.

use argtutor_core::{Aar, Argument, Field};
use async_trait::async_trait;

use super::{CONJECTURES_ALIGNED, REASONS_ALIGNED, SOME_CONJECTURES, SOME_REASONS};
use crate::artifacts::ArtifactKind;
use crate::metric::{Metric, MetricContext, Score, is_full, saturating};

fn some_quotes(aar: &Aar, field: Field) -> Score {
    Some(saturating(aar.quotes(field).len()))
}

/// Fraction of quotes in `field` referring to a statement accepted by `aligned`.
fn alignment(ctx: &MetricContext<'_>, field: Field, aligned: fn(&Argument, i64) -> bool) -> Score {
    let quotes = ctx.aar.quotes(field);
    if quotes.is_empty() || !ctx.aar.is_set(Field::ArgdownReconstruction) {
        return None;
    }
    let Some(argument) = ctx.artifacts.parsed_reconstruction.get() else {
        return Some(0.0);
    };
    let hits = quotes.iter().filter(|q| aligned(argument, q.ref_reco)).count();
    Some(hits as f64 / quotes.len() as f64)
}

fn labels_premise(argument: &Argument, label: i64) -> bool {
    argument.premises().any(|s| s.label == label)
}

fn labels_conclusion(argument: &Argument, label: i64) -> bool {
    argument.conclusions().any(|s| s.label == label)
}

/// Saturating count of reasons.
#[derive(Debug, Clone, Copy, Default)]
pub struct SomeReasons;

#[async_trait]
impl Metric for SomeReasons {
    fn name(&self) -> &'static str {
        SOME_REASONS
    }

    fn critical_fields(&self) -> &'static [Field] {
        &[Field::Reasons]
    }

    async fn calculate(&self, ctx: &MetricContext<'_>) -> Score {
        some_quotes(ctx.aar, Field::Reasons)
    }
}

/// Saturating count of conjectures.
#[derive(Debug, Clone, Copy, Default)]
pub struct SomeConjectures;

#[async_trait]
impl Metric for SomeConjectures {
    fn name(&self) -> &'static str {
        SOME_CONJECTURES
    }

    fn critical_fields(&self) -> &'static [Field] {
        &[Field::Conjectures]
    }

    async fn calculate(&self, ctx: &MetricContext<'_>) -> Score {
        some_quotes(ctx.aar, Field::Conjectures)
    }
}

/// Share of reasons that refer to a premise of the reconstruction.
#[derive(Debug, Clone, Copy, Default)]
pub struct ReasonsAligned;

#[async_trait]
impl Metric for ReasonsAligned {
    fn name(&self) -> &'static str {
        REASONS_ALIGNED
    }

    fn critical_fields(&self) -> &'static [Field] {
        &[Field::ArgdownReconstruction, Field::Reasons]
    }

    fn artifacts(&self) -> &'static [ArtifactKind] {
        &[ArtifactKind::ParsedReconstruction]
    }

    async fn calculate(&self, ctx: &MetricContext<'_>) -> Score {
        alignment(ctx, Field::Reasons, labels_premise)
    }

    fn is_satisfied(&self, score: Score) -> bool {
        is_full(score)
    }
}

/// Share of conjectures that refer to a conclusion of the reconstruction.
#[derive(Debug, Clone, Copy, Default)]
pub struct ConjecturesAligned;

#[async_trait]
impl Metric for ConjecturesAligned {
    fn name(&self) -> &'static str {
        CONJECTURES_ALIGNED
    }

    fn critical_fields(&self) -> &'static [Field] {
        &[Field::ArgdownReconstruction, Field::Conjectures]
    }

    fn artifacts(&self) -> &'static [ArtifactKind] {
        &[ArtifactKind::ParsedReconstruction]
    }

    async fn calculate(&self, ctx: &MetricContext<'_>) -> Score {
        alignment(ctx, Field::Conjectures, labels_conclusion)
    }

    fn is_satisfied(&self, score: Score) -> bool {
        is_full(score)
    }
}
