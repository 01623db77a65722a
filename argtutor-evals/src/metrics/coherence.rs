//! Oracle-backed coherence metrics.
//!
//! Each metric compares conditional losses: a field coheres with some
//! inputs when conditioning on them does not make it harder to generate.
//! Any oracle failure leaves the score undefined.

use argtutor_core::{Aar, Field, InputMap, Layouter};
use argtutor_oracle::{GenerativeMode, ScoringOracle};
use async_trait::async_trait;
use tracing::warn;

use super::{FORM_COH_RECO, REAS_CONJ_COH_RECO, RECO_COH_SOURCE};
use crate::artifacts::ArtifactKind;
use crate::metric::{Metric, MetricContext, Score, bool_score};

/// Cues that may condition a reconstruction, in offer order.
const CONDITIONING_CUES: [Field; 3] = [Field::Gist, Field::Context, Field::SourceParaphrase];

/// All subsets of `items`, smallest first, each in the order of `items`.
fn subsets(items: &[Field]) -> Vec<Vec<Field>> {
    let n = items.len();
    let mut out = Vec::with_capacity(1 << n);
    for size in 0..=n {
        for mask in 0u32..(1 << n) {
            if mask.count_ones() as usize != size {
                continue;
            }
            let subset = (0..n)
                .filter(|i| mask & (1 << i) != 0)
                .map(|i| items[i])
                .collect();
            out.push(subset);
        }
    }
    out
}

/// Loss queries over one fixed input map.
struct LossProbe<'a> {
    oracle: &'a dyn ScoringOracle,
    inputs: InputMap,
    metric: &'static str,
}

impl<'a> LossProbe<'a> {
    fn new(ctx: &MetricContext<'a>, inputs: InputMap, metric: &'static str) -> Self {
        Self {
            oracle: ctx.oracle,
            inputs,
            metric,
        }
    }

    async fn loss(&self, mode: &GenerativeMode) -> Option<f64> {
        loss_on(self.oracle, &self.inputs, mode, self.metric).await
    }

    /// Whether `mode` is at most as lossy as `baseline`.
    async fn no_worse(&self, mode: GenerativeMode, baseline: GenerativeMode) -> Option<bool> {
        Some(self.loss(&mode).await? <= self.loss(&baseline).await?)
    }
}

async fn loss_on(
    oracle: &dyn ScoringOracle,
    inputs: &InputMap,
    mode: &GenerativeMode,
    metric: &'static str,
) -> Option<f64> {
    match oracle.loss(inputs, mode).await {
        Ok(loss) => Some(loss),
        Err(e) => {
            warn!(metric, mode = %mode, error = %e, "loss unavailable");
            None
        }
    }
}

fn available(aar: &Aar, fields: &[Field]) -> Vec<Field> {
    fields.iter().copied().filter(|f| aar.is_set(*f)).collect()
}

/// Whether the reconstruction coheres with the source text.
///
/// Scores 1 if the reconstruction is no harder to generate from the
/// source than the oracle's own default reconstruction, or if adding the
/// conclusion and some subset of the informal cues does not increase its
/// loss.
#[derive(Debug, Clone, Copy, Default)]
pub struct RecoCohSource;

#[async_trait]
impl Metric for RecoCohSource {
    fn name(&self) -> &'static str {
        RECO_COH_SOURCE
    }

    fn critical_fields(&self) -> &'static [Field] {
        &[
            Field::Conclusion,
            Field::Gist,
            Field::Context,
            Field::SourceParaphrase,
            Field::ArgdownReconstruction,
        ]
    }

    fn artifacts(&self) -> &'static [ArtifactKind] {
        &[
            ArtifactKind::ParsedReconstruction,
            ArtifactKind::DefaultReconstruction,
        ]
    }

    async fn calculate(&self, ctx: &MetricContext<'_>) -> Score {
        let aar = ctx.aar;
        if !aar.is_set(Field::ArgdownReconstruction) {
            return None;
        }
        if !aar.is_set(Field::SourceText) || ctx.artifacts.parsed_reconstruction.get().is_none() {
            return Some(0.0);
        }

        let from_source = GenerativeMode::new(Field::ArgdownReconstruction, [Field::SourceText]);
        let probe = LossProbe::new(ctx, Layouter::format(aar), self.name());
        let current = probe.loss(&from_source).await?;

        if let Some(default) = ctx.artifacts.default_reconstruction.get() {
            let mut inputs = probe.inputs.clone();
            inputs.insert(Field::ArgdownReconstruction.as_str().to_string(), default.clone());
            let default_loss = loss_on(ctx.oracle, &inputs, &from_source, self.name()).await?;
            if current <= default_loss {
                return Some(1.0);
            }
        }

        if !aar.is_set(Field::Conclusion) {
            return Some(0.0);
        }
        for cues in subsets(&available(aar, &CONDITIONING_CUES)) {
            let mut inputs = vec![Field::SourceText, Field::Conclusion];
            inputs.extend(cues);
            let mode = GenerativeMode::new(Field::ArgdownReconstruction, inputs);
            if probe.loss(&mode).await? <= current {
                return Some(1.0);
            }
        }
        Some(0.0)
    }
}

/// Whether reasons and conjectures cohere with the reconstruction.
///
/// Scores 1 if, for some subset of the informal cues, conditioning the
/// reconstruction additionally on the quotes does not increase its loss.
#[derive(Debug, Clone, Copy, Default)]
pub struct ReasConjCohReco;

#[async_trait]
impl Metric for ReasConjCohReco {
    fn name(&self) -> &'static str {
        REAS_CONJ_COH_RECO
    }

    fn critical_fields(&self) -> &'static [Field] {
        &[
            Field::ArgdownReconstruction,
            Field::Reasons,
            Field::Conjectures,
            Field::Gist,
            Field::Context,
            Field::SourceParaphrase,
        ]
    }

    fn artifacts(&self) -> &'static [ArtifactKind] {
        &[ArtifactKind::ParsedReconstruction]
    }

    async fn calculate(&self, ctx: &MetricContext<'_>) -> Score {
        let aar = ctx.aar;
        let quotes = available(aar, &[Field::Reasons, Field::Conjectures]);
        if quotes.is_empty() || !aar.is_set(Field::ArgdownReconstruction) {
            return None;
        }

        let inputs = Layouter::format_expanded(aar, ctx.artifacts.parsed_reconstruction.get());
        let probe = LossProbe::new(ctx, inputs, self.name());
        for cues in subsets(&available(aar, &CONDITIONING_CUES)) {
            let mut base = vec![Field::SourceText];
            base.extend(cues);
            let mut with_quotes = base.clone();
            with_quotes.extend(quotes.iter().copied());
            let coheres = probe
                .no_worse(
                    GenerativeMode::new(Field::ArgdownReconstruction, with_quotes),
                    GenerativeMode::new(Field::ArgdownReconstruction, base),
                )
                .await?;
            if coheres {
                return Some(1.0);
            }
        }
        Some(0.0)
    }
}

/// Whether the formalizations and keys cohere with the reconstruction.
///
/// Keys must help to formalize each group of statements, and each
/// formalization must fit its own statements at least as well as the
/// formalized conclusion does.
#[derive(Debug, Clone, Copy, Default)]
pub struct FormCohReco;

#[async_trait]
impl Metric for FormCohReco {
    fn name(&self) -> &'static str {
        FORM_COH_RECO
    }

    fn critical_fields(&self) -> &'static [Field] {
        &[
            Field::PremisesFormalized,
            Field::ConclusionFormalized,
            Field::IntermediaryConclusionsFormalized,
            Field::PlchdSubstitutions,
            Field::ArgdownReconstruction,
        ]
    }

    fn artifacts(&self) -> &'static [ArtifactKind] {
        &[ArtifactKind::ParsedReconstruction]
    }

    async fn calculate(&self, ctx: &MetricContext<'_>) -> Score {
        use Field::{
            Conclusion as C, ConclusionFormalized as FC, IntermediaryConclusions as I,
            IntermediaryConclusionsFormalized as FI, PlchdSubstitutions as K, Premises as P,
            PremisesFormalized as FP,
        };

        let aar = ctx.aar;
        if !aar.is_set(K) || !aar.is_set(FC) || !aar.is_set(FP) {
            return None;
        }
        let argument = ctx.artifacts.parsed_reconstruction.get()?;
        let check_intermediary = aar.is_set(FI) && argument.has_intermediary_conclusions();

        let probe = LossProbe::new(ctx, Layouter::format_expanded(aar, Some(argument)), self.name());
        fn m<const N: usize>(target: Field, inputs: [Field; N]) -> GenerativeMode {
            GenerativeMode::new(target, inputs)
        }
        let mut coheres = probe.no_worse(m(FC, [C, K]), m(FC, [C])).await?
            && probe.no_worse(m(FP, [P, K]), m(FP, [P])).await?;
        if coheres && check_intermediary {
            coheres = probe.no_worse(m(FI, [I, K]), m(FI, [I])).await?;
        }
        coheres = coheres && probe.no_worse(m(P, [FP, K]), m(P, [FC, K])).await?;
        if coheres && check_intermediary {
            coheres = probe.no_worse(m(I, [FI, K]), m(I, [FC, K])).await?;
        }
        bool_score(coheres)
    }
}
