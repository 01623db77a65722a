//! Metrics on formalizations, keys and deductive validity.

use std::collections::HashSet;
use std::sync::LazyLock;

use argtutor_core::{Field, Formalization, Formula};
use async_trait::async_trait;
use regex::Regex;

use super::{
    COMPLETE_FORMALIZATION, GLOBAL_DEDUCTIVE_VALIDITY, LOCAL_DEDUCTIVE_VALIDITY, WELL_FORMED_FORM,
    WELL_FORMED_KEYS,
};
use crate::artifacts::{Artifact, ArtifactKind};
use crate::metric::{Metric, MetricContext, Score, bool_score, is_full};

static IDENT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[A-Za-z][A-Za-z0-9_]*").expect("valid identifier regex"));

const FORMALIZATION_FIELDS: &[Field] = &[
    Field::PremisesFormalized,
    Field::IntermediaryConclusionsFormalized,
    Field::ConclusionFormalized,
];

const FORMULAS: &[ArtifactKind] = &[
    ArtifactKind::PremiseFormulas,
    ArtifactKind::IntermediaryFormulas,
    ArtifactKind::ConclusionFormulas,
];

type Formulas = Artifact<Vec<Option<Formula>>>;

fn formulas(artifact: &Formulas) -> &[Option<Formula>] {
    artifact.get().map(Vec::as_slice).unwrap_or(&[])
}

fn formulas_of<'c>(ctx: &'c MetricContext<'_>, field: Field) -> &'c [Option<Formula>] {
    let artifacts = ctx.artifacts;
    match field {
        Field::PremisesFormalized => formulas(&artifacts.premise_formulas),
        Field::IntermediaryConclusionsFormalized => formulas(&artifacts.intermediary_formulas),
        Field::ConclusionFormalized => formulas(&artifacts.conclusion_formulas),
        _ => &[],
    }
}

/// Share of statements formalized exactly once, less dangling references.
///
/// Zero while a formalization group or the keys are missing.
#[derive(Debug, Clone, Copy, Default)]
pub struct CompleteFormalization;

#[async_trait]
impl Metric for CompleteFormalization {
    fn name(&self) -> &'static str {
        COMPLETE_FORMALIZATION
    }

    fn critical_fields(&self) -> &'static [Field] {
        &[
            Field::ArgdownReconstruction,
            Field::PremisesFormalized,
            Field::ConclusionFormalized,
            Field::IntermediaryConclusionsFormalized,
            Field::PlchdSubstitutions,
        ]
    }

    fn artifacts(&self) -> &'static [ArtifactKind] {
        &[ArtifactKind::ParsedReconstruction]
    }

    async fn calculate(&self, ctx: &MetricContext<'_>) -> Score {
        let aar = ctx.aar;
        let argument = ctx.artifacts.parsed_reconstruction.get()?;
        if !aar.is_set(Field::PremisesFormalized)
            || !aar.is_set(Field::ConclusionFormalized)
            || !aar.is_set(Field::PlchdSubstitutions)
            || (!aar.is_set(Field::IntermediaryConclusionsFormalized)
                && argument.has_intermediary_conclusions())
        {
            return Some(0.0);
        }

        fn once(forms: &[Formalization], label: i64) -> bool {
            forms.iter().filter(|f| f.ref_reco == label).count() == 1
        }
        let mut aligned = argument
            .premises()
            .filter(|s| once(&aar.premises_formalized, s.label))
            .count();
        aligned += argument
            .intermediary_conclusions()
            .filter(|s| once(&aar.intermediary_conclusions_formalized, s.label))
            .count();
        if argument
            .final_conclusion()
            .is_some_and(|last| once(&aar.conclusion_formalized, last.label))
        {
            aligned += 1;
        }

        let labels: HashSet<i64> = argument.labels().collect();
        let dangling = aar
            .all_formalizations()
            .filter(|f| !labels.contains(&f.ref_reco))
            .count();
        let aligned = aligned.saturating_sub(dangling);
        Some(aligned as f64 / argument.statements.len() as f64)
    }

    fn is_satisfied(&self, score: Score) -> bool {
        is_full(score)
    }
}

/// Whether every key symbol occurs in some formalization.
#[derive(Debug, Clone, Copy, Default)]
pub struct WellFormedKeys;

#[async_trait]
impl Metric for WellFormedKeys {
    fn name(&self) -> &'static str {
        WELL_FORMED_KEYS
    }

    fn critical_fields(&self) -> &'static [Field] {
        &[
            Field::PremisesFormalized,
            Field::ConclusionFormalized,
            Field::IntermediaryConclusionsFormalized,
            Field::PlchdSubstitutions,
        ]
    }

    async fn calculate(&self, ctx: &MetricContext<'_>) -> Score {
        let aar = ctx.aar;
        if !aar.is_set(Field::PlchdSubstitutions) {
            return None;
        }
        let symbols: HashSet<&str> = aar
            .all_formalizations()
            .flat_map(|f| IDENT_RE.find_iter(&f.form).map(|m| m.as_str()))
            .collect();
        bool_score(
            aar.plchd_substitutions
                .iter()
                .all(|k| symbols.contains(k.symbol.trim())),
        )
    }
}

/// Whether every given formalization parses.
#[derive(Debug, Clone, Copy, Default)]
pub struct WellFormedForm;

#[async_trait]
impl Metric for WellFormedForm {
    fn name(&self) -> &'static str {
        WELL_FORMED_FORM
    }

    fn critical_fields(&self) -> &'static [Field] {
        FORMALIZATION_FIELDS
    }

    fn artifacts(&self) -> &'static [ArtifactKind] {
        FORMULAS
    }

    async fn calculate(&self, ctx: &MetricContext<'_>) -> Score {
        let mut any = false;
        for field in FORMALIZATION_FIELDS {
            if !ctx.aar.is_set(*field) {
                continue;
            }
            any = true;
            if formulas_of(ctx, *field).iter().any(Option::is_none) {
                return Some(0.0);
            }
        }
        any.then_some(1.0)
    }
}

/// Whether the formalized premises entail the formalized conclusion.
#[derive(Debug, Clone, Copy, Default)]
pub struct GlobalDeductiveValidity;

#[async_trait]
impl Metric for GlobalDeductiveValidity {
    fn name(&self) -> &'static str {
        GLOBAL_DEDUCTIVE_VALIDITY
    }

    fn critical_fields(&self) -> &'static [Field] {
        FORMALIZATION_FIELDS
    }

    fn artifacts(&self) -> &'static [ArtifactKind] {
        FORMULAS
    }

    async fn calculate(&self, ctx: &MetricContext<'_>) -> Score {
        let premises = formulas_of(ctx, Field::PremisesFormalized);
        let conclusions = formulas_of(ctx, Field::ConclusionFormalized);
        if premises.is_empty() || conclusions.is_empty() {
            return None;
        }
        let Some(premises) = premises.iter().cloned().collect::<Option<Vec<_>>>() else {
            return Some(0.0);
        };
        if conclusions.iter().any(Option::is_none) {
            return Some(0.0);
        }
        let conclusion = conclusions.first().and_then(Option::as_ref)?;
        bool_score(ctx.prover.prove(conclusion, &premises))
    }
}

/// Share of inference steps that are deductively valid.
///
/// Every conclusion counts as a step; a conclusion without declared uses
/// never passes, and neither does a step with an ill-formed formula.
/// Undefined as soon as some formula of a step cannot be found by label.
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalDeductiveValidity;

impl LocalDeductiveValidity {
    /// Formula of the statement `label`: outer `None` when no formalization
    /// refers to it, inner `None` when the formalization is ill-formed.
    fn lookup<'c>(ctx: &'c MetricContext<'_>, label: i64) -> Option<Option<&'c Formula>> {
        let aar = ctx.aar;
        for field in [
            Field::PremisesFormalized,
            Field::IntermediaryConclusionsFormalized,
        ] {
            let found = aar
                .formalizations(field)
                .iter()
                .position(|f| f.ref_reco == label)
                .and_then(|idx| formulas_of(ctx, field).get(idx));
            if let Some(formula) = found {
                return Some(formula.as_ref());
            }
        }
        match aar.conclusion_formalized.first() {
            Some(f) if f.ref_reco == label => formulas_of(ctx, Field::ConclusionFormalized)
                .first()
                .map(Option::as_ref),
            _ => None,
        }
    }
}

#[async_trait]
impl Metric for LocalDeductiveValidity {
    fn name(&self) -> &'static str {
        LOCAL_DEDUCTIVE_VALIDITY
    }

    fn critical_fields(&self) -> &'static [Field] {
        &[
            Field::ArgdownReconstruction,
            Field::PremisesFormalized,
            Field::IntermediaryConclusionsFormalized,
            Field::ConclusionFormalized,
        ]
    }

    fn artifacts(&self) -> &'static [ArtifactKind] {
        &[
            ArtifactKind::ParsedReconstruction,
            ArtifactKind::PremiseFormulas,
            ArtifactKind::IntermediaryFormulas,
            ArtifactKind::ConclusionFormulas,
        ]
    }

    async fn calculate(&self, ctx: &MetricContext<'_>) -> Score {
        let argument = ctx.artifacts.parsed_reconstruction.get()?;
        let steps = argument.conclusions().count();
        if steps == 0 {
            return None;
        }

        let mut valid = 0;
        for statement in argument.conclusions().filter(|s| !s.uses.is_empty()) {
            let Some(conclusion) = Self::lookup(ctx, statement.label)? else {
                continue;
            };
            let used = statement
                .uses
                .iter()
                .map(|label| Self::lookup(ctx, *label))
                .collect::<Option<Vec<_>>>()?;
            let Some(premises) = used
                .into_iter()
                .map(|f| f.cloned())
                .collect::<Option<Vec<Formula>>>()
            else {
                continue;
            };
            if ctx.prover.prove(conclusion, &premises) {
                valid += 1;
            }
        }
        Some(valid as f64 / steps as f64)
    }

    fn is_satisfied(&self, score: Score) -> bool {
        is_full(score)
    }
}
