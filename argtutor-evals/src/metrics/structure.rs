//! Completeness, size and structural checks of the reconstruction.

use argtutor_core::{Argument, Field};
use async_trait::async_trait;

use super::{
    ARGUMENT_SIZE, CONCL_MATCHES_RECO, CONSISTENT_USAGE, GLOBAL_COMPLETENESS, NO_PETITIO,
    NO_REDUNDANCY, PC_STRUCTURE, VALID_ARGDOWN,
};
use crate::artifacts::ArtifactKind;
use crate::metric::{Metric, MetricContext, Score, bool_score, saturating};

const RECONSTRUCTION: &[Field] = &[Field::ArgdownReconstruction];
const PARSED: &[ArtifactKind] = &[ArtifactKind::ParsedReconstruction];

/// Ratio of non-empty essential fields.
///
/// Source text and informal cues other than the conclusion are not
/// essential; derived fields are not counted.
#[derive(Debug, Clone, Copy, Default)]
pub struct GlobalCompleteness;

impl GlobalCompleteness {
    pub const ESSENTIAL: [Field; 8] = [
        Field::ArgdownReconstruction,
        Field::Reasons,
        Field::Conjectures,
        Field::Conclusion,
        Field::PremisesFormalized,
        Field::IntermediaryConclusionsFormalized,
        Field::ConclusionFormalized,
        Field::PlchdSubstitutions,
    ];
}

#[async_trait]
impl Metric for GlobalCompleteness {
    fn name(&self) -> &'static str {
        GLOBAL_COMPLETENESS
    }

    fn critical_fields(&self) -> &'static [Field] {
        &Self::ESSENTIAL
    }

    async fn calculate(&self, ctx: &MetricContext<'_>) -> Score {
        let set = Self::ESSENTIAL
            .iter()
            .filter(|f| ctx.aar.is_set(**f))
            .count();
        Some(set as f64 / Self::ESSENTIAL.len() as f64)
    }
}

/// Saturating count of statements in the parsed reconstruction.
#[derive(Debug, Clone, Copy, Default)]
pub struct ArgumentSize;

#[async_trait]
impl Metric for ArgumentSize {
    fn name(&self) -> &'static str {
        ARGUMENT_SIZE
    }

    fn critical_fields(&self) -> &'static [Field] {
        RECONSTRUCTION
    }

    fn artifacts(&self) -> &'static [ArtifactKind] {
        PARSED
    }

    async fn calculate(&self, ctx: &MetricContext<'_>) -> Score {
        if !ctx.aar.is_set(Field::ArgdownReconstruction) {
            return None;
        }
        let argument = ctx.artifacts.parsed_reconstruction.get()?;
        Some(saturating(argument.statements.len()))
    }
}

/// Whether the reconstruction parses: 1 if it does, 0 if not, undefined
/// without a reconstruction.
#[derive(Debug, Clone, Copy, Default)]
pub struct ValidArgdown;

#[async_trait]
impl Metric for ValidArgdown {
    fn name(&self) -> &'static str {
        VALID_ARGDOWN
    }

    fn critical_fields(&self) -> &'static [Field] {
        RECONSTRUCTION
    }

    fn artifacts(&self) -> &'static [ArtifactKind] {
        PARSED
    }

    async fn calculate(&self, ctx: &MetricContext<'_>) -> Score {
        if !ctx.aar.is_set(Field::ArgdownReconstruction) {
            return None;
        }
        bool_score(ctx.artifacts.parsed_reconstruction.get().is_some())
    }
}

/// Boolean checks over the parsed argument, undefined when there is none.
macro_rules! argument_check {
    ($(#[$doc:meta])* $name:ident, $key:expr, $check:expr) => {
        $(#[$doc])*
        #[derive(Debug, Clone, Copy, Default)]
        pub struct $name;

        #[async_trait]
        impl Metric for $name {
            fn name(&self) -> &'static str {
                $key
            }

            fn critical_fields(&self) -> &'static [Field] {
                RECONSTRUCTION
            }

            fn artifacts(&self) -> &'static [ArtifactKind] {
                PARSED
            }

            async fn calculate(&self, ctx: &MetricContext<'_>) -> Score {
                let check: fn(&Argument) -> bool = $check;
                ctx.artifacts.parsed_reconstruction.get().and_then(|a| bool_score(check(a)))
            }
        }
    };
}

argument_check!(
    /// First statement is a premise, last statement a conclusion.
    PcStructure,
    PC_STRUCTURE,
    Argument::has_pc_structure
);

argument_check!(
    /// Inferences use earlier statements, and every statement but the last is used.
    ConsistentUsage,
    CONSISTENT_USAGE,
    Argument::has_consistent_usage
);

argument_check!(
    /// No conclusion restates a premise.
    NoPetitio,
    NO_PETITIO,
    Argument::is_no_petitio
);

argument_check!(
    /// No premise or conclusion occurs twice.
    NoRedundancy,
    NO_REDUNDANCY,
    Argument::is_no_redundancy
);

/// Whether the conclusion cue equals the final statement of the reconstruction.
#[derive(Debug, Clone, Copy, Default)]
pub struct ConclMatchesReco;

#[async_trait]
impl Metric for ConclMatchesReco {
    fn name(&self) -> &'static str {
        CONCL_MATCHES_RECO
    }

    fn critical_fields(&self) -> &'static [Field] {
        &[Field::ArgdownReconstruction, Field::Conclusion]
    }

    fn artifacts(&self) -> &'static [ArtifactKind] {
        PARSED
    }

    async fn calculate(&self, ctx: &MetricContext<'_>) -> Score {
        let cue = ctx.aar.conclusion_cue()?;
        let Some(last) = ctx
            .artifacts
            .parsed_reconstruction
            .get()
            .and_then(Argument::final_conclusion)
        else {
            return Some(0.0);
        };
        bool_score(last.text.trim().to_lowercase() == cue.trim().to_lowercase())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::testing::{score, with_reco};
    use argtutor_core::{Aar, Formalization, Quote};

    const SIMPLE: &str =
        "(1) Peter is lonely. -- with modus ponens from (1) -- (2) So he calls his sister.";

    // === Completeness ===

    #[tokio::test]
    async fn completeness_of_bare_record_is_zero() {
        assert_eq!(score(&GlobalCompleteness, &Aar::new("src")).await, Some(0.0));
    }

    #[tokio::test]
    async fn completeness_counts_essential_fields() {
        let mut aar = with_reco(SIMPLE);
        aar.gist = Some("ignored".into());
        aar.reasons = vec![Quote::new("Peter is lonely", 1)];
        aar.premises_formalized = vec![Formalization::new("p", 1)];
        assert_eq!(score(&GlobalCompleteness, &aar).await, Some(3.0 / 8.0));
    }

    // === Size and syntax ===

    #[tokio::test]
    async fn simple_argument_is_valid_with_pc_structure() {
        let aar = with_reco(SIMPLE);
        assert_eq!(score(&ValidArgdown, &aar).await, Some(1.0));
        assert_eq!(score(&PcStructure, &aar).await, Some(1.0));
        let size = score(&ArgumentSize, &aar).await.unwrap();
        assert!((size - 0.19).abs() < 1e-9);
    }

    #[tokio::test]
    async fn unparsable_reconstruction_scores_zero_validity() {
        let aar = with_reco("Peter is lonely, so he calls.");
        assert_eq!(score(&ValidArgdown, &aar).await, Some(0.0));
        assert_eq!(score(&PcStructure, &aar).await, None);
        assert_eq!(score(&ArgumentSize, &aar).await, None);
        assert_eq!(score(&NoPetitio, &aar).await, None);
    }

    #[tokio::test]
    async fn structural_metrics_are_undefined_without_reconstruction() {
        let aar = Aar::new("src");
        for metric in [
            &ValidArgdown as &dyn Metric,
            &PcStructure,
            &ConsistentUsage,
            &NoPetitio,
            &NoRedundancy,
            &ArgumentSize,
        ] {
            assert_eq!(score(metric, &aar).await, None, "{}", metric.name());
        }
    }

    #[tokio::test]
    async fn petitio_and_redundancy_are_detected() {
        let aar = with_reco("(1) Peter is lonely.\n(2) Peter is lonely.\n-- from (1) (2) --\n(3) Peter is lonely.");
        assert_eq!(score(&NoPetitio, &aar).await, Some(0.0));
        assert_eq!(score(&NoRedundancy, &aar).await, Some(0.0));
        assert_eq!(score(&ConsistentUsage, &aar).await, Some(1.0));
    }

    // === Conclusion match ===

    #[tokio::test]
    async fn conclusion_match_ignores_case_and_whitespace() {
        let mut aar = with_reco(SIMPLE);
        aar.conclusion = vec![Quote::unreferenced(" so HE calls his sister. ")];
        assert_eq!(score(&ConclMatchesReco, &aar).await, Some(1.0));
    }

    #[tokio::test]
    async fn conclusion_mismatch_scores_zero() {
        let mut aar = with_reco(SIMPLE);
        aar.conclusion = vec![Quote::unreferenced("Peter is happy.")];
        assert_eq!(score(&ConclMatchesReco, &aar).await, Some(0.0));

        aar.argdown_reconstruction = Some("not argdown".into());
        assert_eq!(score(&ConclMatchesReco, &aar).await, Some(0.0));
    }

    #[tokio::test]
    async fn conclusion_match_needs_a_cue() {
        assert_eq!(score(&ConclMatchesReco, &with_reco(SIMPLE)).await, None);
    }
}
