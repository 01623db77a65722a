//! The standard metrics.

mod coherence;
mod exegesis;
mod formal;
mod structure;

pub use coherence::{FormCohReco, ReasConjCohReco, RecoCohSource};
pub use exegesis::{ConjecturesAligned, ReasonsAligned, SomeConjectures, SomeReasons};
pub use formal::{
    CompleteFormalization, GlobalDeductiveValidity, LocalDeductiveValidity, WellFormedForm,
    WellFormedKeys,
};
pub use structure::{
    ArgumentSize, ConclMatchesReco, ConsistentUsage, GlobalCompleteness, NoPetitio, NoRedundancy,
    PcStructure, ValidArgdown,
};

pub const GLOBAL_COMPLETENESS: &str = "GlobalCompletenessScore";
pub const ARGUMENT_SIZE: &str = "ArgumentSizeScore";
pub const VALID_ARGDOWN: &str = "ValidArgdownScore";
pub const PC_STRUCTURE: &str = "PCStructureScore";
pub const NO_PETITIO: &str = "NoPetitioScore";
pub const NO_REDUNDANCY: &str = "NoRedundancyScore";
pub const CONCL_MATCHES_RECO: &str = "ConclMatchesRecoScore";
pub const RECO_COH_SOURCE: &str = "RecoCohSourceScore";
pub const SOME_REASONS: &str = "SomeReasonsScore";
pub const SOME_CONJECTURES: &str = "SomeConjecturesScore";
pub const REASONS_ALIGNED: &str = "ReasonsAlignedScore";
pub const CONJECTURES_ALIGNED: &str = "ConjecturesAlignedScore";
pub const REAS_CONJ_COH_RECO: &str = "ReasConjCohRecoScore";
pub const CONSISTENT_USAGE: &str = "ConsistentUsageScore";
pub const COMPLETE_FORMALIZATION: &str = "CompleteFormalization";
pub const WELL_FORMED_KEYS: &str = "WellFormedKeysScore";
pub const WELL_FORMED_FORM: &str = "WellFormedFormScore";
pub const FORM_COH_RECO: &str = "FormCohRecoScore";
pub const GLOBAL_DEDUCTIVE_VALIDITY: &str = "GlobalDeductiveValidityScore";
pub const LOCAL_DEDUCTIVE_VALIDITY: &str = "LocalDeductiveValidityScore";

#[cfg(test)]
pub(crate) mod testing {
    use argtutor_core::{Aar, ModelSearchProver};
    use argtutor_oracle::{NullOracle, ScoringOracle};

    use crate::artifacts::DerivedArtifacts;
    use crate::metric::{Metric, MetricContext, Score};

    /// Score a record with the metric's artifacts freshly derived.
    pub async fn score_with(metric: &dyn Metric, aar: &Aar, oracle: &dyn ScoringOracle) -> Score {
        let mut artifacts = DerivedArtifacts::default();
        for kind in metric.artifacts() {
            artifacts.refresh(*kind, aar, oracle).await;
        }
        let prover = ModelSearchProver::default();
        let ctx = MetricContext {
            aar,
            artifacts: &artifacts,
            oracle,
            prover: &prover,
        };
        metric.calculate(&ctx).await
    }

    pub async fn score(metric: &dyn Metric, aar: &Aar) -> Score {
        score_with(metric, aar, &NullOracle).await
    }

    pub fn with_reco(reco: &str) -> Aar {
        let mut aar = Aar::new("Peter is lonely. So he calls his sister.");
        aar.argdown_reconstruction = Some(reco.to_string());
        aar
    }
}
