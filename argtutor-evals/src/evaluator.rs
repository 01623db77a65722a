//! The evaluator: a metric registry with shared artifacts and a phase gate.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use argtutor_core::{Aar, Argument, Field, Prover};
use argtutor_oracle::ScoringOracle;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, instrument, warn};

use crate::artifacts::{ArtifactKind, DerivedArtifacts};
use crate::metric::{Metric, MetricContext, Score};
use crate::metrics::{
    self, ARGUMENT_SIZE, CONJECTURES_ALIGNED, GLOBAL_COMPLETENESS, REASONS_ALIGNED,
    SOME_CONJECTURES, SOME_REASONS,
};
use crate::phase::ReconstructionPhase;

struct Registration {
    metric: Box<dyn Metric>,
    phase: Option<ReconstructionPhase>,
    alternatives: Vec<&'static str>,
    score: Score,
}

/// Scores an analysis record with every registered metric.
///
/// The evaluator remembers the last record it saw. On each
/// [`Evaluator::update`] it first refreshes the derived artifacts whose
/// source fields changed, then recomputes only the metrics whose critical
/// fields changed.
pub struct Evaluator {
    oracle: Arc<dyn ScoringOracle>,
    prover: Arc<dyn Prover>,
    registry: Vec<Registration>,
    artifacts: DerivedArtifacts,
    aar: Option<Aar>,
}

impl Evaluator {
    /// An evaluator with the standard metrics.
    ///
    /// Completeness and argument size are informative only. The remaining
    /// metrics gate the three reconstruction phases; reasons and
    /// conjectures may stand in for each other.
    pub fn new(oracle: Arc<dyn ScoringOracle>, prover: Arc<dyn Prover>) -> Self {
        use crate::phase::ReconstructionPhase::{Base, Exegetic, Formalization};

        let mut evaluator = Self::empty(oracle, prover);
        evaluator.register(metrics::GlobalCompleteness, None, &[]);
        evaluator.register(metrics::ArgumentSize, None, &[]);

        evaluator.register(metrics::ValidArgdown, Some(Base), &[]);
        evaluator.register(metrics::PcStructure, Some(Base), &[]);
        evaluator.register(metrics::NoPetitio, Some(Base), &[]);
        evaluator.register(metrics::NoRedundancy, Some(Base), &[]);
        evaluator.register(metrics::ConclMatchesReco, Some(Base), &[]);
        evaluator.register(metrics::RecoCohSource, Some(Base), &[]);

        evaluator.register(metrics::SomeReasons, Some(Exegetic), &[SOME_CONJECTURES]);
        evaluator.register(metrics::SomeConjectures, Some(Exegetic), &[SOME_REASONS]);
        evaluator.register(metrics::ReasonsAligned, Some(Exegetic), &[]);
        evaluator.register(metrics::ConjecturesAligned, Some(Exegetic), &[]);
        evaluator.register(metrics::ReasConjCohReco, Some(Exegetic), &[]);

        evaluator.register(metrics::ConsistentUsage, Some(Formalization), &[]);
        evaluator.register(metrics::CompleteFormalization, Some(Formalization), &[]);
        evaluator.register(metrics::WellFormedKeys, Some(Formalization), &[]);
        evaluator.register(metrics::WellFormedForm, Some(Formalization), &[]);
        evaluator.register(metrics::FormCohReco, Some(Formalization), &[]);
        evaluator.register(metrics::GlobalDeductiveValidity, Some(Formalization), &[]);
        evaluator.register(metrics::LocalDeductiveValidity, Some(Formalization), &[]);

        evaluator.check_alternatives();
        evaluator
    }

    /// An evaluator without metrics.
    pub fn empty(oracle: Arc<dyn ScoringOracle>, prover: Arc<dyn Prover>) -> Self {
        Self {
            oracle,
            prover,
            registry: Vec::new(),
            artifacts: DerivedArtifacts::default(),
            aar: None,
        }
    }

    /// Register a metric, optionally gating `phase`.
    ///
    /// An unsatisfied gating metric still lets its phase pass when one of
    /// its `alternatives` is satisfied. Registering a name twice replaces
    /// the earlier metric in place.
    pub fn register(
        &mut self,
        metric: impl Metric + 'static,
        phase: Option<ReconstructionPhase>,
        alternatives: &[&'static str],
    ) {
        let registration = Registration {
            metric: Box::new(metric),
            phase,
            alternatives: alternatives.to_vec(),
            score: None,
        };
        let name = registration.metric.name();
        match self.registry.iter_mut().find(|r| r.metric.name() == name) {
            Some(existing) => {
                warn!(metric = name, "metric registered twice, replacing");
                *existing = registration;
            }
            None => self.registry.push(registration),
        }
    }

    fn check_alternatives(&self) {
        for registration in &self.registry {
            for alternative in &registration.alternatives {
                if self.registration(alternative).is_none() {
                    error!(
                        metric = registration.metric.name(),
                        alternative, "alternative metric is not registered"
                    );
                }
            }
        }
    }

    fn registration(&self, name: &str) -> Option<&Registration> {
        self.registry.iter().find(|r| r.metric.name() == name)
    }

    /// Score `aar`, reusing artifacts and scores of the previous record
    /// where their inputs did not change.
    #[instrument(skip_all, level = "debug")]
    pub async fn update(&mut self, aar: &Aar) {
        if let Some(previous) = &self.aar {
            self.artifacts.invalidate(previous, aar);
        }

        let mut needed: Vec<ArtifactKind> = Vec::new();
        for registration in &self.registry {
            for kind in registration.metric.artifacts() {
                if !needed.contains(kind) {
                    needed.push(*kind);
                }
            }
        }
        for kind in needed {
            if self.artifacts.is_dirty(kind) {
                self.artifacts.refresh(kind, aar, self.oracle.as_ref()).await;
            }
        }

        let changed: Option<Vec<Field>> = self.aar.as_ref().map(|p| p.changed_fields(aar));
        let ctx = MetricContext {
            aar,
            artifacts: &self.artifacts,
            oracle: self.oracle.as_ref(),
            prover: self.prover.as_ref(),
        };
        let mut recalculated = 0;
        for registration in &mut self.registry {
            let stale = match &changed {
                None => true,
                Some(changed) => registration
                    .metric
                    .critical_fields()
                    .iter()
                    .any(|f| changed.contains(f)),
            };
            if stale {
                registration.score = registration.metric.calculate(&ctx).await;
                recalculated += 1;
            }
        }
        debug!(recalculated, total = self.registry.len(), "metrics updated");

        self.aar = Some(aar.clone());
    }

    /// The record scored by the last update.
    pub fn aar(&self) -> Option<&Aar> {
        self.aar.as_ref()
    }

    /// Registered metric names, in registration order.
    pub fn metric_names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.registry.iter().map(|r| r.metric.name())
    }

    /// Current score of a metric; `None` if undefined or unknown.
    pub fn individual_score(&self, name: &str) -> Score {
        self.registration(name).and_then(|r| r.score)
    }

    /// Whether a metric is satisfied; unknown metrics never are.
    pub fn is_satisfied(&self, name: &str) -> bool {
        self.registration(name)
            .is_some_and(|r| r.metric.is_satisfied(r.score))
    }

    /// Scores by metric name, optionally restricted to metrics gating one
    /// of `phases`.
    pub fn all_scores(&self, phases: Option<&[ReconstructionPhase]>) -> BTreeMap<String, Score> {
        self.registry
            .iter()
            .filter(|r| match phases {
                None => true,
                Some(phases) => r.phase.is_some_and(|p| phases.contains(&p)),
            })
            .map(|r| (r.metric.name().to_string(), r.score))
            .collect()
    }

    /// The first phase with an unsatisfied gating metric that no
    /// alternative makes up for; [`ReconstructionPhase::Final`] if none.
    pub fn reconstruction_phase(&self) -> ReconstructionPhase {
        for phase in [
            ReconstructionPhase::Base,
            ReconstructionPhase::Exegetic,
            ReconstructionPhase::Formalization,
        ] {
            let blocked = self
                .registry
                .iter()
                .filter(|r| r.phase == Some(phase))
                .any(|r| {
                    !r.metric.is_satisfied(r.score)
                        && !r.alternatives.iter().any(|alt| self.is_satisfied(alt))
                });
            if blocked {
                return phase;
            }
        }
        ReconstructionPhase::Final
    }

    /// Share of essential fields filled in.
    pub fn completeness(&self) -> f64 {
        self.individual_score(GLOBAL_COMPLETENESS).unwrap_or(0.0)
    }

    /// Mean of the defined scores of gating metrics.
    pub fn correctness(&self) -> f64 {
        let scores: Vec<f64> = self
            .registry
            .iter()
            .filter(|r| r.phase.is_some())
            .filter_map(|r| r.score)
            .collect();
        if scores.is_empty() {
            return 0.0;
        }
        scores.iter().sum::<f64>() / scores.len() as f64
    }

    /// How far the analysis reaches into the text: quotes, argument size
    /// and quote alignment, averaged.
    pub fn depth(&self) -> f64 {
        let score = |name| self.individual_score(name).unwrap_or(0.0);
        let quotes = score(SOME_REASONS).max(score(SOME_CONJECTURES));
        let aligned = score(REASONS_ALIGNED).max(score(CONJECTURES_ALIGNED));
        (quotes + score(ARGUMENT_SIZE) + aligned) / 3.0
    }

    /// Snapshot of all scores and aggregates.
    pub fn report(&self) -> ScoreReport {
        ScoreReport {
            scores: self.all_scores(None),
            completeness: self.completeness(),
            correctness: self.correctness(),
            depth: self.depth(),
            reconstruction_phase: self.reconstruction_phase(),
        }
    }

    /// Defined scores and aggregates as one flat map.
    pub fn as_dict(&self) -> BTreeMap<String, f64> {
        self.report().as_dict()
    }

    /// The parsed reconstruction of the last record.
    pub fn parsed_argument(&self) -> Option<&Argument> {
        self.artifacts.parsed_reconstruction.get()
    }

    pub fn artifacts(&self) -> &DerivedArtifacts {
        &self.artifacts
    }

    /// How often an artifact has been recomputed.
    pub fn refresh_count(&self, kind: ArtifactKind) -> usize {
        self.artifacts.refreshes(kind)
    }
}

impl fmt::Debug for Evaluator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Evaluator")
            .field("metrics", &self.metric_names().collect::<Vec<_>>())
            .field("has_aar", &self.aar.is_some())
            .finish_non_exhaustive()
    }
}

/// Scores and aggregates of one evaluated record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreReport {
    pub scores: BTreeMap<String, Score>,
    pub completeness: f64,
    pub correctness: f64,
    pub depth: f64,
    pub reconstruction_phase: ReconstructionPhase,
}

impl ScoreReport {
    /// Flat map of defined scores and aggregates; the phase is given by
    /// its index.
    pub fn as_dict(&self) -> BTreeMap<String, f64> {
        let mut dict: BTreeMap<String, f64> = self
            .scores
            .iter()
            .filter_map(|(name, score)| score.map(|s| (name.clone(), s)))
            .collect();
        dict.insert("completeness".into(), self.completeness);
        dict.insert("correctness".into(), self.correctness);
        dict.insert("depth".into(), self.depth);
        dict.insert(
            "reconstruction_phase".into(),
            f64::from(self.reconstruction_phase.index()),
        );
        dict
    }
}
