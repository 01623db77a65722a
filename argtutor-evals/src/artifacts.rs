//! Artifacts derived from an analysis record and shared between metrics.
//!
//! Each artifact is recomputed only when a field it derives from changed,
//! and at most once per evaluator update, before any metric reads it.

use argtutor_core::{
    Aar, Argument, Field, Formula, Layouter, parse_argdown, parse_formalization,
};
use argtutor_oracle::{GenerativeMode, ScoringOracle, postprocess_argdown};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Names of the derived artifacts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArtifactKind {
    ParsedReconstruction,
    PremiseFormulas,
    IntermediaryFormulas,
    ConclusionFormulas,
    /// Oracle reconstruction of the bare source text (`s => a`).
    DefaultReconstruction,
}

impl ArtifactKind {
    /// The field the artifact derives from.
    pub fn source_field(&self) -> Field {
        match self {
            ArtifactKind::ParsedReconstruction => Field::ArgdownReconstruction,
            ArtifactKind::PremiseFormulas => Field::PremisesFormalized,
            ArtifactKind::IntermediaryFormulas => Field::IntermediaryConclusionsFormalized,
            ArtifactKind::ConclusionFormulas => Field::ConclusionFormalized,
            ArtifactKind::DefaultReconstruction => Field::SourceText,
        }
    }
}

/// A cached value with an explicit dirty flag.
#[derive(Debug, Clone)]
pub struct Artifact<T> {
    value: Option<T>,
    dirty: bool,
    refreshes: usize,
}

impl<T> Artifact<T> {
    fn new() -> Self {
        Self {
            value: None,
            dirty: true,
            refreshes: 0,
        }
    }

    /// The value; `None` if absent or not derivable.
    pub fn get(&self) -> Option<&T> {
        self.value.as_ref()
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// How often the value has been recomputed.
    pub fn refreshes(&self) -> usize {
        self.refreshes
    }

    fn set(&mut self, value: Option<T>) {
        self.value = value;
        self.dirty = false;
        self.refreshes += 1;
    }
}

/// All derived artifacts of the current record.
#[derive(Debug, Clone)]
pub struct DerivedArtifacts {
    pub parsed_reconstruction: Artifact<Argument>,
    pub premise_formulas: Artifact<Vec<Option<Formula>>>,
    pub intermediary_formulas: Artifact<Vec<Option<Formula>>>,
    pub conclusion_formulas: Artifact<Vec<Option<Formula>>>,
    pub default_reconstruction: Artifact<String>,
}

impl Default for DerivedArtifacts {
    fn default() -> Self {
        Self {
            parsed_reconstruction: Artifact::new(),
            premise_formulas: Artifact::new(),
            intermediary_formulas: Artifact::new(),
            conclusion_formulas: Artifact::new(),
            default_reconstruction: Artifact::new(),
        }
    }
}

impl DerivedArtifacts {
    pub fn is_dirty(&self, kind: ArtifactKind) -> bool {
        match kind {
            ArtifactKind::ParsedReconstruction => self.parsed_reconstruction.is_dirty(),
            ArtifactKind::PremiseFormulas => self.premise_formulas.is_dirty(),
            ArtifactKind::IntermediaryFormulas => self.intermediary_formulas.is_dirty(),
            ArtifactKind::ConclusionFormulas => self.conclusion_formulas.is_dirty(),
            ArtifactKind::DefaultReconstruction => self.default_reconstruction.is_dirty(),
        }
    }

    pub fn refreshes(&self, kind: ArtifactKind) -> usize {
        match kind {
            ArtifactKind::ParsedReconstruction => self.parsed_reconstruction.refreshes(),
            ArtifactKind::PremiseFormulas => self.premise_formulas.refreshes(),
            ArtifactKind::IntermediaryFormulas => self.intermediary_formulas.refreshes(),
            ArtifactKind::ConclusionFormulas => self.conclusion_formulas.refreshes(),
            ArtifactKind::DefaultReconstruction => self.default_reconstruction.refreshes(),
        }
    }

    /// Mark artifacts dirty whose source field differs between the records.
    pub fn invalidate(&mut self, previous: &Aar, next: &Aar) {
        for kind in [
            ArtifactKind::ParsedReconstruction,
            ArtifactKind::PremiseFormulas,
            ArtifactKind::IntermediaryFormulas,
            ArtifactKind::ConclusionFormulas,
            ArtifactKind::DefaultReconstruction,
        ] {
            if !previous.same_field(next, kind.source_field()) {
                self.mark_dirty(kind);
            }
        }
    }

    fn mark_dirty(&mut self, kind: ArtifactKind) {
        match kind {
            ArtifactKind::ParsedReconstruction => self.parsed_reconstruction.dirty = true,
            ArtifactKind::PremiseFormulas => self.premise_formulas.dirty = true,
            ArtifactKind::IntermediaryFormulas => self.intermediary_formulas.dirty = true,
            ArtifactKind::ConclusionFormulas => self.conclusion_formulas.dirty = true,
            ArtifactKind::DefaultReconstruction => self.default_reconstruction.dirty = true,
        }
    }

    /// Recompute one artifact from the record.
    pub async fn refresh(&mut self, kind: ArtifactKind, aar: &Aar, oracle: &dyn ScoringOracle) {
        debug!(artifact = ?kind, "refreshing derived artifact");
        match kind {
            ArtifactKind::ParsedReconstruction => {
                let parsed = aar.argdown_reconstruction.as_deref().and_then(parse_argdown);
                self.parsed_reconstruction.set(parsed);
            }
            ArtifactKind::PremiseFormulas => {
                self.premise_formulas
                    .set(Some(parse_formalization(&aar.premises_formalized)));
            }
            ArtifactKind::IntermediaryFormulas => {
                self.intermediary_formulas.set(Some(parse_formalization(
                    &aar.intermediary_conclusions_formalized,
                )));
            }
            ArtifactKind::ConclusionFormulas => {
                self.conclusion_formulas
                    .set(Some(parse_formalization(&aar.conclusion_formalized)));
            }
            ArtifactKind::DefaultReconstruction => {
                let generated = default_reconstruction(aar, oracle).await;
                self.default_reconstruction.set(generated);
            }
        }
    }
}

async fn default_reconstruction(aar: &Aar, oracle: &dyn ScoringOracle) -> Option<String> {
    if !aar.is_set(Field::SourceText) {
        return None;
    }
    let mode = GenerativeMode::new(Field::ArgdownReconstruction, [Field::SourceText]);
    match oracle.generate(&Layouter::format(aar), &mode).await {
        Ok(generation) => Some(postprocess_argdown(generation.text())),
        Err(e) => {
            warn!(mode = %mode, error = %e, "default reconstruction unavailable");
            None
        }
    }
}
