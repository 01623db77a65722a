//! Scoring of argument analyses.
//!
//! Metrics judge one aspect of an analysis record each. The [`Evaluator`]
//! keeps them in a registry, shares derived artifacts (the parsed
//! reconstruction, parsed formulas, a default reconstruction) between
//! them, and maps the scores to a [`ReconstructionPhase`].

mod artifacts;
mod evaluator;
mod metric;
pub mod metrics;
mod phase;

// Metric interface
pub use metric::{Metric, MetricContext, Score, is_truthy};

// Artifact types
pub use artifacts::{Artifact, ArtifactKind, DerivedArtifacts};

// Evaluator
pub use evaluator::{Evaluator, ScoreReport};

// Phase types
pub use phase::ReconstructionPhase;
