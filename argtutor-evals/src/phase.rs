//! Reconstruction phases.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Stage of a reconstruction, from a first well-formed argument to a
/// polished analysis.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum ReconstructionPhase {
    /// Build a well-formed reconstruction.
    #[default]
    Base,
    /// Ground the reconstruction in the source text.
    Exegetic,
    /// Formalize the reconstruction.
    Formalization,
    /// Every gated check passes.
    Final,
}

impl ReconstructionPhase {
    pub const ALL: [ReconstructionPhase; 4] = [
        ReconstructionPhase::Base,
        ReconstructionPhase::Exegetic,
        ReconstructionPhase::Formalization,
        ReconstructionPhase::Final,
    ];

    pub fn index(&self) -> u8 {
        match self {
            ReconstructionPhase::Base => 0,
            ReconstructionPhase::Exegetic => 1,
            ReconstructionPhase::Formalization => 2,
            ReconstructionPhase::Final => 3,
        }
    }

    pub fn from_index(index: u8) -> Option<Self> {
        Self::ALL.get(usize::from(index)).copied()
    }
}

impl fmt::Display for ReconstructionPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ReconstructionPhase::Base => "base",
            ReconstructionPhase::Exegetic => "exegetic",
            ReconstructionPhase::Formalization => "formalization",
            ReconstructionPhase::Final => "final",
        };
        write!(f, "{} ({name})", self.index())
    }
}
