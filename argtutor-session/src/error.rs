//! Error types for tutoring sessions.

use argtutor_evals::ReconstructionPhase;
use thiserror::Error;

use crate::storage;

/// Result type for session operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that fail a turn.
///
/// Oracle failures are not among them: handlers drop the suggestion they
/// could not generate and carry on.
#[derive(Debug, Error)]
pub enum Error {
    /// No handler claimed the evaluated record. The chain is mis-built.
    #[error("handler chain misconfigured: no handler responsible in phase {phase}")]
    ChainMisconfigured { phase: ReconstructionPhase },

    /// Snapshot store failure.
    #[error("storage error: {0}")]
    Storage(#[from] storage::Error),

    /// Configuration file could not be parsed.
    #[error("invalid configuration: {0}")]
    Config(#[from] toml::de::Error),

    /// Configuration file could not be read.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// The learner input cannot be applied to the record.
    #[error("invalid input: {0}")]
    InvalidInput(String),
}

impl From<argtutor_core::Error> for Error {
    fn from(e: argtutor_core::Error) -> Self {
        Error::InvalidInput(e.to_string())
    }
}
