//! Errors raised by scoring oracles.

use argtutor_core::Field;
use thiserror::Error;

/// Result type for oracle calls.
pub type Result<T> = std::result::Result<T, OracleError>;

/// Error type for oracle operations.
///
/// Callers inside a turn never propagate these: a failed loss makes the
/// metric undefined and a failed generation drops the suggestion.
#[derive(Debug, Error)]
pub enum OracleError {
    /// The oracle is disabled in configuration.
    #[error("oracle is disabled")]
    Disabled,

    /// Subprocess failed to start.
    #[error("failed to spawn oracle subprocess: {0}")]
    SpawnFailed(std::io::Error),

    /// Subprocess timed out.
    #[error("oracle call timed out after {0} seconds")]
    Timeout(u32),

    /// Subprocess exited with error.
    #[error("oracle subprocess exited with code {0}: {1}")]
    SubprocessFailed(i32, String),

    /// The oracle reply could not be read.
    #[error("failed to parse oracle reply: {0}")]
    ParseFailed(String),

    /// The request could not be serialized.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// The oracle replied without any generated text.
    #[error("no generated text for mode {0}")]
    NoGeneratedText(String),

    /// A field the mode reads is missing from the input map.
    #[error("input map has no value for {0}")]
    MissingInput(Field),

    /// A generative mode string could not be parsed.
    #[error("invalid generative mode: {0}")]
    InvalidMode(String),
}
