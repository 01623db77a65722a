//! Error types for the analysis record.

use thiserror::Error;

use crate::aar::Field;

/// Result type for analysis record operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised when addressing or updating analysis record fields.
///
/// Malformed argdown, formulas or key lists are not errors: their parsers
/// return `None` and callers treat that as ill-formed input.
#[derive(Debug, Error)]
pub enum Error {
    /// The string does not name a field or an angle key.
    #[error("unknown field: {0}")]
    UnknownField(String),

    /// The field is derived from the reconstruction and cannot be set.
    #[error("field {0} is derived and cannot be set directly")]
    DerivedField(Field),

    /// The field does not hold quotes.
    #[error("field {0} does not hold quotes")]
    NotQuoteField(Field),

    /// The source text is fixed once the analysis has started.
    #[error("source text cannot be changed")]
    SourceTextLocked,
}
