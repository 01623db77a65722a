//! argtutor-oracle - the scoring oracle behind coherence metrics and suggestions
//!
//! The oracle generates analysis fields from other fields and reports how
//! hard a field's current value is to predict (its loss). Coherence
//! metrics compare losses; handlers turn generations into suggestions.
//!
//! - [`ScoringOracle`] is the interface, called with a [`GenerativeMode`]
//! - [`HarnessOracle`] talks to a model server subprocess
//! - [`MemoizedOracle`] caches losses for a project
//! - [`ScriptedOracle`] and [`NullOracle`] are deterministic stand-ins

pub mod config;
pub mod error;
pub mod harness;
pub mod memo;
pub mod mode;
pub mod oracle;
pub mod postprocess;
pub mod scripted;

pub use config::OracleConfig;
pub use error::{OracleError, Result};
pub use harness::HarnessOracle;
pub use memo::MemoizedOracle;
pub use mode::GenerativeMode;
pub use oracle::{Generation, GenerationRecord, ScoringOracle, generate_with_chain};
pub use postprocess::postprocess_argdown;
pub use scripted::{NullOracle, OracleCall, ScriptedOracle};
