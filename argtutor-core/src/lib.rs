//! argtutor-core - the argument analysis record and the parsers around it
//!
//! This crate holds the value types every other argtutor crate works on:
//! the analysis record ([`Aar`]), its fields, the argdown and formula
//! parsers, the text layouts shown to learners and fed to the oracle, and
//! the theorem prover used by the validity metrics.

pub mod aar;
pub mod annotation;
pub mod argdown;
pub mod error;
pub mod layout;
pub mod logic;
pub mod prover;

pub use aar::{Aar, Field, Formalization, Quote, Substitution};
pub use annotation::{annotation_as_quotes, is_annotation, quotes_as_annotation};
pub use argdown::{ArgdownStatement, Argument, parse_argdown};
pub use error::{Error, Result};
pub use layout::{InputMap, Layouter};
pub use logic::{Formula, Term, parse_formalization, parse_formula};
pub use prover::{ModelSearchProver, Prover};
