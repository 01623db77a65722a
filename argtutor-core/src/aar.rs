//! The argument analysis record and its fields.
//!
//! An [`Aar`] holds every angle of an analysis: the source text, informal
//! cues, quotations, the argdown reconstruction, formalizations and
//! placeholder substitutions. Each field is addressed by a [`Field`], which
//! also carries the short angle key (`s`, `a`, `fp`, ...) used in generative
//! modes.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::layout;

/// A field (angle) of the analysis record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Field {
    SourceText,
    Gist,
    Context,
    SourceParaphrase,
    Conclusion,
    Reasons,
    Conjectures,
    ArgdownReconstruction,
    PremisesFormalized,
    IntermediaryConclusionsFormalized,
    ConclusionFormalized,
    PlchdSubstitutions,
    /// Premises of the parsed reconstruction (derived, never stored).
    Premises,
    /// Intermediary conclusions of the parsed reconstruction (derived).
    IntermediaryConclusions,
}

impl Field {
    /// Fields stored in an [`Aar`], in layout order.
    pub const STORED: [Field; 12] = [
        Field::SourceText,
        Field::Gist,
        Field::Context,
        Field::SourceParaphrase,
        Field::Conclusion,
        Field::Reasons,
        Field::Conjectures,
        Field::ArgdownReconstruction,
        Field::PremisesFormalized,
        Field::IntermediaryConclusionsFormalized,
        Field::ConclusionFormalized,
        Field::PlchdSubstitutions,
    ];

    /// Informal cues, in the order they are offered to the learner.
    pub const CUES: [Field; 4] = [
        Field::Conclusion,
        Field::Gist,
        Field::Context,
        Field::SourceParaphrase,
    ];

    /// Formalization fields.
    pub const FORMALIZATIONS: [Field; 3] = [
        Field::PremisesFormalized,
        Field::IntermediaryConclusionsFormalized,
        Field::ConclusionFormalized,
    ];

    /// Full snake_case name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Field::SourceText => "source_text",
            Field::Gist => "gist",
            Field::Context => "context",
            Field::SourceParaphrase => "source_paraphrase",
            Field::Conclusion => "conclusion",
            Field::Reasons => "reasons",
            Field::Conjectures => "conjectures",
            Field::ArgdownReconstruction => "argdown_reconstruction",
            Field::PremisesFormalized => "premises_formalized",
            Field::IntermediaryConclusionsFormalized => "intermediary_conclusions_formalized",
            Field::ConclusionFormalized => "conclusion_formalized",
            Field::PlchdSubstitutions => "plchd_substitutions",
            Field::Premises => "premises",
            Field::IntermediaryConclusions => "intermediary_conclusions",
        }
    }

    /// Short angle key used in generative modes.
    pub fn key(&self) -> &'static str {
        match self {
            Field::SourceText => "s",
            Field::Gist => "g",
            Field::Context => "x",
            Field::SourceParaphrase => "h",
            Field::Conclusion => "c",
            Field::Reasons => "r",
            Field::Conjectures => "j",
            Field::ArgdownReconstruction => "a",
            Field::PremisesFormalized => "fp",
            Field::IntermediaryConclusionsFormalized => "fi",
            Field::ConclusionFormalized => "fc",
            Field::PlchdSubstitutions => "k",
            Field::Premises => "p",
            Field::IntermediaryConclusions => "i",
        }
    }

    /// Human-readable name for prompts.
    pub fn label(&self) -> &'static str {
        match self {
            Field::SourceText => "source text",
            Field::Gist => "gist",
            Field::Context => "context",
            Field::SourceParaphrase => "source paraphrase",
            Field::Conclusion => "conclusion",
            Field::Reasons => "reasons",
            Field::Conjectures => "conjectures",
            Field::ArgdownReconstruction => "argument reconstruction",
            Field::PremisesFormalized => "formalization of the premises",
            Field::IntermediaryConclusionsFormalized => {
                "formalization of the intermediary conclusions"
            }
            Field::ConclusionFormalized => "formalization of the conclusion",
            Field::PlchdSubstitutions => "keys",
            Field::Premises => "premises",
            Field::IntermediaryConclusions => "intermediary conclusions",
        }
    }

    /// Parse from a full name or an angle key.
    pub fn parse(s: &str) -> Option<Self> {
        let s = s.trim();
        [
            Field::SourceText,
            Field::Gist,
            Field::Context,
            Field::SourceParaphrase,
            Field::Conclusion,
            Field::Reasons,
            Field::Conjectures,
            Field::ArgdownReconstruction,
            Field::PremisesFormalized,
            Field::IntermediaryConclusionsFormalized,
            Field::ConclusionFormalized,
            Field::PlchdSubstitutions,
            Field::Premises,
            Field::IntermediaryConclusions,
        ]
        .into_iter()
        .find(|f| f.as_str() == s || f.key() == s)
    }

    /// Whether the field is derived from the reconstruction rather than stored.
    pub fn is_derived(&self) -> bool {
        matches!(self, Field::Premises | Field::IntermediaryConclusions)
    }

    /// The propositions a formalization field formalizes.
    pub fn formalized_propositions(&self) -> Option<Field> {
        match self {
            Field::PremisesFormalized => Some(Field::Premises),
            Field::IntermediaryConclusionsFormalized => Some(Field::IntermediaryConclusions),
            Field::ConclusionFormalized => Some(Field::Conclusion),
            _ => None,
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Field {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Field::parse(s).ok_or_else(|| Error::UnknownField(s.to_string()))
    }
}

/// A quoted or stated text with a reference to a reconstruction label.
///
/// `ref_reco` is `-1` when no reference is given.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Quote {
    pub text: String,
    pub ref_reco: i64,
}

impl Quote {
    pub fn new(text: impl Into<String>, ref_reco: i64) -> Self {
        Self {
            text: text.into(),
            ref_reco,
        }
    }

    /// A statement without reference.
    pub fn unreferenced(text: impl Into<String>) -> Self {
        Self::new(text, -1)
    }
}

/// A formula together with the label of the statement it formalizes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Formalization {
    pub form: String,
    pub ref_reco: i64,
}

impl Formalization {
    pub fn new(form: impl Into<String>, ref_reco: i64) -> Self {
        Self {
            form: form.into(),
            ref_reco,
        }
    }
}

/// A placeholder symbol and its natural-language meaning.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Substitution {
    pub symbol: String,
    pub meaning: String,
}

impl Substitution {
    pub fn new(symbol: impl Into<String>, meaning: impl Into<String>) -> Self {
        Self {
            symbol: symbol.into(),
            meaning: meaning.into(),
        }
    }
}

/// Argument analysis record.
///
/// The engine never mutates a record that belongs to a snapshot; each turn
/// clones the previous record and applies exactly one input to the clone.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Aar {
    pub source_text: String,
    pub gist: Option<String>,
    pub context: Option<String>,
    pub source_paraphrase: Option<String>,
    /// Conclusion cue; the first statement is the cue proper.
    pub conclusion: Vec<Quote>,
    pub reasons: Vec<Quote>,
    pub conjectures: Vec<Quote>,
    pub argdown_reconstruction: Option<String>,
    pub premises_formalized: Vec<Formalization>,
    pub intermediary_conclusions_formalized: Vec<Formalization>,
    pub conclusion_formalized: Vec<Formalization>,
    pub plchd_substitutions: Vec<Substitution>,
}

impl Aar {
    /// Create a record holding only the source text.
    pub fn new(source_text: impl Into<String>) -> Self {
        Self {
            source_text: source_text.into(),
            ..Default::default()
        }
    }

    /// Whether the field holds a non-empty value.
    ///
    /// Derived fields are never set.
    pub fn is_set(&self, field: Field) -> bool {
        match field {
            Field::SourceText => !self.source_text.trim().is_empty(),
            Field::Gist => is_text_set(&self.gist),
            Field::Context => is_text_set(&self.context),
            Field::SourceParaphrase => is_text_set(&self.source_paraphrase),
            Field::Conclusion => !self.conclusion.is_empty(),
            Field::Reasons => !self.reasons.is_empty(),
            Field::Conjectures => !self.conjectures.is_empty(),
            Field::ArgdownReconstruction => is_text_set(&self.argdown_reconstruction),
            Field::PremisesFormalized => !self.premises_formalized.is_empty(),
            Field::IntermediaryConclusionsFormalized => {
                !self.intermediary_conclusions_formalized.is_empty()
            }
            Field::ConclusionFormalized => !self.conclusion_formalized.is_empty(),
            Field::PlchdSubstitutions => !self.plchd_substitutions.is_empty(),
            Field::Premises | Field::IntermediaryConclusions => false,
        }
    }

    /// Whether the field holds the same value in both records.
    pub fn same_field(&self, other: &Aar, field: Field) -> bool {
        match field {
            Field::SourceText => self.source_text == other.source_text,
            Field::Gist => self.gist == other.gist,
            Field::Context => self.context == other.context,
            Field::SourceParaphrase => self.source_paraphrase == other.source_paraphrase,
            Field::Conclusion => self.conclusion == other.conclusion,
            Field::Reasons => self.reasons == other.reasons,
            Field::Conjectures => self.conjectures == other.conjectures,
            Field::ArgdownReconstruction => {
                self.argdown_reconstruction == other.argdown_reconstruction
            }
            Field::PremisesFormalized => self.premises_formalized == other.premises_formalized,
            Field::IntermediaryConclusionsFormalized => {
                self.intermediary_conclusions_formalized
                    == other.intermediary_conclusions_formalized
            }
            Field::ConclusionFormalized => {
                self.conclusion_formalized == other.conclusion_formalized
            }
            Field::PlchdSubstitutions => self.plchd_substitutions == other.plchd_substitutions,
            // derived from the reconstruction
            Field::Premises | Field::IntermediaryConclusions => {
                self.argdown_reconstruction == other.argdown_reconstruction
            }
        }
    }

    /// Fields whose values differ between the two records.
    pub fn changed_fields(&self, other: &Aar) -> Vec<Field> {
        Field::STORED
            .into_iter()
            .filter(|f| !self.same_field(other, *f))
            .collect()
    }

    /// Formalizations stored under a formalization field.
    pub fn formalizations(&self, field: Field) -> &[Formalization] {
        match field {
            Field::PremisesFormalized => &self.premises_formalized,
            Field::IntermediaryConclusionsFormalized => &self.intermediary_conclusions_formalized,
            Field::ConclusionFormalized => &self.conclusion_formalized,
            _ => &[],
        }
    }

    /// Formalizations of all three groups, premises first.
    pub fn all_formalizations(&self) -> impl Iterator<Item = &Formalization> {
        self.premises_formalized
            .iter()
            .chain(self.intermediary_conclusions_formalized.iter())
            .chain(self.conclusion_formalized.iter())
    }

    /// Quotes stored under `reasons` or `conjectures`.
    pub fn quotes(&self, field: Field) -> &[Quote] {
        match field {
            Field::Reasons => &self.reasons,
            Field::Conjectures => &self.conjectures,
            Field::Conclusion => &self.conclusion,
            _ => &[],
        }
    }

    /// Text of the conclusion cue, if any.
    pub fn conclusion_cue(&self) -> Option<&str> {
        self.conclusion.first().map(|q| q.text.as_str())
    }

    /// Set a field from learner text in its list layout.
    ///
    /// Blank text clears the field. List fields accept their layout
    /// leniently (see [`layout`]).
    pub fn set_text(&mut self, field: Field, text: &str) -> Result<()> {
        let trimmed = text.trim();
        let value = (!trimmed.is_empty()).then(|| trimmed.to_string());
        match field {
            Field::SourceText => {
                if !self.is_set(Field::SourceText) {
                    self.source_text = text.to_string();
                } else if self.source_text.trim() != trimmed {
                    return Err(Error::SourceTextLocked);
                }
            }
            Field::Gist => self.gist = value,
            Field::Context => self.context = value,
            Field::SourceParaphrase => self.source_paraphrase = value,
            Field::ArgdownReconstruction => self.argdown_reconstruction = value,
            Field::Conclusion => self.conclusion = layout::read_quote_list(trimmed),
            Field::Reasons => self.reasons = layout::read_quote_list(trimmed),
            Field::Conjectures => self.conjectures = layout::read_quote_list(trimmed),
            Field::PremisesFormalized => {
                self.premises_formalized = layout::read_formalization_list(trimmed)
            }
            Field::IntermediaryConclusionsFormalized => {
                self.intermediary_conclusions_formalized =
                    layout::read_formalization_list(trimmed)
            }
            Field::ConclusionFormalized => {
                self.conclusion_formalized = layout::read_formalization_list(trimmed)
            }
            Field::PlchdSubstitutions => {
                self.plchd_substitutions = layout::read_substitution_list(trimmed)
            }
            Field::Premises | Field::IntermediaryConclusions => {
                return Err(Error::DerivedField(field));
            }
        }
        Ok(())
    }

    /// Replace the quotes of `reasons`, `conjectures` or `conclusion`.
    pub fn set_quotes(&mut self, field: Field, quotes: Vec<Quote>) -> Result<()> {
        match field {
            Field::Reasons => self.reasons = quotes,
            Field::Conjectures => self.conjectures = quotes,
            Field::Conclusion => self.conclusion = quotes,
            other => return Err(Error::NotQuoteField(other)),
        }
        Ok(())
    }
}

fn is_text_set(value: &Option<String>) -> bool {
    value.as_deref().is_some_and(|v| !v.trim().is_empty())
}
