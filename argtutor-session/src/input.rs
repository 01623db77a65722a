//! Learner inputs and how they change a record.

use argtutor_core::{Aar, Field, Quote, annotation_as_quotes};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{Error, Result};

/// One learner input, addressed to exactly one field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum UserInput {
    /// Text in the field's layout.
    Text { field: Field, text: String },
    /// The source text with quoted spans marked as `[text](label)`.
    Annotation { field: Field, annotation: String },
}

impl UserInput {
    pub fn text(field: Field, text: impl Into<String>) -> Self {
        UserInput::Text {
            field,
            text: text.into(),
        }
    }

    pub fn annotation(field: Field, annotation: impl Into<String>) -> Self {
        UserInput::Annotation {
            field,
            annotation: annotation.into(),
        }
    }

    /// Interpret raw presentation-layer input for `field`.
    ///
    /// Raw input for reasons or conjectures containing markers is read as
    /// an annotation; everything else is text.
    pub fn from_raw(raw: &str, field: Field) -> Self {
        let quote_field = matches!(field, Field::Reasons | Field::Conjectures);
        if quote_field && !annotation_as_quotes(raw).is_empty() {
            Self::annotation(field, raw)
        } else {
            Self::text(field, raw)
        }
    }

    /// The field this input updates.
    pub fn field(&self) -> Field {
        match self {
            UserInput::Text { field, .. } | UserInput::Annotation { field, .. } => *field,
        }
    }

    /// Apply the input to a copy of `aar`.
    ///
    /// Marked spans that do not occur in the source text are dropped.
    pub fn apply(&self, aar: &Aar) -> Result<Aar> {
        let mut next = aar.clone();
        match self {
            UserInput::Text { field, text } => next.set_text(*field, text)?,
            UserInput::Annotation { field, annotation } => {
                if !matches!(field, Field::Reasons | Field::Conjectures) {
                    return Err(Error::InvalidInput(format!(
                        "field {field} does not take annotations"
                    )));
                }
                let quotes: Vec<Quote> = annotation_as_quotes(annotation)
                    .into_iter()
                    .filter(|q| {
                        let found = aar.source_text.contains(&q.text);
                        if !found {
                            warn!(quote = %q.text, field = %field, "ignoring quote not in source text");
                        }
                        found
                    })
                    .collect();
                next.set_quotes(*field, quotes)?;
            }
        }
        Ok(next)
    }
}
