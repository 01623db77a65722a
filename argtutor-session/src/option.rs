//! Input options: the prompts offered to the learner after a turn.

use argtutor_core::{Aar, Field, Layouter, Quote, quotes_as_annotation};
use serde::{Deserialize, Serialize};

/// One prompt for the next turn.
///
/// Every option addresses a single field. The presentation layer shows
/// `context` and `question`, pre-fills `initial`, and submits the learner's
/// answer for `field`. Accepting a choice submits its proposal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum InputOption {
    /// Accept or reject a proposed value.
    Choice {
        field: Field,
        context: String,
        question: String,
        proposal: String,
    },
    /// Free text in the field's layout.
    Text {
        field: Field,
        context: String,
        question: String,
        initial: String,
    },
    /// Mark quotes in the source text.
    Quote {
        field: Field,
        context: String,
        question: String,
        initial: String,
    },
}

impl InputOption {
    pub fn field(&self) -> Field {
        match self {
            InputOption::Choice { field, .. }
            | InputOption::Text { field, .. }
            | InputOption::Quote { field, .. } => *field,
        }
    }

    pub fn question(&self) -> &str {
        match self {
            InputOption::Choice { question, .. }
            | InputOption::Text { question, .. }
            | InputOption::Quote { question, .. } => question,
        }
    }

    pub fn context(&self) -> &str {
        match self {
            InputOption::Choice { context, .. }
            | InputOption::Text { context, .. }
            | InputOption::Quote { context, .. } => context,
        }
    }

    /// Value shown before the learner edits anything.
    pub fn initial_value(&self) -> &str {
        match self {
            InputOption::Choice { proposal, .. } => proposal,
            InputOption::Text { initial, .. } | InputOption::Quote { initial, .. } => initial,
        }
    }
}

/// Builds input options from a record.
pub struct OptionFactory;

impl OptionFactory {
    /// Text prompt for `field`, pre-filled with its current value if asked to.
    pub fn text(aar: &Aar, field: Field, pre_initialized: bool) -> InputOption {
        let current = Layouter::format_field(aar, field).filter(|_| pre_initialized);
        let question = match current {
            Some(_) => format!("Please revise the {}.", field.label()),
            None => format!("Please enter the {}.", field.label()),
        };
        InputOption::Text {
            field,
            context: String::new(),
            question,
            initial: current.unwrap_or_default(),
        }
    }

    /// Text prompt for `field` with no initial value.
    pub fn empty_text(field: Field) -> InputOption {
        InputOption::Text {
            field,
            context: String::new(),
            question: format!("Please enter the {}.", field.label()),
            initial: String::new(),
        }
    }

    /// Text prompt pre-filled with a suggestion rather than the current value.
    pub fn suggested_text(
        field: Field,
        context: impl Into<String>,
        text: impl Into<String>,
    ) -> InputOption {
        InputOption::Text {
            field,
            context: context.into(),
            question: format!("Please revise the {}.", field.label()),
            initial: text.into(),
        }
    }

    /// Quote prompt for `field`, showing the source text annotated with the
    /// current quotes.
    pub fn quotes(aar: &Aar, field: Field) -> InputOption {
        let quotes = aar.quotes(field);
        let question = if quotes.is_empty() {
            format!("Please mark the {}.", field.label())
        } else {
            format!("Please revise the {}.", field.label())
        };
        InputOption::Quote {
            field,
            context: String::new(),
            question,
            initial: quotes_as_annotation(&aar.source_text, quotes),
        }
    }

    /// Quote prompt showing proposed quotes.
    pub fn suggested_quotes(
        aar: &Aar,
        field: Field,
        context: impl Into<String>,
        quotes: &[Quote],
    ) -> InputOption {
        InputOption::Quote {
            field,
            context: context.into(),
            question: format!("Please add or revise {}.", field.label()),
            initial: quotes_as_annotation(&aar.source_text, quotes),
        }
    }

    /// Yes/no prompt adopting `proposal` for `field`.
    pub fn choice(
        field: Field,
        context: impl Into<String>,
        question: impl Into<String>,
        proposal: impl Into<String>,
    ) -> InputOption {
        InputOption::Choice {
            field,
            context: context.into(),
            question: question.into(),
            proposal: proposal.into(),
        }
    }

    /// Text prompts for the informal cues: empty ones for missing cues,
    /// pre-filled ones for cues already given.
    pub fn cues(aar: &Aar) -> Vec<InputOption> {
        Field::CUES
            .into_iter()
            .map(|cue| Self::text(aar, cue, true))
            .collect()
    }
}
