//! Versioned analysis states.
//!
//! Every turn derives a new [`Snapshot`] with [`Snapshot::create_revision`],
//! which leaves its source intact in history. Only the visible-option
//! cursor changes under an existing id (see [`Snapshot::toggled`]).

use std::collections::BTreeMap;
use std::fmt;

use argtutor_core::Aar;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::handler::{HandlerKind, HandlerResponse};
use crate::input::UserInput;
use crate::option::InputOption;

/// Unique identifier for a snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SnapshotId(pub Uuid);

impl SnapshotId {
    /// Create a new snapshot ID with a UUIDv7 (time-ordered).
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }
}

impl Default for SnapshotId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SnapshotId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Unique identifier for a tutoring project.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ProjectId(pub Uuid);

impl ProjectId {
    /// Create a new project ID with a UUIDv7 (time-ordered).
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }
}

impl Default for ProjectId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ProjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One state of an analysis with its scores and next prompts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub id: SnapshotId,
    pub project_id: ProjectId,
    /// Position in the project's history, unique per project.
    pub global_step: u64,
    /// Step this snapshot was derived from; `None` for the first one.
    pub resumes_from_step: Option<u64>,
    pub created_at: DateTime<Utc>,
    pub aar: Aar,
    /// Scores and aggregates as produced by `Evaluator::as_dict`.
    pub scores: BTreeMap<String, f64>,
    /// Feedback on the turn that led here.
    pub feedback: String,
    /// Prompts for the next turn.
    pub options: Vec<InputOption>,
    /// Index of the option currently shown.
    pub visible_option: usize,
    /// Handler that produced feedback and options.
    pub handler: Option<HandlerKind>,
    /// Input that led here.
    pub input: Option<UserInput>,
}

impl Snapshot {
    /// The first snapshot of a project.
    pub fn initial(
        project_id: ProjectId,
        aar: Aar,
        scores: BTreeMap<String, f64>,
        response: HandlerResponse,
    ) -> Self {
        Self {
            id: SnapshotId::new(),
            project_id,
            global_step: 0,
            resumes_from_step: None,
            created_at: Utc::now(),
            aar,
            scores,
            feedback: response.feedback,
            options: response.options,
            visible_option: 0,
            handler: Some(response.handler),
            input: None,
        }
    }

    /// Derive the snapshot following this one at `global_step`.
    ///
    /// `self` is left untouched.
    #[must_use]
    pub fn create_revision(
        &self,
        global_step: u64,
        aar: Aar,
        scores: BTreeMap<String, f64>,
        response: HandlerResponse,
        input: Option<UserInput>,
    ) -> Self {
        let mut revision = self.clone();
        revision.id = SnapshotId::new();
        revision.created_at = Utc::now();
        revision.visible_option = 0;
        revision.resumes_from_step = Some(self.global_step);
        revision.global_step = global_step;
        revision.aar = aar;
        revision.scores = scores;
        revision.feedback = response.feedback;
        revision.options = response.options;
        revision.handler = Some(response.handler);
        revision.input = input;
        revision
    }

    /// Copy showing the next option, wrapping around.
    #[must_use]
    pub fn toggled(&self) -> Self {
        let mut next = self.clone();
        if !self.options.is_empty() {
            next.visible_option = (self.visible_option + 1) % self.options.len();
        }
        next
    }

    /// The option currently shown, if any.
    pub fn visible(&self) -> Option<&InputOption> {
        self.options.get(self.visible_option)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::option::OptionFactory;
    use argtutor_core::Field;

    const SOURCE: &str = "Peter is lonely. So he calls his sister.";

    fn response(handler: HandlerKind, fields: &[Field]) -> HandlerResponse {
        HandlerResponse {
            handler,
            feedback: format!("{handler}"),
            options: fields.iter().copied().map(OptionFactory::empty_text).collect(),
        }
    }

    fn first() -> Snapshot {
        Snapshot::initial(
            ProjectId::new(),
            Aar::new(SOURCE),
            BTreeMap::from([("completeness".to_string(), 0.5)]),
            response(HandlerKind::NoCues, &Field::CUES),
        )
    }

    #[test]
    fn initial_snapshot_starts_history() {
        let snapshot = first();
        assert_eq!(snapshot.global_step, 0);
        assert_eq!(snapshot.resumes_from_step, None);
        assert_eq!(snapshot.handler, Some(HandlerKind::NoCues));
        assert_eq!(snapshot.visible().map(InputOption::field), Some(Field::Conclusion));
    }

    #[test]
    fn revision_leaves_source_untouched() {
        let mut original = first().toggled();
        original.visible_option = 2;
        let before = original.clone();

        let mut aar = Aar::new(SOURCE);
        aar.gist = Some("Peter calls.".into());
        let revision = original.create_revision(
            1,
            aar.clone(),
            BTreeMap::new(),
            response(HandlerKind::NoReconstruction, &[Field::ArgdownReconstruction]),
            Some(UserInput::text(Field::Gist, "Peter calls.")),
        );

        assert_eq!(original, before);
        assert_ne!(revision.id, original.id);
        assert_eq!(revision.project_id, original.project_id);
        assert_eq!(revision.global_step, 1);
        assert_eq!(revision.resumes_from_step, Some(0));
        assert_eq!(revision.visible_option, 0);
        assert_eq!(revision.aar, aar);
        assert_eq!(revision.options.len(), 1);
        assert_eq!(revision.feedback, "NoReconstruction");
    }

    #[test]
    fn toggling_wraps_around() {
        let snapshot = first();
        let mut toggled = snapshot.clone();
        for _ in 0..snapshot.options.len() {
            toggled = toggled.toggled();
        }
        assert_eq!(toggled.visible_option, 0);
        assert_eq!(snapshot.toggled().visible_option, 1);
        assert_eq!(snapshot.toggled().id, snapshot.id);
    }

    #[test]
    fn toggling_without_options_is_noop() {
        let mut snapshot = first();
        snapshot.options.clear();
        assert_eq!(snapshot.toggled().visible_option, 0);
        assert!(snapshot.visible().is_none());
    }

    #[test]
    fn ids_are_unique() {
        let a = SnapshotId::new();
        let b = SnapshotId::new();
        assert_ne!(a, b);
        assert_eq!(a.to_string(), a.0.to_string());
    }

    #[test]
    fn serializes_to_json() {
        let snapshot = first();
        let json = serde_json::to_string(&snapshot).unwrap();
        let back: Snapshot = serde_json::from_str(&json).unwrap();
        assert_eq!(back, snapshot);
    }
}
