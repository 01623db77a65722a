//! The handler chain: decides what to tell the learner after a turn.
//!
//! Handlers are grouped by reconstruction phase. Within a phase they run
//! from the most specific deficiency to a catch-all that claims every
//! record in its phase, so exactly one handler answers per turn:
//!
//! | phase | handlers |
//! |---|---|
//! | base | no cues, no reconstruction, ill-formed, redundant, conclusion mismatch, catch-all |
//! | exegetic | no quotes, reasons not aligned, conjectures not aligned, catch-all |
//! | formalization | inconsistent usage, incomplete, ill-formed, catch-all |
//! | final | catch-all |
//!
//! Handlers may ask the oracle for suggestions. A failed generation only
//! drops the suggestion; it never fails the turn.

mod base;
mod exegetic;
mod formal;
mod polish;

use std::fmt;
use std::sync::Arc;

use argtutor_core::{Aar, Argument, Field, InputMap, Layouter};
use argtutor_evals::{Evaluator, ReconstructionPhase, Score, is_truthy};
use argtutor_oracle::{GenerativeMode, ScoringOracle, postprocess_argdown};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, warn};

use crate::error::{Error, Result};
use crate::option::InputOption;

/// Context shown with a generated reconstruction.
pub(crate) const ALTERNATIVE_RECO_CONTEXT: &str =
    "Based on your hints, the tutor has come up with an alternative reconstruction. Feel free to adapt it.";

/// A handler in the chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HandlerKind {
    NoCues,
    NoReconstruction,
    IllFormedReconstruction,
    RedundantReconstruction,
    ConclusionMismatch,
    BaseCatchAll,
    NoQuotes,
    ReasonsNotAligned,
    ConjecturesNotAligned,
    ExegeticCatchAll,
    InconsistentUsage,
    IncompleteFormalization,
    IllFormedFormalization,
    FormalizationCatchAll,
    FinalCatchAll,
}

impl HandlerKind {
    /// Every handler, in chain order.
    pub const STANDARD: [HandlerKind; 15] = [
        HandlerKind::NoCues,
        HandlerKind::NoReconstruction,
        HandlerKind::IllFormedReconstruction,
        HandlerKind::RedundantReconstruction,
        HandlerKind::ConclusionMismatch,
        HandlerKind::BaseCatchAll,
        HandlerKind::NoQuotes,
        HandlerKind::ReasonsNotAligned,
        HandlerKind::ConjecturesNotAligned,
        HandlerKind::ExegeticCatchAll,
        HandlerKind::InconsistentUsage,
        HandlerKind::IncompleteFormalization,
        HandlerKind::IllFormedFormalization,
        HandlerKind::FormalizationCatchAll,
        HandlerKind::FinalCatchAll,
    ];

    /// The phase this handler serves.
    pub fn phase(&self) -> ReconstructionPhase {
        use HandlerKind::*;
        match self {
            NoCues | NoReconstruction | IllFormedReconstruction | RedundantReconstruction
            | ConclusionMismatch | BaseCatchAll => ReconstructionPhase::Base,
            NoQuotes | ReasonsNotAligned | ConjecturesNotAligned | ExegeticCatchAll => {
                ReconstructionPhase::Exegetic
            }
            InconsistentUsage | IncompleteFormalization | IllFormedFormalization
            | FormalizationCatchAll => ReconstructionPhase::Formalization,
            FinalCatchAll => ReconstructionPhase::Final,
        }
    }

    pub fn is_catch_all(&self) -> bool {
        matches!(
            self,
            HandlerKind::BaseCatchAll
                | HandlerKind::ExegeticCatchAll
                | HandlerKind::FormalizationCatchAll
                | HandlerKind::FinalCatchAll
        )
    }

    /// Whether this handler answers the request.
    pub fn is_responsible(&self, request: &HandlerRequest<'_>) -> bool {
        if request.phase() != self.phase() {
            return false;
        }
        match self {
            HandlerKind::NoCues => base::no_cues(request),
            HandlerKind::NoReconstruction => base::no_reconstruction(request),
            HandlerKind::IllFormedReconstruction => base::ill_formed(request),
            HandlerKind::RedundantReconstruction => base::redundant(request),
            HandlerKind::ConclusionMismatch => base::conclusion_mismatch(request),
            HandlerKind::NoQuotes => exegetic::no_quotes(request),
            HandlerKind::ReasonsNotAligned => exegetic::reasons_not_aligned(request),
            HandlerKind::ConjecturesNotAligned => exegetic::conjectures_not_aligned(request),
            HandlerKind::InconsistentUsage => formal::inconsistent_usage(request),
            HandlerKind::IncompleteFormalization => formal::incomplete(request),
            HandlerKind::IllFormedFormalization => formal::ill_formed(request),
            HandlerKind::BaseCatchAll
            | HandlerKind::ExegeticCatchAll
            | HandlerKind::FormalizationCatchAll
            | HandlerKind::FinalCatchAll => true,
        }
    }

    /// Feedback and next input options.
    pub async fn respond(
        &self,
        request: &HandlerRequest<'_>,
        oracle: &dyn ScoringOracle,
    ) -> HandlerResponse {
        let reply = match self {
            HandlerKind::NoCues => base::no_cues_reply(request),
            HandlerKind::NoReconstruction => base::no_reconstruction_reply(request),
            HandlerKind::IllFormedReconstruction => base::ill_formed_reply(request),
            HandlerKind::RedundantReconstruction => base::redundant_reply(request),
            HandlerKind::ConclusionMismatch => {
                base::conclusion_mismatch_reply(request, oracle).await
            }
            HandlerKind::BaseCatchAll => base::catch_all_reply(request, oracle).await,
            HandlerKind::NoQuotes => exegetic::no_quotes_reply(request, oracle).await,
            HandlerKind::ReasonsNotAligned => exegetic::reasons_not_aligned_reply(request),
            HandlerKind::ConjecturesNotAligned => exegetic::conjectures_not_aligned_reply(request),
            HandlerKind::ExegeticCatchAll => exegetic::catch_all_reply(request, oracle).await,
            HandlerKind::InconsistentUsage => formal::inconsistent_usage_reply(request),
            HandlerKind::IncompleteFormalization => formal::incomplete_reply(request, oracle).await,
            HandlerKind::IllFormedFormalization => formal::ill_formed_reply(request),
            HandlerKind::FormalizationCatchAll => formal::catch_all_reply(request),
            HandlerKind::FinalCatchAll => polish::catch_all_reply(request),
        };
        HandlerResponse {
            handler: *self,
            feedback: format!("{}{}", base_feedback(self.phase()), reply.remark),
            options: reply.options,
        }
    }
}

impl fmt::Display for HandlerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{self:?}")
    }
}

/// Where the analysis stands, as the opening of every feedback.
fn base_feedback(phase: ReconstructionPhase) -> &'static str {
    match phase {
        ReconstructionPhase::Base => "Let's build a first, well-formed reconstruction of the argument.",
        ReconstructionPhase::Exegetic => {
            "Your reconstruction is well-formed. Now let's ground it in the source text."
        }
        ReconstructionPhase::Formalization => {
            "Your reconstruction is grounded in the text. Now let's formalize it."
        }
        ReconstructionPhase::Final => {
            "Excellent! This is a very good reconstruction. You're invited to further improve it."
        }
    }
}

/// A handler's deficiency-specific sentence and its input options.
pub(crate) struct Reply {
    remark: String,
    options: Vec<InputOption>,
}

impl Reply {
    pub(crate) fn new(remark: impl Into<String>, options: Vec<InputOption>) -> Self {
        Self {
            remark: remark.into(),
            options,
        }
    }
}

/// The evaluated candidate record a handler looks at.
pub struct HandlerRequest<'a> {
    pub aar: &'a Aar,
    pub evaluator: &'a Evaluator,
}

impl<'a> HandlerRequest<'a> {
    pub fn new(aar: &'a Aar, evaluator: &'a Evaluator) -> Self {
        Self { aar, evaluator }
    }

    pub fn phase(&self) -> ReconstructionPhase {
        self.evaluator.reconstruction_phase()
    }

    pub fn score(&self, metric: &str) -> Score {
        self.evaluator.individual_score(metric)
    }

    /// Whether a metric scored defined and non-zero.
    pub fn holds(&self, metric: &str) -> bool {
        is_truthy(self.score(metric))
    }

    pub fn argument(&self) -> Option<&'a Argument> {
        self.evaluator.parsed_argument()
    }

    /// Informal cues the learner has given.
    pub(crate) fn available_cues(&self) -> Vec<Field> {
        Field::CUES
            .into_iter()
            .filter(|f| self.aar.is_set(*f))
            .collect()
    }

    /// Oracle inputs with premises and conclusions taken from the reconstruction.
    pub(crate) fn expanded_inputs(&self) -> InputMap {
        Layouter::format_expanded(self.aar, self.argument())
    }
}

/// What the responsible handler produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HandlerResponse {
    pub handler: HandlerKind,
    pub feedback: String,
    pub options: Vec<InputOption>,
}

/// Ordered handlers sharing one oracle.
pub struct HandlerChain {
    handlers: Vec<HandlerKind>,
    oracle: Arc<dyn ScoringOracle>,
}

impl HandlerChain {
    /// The standard chain over all phases.
    pub fn standard(oracle: Arc<dyn ScoringOracle>) -> Self {
        Self::new(HandlerKind::STANDARD.to_vec(), oracle)
    }

    pub fn new(handlers: Vec<HandlerKind>, oracle: Arc<dyn ScoringOracle>) -> Self {
        Self { handlers, oracle }
    }

    pub fn handlers(&self) -> &[HandlerKind] {
        &self.handlers
    }

    /// The first handler claiming the request.
    pub fn responsible(&self, request: &HandlerRequest<'_>) -> Option<HandlerKind> {
        self.handlers
            .iter()
            .copied()
            .find(|h| h.is_responsible(request))
    }

    /// Let the responsible handler answer.
    ///
    /// Fails with [`Error::ChainMisconfigured`] if no handler claims the
    /// request.
    #[instrument(skip_all, level = "debug")]
    pub async fn handle(&self, request: &HandlerRequest<'_>) -> Result<HandlerResponse> {
        let phase = request.phase();
        let Some(handler) = self.responsible(request) else {
            return Err(Error::ChainMisconfigured { phase });
        };
        info!(%handler, %phase, "handler responsible");
        let response = handler.respond(request, self.oracle.as_ref()).await;
        debug!(options = response.options.len(), "handler responded");
        Ok(response)
    }
}

impl fmt::Debug for HandlerChain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HandlerChain")
            .field("handlers", &self.handlers)
            .finish_non_exhaustive()
    }
}

/// Generate text for `mode`, or `None` with a warning if the oracle fails.
pub(crate) async fn suggest(
    oracle: &dyn ScoringOracle,
    inputs: &InputMap,
    mode: &GenerativeMode,
) -> Option<String> {
    match oracle.generate(inputs, mode).await {
        Ok(generation) => {
            info!(%mode, "generated suggestion");
            Some(generation.text().to_string())
        }
        Err(e) => {
            warn!(%mode, error = %e, "generation failed, dropping suggestion");
            None
        }
    }
}

/// Generate a reconstruction from the source text and `hints`, tidied up
/// as argdown.
pub(crate) async fn suggest_reconstruction(
    oracle: &dyn ScoringOracle,
    aar: &Aar,
    hints: impl IntoIterator<Item = Field>,
) -> Option<String> {
    let inputs = std::iter::once(Field::SourceText).chain(hints);
    let mode = GenerativeMode::new(Field::ArgdownReconstruction, inputs);
    suggest(oracle, &Layouter::format(aar), &mode)
        .await
        .map(|text| postprocess_argdown(&text))
}

#[cfg(test)]
pub(crate) mod testing {
    use std::sync::Arc;

    use argtutor_core::{Aar, Formalization, ModelSearchProver, Quote, Substitution};
    use argtutor_evals::Evaluator;
    use argtutor_oracle::{NullOracle, ScoringOracle};

    pub const SOURCE: &str = "Peter is lonely. So he calls his sister.";
    pub const RECO: &str = "(1) Peter is lonely.\n(2) If Peter is lonely, he calls his sister.\n-- from (1) (2) --\n(3) Peter calls his sister.";

    /// A well-formed reconstruction with a matching conclusion cue.
    pub fn reconstructed() -> Aar {
        let mut aar = Aar::new(SOURCE);
        aar.argdown_reconstruction = Some(RECO.into());
        aar.conclusion = vec![Quote::unreferenced("Peter calls his sister.")];
        aar
    }

    /// A reconstruction grounded in the text by aligned quotes.
    pub fn grounded() -> Aar {
        let mut aar = reconstructed();
        aar.reasons = vec![Quote::new("Peter is lonely", 1)];
        aar.conjectures = vec![Quote::new("he calls his sister", 3)];
        aar
    }

    /// A complete, valid analysis.
    pub fn analysed() -> Aar {
        let mut aar = grounded();
        aar.premises_formalized = vec![
            Formalization::new("F(a)", 1),
            Formalization::new("F(a) -> G(a)", 2),
        ];
        aar.conclusion_formalized = vec![Formalization::new("G(a)", 3)];
        aar.plchd_substitutions = vec![
            Substitution::new("F", "is lonely"),
            Substitution::new("G", "calls his sister"),
            Substitution::new("a", "Peter"),
        ];
        aar
    }

    /// An evaluator that has scored `aar`.
    pub async fn evaluated(aar: &Aar, oracle: Arc<dyn ScoringOracle>) -> Evaluator {
        let mut evaluator = Evaluator::new(oracle, Arc::new(ModelSearchProver::default()));
        evaluator.update(aar).await;
        evaluator
    }

    pub async fn evaluated_offline(aar: &Aar) -> Evaluator {
        evaluated(aar, Arc::new(NullOracle)).await
    }
}

#[cfg(test)]
mod tests {
    use super::testing::evaluated_offline;
    use super::*;
    use argtutor_oracle::NullOracle;

    #[test]
    fn standard_chain_ends_each_phase_with_its_catch_all() {
        let mut last_phase = None;
        for (i, handler) in HandlerKind::STANDARD.iter().enumerate() {
            let next = HandlerKind::STANDARD.get(i + 1);
            let phase_ends = next.is_none_or(|n| n.phase() != handler.phase());
            assert_eq!(handler.is_catch_all(), phase_ends, "{handler}");
            if let Some(previous) = last_phase {
                assert!(previous <= handler.phase());
            }
            last_phase = Some(handler.phase());
        }
    }

    #[tokio::test]
    async fn empty_record_goes_to_no_cues() {
        let aar = Aar::new("Peter is lonely. So he calls his sister.");
        let evaluator = evaluated_offline(&aar).await;
        let request = HandlerRequest::new(&aar, &evaluator);
        let chain = HandlerChain::standard(Arc::new(NullOracle));
        assert_eq!(chain.responsible(&request), Some(HandlerKind::NoCues));
    }

    #[tokio::test]
    async fn chain_without_catch_all_is_misconfigured() {
        let mut aar = Aar::new("Peter is lonely. So he calls his sister.");
        aar.gist = Some("Peter calls.".into());
        let evaluator = evaluated_offline(&aar).await;
        let request = HandlerRequest::new(&aar, &evaluator);
        let chain = HandlerChain::new(vec![HandlerKind::NoCues], Arc::new(NullOracle));

        let err = chain.handle(&request).await.unwrap_err();
        assert!(matches!(
            err,
            Error::ChainMisconfigured {
                phase: ReconstructionPhase::Base
            }
        ));
    }

    #[tokio::test]
    async fn handlers_outside_the_phase_are_never_responsible() {
        let aar = Aar::new("Peter is lonely.");
        let evaluator = evaluated_offline(&aar).await;
        let request = HandlerRequest::new(&aar, &evaluator);
        for handler in HandlerKind::STANDARD {
            if handler.phase() != ReconstructionPhase::Base {
                assert!(!handler.is_responsible(&request), "{handler}");
            }
        }
    }

    #[test]
    fn base_feedback_describes_progress() {
        assert!(base_feedback(ReconstructionPhase::Final).starts_with("Excellent!"));
        assert!(base_feedback(ReconstructionPhase::Base).contains("well-formed"));
    }
}
