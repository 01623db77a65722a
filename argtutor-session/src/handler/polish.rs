//! Final phase: every check passes, offer everything for revision.

use argtutor_core::Field;

use super::{HandlerRequest, Reply};
use crate::option::OptionFactory;

pub(super) fn catch_all_reply(request: &HandlerRequest<'_>) -> Reply {
    let aar = request.aar;
    let mut options = vec![OptionFactory::text(aar, Field::ArgdownReconstruction, true)];
    options.extend([Field::Reasons, Field::Conjectures].map(|f| OptionFactory::quotes(aar, f)));

    // missing cues first, as invitations
    let (present, missing): (Vec<Field>, Vec<Field>) =
        Field::CUES.into_iter().partition(|f| aar.is_set(*f));
    options.extend(missing.into_iter().map(OptionFactory::empty_text));
    options.extend(present.into_iter().map(|f| OptionFactory::text(aar, f, true)));

    let has_intermediary = request
        .argument()
        .is_some_and(|a| a.has_intermediary_conclusions());
    for field in Field::FORMALIZATIONS.into_iter().chain([Field::PlchdSubstitutions]) {
        if field == Field::IntermediaryConclusionsFormalized && !has_intermediary {
            continue;
        }
        options.push(OptionFactory::text(aar, field, true));
    }
    Reply::new("", options)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::handler::testing::{analysed, evaluated};
    use crate::handler::{HandlerChain, HandlerKind};
    use argtutor_evals::ReconstructionPhase;
    use argtutor_oracle::{NullOracle, ScriptedOracle};

    #[tokio::test]
    async fn complete_analysis_reaches_final_catch_all() {
        let aar = analysed();
        let evaluator = evaluated(&aar, Arc::new(ScriptedOracle::new())).await;
        assert_eq!(evaluator.reconstruction_phase(), ReconstructionPhase::Final);

        let request = HandlerRequest::new(&aar, &evaluator);
        let response = HandlerChain::standard(Arc::new(NullOracle))
            .handle(&request)
            .await
            .unwrap();
        assert_eq!(response.handler, HandlerKind::FinalCatchAll);
        assert!(response.feedback.starts_with("Excellent!"));
    }

    #[tokio::test]
    async fn final_options_cover_the_whole_analysis() {
        let aar = analysed();
        let evaluator = evaluated(&aar, Arc::new(ScriptedOracle::new())).await;
        let request = HandlerRequest::new(&aar, &evaluator);

        let reply = catch_all_reply(&request);
        assert!(reply.remark.is_empty());
        let fields: Vec<Field> = reply.options.iter().map(|o| o.field()).collect();
        assert_eq!(
            fields,
            vec![
                Field::ArgdownReconstruction,
                Field::Reasons,
                Field::Conjectures,
                Field::Gist,
                Field::Context,
                Field::SourceParaphrase,
                Field::Conclusion,
                Field::PremisesFormalized,
                Field::ConclusionFormalized,
                Field::PlchdSubstitutions,
            ]
        );
        // the conclusion cue is given, so it comes pre-filled
        assert_eq!(reply.options[6].initial_value(), "Peter calls his sister.");
        assert_eq!(reply.options[3].initial_value(), "");
    }
}
