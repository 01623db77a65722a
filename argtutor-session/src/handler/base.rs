//! Base phase: a first, well-formed reconstruction.

use argtutor_core::{Field, Layouter};
use argtutor_evals::metrics::{CONCL_MATCHES_RECO, NO_PETITIO, NO_REDUNDANCY, VALID_ARGDOWN};
use argtutor_oracle::{GenerativeMode, ScoringOracle};

use super::{ALTERNATIVE_RECO_CONTEXT, HandlerRequest, Reply, suggest, suggest_reconstruction};
use crate::option::{InputOption, OptionFactory};

pub(super) fn no_cues(request: &HandlerRequest<'_>) -> bool {
    request.available_cues().is_empty()
}

pub(super) fn no_reconstruction(request: &HandlerRequest<'_>) -> bool {
    !request.aar.is_set(Field::ArgdownReconstruction)
}

pub(super) fn ill_formed(request: &HandlerRequest<'_>) -> bool {
    !request.holds(VALID_ARGDOWN)
}

pub(super) fn redundant(request: &HandlerRequest<'_>) -> bool {
    !request.holds(NO_PETITIO) || !request.holds(NO_REDUNDANCY)
}

pub(super) fn conclusion_mismatch(request: &HandlerRequest<'_>) -> bool {
    request.aar.is_set(Field::ArgdownReconstruction)
        && request.aar.is_set(Field::Conclusion)
        && request.holds(VALID_ARGDOWN)
        && !request.holds(CONCL_MATCHES_RECO)
}

fn reconstruction_option(request: &HandlerRequest<'_>) -> InputOption {
    OptionFactory::text(request.aar, Field::ArgdownReconstruction, true)
}

pub(super) fn no_cues_reply(_request: &HandlerRequest<'_>) -> Reply {
    let options = Field::CUES.into_iter().map(OptionFactory::empty_text).collect();
    Reply::new(" Start by jotting down a few informal cues about the text.", options)
}

pub(super) fn no_reconstruction_reply(request: &HandlerRequest<'_>) -> Reply {
    let mut options = vec![reconstruction_option(request)];
    options.extend(OptionFactory::cues(request.aar));
    Reply::new(" But there is no argument reconstruction.", options)
}

pub(super) fn ill_formed_reply(request: &HandlerRequest<'_>) -> Reply {
    Reply::new(
        " But the argument reconstruction is ill-formed (illegal argdown syntax).",
        vec![reconstruction_option(request)],
    )
}

pub(super) fn redundant_reply(request: &HandlerRequest<'_>) -> Reply {
    Reply::new(
        " But your argument reconstruction is redundant (premises and/or conclusions occur more than once).",
        vec![reconstruction_option(request)],
    )
}

/// Offer the reconstruction's own conclusion, a reconstruction generated
/// from the conclusion cue, and manual edits of both.
pub(super) async fn conclusion_mismatch_reply(
    request: &HandlerRequest<'_>,
    oracle: &dyn ScoringOracle,
) -> Reply {
    let mut options = Vec::new();
    if let Some(conclusion) = request.argument().and_then(|a| a.final_conclusion()) {
        options.push(OptionFactory::choice(
            Field::Conclusion,
            format!("Conclusion in argument reconstruction: {}", conclusion.text),
            "Do you want to use this conclusion?",
            conclusion.text.clone(),
        ));
    }

    let mode = GenerativeMode::new(
        Field::ArgdownReconstruction,
        [Field::SourceText, Field::Conclusion],
    );
    if let Some(reconstruction) = suggest(oracle, &Layouter::format(request.aar), &mode).await {
        options.push(OptionFactory::choice(
            Field::ArgdownReconstruction,
            format!("The tutor has come up with its own reconstruction:\n{reconstruction}"),
            "Do you want to adopt this reconstruction and further improve it?",
            reconstruction,
        ));
    }

    options.push(OptionFactory::text(request.aar, Field::Conclusion, true));
    options.push(reconstruction_option(request));
    Reply::new(
        " But the conclusion statement separately provided doesn't match your argument reconstruction.",
        options,
    )
}

/// Suggest a reconstruction from the cues given so far.
pub(super) async fn catch_all_reply(
    request: &HandlerRequest<'_>,
    oracle: &dyn ScoringOracle,
) -> Reply {
    let mut options = Vec::new();
    if let Some(reconstruction) =
        suggest_reconstruction(oracle, request.aar, request.available_cues()).await
    {
        options.push(OptionFactory::suggested_text(
            Field::ArgdownReconstruction,
            ALTERNATIVE_RECO_CONTEXT,
            reconstruction,
        ));
    }
    options.push(reconstruction_option(request));
    options.extend(OptionFactory::cues(request.aar));
    Reply::new(" Revise and expand so that your items better cohere.", options)
}
