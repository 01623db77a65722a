//! Exegetic phase: grounding the reconstruction in the source text.

use argtutor_core::{Field, Layouter, layout::parse_quotes};
use argtutor_evals::metrics::{CONJECTURES_ALIGNED, REASONS_ALIGNED};
use argtutor_oracle::{GenerativeMode, ScoringOracle};
use tracing::warn;

use super::{ALTERNATIVE_RECO_CONTEXT, HandlerRequest, Reply, suggest, suggest_reconstruction};
use crate::option::{InputOption, OptionFactory};

const QUOTE_FIELDS: [Field; 2] = [Field::Reasons, Field::Conjectures];

pub(super) fn no_quotes(request: &HandlerRequest<'_>) -> bool {
    QUOTE_FIELDS.iter().all(|f| !request.aar.is_set(*f))
}

fn not_aligned(request: &HandlerRequest<'_>, field: Field, metric: &str) -> bool {
    request.aar.is_set(Field::ArgdownReconstruction)
        && request.aar.is_set(field)
        && !request.holds(metric)
}

pub(super) fn reasons_not_aligned(request: &HandlerRequest<'_>) -> bool {
    not_aligned(request, Field::Reasons, REASONS_ALIGNED)
}

pub(super) fn conjectures_not_aligned(request: &HandlerRequest<'_>) -> bool {
    not_aligned(request, Field::Conjectures, CONJECTURES_ALIGNED)
}

/// Propose reasons and conjectures generated from source and reconstruction.
pub(super) async fn no_quotes_reply(
    request: &HandlerRequest<'_>,
    oracle: &dyn ScoringOracle,
) -> Reply {
    let inputs = Layouter::format(request.aar);
    let mut options = Vec::new();
    for field in QUOTE_FIELDS {
        let mode = GenerativeMode::new(field, [Field::SourceText, Field::ArgdownReconstruction]);
        let quotes = match suggest(oracle, &inputs, &mode).await {
            Some(text) => parse_quotes(&text).unwrap_or_else(|| {
                warn!(%mode, "generated quotes are ill-formed");
                Vec::new()
            }),
            None => Vec::new(),
        };
        options.push(if quotes.is_empty() {
            OptionFactory::quotes(request.aar, field)
        } else {
            OptionFactory::suggested_quotes(
                request.aar,
                field,
                "The tutor has marked some passages for you.",
                &quotes,
            )
        });
    }
    Reply::new(
        " But you haven't marked any reasons or conjectures in the source text yet.",
        options,
    )
}

fn realign(request: &HandlerRequest<'_>, field: Field) -> Vec<InputOption> {
    vec![
        OptionFactory::quotes(request.aar, field),
        OptionFactory::text(request.aar, Field::ArgdownReconstruction, true),
    ]
}

pub(super) fn reasons_not_aligned_reply(request: &HandlerRequest<'_>) -> Reply {
    Reply::new(
        " But the reason statements identified don't refer to premises in your argument reconstruction.",
        realign(request, Field::Reasons),
    )
}

pub(super) fn conjectures_not_aligned_reply(request: &HandlerRequest<'_>) -> Reply {
    Reply::new(
        " But the conjecture statements identified don't refer to conclusions in your argument reconstruction.",
        realign(request, Field::Conjectures),
    )
}

/// Suggest a reconstruction from quotes and cues given so far.
pub(super) async fn catch_all_reply(
    request: &HandlerRequest<'_>,
    oracle: &dyn ScoringOracle,
) -> Reply {
    let hints: Vec<Field> = QUOTE_FIELDS
        .into_iter()
        .filter(|f| request.aar.is_set(*f))
        .chain(request.available_cues())
        .collect();

    let mut options = Vec::new();
    if let Some(reconstruction) = suggest_reconstruction(oracle, request.aar, hints).await {
        options.push(OptionFactory::suggested_text(
            Field::ArgdownReconstruction,
            ALTERNATIVE_RECO_CONTEXT,
            reconstruction,
        ));
    }
    options.extend(QUOTE_FIELDS.map(|f| OptionFactory::quotes(request.aar, f)));
    options.push(OptionFactory::text(request.aar, Field::ArgdownReconstruction, true));
    options.extend(OptionFactory::cues(request.aar));
    Reply::new(
        " Revise and expand so that your reasons and conjectures better cohere with the rest of the analysis (esp. argument reconstruction).",
        options,
    )
}
