//! Formalization phase: premises and conclusions in predicate logic.

use argtutor_core::Field;
use argtutor_evals::metrics::{
    COMPLETE_FORMALIZATION, CONSISTENT_USAGE, FORM_COH_RECO, GLOBAL_DEDUCTIVE_VALIDITY,
    LOCAL_DEDUCTIVE_VALIDITY, WELL_FORMED_FORM, WELL_FORMED_KEYS,
};
use argtutor_oracle::{GenerativeMode, ScoringOracle};

use super::{HandlerRequest, Reply, suggest};
use crate::option::{InputOption, OptionFactory};

/// Failed checks reported by the catch-all, in order.
const CATCH_ALL_CHECKS: [(&str, &str); 4] = [
    (WELL_FORMED_KEYS, " The keys don't match your formalization."),
    (
        FORM_COH_RECO,
        " Given your keys, the formalization doesn't cohere with your argument reconstruction.",
    ),
    (
        GLOBAL_DEDUCTIVE_VALIDITY,
        " Given your formalization, the argument is not globally deductively valid.",
    ),
    (
        LOCAL_DEDUCTIVE_VALIDITY,
        " Given your formalization, some individual sub-argument is not deductively valid.",
    ),
];

pub(super) fn inconsistent_usage(request: &HandlerRequest<'_>) -> bool {
    !request.holds(CONSISTENT_USAGE)
}

pub(super) fn incomplete(request: &HandlerRequest<'_>) -> bool {
    Field::FORMALIZATIONS.iter().all(|f| !request.aar.is_set(*f))
        || !request.holds(COMPLETE_FORMALIZATION)
}

pub(super) fn ill_formed(request: &HandlerRequest<'_>) -> bool {
    !request.holds(WELL_FORMED_FORM)
}

/// Formalization groups the reconstruction calls for; intermediary
/// conclusions only when the argument has some.
fn formalization_fields(request: &HandlerRequest<'_>) -> Vec<Field> {
    let has_intermediary = request
        .argument()
        .is_none_or(|a| a.has_intermediary_conclusions());
    Field::FORMALIZATIONS
        .into_iter()
        .filter(|f| *f != Field::IntermediaryConclusionsFormalized || has_intermediary)
        .collect()
}

fn formalization_options(request: &HandlerRequest<'_>) -> Vec<InputOption> {
    formalization_fields(request)
        .into_iter()
        .chain([Field::PlchdSubstitutions])
        .map(|f| OptionFactory::text(request.aar, f, true))
        .collect()
}

pub(super) fn inconsistent_usage_reply(request: &HandlerRequest<'_>) -> Reply {
    Reply::new(
        " But premises and intermediary conclusions are not consistently used in the argument's inference.",
        vec![OptionFactory::text(request.aar, Field::ArgdownReconstruction, true)],
    )
}

/// Keep formalizations already given and draft the missing ones from the
/// statements they formalize.
pub(super) async fn incomplete_reply(
    request: &HandlerRequest<'_>,
    oracle: &dyn ScoringOracle,
) -> Reply {
    let inputs = request.expanded_inputs();
    let mut options = Vec::new();
    for field in formalization_fields(request) {
        if request.aar.is_set(field) {
            options.push(OptionFactory::text(request.aar, field, true));
            continue;
        }
        let Some(propositions) = field
            .formalized_propositions()
            .filter(|p| inputs.contains_key(p.as_str()))
        else {
            options.push(OptionFactory::empty_text(field));
            continue;
        };
        let given = Field::FORMALIZATIONS
            .into_iter()
            .chain([Field::PlchdSubstitutions])
            .filter(|f| *f != field && request.aar.is_set(*f));
        let mode = GenerativeMode::new(field, std::iter::once(propositions).chain(given));
        options.push(match suggest(oracle, &inputs, &mode).await {
            Some(draft) => OptionFactory::suggested_text(
                field,
                "The tutor has drafted a formalization for you.",
                draft,
            ),
            None => OptionFactory::empty_text(field),
        });
    }
    options.push(OptionFactory::text(request.aar, Field::PlchdSubstitutions, true));
    options.push(OptionFactory::text(request.aar, Field::ArgdownReconstruction, true));
    Reply::new(" But the formalization of the argument is incomplete.", options)
}

pub(super) fn ill_formed_reply(request: &HandlerRequest<'_>) -> Reply {
    Reply::new(
        " But some formalizations are not well-formed.",
        formalization_options(request),
    )
}

pub(super) fn catch_all_reply(request: &HandlerRequest<'_>) -> Reply {
    let remark: String = CATCH_ALL_CHECKS
        .iter()
        .filter(|(metric, _)| !request.holds(metric))
        .map(|(_, message)| *message)
        .collect();
    let mut options = formalization_options(request);
    options.push(OptionFactory::text(request.aar, Field::ArgdownReconstruction, true));
    Reply::new(remark, options)
}
