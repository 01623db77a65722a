//! The scoring oracle interface.

use argtutor_core::InputMap;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{OracleError, Result};
use crate::mode::GenerativeMode;

/// Text generation and loss evaluation over analysis input maps.
///
/// Losses are only ever compared with each other; lower is better.
#[async_trait]
pub trait ScoringOracle: Send + Sync {
    /// Generate ranked candidates for the mode's target field.
    async fn generate(&self, inputs: &InputMap, mode: &GenerativeMode) -> Result<Generation>;

    /// Loss of the target field's current value given the mode's inputs.
    async fn loss(&self, inputs: &InputMap, mode: &GenerativeMode) -> Result<f64>;
}

/// What was generated from which inputs, kept so that a presentation layer
/// can let the learner rate the suggestion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationRecord {
    pub inputs: InputMap,
    pub mode: GenerativeMode,
    pub generated_text: String,
}

/// Ranked generation candidates; there is always at least one.
#[derive(Debug, Clone, PartialEq)]
pub struct Generation {
    pub candidates: Vec<String>,
    pub record: GenerationRecord,
}

impl Generation {
    /// Build a generation, failing if there are no candidates.
    pub fn new(candidates: Vec<String>, inputs: &InputMap, mode: &GenerativeMode) -> Result<Self> {
        let generated_text = candidates
            .first()
            .cloned()
            .ok_or_else(|| OracleError::NoGeneratedText(mode.to_string()))?;
        Ok(Self {
            candidates,
            record: GenerationRecord {
                inputs: inputs.clone(),
                mode: mode.clone(),
                generated_text,
            },
        })
    }

    /// The top-ranked candidate.
    pub fn text(&self) -> &str {
        &self.record.generated_text
    }
}

/// Run modes in sequence, feeding each generated text into the input map
/// under its target field before the next mode runs.
pub async fn generate_with_chain(
    oracle: &dyn ScoringOracle,
    inputs: &InputMap,
    chain: &[GenerativeMode],
) -> Result<InputMap> {
    let mut data = inputs.clone();
    for mode in chain {
        match oracle.generate(&data, mode).await {
            Ok(generation) => {
                data.insert(mode.target.as_str().to_string(), generation.text().to_string());
            }
            Err(e) => {
                warn!(mode = %mode, error = %e, "generation failed in chain");
                return Err(e);
            }
        }
    }
    Ok(data)
}
