//! Deterministic oracles.
//!
//! [`ScriptedOracle`] answers from fixed tables and records every call; it
//! stands in for a model server in tests. [`NullOracle`] refuses every call,
//! which makes oracle-backed metrics undefined and drops suggestions.

use std::collections::HashMap;

use argtutor_core::InputMap;
use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::error::{OracleError, Result};
use crate::mode::GenerativeMode;
use crate::oracle::{Generation, ScoringOracle};

/// A call received by a [`ScriptedOracle`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OracleCall {
    Generate(String),
    Loss(String),
}

/// Oracle answering from fixed generation and loss tables.
///
/// Modes are matched by their key notation with whitespace removed, so
/// `"s + c => a"` and `"s+c=>a"` name the same mode. Losses can be fixed
/// per mode and target text, per mode, or fall back to a default.
#[derive(Debug)]
pub struct ScriptedOracle {
    generations: HashMap<String, Vec<String>>,
    losses: HashMap<String, f64>,
    target_losses: HashMap<(String, String), f64>,
    default_loss: f64,
    calls: Mutex<Vec<OracleCall>>,
}

fn mode_key(mode: &str) -> String {
    mode.split_whitespace().collect()
}

impl ScriptedOracle {
    pub fn new() -> Self {
        Self {
            generations: HashMap::new(),
            losses: HashMap::new(),
            target_losses: HashMap::new(),
            default_loss: 1.0,
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Generate `text` for `mode`.
    #[must_use]
    pub fn with_generation(mut self, mode: &str, text: impl Into<String>) -> Self {
        self.generations
            .entry(mode_key(mode))
            .or_default()
            .push(text.into());
        self
    }

    /// Report `loss` for `mode` regardless of the target text.
    #[must_use]
    pub fn with_loss(mut self, mode: &str, loss: f64) -> Self {
        self.losses.insert(mode_key(mode), loss);
        self
    }

    /// Report `loss` for `mode` when the target field holds `target`.
    #[must_use]
    pub fn with_target_loss(mut self, mode: &str, target: impl Into<String>, loss: f64) -> Self {
        self.target_losses
            .insert((mode_key(mode), target.into()), loss);
        self
    }

    /// Loss reported for modes without an entry.
    #[must_use]
    pub fn with_default_loss(mut self, loss: f64) -> Self {
        self.default_loss = loss;
        self
    }

    /// All calls received so far, oldest first.
    pub async fn calls(&self) -> Vec<OracleCall> {
        self.calls.lock().await.clone()
    }

    /// Number of calls received so far.
    pub async fn call_count(&self) -> usize {
        self.calls.lock().await.len()
    }
}

impl Default for ScriptedOracle {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ScoringOracle for ScriptedOracle {
    async fn generate(&self, inputs: &InputMap, mode: &GenerativeMode) -> Result<Generation> {
        let key = mode_key(&mode.to_string());
        self.calls.lock().await.push(OracleCall::Generate(key.clone()));
        let candidates = self.generations.get(&key).cloned().unwrap_or_default();
        Generation::new(candidates, inputs, mode)
    }

    async fn loss(&self, inputs: &InputMap, mode: &GenerativeMode) -> Result<f64> {
        let key = mode_key(&mode.to_string());
        self.calls.lock().await.push(OracleCall::Loss(key.clone()));
        let target = mode.target_text(inputs)?;
        let loss = self
            .target_losses
            .get(&(key.clone(), target))
            .or_else(|| self.losses.get(&key))
            .copied()
            .unwrap_or(self.default_loss);
        Ok(loss)
    }
}

/// Oracle that is always unavailable.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullOracle;

#[async_trait]
impl ScoringOracle for NullOracle {
    async fn generate(&self, _inputs: &InputMap, _mode: &GenerativeMode) -> Result<Generation> {
        Err(OracleError::Disabled)
    }

    async fn loss(&self, _inputs: &InputMap, _mode: &GenerativeMode) -> Result<f64> {
        Err(OracleError::Disabled)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn inputs() -> InputMap {
        let mut inputs = InputMap::new();
        inputs.insert("source_text".into(), "src".into());
        inputs.insert("argdown_reconstruction".into(), "(1) P. ---- (2) C.".into());
        inputs
    }

    #[tokio::test]
    async fn losses_resolve_by_target_then_mode_then_default() {
        let oracle = ScriptedOracle::new()
            .with_loss("s => a", 2.0)
            .with_target_loss("s => a", "(1) P. ---- (2) C.", 0.5)
            .with_default_loss(3.0);
        let mode = GenerativeMode::from_keys("s => a").unwrap();
        assert_eq!(oracle.loss(&inputs(), &mode).await.unwrap(), 0.5);

        let mut other = inputs();
        other.insert("argdown_reconstruction".into(), "(1) Q.".into());
        assert_eq!(oracle.loss(&other, &mode).await.unwrap(), 2.0);

        let unknown = GenerativeMode::from_keys("a => s").unwrap();
        assert_eq!(oracle.loss(&inputs(), &unknown).await.unwrap(), 3.0);
    }

    #[tokio::test]
    async fn modes_match_ignoring_whitespace() {
        let oracle = ScriptedOracle::new().with_generation("s + c => a", "reco");
        let mut inputs = inputs();
        inputs.insert("conclusion".into(), "C.".into());
        let mode = GenerativeMode::from_keys("s+c=>a").unwrap();
        let generation = oracle.generate(&inputs, &mode).await.unwrap();
        assert_eq!(generation.text(), "reco");
    }

    #[tokio::test]
    async fn unscripted_generation_fails() {
        let oracle = ScriptedOracle::new();
        let mode = GenerativeMode::from_keys("s => a").unwrap();
        let result = oracle.generate(&inputs(), &mode).await;
        assert!(matches!(result, Err(OracleError::NoGeneratedText(_))));
    }

    #[tokio::test]
    async fn records_calls() {
        let oracle = ScriptedOracle::new();
        let mode = GenerativeMode::from_keys("s => a").unwrap();
        let _ = oracle.generate(&inputs(), &mode).await;
        let _ = oracle.loss(&inputs(), &mode).await;
        assert_eq!(
            oracle.calls().await,
            vec![
                OracleCall::Generate("s=>a".into()),
                OracleCall::Loss("s=>a".into())
            ]
        );
    }

    #[tokio::test]
    async fn null_oracle_is_disabled() {
        let mode = GenerativeMode::from_keys("s => a").unwrap();
        assert!(matches!(
            NullOracle.loss(&inputs(), &mode).await,
            Err(OracleError::Disabled)
        ));
        assert!(matches!(
            NullOracle.generate(&inputs(), &mode).await,
            Err(OracleError::Disabled)
        ));
    }
}
