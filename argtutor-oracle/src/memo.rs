//! Loss memoization.

use std::collections::HashMap;
use std::sync::Arc;

use argtutor_core::InputMap;
use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::debug;

use crate::error::Result;
use crate::mode::GenerativeMode;
use crate::oracle::{Generation, ScoringOracle};

type LossKey = (String, String, String);

/// Caches `loss` results by mode, prompt and target text.
///
/// Coherence metrics ask for the same losses every turn as long as the
/// fields they read are unchanged. Generations are never cached.
pub struct MemoizedOracle {
    inner: Arc<dyn ScoringOracle>,
    losses: RwLock<HashMap<LossKey, f64>>,
}

impl MemoizedOracle {
    pub fn new(inner: Arc<dyn ScoringOracle>) -> Self {
        Self {
            inner,
            losses: RwLock::new(HashMap::new()),
        }
    }

    /// Number of cached losses.
    pub async fn cached(&self) -> usize {
        self.losses.read().await.len()
    }
}

#[async_trait]
impl ScoringOracle for MemoizedOracle {
    async fn generate(&self, inputs: &InputMap, mode: &GenerativeMode) -> Result<Generation> {
        self.inner.generate(inputs, mode).await
    }

    async fn loss(&self, inputs: &InputMap, mode: &GenerativeMode) -> Result<f64> {
        let key = (mode.to_string(), mode.prompt(inputs)?, mode.target_text(inputs)?);
        if let Some(loss) = self.losses.read().await.get(&key) {
            debug!(mode = %mode, "loss cache hit");
            return Ok(*loss);
        }
        let loss = self.inner.loss(inputs, mode).await?;
        self.losses.write().await.insert(key, loss);
        Ok(loss)
    }
}

impl std::fmt::Debug for MemoizedOracle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoizedOracle").finish_non_exhaustive()
    }
}
