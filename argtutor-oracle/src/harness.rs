//! Subprocess-based scoring oracle.
//!
//! Each call spawns the configured command, writes one JSON request to its
//! stdin and reads one JSON reply from its stdout:
//!
//! ```text
//! -> {"task":"generate","prompt":"argdown_reconstruction: source_text: ..."}
//! <- {"generated_texts":["(1) ... ---- (2) ..."]}
//! -> {"task":"loss","prompt":"...","target":"(1) ..."}
//! <- {"loss":1.73}
//! ```
//!
//! Model servers are slow and occasionally hang, so every call runs under
//! a timeout and is retried up to `max_retries` times.

use std::time::Duration;

use argtutor_core::InputMap;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::OracleConfig;
use crate::error::{OracleError, Result};
use crate::mode::GenerativeMode;
use crate::oracle::{Generation, ScoringOracle};

const MOCK_REPLY: &str = r#"{"generated_texts":["(1) Mock premise. ---- (2) Mock conclusion."],"loss":0.5}"#;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
enum Task {
    Generate,
    Loss,
}

#[derive(Debug, Serialize)]
struct HarnessRequest<'a> {
    task: Task,
    prompt: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    target: Option<&'a str>,
}

#[derive(Debug, Deserialize)]
struct HarnessReply {
    #[serde(default)]
    generated_texts: Vec<String>,
    #[serde(default)]
    loss: Option<f64>,
}

/// Scoring oracle backed by a subprocess.
pub struct HarnessOracle {
    config: OracleConfig,
}

impl HarnessOracle {
    pub fn new(config: OracleConfig) -> Self {
        Self { config }
    }

    pub fn is_enabled(&self) -> bool {
        self.config.enabled
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.config.timeout_seconds.into())
    }

    async fn call(&self, request: &HarnessRequest<'_>) -> Result<HarnessReply> {
        if !self.config.enabled {
            return Err(OracleError::Disabled);
        }

        let input_json =
            serde_json::to_string(request).map_err(|e| OracleError::Serialization(e.to_string()))?;

        let mut last_error = None;
        for attempt in 0..=self.config.max_retries {
            match self.run_subprocess(&input_json).await {
                Ok(reply) => return Ok(reply),
                Err(e) => {
                    tracing::warn!(
                        attempt = attempt + 1,
                        max_retries = self.config.max_retries,
                        error = %e,
                        "oracle call attempt failed"
                    );
                    last_error = Some(e);
                }
            }
        }

        Err(last_error.unwrap_or(OracleError::Disabled))
    }

    async fn run_subprocess(&self, input_json: &str) -> Result<HarnessReply> {
        use tokio::process::Command;

        let mut cmd = match self.config.backend.as_str() {
            "harness" => {
                let mut cmd = Command::new(&self.config.command);
                cmd.args(["--model", &self.config.model]);
                cmd
            }
            "mock" => {
                let mut cmd = Command::new("echo");
                cmd.arg(MOCK_REPLY);
                cmd
            }
            other => {
                return Err(OracleError::ParseFailed(format!("unknown backend: {other}")));
            }
        };

        cmd.stdin(std::process::Stdio::piped());
        cmd.stdout(std::process::Stdio::piped());
        cmd.stderr(std::process::Stdio::piped());
        cmd.kill_on_drop(true);

        let mut child = cmd.spawn().map_err(OracleError::SpawnFailed)?;

        // dropping stdin closes it so the harness sees EOF
        if let Some(mut stdin) = child.stdin.take() {
            if self.config.backend == "harness" {
                use tokio::io::AsyncWriteExt;
                let _ = stdin.write_all(input_json.as_bytes()).await;
                let _ = stdin.flush().await;
            }
        }

        let output = tokio::time::timeout(self.timeout(), child.wait_with_output())
            .await
            .map_err(|_| OracleError::Timeout(self.config.timeout_seconds))?
            .map_err(OracleError::SpawnFailed)?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(OracleError::SubprocessFailed(
                output.status.code().unwrap_or(-1),
                stderr.to_string(),
            ));
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        serde_json::from_str(&stdout).map_err(|e| OracleError::ParseFailed(format!("{e}: {stdout}")))
    }
}

#[async_trait]
impl ScoringOracle for HarnessOracle {
    async fn generate(&self, inputs: &InputMap, mode: &GenerativeMode) -> Result<Generation> {
        let prompt = mode.prompt(inputs)?;
        debug!(mode = %mode, "requesting generation");
        let reply = self
            .call(&HarnessRequest {
                task: Task::Generate,
                prompt: &prompt,
                target: None,
            })
            .await?;
        Generation::new(reply.generated_texts, inputs, mode)
    }

    async fn loss(&self, inputs: &InputMap, mode: &GenerativeMode) -> Result<f64> {
        let prompt = mode.prompt(inputs)?;
        let target = mode.target_text(inputs)?;
        debug!(mode = %mode, "requesting loss");
        let reply = self
            .call(&HarnessRequest {
                task: Task::Loss,
                prompt: &prompt,
                target: Some(&target),
            })
            .await?;
        reply
            .loss
            .ok_or_else(|| OracleError::ParseFailed("reply has no loss".to_string()))
    }
}

impl Default for HarnessOracle {
    fn default() -> Self {
        Self::new(OracleConfig::default())
    }
}

impl std::fmt::Debug for HarnessOracle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HarnessOracle")
            .field("enabled", &self.config.enabled)
            .field("backend", &self.config.backend)
            .field("command", &self.config.command)
            .field("model", &self.config.model)
            .field("timeout_seconds", &self.config.timeout_seconds)
            .finish()
    }
}
