//! Oracle configuration.

use serde::{Deserialize, Serialize};

/// Configuration of the subprocess oracle.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OracleConfig {
    /// Whether oracle calls are made at all.
    pub enabled: bool,
    /// "harness" runs `command`; "mock" echoes a fixed reply.
    pub backend: String,
    /// Executable serving generation and loss requests.
    pub command: String,
    /// Model passed to the command.
    pub model: String,
    /// Timeout for a single call in seconds.
    pub timeout_seconds: u32,
    /// Maximum retries for failed calls.
    pub max_retries: u32,
    /// Cache loss results for the lifetime of a project.
    pub memoize_losses: bool,
}

impl Default for OracleConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            backend: "harness".to_string(),
            command: "argtutor-oracle".to_string(),
            model: "debatelab/argument-analyst".to_string(),
            timeout_seconds: 120,
            max_retries: 1,
            memoize_losses: true,
        }
    }
}
