//! Tutor configuration and platform paths.
//!
//! Configuration lives in a TOML file with one table per collaborator:
//!
//! ```toml
//! [oracle]
//! enabled = true
//! command = "argtutor-oracle"
//!
//! [prover]
//! max_fresh_individuals = 2
//!
//! [storage]
//! backend = "libsql"
//! ```
//!
//! Paths follow the XDG base directory convention on every platform.

use std::path::{Path, PathBuf};

use argtutor_oracle::OracleConfig;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::Result;

const APP_DIR: &str = "argtutor";

/// Environment variable naming an explicit configuration file.
pub const CONFIG_ENV: &str = "ARGTUTOR_CONFIG";

/// Get the argtutor config directory.
///
/// Returns `$XDG_CONFIG_HOME/argtutor` if set, otherwise `~/.config/argtutor`.
pub fn config_dir() -> PathBuf {
    if let Ok(xdg_config) = std::env::var("XDG_CONFIG_HOME") {
        PathBuf::from(xdg_config).join(APP_DIR)
    } else if let Some(home) = dirs::home_dir() {
        home.join(".config").join(APP_DIR)
    } else {
        PathBuf::from(".config").join(APP_DIR)
    }
}

/// Get the argtutor data directory.
///
/// Returns `$XDG_DATA_HOME/argtutor` if set, otherwise `~/.local/share/argtutor`.
pub fn data_dir() -> PathBuf {
    if let Ok(xdg_data) = std::env::var("XDG_DATA_HOME") {
        PathBuf::from(xdg_data).join(APP_DIR)
    } else if let Some(home) = dirs::home_dir() {
        home.join(".local/share").join(APP_DIR)
    } else {
        PathBuf::from(".local/share").join(APP_DIR)
    }
}

/// Top-level tutor configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TutorConfig {
    pub oracle: OracleConfig,
    pub prover: ProverConfig,
    pub storage: StorageConfig,
}

impl TutorConfig {
    /// Read a configuration file.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config: TutorConfig = toml::from_str(&contents)?;
        debug!(path = %path.display(), "loaded configuration");
        Ok(config)
    }

    /// Read `$ARGTUTOR_CONFIG`, or the user config file when present.
    ///
    /// Falls back to defaults when neither exists.
    pub fn load_default() -> Result<Self> {
        let path = Self::default_path();
        if path.exists() {
            Self::load(&path)
        } else {
            debug!(path = %path.display(), "no configuration file, using defaults");
            Ok(Self::default())
        }
    }

    /// Path consulted by [`TutorConfig::load_default`].
    pub fn default_path() -> PathBuf {
        match std::env::var(CONFIG_ENV) {
            Ok(path) => PathBuf::from(path),
            Err(_) => config_dir().join("config.toml"),
        }
    }
}

/// Bounds of the model-search prover.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProverConfig {
    /// Domain elements added beyond the constants of a problem.
    pub max_fresh_individuals: usize,
    /// Ground atoms above which a problem is reported unproven.
    pub max_atoms: usize,
}

impl Default for ProverConfig {
    fn default() -> Self {
        Self {
            max_fresh_individuals: 2,
            max_atoms: 20,
        }
    }
}

/// Snapshot store backend.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StorageBackend {
    #[default]
    Memory,
    Libsql,
}

/// Where snapshots are kept.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub backend: StorageBackend,
    /// Database file for the libsql backend.
    pub path: Option<PathBuf>,
}

impl StorageConfig {
    /// Database file, defaulting to `<data_dir>/snapshots.db`.
    pub fn resolved_path(&self) -> PathBuf {
        self.path
            .clone()
            .unwrap_or_else(|| data_dir().join("snapshots.db"))
    }
}
