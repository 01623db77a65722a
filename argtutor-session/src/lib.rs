//! Tutoring sessions over argument analyses.
//!
//! A [`Project`] drives the turns: each learner input updates one field of
//! the analysis record, the evaluator rescores it, the [`HandlerChain`]
//! picks feedback and the next [`InputOption`]s, and a new [`Snapshot`]
//! is appended to history and handed to a [`SnapshotStore`].
//!
//! ```no_run
//! use argtutor_core::Field;
//! use argtutor_session::{Project, TutorConfig};
//!
//! # async fn run() -> argtutor_session::Result<()> {
//! let config = TutorConfig::load_default()?;
//! let mut project = Project::from_config(&config, "Peter is lonely. So he calls his sister.").await?;
//! let snapshot = project.submit_turn("Peter calls his sister.", Field::Conclusion).await?;
//! println!("{}", snapshot.feedback);
//! # Ok(())
//! # }
//! ```

pub mod config;
mod error;
pub mod handler;
mod input;
mod option;
mod project;
mod snapshot;
pub mod storage;

// Configuration
pub use config::{ProverConfig, StorageBackend, StorageConfig, TutorConfig};

// Error types
pub use error::{Error, Result};

// Turn inputs and outputs
pub use input::UserInput;
pub use option::{InputOption, OptionFactory};

// Handler chain
pub use handler::{HandlerChain, HandlerKind, HandlerRequest, HandlerResponse};

// Projects and snapshots
pub use project::Project;
pub use snapshot::{ProjectId, Snapshot, SnapshotId};
pub use storage::{InMemorySnapshotStore, LibsqlSnapshotStore, SnapshotStore};
