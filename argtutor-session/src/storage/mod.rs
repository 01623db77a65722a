//! Snapshot persistence.
//!
//! The engine hands a fully built snapshot and its scores to
//! [`SnapshotStore::store_revision`] in one call, so a failed turn leaves
//! nothing behind:
//! - [`InMemorySnapshotStore`] keeps everything in process
//! - [`LibsqlSnapshotStore`] persists to a local libSQL database

mod error;
mod libsql_store;
mod memory;

pub use error::{Error, Result};
pub use libsql_store::LibsqlSnapshotStore;
pub use memory::InMemorySnapshotStore;

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::info;

use crate::config::{StorageBackend, StorageConfig};
use crate::snapshot::{ProjectId, Snapshot, SnapshotId};

/// Stores snapshots and their score maps.
#[async_trait]
pub trait SnapshotStore: Send + Sync {
    /// Store a snapshot, replacing an earlier version with the same id.
    ///
    /// Fails with [`Error::StepTaken`] when a different snapshot already
    /// holds the same step of the project.
    async fn store_snapshot(&self, snapshot: &Snapshot) -> Result<()>;

    /// Get the snapshot at `step` of a project.
    async fn get_snapshot(&self, project_id: ProjectId, step: u64) -> Result<Option<Snapshot>>;

    /// Get the snapshot with the highest step of a project.
    async fn get_latest(&self, project_id: ProjectId) -> Result<Option<Snapshot>>;

    /// Store the scores of a snapshot under its id.
    async fn store_scores(&self, snapshot: &Snapshot) -> Result<()>;

    /// Get the scores stored for a snapshot.
    async fn get_scores(&self, snapshot_id: SnapshotId) -> Result<Option<BTreeMap<String, f64>>>;

    /// Store a new snapshot together with its scores.
    ///
    /// Either both are stored or the snapshot is not. The default writes
    /// the scores first, so a failure leaves at most scores for an id no
    /// snapshot carries.
    async fn store_revision(&self, snapshot: &Snapshot) -> Result<()> {
        self.store_scores(snapshot).await?;
        self.store_snapshot(snapshot).await
    }
}

/// Open the store selected by `config`.
pub async fn open_store(config: &StorageConfig) -> Result<Arc<dyn SnapshotStore>> {
    match config.backend {
        StorageBackend::Memory => Ok(Arc::new(InMemorySnapshotStore::new())),
        StorageBackend::Libsql => {
            let path = config.resolved_path();
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            info!(path = %path.display(), "opening snapshot database");
            Ok(Arc::new(LibsqlSnapshotStore::new_local(&path).await?))
        }
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn opens_memory_store_by_default() {
        let store = open_store(&StorageConfig::default()).await.unwrap();
        assert!(store.get_latest(ProjectId::new()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn opens_libsql_store_at_configured_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("snapshots.db");
        let config = StorageConfig {
            backend: StorageBackend::Libsql,
            path: Some(path.clone()),
        };
        let store = open_store(&config).await.unwrap();
        assert!(store.get_latest(ProjectId::new()).await.unwrap().is_none());
        assert!(path.exists());
    }
}
