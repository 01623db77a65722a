//! In-memory snapshot store.

use std::collections::{BTreeMap, HashMap};

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::{Error, Result, SnapshotStore};
use crate::snapshot::{ProjectId, Snapshot, SnapshotId};

/// Keeps snapshots in a Vec in insertion order.
#[derive(Default)]
pub struct InMemorySnapshotStore {
    snapshots: RwLock<Vec<Snapshot>>,
    scores: RwLock<HashMap<SnapshotId, BTreeMap<String, f64>>>,
}

impl InMemorySnapshotStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored snapshots across all projects.
    pub async fn len(&self) -> usize {
        self.snapshots.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.snapshots.read().await.is_empty()
    }
}

/// Insert or replace `snapshot` by id, refusing a second id at its step.
fn upsert(snapshots: &mut Vec<Snapshot>, snapshot: &Snapshot) -> Result<()> {
    let taken = snapshots.iter().any(|s| {
        s.project_id == snapshot.project_id
            && s.global_step == snapshot.global_step
            && s.id != snapshot.id
    });
    if taken {
        return Err(Error::StepTaken {
            project: snapshot.project_id.to_string(),
            step: snapshot.global_step,
        });
    }
    match snapshots.iter_mut().find(|s| s.id == snapshot.id) {
        Some(existing) => *existing = snapshot.clone(),
        None => snapshots.push(snapshot.clone()),
    }
    Ok(())
}

#[async_trait]
impl SnapshotStore for InMemorySnapshotStore {
    async fn store_snapshot(&self, snapshot: &Snapshot) -> Result<()> {
        upsert(&mut *self.snapshots.write().await, snapshot)
    }

    async fn get_snapshot(&self, project_id: ProjectId, step: u64) -> Result<Option<Snapshot>> {
        Ok(self
            .snapshots
            .read()
            .await
            .iter()
            .find(|s| s.project_id == project_id && s.global_step == step)
            .cloned())
    }

    async fn get_latest(&self, project_id: ProjectId) -> Result<Option<Snapshot>> {
        Ok(self
            .snapshots
            .read()
            .await
            .iter()
            .filter(|s| s.project_id == project_id)
            .max_by_key(|s| s.global_step)
            .cloned())
    }

    async fn store_scores(&self, snapshot: &Snapshot) -> Result<()> {
        self.scores
            .write()
            .await
            .insert(snapshot.id, snapshot.scores.clone());
        Ok(())
    }

    async fn get_scores(&self, snapshot_id: SnapshotId) -> Result<Option<BTreeMap<String, f64>>> {
        Ok(self.scores.read().await.get(&snapshot_id).cloned())
    }

    async fn store_revision(&self, snapshot: &Snapshot) -> Result<()> {
        let mut snapshots = self.snapshots.write().await;
        let mut scores = self.scores.write().await;
        upsert(&mut snapshots, snapshot)?;
        scores.insert(snapshot.id, snapshot.scores.clone());
        Ok(())
    }
}
