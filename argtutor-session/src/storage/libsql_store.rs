//! libSQL implementation of snapshot storage.
//!
//! Snapshots are stored as JSON payloads next to the columns they are
//! queried by. Scores live in their own table keyed by snapshot id.

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use libsql::{Builder, Connection, Database};
use tracing::{debug, instrument};
use uuid::Uuid;

use super::{Error, Result, SnapshotStore};
use crate::snapshot::{ProjectId, Snapshot, SnapshotId};

/// SQL schema for the snapshots table.
const SCHEMA_SNAPSHOTS: &str = r#"
CREATE TABLE IF NOT EXISTS snapshots (
    id TEXT PRIMARY KEY,
    project_id TEXT NOT NULL,
    global_step INTEGER NOT NULL,
    resumes_from_step INTEGER,
    created_at TEXT NOT NULL,
    payload TEXT NOT NULL
)
"#;

/// SQL schema for the scores table.
const SCHEMA_SCORES: &str = r#"
CREATE TABLE IF NOT EXISTS scores (
    snapshot_id TEXT PRIMARY KEY,
    scores TEXT NOT NULL
)
"#;

/// SQL index for step lookups within a project; one snapshot per step.
const INDEX_SNAPSHOTS: &str = r#"
CREATE UNIQUE INDEX IF NOT EXISTS idx_snapshots_project_step
ON snapshots(project_id, global_step)
"#;

/// Upsert by id. A different id at a taken step violates the unique index.
const UPSERT_SNAPSHOT: &str = r#"
INSERT INTO snapshots (id, project_id, global_step, resumes_from_step, created_at, payload)
VALUES (?, ?, ?, ?, ?, ?)
ON CONFLICT(id) DO UPDATE SET
    project_id = excluded.project_id,
    global_step = excluded.global_step,
    resumes_from_step = excluded.resumes_from_step,
    created_at = excluded.created_at,
    payload = excluded.payload
"#;

/// libSQL-backed snapshot store.
///
/// One connection is opened up front and reused, so an in-memory database
/// lives as long as the store.
#[derive(Clone)]
pub struct LibsqlSnapshotStore {
    _db: Arc<Database>,
    conn: Connection,
}

impl LibsqlSnapshotStore {
    /// Create a new store backed by a local database file.
    pub async fn new_local(path: &Path) -> Result<Self> {
        let db = Builder::new_local(path).build().await?;
        Self::open(db).await
    }

    /// Create a new in-memory store (for testing).
    pub async fn new_memory() -> Result<Self> {
        let db = Builder::new_local(":memory:").build().await?;
        Self::open(db).await
    }

    async fn open(db: Database) -> Result<Self> {
        let conn = db.connect()?;
        let store = Self {
            _db: Arc::new(db),
            conn,
        };
        store.ensure_schema().await?;
        Ok(store)
    }

    /// Ensure the database schema exists.
    async fn ensure_schema(&self) -> Result<()> {
        self.conn.execute(SCHEMA_SNAPSHOTS, ()).await?;
        self.conn.execute(SCHEMA_SCORES, ()).await?;
        self.conn.execute(INDEX_SNAPSHOTS, ()).await?;
        Ok(())
    }

    /// Parse a snapshot from its payload column.
    fn parse_snapshot(row: &libsql::Row) -> Result<Snapshot> {
        let id_str: String = row.get(0)?;
        let created_at_str: String = row.get(1)?;
        let payload: String = row.get(2)?;

        let snapshot: Snapshot = serde_json::from_str(&payload)?;
        let id = parse_uuid(&id_str, "snapshot id")?;
        if snapshot.id.0 != id {
            return Err(Error::InvalidData(format!(
                "snapshot {} stored under id {}",
                snapshot.id, id_str
            )));
        }
        // the column is authoritative for the timestamp
        let created_at = parse_datetime(&created_at_str)?;
        Ok(Snapshot {
            created_at,
            ..snapshot
        })
    }

    /// Write `snapshot` on `conn`, which may be inside a transaction.
    async fn write_snapshot(conn: &Connection, snapshot: &Snapshot) -> Result<()> {
        let mut rows = conn
            .query(
                "SELECT id FROM snapshots WHERE project_id = ? AND global_step = ?",
                libsql::params![snapshot.project_id.to_string(), snapshot.global_step as i64],
            )
            .await?;
        if let Some(row) = rows.next().await? {
            let id: String = row.get(0)?;
            if id != snapshot.id.to_string() {
                return Err(Error::StepTaken {
                    project: snapshot.project_id.to_string(),
                    step: snapshot.global_step,
                });
            }
        }

        let payload = serde_json::to_string(snapshot)?;
        conn.execute(
            UPSERT_SNAPSHOT,
            libsql::params![
                snapshot.id.to_string(),
                snapshot.project_id.to_string(),
                snapshot.global_step as i64,
                snapshot.resumes_from_step.map(|s| s as i64),
                format_datetime(snapshot.created_at),
                payload
            ],
        )
        .await?;
        Ok(())
    }

    async fn write_scores(conn: &Connection, snapshot: &Snapshot) -> Result<()> {
        let scores = serde_json::to_string(&snapshot.scores)?;
        conn.execute(
            "INSERT OR REPLACE INTO scores (snapshot_id, scores) VALUES (?, ?)",
            libsql::params![snapshot.id.to_string(), scores],
        )
        .await?;
        Ok(())
    }

    async fn query_one(
        &self,
        sql: &str,
        params: impl libsql::params::IntoParams,
    ) -> Result<Option<Snapshot>> {
        let mut rows = self.conn.query(sql, params).await?;
        if let Some(row) = rows.next().await? {
            Ok(Some(Self::parse_snapshot(&row)?))
        } else {
            Ok(None)
        }
    }
}

#[async_trait]
impl SnapshotStore for LibsqlSnapshotStore {
    #[instrument(
        skip(self, snapshot),
        fields(id = %snapshot.id, step = snapshot.global_step),
        level = "debug"
    )]
    async fn store_snapshot(&self, snapshot: &Snapshot) -> Result<()> {
        Self::write_snapshot(&self.conn, snapshot).await?;
        debug!("stored snapshot");
        Ok(())
    }

    #[instrument(skip(self), level = "debug")]
    async fn get_snapshot(&self, project_id: ProjectId, step: u64) -> Result<Option<Snapshot>> {
        self.query_one(
            "SELECT id, created_at, payload FROM snapshots WHERE project_id = ? AND global_step = ?",
            libsql::params![project_id.to_string(), step as i64],
        )
        .await
    }

    #[instrument(skip(self), level = "debug")]
    async fn get_latest(&self, project_id: ProjectId) -> Result<Option<Snapshot>> {
        self.query_one(
            "SELECT id, created_at, payload FROM snapshots WHERE project_id = ? ORDER BY global_step DESC LIMIT 1",
            [project_id.to_string()],
        )
        .await
    }

    #[instrument(skip(self, snapshot), fields(id = %snapshot.id), level = "debug")]
    async fn store_scores(&self, snapshot: &Snapshot) -> Result<()> {
        Self::write_scores(&self.conn, snapshot).await
    }

    #[instrument(skip(self), level = "debug")]
    async fn get_scores(&self, snapshot_id: SnapshotId) -> Result<Option<BTreeMap<String, f64>>> {
        let mut rows = self
            .conn
            .query(
                "SELECT scores FROM scores WHERE snapshot_id = ?",
                [snapshot_id.to_string()],
            )
            .await?;

        if let Some(row) = rows.next().await? {
            let json: String = row.get(0)?;
            Ok(Some(serde_json::from_str(&json)?))
        } else {
            Ok(None)
        }
    }

    #[instrument(
        skip(self, snapshot),
        fields(id = %snapshot.id, step = snapshot.global_step),
        level = "debug"
    )]
    async fn store_revision(&self, snapshot: &Snapshot) -> Result<()> {
        let tx = self.conn.transaction().await?;
        let written = match Self::write_scores(&tx, snapshot).await {
            Ok(()) => Self::write_snapshot(&tx, snapshot).await,
            Err(e) => Err(e),
        };
        match written {
            Ok(()) => {
                tx.commit().await?;
                debug!("stored revision");
                Ok(())
            }
            Err(e) => {
                tx.rollback().await?;
                Err(e)
            }
        }
    }
}

fn parse_uuid(s: &str, what: &str) -> Result<Uuid> {
    s.parse()
        .map_err(|_| Error::InvalidData(format!("invalid {}: {}", what, s)))
}

/// Format a datetime for storage.
fn format_datetime(dt: DateTime<Utc>) -> String {
    dt.to_rfc3339()
}

/// Parse a datetime from storage.
fn parse_datetime(s: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|_| Error::InvalidData(format!("invalid datetime: {}", s)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::testing::{revised, sample_snapshot};

    async fn create_test_store() -> LibsqlSnapshotStore {
        LibsqlSnapshotStore::new_memory().await.unwrap()
    }

    // === Snapshots ===

    #[tokio::test]
    async fn store_returns_none_for_unknown_project() {
        let store = create_test_store().await;
        let project = ProjectId::new();

        assert!(store.get_latest(project).await.unwrap().is_none());
        assert!(store.get_snapshot(project, 0).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn stored_snapshot_is_returned_by_step() {
        let store = create_test_store().await;
        let snapshot = sample_snapshot();
        store.store_snapshot(&snapshot).await.unwrap();

        let stored = store
            .get_snapshot(snapshot.project_id, 0)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored, snapshot);
    }

    #[tokio::test]
    async fn latest_follows_global_step() {
        let store = create_test_store().await;
        let first = sample_snapshot();
        let second = revised(&first, 1);
        let branch = revised(&first, 2);
        for snapshot in [&first, &branch, &second] {
            store.store_snapshot(snapshot).await.unwrap();
        }
        store.store_snapshot(&sample_snapshot()).await.unwrap();

        let latest = store.get_latest(first.project_id).await.unwrap().unwrap();
        assert_eq!(latest.id, branch.id);
        assert_eq!(latest.resumes_from_step, Some(0));
    }

    #[tokio::test]
    async fn storing_same_id_replaces() {
        let store = create_test_store().await;
        let snapshot = sample_snapshot();
        store.store_snapshot(&snapshot).await.unwrap();
        store.store_snapshot(&snapshot.toggled()).await.unwrap();

        let stored = store
            .get_snapshot(snapshot.project_id, 0)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.visible_option, 1);
    }

    #[tokio::test]
    async fn second_snapshot_at_same_step_is_rejected() {
        let store = create_test_store().await;
        let first = sample_snapshot();
        store.store_snapshot(&first).await.unwrap();

        let rival = revised(&first, 0);
        let err = store.store_snapshot(&rival).await.unwrap_err();
        assert!(matches!(err, Error::StepTaken { step: 0, .. }));
    }

    // === Revisions ===

    #[tokio::test]
    async fn revision_stores_snapshot_and_scores() {
        let store = create_test_store().await;
        let snapshot = sample_snapshot();
        store.store_revision(&snapshot).await.unwrap();

        let stored = store.get_latest(snapshot.project_id).await.unwrap().unwrap();
        assert_eq!(stored, snapshot);
        assert_eq!(
            store.get_scores(snapshot.id).await.unwrap(),
            Some(snapshot.scores.clone())
        );
    }

    #[tokio::test]
    async fn rejected_revision_rolls_back_scores() {
        let store = create_test_store().await;
        let first = sample_snapshot();
        store.store_revision(&first).await.unwrap();

        let rival = revised(&first, 0);
        assert!(store.store_revision(&rival).await.is_err());
        assert!(store.get_scores(rival.id).await.unwrap().is_none());
        let stored = store.get_snapshot(first.project_id, 0).await.unwrap().unwrap();
        assert_eq!(stored.id, first.id);

        // the connection is usable after the rollback
        let next = revised(&first, 1);
        store.store_revision(&next).await.unwrap();
        assert_eq!(
            store.get_latest(first.project_id).await.unwrap().unwrap().id,
            next.id
        );
    }

    // === Scores ===

    #[tokio::test]
    async fn scores_roundtrip_by_snapshot_id() {
        let store = create_test_store().await;
        let snapshot = sample_snapshot();
        assert!(store.get_scores(snapshot.id).await.unwrap().is_none());

        store.store_scores(&snapshot).await.unwrap();
        assert_eq!(
            store.get_scores(snapshot.id).await.unwrap(),
            Some(snapshot.scores.clone())
        );
    }

    // === Files ===

    #[tokio::test]
    async fn local_database_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("snapshots.db");
        let snapshot = sample_snapshot();
        {
            let store = LibsqlSnapshotStore::new_local(&path).await.unwrap();
            store.store_snapshot(&snapshot).await.unwrap();
        }

        let store = LibsqlSnapshotStore::new_local(&path).await.unwrap();
        let latest = store.get_latest(snapshot.project_id).await.unwrap().unwrap();
        assert_eq!(latest.id, snapshot.id);
    }

    #[test]
    fn invalid_datetime_is_invalid_data() {
        assert!(matches!(
            parse_datetime("yesterday"),
            Err(Error::InvalidData(_))
        ));
    }
}
