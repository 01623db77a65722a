//! Tutoring projects: one learner working through one source text.
//!
//! A turn applies one input to one field, re-evaluates the record, lets the
//! handler chain answer and appends the resulting snapshot to history.
//! A turn either completes with exactly one stored snapshot or fails
//! before anything is appended.

use std::sync::Arc;

use argtutor_core::{Aar, Field, ModelSearchProver, Prover};
use argtutor_evals::Evaluator;
use argtutor_oracle::{HarnessOracle, MemoizedOracle, ScoringOracle};
use tracing::{debug, info, instrument};

use crate::config::TutorConfig;
use crate::error::{Error, Result};
use crate::handler::{HandlerChain, HandlerRequest};
use crate::input::UserInput;
use crate::snapshot::{ProjectId, Snapshot};
use crate::storage::{self, SnapshotStore, open_store};

/// A learner's project with its evaluator, handler chain and history.
pub struct Project {
    id: ProjectId,
    evaluator: Evaluator,
    chain: HandlerChain,
    store: Arc<dyn SnapshotStore>,
    /// Snapshots indexed by global step.
    history: Vec<Snapshot>,
    /// Step of the snapshot the next turn starts from.
    current: usize,
}

impl Project {
    /// Start a project on `source_text` with the standard metrics and chain.
    pub async fn start(
        source_text: &str,
        oracle: Arc<dyn ScoringOracle>,
        prover: Arc<dyn Prover>,
        store: Arc<dyn SnapshotStore>,
    ) -> Result<Self> {
        let evaluator = Evaluator::new(oracle.clone(), prover);
        let chain = HandlerChain::standard(oracle);
        Self::start_with(source_text, evaluator, chain, store).await
    }

    /// Start a project with a custom evaluator and chain.
    #[instrument(skip_all, level = "debug")]
    pub async fn start_with(
        source_text: &str,
        mut evaluator: Evaluator,
        chain: HandlerChain,
        store: Arc<dyn SnapshotStore>,
    ) -> Result<Self> {
        let id = ProjectId::new();
        let aar = Aar::new(source_text);
        evaluator.update(&aar).await;
        let response = chain
            .handle(&HandlerRequest::new(&aar, &evaluator))
            .await?;
        let snapshot = Snapshot::initial(id, aar, evaluator.as_dict(), response);
        store.store_revision(&snapshot).await?;
        info!(project = %id, "project started");

        Ok(Self {
            id,
            evaluator,
            chain,
            store,
            history: vec![snapshot],
            current: 0,
        })
    }

    /// Start a project with collaborators built from configuration.
    pub async fn from_config(config: &TutorConfig, source_text: &str) -> Result<Self> {
        let (oracle, prover) = collaborators(config);
        let store = open_store(&config.storage).await?;
        Self::start(source_text, oracle, prover, store).await
    }

    /// Continue a stored project from its latest snapshot.
    #[instrument(skip(oracle, prover, store), level = "debug")]
    pub async fn resume(
        id: ProjectId,
        oracle: Arc<dyn ScoringOracle>,
        prover: Arc<dyn Prover>,
        store: Arc<dyn SnapshotStore>,
    ) -> Result<Self> {
        let latest = store
            .get_latest(id)
            .await?
            .ok_or_else(|| storage::Error::SnapshotNotFound(format!("project {id}")))?;

        let mut history = Vec::new();
        for step in 0..latest.global_step {
            let snapshot = store.get_snapshot(id, step).await?.ok_or_else(|| {
                storage::Error::SnapshotNotFound(format!("project {id} step {step}"))
            })?;
            history.push(snapshot);
        }
        let mut evaluator = Evaluator::new(oracle.clone(), prover);
        evaluator.update(&latest.aar).await;
        history.push(latest);
        info!(project = %id, steps = history.len(), "project resumed");

        Ok(Self {
            id,
            evaluator,
            chain: HandlerChain::standard(oracle),
            store,
            current: history.len() - 1,
            history,
        })
    }

    pub fn id(&self) -> ProjectId {
        self.id
    }

    /// The snapshot the next turn starts from.
    pub fn current(&self) -> &Snapshot {
        &self.history[self.current]
    }

    /// All snapshots by global step.
    pub fn history(&self) -> &[Snapshot] {
        &self.history
    }

    pub fn evaluator(&self) -> &Evaluator {
        &self.evaluator
    }

    /// Submit raw presentation-layer input for `field`.
    pub async fn submit_turn(&mut self, raw_input: &str, field: Field) -> Result<Snapshot> {
        self.submit_input(UserInput::from_raw(raw_input, field))
            .await
    }

    /// Apply `input` to the current record and answer it.
    ///
    /// An input that leaves the record unchanged returns the current
    /// snapshot without a new step.
    #[instrument(skip(self), fields(project = %self.id, field = %input.field()))]
    pub async fn submit_input(&mut self, input: UserInput) -> Result<Snapshot> {
        let previous = self.current().clone();
        let candidate = input.apply(&previous.aar)?;
        if candidate == previous.aar {
            debug!(step = previous.global_step, "input leaves record unchanged");
            return Ok(previous);
        }

        self.evaluator.update(&candidate).await;
        let scores = self.evaluator.as_dict();
        let response = self
            .chain
            .handle(&HandlerRequest::new(&candidate, &self.evaluator))
            .await?;

        let step = self.history.len() as u64;
        let snapshot = previous.create_revision(step, candidate, scores, response, Some(input));
        self.store.store_revision(&snapshot).await?;
        info!(
            step,
            resumes_from = previous.global_step,
            handler = ?snapshot.handler,
            "turn completed"
        );

        self.history.push(snapshot.clone());
        self.current = self.history.len() - 1;
        Ok(snapshot)
    }

    /// Make the snapshot at `step` current; the next turn branches from it.
    pub async fn rewind(&mut self, step: u64) -> Result<&Snapshot> {
        let index = usize::try_from(step)
            .ok()
            .filter(|i| *i < self.history.len())
            .ok_or_else(|| Error::InvalidInput(format!("no snapshot at step {step}")))?;
        self.current = index;
        let aar = self.history[index].aar.clone();
        self.evaluator.update(&aar).await;
        info!(project = %self.id, step, "rewound");
        Ok(self.current())
    }

    /// Show the next option of the current snapshot.
    pub async fn toggle_visible_option(&mut self) -> Result<&Snapshot> {
        let toggled = self.current().toggled();
        self.store.store_snapshot(&toggled).await?;
        self.history[self.current] = toggled;
        Ok(self.current())
    }
}

impl std::fmt::Debug for Project {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Project")
            .field("id", &self.id)
            .field("steps", &self.history.len())
            .field("current", &self.current)
            .finish_non_exhaustive()
    }
}

/// Oracle and prover as configured.
fn collaborators(config: &TutorConfig) -> (Arc<dyn ScoringOracle>, Arc<dyn Prover>) {
    let harness: Arc<dyn ScoringOracle> = Arc::new(HarnessOracle::new(config.oracle.clone()));
    let oracle: Arc<dyn ScoringOracle> = if config.oracle.memoize_losses {
        Arc::new(MemoizedOracle::new(harness))
    } else {
        harness
    };
    let prover = Arc::new(ModelSearchProver::new(
        config.prover.max_fresh_individuals,
        config.prover.max_atoms,
    ));
    (oracle, prover)
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;
    use std::sync::atomic::{AtomicBool, Ordering};

    use super::*;
    use crate::handler::{HandlerKind, HandlerResponse};
    use crate::handler::testing::{RECO, SOURCE};
    use crate::snapshot::SnapshotId;
    use crate::storage::{InMemorySnapshotStore, LibsqlSnapshotStore};
    use argtutor_evals::ReconstructionPhase;
    use argtutor_oracle::{NullOracle, ScriptedOracle};
    use async_trait::async_trait;

    async fn start(store: Arc<dyn SnapshotStore>) -> Project {
        Project::start(
            SOURCE,
            Arc::new(ScriptedOracle::new()),
            Arc::new(ModelSearchProver::default()),
            store,
        )
        .await
        .unwrap()
    }

    async fn started() -> Project {
        start(Arc::new(InMemorySnapshotStore::new())).await
    }

    /// Fails snapshot or score writes once switched on. Revisions go
    /// through the trait's default, scores first.
    #[derive(Default)]
    struct FlakyStore {
        inner: InMemorySnapshotStore,
        failing_snapshots: AtomicBool,
        failing_scores: AtomicBool,
    }

    fn disk_full() -> storage::Error {
        storage::Error::InvalidData("disk full".into())
    }

    #[async_trait]
    impl SnapshotStore for FlakyStore {
        async fn store_snapshot(&self, snapshot: &Snapshot) -> storage::Result<()> {
            if self.failing_snapshots.load(Ordering::SeqCst) {
                return Err(disk_full());
            }
            self.inner.store_snapshot(snapshot).await
        }

        async fn get_snapshot(
            &self,
            project_id: ProjectId,
            step: u64,
        ) -> storage::Result<Option<Snapshot>> {
            self.inner.get_snapshot(project_id, step).await
        }

        async fn get_latest(&self, project_id: ProjectId) -> storage::Result<Option<Snapshot>> {
            self.inner.get_latest(project_id).await
        }

        async fn store_scores(&self, snapshot: &Snapshot) -> storage::Result<()> {
            if self.failing_scores.load(Ordering::SeqCst) {
                return Err(disk_full());
            }
            self.inner.store_scores(snapshot).await
        }

        async fn get_scores(
            &self,
            snapshot_id: SnapshotId,
        ) -> storage::Result<Option<BTreeMap<String, f64>>> {
            self.inner.get_scores(snapshot_id).await
        }
    }

    // === Start ===

    #[tokio::test]
    async fn new_project_asks_for_cues() {
        let project = started().await;
        let snapshot = project.current();

        assert_eq!(snapshot.global_step, 0);
        assert_eq!(snapshot.aar.source_text, SOURCE);
        assert_eq!(snapshot.handler, Some(HandlerKind::NoCues));
        assert!(snapshot.feedback.starts_with("Let's build"));
        let fields: Vec<Field> = snapshot.options.iter().map(|o| o.field()).collect();
        assert_eq!(fields, Field::CUES.to_vec());
        assert_eq!(snapshot.scores.get("reconstruction_phase"), Some(&0.0));
    }

    #[tokio::test]
    async fn start_persists_first_snapshot() {
        let store = Arc::new(InMemorySnapshotStore::new());
        let project = start(store.clone()).await;

        let latest = store.get_latest(project.id()).await.unwrap().unwrap();
        assert_eq!(&latest, project.current());
        let scores = store.get_scores(latest.id).await.unwrap().unwrap();
        assert_eq!(scores, latest.scores);
    }

    // === Turns ===

    #[tokio::test]
    async fn turn_appends_revision() {
        let mut project = started().await;
        let snapshot = project
            .submit_turn("Peter calls his sister because he is lonely.", Field::Gist)
            .await
            .unwrap();

        assert_eq!(snapshot.global_step, 1);
        assert_eq!(snapshot.resumes_from_step, Some(0));
        assert_eq!(snapshot.handler, Some(HandlerKind::NoReconstruction));
        assert_eq!(
            snapshot.input,
            Some(UserInput::text(
                Field::Gist,
                "Peter calls his sister because he is lonely."
            ))
        );
        assert_eq!(project.history().len(), 2);
        assert!(project.history()[0].aar.gist.is_none());
    }

    #[tokio::test]
    async fn unchanged_input_is_a_noop_turn() {
        let mut project = started().await;
        let before = project.current().clone();

        let snapshot = project.submit_turn("   ", Field::Gist).await.unwrap();
        assert_eq!(snapshot, before);
        assert_eq!(project.history().len(), 1);
    }

    #[tokio::test]
    async fn mismatching_conclusion_gets_mismatch_handler() {
        let mut project = started().await;
        project.submit_turn(RECO, Field::ArgdownReconstruction).await.unwrap();
        let snapshot = project
            .submit_turn("Peter is happy.", Field::Conclusion)
            .await
            .unwrap();

        assert_eq!(snapshot.scores.get("ConclMatchesRecoScore"), Some(&0.0));
        assert_eq!(snapshot.handler, Some(HandlerKind::ConclusionMismatch));
    }

    #[tokio::test]
    async fn annotation_turn_grounds_reconstruction() {
        let mut project = started().await;
        project.submit_turn(RECO, Field::ArgdownReconstruction).await.unwrap();
        project
            .submit_turn("Peter calls his sister.", Field::Conclusion)
            .await
            .unwrap();
        assert_eq!(
            project.evaluator().reconstruction_phase(),
            ReconstructionPhase::Exegetic
        );

        let snapshot = project
            .submit_turn(
                "[Peter is lonely](1). So he calls his sister.",
                Field::Reasons,
            )
            .await
            .unwrap();
        assert!(matches!(
            snapshot.input,
            Some(UserInput::Annotation { .. })
        ));
        assert_eq!(snapshot.aar.reasons.len(), 1);
        assert_eq!(snapshot.aar.reasons[0].ref_reco, 1);
    }

    #[tokio::test]
    async fn invalid_input_leaves_history_alone() {
        let mut project = started().await;
        let err = project
            .submit_input(UserInput::annotation(Field::Gist, "[Peter](1)"))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::InvalidInput(_)));

        let err = project
            .submit_turn("Another text.", Field::SourceText)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::InvalidInput(_)));
        assert_eq!(project.history().len(), 1);
    }

    #[tokio::test]
    async fn storage_failure_fails_turn_without_snapshot() {
        let store = Arc::new(FlakyStore::default());
        let mut project = start(store.clone()).await;
        store.failing_snapshots.store(true, Ordering::SeqCst);

        let err = project.submit_turn("Peter calls.", Field::Gist).await.unwrap_err();
        assert!(matches!(err, Error::Storage(_)));
        assert_eq!(project.history().len(), 1);
        assert_eq!(project.current().global_step, 0);
        assert!(store.get_snapshot(project.id(), 1).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn failed_score_write_persists_nothing() {
        let store = Arc::new(FlakyStore::default());
        let mut project = start(store.clone()).await;
        store.failing_scores.store(true, Ordering::SeqCst);

        let err = project.submit_turn("Peter calls.", Field::Gist).await.unwrap_err();
        assert!(matches!(err, Error::Storage(_)));
        assert!(store.get_snapshot(project.id(), 1).await.unwrap().is_none());
        assert_eq!(store.inner.len().await, 1);

        store.failing_scores.store(false, Ordering::SeqCst);
        let snapshot = project.submit_turn("Peter calls.", Field::Gist).await.unwrap();
        assert_eq!(snapshot.global_step, 1);
        assert_eq!(store.inner.len().await, 2);
        let stored = store.get_snapshot(project.id(), 1).await.unwrap().unwrap();
        assert_eq!(stored.id, snapshot.id);
        assert_eq!(
            store.get_scores(snapshot.id).await.unwrap(),
            Some(snapshot.scores.clone())
        );
    }

    #[tokio::test]
    async fn failed_turn_on_libsql_leaves_steps_unique() {
        let store = Arc::new(LibsqlSnapshotStore::new_memory().await.unwrap());
        let mut project = start(store.clone()).await;
        project.submit_turn("Peter calls.", Field::Gist).await.unwrap();

        // a foreign snapshot squatting on the next step makes the turn fail
        let squatter = project.current().create_revision(
            2,
            project.current().aar.clone(),
            BTreeMap::new(),
            HandlerResponse {
                handler: HandlerKind::NoCues,
                feedback: String::new(),
                options: Vec::new(),
            },
            None,
        );
        store.store_snapshot(&squatter).await.unwrap();

        let err = project.submit_turn("Peter is lonely.", Field::Context).await.unwrap_err();
        assert!(matches!(
            err,
            Error::Storage(storage::Error::StepTaken { step: 2, .. })
        ));
        assert_eq!(project.history().len(), 2);
        let stored = store.get_snapshot(project.id(), 2).await.unwrap().unwrap();
        assert_eq!(stored.id, squatter.id);
    }

    #[tokio::test]
    async fn chain_without_answer_fails_turn() {
        let oracle: Arc<dyn ScoringOracle> = Arc::new(NullOracle);
        let evaluator = Evaluator::new(oracle.clone(), Arc::new(ModelSearchProver::default()));
        let chain = HandlerChain::new(vec![HandlerKind::NoCues], oracle);
        let mut project = Project::start_with(
            SOURCE,
            evaluator,
            chain,
            Arc::new(InMemorySnapshotStore::new()),
        )
        .await
        .unwrap();

        let err = project.submit_turn("Peter calls.", Field::Gist).await.unwrap_err();
        assert!(matches!(
            err,
            Error::ChainMisconfigured {
                phase: ReconstructionPhase::Base
            }
        ));
        assert_eq!(project.history().len(), 1);
    }

    // === Navigation ===

    #[tokio::test]
    async fn rewind_branches_from_earlier_step() {
        let mut project = started().await;
        project.submit_turn("Peter calls.", Field::Gist).await.unwrap();
        project.submit_turn("Peter is lonely.", Field::Context).await.unwrap();

        let rewound = project.rewind(1).await.unwrap();
        assert_eq!(rewound.global_step, 1);
        assert!(rewound.aar.context.is_none());

        let branch = project
            .submit_turn("Peter calls his sister.", Field::Conclusion)
            .await
            .unwrap();
        assert_eq!(branch.global_step, 3);
        assert_eq!(branch.resumes_from_step, Some(1));
        assert!(branch.aar.context.is_none());
        assert_eq!(project.history().len(), 4);
    }

    #[tokio::test]
    async fn rewind_to_unknown_step_fails() {
        let mut project = started().await;
        assert!(matches!(
            project.rewind(5).await,
            Err(Error::InvalidInput(_))
        ));
        assert_eq!(project.current().global_step, 0);
    }

    #[tokio::test]
    async fn toggling_updates_current_snapshot_in_place() {
        let store = Arc::new(InMemorySnapshotStore::new());
        let mut project = start(store.clone()).await;
        let id = project.current().id;

        let toggled = project.toggle_visible_option().await.unwrap();
        assert_eq!(toggled.visible_option, 1);
        assert_eq!(toggled.id, id);
        assert_eq!(project.history().len(), 1);

        let stored = store.get_snapshot(project.id(), 0).await.unwrap().unwrap();
        assert_eq!(stored.visible_option, 1);
    }

    #[tokio::test]
    async fn resume_restores_history() {
        let store: Arc<dyn SnapshotStore> = Arc::new(InMemorySnapshotStore::new());
        let mut project = start(store.clone()).await;
        project.submit_turn("Peter calls.", Field::Gist).await.unwrap();

        let resumed = Project::resume(
            project.id(),
            Arc::new(ScriptedOracle::new()),
            Arc::new(ModelSearchProver::default()),
            store,
        )
        .await
        .unwrap();
        assert_eq!(resumed.history(), project.history());
        assert_eq!(resumed.current().global_step, 1);
        assert_eq!(
            resumed.evaluator().aar().and_then(|a| a.gist.as_deref()),
            Some("Peter calls.")
        );
    }

    #[tokio::test]
    async fn resume_unknown_project_fails() {
        let err = Project::resume(
            ProjectId::new(),
            Arc::new(NullOracle),
            Arc::new(ModelSearchProver::default()),
            Arc::new(InMemorySnapshotStore::new()),
        )
        .await
        .unwrap_err();
        assert!(matches!(
            err,
            Error::Storage(storage::Error::SnapshotNotFound(_))
        ));
    }

    // === Configuration ===

    #[tokio::test]
    async fn from_default_config_runs_offline() {
        let mut project = Project::from_config(&TutorConfig::default(), SOURCE)
            .await
            .unwrap();
        assert_eq!(project.current().handler, Some(HandlerKind::NoCues));

        let snapshot = project.submit_turn("Peter calls.", Field::Gist).await.unwrap();
        assert_eq!(snapshot.handler, Some(HandlerKind::NoReconstruction));
    }
}
