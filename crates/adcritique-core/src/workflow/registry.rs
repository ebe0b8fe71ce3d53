//! Process-wide registry of live and recently finished runs.
//!
//! The outer map lock is held only to find or insert a slot; each run has its
//! own `RwLock`, so status polling on one run never waits on another. A slot
//! lives until its result is taken or until the TTL after termination runs
//! out.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use adcritique_state::RunId;
use tokio::sync::{watch, RwLock};
use tokio::time::Instant;

use crate::domain::{WorkflowError, WorkflowResult, WorkflowSnapshot, WorkflowState};
use crate::obs;

struct Tracked {
    state: WorkflowState,
    finished_at: Option<Instant>,
}

struct RunSlot {
    tracked: RwLock<Tracked>,
    cancel: watch::Sender<bool>,
}

pub struct RunRegistry {
    runs: RwLock<HashMap<RunId, Arc<RunSlot>>>,
    ttl: Duration,
}

impl RunRegistry {
    pub fn new(ttl: Duration) -> Self {
        Self {
            runs: RwLock::new(HashMap::new()),
            ttl,
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    async fn slot(&self, run_id: &RunId) -> WorkflowResult<Arc<RunSlot>> {
        self.runs
            .read()
            .await
            .get(run_id)
            .cloned()
            .ok_or_else(|| WorkflowError::RunNotFound(run_id.to_string()))
    }

    /// Add a new run. The receiver flips to `true` once the run is cancelled.
    ///
    /// # Errors
    ///
    /// Returns `WorkflowError::DuplicateRun` if the id is already registered.
    pub async fn register(&self, state: WorkflowState) -> WorkflowResult<watch::Receiver<bool>> {
        let mut runs = self.runs.write().await;
        if runs.contains_key(&state.run_id) {
            return Err(WorkflowError::DuplicateRun(state.run_id.to_string()));
        }
        let (cancel, cancelled) = watch::channel(false);
        let finished_at = state.is_terminal().then(Instant::now);
        runs.insert(
            state.run_id.clone(),
            Arc::new(RunSlot {
                tracked: RwLock::new(Tracked { state, finished_at }),
                cancel,
            }),
        );
        Ok(cancelled)
    }

    /// Store the latest state of a run.
    pub async fn update(&self, state: &WorkflowState) -> WorkflowResult<()> {
        let slot = self.slot(&state.run_id).await?;
        let mut tracked = slot.tracked.write().await;
        if tracked.finished_at.is_none() && state.is_terminal() {
            tracked.finished_at = Some(Instant::now());
        }
        tracked.state = state.clone();
        Ok(())
    }

    pub async fn snapshot(&self, run_id: &RunId) -> WorkflowResult<WorkflowSnapshot> {
        let slot = self.slot(run_id).await?;
        let tracked = slot.tracked.read().await;
        Ok(tracked.state.snapshot())
    }

    pub async fn state(&self, run_id: &RunId) -> WorkflowResult<WorkflowState> {
        let slot = self.slot(run_id).await?;
        let tracked = slot.tracked.read().await;
        Ok(tracked.state.clone())
    }

    /// Ask a run to stop at its next stage boundary.
    ///
    /// Returns `false` when the run has already finished.
    pub async fn cancel(&self, run_id: &RunId) -> WorkflowResult<bool> {
        let slot = self.slot(run_id).await?;
        if slot.tracked.read().await.state.is_terminal() {
            return Ok(false);
        }
        slot.cancel.send_replace(true);
        Ok(true)
    }

    /// Final state of a finished run, removing it from the registry.
    ///
    /// Returns `Ok(None)` while the run is still in progress.
    pub async fn take_result(&self, run_id: &RunId) -> WorkflowResult<Option<WorkflowState>> {
        let mut runs = self.runs.write().await;
        let slot = runs
            .get(run_id)
            .cloned()
            .ok_or_else(|| WorkflowError::RunNotFound(run_id.to_string()))?;
        let tracked = slot.tracked.read().await;
        if !tracked.state.is_terminal() {
            return Ok(None);
        }
        runs.remove(run_id);
        obs::emit_registry_evicted(run_id.as_str(), "retrieved");
        Ok(Some(tracked.state.clone()))
    }

    /// Drop finished runs older than the TTL. Returns how many were dropped.
    pub async fn evict_expired(&self) -> usize {
        let now = Instant::now();
        let mut runs = self.runs.write().await;
        let mut expired = Vec::new();
        for (run_id, slot) in runs.iter() {
            let tracked = slot.tracked.read().await;
            if tracked
                .finished_at
                .is_some_and(|at| now.duration_since(at) >= self.ttl)
            {
                expired.push(run_id.clone());
            }
        }
        for run_id in &expired {
            runs.remove(run_id);
            obs::emit_registry_evicted(run_id.as_str(), "ttl");
        }
        expired.len()
    }

    pub async fn len(&self) -> usize {
        self.runs.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.runs.read().await.is_empty()
    }
}

impl Default for RunRegistry {
    fn default() -> Self {
        Self::new(Duration::from_secs(3600))
    }
}
