//! In-memory run store with time-to-live retention.

use std::sync::Arc;
use std::time::Duration;

use ktomg_core::RunId;
use moka::future::Cache;
use tokio::sync::Mutex;

use super::run::RunState;

/// Upper bound on retained runs.
const MAX_RUNS: u64 = 10_000;

/// Shared handle to one run; the mutex serializes start/resume.
pub type RunHandle = Arc<Mutex<RunState>>;

/// Keyed store of runs.
///
/// Entries expire `retention` after insertion regardless of status, so a
/// suspended run that nobody approves eventually disappears and lookups
/// report it as unknown.
#[derive(Clone)]
pub struct RunStore {
    runs: Cache<RunId, RunHandle>,
    retention: Duration,
}

impl RunStore {
    /// Create a store that keeps runs for `retention`.
    #[must_use]
    pub fn new(retention: Duration) -> Self {
        let runs = Cache::builder()
            .max_capacity(MAX_RUNS)
            .time_to_live(retention)
            .build();
        Self { runs, retention }
    }

    /// Insert a run and return its shared handle.
    pub async fn insert(&self, run: RunState) -> RunHandle {
        let run_id = run.run_id;
        let handle = Arc::new(Mutex::new(run));
        self.runs.insert(run_id, Arc::clone(&handle)).await;
        handle
    }

    /// Handle for `run_id`, unless missing or expired.
    pub async fn get(&self, run_id: &RunId) -> Option<RunHandle> {
        self.runs.get(run_id).await
    }

    /// Copy of the current state of `run_id`.
    pub async fn snapshot(&self, run_id: &RunId) -> Option<RunState> {
        let handle = self.get(run_id).await?;
        let run = handle.lock().await;
        Some(run.clone())
    }

    /// Configured retention.
    #[must_use]
    pub const fn retention(&self) -> Duration {
        self.retention
    }

    /// Approximate number of retained runs.
    #[must_use]
    pub fn len(&self) -> u64 {
        self.runs.entry_count()
    }

    /// Whether the store is (approximately) empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl std::fmt::Debug for RunStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RunStore")
            .field("retention", &self.retention)
            .field("entries", &self.runs.entry_count())
            .finish()
    }
}
