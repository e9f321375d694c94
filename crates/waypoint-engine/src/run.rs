use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Utc};
use tracing::debug;

use waypoint_core::types::{GraphRun, RunId, RunStatus, StateMap};

/// Append-only log of one run.
///
/// Cloning yields another handle to the same buffer, so lines appended by a
/// node are visible to readers of the run immediately.
#[derive(Clone)]
pub struct RunLog {
    run_id: RunId,
    lines: Arc<Mutex<Vec<String>>>,
}

impl RunLog {
    pub fn new(run_id: RunId) -> Self {
        Self {
            run_id,
            lines: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Append one line.
    pub fn append(&self, line: impl Into<String>) {
        let line = line.into();
        debug!(run_id = %self.run_id, line = %line, "Run log");
        self.guard().push(line);
    }

    /// Copy of all lines so far, oldest first.
    pub fn lines(&self) -> Vec<String> {
        self.guard().clone()
    }

    pub fn len(&self) -> usize {
        self.guard().len()
    }

    pub fn is_empty(&self) -> bool {
        self.guard().is_empty()
    }

    pub fn run_id(&self) -> &RunId {
        &self.run_id
    }

    fn guard(&self) -> MutexGuard<'_, Vec<String>> {
        self.lines.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl std::fmt::Debug for RunLog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RunLog")
            .field("run_id", &self.run_id)
            .field("lines", &self.len())
            .finish()
    }
}

struct RunProgress {
    state: StateMap,
    status: RunStatus,
    current_node: Option<String>,
    finished_at: Option<DateTime<Utc>>,
}

/// The engine's live record of one run.
///
/// Written only by the execution loop that owns the run; any number of
/// readers may take snapshots concurrently.
pub(crate) struct RunRecord {
    run_id: RunId,
    graph_id: String,
    started_at: DateTime<Utc>,
    log: RunLog,
    progress: Mutex<RunProgress>,
}

impl RunRecord {
    pub(crate) fn new(graph_id: impl Into<String>, state: StateMap) -> Self {
        let run_id = RunId::new();
        Self {
            log: RunLog::new(run_id.clone()),
            run_id,
            graph_id: graph_id.into(),
            started_at: Utc::now(),
            progress: Mutex::new(RunProgress {
                state,
                status: RunStatus::Pending,
                current_node: None,
                finished_at: None,
            }),
        }
    }

    pub(crate) fn run_id(&self) -> &RunId {
        &self.run_id
    }

    pub(crate) fn graph_id(&self) -> &str {
        &self.graph_id
    }

    pub(crate) fn log(&self) -> &RunLog {
        &self.log
    }

    pub(crate) fn set_status(&self, status: RunStatus) {
        let mut progress = self.guard();
        debug_assert!(!progress.status.is_terminal(), "terminal status is final");
        progress.status = status;
    }

    pub(crate) fn set_current_node(&self, node: Option<&str>) {
        self.guard().current_node = node.map(str::to_string);
    }

    /// Copy of the state as last published.
    pub(crate) fn state(&self) -> StateMap {
        self.guard().state.clone()
    }

    /// Publish the loop's working state so readers can observe progress.
    pub(crate) fn publish_state(&self, state: &StateMap) {
        self.guard().state = state.clone();
    }

    /// Record a terminal status with the final state.
    pub(crate) fn finish(&self, status: RunStatus, state: StateMap, clear_current: bool) {
        let mut progress = self.guard();
        debug_assert!(status.is_terminal());
        debug_assert!(!progress.status.is_terminal(), "run finished twice");
        progress.state = state;
        progress.status = status;
        progress.finished_at = Some(Utc::now());
        if clear_current {
            progress.current_node = None;
        }
    }

    pub(crate) fn snapshot(&self) -> GraphRun {
        // Read logs before taking the progress lock; the two are never held together.
        let logs = self.log.lines();
        let progress = self.guard();
        GraphRun {
            run_id: self.run_id.clone(),
            graph_id: self.graph_id.clone(),
            state: progress.state.clone(),
            logs,
            status: progress.status,
            current_node: progress.current_node.clone(),
            started_at: self.started_at,
            finished_at: progress.finished_at,
        }
    }

    fn guard(&self) -> MutexGuard<'_, RunProgress> {
        self.progress.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
