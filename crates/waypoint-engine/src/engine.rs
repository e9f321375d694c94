use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use waypoint_core::error::{Result, WaypointError};
use waypoint_core::types::{GraphRun, RunId, RunStatus, StateMap};
use waypoint_tools::ToolRegistry;

use crate::graph::GraphDefinition;
use crate::run::RunRecord;
use crate::workflows::WorkflowCatalog;

/// Failure reason logged for a run whose loop stopped without finishing.
const ABANDONED: &str = "execution was abandoned before completion";

/// In-memory workflow engine.
///
/// Holds the graph table and the run table. Graphs are shared read-only by
/// every run that executes them; each run record has a single writer, the
/// execution loop driving it. Runs execute their nodes strictly one at a time;
/// distinct runs may proceed concurrently.
pub struct WorkflowEngine {
    graphs: RwLock<HashMap<String, Arc<GraphDefinition>>>,
    runs: RwLock<HashMap<String, Arc<RunRecord>>>,
    tools: Arc<ToolRegistry>,
}

impl WorkflowEngine {
    pub fn new(tools: Arc<ToolRegistry>) -> Self {
        Self {
            graphs: RwLock::new(HashMap::new()),
            runs: RwLock::new(HashMap::new()),
            tools,
        }
    }

    pub fn tools(&self) -> &Arc<ToolRegistry> {
        &self.tools
    }

    /// Insert or replace a graph. No validation of node keys is performed.
    pub fn register_graph(
        &self,
        graph_id: impl Into<String>,
        graph: GraphDefinition,
    ) -> Arc<GraphDefinition> {
        let graph_id = graph_id.into();
        let graph = Arc::new(graph);
        debug!(graph_id = %graph_id, nodes = graph.len(), "Registering graph");
        self.graphs
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(graph_id, Arc::clone(&graph));
        graph
    }

    /// Build `workflow` from the catalog and register it as `graph_id`.
    pub fn register_workflow(
        &self,
        catalog: &WorkflowCatalog,
        graph_id: impl Into<String>,
        workflow: &str,
    ) -> Result<Arc<GraphDefinition>> {
        let graph = catalog.build(workflow)?;
        Ok(self.register_graph(graph_id, graph))
    }

    pub fn has_graph(&self, graph_id: &str) -> bool {
        self.graphs
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(graph_id)
    }

    pub fn graph(&self, graph_id: &str) -> Option<Arc<GraphDefinition>> {
        self.graphs
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(graph_id)
            .cloned()
    }

    /// Snapshot of a run, in flight or finished.
    pub fn get_run(&self, run_id: &str) -> Option<GraphRun> {
        self.runs
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(run_id)
            .map(|record| record.snapshot())
    }

    /// Number of runs recorded since the engine was created.
    pub fn run_count(&self) -> usize {
        self.runs.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    /// Run a registered graph to completion or failure.
    ///
    /// Fails with `GraphNotFound` before any run is recorded when `graph_id`
    /// is unknown. A node error marks the run failed and is returned as is.
    pub async fn run_graph(
        &self,
        graph_id: &str,
        initial_state: Option<StateMap>,
    ) -> Result<GraphRun> {
        let (graph, record) = self.start_run(graph_id, initial_state)?;
        self.drive(&graph, &record).await
    }

    /// Start a run on a background task and return its id immediately.
    ///
    /// The graph lookup and run registration happen before this returns, so
    /// `get_run` can observe the run right away.
    pub fn spawn_run(
        self: &Arc<Self>,
        graph_id: &str,
        initial_state: Option<StateMap>,
    ) -> Result<(RunId, JoinHandle<Result<GraphRun>>)> {
        let (graph, record) = self.start_run(graph_id, initial_state)?;
        let run_id = record.run_id().clone();
        let engine = Arc::clone(self);
        let handle = tokio::spawn(async move { engine.drive(&graph, &record).await });
        Ok((run_id, handle))
    }

    fn start_run(
        &self,
        graph_id: &str,
        initial_state: Option<StateMap>,
    ) -> Result<(Arc<GraphDefinition>, Arc<RunRecord>)> {
        let graph = self
            .graph(graph_id)
            .ok_or_else(|| WaypointError::GraphNotFound(graph_id.to_string()))?;

        let record = Arc::new(RunRecord::new(graph_id, initial_state.unwrap_or_default()));
        record.set_status(RunStatus::Running);
        self.runs
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(record.run_id().to_string(), Arc::clone(&record));

        info!(run_id = %record.run_id(), graph_id, "Run started");
        Ok((graph, record))
    }

    async fn drive(&self, graph: &GraphDefinition, record: &RunRecord) -> Result<GraphRun> {
        let log = record.log();
        let run_id = record.run_id();
        let mut run = RunGuard::new(record);
        let mut current = Some(graph.start_node().to_string());

        while let Some(key) = current.take().filter(|k| !k.is_empty()) {
            record.set_current_node(Some(&key));

            let Some(node) = graph.node(&key) else {
                warn!(run_id = %run_id, node = %key, "Node not found, halting run");
                log.append(format!("Node '{}' not found; halting run.", key));
                break;
            };

            log.append(format!("Executing node '{}'", key));
            debug!(run_id = %run_id, node = %key, "Dispatching node");

            match node.run(&mut run.state, &self.tools, log).await {
                Ok(result) => {
                    current = result.next_node;
                    // The final state is moved into the record by `finish`.
                    if current.is_some() {
                        record.publish_state(&run.state);
                    }
                    if let Some(message) = result.message.filter(|m| !m.is_empty()) {
                        log.append(message);
                    }
                }
                Err(e) => {
                    error!(run_id = %run_id, node = %key, error = %e, "Node failed");
                    log.append(format!("Run failed: {}", e));
                    run.finish(RunStatus::Failed);
                    return Err(e);
                }
            }
        }

        log.append("Run completed.");
        run.finish(RunStatus::Completed);
        info!(
            run_id = %run_id,
            graph_id = record.graph_id(),
            log_lines = log.len(),
            "Run completed"
        );
        Ok(record.snapshot())
    }
}

/// Working state of one run, owned by the execution loop.
///
/// If the loop is abandoned before reaching a terminal status (its future is
/// dropped, or a node panics) the guard fails the run on drop, keeping the
/// state as it was at that point.
struct RunGuard<'a> {
    record: &'a RunRecord,
    state: StateMap,
    finished: bool,
}

impl<'a> RunGuard<'a> {
    fn new(record: &'a RunRecord) -> Self {
        Self {
            state: record.state(),
            record,
            finished: false,
        }
    }

    fn finish(&mut self, status: RunStatus) {
        self.finished = true;
        // A failed run keeps pointing at the node that failed.
        let clear_current = status == RunStatus::Completed;
        self.record
            .finish(status, std::mem::take(&mut self.state), clear_current);
    }
}

impl Drop for RunGuard<'_> {
    fn drop(&mut self) {
        if self.finished {
            return;
        }
        warn!(run_id = %self.record.run_id(), "Run abandoned before completion");
        self.record
            .log()
            .append(format!("Run failed: {}", ABANDONED));
        self.finish(RunStatus::Failed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{FnNode, Node, NodeResult};
    use serde_json::json;

    fn step(next: Option<&'static str>, message: &'static str) -> impl Node {
        FnNode::new(move |_state, _tools, _log| {
            Box::pin(async move {
                Ok(NodeResult {
                    next_node: next.map(str::to_string),
                    message: Some(message.to_string()),
                })
            })
        })
    }

    fn failing(message: &'static str) -> impl Node {
        FnNode::new(move |_state, _tools, _log| {
            Box::pin(async move { Err(WaypointError::node("B", message)) })
        })
    }

    fn engine() -> WorkflowEngine {
        WorkflowEngine::new(Arc::new(ToolRegistry::new()))
    }

    fn a_to_b() -> GraphDefinition {
        GraphDefinition::new("A")
            .with_node("A", step(Some("B"), "did A"))
            .with_node("B", step(None, "did B"))
    }

    #[test]
    fn test_register_and_has_graph() {
        let engine = engine();
        assert!(!engine.has_graph("g"));
        let stored = engine.register_graph("g", a_to_b());
        assert_eq!(stored.start_node(), "A");
        assert!(engine.has_graph("g"));

        // Re-registering replaces.
        engine.register_graph("g", GraphDefinition::new("B"));
        assert_eq!(engine.graph("g").unwrap().start_node(), "B");
    }

    #[tokio::test]
    async fn test_two_step_scenario() {
        let engine = engine();
        engine.register_graph("g", a_to_b());

        let run = engine.run_graph("g", Some(StateMap::new())).await.unwrap();
        assert_eq!(run.status, RunStatus::Completed);
        assert!(run.current_node.is_none());
        assert!(run.state.is_empty());
        assert_eq!(
            run.logs,
            vec![
                "Executing node 'A'",
                "did A",
                "Executing node 'B'",
                "did B",
                "Run completed.",
            ]
        );
        assert!(run.finished_at.is_some());

        let stored = engine.get_run(run.run_id.as_str()).unwrap();
        assert_eq!(stored.logs, run.logs);
        assert_eq!(stored.status, RunStatus::Completed);
    }

    #[tokio::test]
    async fn test_node_failure_marks_run_failed() {
        let engine = engine();
        engine.register_graph(
            "g",
            GraphDefinition::new("A")
                .with_node("A", step(Some("B"), "did A"))
                .with_node("B", failing("boom")),
        );

        let err = engine.run_graph("g", None).await.unwrap_err();
        assert!(matches!(err, WaypointError::NodeExecution { ref message, .. } if message == "boom"));

        assert_eq!(engine.run_count(), 1);
        let run_id = engine.runs.read().unwrap().keys().next().cloned().unwrap();
        let run = engine.get_run(&run_id).unwrap();
        assert_eq!(run.status, RunStatus::Failed);
        assert_eq!(run.current_node.as_deref(), Some("B"));
        assert_eq!(
            run.logs.last().map(String::as_str),
            Some("Run failed: Node 'B' failed: boom")
        );
        assert!(!run.logs.iter().any(|l| l == "Run completed."));
    }

    #[tokio::test]
    async fn test_unregistered_graph_creates_no_run() {
        let engine = engine();
        let err = engine.run_graph("missing", None).await.unwrap_err();
        assert!(matches!(err, WaypointError::GraphNotFound(ref id) if id == "missing"));
        assert_eq!(engine.run_count(), 0);
    }

    #[tokio::test]
    async fn test_missing_start_node_completes() {
        let engine = engine();
        engine.register_graph("g", GraphDefinition::new("ghost").with_node("A", failing("never")));

        let run = engine.run_graph("g", None).await.unwrap();
        assert_eq!(run.status, RunStatus::Completed);
        assert_eq!(
            run.logs,
            vec!["Node 'ghost' not found; halting run.", "Run completed."]
        );
    }

    #[tokio::test]
    async fn test_missing_next_node_halts_normally() {
        let engine = engine();
        engine.register_graph(
            "g",
            GraphDefinition::new("A").with_node("A", step(Some("nowhere"), "did A")),
        );

        let run = engine.run_graph("g", None).await.unwrap();
        assert_eq!(run.status, RunStatus::Completed);
        assert_eq!(
            run.logs,
            vec![
                "Executing node 'A'",
                "did A",
                "Node 'nowhere' not found; halting run.",
                "Run completed.",
            ]
        );
    }

    #[tokio::test]
    async fn test_empty_next_node_terminates() {
        let engine = engine();
        engine.register_graph(
            "g",
            GraphDefinition::new("A").with_node(
                "A",
                FnNode::new(|_s, _t, _l| {
                    Box::pin(async { Ok(NodeResult::next("").with_message("")) })
                }),
            ),
        );

        let run = engine.run_graph("g", None).await.unwrap();
        // Empty messages are not logged.
        assert_eq!(run.logs, vec!["Executing node 'A'", "Run completed."]);
    }

    #[tokio::test]
    async fn test_self_loop_with_state_counter() {
        let engine = engine();
        engine.register_graph(
            "loop",
            GraphDefinition::new("tick").with_node(
                "tick",
                FnNode::new(|state, _tools, log| {
                    Box::pin(async move {
                        let n = state.get("n").and_then(|v| v.as_u64()).unwrap_or(0) + 1;
                        state.insert("n".into(), json!(n));
                        log.append(format!("tick {}", n));
                        if n < 5 {
                            Ok(NodeResult::next("tick"))
                        } else {
                            Ok(NodeResult::end())
                        }
                    })
                }),
            ),
        );

        let mut initial = StateMap::new();
        initial.insert("keep".into(), json!("me"));
        let run = engine.run_graph("loop", Some(initial)).await.unwrap();

        assert_eq!(run.state.get("n"), Some(&json!(5)));
        assert_eq!(run.state.get("keep"), Some(&json!("me")));
        let executing = run.logs.iter().filter(|l| *l == "Executing node 'tick'").count();
        assert_eq!(executing, 5);
        // Each tick line follows its executing line.
        assert_eq!(run.logs[0], "Executing node 'tick'");
        assert_eq!(run.logs[1], "tick 1");
    }

    #[tokio::test]
    async fn test_runs_are_independent() {
        let engine = engine();
        engine.register_graph("g", a_to_b());

        let a = engine.run_graph("g", None).await.unwrap();
        let b = engine.run_graph("g", None).await.unwrap();
        assert_ne!(a.run_id, b.run_id);
        assert_eq!(engine.run_count(), 2);
        assert!(engine.get_run("unknown").is_none());
    }

    #[tokio::test]
    async fn test_spawn_run_is_observable() {
        let engine = Arc::new(engine());
        engine.register_graph("g", a_to_b());

        let (run_id, handle) = engine.spawn_run("g", None).unwrap();
        assert!(engine.get_run(run_id.as_str()).is_some());

        let run = handle.await.unwrap().unwrap();
        assert_eq!(run.run_id, run_id);
        assert_eq!(
            engine.get_run(run_id.as_str()).unwrap().status,
            RunStatus::Completed
        );

        assert!(engine.spawn_run("missing", None).is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_dropped_run_future_fails_the_run() {
        let engine = engine();
        engine.register_graph(
            "slow",
            GraphDefinition::new("nap").with_node(
                "nap",
                FnNode::new(|state, _tools, _log| {
                    Box::pin(async move {
                        state.insert("dozing".into(), json!(true));
                        tokio::time::sleep(std::time::Duration::from_secs(10)).await;
                        Ok(NodeResult::end())
                    })
                }),
            ),
        );

        let outcome = tokio::time::timeout(
            std::time::Duration::from_secs(1),
            engine.run_graph("slow", None),
        )
        .await;
        assert!(outcome.is_err());
        tokio::time::advance(std::time::Duration::from_secs(3600)).await;

        let run_id = engine.runs.read().unwrap().keys().next().cloned().unwrap();
        let run = engine.get_run(&run_id).unwrap();
        assert_eq!(run.status, RunStatus::Failed);
        assert_eq!(run.current_node.as_deref(), Some("nap"));
        assert_eq!(run.state.get("dozing"), Some(&json!(true)));
        assert!(run.finished_at.is_some());
        assert_eq!(
            run.logs,
            vec![
                "Executing node 'nap'".to_string(),
                format!("Run failed: {}", ABANDONED),
            ]
        );
    }
}
