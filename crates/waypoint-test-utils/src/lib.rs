//! Scripted nodes and engine fixtures for tests.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use futures::future::BoxFuture;
use serde_json::Value;

use waypoint_core::error::{Result, WaypointError};
use waypoint_core::types::StateMap;
use waypoint_engine::{GraphDefinition, Node, NodeResult, RunLog, WorkflowEngine};
use waypoint_tools::ToolRegistry;

/// Returns a fixed transition and counts its invocations.
pub struct ScriptedNode {
    result: NodeResult,
    calls: Arc<AtomicUsize>,
}

impl ScriptedNode {
    pub fn new(next: Option<&str>, message: Option<&str>) -> Self {
        Self {
            result: NodeResult {
                next_node: next.map(str::to_string),
                message: message.map(str::to_string),
            },
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Shared invocation counter; clone before handing the node to a graph.
    pub fn calls(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.calls)
    }
}

impl Node for ScriptedNode {
    fn run<'a>(
        &'a self,
        _state: &'a mut StateMap,
        _tools: &'a ToolRegistry,
        _log: &'a RunLog,
    ) -> BoxFuture<'a, Result<NodeResult>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let result = self.result.clone();
        Box::pin(async move { Ok(result) })
    }
}

/// Always fails with `NodeExecution`, optionally after writing one key.
pub struct FailingNode {
    name: String,
    message: String,
    write: Option<(String, Value)>,
}

impl FailingNode {
    pub fn new(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            message: message.into(),
            write: None,
        }
    }

    /// Write `key` into the state before failing.
    pub fn after_writing(mut self, key: impl Into<String>, value: Value) -> Self {
        self.write = Some((key.into(), value));
        self
    }
}

impl Node for FailingNode {
    fn run<'a>(
        &'a self,
        state: &'a mut StateMap,
        _tools: &'a ToolRegistry,
        _log: &'a RunLog,
    ) -> BoxFuture<'a, Result<NodeResult>> {
        Box::pin(async move {
            if let Some((key, value)) = &self.write {
                state.insert(key.clone(), value.clone());
            }
            Err(WaypointError::node(&self.name, &self.message))
        })
    }
}

/// Logs a line, then panics by reading past the end of an empty script.
pub struct PanickingNode;

impl Node for PanickingNode {
    fn run<'a>(
        &'a self,
        _state: &'a mut StateMap,
        _tools: &'a ToolRegistry,
        log: &'a RunLog,
    ) -> BoxFuture<'a, Result<NodeResult>> {
        Box::pin(async move {
            log.append("about to panic");
            let script: Vec<NodeResult> = Vec::new();
            Ok(script[0].clone())
        })
    }
}

/// Writes one key, logs a line, then transitions.
pub struct SetKeyNode {
    key: String,
    value: Value,
    next: Option<String>,
}

impl SetKeyNode {
    pub fn new(key: impl Into<String>, value: Value, next: Option<&str>) -> Self {
        Self {
            key: key.into(),
            value,
            next: next.map(str::to_string),
        }
    }
}

impl Node for SetKeyNode {
    fn run<'a>(
        &'a self,
        state: &'a mut StateMap,
        _tools: &'a ToolRegistry,
        log: &'a RunLog,
    ) -> BoxFuture<'a, Result<NodeResult>> {
        Box::pin(async move {
            state.insert(self.key.clone(), self.value.clone());
            log.append(format!("set {}", self.key));
            Ok(NodeResult {
                next_node: self.next.clone(),
                message: Some(format!("{} written", self.key)),
            })
        })
    }
}

/// Increments `counter` in state and loops to itself until it reaches `limit`.
pub struct CountingLoopNode {
    key: String,
    limit: u64,
}

impl CountingLoopNode {
    pub fn new(key: impl Into<String>, limit: u64) -> Self {
        Self {
            key: key.into(),
            limit,
        }
    }
}

impl Node for CountingLoopNode {
    fn run<'a>(
        &'a self,
        state: &'a mut StateMap,
        _tools: &'a ToolRegistry,
        _log: &'a RunLog,
    ) -> BoxFuture<'a, Result<NodeResult>> {
        Box::pin(async move {
            let n = state.get("counter").and_then(Value::as_u64).unwrap_or(0) + 1;
            state.insert("counter".into(), Value::from(n));
            if n < self.limit {
                Ok(NodeResult::next(self.key.clone()))
            } else {
                Ok(NodeResult::end().with_message(format!("counted to {}", n)))
            }
        })
    }
}

/// Logs a line, then sleeps before transitioning. Lets tests observe in-flight runs.
pub struct SleepyNode {
    delay: Duration,
    next: Option<String>,
}

impl SleepyNode {
    pub fn new(delay: Duration, next: Option<&str>) -> Self {
        Self {
            delay,
            next: next.map(str::to_string),
        }
    }
}

impl Node for SleepyNode {
    fn run<'a>(
        &'a self,
        _state: &'a mut StateMap,
        _tools: &'a ToolRegistry,
        log: &'a RunLog,
    ) -> BoxFuture<'a, Result<NodeResult>> {
        Box::pin(async move {
            log.append("sleeping");
            tokio::time::sleep(self.delay).await;
            Ok(NodeResult {
                next_node: self.next.clone(),
                message: None,
            })
        })
    }
}

/// Engine with the built-in tools.
pub fn engine() -> WorkflowEngine {
    WorkflowEngine::new(Arc::new(ToolRegistry::with_builtins()))
}

/// `A → B` graph where A says "did A" and B says "did B".
pub fn two_step_graph() -> GraphDefinition {
    GraphDefinition::new("A")
        .with_node("A", ScriptedNode::new(Some("B"), Some("did A")))
        .with_node("B", ScriptedNode::new(None, Some("did B")))
}

/// Same as [`two_step_graph`] but B fails with `message`.
pub fn failing_two_step_graph(message: &str) -> GraphDefinition {
    GraphDefinition::new("A")
        .with_node("A", ScriptedNode::new(Some("B"), Some("did A")))
        .with_node("B", FailingNode::new("B", message))
}

/// Build a state map from a JSON object literal.
pub fn state(value: Value) -> StateMap {
    match value {
        Value::Object(map) => map,
        other => panic!("state fixture must be a JSON object, got {}", other),
    }
}
