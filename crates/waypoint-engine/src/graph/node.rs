use futures::future::BoxFuture;

use waypoint_core::error::Result;
use waypoint_core::types::StateMap;
use waypoint_tools::ToolRegistry;

use crate::run::RunLog;

/// Transition returned by a node.
///
/// `next_node == None` (or an empty key) is the only normal termination signal.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NodeResult {
    /// Node to execute next.
    pub next_node: Option<String>,
    /// Appended to the run log after the node returns.
    pub message: Option<String>,
}

impl NodeResult {
    /// Continue with `node`.
    pub fn next(node: impl Into<String>) -> Self {
        Self {
            next_node: Some(node.into()),
            message: None,
        }
    }

    /// Terminate the run normally.
    pub fn end() -> Self {
        Self::default()
    }

    /// Attach a log message.
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }
}

/// A unit of work in a graph.
///
/// A node receives the run's state mutably for the duration of one invocation,
/// the tool registry, and a log sink bound to the run. It must not keep
/// references to any of them after returning.
pub trait Node: Send + Sync + 'static {
    fn run<'a>(
        &'a self,
        state: &'a mut StateMap,
        tools: &'a ToolRegistry,
        log: &'a RunLog,
    ) -> BoxFuture<'a, Result<NodeResult>>;
}

/// Adapts a closure into a [`Node`].
///
/// ```ignore
/// let node = FnNode::new(|state, _tools, log| {
///     Box::pin(async move {
///         state.insert("seen".into(), true.into());
///         log.append("marked");
///         Ok(NodeResult::end())
///     })
/// });
/// ```
pub struct FnNode<F> {
    f: F,
}

impl<F> FnNode<F>
where
    F: for<'a> Fn(&'a mut StateMap, &'a ToolRegistry, &'a RunLog) -> BoxFuture<'a, Result<NodeResult>>
        + Send
        + Sync
        + 'static,
{
    pub fn new(f: F) -> Self {
        Self { f }
    }
}

impl<F> Node for FnNode<F>
where
    F: for<'a> Fn(&'a mut StateMap, &'a ToolRegistry, &'a RunLog) -> BoxFuture<'a, Result<NodeResult>>
        + Send
        + Sync
        + 'static,
{
    fn run<'a>(
        &'a self,
        state: &'a mut StateMap,
        tools: &'a ToolRegistry,
        log: &'a RunLog,
    ) -> BoxFuture<'a, Result<NodeResult>> {
        (self.f)(state, tools, log)
    }
}
