use std::collections::HashMap;
use std::sync::Arc;

use super::node::Node;

/// An immutable set of named nodes plus the node a run starts at.
///
/// `start_node` is not validated against `nodes`; a run of a graph whose start
/// node is missing halts on its first step.
#[derive(Clone)]
pub struct GraphDefinition {
    start_node: String,
    nodes: HashMap<String, Arc<dyn Node>>,
}

impl GraphDefinition {
    pub fn new(start_node: impl Into<String>) -> Self {
        Self {
            start_node: start_node.into(),
            nodes: HashMap::new(),
        }
    }

    /// Add a node under `key`, replacing any node with the same key.
    pub fn with_node(mut self, key: impl Into<String>, node: impl Node) -> Self {
        self.nodes.insert(key.into(), Arc::new(node));
        self
    }

    pub fn start_node(&self) -> &str {
        &self.start_node
    }

    pub fn node(&self, key: &str) -> Option<&Arc<dyn Node>> {
        self.nodes.get(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.nodes.contains_key(key)
    }

    /// Node keys, sorted.
    pub fn node_keys(&self) -> Vec<&str> {
        let mut keys: Vec<&str> = self.nodes.keys().map(|k| k.as_str()).collect();
        keys.sort_unstable();
        keys
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

impl std::fmt::Debug for GraphDefinition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GraphDefinition")
            .field("start_node", &self.start_node)
            .field("nodes", &self.node_keys())
            .finish()
    }
}
