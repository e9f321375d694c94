//! Graph model: nodes keyed by name, plus the start node.
//!
//! A workflow is a set of `Node`s stored under string keys. There are no
//! explicit edges: each node returns a `NodeResult` naming the next key, so
//! branches and loops are decided at run time against the shared state.

pub mod definition;
pub mod node;

pub use definition::GraphDefinition;
pub use node::{FnNode, Node, NodeResult};
