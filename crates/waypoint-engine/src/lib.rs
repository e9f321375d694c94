pub mod engine;
pub mod graph;
pub mod run;
pub mod workflows;

pub use engine::WorkflowEngine;
pub use graph::{FnNode, GraphDefinition, Node, NodeResult};
pub use run::RunLog;
pub use workflows::{WorkflowBuilder, WorkflowCatalog};
