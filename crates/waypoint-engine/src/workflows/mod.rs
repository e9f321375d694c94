//! Workflow templates: named builders that produce a `GraphDefinition`.

pub mod code_review;

use std::collections::BTreeMap;

use waypoint_core::error::{Result, WaypointError};

use crate::graph::GraphDefinition;

/// Builds a fresh graph for one template.
pub type WorkflowBuilder = fn() -> GraphDefinition;

/// Catalog of workflow templates, keyed by name.
#[derive(Clone, Default)]
pub struct WorkflowCatalog {
    builders: BTreeMap<String, WorkflowBuilder>,
}

impl WorkflowCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Catalog with all built-in templates.
    pub fn with_builtins() -> Self {
        let mut catalog = Self::new();
        catalog.register(code_review::WORKFLOW_NAME, code_review::build);
        catalog
    }

    pub fn register(&mut self, name: impl Into<String>, builder: WorkflowBuilder) {
        self.builders.insert(name.into(), builder);
    }

    pub fn contains(&self, name: &str) -> bool {
        self.builders.contains_key(name)
    }

    /// Build a new graph from the named template.
    pub fn build(&self, name: &str) -> Result<GraphDefinition> {
        self.builders
            .get(name)
            .map(|builder| builder())
            .ok_or_else(|| WaypointError::UnknownWorkflow(name.to_string()))
    }

    /// Template names, sorted.
    pub fn names(&self) -> Vec<&str> {
        self.builders.keys().map(|k| k.as_str()).collect()
    }
}
