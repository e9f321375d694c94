use std::sync::Arc;

use waypoint_engine::{WorkflowCatalog, WorkflowEngine};

/// Shared application state for axum handlers.
pub struct AppState {
    pub engine: Arc<WorkflowEngine>,
    pub catalog: Arc<WorkflowCatalog>,
}

impl AppState {
    pub fn new(engine: Arc<WorkflowEngine>, catalog: Arc<WorkflowCatalog>) -> Self {
        Self { engine, catalog }
    }
}
