use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use tracing::{info, warn};

use waypoint_core::error::WaypointError;
use waypoint_core::types::RunStatus;

use crate::protocol::{
    ErrorPayload, GraphCreateRequest, GraphCreateResponse, GraphRunRequest, GraphRunResult,
    GraphStateResponse, RunAcceptedResponse, ToolDescription,
};
use crate::state::AppState;

/// Handler error rendered as `{"detail": ...}` with a matching status code.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    detail: String,
}

impl From<WaypointError> for ApiError {
    fn from(e: WaypointError) -> Self {
        let status = match &e {
            WaypointError::GraphNotFound(_) | WaypointError::RunNotFound(_) => {
                StatusCode::NOT_FOUND
            }
            WaypointError::UnknownWorkflow(_) => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        Self {
            status,
            detail: e.to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(ErrorPayload { detail: self.detail })).into_response()
    }
}

// GET /api/health
pub async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

// GET /graph/workflows
pub async fn list_workflows(State(state): State<Arc<AppState>>) -> Json<serde_json::Value> {
    Json(serde_json::json!({ "workflows": state.catalog.names() }))
}

// GET /graph/tools
pub async fn list_tools(State(state): State<Arc<AppState>>) -> Json<serde_json::Value> {
    let registry = state.engine.tools();
    let tools: Vec<ToolDescription> = registry
        .list()
        .into_iter()
        .filter_map(|name| registry.try_get(name))
        .map(|tool| ToolDescription {
            name: tool.name().to_string(),
            description: tool.description().to_string(),
            input_schema: tool.input_schema(),
        })
        .collect();
    Json(serde_json::json!({ "tools": tools }))
}

// POST /graph/create
pub async fn create_graph(
    State(state): State<Arc<AppState>>,
    Json(body): Json<GraphCreateRequest>,
) -> Result<Json<GraphCreateResponse>, ApiError> {
    let graph = state
        .engine
        .register_workflow(&state.catalog, body.graph_id.as_str(), &body.workflow)?;
    info!(graph_id = %body.graph_id, workflow = %body.workflow, "Graph created");

    Ok(Json(GraphCreateResponse {
        start_node: graph.start_node().to_string(),
        available_nodes: graph.node_keys().into_iter().map(str::to_string).collect(),
        graph_id: body.graph_id,
    }))
}

// POST /graph/run
pub async fn run_graph(
    State(state): State<Arc<AppState>>,
    Json(body): Json<GraphRunRequest>,
) -> Result<Json<GraphRunResult>, ApiError> {
    let run = state
        .engine
        .run_graph(&body.graph_id, Some(body.initial_state))
        .await
        .map_err(|e| {
            warn!(graph_id = %body.graph_id, error = %e, "Run request failed");
            ApiError::from(e)
        })?;
    Ok(Json(run.into()))
}

// POST /graph/run/async
pub async fn run_graph_async(
    State(state): State<Arc<AppState>>,
    Json(body): Json<GraphRunRequest>,
) -> Result<(StatusCode, Json<RunAcceptedResponse>), ApiError> {
    let (run_id, _handle) = state
        .engine
        .spawn_run(&body.graph_id, Some(body.initial_state))?;
    Ok((
        StatusCode::ACCEPTED,
        Json(RunAcceptedResponse {
            run_id: run_id.0,
            graph_id: body.graph_id,
            status: RunStatus::Running,
        }),
    ))
}

// GET /graph/state/{run_id}
pub async fn get_run_state(
    State(state): State<Arc<AppState>>,
    Path(run_id): Path<String>,
) -> Result<Json<GraphStateResponse>, ApiError> {
    let run = state
        .engine
        .get_run(&run_id)
        .ok_or(WaypointError::RunNotFound(run_id))?;
    Ok(Json(run.into()))
}
