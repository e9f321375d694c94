use serde::{Deserialize, Serialize};

use waypoint_core::types::{GraphRun, RunStatus, StateMap};

fn default_workflow() -> String {
    "code_review".to_string()
}

/// POST /graph/create body.
#[derive(Debug, Serialize, Deserialize)]
pub struct GraphCreateRequest {
    pub graph_id: String,
    #[serde(default = "default_workflow")]
    pub workflow: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct GraphCreateResponse {
    pub graph_id: String,
    pub start_node: String,
    pub available_nodes: Vec<String>,
}

/// POST /graph/run and /graph/run/async body.
#[derive(Debug, Serialize, Deserialize)]
pub struct GraphRunRequest {
    pub graph_id: String,
    #[serde(default)]
    pub initial_state: StateMap,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct GraphRunResult {
    pub run_id: String,
    pub graph_id: String,
    pub final_state: StateMap,
    pub logs: Vec<String>,
    pub status: RunStatus,
}

impl From<GraphRun> for GraphRunResult {
    fn from(run: GraphRun) -> Self {
        Self {
            run_id: run.run_id.0,
            graph_id: run.graph_id,
            final_state: run.state,
            logs: run.logs,
            status: run.status,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RunAcceptedResponse {
    pub run_id: String,
    pub graph_id: String,
    pub status: RunStatus,
}

/// GET /graph/state/{run_id} response.
#[derive(Debug, Serialize, Deserialize)]
pub struct GraphStateResponse {
    pub run_id: String,
    pub graph_id: String,
    pub state: StateMap,
    pub logs: Vec<String>,
    pub status: RunStatus,
    pub current_node: Option<String>,
}

impl From<GraphRun> for GraphStateResponse {
    fn from(run: GraphRun) -> Self {
        Self {
            run_id: run.run_id.0,
            graph_id: run.graph_id,
            state: run.state,
            logs: run.logs,
            status: run.status,
            current_node: run.current_node,
        }
    }
}

/// One entry of GET /graph/tools.
#[derive(Debug, Serialize, Deserialize)]
pub struct ToolDescription {
    pub name: String,
    pub description: String,
    pub input_schema: serde_json::Value,
}

/// Error body returned with every non-2xx response.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorPayload {
    pub detail: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_request_defaults_workflow() {
        let req: GraphCreateRequest = serde_json::from_str(r#"{"graph_id": "g1"}"#).unwrap();
        assert_eq!(req.workflow, "code_review");
    }

    #[test]
    fn test_run_request_defaults_state() {
        let req: GraphRunRequest = serde_json::from_str(r#"{"graph_id": "g1"}"#).unwrap();
        assert!(req.initial_state.is_empty());
    }

    #[test]
    fn test_run_request_rejects_non_object_state() {
        let parsed: Result<GraphRunRequest, _> =
            serde_json::from_str(r#"{"graph_id": "g1", "initial_state": [1, 2]}"#);
        assert!(parsed.is_err());
    }

    #[test]
    fn test_state_response_serializes_null_current_node() {
        let resp = GraphStateResponse {
            run_id: "r".into(),
            graph_id: "g".into(),
            state: StateMap::new(),
            logs: vec![],
            status: RunStatus::Completed,
            current_node: None,
        };
        let json = serde_json::to_value(&resp).unwrap();
        assert_eq!(json["status"], "completed");
        assert!(json["current_node"].is_null());
    }
}
