use thiserror::Error;

#[derive(Debug, Error)]
pub enum WaypointError {
    // Graph / run errors
    #[error("Graph '{0}' is not registered.")]
    GraphNotFound(String),

    #[error("Run '{0}' not found.")]
    RunNotFound(String),

    // Node errors
    #[error("Node '{node}' failed: {message}")]
    NodeExecution { node: String, message: String },

    // Tool errors
    #[error("Tool '{0}' is not registered.")]
    ToolNotFound(String),

    #[error("Tool execution failed: {tool}: {message}")]
    ToolExecution { tool: String, message: String },

    #[error("Tool timeout after {timeout_secs}s: {tool}")]
    ToolTimeout { tool: String, timeout_secs: u64 },

    #[error("Tool input validation failed: {0}")]
    ToolValidation(String),

    // Workflow template errors
    #[error("Unknown workflow '{0}'.")]
    UnknownWorkflow(String),

    // Config errors
    #[error("Config error: {0}")]
    Config(String),

    #[error("Config file not found: {0}")]
    ConfigNotFound(String),

    // Gateway errors
    #[error("Gateway error: {0}")]
    Gateway(String),
}

impl WaypointError {
    /// Convenience constructor for failures raised inside a node.
    pub fn node(node: impl Into<String>, message: impl Into<String>) -> Self {
        Self::NodeExecution {
            node: node.into(),
            message: message.into(),
        }
    }

    /// Whether this error is a lookup miss (graph, run, or tool).
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            Self::GraphNotFound(_) | Self::RunNotFound(_) | Self::ToolNotFound(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, WaypointError>;
