use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tracing::debug;

use waypoint_core::error::{Result, WaypointError};
use waypoint_core::traits::Tool;

const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Registry of tools that workflow nodes may call by name.
pub struct ToolRegistry {
    tools: HashMap<String, Arc<dyn Tool>>,
    default_timeout_secs: u64,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self {
            tools: HashMap::new(),
            default_timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }

    /// Set the timeout used for tools that do not declare one.
    pub fn with_default_timeout(mut self, secs: u64) -> Self {
        self.default_timeout_secs = secs;
        self
    }

    /// Register a tool, replacing any tool with the same name.
    pub fn register(&mut self, tool: impl Tool) {
        let name = tool.name().to_string();
        self.tools.insert(name, Arc::new(tool));
    }

    /// Strict lookup: errors when the name is unregistered.
    pub fn get(&self, name: &str) -> Result<Arc<dyn Tool>> {
        self.try_get(name)
            .ok_or_else(|| WaypointError::ToolNotFound(name.to_string()))
    }

    /// Non-strict lookup.
    pub fn try_get(&self, name: &str) -> Option<Arc<dyn Tool>> {
        self.tools.get(name).cloned()
    }

    /// Registered tool names, sorted.
    pub fn list(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.tools.keys().map(|s| s.as_str()).collect();
        names.sort_unstable();
        names
    }

    /// Execute a tool by name.
    pub async fn execute(&self, name: &str, input: serde_json::Value) -> Result<serde_json::Value> {
        let tool = self.get(name)?;
        let timeout_secs = tool.timeout_secs().unwrap_or(self.default_timeout_secs);

        debug!(tool = name, timeout_secs, "Executing tool");
        match tokio::time::timeout(Duration::from_secs(timeout_secs), tool.execute(input)).await {
            Ok(result) => result,
            Err(_) => Err(WaypointError::ToolTimeout {
                tool: name.to_string(),
                timeout_secs,
            }),
        }
    }

    /// Create a registry with all built-in tools registered.
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();

        // ── Code analysis (3) ───────────────────────────────────
        registry.register(crate::builtin::code::DetectSmellsTool);
        registry.register(crate::builtin::code::LengthComplexityTool);
        registry.register(crate::builtin::code::CodeOutlineTool);

        registry
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}
