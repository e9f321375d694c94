use futures::future::BoxFuture;

use crate::error::Result;

/// Tool: a named utility that workflow nodes may look up and call.
///
/// Input and output are free-form JSON; the engine never inspects them.
pub trait Tool: Send + Sync + 'static {
    /// Registry key.
    fn name(&self) -> &str;

    /// Human-readable description.
    fn description(&self) -> &str;

    /// JSON Schema for tool input.
    fn input_schema(&self) -> serde_json::Value;

    /// Execute the tool with the given input.
    fn execute(&self, input: serde_json::Value) -> BoxFuture<'_, Result<serde_json::Value>>;

    /// Timeout in seconds for this tool (`None` = registry default).
    fn timeout_secs(&self) -> Option<u64> {
        None
    }
}
