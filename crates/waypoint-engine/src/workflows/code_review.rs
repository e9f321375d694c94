//! Code review workflow.
//!
//! `extract_functions → check_complexity → detect_issues → suggest_improvements`,
//! where `suggest_improvements` loops on itself, turning one open issue into a
//! suggestion per pass, until the quality score reaches the threshold or no
//! issues remain.
//!
//! State keys read: `code` (string), `threshold` (number, default 7.0).
//! State keys written: `functions`, `complexity`, `issues`, `suggestions`,
//! `iterations`, `quality_score`.

use futures::future::BoxFuture;
use serde_json::{json, Value};

use waypoint_core::error::{Result, WaypointError};
use waypoint_core::types::StateMap;
use waypoint_tools::ToolRegistry;

use crate::graph::{GraphDefinition, Node, NodeResult};
use crate::run::RunLog;

pub const WORKFLOW_NAME: &str = "code_review";

pub const EXTRACT_FUNCTIONS: &str = "extract_functions";
pub const CHECK_COMPLEXITY: &str = "check_complexity";
pub const DETECT_ISSUES: &str = "detect_issues";
pub const SUGGEST_IMPROVEMENTS: &str = "suggest_improvements";

const DEFAULT_THRESHOLD: f64 = 7.0;

pub fn build() -> GraphDefinition {
    GraphDefinition::new(EXTRACT_FUNCTIONS)
        .with_node(EXTRACT_FUNCTIONS, ExtractFunctions)
        .with_node(CHECK_COMPLEXITY, CheckComplexity)
        .with_node(DETECT_ISSUES, DetectIssues)
        .with_node(SUGGEST_IMPROVEMENTS, SuggestImprovements)
}

fn code_input(state: &StateMap) -> Value {
    let code = state.get("code").and_then(Value::as_str).unwrap_or_default();
    json!({ "code": code })
}

/// Reject tool output that does not have the shape the workflow relies on.
fn expect_output(
    tool: &str,
    value: Value,
    ok: fn(&Value) -> bool,
    expected: &str,
) -> Result<Value> {
    if ok(&value) {
        Ok(value)
    } else {
        Err(WaypointError::ToolExecution {
            tool: tool.to_string(),
            message: format!("expected {}, got {}", expected, value),
        })
    }
}

fn string_list(state: &StateMap, key: &str) -> Vec<String> {
    state
        .get(key)
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(|v| v.as_str().map(str::to_string))
                .collect()
        })
        .unwrap_or_default()
}

/// `10 - 1.5 * open_issues - complexity / 25`, clamped to 0..=10, one decimal.
pub fn quality_score(open_issues: usize, complexity: f64) -> f64 {
    let raw = 10.0 - 1.5 * open_issues as f64 - complexity / 25.0;
    (raw.clamp(0.0, 10.0) * 10.0).round() / 10.0
}

fn suggestion_for(issue: &str) -> String {
    if issue.starts_with("Found TODO") {
        "Resolve outstanding TODO/FIXME markers or move them to the tracker.".to_string()
    } else if issue.starts_with("Lines exceed") {
        "Wrap long lines to keep them within 120 characters.".to_string()
    } else if issue.starts_with("Comment density") {
        "Trim redundant comments and let names carry intent.".to_string()
    } else if issue.starts_with("Uses print") {
        "Replace print statements with structured logging.".to_string()
    } else if issue.starts_with("No code") {
        "Provide source code to review.".to_string()
    } else {
        format!("Address: {}", issue)
    }
}

struct ExtractFunctions;

impl Node for ExtractFunctions {
    fn run<'a>(
        &'a self,
        state: &'a mut StateMap,
        tools: &'a ToolRegistry,
        _log: &'a RunLog,
    ) -> BoxFuture<'a, Result<NodeResult>> {
        Box::pin(async move {
            let functions = tools.execute("code_outline", code_input(state)).await?;
            let functions = expect_output("code_outline", functions, Value::is_array, "an array")?;
            let count = functions.as_array().map_or(0, Vec::len);
            state.insert("functions".into(), functions);
            Ok(NodeResult::next(CHECK_COMPLEXITY)
                .with_message(format!("Extracted {} function(s).", count)))
        })
    }
}

struct CheckComplexity;

impl Node for CheckComplexity {
    fn run<'a>(
        &'a self,
        state: &'a mut StateMap,
        tools: &'a ToolRegistry,
        _log: &'a RunLog,
    ) -> BoxFuture<'a, Result<NodeResult>> {
        Box::pin(async move {
            let complexity = tools
                .execute("estimate_length_complexity", code_input(state))
                .await?;
            let complexity = expect_output(
                "estimate_length_complexity",
                complexity,
                Value::is_number,
                "a number",
            )?;
            let message = format!("Estimated complexity: {}.", complexity);
            state.insert("complexity".into(), complexity);
            Ok(NodeResult::next(DETECT_ISSUES).with_message(message))
        })
    }
}

struct DetectIssues;

impl Node for DetectIssues {
    fn run<'a>(
        &'a self,
        state: &'a mut StateMap,
        tools: &'a ToolRegistry,
        log: &'a RunLog,
    ) -> BoxFuture<'a, Result<NodeResult>> {
        Box::pin(async move {
            let issues = tools.execute("detect_smells", code_input(state)).await?;
            let issues = expect_output("detect_smells", issues, Value::is_array, "an array")?;
            if let Some(items) = issues.as_array() {
                for issue in items.iter().filter_map(Value::as_str) {
                    log.append(format!("Issue: {}", issue));
                }
            }
            let count = issues.as_array().map_or(0, Vec::len);
            state.insert("issues".into(), issues);
            state.insert("suggestions".into(), json!([]));
            state.insert("iterations".into(), json!(0));
            Ok(NodeResult::next(SUGGEST_IMPROVEMENTS)
                .with_message(format!("Detected {} issue(s).", count)))
        })
    }
}

struct SuggestImprovements;

impl Node for SuggestImprovements {
    fn run<'a>(
        &'a self,
        state: &'a mut StateMap,
        _tools: &'a ToolRegistry,
        _log: &'a RunLog,
    ) -> BoxFuture<'a, Result<NodeResult>> {
        Box::pin(async move {
            let threshold = state
                .get("threshold")
                .and_then(Value::as_f64)
                .unwrap_or(DEFAULT_THRESHOLD);
            let complexity = state
                .get("complexity")
                .and_then(Value::as_f64)
                .unwrap_or(0.0);
            let mut issues = string_list(state, "issues");
            let mut suggestions = string_list(state, "suggestions");

            if !issues.is_empty() {
                let issue = issues.remove(0);
                suggestions.push(suggestion_for(&issue));
            }

            let iterations = state
                .get("iterations")
                .and_then(Value::as_u64)
                .unwrap_or(0)
                + 1;
            let score = quality_score(issues.len(), complexity);

            state.insert("issues".into(), json!(issues));
            state.insert("suggestions".into(), json!(suggestions));
            state.insert("iterations".into(), json!(iterations));
            state.insert("quality_score".into(), json!(score));

            if score >= threshold || issues.is_empty() {
                Ok(NodeResult::end().with_message(format!(
                    "Quality score {:.1} after {} iteration(s); review complete.",
                    score, iterations
                )))
            } else {
                Ok(NodeResult::next(SUGGEST_IMPROVEMENTS).with_message(format!(
                    "Quality score {:.1} below threshold {:.1}; refining.",
                    score, threshold
                )))
            }
        })
    }
}
