use std::sync::OnceLock;

use futures::future::BoxFuture;
use regex::Regex;
use serde::Deserialize;

use waypoint_core::error::{Result, WaypointError};
use waypoint_core::traits::Tool;

const MAX_LINE_LEN: usize = 120;

#[derive(Deserialize)]
struct CodeInput {
    code: String,
}

fn parse_input(input: serde_json::Value) -> Result<CodeInput> {
    serde_json::from_value(input).map_err(|e| WaypointError::ToolValidation(e.to_string()))
}

fn code_schema() -> serde_json::Value {
    serde_json::json!({
        "type": "object",
        "properties": { "code": { "type": "string", "description": "Source code to analyze" } },
        "required": ["code"]
    })
}

fn non_blank_lines(code: &str) -> impl Iterator<Item = &str> {
    code.lines().map(str::trim).filter(|l| !l.is_empty())
}

/// Heuristic code smells, in a fixed order.
pub fn detect_smells(code: &str) -> Vec<String> {
    let lines: Vec<&str> = non_blank_lines(code).collect();
    if lines.is_empty() {
        return vec!["No code provided.".to_string()];
    }

    let mut smells = Vec::new();
    if lines.iter().any(|l| l.contains("TODO") || l.contains("FIXME")) {
        smells.push("Found TODO/FIXME markers.".to_string());
    }
    if lines.iter().any(|l| l.chars().count() > MAX_LINE_LEN) {
        smells.push(format!("Lines exceed {} characters.", MAX_LINE_LEN));
    }
    let comments = lines
        .iter()
        .filter(|l| l.starts_with('#') || l.starts_with("//"))
        .count();
    if comments * 2 > lines.len() {
        smells.push("Comment density is unusually high.".to_string());
    }
    if code.contains("print(") && !code.contains("logging") {
        smells.push("Uses print statements instead of logging.".to_string());
    }
    smells
}

/// Rough complexity proxy based on non-blank line count, clamped to 5..=100.
pub fn estimate_length_complexity(code: &str) -> u64 {
    let count = non_blank_lines(code).count() as u64;
    (count / 2).clamp(5, 100)
}

fn function_patterns() -> &'static [Regex] {
    static PATTERNS: OnceLock<Vec<Regex>> = OnceLock::new();
    PATTERNS.get_or_init(|| {
        [
            r"^(?:pub(?:\([^)]*\))?\s+)?(?:async\s+)?fn\s+(\w+)",
            r"^(?:async\s+)?def\s+(\w+)",
            r"^(?:export\s+)?(?:async\s+)?function\s+(\w+)",
        ]
        .iter()
        .map(|p| Regex::new(p).expect("function pattern is valid"))
        .collect()
    })
}

/// Names of function declarations (`fn`, `def`, `function`) in source order.
pub fn extract_functions(code: &str) -> Vec<String> {
    let mut names = Vec::new();
    for line in code.lines().map(str::trim_start) {
        for pat in function_patterns() {
            if let Some(caps) = pat.captures(line) {
                names.push(caps[1].to_string());
                break;
            }
        }
    }
    names
}

// ── DetectSmellsTool ────────────────────────────────────────────

pub struct DetectSmellsTool;

impl Tool for DetectSmellsTool {
    fn name(&self) -> &str {
        "detect_smells"
    }
    fn description(&self) -> &str {
        "Flag simple code smells (TODO markers, long lines, comment density, print debugging)."
    }
    fn input_schema(&self) -> serde_json::Value {
        code_schema()
    }
    fn execute(&self, input: serde_json::Value) -> BoxFuture<'_, Result<serde_json::Value>> {
        Box::pin(async move {
            let p = parse_input(input)?;
            Ok(serde_json::json!(detect_smells(&p.code)))
        })
    }
}

// ── LengthComplexityTool ────────────────────────────────────────

pub struct LengthComplexityTool;

impl Tool for LengthComplexityTool {
    fn name(&self) -> &str {
        "estimate_length_complexity"
    }
    fn description(&self) -> &str {
        "Estimate complexity (5-100) from the number of non-blank lines."
    }
    fn input_schema(&self) -> serde_json::Value {
        code_schema()
    }
    fn execute(&self, input: serde_json::Value) -> BoxFuture<'_, Result<serde_json::Value>> {
        Box::pin(async move {
            let p = parse_input(input)?;
            Ok(serde_json::json!(estimate_length_complexity(&p.code)))
        })
    }
}

// ── CodeOutlineTool ─────────────────────────────────────────────

pub struct CodeOutlineTool;

impl Tool for CodeOutlineTool {
    fn name(&self) -> &str {
        "code_outline"
    }
    fn description(&self) -> &str {
        "List function names declared in a code snippet."
    }
    fn input_schema(&self) -> serde_json::Value {
        code_schema()
    }
    fn execute(&self, input: serde_json::Value) -> BoxFuture<'_, Result<serde_json::Value>> {
        Box::pin(async move {
            let p = parse_input(input)?;
            Ok(serde_json::json!(extract_functions(&p.code)))
        })
    }
}
