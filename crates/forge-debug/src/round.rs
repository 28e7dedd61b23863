use crate::{Breakpoint, ToolCallTiming, TokenUsage};
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ToolCallRecord {
    pub id: String,
    pub name: String,
    pub arguments: Value,
}

impl ToolCallRecord {
    pub fn new(id: impl Into<String>, name: impl Into<String>, arguments: Value) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            arguments,
        }
    }
}

/// What the checkpoint needs to know about the round that just finished.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct RoundSummary {
    pub id: String,
    pub response: String,
    pub tool_calls: Vec<ToolCallRecord>,
}

impl RoundSummary {
    pub fn calls_tool(&self, tool_name: &str) -> bool {
        self.tool_calls.iter().any(|call| call.name == tool_name)
    }
}

/// Snapshot taken when an iteration-level breakpoint matches.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct HitContext {
    pub breakpoint: Breakpoint,
    pub iteration: usize,
    pub usage: TokenUsage,
    pub last_round_id: Option<String>,
    pub last_response: Option<String>,
    pub last_tool_calls: Vec<ToolCallRecord>,
    pub had_error: bool,
    pub session_id: String,
    pub elapsed_ms: u64,
}

/// Snapshot taken when a tool-call breakpoint matches.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ToolCallHitContext {
    pub breakpoint: Breakpoint,
    pub timing: ToolCallTiming,
    pub tool_name: String,
    pub tool_call_id: String,
    pub arguments: Value,
    pub result: Option<Value>,
    pub had_error: bool,
    pub duration_ms: Option<u64>,
    pub result_size_bytes: Option<usize>,
    pub session_id: String,
}

/// Input to one gate evaluation. `after` checks carry the outcome of the call.
#[derive(Clone, Debug, PartialEq)]
pub struct ToolCallCheck {
    pub timing: ToolCallTiming,
    pub tool_name: String,
    pub tool_call_id: String,
    pub arguments: Value,
    pub session_id: String,
    pub result: Option<Value>,
    pub had_error: bool,
    pub duration_ms: Option<u64>,
    pub result_size_bytes: Option<usize>,
}

impl ToolCallCheck {
    pub fn before(call: &ToolCallRecord, session_id: impl Into<String>) -> Self {
        Self {
            timing: ToolCallTiming::Before,
            tool_name: call.name.clone(),
            tool_call_id: call.id.clone(),
            arguments: call.arguments.clone(),
            session_id: session_id.into(),
            result: None,
            had_error: false,
            duration_ms: None,
            result_size_bytes: None,
        }
    }

    pub fn after(
        call: &ToolCallRecord,
        session_id: impl Into<String>,
        result: Value,
        had_error: bool,
        duration_ms: u64,
    ) -> Self {
        let result_size_bytes = approximate_size(&result);
        Self {
            timing: ToolCallTiming::After,
            result: Some(result),
            had_error,
            duration_ms: Some(duration_ms),
            result_size_bytes: Some(result_size_bytes),
            ..Self::before(call, session_id)
        }
    }

    pub(crate) fn into_hit(self, breakpoint: Breakpoint) -> ToolCallHitContext {
        ToolCallHitContext {
            breakpoint,
            timing: self.timing,
            tool_name: self.tool_name,
            tool_call_id: self.tool_call_id,
            arguments: self.arguments,
            result: self.result,
            had_error: self.had_error,
            duration_ms: self.duration_ms,
            result_size_bytes: self.result_size_bytes,
            session_id: self.session_id,
        }
    }
}

fn approximate_size(value: &Value) -> usize {
    match value {
        Value::String(text) => text.len(),
        other => other.to_string().len(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn round_summary_matches_tool_names_exactly() {
        let round = RoundSummary {
            id: "round-1".to_string(),
            response: String::new(),
            tool_calls: vec![ToolCallRecord::new("c1", "read_file", json!({}))],
        };
        assert!(round.calls_tool("read_file"));
        assert!(!round.calls_tool("read"));
        assert!(!round.calls_tool("terminal"));
    }

    #[test]
    fn after_check_records_outcome_and_result_size() {
        let call = ToolCallRecord::new("c1", "shell", json!({"command": "ls"}));
        let check = ToolCallCheck::after(&call, "s1", json!("a.txt\nb.txt"), false, 12);
        assert_eq!(check.timing, ToolCallTiming::After);
        assert_eq!(check.tool_call_id, "c1");
        assert_eq!(check.duration_ms, Some(12));
        assert_eq!(check.result_size_bytes, Some(11));
        assert_eq!(check.arguments["command"], "ls");
    }
}
