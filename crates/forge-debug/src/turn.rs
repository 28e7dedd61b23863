use crate::{RoundSummary, TokenUsage, ToolCallRecord};
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct UserTurn {
    pub content: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AssistantTurn {
    pub response_id: String,
    pub content: String,
    pub tool_calls: Vec<ToolCallRecord>,
    pub usage: TokenUsage,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ToolResult {
    pub tool_call_id: String,
    pub content: Value,
    pub is_error: bool,
    /// The operator skipped the call (or discarded its output) at a breakpoint.
    #[serde(default)]
    pub skipped: bool,
}

impl ToolResult {
    pub fn success(tool_call_id: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            tool_call_id: tool_call_id.into(),
            content: Value::String(content.into()),
            is_error: false,
            skipped: false,
        }
    }

    pub fn error(tool_call_id: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            is_error: true,
            ..Self::success(tool_call_id, message)
        }
    }

    pub fn skipped(tool_call_id: impl Into<String>) -> Self {
        Self {
            skipped: true,
            ..Self::success(tool_call_id, "")
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ToolResultsTurn {
    pub results: Vec<ToolResult>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum Turn {
    User(UserTurn),
    Assistant(AssistantTurn),
    ToolResults(ToolResultsTurn),
}

impl AssistantTurn {
    pub fn summary(&self) -> RoundSummary {
        RoundSummary {
            id: self.response_id.clone(),
            response: self.content.clone(),
            tool_calls: self.tool_calls.clone(),
        }
    }
}
