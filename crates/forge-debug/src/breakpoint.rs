use serde::{Deserialize, Serialize};
use std::fmt::{self, Display};
use uuid::Uuid;

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BreakpointId(String);

impl BreakpointId {
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for BreakpointId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl Display for BreakpointId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Condition a breakpoint fires on. Per-type parameters live on the variant.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BreakpointKind {
    ByTool { tool_name: String },
    OnError,
    AtIteration { iteration: usize },
    OnTokenThreshold { threshold: u64 },
    Step,
    BeforeToolCall,
    AfterToolCall,
}

impl BreakpointKind {
    pub fn default_label(&self) -> String {
        match self {
            Self::ByTool { tool_name } => format!("Break on tool: {tool_name}"),
            Self::OnError => "Break on error".to_string(),
            Self::AtIteration { iteration } => format!("Break at iteration {iteration}"),
            Self::OnTokenThreshold { threshold } => format!("Break when tokens > {threshold}"),
            Self::Step => "Step".to_string(),
            Self::BeforeToolCall => "Break before tool call".to_string(),
            Self::AfterToolCall => "Break after tool call".to_string(),
        }
    }

    /// Tool-call kinds are evaluated by the gate, never by the iteration checkpoint.
    pub fn is_tool_call_kind(&self) -> bool {
        matches!(self, Self::BeforeToolCall | Self::AfterToolCall)
    }

    pub fn tool_call_timing(&self) -> Option<ToolCallTiming> {
        match self {
            Self::BeforeToolCall => Some(ToolCallTiming::Before),
            Self::AfterToolCall => Some(ToolCallTiming::After),
            _ => None,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Breakpoint {
    pub id: BreakpointId,
    pub kind: BreakpointKind,
    pub enabled: bool,
    pub label: String,
    /// Built on the fly by step mode or a settings toggle; never stored in a registry.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub synthetic: bool,
}

impl Breakpoint {
    pub fn new(kind: BreakpointKind) -> Self {
        let label = kind.default_label();
        Self::with_label(kind, label)
    }

    pub fn with_label(kind: BreakpointKind, label: impl Into<String>) -> Self {
        Self {
            id: BreakpointId::generate(),
            kind,
            enabled: true,
            label: label.into(),
            synthetic: false,
        }
    }

    pub(crate) fn synthetic(kind: BreakpointKind, id: &str, label: impl Into<String>) -> Self {
        Self {
            id: BreakpointId::from(id),
            kind,
            enabled: true,
            label: label.into(),
            synthetic: true,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolCallTiming {
    Before,
    After,
}

impl ToolCallTiming {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Before => "before",
            Self::After => "after",
        }
    }
}

impl Display for ToolCallTiming {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Operator decision that unblocks a suspension.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResumeAction {
    Continue,
    Step,
    Abort,
    /// Tool-call suspensions only: do not run (or discard) the tool and return an
    /// empty result. Iteration suspensions treat it as `Continue`.
    Skip,
}

impl ResumeAction {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Continue => "continue",
            Self::Step => "step",
            Self::Abort => "abort",
            Self::Skip => "skip",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "c" | "continue" => Some(Self::Continue),
            "s" | "step" => Some(Self::Step),
            "a" | "abort" => Some(Self::Abort),
            "k" | "skip" => Some(Self::Skip),
            _ => None,
        }
    }
}

impl Display for ResumeAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which evaluator a suspension (or a resume) belongs to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SuspensionKind {
    Iteration,
    ToolCall,
}

impl SuspensionKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Iteration => "iteration",
            Self::ToolCall => "tool_call",
        }
    }
}

impl Display for SuspensionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
