use crate::{
    Cancelled, ResumeAction, ToolCallCheck, ToolCallGate, ToolCallRecord, ToolCallTiming,
    ToolError, ToolResult,
};
use futures::future::try_join_all;
use serde_json::Value;
use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Instant;
use tracing::debug;

pub type ToolFuture = Pin<Box<dyn Future<Output = Result<String, ToolError>> + Send>>;
pub type ToolExecutor = Arc<dyn Fn(Value) -> ToolFuture + Send + Sync>;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
}

#[derive(Clone)]
pub struct RegisteredTool {
    pub definition: ToolDefinition,
    pub executor: ToolExecutor,
}

impl RegisteredTool {
    pub fn new<F, Fut>(name: impl Into<String>, description: impl Into<String>, run: F) -> Self
    where
        F: Fn(Value) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<String, ToolError>> + Send + 'static,
    {
        Self {
            definition: ToolDefinition {
                name: name.into(),
                description: description.into(),
            },
            executor: Arc::new(move |arguments| Box::pin(run(arguments))),
        }
    }
}

#[derive(Clone)]
pub struct ToolDispatchOptions {
    pub session_id: String,
    pub parallel_tool_calls: bool,
}

#[derive(Clone, Default)]
pub struct ToolRegistry {
    tools: HashMap<String, RegisteredTool>,
}

impl ToolRegistry {
    pub fn register(&mut self, tool: RegisteredTool) {
        self.tools.insert(tool.definition.name.clone(), tool);
    }

    pub fn unregister(&mut self, name: &str) -> Option<RegisteredTool> {
        self.tools.remove(name)
    }

    pub fn get(&self, name: &str) -> Option<&RegisteredTool> {
        self.tools.get(name)
    }

    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.tools.keys().cloned().collect();
        names.sort_unstable();
        names
    }

    /// Runs every call through the gate. Tool failures become error results; only
    /// an operator abort fails the dispatch. In parallel mode an abort drops the
    /// sibling calls that have not finished yet.
    pub async fn dispatch(
        &self,
        tool_calls: Vec<ToolCallRecord>,
        gate: &ToolCallGate,
        options: &ToolDispatchOptions,
    ) -> Result<Vec<ToolResult>, Cancelled> {
        if options.parallel_tool_calls && tool_calls.len() > 1 {
            let futures = tool_calls
                .iter()
                .map(|tool_call| self.dispatch_single(tool_call, gate, options));
            return try_join_all(futures).await;
        }

        let mut results = Vec::with_capacity(tool_calls.len());
        for tool_call in &tool_calls {
            results.push(self.dispatch_single(tool_call, gate, options).await?);
        }
        Ok(results)
    }

    async fn dispatch_single(
        &self,
        tool_call: &ToolCallRecord,
        gate: &ToolCallGate,
        options: &ToolDispatchOptions,
    ) -> Result<ToolResult, Cancelled> {
        let session_id = &options.session_id;

        if gate.has_pending(ToolCallTiming::Before) {
            let action = gate
                .evaluate(ToolCallCheck::before(tool_call, session_id.clone()))
                .await?;
            if action == ResumeAction::Skip {
                debug!(tool_name = %tool_call.name, "tool call skipped before execution");
                return Ok(ToolResult::skipped(tool_call.id.clone()));
            }
        }

        let start_time = Instant::now();
        let result = match self.get(&tool_call.name) {
            Some(registered) => match (registered.executor)(tool_call.arguments.clone()).await {
                Ok(output) => ToolResult::success(tool_call.id.clone(), output),
                Err(error) => ToolResult::error(tool_call.id.clone(), error.to_string()),
            },
            None => ToolResult::error(
                tool_call.id.clone(),
                format!("Unknown tool: {}", tool_call.name),
            ),
        };
        let duration_ms = start_time.elapsed().as_millis() as u64;

        if gate.has_pending(ToolCallTiming::After) {
            let action = gate
                .evaluate(ToolCallCheck::after(
                    tool_call,
                    session_id.clone(),
                    result.content.clone(),
                    result.is_error,
                    duration_ms,
                ))
                .await?;
            if action == ResumeAction::Skip {
                debug!(tool_name = %tool_call.name, "tool result discarded after execution");
                return Ok(ToolResult::skipped(tool_call.id.clone()));
            }
        }

        Ok(result)
    }
}
