#![allow(dead_code)]

use async_trait::async_trait;
use forge_debug::{
    AgentLoop, AgentLoopConfig, AgentLoopError, DebugEvent, DebugSession, ModelClient,
    ModelResponse, RegisteredTool, ResumeAction, ToolCallRecord, ToolError, ToolRegistry, Turn,
};
use serde_json::Value;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

pub struct ScriptedClient {
    responses: Mutex<VecDeque<ModelResponse>>,
    requests: Mutex<Vec<usize>>,
}

impl ScriptedClient {
    pub fn new(responses: Vec<ModelResponse>) -> Arc<Self> {
        Arc::new(Self {
            responses: Mutex::new(responses.into()),
            requests: Mutex::new(Vec::new()),
        })
    }

    /// History length seen by each request, in order.
    pub fn request_history_lengths(&self) -> Vec<usize> {
        self.requests.lock().expect("requests mutex").clone()
    }
}

#[async_trait]
impl ModelClient for ScriptedClient {
    async fn complete(&self, history: &[Turn]) -> Result<ModelResponse, AgentLoopError> {
        self.requests
            .lock()
            .expect("requests mutex")
            .push(history.len());
        self.responses
            .lock()
            .expect("responses mutex")
            .pop_front()
            .ok_or_else(|| AgentLoopError::Model("script exhausted".to_string()))
    }
}

pub fn text_response(id: &str, text: &str, prompt: u64, completion: u64) -> ModelResponse {
    ModelResponse {
        id: id.to_string(),
        text: text.to_string(),
        tool_calls: Vec::new(),
        usage: forge_debug::TokenUsage::new(prompt, completion),
    }
}

pub fn tool_call_response(
    id: &str,
    calls: Vec<(&str, &str, Value)>,
    prompt: u64,
    completion: u64,
) -> ModelResponse {
    ModelResponse {
        tool_calls: calls
            .into_iter()
            .map(|(call_id, name, arguments)| ToolCallRecord::new(call_id, name, arguments))
            .collect(),
        ..text_response(id, "", prompt, completion)
    }
}

/// Tools that record their invocations. `fail` always errors; `spawn_agent`
/// stands in for the subagent tool.
pub fn recording_tools(invocations: Arc<Mutex<Vec<String>>>) -> ToolRegistry {
    let mut tools = ToolRegistry::default();
    for name in ["read_file", "shell", "spawn_agent"] {
        let invocations = invocations.clone();
        tools.register(RegisteredTool::new(name, name, move |_arguments| {
            let invocations = invocations.clone();
            async move {
                invocations
                    .lock()
                    .expect("invocations mutex")
                    .push(name.to_string());
                Ok(format!("{name} ok"))
            }
        }));
    }
    let fail_invocations = invocations.clone();
    tools.register(RegisteredTool::new("fail", "always fails", move |_arguments| {
        let invocations = fail_invocations.clone();
        async move {
            invocations
                .lock()
                .expect("invocations mutex")
                .push("fail".to_string());
            Err(ToolError::Execution("boom".to_string()))
        }
    }));
    tools
}

/// Resumes every hit from inside the notification callback, taking actions from
/// a queue (then `Continue`). Records every event it sees.
#[derive(Clone, Default)]
pub struct ScriptedOperator {
    actions: Arc<Mutex<VecDeque<ResumeAction>>>,
    events: Arc<Mutex<Vec<DebugEvent>>>,
}

impl ScriptedOperator {
    pub fn attach(session: &DebugSession, actions: Vec<ResumeAction>) -> Self {
        let operator = Self {
            actions: Arc::new(Mutex::new(actions.into())),
            events: Arc::default(),
        };
        let controller = session.controller();
        let observer = operator.clone();
        session.events().subscribe(Arc::new(move |event: &DebugEvent| {
            observer
                .events
                .lock()
                .expect("events mutex")
                .push(event.clone());
            if matches!(
                event,
                DebugEvent::BreakpointHit(_) | DebugEvent::ToolCallBreakpointHit(_)
            ) {
                let action = observer
                    .actions
                    .lock()
                    .expect("actions mutex")
                    .pop_front()
                    .unwrap_or(ResumeAction::Continue);
                controller.resume(action);
            }
        }));
        operator
    }

    pub fn events(&self) -> Vec<DebugEvent> {
        self.events.lock().expect("events mutex").clone()
    }

    pub fn iteration_hits(&self) -> Vec<forge_debug::HitContext> {
        self.events()
            .into_iter()
            .filter_map(|event| match event {
                DebugEvent::BreakpointHit(context) => Some(context),
                _ => None,
            })
            .collect()
    }

    pub fn tool_call_hits(&self) -> Vec<forge_debug::ToolCallHitContext> {
        self.events()
            .into_iter()
            .filter_map(|event| match event {
                DebugEvent::ToolCallBreakpointHit(context) => Some(context),
                _ => None,
            })
            .collect()
    }
}

pub fn agent(
    session: &Arc<DebugSession>,
    client: Arc<ScriptedClient>,
    tools: ToolRegistry,
) -> AgentLoop {
    AgentLoop::new(session.clone(), client, tools, AgentLoopConfig::default())
}
