use crate::{
    AgentLoopError, AssistantTurn, DebugSession, RoundSummary, TokenUsage, ToolCallRecord,
    ToolDispatchOptions, ToolRegistry, ToolResultsTurn, Turn, UserTurn,
};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ModelResponse {
    pub id: String,
    pub text: String,
    #[serde(default)]
    pub tool_calls: Vec<ToolCallRecord>,
    #[serde(default)]
    pub usage: TokenUsage,
}

#[async_trait]
pub trait ModelClient: Send + Sync {
    async fn complete(&self, history: &[Turn]) -> Result<ModelResponse, AgentLoopError>;
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AgentLoopConfig {
    pub max_rounds: usize,
    pub parallel_tool_calls: bool,
}

impl Default for AgentLoopConfig {
    fn default() -> Self {
        Self {
            max_rounds: 200,
            parallel_tool_calls: false,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    Completed,
    RoundLimit,
}

#[derive(Clone, Debug, PartialEq)]
pub struct LoopOutcome {
    pub rounds: usize,
    pub stop_reason: StopReason,
    /// Tokens consumed by this invocation only; the session tracker holds the running total.
    pub usage: TokenUsage,
    pub history: Vec<Turn>,
}

/// Tool-calling loop with debug checkpoints at every round boundary and around
/// every tool call.
pub struct AgentLoop {
    session: Arc<DebugSession>,
    client: Arc<dyn ModelClient>,
    tools: ToolRegistry,
    config: AgentLoopConfig,
}

impl AgentLoop {
    pub fn new(
        session: Arc<DebugSession>,
        client: Arc<dyn ModelClient>,
        tools: ToolRegistry,
        config: AgentLoopConfig,
    ) -> Self {
        Self {
            session,
            client,
            tools,
            config,
        }
    }

    pub fn session(&self) -> &Arc<DebugSession> {
        &self.session
    }

    pub fn tools_mut(&mut self) -> &mut ToolRegistry {
        &mut self.tools
    }

    pub async fn run(&self, user_input: impl Into<String>) -> Result<LoopOutcome, AgentLoopError> {
        if self.config.max_rounds == 0 {
            return Err(AgentLoopError::InvalidConfiguration(
                "max_rounds must be greater than zero".to_string(),
            ));
        }

        let session = &self.session;
        let checkpoint = session.begin_loop();
        let options = ToolDispatchOptions {
            session_id: session.id().to_string(),
            parallel_tool_calls: self.config.parallel_tool_calls,
        };

        let mut history = vec![Turn::User(UserTurn {
            content: user_input.into(),
        })];
        let mut usage = TokenUsage::default();
        let mut last_round: Option<RoundSummary> = None;
        let mut had_error = false;

        for round in 0..self.config.max_rounds {
            checkpoint
                .evaluate(round, last_round.as_ref(), had_error)
                .await?;

            let response = self.client.complete(&history).await?;
            session.usage().record_usage(response.usage);
            usage = usage + response.usage;
            debug!(
                session_id = %session.id(),
                round,
                tool_calls = response.tool_calls.len(),
                "model round completed"
            );

            let assistant = AssistantTurn {
                response_id: response.id,
                content: response.text,
                tool_calls: response.tool_calls,
                usage: response.usage,
            };
            let summary = assistant.summary();
            let tool_calls = assistant.tool_calls.clone();
            history.push(Turn::Assistant(assistant));

            if tool_calls.is_empty() {
                info!(session_id = %session.id(), rounds = round + 1, "agent loop completed");
                return Ok(LoopOutcome {
                    rounds: round + 1,
                    stop_reason: StopReason::Completed,
                    usage,
                    history,
                });
            }

            let results = self
                .tools
                .dispatch(tool_calls, session.gate(), &options)
                .await?;
            had_error = results.iter().any(|result| result.is_error);
            history.push(Turn::ToolResults(ToolResultsTurn { results }));
            last_round = Some(summary);
        }

        info!(
            session_id = %session.id(),
            max_rounds = self.config.max_rounds,
            "agent loop hit round limit"
        );
        Ok(LoopOutcome {
            rounds: self.config.max_rounds,
            stop_reason: StopReason::RoundLimit,
            usage,
            history,
        })
    }
}
