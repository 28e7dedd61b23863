use async_trait::async_trait;
use forge_debug::{
    AgentLoopError, ModelClient, ModelResponse, RegisteredTool, TokenUsage, ToolCallRecord,
    ToolError, ToolRegistry, Turn,
};
use serde::Deserialize;
use std::collections::{BTreeMap, VecDeque};
use std::path::Path;
use std::sync::Mutex;

/// A recorded agent run: the model's responses in order plus canned tool behavior.
#[derive(Clone, Debug, Deserialize)]
pub struct RunScript {
    #[serde(default = "default_input")]
    pub input: String,
    pub rounds: Vec<ScriptRound>,
    #[serde(default)]
    pub tools: BTreeMap<String, ScriptTool>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct ScriptRound {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub tool_calls: Vec<ToolCallRecord>,
    #[serde(default)]
    pub usage: TokenUsage,
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct ScriptTool {
    #[serde(default)]
    pub output: String,
    #[serde(default)]
    pub error: Option<String>,
}

fn default_input() -> String {
    "scripted run".to_string()
}

impl RunScript {
    pub fn load(path: &Path) -> Result<Self, String> {
        let source = std::fs::read_to_string(path)
            .map_err(|e| format!("failed reading script '{}': {e}", path.display()))?;
        serde_json::from_str(&source)
            .map_err(|e| format!("invalid script '{}': {e}", path.display()))
    }

    pub fn model(&self) -> ScriptedModel {
        let responses = self
            .rounds
            .iter()
            .enumerate()
            .map(|(index, round)| ModelResponse {
                id: round
                    .id
                    .clone()
                    .unwrap_or_else(|| format!("round-{}", index + 1)),
                text: round.text.clone(),
                tool_calls: round.tool_calls.clone(),
                usage: round.usage,
            })
            .collect();
        ScriptedModel {
            responses: Mutex::new(responses),
        }
    }

    pub fn tool_registry(&self) -> ToolRegistry {
        let mut registry = ToolRegistry::default();
        for (name, tool) in &self.tools {
            let tool = tool.clone();
            registry.register(RegisteredTool::new(
                name.clone(),
                format!("scripted tool {name}"),
                move |_arguments| {
                    let tool = tool.clone();
                    async move {
                        match tool.error {
                            Some(message) => Err(ToolError::Execution(message)),
                            None => Ok(tool.output),
                        }
                    }
                },
            ));
        }
        registry
    }
}

pub struct ScriptedModel {
    responses: Mutex<VecDeque<ModelResponse>>,
}

#[async_trait]
impl ModelClient for ScriptedModel {
    async fn complete(&self, _history: &[Turn]) -> Result<ModelResponse, AgentLoopError> {
        self.responses
            .lock()
            .expect("script mutex poisoned")
            .pop_front()
            .ok_or_else(|| AgentLoopError::Model("script has no more rounds".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn script_rounds_get_default_ids_and_tools_map_to_results() {
        let script: RunScript = serde_json::from_str(
            r#"{
                "rounds": [
                    {"tool_calls": [{"id": "c1", "name": "shell", "arguments": {}}],
                     "usage": {"prompt_tokens": 3, "completion_tokens": 2}},
                    {"id": "final", "text": "done"}
                ],
                "tools": {"shell": {"error": "denied"}, "read_file": {"output": "abc"}}
            }"#,
        )
        .expect("script should parse");

        assert_eq!(script.input, "scripted run");
        let model = script.model();
        let responses = model.responses.lock().expect("script mutex poisoned");
        assert_eq!(responses[0].id, "round-1");
        assert_eq!(responses[0].usage.total(), 5);
        assert_eq!(responses[1].id, "final");
        drop(responses);

        assert_eq!(
            script.tool_registry().names(),
            vec!["read_file".to_string(), "shell".to_string()]
        );
    }
}
