//! OpenAI-compatible chat completions adapter with local tool execution.
//!
//! The model decides which tools to call; the calls are executed here and
//! their outputs collected. Tool results are not fed back for a second turn
//! because the detail stage only needs the tool outputs themselves.

use std::sync::Arc;

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{debug, warn};

use super::{AdapterOutput, Tool, ToolAdapter, ToolOutput};

pub const DEFAULT_ENDPOINT: &str = "https://api.openai.com/v1";
pub const DEFAULT_MODEL: &str = "gpt-4o-mini";
const DEFAULT_TEMPERATURE: f32 = 0.2;

pub struct ChatToolAdapter {
    base_url: String,
    model: String,
    api_key: Option<String>,
    temperature: f32,
    client: Client,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
    usage: Option<Usage>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Debug, Default, Deserialize)]
struct ResponseMessage {
    content: Option<String>,
    #[serde(default)]
    tool_calls: Vec<ToolCall>,
}

#[derive(Debug, Clone, Deserialize)]
struct ToolCall {
    function: FunctionCall,
}

#[derive(Debug, Clone, Deserialize)]
struct FunctionCall {
    name: String,
    /// JSON-encoded arguments object
    #[serde(default)]
    arguments: String,
}

#[derive(Debug, Deserialize)]
struct Usage {
    total_tokens: Option<u64>,
}

impl ChatToolAdapter {
    pub fn new(base_url: impl Into<String>, model: impl Into<String>, api_key: Option<String>, client: Client) -> Self {
        Self {
            base_url: base_url.into(),
            model: model.into(),
            api_key,
            temperature: DEFAULT_TEMPERATURE,
            client,
        }
    }

    fn request_body(&self, prompt: &str, tools: &[Arc<dyn Tool>]) -> Value {
        let mut body = json!({
            "model": self.model,
            "temperature": self.temperature,
            "messages": [
                { "role": "user", "content": prompt }
            ],
        });

        if !tools.is_empty() {
            let specs: Vec<Value> = tools
                .iter()
                .map(|tool| {
                    let spec = tool.spec();
                    json!({
                        "type": "function",
                        "function": {
                            "name": spec.name,
                            "description": spec.description,
                            "parameters": spec.parameters,
                        }
                    })
                })
                .collect();
            body["tools"] = Value::Array(specs);
            body["tool_choice"] = json!("auto");
        }

        body
    }

    async fn send(&self, body: &Value) -> Result<ChatResponse> {
        let url = format!("{}/chat/completions", self.base_url.trim_end_matches('/'));

        let mut request = self.client.post(&url).json(body);
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let response = request
            .send()
            .await
            .with_context(|| format!("Chat request to {} failed", url))?;

        let status = response.status();
        let text_body = response
            .text()
            .await
            .context("Failed to read chat response body")?;

        if !status.is_success() {
            anyhow::bail!("Chat API returned HTTP {}: {}", status, text_body.trim());
        }

        parse_response(&text_body)
    }
}

fn parse_response(body: &str) -> Result<ChatResponse> {
    serde_json::from_str(body).context("Failed to parse chat response")
}

/// Execute each requested tool; failures are logged and skipped
async fn dispatch_tool_calls(calls: &[ToolCall], tools: &[Arc<dyn Tool>]) -> Vec<ToolOutput> {
    let mut outputs = Vec::new();

    for call in calls {
        let name = call.function.name.as_str();
        let Some(tool) = tools.iter().find(|t| t.spec().name == name) else {
            warn!(tool = name, "Model requested an unknown tool");
            continue;
        };

        let arguments: Value = if call.function.arguments.trim().is_empty() {
            json!({})
        } else {
            match serde_json::from_str(&call.function.arguments) {
                Ok(arguments) => arguments,
                Err(e) => {
                    warn!(tool = name, error = %e, "Tool arguments are not valid JSON");
                    continue;
                }
            }
        };

        match tool.call(&arguments).await {
            Ok(content) => {
                debug!(tool = name, chars = content.len(), "Tool produced output");
                outputs.push(ToolOutput {
                    tool: name.to_string(),
                    content,
                });
            }
            Err(e) => warn!(tool = name, error = %format!("{:#}", e), "Tool call failed"),
        }
    }

    outputs
}

#[async_trait]
impl ToolAdapter for ChatToolAdapter {
    fn name(&self) -> &str {
        "chat"
    }

    async fn run_with_tools(&self, prompt: &str, tools: &[Arc<dyn Tool>]) -> Result<Vec<ToolOutput>> {
        let response = self.send(&self.request_body(prompt, tools)).await?;

        let calls: Vec<ToolCall> = response
            .choices
            .into_iter()
            .flat_map(|choice| choice.message.tool_calls)
            .collect();
        debug!(calls = calls.len(), model = %self.model, "Model requested tool calls");

        Ok(dispatch_tool_calls(&calls, tools).await)
    }

    async fn complete(&self, prompt: &str) -> Result<AdapterOutput> {
        let response = self.send(&self.request_body(prompt, &[])).await?;
        if let Some(tokens) = response.usage.as_ref().and_then(|u| u.total_tokens) {
            debug!(tokens, model = %self.model, "Completion token usage");
        }

        let content = response
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .context("Chat response missing content")?;

        Ok(AdapterOutput::new(content))
    }
}
