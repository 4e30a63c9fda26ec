//! OpenAI-compatible chat-completions client.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{ChatModel, ChatRequest, ToolDescriptor, ToolExecutor};
use crate::conversation::Message;
use crate::errors::ModelError;

pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_MODEL: &str = "gpt-4o-mini";
pub const DEFAULT_TIMEOUT_SECS: u64 = 60;

pub struct OpenAiClient {
    client: Client,
    api_key: Option<String>,
    model: String,
    base_url: String,
    timeout: Duration,
}

impl OpenAiClient {
    pub fn new(api_key: Option<String>) -> Self {
        Self {
            client: build_http_client(),
            api_key,
            model: DEFAULT_MODEL.to_string(),
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Point at any API-compatible service.
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    async fn send(&self, api_key: &str, body: &WireRequest<'_>) -> Result<WireResponse, ModelError> {
        let request = async {
            let response = self
                .client
                .post(format!("{}/chat/completions", self.base_url))
                .bearer_auth(api_key)
                .json(body)
                .send()
                .await?;

            let status = response.status();
            if !status.is_success() {
                let body = response.text().await.unwrap_or_default();
                return Err(ModelError::Status {
                    status: status.as_u16(),
                    body,
                });
            }
            Ok(response.json::<WireResponse>().await?)
        };

        tokio::time::timeout(self.timeout, request)
            .await
            .map_err(|_| ModelError::Timeout {
                secs: self.timeout.as_secs(),
            })?
    }
}

/// Tests talk to local mock servers, so bypass any system proxy there.
pub(crate) fn build_http_client() -> Client {
    if cfg!(test) {
        Client::builder().no_proxy().build().unwrap_or_default()
    } else {
        Client::new()
    }
}

#[derive(Serialize)]
struct WireRequest<'a> {
    model: &'a str,
    messages: &'a [WireMessage],
    #[serde(skip_serializing_if = "Option::is_none")]
    tools: Option<Vec<WireTool>>,
}

#[derive(Debug, Clone, Serialize)]
struct WireMessage {
    role: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_call_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_calls: Option<Vec<WireToolCall>>,
}

impl From<&Message> for WireMessage {
    fn from(message: &Message) -> Self {
        Self {
            role: message.role.as_str().to_string(),
            content: Some(message.content.clone()),
            tool_call_id: None,
            tool_calls: None,
        }
    }
}

#[derive(Serialize)]
struct WireTool {
    r#type: &'static str,
    function: ToolDescriptor,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct WireToolCall {
    id: String,
    #[serde(default = "function_type")]
    r#type: String,
    function: WireFunctionCall,
}

fn function_type() -> String {
    "function".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct WireFunctionCall {
    name: String,
    arguments: String,
}

#[derive(Deserialize)]
struct WireResponse {
    choices: Vec<WireChoice>,
}

#[derive(Deserialize)]
struct WireChoice {
    message: WireResponseMessage,
}

#[derive(Deserialize)]
struct WireResponseMessage {
    content: Option<String>,
    #[serde(default)]
    tool_calls: Vec<WireToolCall>,
}

fn wire_messages(request: &ChatRequest) -> Vec<WireMessage> {
    let mut messages = Vec::with_capacity(request.messages.len() + 1);
    messages.push(WireMessage::from(&Message::system(request.system_prompt.clone())));
    messages.extend(request.messages.iter().map(WireMessage::from));
    messages
}

fn wire_tools(tools: Option<&dyn ToolExecutor>) -> Option<Vec<WireTool>> {
    let descriptors = tools?.descriptors();
    if descriptors.is_empty() {
        return None;
    }
    Some(
        descriptors
            .into_iter()
            .map(|function| WireTool {
                r#type: "function",
                function,
            })
            .collect(),
    )
}

/// Tool arguments arrive as a JSON string; a blank string means no arguments.
fn parse_arguments(raw: &str) -> Result<Value, serde_json::Error> {
    if raw.trim().is_empty() {
        return Ok(Value::Object(Default::default()));
    }
    serde_json::from_str(raw)
}

#[async_trait]
impl ChatModel for OpenAiClient {
    fn model(&self) -> &str {
        &self.model
    }

    async fn complete(
        &self,
        request: ChatRequest,
        tools: Option<&dyn ToolExecutor>,
    ) -> Result<String, ModelError> {
        let api_key = self.api_key.as_deref().ok_or(ModelError::MissingApiKey)?;
        let mut messages = wire_messages(&request);

        for turn in 1..=request.max_turns.max(1) {
            let body = WireRequest {
                model: &self.model,
                messages: &messages,
                tools: wire_tools(tools),
            };
            let response = self.send(api_key, &body).await?;
            let choice = response
                .choices
                .into_iter()
                .next()
                .ok_or(ModelError::EmptyResponse)?;

            let executor = match tools {
                Some(executor) if !choice.message.tool_calls.is_empty() => executor,
                _ => return choice.message.content.ok_or(ModelError::EmptyResponse),
            };

            let calls = choice.message.tool_calls;
            messages.push(WireMessage {
                role: "assistant".to_string(),
                content: choice.message.content,
                tool_call_id: None,
                tool_calls: Some(calls.clone()),
            });

            for call in calls {
                tracing::info!(turn, tool = %call.function.name, "Model requested tool");
                let result = match parse_arguments(&call.function.arguments) {
                    Ok(arguments) => executor.call(&call.function.name, arguments),
                    Err(e) => {
                        tracing::warn!(tool = %call.function.name, error = %e, "Invalid tool arguments");
                        serde_json::json!({"error": format!("Invalid JSON arguments: {}", e)})
                    }
                };
                messages.push(WireMessage {
                    role: "tool".to_string(),
                    content: Some(result.to_string()),
                    tool_call_id: Some(call.id),
                    tool_calls: None,
                });
            }
        }

        Err(ModelError::ToolLoopExhausted {
            turns: request.max_turns,
        })
    }
}
