//! OpenAI-compatible provider implementation
//!
//! Works with OpenAI, Ollama, vLLM, and other OpenAI-compatible APIs.
//! The wire types here are shared with the Azure provider, which speaks
//! the same chat-completions format behind a different URL and auth header.

use lokql_error::{Error, Result};
use reqwest::Client;
use serde::{Deserialize, Serialize};

use super::{api_error, ChatMessage, CompletionRequest, CompletionResponse, FinishReason,
    LlmProvider, Role, ToolCall, Usage};
use crate::config::{ProviderConfig, ProviderType};

/// OpenAI-compatible provider
pub struct OpenAiProvider {
    client: Client,
    config: ProviderConfig,
}

impl OpenAiProvider {
    pub fn new(config: ProviderConfig) -> Self {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_secs.unwrap_or(120)))
            .build()
            .expect("Failed to create HTTP client");

        Self { client, config }
    }

    fn base_url(&self) -> &str {
        self.config.base_url.as_deref().unwrap_or("https://api.openai.com/v1")
    }
}

impl LlmProvider for OpenAiProvider {
    fn name(&self) -> &str {
        match self.config.provider_type {
            ProviderType::Ollama => "ollama",
            _ => "openai",
        }
    }

    fn default_model(&self) -> &str {
        self.config.model.as_deref().unwrap_or("gpt-4o")
    }

    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse> {
        let model = request.model.as_deref().unwrap_or(self.default_model());
        let temperature = request.temperature.unwrap_or(self.config.temperature);
        let api_request = to_wire_request(model, temperature, &request);

        let url = format!("{}/chat/completions", self.base_url().trim_end_matches('/'));
        let mut req = self.client.post(&url).json(&api_request);

        if let Some(api_key) = &self.config.api_key {
            if !api_key.is_empty() {
                req = req.header("Authorization", format!("Bearer {}", api_key));
            }
        }

        let response = req.send().await.map_err(|e| {
            Error::provider_unavailable(e.to_string())
                .with_operation("provider::complete")
                .with_context("url", &url)
                .set_source(e)
        })?;

        let status = response.status().as_u16();
        if !response.status().is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(api_error(status, text).with_operation("provider::complete"));
        }

        let api_response: WireResponse = response.json().await.map_err(|e| {
            Error::parse_failed(format!("invalid completion body: {}", e))
                .with_operation("provider::complete")
                .set_source(e)
        })?;

        from_wire_response(api_response)
    }
}

// ============================================================================
// Chat-completions wire types (shared with the Azure provider)
// ============================================================================

pub(crate) fn to_wire_request(
    model: &str,
    temperature: f32,
    request: &CompletionRequest,
) -> WireRequest {
    WireRequest {
        model: model.to_string(),
        messages: request.messages.iter().map(|m| WireMessage::from(m.clone())).collect(),
        temperature: Some(temperature),
        max_tokens: request.max_tokens,
        tools: request.tools.as_ref().map(|tools| {
            tools
                .iter()
                .map(|t| WireTool {
                    r#type: "function".into(),
                    function: WireFunction {
                        name: t.name.clone(),
                        description: Some(t.description.clone()),
                        parameters: Some(t.parameters.clone()),
                    },
                })
                .collect()
        }),
    }
}

pub(crate) fn from_wire_response(api_response: WireResponse) -> Result<CompletionResponse> {
    let choice = api_response
        .choices
        .into_iter()
        .next()
        .ok_or_else(|| Error::completion_failed("no choices in response"))?;

    let tool_calls = choice
        .message
        .tool_calls
        .unwrap_or_default()
        .into_iter()
        .map(|tc| ToolCall {
            id: tc.id,
            name: tc.function.name,
            arguments: tc.function.arguments,
        })
        .collect();

    let finish_reason = match choice.finish_reason.as_deref() {
        Some("stop") => FinishReason::Stop,
        Some("length") => FinishReason::Length,
        Some("tool_calls") => FinishReason::ToolCalls,
        Some("content_filter") => FinishReason::ContentFilter,
        _ => FinishReason::Unknown,
    };

    let usage = api_response
        .usage
        .map(|u| Usage {
            prompt_tokens: u.prompt_tokens,
            completion_tokens: u.completion_tokens,
            total_tokens: u.total_tokens,
        })
        .unwrap_or_default();

    Ok(CompletionResponse {
        id: api_response.id,
        model: api_response.model,
        content: choice.message.content,
        tool_calls,
        finish_reason,
        usage,
    })
}

#[derive(Debug, Serialize)]
pub(crate) struct WireRequest {
    model: String,
    messages: Vec<WireMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tools: Option<Vec<WireTool>>,
}

#[derive(Debug, Serialize, Deserialize)]
struct WireMessage {
    role: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_calls: Option<Vec<WireToolCall>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_call_id: Option<String>,
}

impl From<ChatMessage> for WireMessage {
    fn from(msg: ChatMessage) -> Self {
        Self {
            role: match msg.role {
                Role::System => "system".into(),
                Role::User => "user".into(),
                Role::Assistant => "assistant".into(),
                Role::Tool => "tool".into(),
            },
            content: msg.content,
            tool_calls: msg.tool_calls.map(|tcs| {
                tcs.into_iter()
                    .map(|tc| WireToolCall {
                        id: tc.id,
                        r#type: "function".into(),
                        function: WireFunctionCall {
                            name: tc.name,
                            arguments: tc.arguments,
                        },
                    })
                    .collect()
            }),
            tool_call_id: msg.tool_call_id,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct WireTool {
    r#type: String,
    function: WireFunction,
}

#[derive(Debug, Serialize, Deserialize)]
struct WireFunction {
    name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    parameters: Option<serde_json::Value>,
}

#[derive(Debug, Serialize, Deserialize)]
struct WireToolCall {
    id: String,
    r#type: String,
    function: WireFunctionCall,
}

#[derive(Debug, Serialize, Deserialize)]
struct WireFunctionCall {
    name: String,
    arguments: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct WireResponse {
    id: String,
    model: String,
    choices: Vec<WireChoice>,
    usage: Option<WireUsage>,
}

#[derive(Debug, Deserialize)]
struct WireChoice {
    message: WireMessage,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct WireUsage {
    prompt_tokens: usize,
    completion_tokens: usize,
    total_tokens: usize,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tool;

    #[test]
    fn test_wire_request_shape() {
        let request = CompletionRequest::new(vec![
            ChatMessage::system("sys"),
            ChatMessage::user("question"),
        ])
        .with_tools(vec![tool::definition()]);

        let wire = to_wire_request("llama3.2", 0.0, &request);
        let json = serde_json::to_value(&wire).unwrap();

        assert_eq!(json["model"], "llama3.2");
        assert_eq!(json["messages"][0]["role"], "system");
        assert_eq!(json["tools"][0]["type"], "function");
        assert_eq!(json["tools"][0]["function"]["name"], "query_loki_logs");
        assert!(json.get("max_tokens").is_none());
    }

    #[test]
    fn test_wire_response_with_tool_call() {
        let body = serde_json::json!({
            "id": "chatcmpl-1",
            "model": "llama3.2",
            "choices": [{
                "message": {
                    "role": "assistant",
                    "content": null,
                    "tool_calls": [{
                        "id": "call_1",
                        "type": "function",
                        "function": {
                            "name": "query_loki_logs",
                            "arguments": "{\"logql\":\"{job=\\\"nginx\\\"}\"}"
                        }
                    }]
                },
                "finish_reason": "tool_calls"
            }],
            "usage": {"prompt_tokens": 10, "completion_tokens": 5, "total_tokens": 15}
        });

        let wire: WireResponse = serde_json::from_value(body).unwrap();
        let response = from_wire_response(wire).unwrap();

        assert_eq!(response.finish_reason, FinishReason::ToolCalls);
        assert_eq!(response.tool_calls.len(), 1);
        assert_eq!(response.tool_calls[0].name, "query_loki_logs");
        assert_eq!(response.usage.total_tokens, 15);
    }

    #[test]
    fn test_wire_response_without_choices() {
        let wire: WireResponse = serde_json::from_value(serde_json::json!({
            "id": "chatcmpl-1",
            "model": "llama3.2",
            "choices": []
        }))
        .unwrap();
        let err = from_wire_response(wire).unwrap_err();
        assert_eq!(err.kind(), lokql_error::ErrorKind::CompletionFailed);
    }

    #[test]
    fn test_tool_result_round_trip() {
        let msg = ChatMessage::tool_result("call_1", "[2024-05-01 12:00:00] {} line");
        let wire = WireMessage::from(msg);
        let json = serde_json::to_value(&wire).unwrap();
        assert_eq!(json["role"], "tool");
        assert_eq!(json["tool_call_id"], "call_1");
    }
}
