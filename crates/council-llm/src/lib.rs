use anyhow::{Result, anyhow};
use council_core::{ChatMessage, ChatRequest, LlmConfig, LlmResponse, LlmToolCall};
use reqwest::StatusCode;
use reqwest::blocking::Client;
use serde_json::{Value, json};
use std::error::Error as StdError;
use std::time::Duration;

/// A chat-completions backend that understands function calling.
pub trait LlmClient {
    /// Send the whole conversation plus tool schemas and return the next
    /// assistant turn. Failures are not retried.
    fn complete_chat(&self, req: &ChatRequest) -> Result<LlmResponse>;
}

/// OpenAI-compatible `/chat/completions` client.
#[derive(Debug, Clone)]
pub struct ChatCompletionsClient {
    cfg: LlmConfig,
    client: Client,
}

impl ChatCompletionsClient {
    pub fn new(cfg: LlmConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(cfg.timeout_seconds.max(1)))
            .build()?;
        Ok(Self { cfg, client })
    }

    fn build_chat_payload(&self, req: &ChatRequest) -> Value {
        let messages: Vec<Value> = req
            .messages
            .iter()
            .map(|m| match m {
                ChatMessage::System { content } => json!({"role": "system", "content": content}),
                ChatMessage::User { content } => json!({"role": "user", "content": content}),
                ChatMessage::Assistant {
                    content,
                    tool_calls,
                } => {
                    let mut msg = json!({"role": "assistant", "content": content});
                    if !tool_calls.is_empty() {
                        let tc: Vec<Value> = tool_calls
                            .iter()
                            .map(|tc| {
                                json!({
                                    "id": tc.id,
                                    "type": "function",
                                    "function": {
                                        "name": tc.name,
                                        "arguments": tc.arguments
                                    }
                                })
                            })
                            .collect();
                        msg["tool_calls"] = json!(tc);
                    }
                    msg
                }
                ChatMessage::Tool {
                    tool_call_id,
                    content,
                } => json!({"role": "tool", "tool_call_id": tool_call_id, "content": content}),
            })
            .collect();

        let mut payload = json!({
            "model": req.model,
            "messages": messages,
            "max_tokens": req.max_tokens,
        });
        if let Some(temp) = req.temperature {
            payload["temperature"] = json!(temp);
        }
        if !req.tools.is_empty() {
            payload["tools"] = serde_json::to_value(&req.tools).unwrap_or(json!([]));
            payload["tool_choice"] = serde_json::to_value(&req.tool_choice).unwrap_or(json!("auto"));
        }
        payload
    }
}

impl LlmClient for ChatCompletionsClient {
    fn complete_chat(&self, req: &ChatRequest) -> Result<LlmResponse> {
        let key = self
            .cfg
            .resolve_api_key()
            .ok_or_else(|| anyhow!("{} not set and llm.api_key is empty", self.cfg.api_key_env))?;
        let payload = self.build_chat_payload(req);

        let mut builder = self
            .client
            .post(&self.cfg.endpoint)
            .bearer_auth(key)
            .json(&payload);
        if let Some(timeout) = req.timeout {
            builder = builder.timeout(timeout);
        }
        let resp = builder
            .send()
            .map_err(|e| format_transport_error(&e))?;
        let status = resp.status();
        let body = resp
            .text()
            .map_err(|e| anyhow!("failed to read response body: {e}"))?;
        if !status.is_success() {
            return Err(format_api_error(status, &body));
        }
        parse_non_streaming_payload(&body)
    }
}

/// Produce a readable error from a non-success HTTP response.
fn format_api_error(status: StatusCode, body: &str) -> anyhow::Error {
    let detail = serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|v| {
            v.get("error")
                .and_then(|e| e.get("message").or(Some(e)))
                .and_then(|m| m.as_str().map(ToString::to_string))
        })
        .unwrap_or_else(|| body.chars().take(200).collect());

    match status {
        StatusCode::UNAUTHORIZED => anyhow!(
            "Invalid or missing API key (HTTP 401). Set the configured key environment variable or llm.api_key."
        ),
        StatusCode::TOO_MANY_REQUESTS => anyhow!("Rate limited (HTTP 429): {detail}"),
        StatusCode::INTERNAL_SERVER_ERROR
        | StatusCode::BAD_GATEWAY
        | StatusCode::SERVICE_UNAVAILABLE => anyhow!(
            "Reasoning service error (HTTP {}). The service may be temporarily unavailable: {detail}",
            status.as_u16()
        ),
        _ => anyhow!("Reasoning service error (HTTP {}): {detail}", status.as_u16()),
    }
}

fn format_transport_error(err: &reqwest::Error) -> anyhow::Error {
    let inner = err.source().map(|e| e.to_string()).unwrap_or_default();
    if err.is_timeout() {
        anyhow!("Request timed out: the reasoning service did not respond in time (llm.timeout_seconds).")
    } else if err.is_connect() {
        anyhow!("Could not reach the reasoning service at the configured endpoint: {inner}")
    } else {
        anyhow!("Network error: {err}")
    }
}

fn parse_non_streaming_payload(body: &str) -> Result<LlmResponse> {
    let value: Value = serde_json::from_str(body)?;
    let Some(choice) = value
        .get("choices")
        .and_then(|v| v.as_array())
        .and_then(|arr| arr.first())
    else {
        return Err(anyhow!("unexpected completion payload: missing choices[0]"));
    };
    let finish_reason = choice
        .get("finish_reason")
        .and_then(|v| v.as_str())
        .unwrap_or("stop")
        .to_string();
    let message = choice.get("message").cloned().unwrap_or_else(|| json!({}));
    let text = message
        .get("content")
        .and_then(|v| v.as_str())
        .unwrap_or_default()
        .to_string();
    let tool_calls = message
        .get("tool_calls")
        .map(parse_tool_calls_array)
        .unwrap_or_default();
    Ok(LlmResponse {
        text,
        finish_reason,
        tool_calls,
    })
}

fn parse_tool_calls_array(value: &Value) -> Vec<LlmToolCall> {
    let Some(items) = value.as_array() else {
        return Vec::new();
    };
    items
        .iter()
        .enumerate()
        .map(|(idx, item)| {
            // Nameless calls are kept so the tool host can answer them with
            // an error the model gets to see.
            let function = item.get("function");
            let name = function
                .and_then(|f| f.get("name"))
                .and_then(|v| v.as_str())
                .unwrap_or_default()
                .trim()
                .to_string();
            // Some backends send arguments as an object rather than a string.
            let arguments = match function.and_then(|f| f.get("arguments")) {
                Some(Value::String(raw)) => raw.clone(),
                Some(other) => other.to_string(),
                None => "{}".to_string(),
            };
            let id = item
                .get("id")
                .and_then(|v| v.as_str())
                .filter(|id| !id.trim().is_empty())
                .map(ToString::to_string)
                .unwrap_or_else(|| format!("tool_call_{}", idx + 1));
            LlmToolCall {
                id,
                name,
                arguments,
            }
        })
        .collect()
}
