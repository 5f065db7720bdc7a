//! Conversions between model tool calls and the council tool host.

use council_core::{ChatMessage, LlmToolCall, ToolResult};
use serde_json::{Value, json};

/// Maximum characters of tool output fed back to the model.
pub const MAX_TOOL_OUTPUT_CHARS: usize = 25_000;

/// Parse the raw argument string. An empty string means no arguments.
pub fn parse_tool_arguments(call: &LlmToolCall) -> Result<Value, String> {
    let raw = call.arguments.trim();
    if raw.is_empty() {
        return Ok(json!({}));
    }
    serde_json::from_str(raw).map_err(|err| format!("arguments are not valid JSON: {err}"))
}

/// Feed a tool result back to the model as JSON text.
pub fn tool_result_to_message(tool_call_id: &str, result: &ToolResult) -> ChatMessage {
    ChatMessage::Tool {
        tool_call_id: tool_call_id.to_string(),
        content: truncate_output(&result.output.to_string(), MAX_TOOL_OUTPUT_CHARS),
    }
}

fn truncate_output(text: &str, max_chars: usize) -> String {
    if text.len() <= max_chars {
        return text.to_string();
    }
    let boundary = text
        .char_indices()
        .take_while(|(i, _)| *i < max_chars.saturating_sub(80))
        .last()
        .map(|(i, c)| i + c.len_utf8())
        .unwrap_or(0);
    format!(
        "{}\n[output truncated: showing {boundary}/{} chars]",
        &text[..boundary],
        text.len()
    )
}
