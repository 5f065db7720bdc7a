//! Bounded tool-calling conversation with the reasoning service.
//!
//! The loop is an explicit state machine:
//!
//! - `AwaitingModel`: send the whole conversation. A plain answer moves to
//!   `Done`, tool calls move to `ExecutingTools`.
//! - `ExecutingTools`: run every pending call, append one tool message per
//!   call id, and go back to `AwaitingModel`.
//!
//! After `max_rounds` tool rounds the model gets one last request with
//! `tool_choice = none`. Asking for tools again at that point fails the loop.

use council_core::{
    ChatMessage, ChatRequest, CouncilEvent, LlmResponse, LlmToolCall, ToolChoice, ToolDefinition, ToolHost,
    ToolResult,
};
use council_llm::LlmClient;
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::tool_bridge;

pub const DEFAULT_MAX_ROUNDS: usize = 6;

#[derive(Debug, thiserror::Error)]
pub enum ToolLoopError {
    #[error("reasoning service request failed: {0:#}")]
    Service(anyhow::Error),
    #[error("tool loop exceeded its {}s deadline", .0.as_secs())]
    DeadlineExceeded(Duration),
    #[error("model kept requesting tools after {0} rounds")]
    RoundLimit(usize),
}

#[derive(Debug, Clone)]
pub struct ToolCallRecord {
    pub tool_name: String,
    pub tool_call_id: String,
    pub success: bool,
    pub duration_ms: u64,
}

#[derive(Debug, Clone)]
pub struct ToolLoopResult {
    /// Final text from the model.
    pub response: String,
    /// `length` means the answer was cut off by `max_tokens`.
    pub finish_reason: String,
    pub tool_calls_made: Vec<ToolCallRecord>,
    /// Tool rounds executed.
    pub rounds: usize,
    /// Requests sent to the model.
    pub turns: usize,
}

/// Receives tool events as they happen.
pub type EventCallback = Arc<dyn Fn(CouncilEvent) + Send + Sync>;

pub struct ToolLoopConfig {
    pub model: String,
    pub max_tokens: u32,
    pub temperature: Option<f32>,
    pub max_rounds: usize,
    /// Wall-clock budget for the whole conversation.
    pub deadline: Duration,
    /// Attributed in emitted events.
    pub advisor_id: String,
}

impl Default for ToolLoopConfig {
    fn default() -> Self {
        Self {
            model: "gpt-4o-mini".to_string(),
            max_tokens: 600,
            temperature: None,
            max_rounds: DEFAULT_MAX_ROUNDS,
            deadline: Duration::from_secs(180),
            advisor_id: String::new(),
        }
    }
}

enum LoopState {
    AwaitingModel,
    ExecutingTools(Vec<LlmToolCall>),
    Done(LlmResponse),
    Failed(ToolLoopError),
}

pub struct ToolUseLoop<'a> {
    llm: &'a (dyn LlmClient + Send + Sync),
    tool_host: &'a (dyn ToolHost + Send + Sync),
    config: ToolLoopConfig,
    messages: Vec<ChatMessage>,
    tools: Vec<ToolDefinition>,
    rounds: usize,
    turns: usize,
    records: Vec<ToolCallRecord>,
    event_cb: Option<EventCallback>,
}

impl<'a> ToolUseLoop<'a> {
    pub fn new(
        llm: &'a (dyn LlmClient + Send + Sync),
        tool_host: &'a (dyn ToolHost + Send + Sync),
        config: ToolLoopConfig,
        system_prompt: String,
        user_prompt: String,
    ) -> Self {
        let tools = tool_host.definitions();
        Self {
            llm,
            tool_host,
            config,
            messages: vec![
                ChatMessage::System {
                    content: system_prompt,
                },
                ChatMessage::User {
                    content: user_prompt,
                },
            ],
            tools,
            rounds: 0,
            turns: 0,
            records: Vec::new(),
            event_cb: None,
        }
    }

    pub fn with_event_callback(mut self, cb: EventCallback) -> Self {
        self.event_cb = Some(cb);
        self
    }

    pub fn run(mut self) -> Result<ToolLoopResult, ToolLoopError> {
        let started = Instant::now();
        let mut state = LoopState::AwaitingModel;
        loop {
            state = match state {
                LoopState::AwaitingModel => {
                    if started.elapsed() >= self.config.deadline {
                        LoopState::Failed(ToolLoopError::DeadlineExceeded(self.config.deadline))
                    } else {
                        self.request_model(started)
                    }
                }
                LoopState::ExecutingTools(calls) => self.execute_tools(calls),
                LoopState::Done(response) => {
                    return Ok(ToolLoopResult {
                        response: response.text,
                        finish_reason: response.finish_reason,
                        tool_calls_made: self.records,
                        rounds: self.rounds,
                        turns: self.turns,
                    });
                }
                LoopState::Failed(err) => return Err(err),
            };
        }
    }

    fn request_model(&mut self, started: Instant) -> LoopState {
        let tools_allowed = self.rounds < self.config.max_rounds;
        let request = ChatRequest {
            model: self.config.model.clone(),
            messages: self.messages.clone(),
            tools: self.tools.clone(),
            tool_choice: if tools_allowed {
                ToolChoice::auto()
            } else {
                ToolChoice::none()
            },
            max_tokens: self.config.max_tokens,
            temperature: self.config.temperature,
            timeout: Some(self.config.deadline.saturating_sub(started.elapsed())),
        };
        let response = match self.llm.complete_chat(&request) {
            Ok(response) => response,
            Err(err) => return LoopState::Failed(ToolLoopError::Service(err)),
        };
        self.turns += 1;
        // A reply that lands after the deadline is discarded.
        if started.elapsed() >= self.config.deadline {
            return LoopState::Failed(ToolLoopError::DeadlineExceeded(self.config.deadline));
        }

        if response.tool_calls.is_empty() {
            return LoopState::Done(response);
        }
        if !tools_allowed {
            return LoopState::Failed(ToolLoopError::RoundLimit(self.rounds));
        }
        self.messages.push(ChatMessage::Assistant {
            content: Some(response.text).filter(|t| !t.is_empty()),
            tool_calls: response.tool_calls.clone(),
        });
        LoopState::ExecutingTools(response.tool_calls)
    }

    fn execute_tools(&mut self, calls: Vec<LlmToolCall>) -> LoopState {
        self.rounds += 1;
        for call in calls {
            let started = Instant::now();
            let result = match tool_bridge::parse_tool_arguments(&call) {
                Ok(args) => self.tool_host.dispatch(&call.name, &args),
                Err(message) => ToolResult::error(message),
            };
            let duration_ms = started.elapsed().as_millis() as u64;
            self.messages
                .push(tool_bridge::tool_result_to_message(&call.id, &result));
            if let Some(cb) = &self.event_cb {
                cb(CouncilEvent::ToolInvoked {
                    advisor_id: self.config.advisor_id.clone(),
                    tool: call.name.clone(),
                    success: result.success,
                    duration_ms,
                });
            }
            self.records.push(ToolCallRecord {
                tool_name: call.name,
                tool_call_id: call.id,
                success: result.success,
                duration_ms,
            });
        }
        LoopState::AwaitingModel
    }
}
