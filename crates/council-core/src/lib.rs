use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use uuid::Uuid;

mod config;
mod data;

pub use config::{
    AppConfig, CouncilConfig, LlmConfig, MAX_SENTENCES, MIN_MAX_WORDS, MIN_SENTENCES,
};
pub use data::{
    Advisor, AdvisorPublic, Army, ArmyRoster, City, CouncilData, Hamlet, NotableLocation, Route,
    Threat, ThreatRoster, Town, WorldMap,
};

pub type Result<T> = anyhow::Result<T>;

/// Speech used when the model's final answer cannot be parsed.
pub const FALLBACK_PLAN_SPEECH: &str =
    "I do not know. What is the specific plan you want me to evaluate?";

pub fn runtime_dir(workspace: &Path) -> PathBuf {
    workspace.join(".council")
}

/// Typed failures that callers branch on. Everything else travels as
/// `anyhow::Error`.
#[derive(thiserror::Error, Debug)]
pub enum CouncilError {
    #[error("{0}")]
    Validation(String),
    #[error("advisor not found: {0}")]
    UnknownAdvisor(String),
    #[error("no draft to commit for advisor {0}")]
    MissingDraft(String),
    #[error("failed to persist session state: {0}")]
    Persistence(String),
    #[error("invalid council data: {0}")]
    InvalidData(String),
}

// ── Response payloads ──────────────────────────────────────────────────

/// Result of one advisor-response cycle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResponsePayload {
    /// 0..=10, or `None` when there is no plan to rate.
    pub support: Option<u8>,
    pub speech: String,
}

impl ResponsePayload {
    #[must_use]
    pub fn fallback() -> Self {
        Self {
            support: None,
            speech: FALLBACK_PLAN_SPEECH.to_string(),
        }
    }

    #[must_use]
    pub fn stamped(self, ts: DateTime<Utc>) -> StampedResponse {
        StampedResponse {
            support: self.support,
            speech: self.speech,
            ts,
        }
    }
}

/// A draft or committed response with the time it was recorded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StampedResponse {
    pub support: Option<u8>,
    pub speech: String,
    pub ts: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HistoryKind {
    Draft,
    Commit,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    #[serde(rename = "type")]
    pub kind: HistoryKind,
    pub support: Option<u8>,
    pub speech: String,
    pub ts: DateTime<Utc>,
}

impl HistoryEntry {
    #[must_use]
    pub fn new(kind: HistoryKind, response: &StampedResponse) -> Self {
        Self {
            kind,
            support: response.support,
            speech: response.speech.clone(),
            ts: response.ts,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatEntry {
    pub id: Uuid,
    pub from: String,
    pub target_name: Option<String>,
    pub text: String,
    pub ts: DateTime<Utc>,
}

impl ChatEntry {
    #[must_use]
    pub fn new(from: &str, target_name: Option<&str>, text: &str) -> Self {
        Self {
            id: Uuid::new_v4(),
            from: from.to_string(),
            target_name: target_name
                .map(str::trim)
                .filter(|t| !t.is_empty())
                .map(ToString::to_string),
            text: text.to_string(),
            ts: Utc::now(),
        }
    }

    /// `SPEAKER: @target text`, as shown in the prompt transcript.
    #[must_use]
    pub fn transcript_line(&self) -> String {
        let target = self
            .target_name
            .as_ref()
            .map(|t| format!("@{t} "))
            .unwrap_or_default();
        format!("{}: {target}{}", self.from.to_uppercase(), self.text)
    }
}

// ── Tools ──────────────────────────────────────────────────────────────

/// The closed set of world-knowledge tools offered to the model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ToolName {
    TravelTime,
    ThreatFuture,
    Armies,
    CouncilPublic,
}

impl ToolName {
    pub const ALL: [ToolName; 4] = [
        ToolName::TravelTime,
        ToolName::ThreatFuture,
        ToolName::Armies,
        ToolName::CouncilPublic,
    ];

    #[must_use]
    pub fn from_api_name(s: &str) -> Option<Self> {
        Some(match s {
            "get_travel_time" => Self::TravelTime,
            "get_threat_future" => Self::ThreatFuture,
            "get_armies" => Self::Armies,
            "get_council_public" => Self::CouncilPublic,
            _ => return None,
        })
    }

    #[must_use]
    pub fn as_api_name(self) -> &'static str {
        match self {
            Self::TravelTime => "get_travel_time",
            Self::ThreatFuture => "get_threat_future",
            Self::Armies => "get_armies",
            Self::CouncilPublic => "get_council_public",
        }
    }
}

/// Outcome of a dispatched tool. Failures carry `{"error": ...}` in `output`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolResult {
    pub success: bool,
    pub output: serde_json::Value,
}

impl ToolResult {
    #[must_use]
    pub fn ok(output: serde_json::Value) -> Self {
        Self {
            success: true,
            output,
        }
    }

    #[must_use]
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            success: false,
            output: serde_json::json!({ "error": message.into() }),
        }
    }
}

/// Executes the world-knowledge tools the model is allowed to call.
pub trait ToolHost {
    /// Schemas offered to the model on every tool-enabled round.
    fn definitions(&self) -> Vec<ToolDefinition>;
    /// Run one call. Never fails: problems come back as error results.
    fn dispatch(&self, name: &str, args: &serde_json::Value) -> ToolResult;
}

// ── Chat-with-tools types ──────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LlmToolCall {
    pub id: String,
    pub name: String,
    /// Raw JSON argument string exactly as the model produced it.
    pub arguments: String,
}

fn default_finish_reason() -> String {
    "stop".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmResponse {
    pub text: String,
    #[serde(default = "default_finish_reason")]
    pub finish_reason: String,
    #[serde(default)]
    pub tool_calls: Vec<LlmToolCall>,
}

/// A message in a multi-turn conversation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "role")]
pub enum ChatMessage {
    #[serde(rename = "system")]
    System { content: String },
    #[serde(rename = "user")]
    User { content: String },
    #[serde(rename = "assistant")]
    Assistant {
        #[serde(skip_serializing_if = "Option::is_none")]
        content: Option<String>,
        #[serde(skip_serializing_if = "Vec::is_empty", default)]
        tool_calls: Vec<LlmToolCall>,
    },
    #[serde(rename = "tool")]
    Tool {
        tool_call_id: String,
        content: String,
    },
}

/// A tool (function) definition sent to the model.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolDefinition {
    #[serde(rename = "type")]
    pub tool_type: String,
    pub function: FunctionDefinition,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FunctionDefinition {
    pub name: String,
    pub description: String,
    pub parameters: serde_json::Value,
}

/// "none", "auto" or "required".
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ToolChoice(pub String);

impl ToolChoice {
    pub fn auto() -> Self {
        Self("auto".to_string())
    }
    pub fn none() -> Self {
        Self("none".to_string())
    }
}

#[derive(Debug, Clone)]
pub struct ChatRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    pub tools: Vec<ToolDefinition>,
    pub tool_choice: ToolChoice,
    pub max_tokens: u32,
    pub temperature: Option<f32>,
    /// Upper bound for this round trip, tighter than the client default.
    pub timeout: Option<Duration>,
}

// ── Observability events ───────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload")]
pub enum CouncilEvent {
    ToolInvoked {
        advisor_id: String,
        tool: String,
        success: bool,
        duration_ms: u64,
    },
    ResponseGenerated {
        advisor_id: String,
        rounds: usize,
        tool_calls: usize,
        parsed: bool,
    },
    ResponseFailed {
        advisor_id: String,
        error: String,
    },
    StateMutated {
        operation: String,
        updated_index: u64,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventEnvelope {
    pub at: DateTime<Utc>,
    pub kind: CouncilEvent,
}

impl EventEnvelope {
    #[must_use]
    pub fn now(kind: CouncilEvent) -> Self {
        Self {
            at: Utc::now(),
            kind,
        }
    }
}
