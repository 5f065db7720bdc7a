use anyhow::Result;
use council_agent::{CouncilEngine, ToolLoopError};
use council_core::CouncilError;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::io::{BufRead, Write};

/// JSON-RPC 2.0 request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcRequest {
    pub jsonrpc: String,
    #[serde(default)]
    pub id: Value,
    pub method: String,
    #[serde(default)]
    pub params: Value,
}

/// JSON-RPC 2.0 response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcResponse {
    pub jsonrpc: String,
    pub id: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<JsonRpcError>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcError {
    pub code: i64,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

// Standard JSON-RPC error codes.
pub const ERR_PARSE: i64 = -32700;
pub const ERR_METHOD_NOT_FOUND: i64 = -32601;
pub const ERR_INVALID_PARAMS: i64 = -32602;
pub const ERR_INTERNAL: i64 = -32603;

// Application-level error codes.
pub const ERR_ADVISOR_NOT_FOUND: i64 = -32000;
pub const ERR_NO_DRAFT: i64 = -32001;
pub const ERR_REASONING_SERVICE: i64 = -32002;

impl JsonRpcResponse {
    pub fn success(id: Value, result: Value) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            id,
            result: Some(result),
            error: None,
        }
    }

    pub fn error(id: Value, code: i64, message: impl Into<String>) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            id,
            result: None,
            error: Some(JsonRpcError {
                code,
                message: message.into(),
                data: None,
            }),
        }
    }
}

#[derive(Debug, thiserror::Error)]
#[error("method not found: {0}")]
pub struct MethodNotFound(pub String);

/// Pick the wire error code for a handler failure.
pub fn error_code(err: &anyhow::Error) -> i64 {
    if err.downcast_ref::<MethodNotFound>().is_some() {
        return ERR_METHOD_NOT_FOUND;
    }
    if err.downcast_ref::<ToolLoopError>().is_some() {
        return ERR_REASONING_SERVICE;
    }
    match err.downcast_ref::<CouncilError>() {
        Some(CouncilError::Validation(_)) => ERR_INVALID_PARAMS,
        Some(CouncilError::UnknownAdvisor(_)) => ERR_ADVISOR_NOT_FOUND,
        Some(CouncilError::MissingDraft(_)) => ERR_NO_DRAFT,
        _ => ERR_INTERNAL,
    }
}

pub trait RpcHandler {
    fn handle(&self, method: &str, params: Value) -> Result<Value>;
}

/// Serve newline-delimited JSON-RPC until EOF or `shutdown`.
pub fn serve<R: BufRead, W: Write>(handler: &dyn RpcHandler, reader: R, mut writer: W) -> Result<()> {
    for line in reader.lines() {
        let line = line?;
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }

        let response = match serde_json::from_str::<JsonRpcRequest>(trimmed) {
            Ok(req) => {
                if req.method == "shutdown" {
                    let resp = JsonRpcResponse::success(req.id, json!({"ok": true}));
                    writeln!(writer, "{}", serde_json::to_string(&resp)?)?;
                    writer.flush()?;
                    return Ok(());
                }
                match handler.handle(&req.method, req.params) {
                    Ok(result) => JsonRpcResponse::success(req.id, result),
                    Err(e) => JsonRpcResponse::error(req.id, error_code(&e), format!("{e:#}")),
                }
            }
            Err(_) => JsonRpcResponse::error(Value::Null, ERR_PARSE, "Parse error"),
        };

        writeln!(writer, "{}", serde_json::to_string(&response)?)?;
        writer.flush()?;
    }
    Ok(())
}

pub fn run_stdio_server(handler: &dyn RpcHandler) -> Result<()> {
    let stdin = std::io::stdin();
    let stdout = std::io::stdout();
    serve(handler, stdin.lock(), stdout.lock())
}

pub const METHODS: &[&str] = &[
    "initialize",
    "state",
    "updated",
    "council",
    "world",
    "threats",
    "armies",
    "chat",
    "history",
    "input",
    "plan",
    "response",
    "commit",
    "speak",
    "reset",
    "world/update",
    "tool/call",
    "shutdown",
];

/// Serves every council operation from one engine.
pub struct CouncilRpcHandler {
    engine: CouncilEngine,
}

impl CouncilRpcHandler {
    pub fn new(engine: CouncilEngine) -> Self {
        Self { engine }
    }
}

impl RpcHandler for CouncilRpcHandler {
    fn handle(&self, method: &str, params: Value) -> Result<Value> {
        let engine = &self.engine;
        match method {
            "initialize" => Ok(json!({
                "name": "council",
                "version": env!("CARGO_PKG_VERSION"),
                "capabilities": METHODS,
            })),
            "state" => Ok(serde_json::to_value(engine.snapshot()?)?),
            "updated" => Ok(json!({"updatedIndex": engine.updated_index()?})),
            "council" => Ok(json!({"council": engine.data().public_council()})),
            "world" => Ok(serde_json::to_value(&engine.data().world)?),
            "threats" => Ok(serde_json::to_value(&engine.data().threats)?),
            "armies" => Ok(serde_json::to_value(&engine.data().armies)?),
            "chat" => Ok(json!({"chat": engine.chat()?})),
            "history" => Ok(json!({"history": engine.history(advisor_id(&params))?})),
            "input" => {
                engine.record_input(
                    str_param(&params, "from"),
                    params.get("targetName").and_then(Value::as_str),
                    str_param(&params, "text"),
                )?;
                Ok(json!({"ok": true}))
            }
            "plan" => {
                engine.set_plan(str_param(&params, "from"), str_param(&params, "text"))?;
                Ok(json!({"ok": true}))
            }
            "response" => Ok(json!({"draft": engine.generate_response(advisor_id(&params))?})),
            "commit" => Ok(json!({"committed": engine.commit(advisor_id(&params))?})),
            "speak" => Ok(json!({"text": engine.speak(advisor_id(&params))?})),
            "reset" => {
                engine.reset()?;
                Ok(json!({"ok": true}))
            }
            "world/update" => {
                engine.add_world_update(str_param(&params, "text"))?;
                Ok(json!({"ok": true, "updatedIndex": engine.updated_index()?}))
            }
            "tool/call" => {
                let name = str_param(&params, "name");
                let args = params.get("arguments").cloned().unwrap_or_else(|| json!({}));
                Ok(serde_json::to_value(engine.call_tool(name, &args))?)
            }
            _ => Err(MethodNotFound(method.to_string()).into()),
        }
    }
}

fn str_param<'a>(params: &'a Value, key: &str) -> &'a str {
    params.get(key).and_then(Value::as_str).unwrap_or_default()
}

/// `advisorId`, or the older `councilorId` spelling.
fn advisor_id(params: &Value) -> &str {
    params
        .get("advisorId")
        .or_else(|| params.get("councilorId"))
        .and_then(Value::as_str)
        .unwrap_or_default()
}
