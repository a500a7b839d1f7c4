//! JSON-RPC 2.0 tool server over stdio.
//!
//! One message per line. Supports `initialize`, `ping`, `tools/list` and
//! `tools/call`. Tool arguments are validated against each tool's input
//! schema before dispatch. Every call builds a fresh [`RequestContext`].
//!
//! Logs go to stderr; stdout carries protocol messages only.

use std::io::{BufRead, Write};
use std::path::PathBuf;

use anyhow::{Context, Result};
use jsonschema::validator_for;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tracing::{debug, info, instrument, warn};

use crate::context::RequestContext;
use crate::core::types::Status;
use crate::gate::Gate;
use crate::io::process::CommandRunner;

pub const PROTOCOL_VERSION: &str = "2024-11-05";

pub const PARSE_ERROR: i64 = -32700;
pub const INVALID_REQUEST: i64 = -32600;
pub const METHOD_NOT_FOUND: i64 = -32601;
pub const INVALID_PARAMS: i64 = -32602;

pub const TOOL_STATE: &str = "get_fatigue_state";
pub const TOOL_CHECK: &str = "check_dangerous_command";
pub const TOOL_EXECUTE: &str = "execute_command";
pub const TOOL_WRITE: &str = "write_file";

#[derive(Debug, Deserialize)]
struct RpcRequest {
    #[serde(default)]
    jsonrpc: Option<String>,
    #[serde(default)]
    id: Option<Value>,
    method: String,
    #[serde(default)]
    params: Value,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct RpcError {
    pub code: i64,
    pub message: String,
}

impl RpcError {
    fn new(code: i64, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

#[derive(Debug, Serialize)]
struct RpcResponse {
    jsonrpc: &'static str,
    id: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<RpcError>,
}

impl RpcResponse {
    fn reply(id: Value, outcome: std::result::Result<Value, RpcError>) -> Self {
        match outcome {
            Ok(result) => Self {
                jsonrpc: "2.0",
                id,
                result: Some(result),
                error: None,
            },
            Err(error) => Self {
                jsonrpc: "2.0",
                id,
                result: None,
                error: Some(error),
            },
        }
    }
}

/// Description of a tool for `tools/list`.
#[derive(Debug, Clone, Serialize)]
pub struct ToolSpec {
    pub name: &'static str,
    pub description: &'static str,
    #[serde(rename = "inputSchema")]
    pub input_schema: Value,
}

/// The four interlock tools.
pub fn tool_specs() -> Vec<ToolSpec> {
    let override_reason = json!({
        "type": "string",
        "description": "Human-supplied reason. Only set this after the human typed the override phrase."
    });
    vec![
        ToolSpec {
            name: TOOL_STATE,
            description: "Current behavioral metrics, fatigue level and interlock thresholds.",
            input_schema: json!({
                "type": "object",
                "properties": {},
                "additionalProperties": false
            }),
        },
        ToolSpec {
            name: TOOL_CHECK,
            description: "Report whether a shell command would be flagged or blocked. Never runs it.",
            input_schema: json!({
                "type": "object",
                "properties": {
                    "command": {"type": "string", "minLength": 1}
                },
                "required": ["command"],
                "additionalProperties": false
            }),
        },
        ToolSpec {
            name: TOOL_EXECUTE,
            description: "Run a shell command under the fatigue interlock.",
            input_schema: json!({
                "type": "object",
                "properties": {
                    "command": {"type": "string", "minLength": 1},
                    "override_reason": override_reason
                },
                "required": ["command"],
                "additionalProperties": false
            }),
        },
        ToolSpec {
            name: TOOL_WRITE,
            description: "Write a file under the fatigue interlock. Large deletions may be blocked and saved for review.",
            input_schema: json!({
                "type": "object",
                "properties": {
                    "path": {"type": "string", "minLength": 1},
                    "content": {"type": "string"},
                    "override_reason": override_reason
                },
                "required": ["path", "content"],
                "additionalProperties": false
            }),
        },
    ]
}

#[derive(Debug, Deserialize)]
struct CallParams {
    name: String,
    #[serde(default)]
    arguments: Option<Value>,
}

#[derive(Debug, Deserialize)]
struct CommandArgs {
    command: String,
    #[serde(default)]
    override_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct WriteArgs {
    path: PathBuf,
    content: String,
    #[serde(default)]
    override_reason: Option<String>,
}

pub struct Server<R: CommandRunner> {
    gate: Gate<R>,
}

impl<R: CommandRunner> Server<R> {
    pub fn new(gate: Gate<R>) -> Self {
        Self { gate }
    }

    /// Serve requests from `input` until EOF.
    #[instrument(skip_all)]
    pub fn serve<I: BufRead, O: Write>(&self, input: I, mut output: O) -> Result<()> {
        info!("tool server started");
        for line in input.lines() {
            let line = line.context("read request line")?;
            if line.trim().is_empty() {
                continue;
            }
            if let Some(response) = self.handle_line(&line) {
                let mut buf = serde_json::to_string(&response).context("serialize response")?;
                buf.push('\n');
                output
                    .write_all(buf.as_bytes())
                    .context("write response")?;
                output.flush().context("flush response")?;
            }
        }
        info!("tool server input closed");
        Ok(())
    }

    /// Handle one raw message. Notifications produce no response.
    pub fn handle_line(&self, line: &str) -> Option<Value> {
        let value: Value = match serde_json::from_str(line) {
            Ok(value) => value,
            Err(err) => {
                warn!(err = %err, "unparseable request");
                return Some(to_value(RpcResponse::reply(
                    Value::Null,
                    Err(RpcError::new(PARSE_ERROR, format!("parse error: {err}"))),
                )));
            }
        };
        let request: RpcRequest = match serde_json::from_value(value.clone()) {
            Ok(request) => request,
            Err(err) => {
                let id = value.get("id").cloned().unwrap_or(Value::Null);
                return Some(to_value(RpcResponse::reply(
                    id,
                    Err(RpcError::new(INVALID_REQUEST, format!("invalid request: {err}"))),
                )));
            }
        };
        if request.jsonrpc.as_deref().is_some_and(|v| v != "2.0") {
            let id = request.id.unwrap_or(Value::Null);
            return Some(to_value(RpcResponse::reply(
                id,
                Err(RpcError::new(INVALID_REQUEST, "jsonrpc must be \"2.0\"")),
            )));
        }

        debug!(method = %request.method, "request received");
        let Some(id) = request.id else {
            debug!(method = %request.method, "notification ignored");
            return None;
        };
        let outcome = self.dispatch(&request.method, request.params);
        Some(to_value(RpcResponse::reply(id, outcome)))
    }

    fn dispatch(&self, method: &str, params: Value) -> std::result::Result<Value, RpcError> {
        match method {
            "initialize" => Ok(json!({
                "protocolVersion": PROTOCOL_VERSION,
                "capabilities": {"tools": {}},
                "serverInfo": {
                    "name": env!("CARGO_PKG_NAME"),
                    "version": env!("CARGO_PKG_VERSION")
                }
            })),
            "ping" => Ok(json!({})),
            "tools/list" => Ok(json!({ "tools": tool_specs() })),
            "tools/call" => self.call_tool(params),
            other => Err(RpcError::new(
                METHOD_NOT_FOUND,
                format!("method not found: {other}"),
            )),
        }
    }

    #[instrument(skip_all)]
    fn call_tool(&self, params: Value) -> std::result::Result<Value, RpcError> {
        let params: CallParams = serde_json::from_value(params).map_err(|err| {
            RpcError::new(INVALID_PARAMS, format!("invalid tools/call params: {err}"))
        })?;
        let arguments = params.arguments.unwrap_or_else(|| json!({}));
        let spec = tool_specs()
            .into_iter()
            .find(|spec| spec.name == params.name)
            .ok_or_else(|| {
                RpcError::new(INVALID_PARAMS, format!("unknown tool: {}", params.name))
            })?;
        validate_arguments(&spec.input_schema, &arguments)?;
        info!(tool = spec.name, "tool call");

        let ctx = match self.gate.load_context() {
            Ok(ctx) => ctx,
            Err(err) => return Ok(tool_error(&format!("interlock unavailable: {err:#}"))),
        };
        let structured = self.run_tool(spec.name, &ctx, arguments)?;
        Ok(tool_result(structured))
    }

    fn run_tool(
        &self,
        name: &str,
        ctx: &RequestContext,
        arguments: Value,
    ) -> std::result::Result<Value, RpcError> {
        let value = match name {
            TOOL_STATE => to_value(self.gate.state(ctx)),
            TOOL_CHECK => {
                let args: CommandArgs = parse_args(arguments)?;
                to_value(self.gate.check_command(ctx, &args.command))
            }
            TOOL_EXECUTE => {
                let args: CommandArgs = parse_args(arguments)?;
                to_value(self.gate.execute_command(
                    ctx,
                    &args.command,
                    args.override_reason.as_deref(),
                ))
            }
            TOOL_WRITE => {
                let args: WriteArgs = parse_args(arguments)?;
                to_value(self.gate.write_file(
                    ctx,
                    &args.path,
                    &args.content,
                    args.override_reason.as_deref(),
                ))
            }
            other => {
                return Err(RpcError::new(INVALID_PARAMS, format!("unknown tool: {other}")));
            }
        };
        Ok(value)
    }
}

fn validate_arguments(schema: &Value, arguments: &Value) -> std::result::Result<(), RpcError> {
    let validator = validator_for(schema)
        .map_err(|err| RpcError::new(INVALID_PARAMS, format!("invalid tool schema: {err}")))?;
    let messages: Vec<String> = validator
        .iter_errors(arguments)
        .map(|err| err.to_string())
        .collect();
    if messages.is_empty() {
        return Ok(());
    }
    Err(RpcError::new(
        INVALID_PARAMS,
        format!("invalid arguments: {}", messages.join("; ")),
    ))
}

fn parse_args<T: DeserializeOwned>(arguments: Value) -> std::result::Result<T, RpcError> {
    serde_json::from_value(arguments)
        .map_err(|err| RpcError::new(INVALID_PARAMS, format!("invalid arguments: {err}")))
}

fn tool_result(structured: Value) -> Value {
    let is_error = structured.get("status") == Some(&json!(Status::Failed));
    let text = serde_json::to_string_pretty(&structured).unwrap_or_else(|_| structured.to_string());
    json!({
        "content": [{"type": "text", "text": text}],
        "structuredContent": structured,
        "isError": is_error
    })
}

fn tool_error(message: &str) -> Value {
    json!({
        "content": [{"type": "text", "text": message}],
        "isError": true
    })
}

fn to_value<T: Serialize>(value: T) -> Value {
    serde_json::to_value(value).unwrap_or_else(|err| json!({ "error": err.to_string() }))
}
