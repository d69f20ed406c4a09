//! JSON-RPC stdio loop speaking the MCP wire protocol.

use crate::core::traits::TodoService;
use crate::mcp::metrics::ToolMetrics;
use crate::mcp::tools;
use di::Ref;
use log::{info, warn};
use serde::Deserialize;
use serde_json::{Value, json};
use std::time::Instant;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};

// Kept at the widely deployed baseline; clients negotiating newer revisions
// still interoperate with this handshake.
pub const MCP_VERSION: &str = "2024-11-05";
pub const SERVER_NAME: &str = "todo-tools-server";
pub const SERVER_VERSION: &str = env!("CARGO_PKG_VERSION");

#[derive(Debug, Deserialize)]
pub struct JsonRpcRequest {
    #[serde(default, rename = "jsonrpc")]
    _jsonrpc: Option<String>,
    pub method: String,
    #[serde(default)]
    pub id: Option<Value>,
    #[serde(default)]
    pub params: Option<Value>,
}

pub fn json_rpc_response(id: Option<Value>, result: Value) -> Value {
    json!({ "jsonrpc": "2.0", "id": id, "result": result })
}

pub fn json_rpc_error(id: Option<Value>, code: i64, message: &str) -> Value {
    json!({ "jsonrpc": "2.0", "id": id, "error": { "code": code, "message": message } })
}

fn tool_text_content(payload: &Value) -> Value {
    json!({
        "type": "text",
        "text": serde_json::to_string_pretty(payload).unwrap_or_else(|_| "{}".to_owned()),
    })
}

pub struct McpServer {
    initialized: bool,
    todos: Ref<dyn TodoService>,
    metrics: ToolMetrics,
}

impl McpServer {
    pub fn new(todos: Ref<dyn TodoService>) -> McpServer {
        McpServer {
            initialized: false,
            todos,
            metrics: ToolMetrics::new(),
        }
    }

    pub fn metrics(&self) -> &ToolMetrics {
        &self.metrics
    }

    /// Handles one request. `None` means "notification, nothing to write".
    pub async fn handle(&mut self, request: JsonRpcRequest) -> Option<Value> {
        let method = request.method.as_str();

        if method == "initialize" {
            return Some(json_rpc_response(
                request.id,
                json!({
                    "protocolVersion": MCP_VERSION,
                    "serverInfo": { "name": SERVER_NAME, "version": SERVER_VERSION },
                    "capabilities": { "tools": {} }
                }),
            ));
        }

        if !self.initialized && method != "notifications/initialized" {
            return Some(json_rpc_error(request.id, -32002, "Server not initialized"));
        }

        if method == "notifications/initialized" {
            self.initialized = true;
            return None;
        }

        if method == "ping" {
            return Some(json_rpc_response(request.id, json!({})));
        }

        if method == "tools/list" {
            return Some(json_rpc_response(
                request.id,
                json!({ "tools": tools::tool_definitions() }),
            ));
        }

        if method == "tools/call" {
            let Some(params) = request.params.as_ref().and_then(|v| v.as_object()) else {
                return Some(json_rpc_error(
                    request.id,
                    -32602,
                    "params must be an object",
                ));
            };

            let tool_name = params.get("name").and_then(|v| v.as_str()).unwrap_or("");
            let args = params
                .get("arguments")
                .cloned()
                .unwrap_or_else(|| json!({}));

            let payload = self.call_tool(tool_name, args).await;
            let is_error = payload.get("error").is_some();

            return Some(json_rpc_response(
                request.id,
                json!({
                    "content": [tool_text_content(&payload)],
                    "isError": is_error
                }),
            ));
        }

        Some(json_rpc_error(
            request.id,
            -32601,
            &format!("Method not found: {method}"),
        ))
    }

    async fn call_tool(&self, name: &str, args: Value) -> Value {
        let started = Instant::now();

        let payload = match tools::dispatch_tool(&*self.todos, name, args).await {
            Some(payload) => payload,
            None => {
                warn!("unknown tool requested: {name}");
                crate::mcp::schemas::error_response(
                    crate::mcp::schemas::ErrorCode::Validation,
                    format!("Unknown tool: {name}"),
                )
            }
        };

        let success = payload.get("error").is_none();
        self.metrics.record(name, started.elapsed(), success);
        payload
    }
}

/// Reads newline-delimited JSON-RPC requests from stdin and answers on
/// stdout. All logging goes to stderr; stdout carries protocol frames only.
pub async fn serve_stdio(server: &mut McpServer) -> anyhow::Result<()> {
    info!("MCP server '{SERVER_NAME}' ready on stdio");

    let stdin = BufReader::new(tokio::io::stdin());
    let mut lines = stdin.lines();
    let mut stdout = tokio::io::stdout();

    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let response = match serde_json::from_str::<JsonRpcRequest>(line) {
            Ok(request) => server.handle(request).await,
            Err(_) => Some(json_rpc_error(None, -32700, "Parse error")),
        };

        if let Some(response) = response {
            stdout.write_all(response.to_string().as_bytes()).await?;
            stdout.write_all(b"\n").await?;
            stdout.flush().await?;
        }
    }

    info!("stdin closed, shutting down");
    Ok(())
}
