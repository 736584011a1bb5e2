//! MCP JSON-RPC protocol over stdio.
//!
//! One JSON object per line in each direction. Tool calls run on their own
//! tasks; a single writer task owns the output stream.

use std::sync::Arc;

use log::{debug, error, info, warn};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use thiserror::Error;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::sync::mpsc;

use crate::tools::{Dispatcher, ToolRequest, TOOLS};
use crate::transport::BrokerTransport;

/// MCP Protocol version
pub const PROTOCOL_VERSION: &str = "2024-11-05";

/// Server name
pub const SERVER_NAME: &str = "emqx-mcp-server";

/// Server version
pub const SERVER_VERSION: &str = env!("CARGO_PKG_VERSION");

const PARSE_ERROR: i32 = -32700;
const INVALID_REQUEST: i32 = -32600;
const METHOD_NOT_FOUND: i32 = -32601;
const INVALID_PARAMS: i32 = -32602;
const INTERNAL_ERROR: i32 = -32603;

#[derive(Error, Debug)]
pub enum McpError {
    #[error("Invalid params: {0}")]
    InvalidParams(String),
    #[error("Method not found: {0}")]
    MethodNotFound(String),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl McpError {
    /// JSON-RPC error code for this error.
    pub fn code(&self) -> i32 {
        match self {
            McpError::InvalidParams(_) => INVALID_PARAMS,
            McpError::MethodNotFound(_) => METHOD_NOT_FOUND,
            McpError::Json(_) => INTERNAL_ERROR,
        }
    }
}

/// JSON-RPC Request
#[derive(Debug, Deserialize)]
pub struct JsonRpcRequest {
    pub jsonrpc: String,
    pub id: Option<Value>,
    pub method: String,
    #[serde(default)]
    pub params: Value,
}

/// JSON-RPC Response
#[derive(Debug, Serialize)]
pub struct JsonRpcResponse {
    pub jsonrpc: String,
    pub id: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<JsonRpcError>,
}

#[derive(Debug, Serialize)]
pub struct JsonRpcError {
    pub code: i32,
    pub message: String,
}

impl JsonRpcResponse {
    pub fn success(id: Value, result: Value) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            id,
            result: Some(result),
            error: None,
        }
    }

    pub fn error(id: Value, code: i32, message: &str) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            id,
            result: None,
            error: Some(JsonRpcError {
                code,
                message: message.to_string(),
            }),
        }
    }
}

/// Broker management tools served over MCP.
pub struct McpServer<T> {
    dispatcher: Dispatcher<T>,
}

impl<T: BrokerTransport> McpServer<T> {
    pub fn new(dispatcher: Dispatcher<T>) -> Self {
        Self { dispatcher }
    }

    fn handle_initialize(&self) -> Value {
        let tool_lines: Vec<String> = TOOLS
            .iter()
            .map(|t| format!("- {}: {}", t.name, t.description))
            .collect();
        json!({
            "protocolVersion": PROTOCOL_VERSION,
            "capabilities": {
                "tools": {}
            },
            "serverInfo": {
                "name": SERVER_NAME,
                "version": SERVER_VERSION
            },
            "instructions": format!(
                "EMQX MCP Server - Manage MQTT clients and publish messages through the \
                 broker's management API.\n\nAvailable tools:\n{}",
                tool_lines.join("\n")
            )
        })
    }

    fn handle_tools_list(&self) -> Value {
        let tools: Vec<_> = TOOLS.iter().map(|t| t.definition()).collect();
        json!({ "tools": tools })
    }

    async fn handle_tools_call(&self, params: Value) -> Result<Value, McpError> {
        let name = params
            .get("name")
            .and_then(|v| v.as_str())
            .ok_or_else(|| McpError::InvalidParams("Missing tool name".to_string()))?;
        let arguments = params.get("arguments").cloned().unwrap_or(Value::Null);

        let request = ToolRequest::parse(name, arguments)
            .map_err(|e| McpError::InvalidParams(e.to_string()))?;
        let result = self.dispatcher.dispatch(request).await;

        Ok(json!({
            "content": [{
                "type": "text",
                "text": serde_json::to_string_pretty(&result)?
            }],
            "isError": !result.ok
        }))
    }

    /// Handle a single JSON-RPC request. Notifications get no response.
    pub async fn handle_request(&self, request: JsonRpcRequest) -> Option<JsonRpcResponse> {
        debug!("Handling request: {}", request.method);

        if request.method == "initialized" || request.method.starts_with("notifications/") {
            return None;
        }
        let Some(id) = request.id else {
            warn!("Ignoring {} without id", request.method);
            return None;
        };

        let response = match request.method.as_str() {
            "initialize" => JsonRpcResponse::success(id, self.handle_initialize()),
            "ping" => JsonRpcResponse::success(id, json!({})),
            "tools/list" => JsonRpcResponse::success(id, self.handle_tools_list()),
            "tools/call" => match self.handle_tools_call(request.params).await {
                Ok(result) => JsonRpcResponse::success(id, result),
                Err(e) => JsonRpcResponse::error(id, e.code(), &e.to_string()),
            },
            other => {
                warn!("Unknown method: {}", other);
                let e = McpError::MethodNotFound(other.to_string());
                JsonRpcResponse::error(id, e.code(), &e.to_string())
            }
        };
        Some(response)
    }

    /// Run the MCP server over stdio
    pub async fn run_stdio(self: Arc<Self>) -> anyhow::Result<()> {
        let stdin = BufReader::new(tokio::io::stdin());
        let stdout = tokio::io::stdout();
        info!("MCP server ready, listening on stdio...");
        self.serve(stdin, stdout).await
    }

    /// Serve requests from `reader` until EOF, writing responses to `writer`.
    ///
    /// Lines that are not JSON-RPC requests are answered with an error and
    /// skipped. Only a failed read ends the loop early. Either way, in-flight
    /// tool calls are allowed to finish before this returns.
    pub async fn serve<R, W>(self: Arc<Self>, mut reader: R, writer: W) -> anyhow::Result<()>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin + Send + 'static,
    {
        let (tx, rx) = mpsc::unbounded_channel::<JsonRpcResponse>();
        let writer_task = tokio::spawn(write_responses(rx, writer));

        let mut buf = Vec::new();
        let read_result = loop {
            buf.clear();
            match reader.read_until(b'\n', &mut buf).await {
                Ok(0) => break Ok(()),
                Ok(_) => {}
                Err(e) => {
                    error!("Failed to read from input: {}", e);
                    break Err(e);
                }
            }

            let line = buf.trim_ascii();
            if line.is_empty() {
                continue;
            }

            debug!("Received: {}", String::from_utf8_lossy(line));

            let request = match parse_request(line) {
                Ok(req) => req,
                Err(response) => {
                    // The writer only stops if the output is gone.
                    let _ = tx.send(response);
                    continue;
                }
            };

            let server = Arc::clone(&self);
            let tx = tx.clone();
            tokio::spawn(async move {
                if let Some(response) = server.handle_request(request).await {
                    let _ = tx.send(response);
                }
            });
        };

        info!("stdin closed, waiting for in-flight requests");
        drop(tx);
        writer_task.await??;
        read_result?;
        Ok(())
    }
}

/// Decode one input line, or produce the error response it deserves.
fn parse_request(line: &[u8]) -> Result<JsonRpcRequest, JsonRpcResponse> {
    let value: Value = serde_json::from_slice(line).map_err(|e| {
        error!("Failed to parse request: {}", e);
        JsonRpcResponse::error(Value::Null, PARSE_ERROR, "Parse error")
    })?;

    let id = value.get("id").cloned().unwrap_or(Value::Null);
    serde_json::from_value(value).map_err(|e| {
        warn!("Invalid request: {}", e);
        JsonRpcResponse::error(id, INVALID_REQUEST, "Invalid Request")
    })
}

async fn write_responses<W>(
    mut rx: mpsc::UnboundedReceiver<JsonRpcResponse>,
    mut writer: W,
) -> anyhow::Result<()>
where
    W: AsyncWrite + Unpin,
{
    while let Some(response) = rx.recv().await {
        let response_json = serde_json::to_string(&response)?;
        debug!("Sending: {}", response_json);
        writer.write_all(response_json.as_bytes()).await?;
        writer.write_all(b"\n").await?;
        writer.flush().await?;
    }
    Ok(())
}
