//! MCP request dispatcher and the line-oriented local transport.
//!
//! [`McpServer`] holds the immutable pieces shared by every session (tool
//! registry and repository). [`McpSession`] is one RPC session: it tracks
//! whether `initialize` has been seen and routes each request. The stdio
//! binding drives one session for the lifetime of the process; the HTTP
//! binding in [`super::http`] opens a fresh session per request.

use std::sync::Arc;

use serde_json::{json, Value};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tracing::{debug, error, info, warn};

use crate::errors::{DoraError, Result};
use crate::repository::{PublicationRepository, SearchResult};

use super::tools::{ToolCall, ToolCallError, ToolRegistry};
use super::transport::{parse_request, ErrorCode, JsonRpcRequest, JsonRpcResponse, JSONRPC_VERSION};

/// MCP protocol revision announced during `initialize`.
pub const PROTOCOL_VERSION: &str = "2024-11-05";

/// Name announced in `serverInfo`.
pub const SERVER_NAME: &str = "dora-mcp";

/// Shared, read-only state for all sessions.
#[derive(Clone)]
pub struct McpServer {
    registry: Arc<ToolRegistry>,
    repository: Arc<dyn PublicationRepository>,
}

impl McpServer {
    /// Creates a server with the default tool catalog.
    pub fn new(repository: Arc<dyn PublicationRepository>) -> Self {
        Self::with_registry(Arc::new(ToolRegistry::default()), repository)
    }

    /// Creates a server with an explicit tool catalog.
    pub fn with_registry(
        registry: Arc<ToolRegistry>,
        repository: Arc<dyn PublicationRepository>,
    ) -> Self {
        Self {
            registry,
            repository,
        }
    }

    /// Returns the tool catalog.
    pub fn registry(&self) -> &ToolRegistry {
        &self.registry
    }

    /// Opens a new, uninitialized session.
    pub fn session(&self) -> McpSession {
        McpSession {
            server: self.clone(),
            state: SessionState::Uninitialized,
        }
    }
}

/// Lifecycle of one RPC session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Uninitialized,
    Ready,
}

/// Outcome of a repository search, always reported inside a tool result.
#[derive(Debug)]
pub enum ToolOutcome {
    Ok(SearchResult),
    Failed(DoraError),
}

impl ToolOutcome {
    /// Renders the outcome as an MCP `tools/call` result.
    ///
    /// Successes carry the records as a pretty-printed JSON array; failures
    /// carry a readable message and set `isError`.
    pub fn into_result(self, description: &str) -> Value {
        match self {
            Self::Ok(records) if records.is_empty() => {
                text_result(format!("No publications found for {}.", description), false)
            }
            Self::Ok(records) => {
                let count = records.len();
                match serde_json::to_string_pretty(&records) {
                    Ok(body) => text_result(
                        format!(
                            "Found {} publication(s) for {}:\n{}",
                            count, description, body
                        ),
                        false,
                    ),
                    Err(e) => text_result(format!("Error searching DORA: {}", e), true),
                }
            }
            Self::Failed(e) => text_result(format!("Error searching DORA: {}", e), true),
        }
    }
}

fn text_result(text: String, is_error: bool) -> Value {
    let mut result = json!({
        "content": [{ "type": "text", "text": text }]
    });
    if is_error {
        result["isError"] = Value::Bool(true);
    }
    result
}

/// One RPC session over a transport.
pub struct McpSession {
    server: McpServer,
    state: SessionState,
}

impl McpSession {
    /// Returns the current lifecycle state.
    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Dispatches a parsed JSON-RPC request to the appropriate handler.
    ///
    /// Returns `None` for notifications.
    pub async fn handle(&mut self, request: JsonRpcRequest) -> Option<JsonRpcResponse> {
        debug!(method = %request.method, id = %request.id, "handling request");

        if request.is_notification() {
            return None;
        }

        let id = request.id.clone();
        if request.jsonrpc != JSONRPC_VERSION {
            return Some(JsonRpcResponse::error(
                id,
                ErrorCode::InvalidRequest,
                format!("unsupported jsonrpc version: {}", request.jsonrpc),
            ));
        }

        let response = match request.method.as_str() {
            "initialize" => self.handle_initialize(id),
            "ping" => JsonRpcResponse::success(id, json!({})),
            "tools/list" => self.handle_tools_list(id),
            "tools/call" => self.handle_tools_call(id, request.params).await,
            _ => JsonRpcResponse::error(
                id,
                ErrorCode::MethodNotFound,
                format!("method not found: {}", request.method),
            ),
        };

        Some(response)
    }

    /// Parses and dispatches one raw message.
    pub async fn handle_raw(&mut self, raw: &str) -> Option<JsonRpcResponse> {
        match parse_request(raw) {
            Ok(request) => self.handle(request).await,
            Err(response) => Some(response),
        }
    }

    /// Handles the `initialize` method, returning server capabilities.
    fn handle_initialize(&mut self, id: Value) -> JsonRpcResponse {
        self.state = SessionState::Ready;
        JsonRpcResponse::success(
            id,
            json!({
                "protocolVersion": PROTOCOL_VERSION,
                "capabilities": {
                    "tools": { "listChanged": false }
                },
                "serverInfo": {
                    "name": SERVER_NAME,
                    "version": env!("CARGO_PKG_VERSION")
                }
            }),
        )
    }

    /// Handles the `tools/list` method, returning all tool definitions.
    fn handle_tools_list(&self, id: Value) -> JsonRpcResponse {
        self.note_uninitialized("tools/list");
        JsonRpcResponse::success(id, json!({ "tools": self.server.registry.list_tools() }))
    }

    /// Handles the `tools/call` method.
    async fn handle_tools_call(&self, id: Value, params: Option<Value>) -> JsonRpcResponse {
        self.note_uninitialized("tools/call");

        let Some(mut params) = params else {
            return JsonRpcResponse::error(
                id,
                ErrorCode::InvalidParams,
                "missing params for tools/call".to_string(),
            );
        };

        let tool_name = match params.get("name").and_then(|v| v.as_str()) {
            Some(name) => name.to_string(),
            None => {
                return JsonRpcResponse::error(
                    id,
                    ErrorCode::InvalidParams,
                    "missing 'name' in tools/call params".to_string(),
                );
            }
        };

        let arguments = match params.get_mut("arguments").map(Value::take) {
            Some(Value::Null) | None => json!({}),
            Some(args) => args,
        };

        let call = match ToolCall::parse(&self.server.registry, &tool_name, arguments) {
            Ok(call) => call,
            Err(e @ ToolCallError::UnknownTool(_)) => {
                return JsonRpcResponse::error(id, ErrorCode::MethodNotFound, e.to_string());
            }
            Err(e @ ToolCallError::InvalidArguments { .. }) => {
                return JsonRpcResponse::error(id, ErrorCode::InvalidParams, e.to_string());
            }
        };

        let description = call.describe();
        let outcome = match call.execute(self.server.repository.as_ref()).await {
            Ok(records) => {
                info!(tool = %tool_name, results = records.len(), "search completed");
                ToolOutcome::Ok(records)
            }
            Err(e) if e.is_upstream() => {
                error!(tool = %tool_name, error = %e, "search failed");
                ToolOutcome::Failed(e)
            }
            Err(e) => {
                return JsonRpcResponse::error(id, ErrorCode::InvalidParams, e.to_string());
            }
        };

        JsonRpcResponse::success(id, outcome.into_result(&description))
    }

    fn note_uninitialized(&self, method: &str) {
        if self.state == SessionState::Uninitialized {
            debug!(method, "request before initialize; serving anyway");
        }
    }
}

/// Serves one session over a line-delimited stream.
///
/// Reads one JSON-RPC message per line and writes one response per line,
/// strictly in order. A line that is not UTF-8 gets a parse error response.
/// Returns when the input reaches end of file or on an I/O error.
pub async fn serve_lines<R, W>(server: &McpServer, mut reader: R, mut writer: W) -> Result<()>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut session = server.session();
    let mut buf = Vec::new();

    loop {
        buf.clear();
        if reader.read_until(b'\n', &mut buf).await? == 0 {
            break;
        }

        let response = match std::str::from_utf8(&buf) {
            Ok(line) => {
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }
                session.handle_raw(line).await
            }
            Err(e) => {
                warn!(error = %e, "received a line that is not valid UTF-8");
                Some(JsonRpcResponse::error(
                    Value::Null,
                    ErrorCode::ParseError,
                    format!("request is not valid UTF-8: {}", e),
                ))
            }
        };

        let Some(response) = response else {
            continue;
        };

        let json_line = match serde_json::to_string(&response) {
            Ok(s) => s,
            Err(e) => {
                warn!(error = %e, "failed to serialize response");
                let fallback = JsonRpcResponse::error(
                    response.id,
                    ErrorCode::InternalError,
                    "failed to serialize response".to_string(),
                );
                serde_json::to_string(&fallback)?
            }
        };

        writer.write_all(json_line.as_bytes()).await?;
        writer.write_all(b"\n").await?;
        writer.flush().await?;
    }

    Ok(())
}

/// Runs the stdio binding until stdin is closed.
pub async fn run_stdio(server: McpServer) -> Result<()> {
    info!("serving MCP over stdio");
    let stdin = BufReader::new(tokio::io::stdin());
    let stdout = tokio::io::stdout();
    serve_lines(&server, stdin, stdout).await?;
    info!("stdin closed; shutting down");
    Ok(())
}
