//! MCP (Model Context Protocol) server for DORA publication search.
//!
//! Provides a JSON-RPC 2.0 interface over either stdio (one message per line)
//! or HTTP (one message per POST), sharing a single dispatcher.

/// HTTP binding.
pub mod http;

/// Request dispatcher and stdio binding.
pub mod server;

/// Tool definitions and argument validation.
pub mod tools;

/// JSON-RPC 2.0 transport types.
pub mod transport;

pub use server::{run_stdio, serve_lines, McpServer, McpSession, SessionState, ToolOutcome};
pub use tools::{get_tool_definitions, ToolCall, ToolCallError, ToolDefinition, ToolRegistry};
pub use transport::{ErrorCode, JsonRpcError, JsonRpcRequest, JsonRpcResponse};
