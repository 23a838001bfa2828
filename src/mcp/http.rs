//! Network binding: a single `POST /mcp` endpoint carrying one JSON-RPC
//! message per request.
//!
//! JSON-RPC errors travel in the body with HTTP 200, so clients see the same
//! envelopes as over stdio. Each request is its own session.

use axum::{
    body::Bytes,
    extract::State,
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::post,
    Router,
};
use serde_json::Value;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use crate::errors::{DoraError, Result};

use super::server::McpServer;
use super::transport::{ErrorCode, JsonRpcResponse};

/// Path of the JSON-RPC endpoint.
pub const MCP_PATH: &str = "/mcp";

/// Builds the router for the HTTP binding.
pub fn router(server: McpServer) -> Router {
    Router::new()
        .route(MCP_PATH, post(handle_rpc))
        .layer(TraceLayer::new_for_http())
        .with_state(server)
}

async fn handle_rpc(State(server): State<McpServer>, body: Bytes) -> Response {
    let raw = match std::str::from_utf8(&body) {
        Ok(raw) => raw,
        Err(e) => {
            return json_response(&JsonRpcResponse::error(
                Value::Null,
                ErrorCode::ParseError,
                format!("request is not valid UTF-8: {}", e),
            ));
        }
    };

    let mut session = server.session();
    match session.handle_raw(raw).await {
        Some(response) => json_response(&response),
        None => StatusCode::ACCEPTED.into_response(),
    }
}

fn json_response(response: &JsonRpcResponse) -> Response {
    let body = match serde_json::to_string(response) {
        Ok(body) => body,
        Err(e) => {
            warn!(error = %e, "failed to serialize response");
            let fallback = JsonRpcResponse::error(
                response.id.clone(),
                ErrorCode::InternalError,
                "failed to serialize response".to_string(),
            );
            serde_json::to_string(&fallback).unwrap_or_default()
        }
    };

    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "application/json")],
        body,
    )
        .into_response()
}

/// Binds the listener for the HTTP binding.
///
/// `host` may be an IP literal (IPv4 or IPv6) or a name to resolve.
pub async fn bind(host: &str, port: u16) -> Result<TcpListener> {
    TcpListener::bind((host, port))
        .await
        .map_err(|e| DoraError::Config {
            message: format!("failed to bind {}:{}: {}", host, port, e),
        })
}

/// Serves the HTTP binding on `host:port` until Ctrl-C.
pub async fn serve(server: McpServer, host: &str, port: u16) -> Result<()> {
    let listener = bind(host, port).await?;
    let addr = listener.local_addr()?;
    info!("serving MCP over HTTP at http://{}{}", addr, MCP_PATH);

    axum::serve(listener, router(server))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("HTTP server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "failed to listen for Ctrl-C");
        std::future::pending::<()>().await;
    }
    info!("shutdown signal received");
}
