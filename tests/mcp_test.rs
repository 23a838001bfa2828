mod common;

use common::{server_with, three_records, Behavior, FakeRepository};
use dora_mcp::mcp::tools::*;
use dora_mcp::mcp::transport::*;
use dora_mcp::mcp::SessionState;
use serde_json::{json, Value};

fn call(id: i64, name: &str, arguments: Value) -> JsonRpcRequest {
    JsonRpcRequest::new(
        json!(id),
        "tools/call",
        Some(json!({ "name": name, "arguments": arguments })),
    )
}

fn result_text(response: &JsonRpcResponse) -> &str {
    response.result.as_ref().unwrap()["content"][0]["text"]
        .as_str()
        .unwrap()
}

#[tokio::test]
async fn test_initialize_moves_session_to_ready() {
    let repo = FakeRepository::new(Behavior::Records(vec![]));
    let server = server_with(&repo);
    let mut session = server.session();
    assert_eq!(session.state(), SessionState::Uninitialized);

    let response = session
        .handle(JsonRpcRequest::new(json!(1), "initialize", Some(json!({}))))
        .await
        .unwrap();

    assert_eq!(session.state(), SessionState::Ready);
    let result = response.result.unwrap();
    assert_eq!(result["protocolVersion"], "2024-11-05");
    assert_eq!(result["serverInfo"]["name"], "dora-mcp");
    assert_eq!(result["capabilities"]["tools"]["listChanged"], false);
    assert_eq!(repo.calls(), 0);
}

#[tokio::test]
async fn test_initialized_notification_has_no_response() {
    let repo = FakeRepository::new(Behavior::Records(vec![]));
    let mut session = server_with(&repo).session();
    let response = session
        .handle_raw(r#"{"jsonrpc":"2.0","method":"notifications/initialized"}"#)
        .await;
    assert!(response.is_none());
}

#[tokio::test]
async fn test_tools_list_is_stable_and_requires_search_string() {
    let repo = FakeRepository::new(Behavior::Records(vec![]));
    let mut session = server_with(&repo).session();

    let first = session
        .handle(JsonRpcRequest::new(json!(1), "tools/list", None))
        .await
        .unwrap();
    let second = session
        .handle(JsonRpcRequest::new(json!(2), "tools/list", None))
        .await
        .unwrap();

    let tools = first.result.unwrap()["tools"].clone();
    assert_eq!(tools, second.result.unwrap()["tools"]);

    let tools = tools.as_array().unwrap();
    assert!(!tools.is_empty());
    assert_eq!(tools[0]["name"], "search_publications");
    assert_eq!(tools[0]["inputSchema"]["required"], json!(["search_string"]));
}

#[tokio::test]
async fn test_missing_search_string_is_invalid_params() {
    let repo = FakeRepository::new(Behavior::Records(three_records()));
    let mut session = server_with(&repo).session();

    let response = session
        .handle(call(3, "search_publications", json!({})))
        .await
        .unwrap();

    assert_eq!(response.error_code(), Some(ErrorCode::InvalidParams.as_i32()));
    assert!(response.result.is_none());
    assert_eq!(repo.calls(), 0);
}

#[tokio::test]
async fn test_blank_search_string_is_invalid_params() {
    let repo = FakeRepository::new(Behavior::Records(three_records()));
    let mut session = server_with(&repo).session();

    let response = session
        .handle(call(4, "search_publications", json!({"search_string": "   "})))
        .await
        .unwrap();

    assert_eq!(response.error_code(), Some(-32602));
    assert_eq!(repo.calls(), 0);
}

#[tokio::test]
async fn test_unknown_tool_is_method_not_found() {
    let repo = FakeRepository::new(Behavior::Records(three_records()));
    let mut session = server_with(&repo).session();

    let response = session
        .handle(call(5, "unknown_tool", json!({"search_string": "x"})))
        .await
        .unwrap();

    let error = response.error.unwrap();
    assert_eq!(error.code, ErrorCode::MethodNotFound.as_i32());
    assert!(error.message.contains("unknown_tool"));
    assert_eq!(repo.calls(), 0);
}

#[tokio::test]
async fn test_unknown_method_keeps_state() {
    let repo = FakeRepository::new(Behavior::Records(vec![]));
    let mut session = server_with(&repo).session();

    let response = session
        .handle(JsonRpcRequest::new(json!(6), "resources/list", None))
        .await
        .unwrap();

    assert_eq!(response.error_code(), Some(-32601));
    assert_eq!(response.id, json!(6));
    assert_eq!(session.state(), SessionState::Uninitialized);
}

#[tokio::test]
async fn test_search_embeds_all_records() {
    let records = three_records();
    let repo = FakeRepository::new(Behavior::Records(records.clone()));
    let mut session = server_with(&repo).session();

    let response = session
        .handle(call(
            7,
            "search_publications",
            json!({"search_string": "manfred heuberger"}),
        ))
        .await
        .unwrap();

    assert!(response.error.is_none());
    let text = result_text(&response);
    let (_, body) = text.split_once('\n').unwrap();
    let embedded: Vec<Value> = serde_json::from_str(body).unwrap();
    assert_eq!(embedded, records);
    assert_eq!(repo.calls(), 1);
    assert_eq!(repo.seen()[0].0, "manfred heuberger");
}

#[tokio::test]
async fn test_empty_results_message() {
    let repo = FakeRepository::new(Behavior::Records(vec![]));
    let mut session = server_with(&repo).session();

    let response = session
        .handle(call(8, "search_publications", json!({"search_string": "zzz"})))
        .await
        .unwrap();

    assert_eq!(result_text(&response), "No publications found for 'zzz'.");
}

#[tokio::test]
async fn test_upstream_timeout_is_a_result_not_an_error() {
    let repo = FakeRepository::new(Behavior::Unavailable);
    let mut session = server_with(&repo).session();

    let response = session
        .handle(call(9, "search_publications", json!({"search_string": "x"})))
        .await
        .unwrap();

    assert!(response.error.is_none());
    let result = response.result.as_ref().unwrap();
    assert_eq!(result["isError"], true);
    assert!(result_text(&response).contains("timed out"));
}

#[tokio::test]
async fn test_upstream_status_is_a_result_not_an_error() {
    let repo = FakeRepository::new(Behavior::Status(503, "Service Unavailable"));
    let mut session = server_with(&repo).session();

    let response = session
        .handle(call(10, "search_by_year", json!({"year": 2018})))
        .await
        .unwrap();

    assert!(response.error.is_none());
    assert!(result_text(&response).contains("HTTP 503"));
}

#[tokio::test]
async fn test_search_by_year_uses_match_all_with_date_filter() {
    let repo = FakeRepository::new(Behavior::Records(three_records()));
    let mut session = server_with(&repo).session();

    session
        .handle(call(11, "search_by_year", json!({"year": 2018})))
        .await
        .unwrap();

    let (query, filters) = &repo.seen()[0];
    assert_eq!(query, "*:*");
    assert_eq!(
        filters,
        &vec![
            "mods_originInfo_encoding_w3cdtf_keyDate_yes_dateIssued_dt:[2018-01-01T00:00:00Z TO 2018-12-31T23:59:59Z]"
                .to_string()
        ]
    );
}

#[tokio::test]
async fn test_search_with_filters_passes_filters_through() {
    let repo = FakeRepository::new(Behavior::Records(vec![]));
    let mut session = server_with(&repo).session();

    session
        .handle(call(
            12,
            "search_with_filters",
            json!({"query": "dc.creator:(heuberger)", "filters": ["dc.type:Journal Article"]}),
        ))
        .await
        .unwrap();

    let (query, filters) = &repo.seen()[0];
    assert_eq!(query, "dc.creator:(heuberger)");
    assert_eq!(filters, &vec!["dc.type:Journal Article".to_string()]);
}

#[tokio::test]
async fn test_tools_call_without_params() {
    let repo = FakeRepository::new(Behavior::Records(vec![]));
    let mut session = server_with(&repo).session();

    let response = session
        .handle(JsonRpcRequest::new(json!(13), "tools/call", None))
        .await
        .unwrap();

    assert_eq!(response.error_code(), Some(-32602));
}

#[tokio::test]
async fn test_wrong_jsonrpc_version_is_invalid_request() {
    let repo = FakeRepository::new(Behavior::Records(vec![]));
    let mut session = server_with(&repo).session();

    let response = session
        .handle_raw(r#"{"jsonrpc":"1.0","id":14,"method":"tools/list"}"#)
        .await
        .unwrap();

    assert_eq!(response.error_code(), Some(-32600));
}

#[test]
fn test_tool_definitions_serialization_roundtrip() {
    let tools = get_tool_definitions();
    let json = serde_json::to_string(&tools).unwrap();
    assert!(json.contains("\"inputSchema\""));
    let deserialized: Vec<ToolDefinition> = serde_json::from_str(&json).unwrap();
    assert_eq!(deserialized.len(), tools.len());
}

#[test]
fn test_all_error_codes() {
    assert_eq!(ErrorCode::ParseError.as_i32(), -32700);
    assert_eq!(ErrorCode::InvalidRequest.as_i32(), -32600);
    assert_eq!(ErrorCode::MethodNotFound.as_i32(), -32601);
    assert_eq!(ErrorCode::InvalidParams.as_i32(), -32602);
    assert_eq!(ErrorCode::InternalError.as_i32(), -32603);
}
