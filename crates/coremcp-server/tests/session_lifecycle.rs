//! Handshake, gating, and framing behavior of the session core.

mod common;

use pretty_assertions::assert_eq;
use serde_json::{json, Value};

use coremcp_server::{tool_fn, Session, ToolReply};
use coremcp_protocol::types::Tool;

fn sum_tool() -> (Tool, std::sync::Arc<dyn coremcp_server::ToolHandler>) {
    (
        Tool::new("sum").with_description("Add two numbers").with_input_schema(json!({
            "type": "object",
            "properties": {"a": {"type": "number"}, "b": {"type": "number"}},
            "required": ["a", "b"]
        })),
        tool_fn(|_exchange, args| async move {
            let a = args.get("a").and_then(Value::as_i64).unwrap_or(0);
            let b = args.get("b").and_then(Value::as_i64).unwrap_or(0);
            ToolReply::text((a + b).to_string())
        }),
    )
}

#[tokio::test]
async fn initialize_then_ping() {
    let session = Session::builder().name("test-server").version("1.2.3").build();

    let init = session
        .handle(
            r#"{"jsonrpc":"2.0","id":1,"method":"initialize","params":{"protocolVersion":"2025-03-26","capabilities":{},"clientInfo":{"name":"c","version":"1"}}}"#,
        )
        .await
        .unwrap();
    let init: Value = serde_json::from_str(&init).unwrap();
    assert_eq!(init["id"], json!(1));
    assert_eq!(init["result"]["protocolVersion"], json!("2025-03-26"));
    assert_eq!(init["result"]["serverInfo"]["name"], json!("test-server"));

    assert!(session
        .handle(r#"{"jsonrpc":"2.0","method":"notifications/initialized"}"#)
        .await
        .is_none());

    let pong = session
        .handle(r#"{"jsonrpc":"2.0","id":2,"method":"ping"}"#)
        .await
        .unwrap();
    let pong: Value = serde_json::from_str(&pong).unwrap();
    assert_eq!(pong, json!({"jsonrpc": "2.0", "result": {}, "id": 2}));
}

#[tokio::test]
async fn unsupported_protocol_version_is_invalid_request() {
    let session = Session::builder().name("s").version("0").build();
    let response = session
        .handle(
            r#"{"jsonrpc":"2.0","id":1,"method":"initialize","params":{"protocolVersion":"2024-11-06","capabilities":{},"clientInfo":{"name":"c","version":"1"}}}"#,
        )
        .await
        .unwrap();
    let response: Value = serde_json::from_str(&response).unwrap();
    assert_eq!(response["error"]["code"], json!(-32600));
    let data = response["error"]["data"].to_string();
    assert!(data.contains("protocol"), "data should name the field: {data}");
    assert!(data.contains("2025-06-18"), "data should list the supported set: {data}");
}

#[tokio::test]
async fn second_initialize_is_rejected() {
    let session = Session::builder().name("s").version("0").build();
    common::initialize(&session).await;

    let response = session
        .handle(
            r#"{"jsonrpc":"2.0","id":9,"method":"initialize","params":{"protocolVersion":"2025-03-26","capabilities":{},"clientInfo":{"name":"c","version":"1"}}}"#,
        )
        .await
        .unwrap();
    let response: Value = serde_json::from_str(&response).unwrap();
    assert_eq!(response["error"]["code"], json!(-32602));
    assert_eq!(
        response["error"]["message"],
        json!("Session is initialized already")
    );
}

#[tokio::test]
async fn methods_are_gated_until_initialized() {
    let (tool, handler) = sum_tool();
    let session = Session::builder().name("s").version("0").tool(tool, handler).build();

    for body in [
        r#"{"jsonrpc":"2.0","id":1,"method":"tools/list"}"#,
        r#"{"jsonrpc":"2.0","id":2,"method":"tools/call","params":{"name":"sum"}}"#,
        r#"{"jsonrpc":"2.0","id":3,"method":"prompts/list"}"#,
    ] {
        let response: Value = serde_json::from_str(&session.handle(body).await.unwrap()).unwrap();
        assert_eq!(response["error"]["code"], json!(-32602));
        assert_eq!(response["error"]["message"], json!("Session not initialized."));
    }

    // ping is exempt in every state.
    let pong: Value = serde_json::from_str(
        &session
            .handle(r#"{"jsonrpc":"2.0","id":4,"method":"ping"}"#)
            .await
            .unwrap(),
    )
    .unwrap();
    assert!(pong.get("result").is_some());
}

#[tokio::test]
async fn unknown_method_is_method_not_found() {
    let session = Session::builder().name("s").version("0").build();
    common::initialize(&session).await;

    let response: Value = serde_json::from_str(
        &session
            .handle(r#"{"jsonrpc":"2.0","id":7,"method":"no/such"}"#)
            .await
            .unwrap(),
    )
    .unwrap();
    assert_eq!(response["error"]["code"], json!(-32601));
}

#[tokio::test]
async fn parse_error_reports_null_id() {
    let session = Session::builder().name("s").version("0").build();
    let response: Value =
        serde_json::from_str(&session.handle("{not json").await.unwrap()).unwrap();
    assert_eq!(response["error"]["code"], json!(-32700));
    assert_eq!(response["id"], Value::Null);
}

#[tokio::test]
async fn capability_advertisement_follows_configuration() {
    let (tool, handler) = sum_tool();
    let session = Session::builder()
        .name("s")
        .version("0")
        .logging(true)
        .tool(tool, handler)
        .resources(std::sync::Arc::new(coremcp_server::InMemoryResources::new()))
        .build();

    let init = common::initialize(&session).await;
    let caps = &init["result"]["capabilities"];
    assert_eq!(caps["logging"], json!({}));
    assert_eq!(caps["tools"], json!({"listChanged": true}));
    assert_eq!(caps["resources"], json!({"subscribe": true, "listChanged": true}));
    assert!(caps.get("prompts").is_none());
    assert!(caps.get("completions").is_none());
}

#[tokio::test]
async fn batch_of_three_requests_yields_one_array() {
    let (tool, handler) = sum_tool();
    let session = Session::builder().name("s").version("0").tool(tool, handler).build();
    common::initialize(&session).await;

    let batch = r#"[
        {"jsonrpc":"2.0","id":1,"method":"ping"},
        {"jsonrpc":"2.0","id":2,"method":"tools/list"},
        {"jsonrpc":"2.0","id":3,"method":"prompts/list"}
    ]"#;
    let response: Value = serde_json::from_str(&session.handle(batch).await.unwrap()).unwrap();
    let items = response.as_array().expect("batch input yields a batch reply");
    assert_eq!(items.len(), 3);
    let mut ids: Vec<i64> = items.iter().map(|r| r["id"].as_i64().unwrap()).collect();
    ids.sort_unstable();
    assert_eq!(ids, vec![1, 2, 3]);
}

#[tokio::test]
async fn notification_only_batch_yields_nothing() {
    let session = Session::builder().name("s").version("0").build();
    let reply = session
        .handle(r#"[{"jsonrpc":"2.0","method":"notifications/initialized"}]"#)
        .await;
    assert!(reply.is_none());
}

#[tokio::test]
async fn empty_batch_is_invalid_request() {
    let session = Session::builder().name("s").version("0").build();
    let response: Value = serde_json::from_str(&session.handle("[]").await.unwrap()).unwrap();
    assert_eq!(response["error"]["code"], json!(-32600));
    assert_eq!(response["id"], Value::Null);
}
