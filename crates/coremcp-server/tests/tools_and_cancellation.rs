//! Tool invocation, list_changed emission, and client-initiated
//! cancellation of in-flight handlers.

mod common;

use parking_lot::Mutex;
use pretty_assertions::assert_eq;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;

use coremcp_protocol::types::Tool;
use coremcp_server::{tool_fn, Session, ToolReply};

fn sum_tool() -> (Tool, Arc<dyn coremcp_server::ToolHandler>) {
    (
        Tool::new("sum"),
        tool_fn(|_exchange, args| async move {
            let a = args.get("a").and_then(Value::as_i64).unwrap_or(0);
            let b = args.get("b").and_then(Value::as_i64).unwrap_or(0);
            ToolReply::text((a + b).to_string())
        }),
    )
}

#[tokio::test]
async fn tool_registered_after_initialize_emits_list_changed_then_answers() {
    let session = Session::builder().name("s").version("0").build();
    let mut rx = common::attach_channel(&session);

    session
        .ingest(r#"{"jsonrpc":"2.0","id":1,"method":"initialize","params":{"protocolVersion":"2025-06-18","capabilities":{},"clientInfo":{"name":"c","version":"1"}}}"#)
        .await;
    let init = common::recv(&mut rx).await;
    assert!(init.get("result").is_some());
    session
        .ingest(r#"{"jsonrpc":"2.0","method":"notifications/initialized"}"#)
        .await;

    let (tool, handler) = sum_tool();
    session.add_tool(tool, handler).await;

    let notification = common::recv(&mut rx).await;
    assert_eq!(
        notification["method"],
        json!("notifications/tools/list_changed")
    );

    session
        .ingest(r#"{"jsonrpc":"2.0","id":2,"method":"tools/call","params":{"name":"sum","arguments":{"a":1,"b":2}}}"#)
        .await;
    let response = common::recv(&mut rx).await;
    assert_eq!(response["id"], json!(2));
    assert_eq!(
        response["result"]["content"],
        json!([{"type": "text", "text": "3"}])
    );
    assert_eq!(response["result"]["isError"], json!(false));
}

#[tokio::test]
async fn tool_registered_before_initialize_emits_nothing() {
    let (tool, handler) = sum_tool();
    let session = Session::builder().name("s").version("0").tool(tool, handler).build();
    let mut rx = common::attach_channel(&session);

    common::initialize(&session).await;
    common::assert_silent(&mut rx, Duration::from_millis(100)).await;

    let response: Value = serde_json::from_str(
        &session
            .handle(r#"{"jsonrpc":"2.0","id":2,"method":"tools/call","params":{"name":"sum","arguments":{"a":2,"b":5}}}"#)
            .await
            .unwrap(),
    )
    .unwrap();
    assert_eq!(
        response["result"]["content"],
        json!([{"type": "text", "text": "7"}])
    );
}

#[tokio::test]
async fn removing_a_missing_tool_emits_nothing() {
    let session = Session::builder().name("s").version("0").build();
    let mut rx = common::attach_channel(&session);
    common::initialize(&session).await;

    session.remove_tool("ghost").await;
    common::assert_silent(&mut rx, Duration::from_millis(100)).await;
}

#[tokio::test]
async fn missing_tool_is_invalid_params() {
    let session = Session::builder().name("s").version("0").build();
    common::initialize(&session).await;

    let response: Value = serde_json::from_str(
        &session
            .handle(r#"{"jsonrpc":"2.0","id":3,"method":"tools/call","params":{"name":"nope"}}"#)
            .await
            .unwrap(),
    )
    .unwrap();
    assert_eq!(response["error"]["code"], json!(-32602));
    assert_eq!(response["error"]["message"], json!("Tool nope not found"));
}

#[tokio::test]
async fn tool_error_reply_is_a_successful_response_with_is_error() {
    let session = Session::builder()
        .name("s")
        .version("0")
        .tool(
            Tool::new("fail"),
            tool_fn(|_exchange, _args| async move { ToolReply::error_text("disk on fire") }),
        )
        .build();
    common::initialize(&session).await;

    let response: Value = serde_json::from_str(
        &session
            .handle(r#"{"jsonrpc":"2.0","id":4,"method":"tools/call","params":{"name":"fail"}}"#)
            .await
            .unwrap(),
    )
    .unwrap();
    assert!(response.get("error").is_none());
    assert_eq!(response["result"]["isError"], json!(true));
}

#[tokio::test]
async fn handler_panic_becomes_internal_error() {
    common::init_tracing();
    let session = Session::builder()
        .name("s")
        .version("0")
        .tool(
            Tool::new("boom"),
            tool_fn(|_exchange, _args| async move {
                panic!("unreachable state");
                #[allow(unreachable_code)]
                ToolReply::text("")
            }),
        )
        .build();
    common::initialize(&session).await;

    let response: Value = serde_json::from_str(
        &session
            .handle(r#"{"jsonrpc":"2.0","id":5,"method":"tools/call","params":{"name":"boom"}}"#)
            .await
            .unwrap(),
    )
    .unwrap();
    assert_eq!(response["error"]["code"], json!(-32603));
    assert_eq!(response["error"]["message"], json!("unreachable state"));
}

#[tokio::test]
async fn cancellation_suppresses_the_response() {
    common::init_tracing();
    let observed: Arc<Mutex<Option<Option<String>>>> = Arc::new(Mutex::new(None));
    let observed_in_tool = Arc::clone(&observed);

    let session = Session::builder()
        .name("s")
        .version("0")
        .tool(
            Tool::new("wait"),
            tool_fn(move |exchange: coremcp_server::RequestExchange, _args| {
                let observed = Arc::clone(&observed_in_tool);
                async move {
                    let reason = exchange.req_cancelled().cancelled().await;
                    *observed.lock() = Some(reason);
                    ToolReply::text("finished anyway")
                }
            }),
        )
        .build();
    let mut rx = common::attach_channel(&session);

    session
        .ingest(r#"{"jsonrpc":"2.0","id":1,"method":"initialize","params":{"protocolVersion":"2025-06-18","capabilities":{},"clientInfo":{"name":"c","version":"1"}}}"#)
        .await;
    common::recv(&mut rx).await;
    session
        .ingest(r#"{"jsonrpc":"2.0","method":"notifications/initialized"}"#)
        .await;

    session
        .ingest(r#"{"jsonrpc":"2.0","id":"X","method":"tools/call","params":{"name":"wait"}}"#)
        .await;
    session
        .ingest(r#"{"jsonrpc":"2.0","method":"notifications/cancelled","params":{"requestId":"X","reason":"stop"}}"#)
        .await;

    // The handler observes the reason; no response for "X" is ever written.
    common::assert_silent(&mut rx, Duration::from_millis(300)).await;
    assert_eq!(*observed.lock(), Some(Some("stop".to_string())));
}

#[tokio::test]
async fn cancelling_an_unknown_request_is_ignored() {
    let session = Session::builder().name("s").version("0").build();
    common::initialize(&session).await;
    let reply = session
        .handle(r#"{"jsonrpc":"2.0","method":"notifications/cancelled","params":{"requestId":"none","reason":"x"}}"#)
        .await;
    assert!(reply.is_none());
}
