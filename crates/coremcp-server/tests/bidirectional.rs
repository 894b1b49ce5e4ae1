//! Server-originated requests: roots listing with progress routing,
//! sampling gating, timeouts, and outbound cancellation.

mod common;

use parking_lot::Mutex;
use pretty_assertions::assert_eq;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;

use coremcp_protocol::types::Tool;
use coremcp_protocol::McpError;
use coremcp_server::{tool_fn, Session, ToolReply};

async fn initialized_with_caps(session: &Session, caps: Value) -> tokio::sync::mpsc::UnboundedReceiver<Value> {
    let rx = common::attach_channel(session);
    let init = json!({
        "jsonrpc": "2.0", "id": 0, "method": "initialize",
        "params": {
            "protocolVersion": "2025-06-18",
            "capabilities": caps,
            "clientInfo": {"name": "c", "version": "1"}
        }
    });
    assert!(session.handle(&init.to_string()).await.is_some());
    assert!(session
        .handle(r#"{"jsonrpc":"2.0","method":"notifications/initialized"}"#)
        .await
        .is_none());
    rx
}

#[tokio::test]
async fn list_roots_with_progress_frames() {
    let progress_seen: Arc<Mutex<Vec<Value>>> = Arc::new(Mutex::new(Vec::new()));
    let progress_in_tool = Arc::clone(&progress_seen);

    let session = Session::builder()
        .name("s")
        .version("0")
        .tool(
            Tool::new("roots"),
            tool_fn(move |exchange: coremcp_server::RequestExchange, _args| {
                let progress = Arc::clone(&progress_in_tool);
                async move {
                    let callback: coremcp_server::ProgressCallback =
                        Arc::new(move |params| progress.lock().push(params));
                    match exchange.list_roots(Some(callback)).await {
                        Ok(roots) => {
                            let uris: Vec<String> =
                                roots.into_iter().map(|root| root.uri).collect();
                            ToolReply::text(uris.join(","))
                        }
                        Err(e) => ToolReply::Rpc(e),
                    }
                }
            }),
        )
        .build();

    let mut rx =
        initialized_with_caps(&session, json!({"roots": {"listChanged": true}})).await;

    session
        .ingest(r#"{"jsonrpc":"2.0","id":5,"method":"tools/call","params":{"name":"roots"}}"#)
        .await;

    // The outbound roots/list request appears with a progress token.
    let request = common::recv(&mut rx).await;
    assert_eq!(request["method"], json!("roots/list"));
    let outbound_id = request["id"].as_i64().unwrap();
    let token = request["params"]["_meta"]["progressToken"]
        .as_str()
        .unwrap()
        .to_string();

    // Two progress frames, then the response.
    for step in 1..=2 {
        let frame = json!({
            "jsonrpc": "2.0", "method": "notifications/progress",
            "params": {"progressToken": token, "progress": step}
        });
        session.ingest(&frame.to_string()).await;
    }
    let answer = json!({
        "jsonrpc": "2.0", "id": outbound_id,
        "result": {"roots": [
            {"uri": "file:///a", "name": "a"},
            {"uri": "file:///b"}
        ]}
    });
    session.ingest(&answer.to_string()).await;

    let response = common::recv(&mut rx).await;
    assert_eq!(response["id"], json!(5));
    assert_eq!(
        response["result"]["content"],
        json!([{"type": "text", "text": "file:///a,file:///b"}])
    );

    let frames = progress_seen.lock();
    assert_eq!(frames.len(), 2);
    assert_eq!(frames[0]["progress"], json!(1));
    assert_eq!(frames[1]["progress"], json!(2));
}

#[tokio::test]
async fn roots_are_memoized_when_list_changed_is_advertised() {
    let session = Session::builder().name("s").version("0").build();
    let mut rx =
        initialized_with_caps(&session, json!({"roots": {"listChanged": true}})).await;

    let exchange = session.exchange();
    let fetch = tokio::spawn({
        let exchange = exchange.clone();
        async move { exchange.list_roots(None).await }
    });
    let request = common::recv(&mut rx).await;
    let id = request["id"].as_i64().unwrap();
    session
        .ingest(&json!({"jsonrpc": "2.0", "id": id, "result": {"roots": [{"uri": "file:///x"}]}}).to_string())
        .await;
    let roots = fetch.await.unwrap().unwrap();
    assert_eq!(roots.len(), 1);

    // Second call is served from the cache: no wire traffic.
    let roots = exchange.list_roots(None).await.unwrap();
    assert_eq!(roots[0].uri, "file:///x");
    common::assert_silent(&mut rx, Duration::from_millis(100)).await;

    // A roots change invalidates the cache; the next call fetches again.
    session
        .ingest(r#"{"jsonrpc":"2.0","method":"notifications/roots/list_changed"}"#)
        .await;
    let refetch = tokio::spawn(async move { exchange.list_roots(None).await });
    let request = common::recv(&mut rx).await;
    assert_eq!(request["method"], json!("roots/list"));
    let id = request["id"].as_i64().unwrap();
    session
        .ingest(&json!({"jsonrpc": "2.0", "id": id, "result": {"roots": []}}).to_string())
        .await;
    assert!(refetch.await.unwrap().unwrap().is_empty());
}

#[tokio::test]
async fn list_roots_without_capability_is_empty_and_silent() {
    let session = Session::builder().name("s").version("0").build();
    let mut rx = initialized_with_caps(&session, json!({})).await;

    let roots = session.exchange().list_roots(None).await.unwrap();
    assert!(roots.is_empty());
    common::assert_silent(&mut rx, Duration::from_millis(100)).await;
}

#[tokio::test]
async fn sampling_without_capability_returns_none() {
    let session = Session::builder().name("s").version("0").build();
    let mut rx = initialized_with_caps(&session, json!({})).await;

    let request = coremcp_protocol::types::CreateMessageRequest {
        messages: vec![coremcp_protocol::types::SamplingMessage::text(
            coremcp_protocol::types::Role::User,
            "hello",
        )],
        model_preferences: None,
        system_prompt: None,
        include_context: None,
        max_tokens: Some(16),
    };
    let result = session.exchange().create_message(request, None).await.unwrap();
    assert!(result.is_none());
    common::assert_silent(&mut rx, Duration::from_millis(100)).await;
}

#[tokio::test]
async fn sampling_round_trip() {
    let session = Session::builder().name("s").version("0").build();
    let mut rx = initialized_with_caps(&session, json!({"sampling": {}})).await;

    let request = coremcp_protocol::types::CreateMessageRequest {
        messages: vec![coremcp_protocol::types::SamplingMessage::text(
            coremcp_protocol::types::Role::User,
            "what is 2+2?",
        )],
        model_preferences: Some(coremcp_protocol::types::ModelPreferences {
            hints: None,
            intelligence_priority: Some(0.2),
            speed_priority: Some(0.9),
        }),
        system_prompt: Some("be brief".into()),
        include_context: None,
        max_tokens: Some(16),
    };

    let exchange = session.exchange();
    let call = tokio::spawn(async move { exchange.create_message(request, None).await });

    let outbound = common::recv(&mut rx).await;
    assert_eq!(outbound["method"], json!("sampling/createMessage"));
    assert_eq!(outbound["params"]["systemPrompt"], json!("be brief"));
    assert_eq!(outbound["params"]["maxTokens"], json!(16));
    assert_eq!(outbound["params"]["modelPreferences"]["speedPriority"], json!(0.9));

    let id = outbound["id"].as_i64().unwrap();
    session
        .ingest(
            &json!({
                "jsonrpc": "2.0", "id": id,
                "result": {
                    "role": "assistant",
                    "content": {"type": "text", "text": "4"},
                    "model": "mini",
                    "stopReason": "endTurn"
                }
            })
            .to_string(),
        )
        .await;

    let result = call.await.unwrap().unwrap().unwrap();
    assert_eq!(result.model, "mini");
}

#[tokio::test]
async fn outbound_timeout_completes_with_timeout_error() {
    let session = Session::builder()
        .name("s")
        .version("0")
        .client_request_timeout(Duration::from_millis(10))
        .build();
    let mut rx = initialized_with_caps(&session, json!({})).await;

    let pending = session
        .exchange()
        .send_request("roots/list", None, None)
        .await
        .unwrap();
    common::recv(&mut rx).await;

    // The sweep is opportunistic and rate-limited; give both the entry
    // and the sweep interval time to expire, then drive it with traffic.
    tokio::time::sleep(Duration::from_millis(600)).await;
    session.ingest(r#"{"jsonrpc":"2.0","method":"notifications/initialized"}"#).await;

    match pending.await {
        Err(McpError::Timeout { after_ms }) => assert_eq!(after_ms, 10),
        other => panic!("unexpected: {other:?}"),
    }
}

#[tokio::test]
async fn interrupting_cancel_notifies_and_drops_late_response() {
    let session = Session::builder().name("s").version("0").build();
    let mut rx = initialized_with_caps(&session, json!({})).await;

    let pending = session
        .exchange()
        .send_request("roots/list", None, None)
        .await
        .unwrap();
    let outbound = common::recv(&mut rx).await;
    let id = outbound["id"].as_i64().unwrap();

    pending.cancel(Some("changed my mind".into())).await;

    let cancelled = common::recv(&mut rx).await;
    assert_eq!(cancelled["method"], json!("notifications/cancelled"));
    assert_eq!(cancelled["params"]["requestId"], json!(id));

    // A late response finds no entry and is dropped without a trace.
    session
        .ingest(&json!({"jsonrpc": "2.0", "id": id, "result": {"roots": []}}).to_string())
        .await;
    common::assert_silent(&mut rx, Duration::from_millis(100)).await;
}

#[tokio::test]
async fn abandon_is_local_only() {
    let session = Session::builder().name("s").version("0").build();
    let mut rx = initialized_with_caps(&session, json!({})).await;

    let pending = session
        .exchange()
        .send_request("roots/list", None, None)
        .await
        .unwrap();
    common::recv(&mut rx).await;

    pending.abandon();
    common::assert_silent(&mut rx, Duration::from_millis(100)).await;
}

#[tokio::test]
async fn report_progress_requires_a_request_token() {
    let session = Session::builder()
        .name("s")
        .version("0")
        .tool(
            Tool::new("step"),
            tool_fn(|exchange: coremcp_server::RequestExchange, _args| async move {
                let update = coremcp_protocol::types::ProgressUpdate {
                    progress: Some(0.5),
                    total: Some(1.0),
                    message: Some("halfway".into()),
                };
                match exchange.report_progress(update).await {
                    Ok(carried) => ToolReply::text(carried.to_string()),
                    Err(e) => ToolReply::Rpc(e),
                }
            }),
        )
        .build();
    let mut rx = initialized_with_caps(&session, json!({})).await;

    // With a token: the notification carries it verbatim.
    let with_token = json!({
        "jsonrpc": "2.0", "id": 1, "method": "tools/call",
        "params": {"name": "step", "_meta": {"progressToken": "tok-1"}}
    });
    let response: Value =
        serde_json::from_str(&session.handle(&with_token.to_string()).await.unwrap()).unwrap();
    assert_eq!(response["result"]["content"][0]["text"], json!("true"));

    let frame = common::recv(&mut rx).await;
    assert_eq!(frame["method"], json!("notifications/progress"));
    assert_eq!(frame["params"]["progressToken"], json!("tok-1"));
    assert_eq!(frame["params"]["progress"], json!(0.5));
    assert_eq!(frame["params"]["message"], json!("halfway"));

    // Without a token: nothing is emitted.
    let without = json!({
        "jsonrpc": "2.0", "id": 2, "method": "tools/call",
        "params": {"name": "step"}
    });
    let response: Value =
        serde_json::from_str(&session.handle(&without.to_string()).await.unwrap()).unwrap();
    assert_eq!(response["result"]["content"][0]["text"], json!("false"));
    common::assert_silent(&mut rx, Duration::from_millis(100)).await;
}

#[tokio::test]
async fn progress_stops_after_terminal_completion() {
    let seen: Arc<Mutex<Vec<Value>>> = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);

    let session = Session::builder().name("s").version("0").build();
    let mut rx = initialized_with_caps(&session, json!({})).await;

    let callback: coremcp_server::ProgressCallback =
        Arc::new(move |params| sink.lock().push(params));
    let pending = session
        .exchange()
        .send_request("roots/list", None, Some(callback))
        .await
        .unwrap();

    let outbound = common::recv(&mut rx).await;
    let id = outbound["id"].as_i64().unwrap();
    let token = outbound["params"]["_meta"]["progressToken"]
        .as_str()
        .unwrap()
        .to_string();

    session
        .ingest(&json!({"jsonrpc": "2.0", "method": "notifications/progress", "params": {"progressToken": token, "progress": 1}}).to_string())
        .await;
    session
        .ingest(&json!({"jsonrpc": "2.0", "id": id, "result": {"roots": []}}).to_string())
        .await;
    pending.await.unwrap();

    // Frames after the terminal state are ignored.
    session
        .ingest(&json!({"jsonrpc": "2.0", "method": "notifications/progress", "params": {"progressToken": token, "progress": 2}}).to_string())
        .await;

    let frames = seen.lock();
    assert_eq!(frames.len(), 1);
    assert_eq!(frames[0]["progress"], json!(1));
}
