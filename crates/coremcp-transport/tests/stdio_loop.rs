//! STDIO transport: line framing end to end.

use serde_json::{json, Value};
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};

use coremcp_server::{tool_fn, Session, ToolReply};
use coremcp_protocol::types::Tool;
use coremcp_transport::stdio;

fn test_session() -> Session {
    Session::builder()
        .name("stdio-test")
        .version("0.1.0")
        .tool(
            Tool::new("echo"),
            tool_fn(|_exchange, args| async move {
                ToolReply::text(
                    args.get("text")
                        .and_then(Value::as_str)
                        .unwrap_or_default()
                        .to_string(),
                )
            }),
        )
        .build()
}

#[tokio::test]
async fn request_lines_yield_response_lines() {
    let (client, server) = tokio::io::duplex(64 * 1024);
    let (server_read, server_write) = tokio::io::split(server);
    let loop_task = tokio::spawn(stdio::serve(test_session(), server_read, server_write));

    let (client_read, mut client_write) = tokio::io::split(client);
    let mut lines = BufReader::new(client_read).lines();

    client_write
        .write_all(
            b"{\"jsonrpc\":\"2.0\",\"id\":1,\"method\":\"initialize\",\"params\":{\"protocolVersion\":\"2025-06-18\",\"capabilities\":{},\"clientInfo\":{\"name\":\"c\",\"version\":\"1\"}}}\n",
        )
        .await
        .unwrap();
    let init: Value = serde_json::from_str(
        &tokio::time::timeout(Duration::from_secs(2), lines.next_line())
            .await
            .unwrap()
            .unwrap()
            .unwrap(),
    )
    .unwrap();
    assert_eq!(init["result"]["serverInfo"]["name"], json!("stdio-test"));

    client_write
        .write_all(b"{\"jsonrpc\":\"2.0\",\"method\":\"notifications/initialized\"}\n")
        .await
        .unwrap();
    client_write
        .write_all(
            b"{\"jsonrpc\":\"2.0\",\"id\":2,\"method\":\"tools/call\",\"params\":{\"name\":\"echo\",\"arguments\":{\"text\":\"hi\"}}}\n",
        )
        .await
        .unwrap();

    let response: Value = serde_json::from_str(
        &tokio::time::timeout(Duration::from_secs(2), lines.next_line())
            .await
            .unwrap()
            .unwrap()
            .unwrap(),
    )
    .unwrap();
    assert_eq!(response["id"], json!(2));
    assert_eq!(response["result"]["content"][0]["text"], json!("hi"));

    // EOF stops the loop.
    drop(client_write);
    tokio::time::timeout(Duration::from_secs(2), loop_task)
        .await
        .unwrap()
        .unwrap()
        .unwrap();
}

#[tokio::test]
async fn batch_line_yields_single_array_line() {
    let (client, server) = tokio::io::duplex(64 * 1024);
    let (server_read, server_write) = tokio::io::split(server);
    tokio::spawn(stdio::serve(test_session(), server_read, server_write));

    let (client_read, mut client_write) = tokio::io::split(client);
    let mut lines = BufReader::new(client_read).lines();

    client_write
        .write_all(
            b"{\"jsonrpc\":\"2.0\",\"id\":1,\"method\":\"initialize\",\"params\":{\"protocolVersion\":\"2025-06-18\",\"capabilities\":{},\"clientInfo\":{\"name\":\"c\",\"version\":\"1\"}}}\n",
        )
        .await
        .unwrap();
    lines.next_line().await.unwrap();
    client_write
        .write_all(b"{\"jsonrpc\":\"2.0\",\"method\":\"notifications/initialized\"}\n")
        .await
        .unwrap();

    client_write
        .write_all(
            b"[{\"jsonrpc\":\"2.0\",\"id\":10,\"method\":\"ping\"},{\"jsonrpc\":\"2.0\",\"id\":11,\"method\":\"tools/list\"}]\n",
        )
        .await
        .unwrap();

    let batch: Value = serde_json::from_str(
        &tokio::time::timeout(Duration::from_secs(2), lines.next_line())
            .await
            .unwrap()
            .unwrap()
            .unwrap(),
    )
    .unwrap();
    let items = batch.as_array().unwrap();
    assert_eq!(items.len(), 2);
}
