//! Shared helpers for session-core integration tests.
#![allow(dead_code)]

use futures::FutureExt;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

use coremcp_server::Session;

/// Install a test subscriber so handler failures show up in `--nocapture`
/// runs. Safe to call from every test.
#[allow(dead_code)]
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_test_writer()
        .try_init();
}

/// Attach an in-memory output sink; every emitted envelope arrives on the
/// returned channel as parsed JSON.
pub fn attach_channel(session: &Session) -> mpsc::UnboundedReceiver<Value> {
    let (tx, rx) = mpsc::unbounded_channel::<Value>();
    session.set_output(Arc::new(move |text: String| {
        let tx = tx.clone();
        async move {
            let value: Value =
                serde_json::from_str(&text).map_err(|e| std::io::Error::other(e.to_string()))?;
            tx.send(value)
                .map_err(|_| std::io::Error::other("test channel closed"))
        }
        .boxed()
    }));
    rx
}

/// Receive the next emitted envelope, failing the test after two seconds.
pub async fn recv(rx: &mut mpsc::UnboundedReceiver<Value>) -> Value {
    tokio::time::timeout(Duration::from_secs(2), rx.recv())
        .await
        .expect("timed out waiting for an emission")
        .expect("output channel closed")
}

/// Assert that nothing is emitted within `wait`.
pub async fn assert_silent(rx: &mut mpsc::UnboundedReceiver<Value>, wait: Duration) {
    let outcome = tokio::time::timeout(wait, rx.recv()).await;
    assert!(outcome.is_err(), "unexpected emission: {:?}", outcome.unwrap());
}

/// Run the handshake through `handle`, returning the initialize response.
pub async fn initialize(session: &Session) -> Value {
    let response = session
        .handle(
            r#"{"jsonrpc":"2.0","id":0,"method":"initialize","params":{"protocolVersion":"2025-03-26","capabilities":{},"clientInfo":{"name":"test-client","version":"1"}}}"#,
        )
        .await
        .expect("initialize must produce a response");
    assert!(
        session
            .handle(r#"{"jsonrpc":"2.0","method":"notifications/initialized"}"#)
            .await
            .is_none(),
        "notifications produce no response"
    );
    serde_json::from_str(&response).unwrap()
}
