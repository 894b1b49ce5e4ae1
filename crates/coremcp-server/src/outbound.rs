//! Outstanding server-originated requests.
//!
//! Correlates monotonically allocated request ids to pending one-shot
//! completions. Entries leave the table in exactly one of three ways: a
//! matching client response, an explicit cancellation, or the opportunistic
//! timeout sweep driven by inbound traffic.

use dashmap::DashMap;
use serde_json::Value;
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicI64, Ordering};
use std::task::{Context, Poll};
use std::time::{Duration, Instant};
use tokio::sync::oneshot;

use coremcp_protocol::jsonrpc::JsonRpcError;
use coremcp_protocol::{McpError, RequestId, TIMEOUT_SWEEP_INTERVAL_MS};

use crate::progress::ProgressRegistry;
use crate::session::Session;

pub(crate) struct PendingEntry {
    sent_at: Instant,
    tx: oneshot::Sender<Result<Value, McpError>>,
    progress_token: Option<String>,
}

/// Table of outstanding server-originated requests for one session.
pub(crate) struct OutboundTable {
    next_id: AtomicI64,
    pending: DashMap<i64, PendingEntry>,
    last_sweep: parking_lot::Mutex<Instant>,
    timeout: Duration,
}

impl OutboundTable {
    pub(crate) fn new(timeout: Duration) -> Self {
        Self {
            next_id: AtomicI64::new(1),
            pending: DashMap::new(),
            last_sweep: parking_lot::Mutex::new(Instant::now()),
            timeout,
        }
    }

    pub(crate) fn allocate_id(&self) -> i64 {
        self.next_id.fetch_add(1, Ordering::Relaxed)
    }

    /// Register a pending completion. Must happen before the envelope is
    /// written so a fast client response cannot race the registration.
    pub(crate) fn register(
        &self,
        id: i64,
        progress_token: Option<String>,
    ) -> oneshot::Receiver<Result<Value, McpError>> {
        let (tx, rx) = oneshot::channel();
        self.pending.insert(
            id,
            PendingEntry {
                sent_at: Instant::now(),
                tx,
                progress_token,
            },
        );
        rx
    }

    /// Remove an entry without completing it; returns its progress token.
    pub(crate) fn discard(&self, id: i64) -> Option<Option<String>> {
        self.pending.remove(&id).map(|(_, entry)| entry.progress_token)
    }

    /// Route a client response to its pending completion. Late responses
    /// (after cancellation or timeout) are dropped.
    pub(crate) fn complete(
        &self,
        progress: &ProgressRegistry,
        id: &RequestId,
        result: Option<Value>,
        error: Option<JsonRpcError>,
    ) {
        let RequestId::Number(id) = id else {
            // Server-originated ids are always numeric.
            return;
        };
        let Some((_, entry)) = self.pending.remove(id) else {
            return;
        };
        if let Some(token) = &entry.progress_token {
            progress.deregister(token);
        }
        let outcome = match error {
            Some(error) => Err(McpError::from(error)),
            None => Ok(result.unwrap_or(Value::Null)),
        };
        let _ = entry.tx.send(outcome);
    }

    /// Fail every entry older than the configured timeout. Runs at most
    /// once per sweep interval; callers invoke it on every inbound frame.
    pub(crate) fn sweep(&self, progress: &ProgressRegistry) {
        {
            let mut last = self.last_sweep.lock();
            if last.elapsed() < Duration::from_millis(TIMEOUT_SWEEP_INTERVAL_MS) {
                return;
            }
            *last = Instant::now();
        }

        let expired: Vec<i64> = self
            .pending
            .iter()
            .filter(|entry| entry.value().sent_at.elapsed() >= self.timeout)
            .map(|entry| *entry.key())
            .collect();

        for id in expired {
            if let Some((_, entry)) = self.pending.remove(&id) {
                if let Some(token) = &entry.progress_token {
                    progress.deregister(token);
                }
                let _ = entry.tx.send(Err(McpError::Timeout {
                    after_ms: self.timeout.as_millis() as u64,
                }));
            }
        }
    }

    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.pending.len()
    }

    #[cfg(test)]
    pub(crate) fn force_expire(&self, id: i64, age: Duration) {
        if let Some(mut entry) = self.pending.get_mut(&id) {
            entry.sent_at = Instant::now() - age;
        }
        *self.last_sweep.lock() = Instant::now() - Duration::from_secs(1);
    }
}

impl std::fmt::Debug for OutboundTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OutboundTable")
            .field("pending", &self.pending.len())
            .field("timeout", &self.timeout)
            .finish()
    }
}

/// A server-originated request awaiting the client's answer.
///
/// Awaiting it yields the client's `result` or a typed failure. Dropping
/// it without awaiting leaves the table entry for the timeout sweep;
/// [`PendingRequest::cancel`] notifies the client, while
/// [`PendingRequest::abandon`] removes the entry locally.
#[must_use = "a pending request resolves only when awaited, cancelled, or abandoned"]
pub struct PendingRequest {
    pub(crate) id: i64,
    pub(crate) rx: oneshot::Receiver<Result<Value, McpError>>,
    pub(crate) session: Session,
}

impl PendingRequest {
    /// The allocated JSON-RPC id of this request.
    pub fn id(&self) -> i64 {
        self.id
    }

    /// Interrupting cancellation: remove the entry, drop any progress
    /// registration, and tell the client via `notifications/cancelled`.
    /// A response arriving later is dropped.
    pub async fn cancel(self, reason: Option<String>) {
        self.session.cancel_client_request(self.id, reason).await;
    }

    /// Local cancellation: remove the entry without notifying the client.
    pub fn abandon(self) {
        self.session.abandon_client_request(self.id);
    }
}

impl Future for PendingRequest {
    type Output = Result<Value, McpError>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.rx).poll(cx).map(|recv| match recv {
            Ok(outcome) => outcome,
            // Entry discarded without a completion (cancel/abandon race).
            Err(_) => Err(McpError::Cancelled { reason: None }),
        })
    }
}

impl std::fmt::Debug for PendingRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PendingRequest").field("id", &self.id).finish()
    }
}
