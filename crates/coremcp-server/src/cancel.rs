//! In-flight request cancellation signal.
//!
//! Every identified inbound request gets a [`CancelToken`] before its
//! handler runs. The `notifications/cancelled` handler completes it with
//! the client's reason; the dispatcher checks it again just before
//! emission and suppresses the response when it fired.

use tokio::sync::watch;

#[derive(Debug, Clone)]
enum CancelState {
    Active,
    Cancelled(Option<String>),
}

/// One-shot cancellation signal for a single inbound request.
///
/// Handlers obtain this through
/// [`RequestExchange::cancelled`](crate::exchange::RequestExchange::cancelled)
/// and may inspect it at any point or await it alongside their own work.
#[derive(Debug)]
pub struct CancelToken {
    tx: watch::Sender<CancelState>,
}

impl CancelToken {
    pub(crate) fn new() -> Self {
        let (tx, _rx) = watch::channel(CancelState::Active);
        Self { tx }
    }

    /// Complete the signal. The first call wins; later calls are ignored.
    pub(crate) fn cancel(&self, reason: Option<String>) {
        self.tx.send_if_modified(|state| match state {
            CancelState::Active => {
                *state = CancelState::Cancelled(reason.clone());
                true
            }
            CancelState::Cancelled(_) => false,
        });
    }

    /// Whether the request has been cancelled.
    pub fn is_cancelled(&self) -> bool {
        matches!(&*self.tx.borrow(), CancelState::Cancelled(_))
    }

    /// The cancellation reason, once cancelled. `None` while active.
    pub fn reason(&self) -> Option<Option<String>> {
        match &*self.tx.borrow() {
            CancelState::Active => None,
            CancelState::Cancelled(reason) => Some(reason.clone()),
        }
    }

    /// Wait until the request is cancelled; resolves to the client's
    /// reason. Never resolves if no cancellation arrives.
    pub async fn cancelled(&self) -> Option<String> {
        let mut rx = self.tx.subscribe();
        loop {
            if let CancelState::Cancelled(reason) = &*rx.borrow_and_update() {
                return reason.clone();
            }
            if rx.changed().await.is_err() {
                // Sender gone without firing; treat as never-cancelled and
                // park forever rather than fabricate a cancellation.
                std::future::pending::<()>().await;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn fires_once_with_reason() {
        let token = CancelToken::new();
        assert!(!token.is_cancelled());

        token.cancel(Some("stop".into()));
        token.cancel(Some("late".into()));

        assert!(token.is_cancelled());
        assert_eq!(token.reason(), Some(Some("stop".into())));
        assert_eq!(token.cancelled().await, Some("stop".into()));
    }

    #[tokio::test]
    async fn wakes_a_parked_waiter() {
        let token = std::sync::Arc::new(CancelToken::new());
        let waiter = {
            let token = token.clone();
            tokio::spawn(async move { token.cancelled().await })
        };
        tokio::task::yield_now().await;
        token.cancel(None);
        assert_eq!(waiter.await.unwrap(), None);
    }
}
