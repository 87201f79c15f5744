//! Correlation of asynchronous requests with their responses.
//!
//! The service issues a [`Token`] when it accepts a request and later sends
//! an event carrying the same token. [`TokenTable`] keeps the tokens issued
//! during the current connection and lets callers await the first response
//! through a [`ResponseFuture`].
//!
//! A response can overtake the reply that hands the token to the
//! dispatcher. Such early responses, and responses nobody is awaiting yet,
//! are retained in a small bounded buffer so that a later
//! [`TokenTable::response`] still sees them.

use std::collections::{HashMap, VecDeque};
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use parking_lot::Mutex;
use tokio::sync::oneshot;

use crate::error::{ExtPhoneError, Result};
use crate::types::{Client, InboundEvent, Token};

struct Outstanding {
    client: Client,
    waiter: Option<oneshot::Sender<Arc<InboundEvent>>>,
}

#[derive(Default)]
struct Table {
    outstanding: HashMap<Token, Outstanding>,
    settled: VecDeque<(Token, Arc<InboundEvent>)>,
}

/// Outstanding tokens of the current connection epoch.
pub struct TokenTable {
    table: Mutex<Table>,
    settled_capacity: usize,
}

impl TokenTable {
    /// `settled_capacity` bounds the responses retained without a waiter.
    pub fn new(settled_capacity: usize) -> Self {
        Self {
            table: Mutex::new(Table::default()),
            settled_capacity,
        }
    }

    /// Record a token the service just issued for `client`.
    pub fn track(&self, token: Token, client: Client) {
        let mut table = self.table.lock();
        if table.settled.iter().any(|(t, _)| *t == token) {
            tracing::debug!(%token, %client, "response arrived before token was recorded");
            return;
        }
        table.outstanding.insert(
            token,
            Outstanding {
                client,
                waiter: None,
            },
        );
    }

    /// Settle `event`'s token, if it carries one.
    ///
    /// Returns `true` when a waiter was woken.
    pub fn resolve(&self, event: &Arc<InboundEvent>) -> bool {
        let Some(token) = event.token else {
            return false;
        };
        let mut table = self.table.lock();

        if let Some(entry) = table.outstanding.remove(&token) {
            if let Some(waiter) = entry.waiter {
                tracing::trace!(%token, client = %entry.client, "token resolved");
                // A dropped ResponseFuture is fine; the callback still sees the event.
                return waiter.send(event.clone()).is_ok();
            }
        } else if table.settled.iter().any(|(t, _)| *t == token) {
            // Later events for the same token (scan results) do not replace the first.
            return false;
        }

        self.retain(&mut table, token, event.clone());
        false
    }

    fn retain(&self, table: &mut Table, token: Token, event: Arc<InboundEvent>) {
        if self.settled_capacity == 0 {
            return;
        }
        while table.settled.len() >= self.settled_capacity {
            if let Some((evicted, _)) = table.settled.pop_front() {
                tracing::debug!(token = %evicted, "unclaimed response evicted");
            }
        }
        table.settled.push_back((token, event));
    }

    /// Await the first response to `token`.
    ///
    /// Resolves to [`ExtPhoneError::Unresolved`] if the token is unknown or
    /// the connection drops first. Awaiting the same token twice replaces
    /// the earlier waiter, which then resolves to `Unresolved`.
    pub fn response(&self, token: Token) -> ResponseFuture {
        let mut table = self.table.lock();

        if let Some(pos) = table.settled.iter().position(|(t, _)| *t == token) {
            let event = table.settled.remove(pos).map(|(_, event)| event);
            return ResponseFuture::ready(event.ok_or(ExtPhoneError::Unresolved));
        }

        match table.outstanding.get_mut(&token) {
            Some(entry) => {
                let (tx, rx) = oneshot::channel();
                entry.waiter = Some(tx);
                ResponseFuture::waiting(rx)
            }
            None => ResponseFuture::ready(Err(ExtPhoneError::Unresolved)),
        }
    }

    /// Drop every token; their futures resolve to `Unresolved`.
    pub fn invalidate_all(&self) {
        let mut table = self.table.lock();
        let dropped = table.outstanding.len();
        table.outstanding.clear();
        table.settled.clear();
        if dropped > 0 {
            tracing::debug!(dropped, "outstanding tokens invalidated");
        }
    }

    /// Number of tokens still awaiting a response.
    pub fn outstanding(&self) -> usize {
        self.table.lock().outstanding.len()
    }
}

enum Inner {
    Ready(Option<Result<Arc<InboundEvent>>>),
    Waiting(oneshot::Receiver<Arc<InboundEvent>>),
}

/// Completion of one token. See [`TokenTable::response`].
pub struct ResponseFuture {
    inner: Inner,
}

impl ResponseFuture {
    fn ready(result: Result<Arc<InboundEvent>>) -> Self {
        Self {
            inner: Inner::Ready(Some(result)),
        }
    }

    fn waiting(rx: oneshot::Receiver<Arc<InboundEvent>>) -> Self {
        Self {
            inner: Inner::Waiting(rx),
        }
    }
}

impl Future for ResponseFuture {
    type Output = Result<Arc<InboundEvent>>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        match &mut self.inner {
            Inner::Ready(result) => {
                Poll::Ready(result.take().unwrap_or(Err(ExtPhoneError::Unresolved)))
            }
            Inner::Waiting(rx) => Pin::new(rx)
                .poll(cx)
                .map(|r| r.map_err(|_| ExtPhoneError::Unresolved)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{EventPayload, Status};

    fn answer(token: u32) -> Arc<InboundEvent> {
        Arc::new(InboundEvent::response(
            Client::from_raw(1),
            Some(Token::from_raw(token)),
            Some(0),
            Status::Success,
            EventPayload::EndcStatus(true),
        ))
    }

    #[tokio::test]
    async fn test_waiter_gets_response() {
        let table = TokenTable::new(8);
        table.track(Token::from_raw(5), Client::from_raw(1));

        let fut = table.response(Token::from_raw(5));
        assert!(table.resolve(&answer(5)));

        let event = fut.await.unwrap();
        assert_eq!(event.token, Some(Token::from_raw(5)));
        assert_eq!(table.outstanding(), 0);
    }

    #[tokio::test]
    async fn test_early_response_settles_on_track() {
        let table = TokenTable::new(8);
        assert!(!table.resolve(&answer(9)));

        table.track(Token::from_raw(9), Client::from_raw(1));
        assert_eq!(table.outstanding(), 0);

        let event = table.response(Token::from_raw(9)).await.unwrap();
        assert_eq!(event.token, Some(Token::from_raw(9)));
    }

    #[tokio::test]
    async fn test_response_without_waiter_is_kept() {
        let table = TokenTable::new(8);
        table.track(Token::from_raw(2), Client::from_raw(1));
        table.resolve(&answer(2));

        assert!(table.response(Token::from_raw(2)).await.is_ok());
        // claimed once only
        assert!(matches!(
            table.response(Token::from_raw(2)).await,
            Err(ExtPhoneError::Unresolved)
        ));
    }

    #[tokio::test]
    async fn test_invalidate_fails_pending() {
        let table = TokenTable::new(8);
        table.track(Token::from_raw(1), Client::from_raw(1));
        let fut = table.response(Token::from_raw(1));

        table.invalidate_all();

        assert!(matches!(fut.await, Err(ExtPhoneError::Unresolved)));
        assert_eq!(table.outstanding(), 0);
    }

    #[tokio::test]
    async fn test_unknown_token_unresolved() {
        let table = TokenTable::new(8);
        assert!(matches!(
            table.response(Token::from_raw(77)).await,
            Err(ExtPhoneError::Unresolved)
        ));
    }

    #[test]
    fn test_retained_responses_are_bounded() {
        let table = TokenTable::new(2);
        for t in 1..=3 {
            table.resolve(&answer(t));
        }
        let table_guard = table.table.lock();
        let kept: Vec<u32> = table_guard.settled.iter().map(|(t, _)| t.as_raw()).collect();
        assert_eq!(kept, vec![2, 3]);
    }

    #[test]
    fn test_broadcast_ignored() {
        let table = TokenTable::new(2);
        let event = Arc::new(InboundEvent::broadcast(Some(0), EventPayload::CiwlanAvailable(true)));
        assert!(!table.resolve(&event));
        assert!(table.table.lock().settled.is_empty());
    }
}
