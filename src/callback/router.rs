//! Fan-out of inbound events.
//!
//! An event addressed to a client answers that client's own request and
//! goes to it alone, whatever its interest set. An event without a client
//! is a broadcast and goes to every registration interested in its kind.
//! Token-bearing events also settle the token first.

use std::sync::Arc;

use super::registry::ClientRegistry;
use crate::token::TokenTable;
use crate::types::InboundEvent;

/// Routes inbound events into registrations.
pub struct CallbackRouter {
    registry: Arc<ClientRegistry>,
    tokens: Arc<TokenTable>,
}

impl CallbackRouter {
    pub fn new(registry: Arc<ClientRegistry>, tokens: Arc<TokenTable>) -> Self {
        Self { registry, tokens }
    }

    /// Route one event. Never blocks.
    pub fn route(&self, event: Arc<InboundEvent>) {
        self.tokens.resolve(&event);

        let kind = event.kind();
        match event.client {
            Some(client) => {
                if !self.registry.enqueue_to(client, &event) {
                    tracing::debug!(%client, ?kind, "response for an unknown client dropped");
                }
            }
            None => {
                let reached = self.registry.enqueue_interested(kind, &event);
                tracing::trace!(?kind, reached, "broadcast routed");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::callback::ExtPhoneCallback;
    use crate::types::{Client, EventKind, EventMeta, EventPayload, EventSet, Status, Token};
    use std::time::Duration;
    use tokio::sync::mpsc;

    struct Probe(mpsc::UnboundedSender<EventKind>);

    impl ExtPhoneCallback for Probe {
        fn unhandled(&self, kind: EventKind) {
            let _ = self.0.send(kind);
        }
    }

    struct Panicky;

    impl ExtPhoneCallback for Panicky {
        fn on_ciwlan_available(&self, _meta: &EventMeta, _available: bool) {
            panic!("boom");
        }
    }

    fn probe() -> (Arc<Probe>, mpsc::UnboundedReceiver<EventKind>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Arc::new(Probe(tx)), rx)
    }

    fn router() -> (CallbackRouter, Arc<ClientRegistry>, Arc<TokenTable>) {
        let registry = Arc::new(ClientRegistry::new(16));
        let tokens = Arc::new(TokenTable::new(8));
        (CallbackRouter::new(registry.clone(), tokens.clone()), registry, tokens)
    }

    async fn next(rx: &mut mpsc::UnboundedReceiver<EventKind>) -> Option<EventKind> {
        tokio::time::timeout(Duration::from_millis(200), rx.recv())
            .await
            .ok()
            .flatten()
    }

    #[tokio::test]
    async fn test_broadcast_respects_interest() {
        let (router, registry, _) = router();
        let (all, mut all_rx) = probe();
        let (narrow, mut narrow_rx) = probe();
        registry.bind(Client::from_raw(1), "a.pkg", all, EventSet::all());
        registry.bind(
            Client::from_raw(2),
            "b.pkg",
            narrow,
            EventSet::from_iter([EventKind::NrIconChange]),
        );

        router.route(Arc::new(InboundEvent::broadcast(
            Some(0),
            EventPayload::CiwlanAvailable(false),
        )));

        assert_eq!(next(&mut all_rx).await, Some(EventKind::CiwlanAvailable));
        assert_eq!(next(&mut narrow_rx).await, None);
    }

    #[tokio::test]
    async fn test_targeted_ignores_interest_and_other_clients() {
        let (router, registry, _) = router();
        let (mine, mut mine_rx) = probe();
        let (other, mut other_rx) = probe();
        registry.bind(
            Client::from_raw(1),
            "a.pkg",
            mine,
            EventSet::from_iter([EventKind::NrIconChange]),
        );
        registry.bind(Client::from_raw(2), "b.pkg", other, EventSet::all());

        router.route(Arc::new(InboundEvent::response(
            Client::from_raw(1),
            Some(Token::from_raw(3)),
            Some(0),
            Status::Success,
            EventPayload::EndcStatus(true),
        )));

        assert_eq!(next(&mut mine_rx).await, Some(EventKind::EndcStatus));
        assert_eq!(next(&mut other_rx).await, None);
    }

    #[tokio::test]
    async fn test_per_client_order_kept() {
        let (router, registry, _) = router();
        let (cb, mut rx) = probe();
        registry.bind(Client::from_raw(1), "a.pkg", cb, EventSet::all());

        let kinds = [
            EventPayload::StartNetworkScan(0),
            EventPayload::EndcStatus(false),
            EventPayload::StopNetworkScan(0),
        ];
        for payload in kinds {
            router.route(Arc::new(InboundEvent::broadcast(Some(0), payload)));
        }

        assert_eq!(next(&mut rx).await, Some(EventKind::StartNetworkScan));
        assert_eq!(next(&mut rx).await, Some(EventKind::EndcStatus));
        assert_eq!(next(&mut rx).await, Some(EventKind::StopNetworkScan));
    }

    #[tokio::test]
    async fn test_panicking_callback_isolated() {
        let (router, registry, _) = router();
        let (cb, mut rx) = probe();
        registry.bind(Client::from_raw(1), "bad.pkg", Arc::new(Panicky), EventSet::all());
        registry.bind(Client::from_raw(2), "good.pkg", cb, EventSet::all());

        router.route(Arc::new(InboundEvent::broadcast(
            Some(0),
            EventPayload::CiwlanAvailable(true),
        )));
        router.route(Arc::new(InboundEvent::broadcast(Some(0), EventPayload::SetSimType)));

        assert_eq!(next(&mut rx).await, Some(EventKind::CiwlanAvailable));
        assert_eq!(next(&mut rx).await, Some(EventKind::SetSimType));
    }

    #[tokio::test]
    async fn test_cleared_registry_stops_delivery() {
        let (router, registry, _) = router();
        let (cb, mut rx) = probe();
        registry.bind(Client::from_raw(1), "a.pkg", cb, EventSet::all());
        registry.clear();

        router.route(Arc::new(InboundEvent::broadcast(Some(0), EventPayload::SetSimType)));

        assert!(registry.is_empty());
        assert_eq!(next(&mut rx).await, None);
    }

    #[tokio::test]
    async fn test_response_settles_token() {
        let (router, registry, tokens) = router();
        let (cb, _rx) = probe();
        registry.bind(Client::from_raw(1), "a.pkg", cb, EventSet::all());
        tokens.track(Token::from_raw(8), Client::from_raw(1));
        let pending = tokens.response(Token::from_raw(8));

        router.route(Arc::new(InboundEvent::response(
            Client::from_raw(1),
            Some(Token::from_raw(8)),
            Some(1),
            Status::Failure,
            EventPayload::SetNrConfig,
        )));

        let event = pending.await.unwrap();
        assert_eq!(event.status, Status::Failure);
    }
}
