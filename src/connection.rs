//! Connection lifecycle shared by every subscriber.
//!
//! [`ConnectionManager`] keeps one binding to the service alive for as long
//! as at least one [`ConnectionListener`] is subscribed:
//!
//! ```text
//!               subscribe (first)              on_acquired
//! Disconnected ──────────────────► Connecting ─────────────► Connected
//!      ▲                               │                         │
//!      │           on_released         │   on_released /         │
//!      └───────────────────────────────┴── last unsubscribe ─────┘
//! ```
//!
//! Transports report through a [`SessionLink`]. Each acquisition bumps the
//! link's binding generation, so callbacks from an abandoned binding are
//! ignored. Each successful acquisition opens a new epoch, and the
//! [`EventSink`] handed back to the transport only routes events while its
//! epoch is current.
//!
//! Transitions and their notifications are serialized by a re-entrant gate:
//! a listener may subscribe, unsubscribe or read the state from inside a
//! notification, but never sees notifications reordered. The state lock
//! itself is never held while listener or transport code runs.

use std::fmt;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::{Arc, Weak};

use parking_lot::{Mutex, ReentrantMutex};

use crate::callback::{CallbackRouter, ClientRegistry};
use crate::token::TokenTable;
use crate::transport::{RemoteService, Transport};
use crate::types::InboundEvent;

/// Connection state as seen by subscribers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ConnectionState::Disconnected => "disconnected",
            ConnectionState::Connecting => "connecting",
            ConnectionState::Connected => "connected",
        };
        f.write_str(name)
    }
}

/// Observer of connection transitions.
///
/// Identity is the `Arc` allocation: subscribing the same `Arc` twice does
/// not add a second membership.
pub trait ConnectionListener: Send + Sync + 'static {
    fn on_connected(&self);
    fn on_disconnected(&self);
}

/// The remote handle of the current epoch.
#[derive(Clone)]
pub(crate) struct Live {
    pub(crate) service: Arc<dyn RemoteService>,
    pub(crate) epoch: u64,
}

struct State {
    state: ConnectionState,
    listeners: Vec<Arc<dyn ConnectionListener>>,
    service: Option<Arc<dyn RemoteService>>,
    /// Generation of the current transport binding.
    binding: u64,
    /// A binding is held (acquire issued, release not yet called).
    bound: bool,
    /// Bumped on every successful acquisition.
    epoch: u64,
}

enum Subscribed {
    Replay,
    Wait,
    Acquire(u64),
}

/// Owns the binding to the service on behalf of all subscribers.
pub struct ConnectionManager {
    this: Weak<ConnectionManager>,
    transport: Arc<dyn Transport>,
    state: Mutex<State>,
    gate: ReentrantMutex<()>,
    registry: Arc<ClientRegistry>,
    tokens: Arc<TokenTable>,
    router: CallbackRouter,
}

impl ConnectionManager {
    pub(crate) fn new(
        transport: Arc<dyn Transport>,
        registry: Arc<ClientRegistry>,
        tokens: Arc<TokenTable>,
    ) -> Arc<Self> {
        Arc::new_cyclic(|this| ConnectionManager {
            this: this.clone(),
            transport,
            state: Mutex::new(State {
                state: ConnectionState::Disconnected,
                listeners: Vec::new(),
                service: None,
                binding: 0,
                bound: false,
                epoch: 0,
            }),
            gate: ReentrantMutex::new(()),
            router: CallbackRouter::new(registry.clone(), tokens.clone()),
            registry,
            tokens,
        })
    }

    pub fn state(&self) -> ConnectionState {
        self.state.lock().state
    }

    pub fn is_connected(&self) -> bool {
        self.state() == ConnectionState::Connected
    }

    pub fn subscriber_count(&self) -> usize {
        self.state.lock().listeners.len()
    }

    /// Add `listener` and make sure a connection is on its way.
    ///
    /// If already connected the listener is told so at once. Returns `false`
    /// only when the transport refused to even start acquiring; the listener
    /// is not kept in that case.
    pub fn subscribe(&self, listener: Arc<dyn ConnectionListener>) -> bool {
        let _gate = self.gate.lock();

        let action = {
            let mut st = self.state.lock();
            if !st.listeners.iter().any(|l| Arc::ptr_eq(l, &listener)) {
                st.listeners.push(listener.clone());
            }
            match st.state {
                ConnectionState::Connected => Subscribed::Replay,
                ConnectionState::Connecting => Subscribed::Wait,
                ConnectionState::Disconnected if st.bound => Subscribed::Wait,
                ConnectionState::Disconnected => {
                    st.binding += 1;
                    st.bound = true;
                    st.state = ConnectionState::Connecting;
                    Subscribed::Acquire(st.binding)
                }
            }
        };

        match action {
            Subscribed::Replay => {
                notify(&listener, ConnectionState::Connected);
                true
            }
            Subscribed::Wait => true,
            Subscribed::Acquire(binding) => {
                tracing::debug!(binding, "acquiring service");
                let link = SessionLink {
                    manager: self.this.clone(),
                    binding,
                };
                match self.transport.acquire(link) {
                    Ok(()) => true,
                    Err(e) => {
                        tracing::warn!(error = %e, "service acquisition could not start");
                        let mut st = self.state.lock();
                        st.listeners.retain(|l| !Arc::ptr_eq(l, &listener));
                        if st.binding == binding && st.state == ConnectionState::Connecting {
                            st.state = ConnectionState::Disconnected;
                            st.bound = false;
                        }
                        false
                    }
                }
            }
        }
    }

    /// Remove `listener`; the last one out releases the binding, whether it
    /// is connected or still being acquired.
    ///
    /// A listener that never saw "connected" gets its "disconnected" here so
    /// every subscription ends with one.
    pub fn unsubscribe(&self, listener: &Arc<dyn ConnectionListener>) {
        let _gate = self.gate.lock();

        let (was_member, connected, release) = {
            let mut st = self.state.lock();
            let before = st.listeners.len();
            st.listeners.retain(|l| !Arc::ptr_eq(l, listener));
            let was_member = st.listeners.len() != before;
            let connected = st.state == ConnectionState::Connected;
            let release = was_member && st.bound && st.listeners.is_empty();
            if release {
                if connected {
                    self.drop_epoch(&mut st);
                }
                st.state = ConnectionState::Disconnected;
                st.bound = false;
            }
            (was_member, connected, release)
        };

        if !was_member {
            return;
        }
        if !connected {
            notify(listener, ConnectionState::Disconnected);
        }
        if release {
            tracing::info!("last subscriber left, releasing service");
            self.transport.release();
        }
    }

    /// The service handle, if connected.
    pub(crate) fn live(&self) -> Option<Live> {
        let st = self.state.lock();
        match (&st.service, st.state) {
            (Some(service), ConnectionState::Connected) => Some(Live {
                service: service.clone(),
                epoch: st.epoch,
            }),
            _ => None,
        }
    }

    /// Run `f` while `epoch` is still the live one.
    ///
    /// The state lock is held across `f`, so a release cannot slip in
    /// between the check and the effect. `f` must not block.
    pub(crate) fn if_current<R>(&self, epoch: u64, f: impl FnOnce() -> R) -> Option<R> {
        let st = self.state.lock();
        (st.state == ConnectionState::Connected && st.epoch == epoch).then(f)
    }

    fn drop_epoch(&self, st: &mut State) {
        st.state = ConnectionState::Disconnected;
        st.service = None;
        self.registry.clear();
        self.tokens.invalidate_all();
    }

    fn acquired(&self, binding: u64, service: Arc<dyn RemoteService>) -> EventSink {
        let _gate = self.gate.lock();

        let (epoch, listeners) = {
            let mut st = self.state.lock();
            if st.binding != binding || !st.bound {
                tracing::debug!(binding, "acquisition from an abandoned binding ignored");
                return EventSink::inert();
            }
            if st.state == ConnectionState::Connected {
                tracing::debug!(epoch = st.epoch, "duplicate acquisition ignored");
                return self.sink(st.epoch);
            }
            if st.listeners.is_empty() {
                st.state = ConnectionState::Disconnected;
                st.bound = false;
                drop(st);
                tracing::info!("service acquired with no subscribers left, releasing");
                self.transport.release();
                return EventSink::inert();
            }
            st.epoch += 1;
            st.state = ConnectionState::Connected;
            st.service = Some(service);
            (st.epoch, st.listeners.clone())
        };

        tracing::info!(epoch, subscribers = listeners.len(), "service connected");
        for listener in &listeners {
            notify(listener, ConnectionState::Connected);
        }
        self.sink(epoch)
    }

    fn released(&self, binding: u64) {
        let _gate = self.gate.lock();

        let listeners = {
            let mut st = self.state.lock();
            if st.binding != binding || !st.bound {
                tracing::debug!(binding, "release from an abandoned binding ignored");
                return;
            }
            if st.state == ConnectionState::Disconnected {
                return;
            }
            let was = st.state;
            self.drop_epoch(&mut st);
            tracing::info!(from = %was, "service lost");
            st.listeners.clone()
        };

        for listener in &listeners {
            notify(listener, ConnectionState::Disconnected);
        }
    }

    fn sink(&self, epoch: u64) -> EventSink {
        EventSink {
            manager: self.this.clone(),
            epoch,
        }
    }

    fn route(&self, epoch: u64, event: InboundEvent) {
        let st = self.state.lock();
        if st.state != ConnectionState::Connected || st.epoch != epoch {
            tracing::debug!(epoch, kind = ?event.kind(), "event from a stale connection dropped");
            return;
        }
        self.router.route(Arc::new(event));
    }
}

fn notify(listener: &Arc<dyn ConnectionListener>, state: ConnectionState) {
    let outcome = catch_unwind(AssertUnwindSafe(|| match state {
        ConnectionState::Connected => listener.on_connected(),
        _ => listener.on_disconnected(),
    }));
    if outcome.is_err() {
        tracing::error!(%state, "connection listener panicked");
    }
}

/// The transport's handle back into the session for one binding.
///
/// Cheap to clone. Once the session is gone, or a newer binding replaced
/// this one, every call is a no-op.
#[derive(Clone)]
pub struct SessionLink {
    manager: Weak<ConnectionManager>,
    binding: u64,
}

impl SessionLink {
    /// The service became reachable. Feed its inbound events into the
    /// returned sink.
    pub fn on_acquired(&self, service: Arc<dyn RemoteService>) -> EventSink {
        match self.manager.upgrade() {
            Some(manager) => manager.acquired(self.binding, service),
            None => EventSink::inert(),
        }
    }

    /// The service went away (or acquisition failed).
    pub fn on_released(&self) {
        if let Some(manager) = self.manager.upgrade() {
            manager.released(self.binding);
        }
    }

    /// Binding generation this link reports for.
    pub fn binding(&self) -> u64 {
        self.binding
    }
}

impl fmt::Debug for SessionLink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionLink")
            .field("binding", &self.binding)
            .finish()
    }
}

/// Entry point for inbound events of one connection epoch.
#[derive(Clone)]
pub struct EventSink {
    manager: Weak<ConnectionManager>,
    epoch: u64,
}

impl EventSink {
    /// A sink that routes nowhere.
    pub(crate) fn inert() -> Self {
        Self {
            manager: Weak::new(),
            epoch: 0,
        }
    }

    /// Route `event` to its registrations.
    ///
    /// Dropped silently once the epoch this sink belongs to has ended.
    pub fn deliver(&self, event: InboundEvent) {
        if let Some(manager) = self.manager.upgrade() {
            manager.route(self.epoch, event);
        }
    }

    /// Whether events pushed here can still reach anyone.
    pub fn is_live(&self) -> bool {
        self.manager
            .upgrade()
            .map(|m| m.if_current(self.epoch, || ()).is_some())
            .unwrap_or(false)
    }
}

impl fmt::Debug for EventSink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventSink").field("epoch", &self.epoch).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{ExtPhoneError, Result};
    use crate::transport::{BoxFuture, DirectCall, DirectReply, Registration, Request};
    use crate::types::{Client, Token};
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

    #[derive(Default)]
    struct FakeTransport {
        acquires: AtomicUsize,
        releases: AtomicUsize,
        links: Mutex<Vec<SessionLink>>,
        refuse: bool,
    }

    impl FakeTransport {
        fn link(&self) -> SessionLink {
            self.links.lock().last().cloned().unwrap()
        }
    }

    impl Transport for FakeTransport {
        fn acquire(&self, link: SessionLink) -> Result<()> {
            if self.refuse {
                return Err(ExtPhoneError::NotConnected);
            }
            self.acquires.fetch_add(1, Ordering::SeqCst);
            self.links.lock().push(link);
            Ok(())
        }

        fn release(&self) {
            self.releases.fetch_add(1, Ordering::SeqCst);
        }
    }

    struct NullService;

    impl RemoteService for NullService {
        fn register(&self, _registration: Registration) -> BoxFuture<'_, Result<Client>> {
            Box::pin(async { Err(ExtPhoneError::ConnectionClosed) })
        }
        fn unregister(&self, _client: Client) -> BoxFuture<'_, Result<()>> {
            Box::pin(async { Ok(()) })
        }
        fn request(&self, _client: Client, _request: Request) -> BoxFuture<'_, Result<Token>> {
            Box::pin(async { Err(ExtPhoneError::ConnectionClosed) })
        }
        fn call(&self, _call: DirectCall) -> BoxFuture<'_, Result<DirectReply>> {
            Box::pin(async { Ok(DirectReply::Unit) })
        }
    }

    #[derive(Default)]
    struct Counter {
        connected: AtomicUsize,
        disconnected: AtomicUsize,
    }

    impl ConnectionListener for Counter {
        fn on_connected(&self) {
            self.connected.fetch_add(1, Ordering::SeqCst);
        }
        fn on_disconnected(&self) {
            self.disconnected.fetch_add(1, Ordering::SeqCst);
        }
    }

    impl Counter {
        fn seen(&self) -> (usize, usize) {
            (
                self.connected.load(Ordering::SeqCst),
                self.disconnected.load(Ordering::SeqCst),
            )
        }
    }

    fn manager_with(transport: Arc<FakeTransport>) -> Arc<ConnectionManager> {
        ConnectionManager::new(
            transport,
            Arc::new(ClientRegistry::new(8)),
            Arc::new(TokenTable::new(8)),
        )
    }

    fn service() -> Arc<dyn RemoteService> {
        Arc::new(NullService)
    }

    #[test]
    fn test_first_subscriber_acquires_once() {
        let transport = Arc::new(FakeTransport::default());
        let manager = manager_with(transport.clone());
        let a = Arc::new(Counter::default());
        let b = Arc::new(Counter::default());

        assert!(manager.subscribe(a.clone()));
        assert!(manager.subscribe(b.clone()));
        assert_eq!(manager.state(), ConnectionState::Connecting);
        assert_eq!(transport.acquires.load(Ordering::SeqCst), 1);

        transport.link().on_acquired(service());

        assert!(manager.is_connected());
        assert_eq!(a.seen(), (1, 0));
        assert_eq!(b.seen(), (1, 0));
    }

    #[test]
    fn test_late_subscriber_gets_replay() {
        let transport = Arc::new(FakeTransport::default());
        let manager = manager_with(transport.clone());
        manager.subscribe(Arc::new(Counter::default()));
        transport.link().on_acquired(service());

        let late = Arc::new(Counter::default());
        assert!(manager.subscribe(late.clone()));
        assert_eq!(late.seen(), (1, 0));
        assert_eq!(transport.acquires.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_duplicate_subscribe_keeps_one_membership() {
        let transport = Arc::new(FakeTransport::default());
        let manager = manager_with(transport.clone());
        let a: Arc<dyn ConnectionListener> = Arc::new(Counter::default());

        manager.subscribe(a.clone());
        manager.subscribe(a.clone());
        assert_eq!(manager.subscriber_count(), 1);
    }

    #[test]
    fn test_last_unsubscribe_releases_once() {
        let transport = Arc::new(FakeTransport::default());
        let manager = manager_with(transport.clone());
        let a: Arc<dyn ConnectionListener> = Arc::new(Counter::default());
        let b: Arc<dyn ConnectionListener> = Arc::new(Counter::default());
        manager.subscribe(a.clone());
        manager.subscribe(b.clone());
        transport.link().on_acquired(service());

        manager.unsubscribe(&a);
        assert_eq!(transport.releases.load(Ordering::SeqCst), 0);
        manager.unsubscribe(&b);
        manager.unsubscribe(&b);

        assert_eq!(transport.releases.load(Ordering::SeqCst), 1);
        assert_eq!(manager.state(), ConnectionState::Disconnected);
    }

    #[test]
    fn test_unsubscribe_before_connected_reports_disconnected() {
        let transport = Arc::new(FakeTransport::default());
        let manager = manager_with(transport.clone());
        let counter = Arc::new(Counter::default());
        let listener: Arc<dyn ConnectionListener> = counter.clone();

        manager.subscribe(listener.clone());
        manager.unsubscribe(&listener);

        assert_eq!(counter.seen(), (0, 1));
        assert_eq!(transport.releases.load(Ordering::SeqCst), 1);
        assert_eq!(manager.state(), ConnectionState::Disconnected);
    }

    #[test]
    fn test_failed_acquisition_then_last_unsubscribe_allows_fresh_acquire() {
        let transport = Arc::new(FakeTransport::default());
        let manager = manager_with(transport.clone());
        let a: Arc<dyn ConnectionListener> = Arc::new(Counter::default());

        manager.subscribe(a.clone());
        transport.link().on_released();
        assert_eq!(manager.state(), ConnectionState::Disconnected);

        manager.unsubscribe(&a);
        assert_eq!(transport.releases.load(Ordering::SeqCst), 1);
        assert_eq!(manager.subscriber_count(), 0);

        let b = Arc::new(Counter::default());
        assert!(manager.subscribe(b.clone()));
        assert_eq!(transport.acquires.load(Ordering::SeqCst), 2);
        assert_eq!(manager.state(), ConnectionState::Connecting);

        transport.link().on_acquired(service());
        assert_eq!(b.seen(), (1, 0));
    }

    #[test]
    fn test_last_unsubscribe_while_rebinding_releases() {
        let transport = Arc::new(FakeTransport::default());
        let manager = manager_with(transport.clone());
        let counter = Arc::new(Counter::default());
        let listener: Arc<dyn ConnectionListener> = counter.clone();

        manager.subscribe(listener.clone());
        let link = transport.link();
        link.on_acquired(service());
        link.on_released();

        manager.unsubscribe(&listener);
        assert_eq!(transport.releases.load(Ordering::SeqCst), 1);
        assert_eq!(counter.seen(), (1, 2));

        // The old binding coming back is ignored.
        let sink = link.on_acquired(service());
        assert!(!sink.is_live());
        assert_eq!(manager.state(), ConnectionState::Disconnected);
        assert_eq!(transport.releases.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_acquired_after_everyone_left_is_ignored() {
        let transport = Arc::new(FakeTransport::default());
        let manager = manager_with(transport.clone());
        let counter = Arc::new(Counter::default());
        let listener: Arc<dyn ConnectionListener> = counter.clone();

        manager.subscribe(listener.clone());
        manager.unsubscribe(&listener);
        let sink = transport.link().on_acquired(service());

        assert_eq!(transport.releases.load(Ordering::SeqCst), 1);
        assert_eq!(manager.state(), ConnectionState::Disconnected);
        assert_eq!(counter.seen(), (0, 1));
        assert!(!sink.is_live());
    }

    #[test]
    fn test_refused_acquire_fails_subscribe() {
        let transport = Arc::new(FakeTransport {
            refuse: true,
            ..FakeTransport::default()
        });
        let manager = manager_with(transport);

        assert!(!manager.subscribe(Arc::new(Counter::default())));
        assert_eq!(manager.subscriber_count(), 0);
        assert_eq!(manager.state(), ConnectionState::Disconnected);
    }

    #[test]
    fn test_loss_and_rebind_on_same_link() {
        let transport = Arc::new(FakeTransport::default());
        let manager = manager_with(transport.clone());
        let counter = Arc::new(Counter::default());
        manager.subscribe(counter.clone());

        let link = transport.link();
        let first = link.on_acquired(service());
        link.on_released();
        link.on_released();
        assert_eq!(counter.seen(), (1, 1));
        assert!(!first.is_live());

        let second = link.on_acquired(service());
        assert_eq!(counter.seen(), (2, 1));
        assert!(second.is_live());
        assert!(!first.is_live());
        assert_eq!(transport.acquires.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_abandoned_binding_is_inert() {
        let transport = Arc::new(FakeTransport::default());
        let manager = manager_with(transport.clone());
        let a: Arc<dyn ConnectionListener> = Arc::new(Counter::default());

        manager.subscribe(a.clone());
        let old = transport.link();
        old.on_acquired(service());
        manager.unsubscribe(&a);

        manager.subscribe(a.clone());
        assert_eq!(transport.acquires.load(Ordering::SeqCst), 2);

        old.on_released();
        assert_eq!(manager.state(), ConnectionState::Connecting);
        old.on_acquired(service());
        assert_eq!(manager.state(), ConnectionState::Connecting);
    }

    struct Reentrant {
        manager: Weak<ConnectionManager>,
        me: Mutex<Option<Arc<dyn ConnectionListener>>>,
        observed: Mutex<Option<ConnectionState>>,
    }

    impl ConnectionListener for Reentrant {
        fn on_connected(&self) {
            let Some(manager) = self.manager.upgrade() else { return };
            *self.observed.lock() = Some(manager.state());
            if let Some(me) = self.me.lock().take() {
                manager.unsubscribe(&me);
            }
        }
        fn on_disconnected(&self) {}
    }

    #[test]
    fn test_listener_may_reenter() {
        let transport = Arc::new(FakeTransport::default());
        let manager = manager_with(transport.clone());
        let reentrant = Arc::new(Reentrant {
            manager: Arc::downgrade(&manager),
            me: Mutex::new(None),
            observed: Mutex::new(None),
        });
        let as_listener: Arc<dyn ConnectionListener> = reentrant.clone();
        *reentrant.me.lock() = Some(as_listener.clone());

        manager.subscribe(as_listener);
        transport.link().on_acquired(service());

        assert_eq!(*reentrant.observed.lock(), Some(ConnectionState::Connected));
        assert_eq!(manager.subscriber_count(), 0);
        assert_eq!(transport.releases.load(Ordering::SeqCst), 1);
    }

    struct Exploding;

    impl ConnectionListener for Exploding {
        fn on_connected(&self) {
            panic!("listener bug");
        }
        fn on_disconnected(&self) {}
    }

    #[test]
    fn test_panicking_listener_does_not_starve_others() {
        let transport = Arc::new(FakeTransport::default());
        let manager = manager_with(transport.clone());
        let counter = Arc::new(Counter::default());

        manager.subscribe(Arc::new(Exploding));
        manager.subscribe(counter.clone());
        transport.link().on_acquired(service());

        assert_eq!(counter.seen(), (1, 0));
        assert!(manager.is_connected());
    }

    /// Acquires synchronously and insists on strict acquire/release pairing.
    #[derive(Default)]
    struct EagerTransport {
        held: AtomicBool,
        acquires: AtomicUsize,
        releases: AtomicUsize,
        epochs: AtomicUsize,
    }

    impl Transport for EagerTransport {
        fn acquire(&self, link: SessionLink) -> Result<()> {
            assert!(!self.held.swap(true, Ordering::SeqCst), "acquire while bound");
            self.acquires.fetch_add(1, Ordering::SeqCst);
            if link.on_acquired(service()).is_live() {
                self.epochs.fetch_add(1, Ordering::SeqCst);
            }
            Ok(())
        }

        fn release(&self) {
            assert!(self.held.swap(false, Ordering::SeqCst), "release without binding");
            self.releases.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn test_concurrent_subscribers_release_once_per_epoch() {
        let transport = Arc::new(EagerTransport::default());
        let manager = ConnectionManager::new(
            transport.clone(),
            Arc::new(ClientRegistry::new(8)),
            Arc::new(TokenTable::new(8)),
        );

        let workers: Vec<_> = (0..8)
            .map(|_| {
                let manager = manager.clone();
                std::thread::spawn(move || {
                    let me: Arc<dyn ConnectionListener> = Arc::new(Counter::default());
                    for _ in 0..200 {
                        assert!(manager.subscribe(me.clone()));
                        manager.unsubscribe(&me);
                    }
                })
            })
            .collect();
        for worker in workers {
            worker.join().unwrap();
        }

        let acquires = transport.acquires.load(Ordering::SeqCst);
        let releases = transport.releases.load(Ordering::SeqCst);
        assert!(acquires >= 1);
        assert_eq!(releases, acquires);
        assert_eq!(transport.epochs.load(Ordering::SeqCst), releases);
        assert_eq!(manager.subscriber_count(), 0);
        assert_eq!(manager.state(), ConnectionState::Disconnected);
    }
}
