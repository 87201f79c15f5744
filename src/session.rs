//! Session builder and composition root.
//!
//! The [`SessionBuilder`] collects the session knobs; [`SessionBuilder::build`]
//! wires one transport to the connection manager, registry, token table and
//! dispatcher. A [`Session`] is a cheap handle that can be cloned into tasks.
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use extphone_client::transport::StreamTransport;
//! use extphone_client::Session;
//!
//! let session = Session::builder()
//!     .package_name("com.example.dialer")
//!     .build(StreamTransport::builder().build());
//!
//! session.subscribe(listener.clone());
//! // ...after on_connected:
//! let client = session.register_default(callback).await?.expect("connected");
//! let token = session.requests().query_nr_icon_type(0, client).await?;
//! if let Some(token) = token {
//!     let response = session.response(token).await?;
//! }
//! ```

use std::sync::Arc;

use crate::callback::{ClientRegistry, ExtPhoneCallback};
use crate::config::SessionConfig;
use crate::connection::{ConnectionListener, ConnectionManager, ConnectionState};
use crate::dispatcher::RequestDispatcher;
use crate::error::{ExtPhoneError, Result};
use crate::token::{ResponseFuture, TokenTable};
use crate::transport::{RegistrationKind, Transport};
use crate::types::{Client, EventSet, Token};

/// Builder for a [`Session`].
#[derive(Debug, Clone, Default)]
pub struct SessionBuilder {
    config: SessionConfig,
}

impl SessionBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from a loaded config.
    pub fn from_config(config: SessionConfig) -> Self {
        Self { config }
    }

    /// Maximum queued events per registration.
    pub fn delivery_queue_capacity(mut self, capacity: usize) -> Self {
        self.config.delivery_queue_capacity = capacity;
        self
    }

    /// Responses kept for tokens not recorded yet.
    pub fn early_response_capacity(mut self, capacity: usize) -> Self {
        self.config.early_response_capacity = capacity;
        self
    }

    /// Package identity for the `register*_default` helpers.
    pub fn package_name(mut self, name: impl Into<String>) -> Self {
        self.config.package_name = Some(name.into());
        self
    }

    /// Build the session over `transport`.
    pub fn build<T: Transport>(self, transport: T) -> Session {
        self.build_shared(Arc::new(transport))
    }

    /// Build the session over a transport shared with other owners.
    pub fn build_shared(self, transport: Arc<dyn Transport>) -> Session {
        let registry = Arc::new(ClientRegistry::new(self.config.delivery_queue_capacity));
        let tokens = Arc::new(TokenTable::new(self.config.early_response_capacity));
        let connection = ConnectionManager::new(transport, registry.clone(), tokens.clone());
        let dispatcher = RequestDispatcher::new(
            connection.clone(),
            registry.clone(),
            tokens.clone(),
        );

        tracing::debug!(
            queue = self.config.delivery_queue_capacity,
            early = self.config.early_response_capacity,
            "session built"
        );

        Session {
            inner: Arc::new(Inner {
                config: self.config,
                connection,
                registry,
                tokens,
                dispatcher,
            }),
        }
    }
}

struct Inner {
    config: SessionConfig,
    connection: Arc<ConnectionManager>,
    registry: Arc<ClientRegistry>,
    tokens: Arc<TokenTable>,
    dispatcher: RequestDispatcher,
}

/// Handle to one client session with the telephony service.
#[derive(Clone)]
pub struct Session {
    inner: Arc<Inner>,
}

impl Session {
    pub fn builder() -> SessionBuilder {
        SessionBuilder::new()
    }

    pub fn config(&self) -> &SessionConfig {
        &self.inner.config
    }

    /// The shared connection manager.
    pub fn connection(&self) -> &Arc<ConnectionManager> {
        &self.inner.connection
    }

    /// See [`ConnectionManager::subscribe`].
    pub fn subscribe(&self, listener: Arc<dyn ConnectionListener>) -> bool {
        self.inner.connection.subscribe(listener)
    }

    /// See [`ConnectionManager::unsubscribe`].
    pub fn unsubscribe(&self, listener: &Arc<dyn ConnectionListener>) {
        self.inner.connection.unsubscribe(listener)
    }

    pub fn state(&self) -> ConnectionState {
        self.inner.connection.state()
    }

    pub fn is_connected(&self) -> bool {
        self.inner.connection.is_connected()
    }

    /// Register `callback` for every event kind.
    pub async fn register(
        &self,
        package: &str,
        callback: Arc<dyn ExtPhoneCallback>,
    ) -> Result<Option<Client>> {
        self.register_kind(package, callback, RegistrationKind::All).await
    }

    /// Register `callback` for the kinds in `events` only.
    ///
    /// An empty set is rejected before the connection is looked at.
    pub async fn register_with_events(
        &self,
        package: &str,
        callback: Arc<dyn ExtPhoneCallback>,
        events: EventSet,
    ) -> Result<Option<Client>> {
        self.register_kind(package, callback, RegistrationKind::Events(events))
            .await
    }

    /// Register `callback` on the radio-config channel.
    pub async fn register_radio_config(
        &self,
        package: &str,
        callback: Arc<dyn ExtPhoneCallback>,
    ) -> Result<Option<Client>> {
        self.register_kind(package, callback, RegistrationKind::RadioConfig)
            .await
    }

    /// [`register`](Self::register) with the configured package name.
    pub async fn register_default(
        &self,
        callback: Arc<dyn ExtPhoneCallback>,
    ) -> Result<Option<Client>> {
        let package = self.default_package()?;
        self.register(&package, callback).await
    }

    /// [`register_with_events`](Self::register_with_events) with the configured package name.
    pub async fn register_with_events_default(
        &self,
        callback: Arc<dyn ExtPhoneCallback>,
        events: EventSet,
    ) -> Result<Option<Client>> {
        let package = self.default_package()?;
        self.register_with_events(&package, callback, events).await
    }

    /// [`register_radio_config`](Self::register_radio_config) with the configured package name.
    pub async fn register_radio_config_default(
        &self,
        callback: Arc<dyn ExtPhoneCallback>,
    ) -> Result<Option<Client>> {
        let package = self.default_package()?;
        self.register_radio_config(&package, callback).await
    }

    /// Drop a registration. Unknown or stale clients are ignored.
    pub async fn unregister(&self, client: Client) {
        self.inner
            .registry
            .unregister(&self.inner.connection, client)
            .await
    }

    /// Registrations valid on the current connection.
    pub fn registration_count(&self) -> usize {
        self.inner.registry.len()
    }

    /// Every operation the service offers.
    pub fn requests(&self) -> &RequestDispatcher {
        &self.inner.dispatcher
    }

    /// Completion of a token returned by one of the [`requests`](Self::requests).
    pub fn response(&self, token: Token) -> ResponseFuture {
        self.inner.tokens.response(token)
    }

    /// Tokens of the current connection still awaiting a response.
    pub fn outstanding_tokens(&self) -> usize {
        self.inner.tokens.outstanding()
    }

    async fn register_kind(
        &self,
        package: &str,
        callback: Arc<dyn ExtPhoneCallback>,
        kind: RegistrationKind,
    ) -> Result<Option<Client>> {
        self.inner
            .registry
            .register(&self.inner.connection, package, callback, kind)
            .await
    }

    fn default_package(&self) -> Result<String> {
        self.inner
            .config
            .package_name
            .clone()
            .ok_or_else(|| ExtPhoneError::InvalidArgument("no package_name configured".into()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connection::SessionLink;

    struct Refusing;

    impl Transport for Refusing {
        fn acquire(&self, _link: SessionLink) -> Result<()> {
            Err(ExtPhoneError::NotConnected)
        }

        fn release(&self) {}
    }

    struct Quiet;

    impl ConnectionListener for Quiet {
        fn on_connected(&self) {}
        fn on_disconnected(&self) {}
    }

    struct Silent;

    impl ExtPhoneCallback for Silent {}

    #[test]
    fn test_builder_knobs() {
        let session = Session::builder()
            .delivery_queue_capacity(8)
            .early_response_capacity(4)
            .package_name("com.example.settings")
            .build(Refusing);

        assert_eq!(session.config().delivery_queue_capacity, 8);
        assert_eq!(session.config().early_response_capacity, 4);
        assert_eq!(session.config().package_name.as_deref(), Some("com.example.settings"));
        assert_eq!(session.state(), ConnectionState::Disconnected);
    }

    #[test]
    fn test_refused_subscribe() {
        let session = Session::builder().build(Refusing);
        let listener: Arc<dyn ConnectionListener> = Arc::new(Quiet);

        assert!(!session.subscribe(listener));
        assert_eq!(session.connection().subscriber_count(), 0);
        assert!(!session.is_connected());
    }

    #[tokio::test]
    async fn test_register_default_needs_package_name() {
        let session = Session::builder().build(Refusing);

        let result = session.register_default(Arc::new(Silent)).await;
        assert!(matches!(result, Err(ExtPhoneError::InvalidArgument(_))));
    }

    #[tokio::test]
    async fn test_register_while_disconnected() {
        let session = Session::builder().package_name("com.example").build(Refusing);

        assert!(session.register_default(Arc::new(Silent)).await.unwrap().is_none());
        assert_eq!(session.registration_count(), 0);

        // Validation still comes first.
        let result = session
            .register_with_events("com.example", Arc::new(Silent), EventSet::default())
            .await;
        assert!(matches!(result, Err(ExtPhoneError::InvalidArgument(_))));
    }

    #[tokio::test]
    async fn test_unknown_token_is_unresolved() {
        let session = Session::builder().build(Refusing);

        let result = session.response(Token::from_raw(5)).await;
        assert!(matches!(result, Err(ExtPhoneError::Unresolved)));
        assert_eq!(session.outstanding_tokens(), 0);
    }
}
