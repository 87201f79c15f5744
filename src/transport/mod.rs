//! Transport boundary - how the session reaches the out-of-process service.
//!
//! The session never opens connections itself. A [`Transport`] acquires and
//! releases the binding and reports what happened through a
//! [`SessionLink`]; once acquired, it hands over a [`RemoteService`] handle
//! that carries calls, and feeds inbound events into the returned
//! [`EventSink`](crate::connection::EventSink).
//!
//! [`StreamTransport`] is a ready-made implementation speaking the framed
//! MsgPack protocol over a Unix socket.

#[cfg(unix)]
mod socket;
#[cfg(unix)]
mod stream;
mod vocabulary;

use std::future::Future;
use std::pin::Pin;

use crate::connection::SessionLink;
use crate::error::Result;
use crate::types::{Client, Token};

#[cfg(unix)]
pub use socket::{connect_socket, generate_socket_path, SocketListener};
#[cfg(unix)]
pub use stream::{StreamService, StreamTransport, StreamTransportBuilder};
pub use vocabulary::{DirectCall, DirectReply, Registration, RegistrationKind, Request};

/// Boxed future returned by [`RemoteService`] methods.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// The binding primitive.
///
/// `acquire` only starts acquisition; success or failure arrives later via
/// [`SessionLink::on_acquired`] / [`SessionLink::on_released`], possibly on
/// another thread and possibly from inside `acquire` itself.
pub trait Transport: Send + Sync + 'static {
    /// Start acquiring the service.
    ///
    /// Returns an error when the acquisition cannot even be issued
    /// (for example, no runtime to run it on).
    fn acquire(&self, link: SessionLink) -> Result<()>;

    /// Release the binding. No further callbacks are expected on the link.
    fn release(&self);
}

/// Live handle to the connected service.
///
/// Every method completes once the service has accepted (or rejected) the
/// call; token-returning requests answer later through the event sink.
pub trait RemoteService: Send + Sync + 'static {
    /// Register a callback channel; the service issues the `Client`.
    fn register(&self, registration: Registration) -> BoxFuture<'_, Result<Client>>;

    /// Drop a registration.
    fn unregister(&self, client: Client) -> BoxFuture<'_, Result<()>>;

    /// Issue an asynchronous request; the service issues the `Token`.
    fn request(&self, client: Client, request: Request) -> BoxFuture<'_, Result<Token>>;

    /// Synchronous call answered directly (capability reads, setters).
    fn call(&self, call: DirectCall) -> BoxFuture<'_, Result<DirectReply>>;
}
