//! # extphone-client
//!
//! Client session layer for the extended telephony service.
//!
//! The service runs out of process. This crate keeps one shared connection
//! to it alive on behalf of every interested component, turns callbacks into
//! service-issued [`Client`] handles, correlates asynchronous requests with
//! their responses through [`Token`]s and fans inbound events out to the
//! right callbacks.
//!
//! ## Architecture
//!
//! - **ConnectionManager**: connection state machine shared by all subscribers
//! - **ClientRegistry**: `Client` handle → callback, with event interest sets
//! - **RequestDispatcher**: one method per operation, issuing tokens
//! - **CallbackRouter**: inbound events to the registered callbacks, in order
//!
//! How bytes reach the service is behind the [`Transport`](transport::Transport)
//! trait; [`StreamTransport`](transport::StreamTransport) speaks a framed
//! MsgPack protocol over a Unix socket.
//!
//! ## Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use extphone_client::{ConnectionListener, ExtPhoneCallback, EventMeta, Session};
//! use extphone_client::transport::StreamTransport;
//! use extphone_client::types::data::NrIconType;
//!
//! struct Icons;
//!
//! impl ExtPhoneCallback for Icons {
//!     fn on_nr_icon_type(&self, meta: &EventMeta, icon: NrIconType) {
//!         println!("slot {:?}: {:?}", meta.slot, icon);
//!     }
//! }
//!
//! #[tokio::main]
//! async fn main() -> extphone_client::Result<()> {
//!     let session = Session::builder()
//!         .package_name("com.example.status")
//!         .build(StreamTransport::builder().build());
//!
//!     session.subscribe(listener.clone());
//!     // once connected:
//!     if let Some(client) = session.register_default(Arc::new(Icons)).await? {
//!         session.requests().query_nr_icon_type(0, client).await?;
//!     }
//!     Ok(())
//! }
//! ```

pub mod callback;
pub mod codec;
pub mod config;
pub mod connection;
pub mod dispatcher;
pub mod error;
pub mod protocol;
pub mod token;
pub mod transport;
pub mod types;
pub mod writer;

mod session;

pub use callback::ExtPhoneCallback;
pub use config::{SessionConfig, StreamTransportConfig};
pub use connection::{ConnectionListener, ConnectionState};
pub use dispatcher::RequestDispatcher;
pub use error::{ExtPhoneError, Result};
pub use session::{Session, SessionBuilder};
pub use token::ResponseFuture;
pub use types::{
    Client, EventKind, EventMeta, EventPayload, EventSet, InboundEvent, SlotId, Status, Token,
};
