//! Value types shared by every layer of the session.
//!
//! - [`Client`] / [`Token`] - opaque handles issued by the remote service
//! - [`EventKind`] / [`EventSet`] - the inbound event vocabulary and interest sets
//! - [`InboundEvent`] - the envelope the transport hands to the router
//! - [`data`] - plain payload records

pub mod data;
mod event;
mod ids;

pub use event::{EventKind, EventMeta, EventPayload, EventSet, InboundEvent};
pub use ids::{Client, Feature, SlotId, Status, Token};
