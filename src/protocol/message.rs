//! Payloads carried inside frames.
//!
//! A `CALL` frame carries a [`WireCall`], a successful `REPLY` frame a
//! [`WireReply`], an error `REPLY` a plain message string and an `EVENT`
//! frame an [`InboundEvent`](crate::types::InboundEvent).

use serde::{Deserialize, Serialize};

use crate::transport::{DirectCall, DirectReply, Registration, Request};
use crate::types::{Client, Token};

/// Client to service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum WireCall {
    Register(Registration),
    Unregister(Client),
    Request { client: Client, request: Request },
    Direct(DirectCall),
}

/// Service to client, answering a [`WireCall`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum WireReply {
    Registered(Client),
    Unregistered,
    Accepted(Token),
    Direct(DirectReply),
}
