//! Payload codec for the service socket.
//!
//! Frames carry MessagePack; see [`MsgPackCodec`].

mod msgpack;

pub use msgpack::MsgPackCodec;
