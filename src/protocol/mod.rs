//! Wire protocol spoken with the service socket.
//!
//! - 11-byte frame header ([`Header`], [`kind`], [`flags`])
//! - [`FrameBuffer`] for reassembling partial reads
//! - [`WireCall`] / [`WireReply`] payload vocabulary, MsgPack encoded

mod frame;
mod frame_buffer;
mod message;
mod wire_format;

pub use frame::{build_frame, Frame};
pub use frame_buffer::FrameBuffer;
pub use message::{WireCall, WireReply};
pub use wire_format::{
    checked_payload_length, flags, kind, Header, DEFAULT_MAX_PAYLOAD_SIZE, HEADER_SIZE,
};
