//! Frame header of the service socket protocol.
//!
//! Every frame starts with an 11-byte header:
//! ```text
//! ┌──────────┬───────┬──────────┬──────────┐
//! │ Kind     │ Flags │ Call ID  │ Length   │
//! │ 2 bytes  │ 1 byte│ 4 bytes  │ 4 bytes  │
//! │ uint16 BE│       │ uint32 BE│ uint32 BE│
//! └──────────┴───────┴──────────┴──────────┘
//! ```
//!
//! Calls carry a non-zero call id that the matching reply echoes back.
//! Events are unsolicited and always use call id 0.

use crate::error::{ExtPhoneError, Result};

/// Header size in bytes.
pub const HEADER_SIZE: usize = 11;

/// Default maximum payload size (16 MiB).
pub const DEFAULT_MAX_PAYLOAD_SIZE: u32 = 16 * 1024 * 1024;

/// Frame kinds.
pub mod kind {
    /// Client to service: a registration, request or direct call.
    pub const CALL: u16 = 1;
    /// Service to client: answer to a call.
    pub const REPLY: u16 = 2;
    /// Service to client: inbound event (response or broadcast).
    pub const EVENT: u16 = 3;
}

/// Flag bits.
pub mod flags {
    /// Frame travels towards the service.
    pub const TO_SERVICE: u8 = 0b0000_0001;
    /// Frame answers a call.
    pub const IS_RESPONSE: u8 = 0b0000_0010;
    /// The answer is an error message.
    pub const IS_ERROR: u8 = 0b0000_0100;

    /// Bits that must stay clear.
    pub const RESERVED_MASK: u8 = 0b1111_1000;

    #[inline]
    pub fn has_flag(flags: u8, flag: u8) -> bool {
        flags & flag != 0
    }

    /// Outbound call.
    pub const CALL: u8 = TO_SERVICE;
    /// Successful reply.
    pub const REPLY: u8 = IS_RESPONSE;
    /// Failed reply.
    pub const ERROR_REPLY: u8 = IS_RESPONSE | IS_ERROR;
    /// Inbound event.
    pub const EVENT: u8 = 0;
}

/// Decoded frame header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Header {
    /// One of the [`kind`] constants.
    pub kind: u16,
    /// See [`flags`].
    pub flags: u8,
    /// Correlates a reply with its call; 0 for events.
    pub call_id: u32,
    /// Payload length in bytes.
    pub payload_length: u32,
}

impl Header {
    pub fn new(kind: u16, flags: u8, call_id: u32, payload_length: u32) -> Self {
        Self {
            kind,
            flags,
            call_id,
            payload_length,
        }
    }

    /// Header for an outbound call.
    pub fn call(call_id: u32, payload_length: u32) -> Self {
        Self::new(kind::CALL, flags::CALL, call_id, payload_length)
    }

    /// Encode to bytes (big endian).
    ///
    /// ```
    /// use extphone_client::protocol::Header;
    ///
    /// let bytes = Header::call(42, 100).encode();
    /// assert_eq!(bytes.len(), 11);
    /// ```
    pub fn encode(&self) -> [u8; HEADER_SIZE] {
        let mut buf = [0u8; HEADER_SIZE];
        self.encode_into(&mut buf);
        buf
    }

    /// Encode into an existing buffer of at least [`HEADER_SIZE`] bytes.
    pub fn encode_into(&self, buf: &mut [u8]) {
        debug_assert!(buf.len() >= HEADER_SIZE);
        buf[0..2].copy_from_slice(&self.kind.to_be_bytes());
        buf[2] = self.flags;
        buf[3..7].copy_from_slice(&self.call_id.to_be_bytes());
        buf[7..11].copy_from_slice(&self.payload_length.to_be_bytes());
    }

    /// Decode from bytes. `None` if the buffer is too short.
    pub fn decode(buf: &[u8]) -> Option<Self> {
        if buf.len() < HEADER_SIZE {
            return None;
        }
        Some(Self {
            kind: u16::from_be_bytes([buf[0], buf[1]]),
            flags: buf[2],
            call_id: u32::from_be_bytes([buf[3], buf[4], buf[5], buf[6]]),
            payload_length: u32::from_be_bytes([buf[7], buf[8], buf[9], buf[10]]),
        })
    }

    /// Reject unknown kinds, oversize payloads and reserved flag bits.
    pub fn validate(&self, max_payload_size: u32) -> Result<()> {
        if !matches!(self.kind, kind::CALL | kind::REPLY | kind::EVENT) {
            return Err(ExtPhoneError::Protocol(format!(
                "unknown frame kind {}",
                self.kind
            )));
        }

        if self.payload_length > max_payload_size {
            return Err(ExtPhoneError::Protocol(format!(
                "payload size {} exceeds maximum {}",
                self.payload_length, max_payload_size
            )));
        }

        if self.flags & flags::RESERVED_MASK != 0 {
            return Err(ExtPhoneError::Protocol(
                "reserved flag bits must be 0".to_string(),
            ));
        }

        Ok(())
    }

    #[inline]
    pub fn is_response(&self) -> bool {
        flags::has_flag(self.flags, flags::IS_RESPONSE)
    }

    #[inline]
    pub fn is_error(&self) -> bool {
        flags::has_flag(self.flags, flags::IS_ERROR)
    }
}

/// Length field for a payload of `len` bytes.
///
/// Fails instead of truncating when `len` does not fit `max_payload_size`.
pub fn checked_payload_length(len: usize, max_payload_size: u32) -> Result<u32> {
    match u32::try_from(len) {
        Ok(length) if length <= max_payload_size => Ok(length),
        _ => Err(ExtPhoneError::Protocol(format!(
            "payload size {} exceeds maximum {}",
            len, max_payload_size
        ))),
    }
}
