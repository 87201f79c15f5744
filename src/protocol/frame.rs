//! A decoded frame: header plus payload.

use bytes::Bytes;

use super::wire_format::{checked_payload_length, Header, HEADER_SIZE};
use crate::error::Result;

/// One complete protocol frame.
#[derive(Debug, Clone)]
pub struct Frame {
    pub header: Header,
    /// Payload bytes, shared without copying.
    pub payload: Bytes,
}

impl Frame {
    pub fn new(header: Header, payload: Bytes) -> Self {
        Self { header, payload }
    }

    #[inline]
    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    #[inline]
    pub fn kind(&self) -> u16 {
        self.header.kind
    }

    #[inline]
    pub fn call_id(&self) -> u32 {
        self.header.call_id
    }

    #[inline]
    pub fn is_error(&self) -> bool {
        self.header.is_error()
    }
}

/// Build a complete frame as one contiguous buffer.
///
/// The header's `payload_length` is overwritten with the real length.
///
/// ```
/// use extphone_client::protocol::{build_frame, Header, HEADER_SIZE};
///
/// let bytes = build_frame(&Header::call(42, 0), b"hello").unwrap();
/// assert_eq!(bytes.len(), HEADER_SIZE + 5);
/// ```
pub fn build_frame(header: &Header, payload: &[u8]) -> Result<Vec<u8>> {
    let header = Header {
        payload_length: checked_payload_length(payload.len(), u32::MAX)?,
        ..*header
    };
    let mut buf = Vec::with_capacity(HEADER_SIZE + payload.len());
    buf.extend_from_slice(&header.encode());
    buf.extend_from_slice(payload);
    Ok(buf)
}
