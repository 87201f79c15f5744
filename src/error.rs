//! Error types for extphone-client.

use thiserror::Error;

/// Main error type for all session operations.
#[derive(Debug, Error)]
pub enum ExtPhoneError {
    /// Operation attempted while the service is disconnected or still connecting.
    #[error("Service not connected")]
    NotConnected,

    /// Caller supplied an argument the session rejects up front.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// The call to the remote service itself failed.
    #[error("Transport failure: {0}")]
    TransportFailure(String),

    /// The token's response will never arrive (connection dropped first).
    #[error("Request unresolved")]
    Unresolved,

    /// I/O error during socket operations.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON error (configuration loading).
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// MsgPack serialization error.
    #[error("MsgPack encode error: {0}")]
    MsgPackEncode(#[from] rmp_serde::encode::Error),

    /// MsgPack deserialization error.
    #[error("MsgPack decode error: {0}")]
    MsgPackDecode(#[from] rmp_serde::decode::Error),

    /// Protocol error (invalid frame, unexpected message kind, etc.).
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// Connection closed unexpectedly.
    #[error("Connection closed")]
    ConnectionClosed,

    /// Backpressure timeout - write buffer full.
    #[error("Backpressure timeout")]
    BackpressureTimeout,
}

impl ExtPhoneError {
    /// Whether this error means the remote call did not complete.
    ///
    /// Everything except the session-level outcomes (`NotConnected`,
    /// `InvalidArgument`, `Unresolved`) counts as a transport failure.
    pub fn is_transport_failure(&self) -> bool {
        !matches!(
            self,
            ExtPhoneError::NotConnected
                | ExtPhoneError::InvalidArgument(_)
                | ExtPhoneError::Unresolved
        )
    }

    /// Collapse transport-internal errors into `TransportFailure`.
    pub(crate) fn into_transport_failure(self) -> Self {
        match self {
            e @ (ExtPhoneError::NotConnected
            | ExtPhoneError::InvalidArgument(_)
            | ExtPhoneError::Unresolved
            | ExtPhoneError::TransportFailure(_)) => e,
            other => ExtPhoneError::TransportFailure(other.to_string()),
        }
    }
}

/// Result type alias using ExtPhoneError.
pub type Result<T> = std::result::Result<T, ExtPhoneError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transport_failure_grouping() {
        assert!(!ExtPhoneError::NotConnected.is_transport_failure());
        assert!(!ExtPhoneError::Unresolved.is_transport_failure());
        assert!(!ExtPhoneError::InvalidArgument("x".into()).is_transport_failure());
        assert!(ExtPhoneError::ConnectionClosed.is_transport_failure());
        assert!(ExtPhoneError::Protocol("bad".into()).is_transport_failure());
    }

    #[test]
    fn test_into_transport_failure() {
        let e = ExtPhoneError::ConnectionClosed.into_transport_failure();
        assert!(matches!(e, ExtPhoneError::TransportFailure(ref m) if m == "Connection closed"));

        let e = ExtPhoneError::NotConnected.into_transport_failure();
        assert!(matches!(e, ExtPhoneError::NotConnected));
    }
}
