//! Session and transport configuration.
//!
//! Both structs have sensible defaults and can be loaded from JSON:
//!
//! ```
//! use extphone_client::config::SessionConfig;
//!
//! let config = SessionConfig::from_json_str(r#"{ "delivery_queue_capacity": 32 }"#).unwrap();
//! assert_eq!(config.delivery_queue_capacity, 32);
//! assert_eq!(config.early_response_capacity, 64);
//! ```

use std::time::Duration;

use serde::Deserialize;

use crate::error::{ExtPhoneError, Result};
use crate::protocol::DEFAULT_MAX_PAYLOAD_SIZE;
use crate::writer::{
    WriterConfig, DEFAULT_BACKPRESSURE_TIMEOUT, DEFAULT_CHANNEL_CAPACITY,
    DEFAULT_MAX_PENDING_FRAMES,
};

/// Default per-registration inbound queue bound.
pub const DEFAULT_DELIVERY_QUEUE_CAPACITY: usize = 256;

/// Default number of responses retained for tokens not yet recorded.
pub const DEFAULT_EARLY_RESPONSE_CAPACITY: usize = 64;

/// Default time to wait for the service to answer a call.
pub const DEFAULT_CALL_TIMEOUT: Duration = Duration::from_secs(5);

/// First delay before reconnecting to a lost service socket.
pub const DEFAULT_RECONNECT_INITIAL: Duration = Duration::from_millis(100);

/// Cap for the doubling reconnect delay.
pub const DEFAULT_RECONNECT_MAX: Duration = Duration::from_secs(5);

/// Session-level knobs.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Maximum queued events per registration before new ones are dropped.
    pub delivery_queue_capacity: usize,
    /// Responses kept for tokens the dispatcher has not recorded yet.
    pub early_response_capacity: usize,
    /// Package identity used by the `Session::register*_default` helpers.
    pub package_name: Option<String>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            delivery_queue_capacity: DEFAULT_DELIVERY_QUEUE_CAPACITY,
            early_response_capacity: DEFAULT_EARLY_RESPONSE_CAPACITY,
            package_name: None,
        }
    }
}

impl SessionConfig {
    /// Parse a JSON document, filling missing fields with defaults.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values the session cannot work with.
    pub fn validate(&self) -> Result<()> {
        if self.delivery_queue_capacity == 0 {
            return Err(ExtPhoneError::InvalidArgument(
                "delivery_queue_capacity must be at least 1".to_string(),
            ));
        }
        if let Some(name) = &self.package_name {
            if name.trim().is_empty() {
                return Err(ExtPhoneError::InvalidArgument(
                    "package_name must not be blank".to_string(),
                ));
            }
        }
        Ok(())
    }
}

/// Settings for [`StreamTransport`](crate::transport::StreamTransport).
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct StreamTransportConfig {
    /// Unix socket the service listens on.
    pub socket_path: String,
    /// How long a call may wait for its reply, in milliseconds.
    pub call_timeout_ms: u64,
    /// Largest accepted inbound payload.
    pub max_payload_size: u32,
    /// Outbound frames in flight before senders wait.
    pub max_pending_frames: usize,
    /// Writer channel capacity.
    pub channel_capacity: usize,
    /// How long a sender waits for backpressure to clear, in milliseconds.
    pub backpressure_timeout_ms: u64,
    /// First reconnect delay, in milliseconds; doubles up to `reconnect_max_ms`.
    pub reconnect_initial_ms: u64,
    pub reconnect_max_ms: u64,
}

impl Default for StreamTransportConfig {
    fn default() -> Self {
        Self {
            socket_path: "/run/extphone/service.sock".to_string(),
            call_timeout_ms: DEFAULT_CALL_TIMEOUT.as_millis() as u64,
            max_payload_size: DEFAULT_MAX_PAYLOAD_SIZE,
            max_pending_frames: DEFAULT_MAX_PENDING_FRAMES,
            channel_capacity: DEFAULT_CHANNEL_CAPACITY,
            backpressure_timeout_ms: DEFAULT_BACKPRESSURE_TIMEOUT.as_millis() as u64,
            reconnect_initial_ms: DEFAULT_RECONNECT_INITIAL.as_millis() as u64,
            reconnect_max_ms: DEFAULT_RECONNECT_MAX.as_millis() as u64,
        }
    }
}

impl StreamTransportConfig {
    /// Parse a JSON document, filling missing fields with defaults.
    pub fn from_json_str(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Call timeout as a `Duration`.
    pub fn call_timeout(&self) -> Duration {
        Duration::from_millis(self.call_timeout_ms)
    }

    /// Reconnect backoff bounds as `(initial, max)`.
    pub fn reconnect_delays(&self) -> (Duration, Duration) {
        let initial = Duration::from_millis(self.reconnect_initial_ms.max(1));
        let max = Duration::from_millis(self.reconnect_max_ms).max(initial);
        (initial, max)
    }

    /// Writer task settings derived from this config.
    pub fn writer_config(&self) -> WriterConfig {
        WriterConfig {
            max_pending_frames: self.max_pending_frames,
            channel_capacity: self.channel_capacity,
            backpressure_timeout: Duration::from_millis(self.backpressure_timeout_ms),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_defaults() {
        let config = SessionConfig::default();
        assert_eq!(config.delivery_queue_capacity, DEFAULT_DELIVERY_QUEUE_CAPACITY);
        assert_eq!(config.early_response_capacity, DEFAULT_EARLY_RESPONSE_CAPACITY);
        assert!(config.package_name.is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_session_from_json_partial() {
        let config =
            SessionConfig::from_json_str(r#"{ "package_name": "com.example.dialer" }"#).unwrap();
        assert_eq!(config.package_name.as_deref(), Some("com.example.dialer"));
        assert_eq!(config.delivery_queue_capacity, DEFAULT_DELIVERY_QUEUE_CAPACITY);
    }

    #[test]
    fn test_session_rejects_zero_queue() {
        let result = SessionConfig::from_json_str(r#"{ "delivery_queue_capacity": 0 }"#);
        assert!(matches!(result, Err(ExtPhoneError::InvalidArgument(_))));
    }

    #[test]
    fn test_session_rejects_blank_package() {
        let result = SessionConfig::from_json_str(r#"{ "package_name": "  " }"#);
        assert!(matches!(result, Err(ExtPhoneError::InvalidArgument(_))));
    }

    #[test]
    fn test_malformed_json() {
        let result = SessionConfig::from_json_str("{ not json");
        assert!(matches!(result, Err(ExtPhoneError::Json(_))));
    }

    #[test]
    fn test_stream_config_writer_mapping() {
        let json = r#"{
            "socket_path": "/tmp/x.sock",
            "call_timeout_ms": 250,
            "backpressure_timeout_ms": 10
        }"#;
        let config = StreamTransportConfig::from_json_str(json).unwrap();

        assert_eq!(config.socket_path, "/tmp/x.sock");
        assert_eq!(config.call_timeout(), Duration::from_millis(250));

        assert_eq!(
            config.reconnect_delays(),
            (DEFAULT_RECONNECT_INITIAL, DEFAULT_RECONNECT_MAX)
        );

        let writer = config.writer_config();
        assert_eq!(writer.max_pending_frames, DEFAULT_MAX_PENDING_FRAMES);
        assert_eq!(writer.backpressure_timeout, Duration::from_millis(10));
    }
}
