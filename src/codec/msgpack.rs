//! MsgPack codec built on `rmp-serde`.
//!
//! Structs are always written in named (map) form so the service can add
//! fields without breaking older clients.
//!
//! ```
//! use extphone_client::codec::MsgPackCodec;
//! use extphone_client::types::data::SignalStrength;
//!
//! let strength = SignalStrength { rsrp: -95, snr: 12 };
//! let bytes = MsgPackCodec::encode(&strength).unwrap();
//! let back: SignalStrength = MsgPackCodec::decode(&bytes).unwrap();
//! assert_eq!(back, strength);
//! ```

use crate::error::Result;

/// MessagePack codec for frame payloads.
pub struct MsgPackCodec;

impl MsgPackCodec {
    /// Encode with struct-as-map layout.
    #[inline]
    pub fn encode<T: serde::Serialize>(value: &T) -> Result<Vec<u8>> {
        Ok(rmp_serde::to_vec_named(value)?)
    }

    #[inline]
    pub fn decode<T: serde::de::DeserializeOwned>(bytes: &[u8]) -> Result<T> {
        Ok(rmp_serde::from_slice(bytes)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ExtPhoneError;
    use crate::types::data::{ImsiEncryptionInfo, NrIcon, NrIconType};
    use crate::types::{Client, EventPayload, InboundEvent, Status, Token};

    #[test]
    fn test_response_event_keeps_correlation() {
        let event = InboundEvent::response(
            Client::from_raw(3),
            Some(Token::from_raw(17)),
            Some(1),
            Status::Success,
            EventPayload::NrIconResponse(NrIcon {
                icon_type: NrIconType::Uwb,
                rx_count: 4,
            }),
        );

        let bytes = MsgPackCodec::encode(&event).unwrap();
        let decoded: InboundEvent = MsgPackCodec::decode(&bytes).unwrap();

        assert_eq!(decoded, event);
        assert_eq!(decoded.token, Some(Token::from_raw(17)));
    }

    #[test]
    fn test_public_key_stays_binary() {
        let info = ImsiEncryptionInfo {
            mcc: "310".into(),
            mnc: "260".into(),
            key_type: 1,
            key_identifier: "key-1".into(),
            public_key: vec![0xde, 0xad, 0xbe, 0xef],
            expiration_ms: 0,
        };
        let bytes = MsgPackCodec::encode(&info).unwrap();
        // bin8 marker followed by the length
        assert!(bytes.windows(2).any(|w| w == [0xc4, 4]));

        let decoded: ImsiEncryptionInfo = MsgPackCodec::decode(&bytes).unwrap();
        assert_eq!(decoded.public_key, info.public_key);
    }

    #[test]
    fn test_decode_garbage() {
        let result: Result<InboundEvent> = MsgPackCodec::decode(&[0xc1]);
        assert!(matches!(result, Err(ExtPhoneError::MsgPackDecode(_))));
    }
}
