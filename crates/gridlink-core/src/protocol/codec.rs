// ============================================
// File: crates/gridlink-core/src/protocol/codec.rs
// ============================================
//! # Protocol Codec
//!
//! ## Creation Reason
//! Encodes `SecureMessage` values to the JSON wire format and decodes
//! untrusted input back, rejecting oversized or foreign-suite messages
//! before any cryptography runs.
//!
//! ## Parsing Strategy
//! 1. Check the input size against `MAX_MESSAGE_SIZE`
//! 2. Deserialize (base64 fields, IV length, node ids, timestamps)
//! 3. Validate algorithm tags
//!
//! ## Last Modified
//! v0.1.0 - Initial codec implementation

use crate::error::{CoreError, Result};
use crate::protocol::messages::SecureMessage;

// ============================================
// Constants
// ============================================

/// Maximum accepted size of an encoded message (1 MiB).
pub const MAX_MESSAGE_SIZE: usize = 1024 * 1024;

// ============================================
// Codec Trait
// ============================================

/// Trait for encoding and decoding protocol messages.
///
/// # Type Parameters
/// * `T` - The message type to encode/decode
pub trait Codec<T> {
    /// Encodes a message into bytes.
    ///
    /// # Errors
    /// Returns `MalformedMessage` if the message cannot be serialized.
    fn encode(&self, msg: &T) -> Result<Vec<u8>>;

    /// Decodes a message from untrusted bytes.
    ///
    /// # Errors
    /// - `MessageTooLarge`: input exceeds the size limit
    /// - `MalformedMessage`: input is not a well-formed message
    /// - `UnsupportedAlgorithm`: message uses a foreign cipher suite
    fn decode(&self, buf: &[u8]) -> Result<T>;
}

// ============================================
// JsonCodec
// ============================================

/// JSON codec for `SecureMessage`.
#[derive(Debug, Default, Clone)]
pub struct JsonCodec {
    pretty: bool,
}

impl JsonCodec {
    /// Creates a codec producing compact JSON.
    #[must_use]
    pub const fn new() -> Self {
        Self { pretty: false }
    }

    /// Creates a codec producing indented JSON.
    #[must_use]
    pub const fn pretty() -> Self {
        Self { pretty: true }
    }
}

impl Codec<SecureMessage> for JsonCodec {
    fn encode(&self, msg: &SecureMessage) -> Result<Vec<u8>> {
        let encoded = if self.pretty {
            serde_json::to_vec_pretty(msg)
        } else {
            serde_json::to_vec(msg)
        };
        encoded.map_err(|e| CoreError::malformed(format!("encode failed: {e}")))
    }

    fn decode(&self, buf: &[u8]) -> Result<SecureMessage> {
        if buf.len() > MAX_MESSAGE_SIZE {
            return Err(CoreError::MessageTooLarge {
                max: MAX_MESSAGE_SIZE,
                actual: buf.len(),
            });
        }

        let msg: SecureMessage = serde_json::from_slice(buf)
            .map_err(|e| CoreError::malformed(format!("invalid secure message: {e}")))?;
        msg.validate()?;
        Ok(msg)
    }
}

// ============================================
// Convenience Functions
// ============================================

/// Serializes a message to a JSON string.
///
/// # Errors
/// Returns `MalformedMessage` if serialization fails.
pub fn to_json(msg: &SecureMessage) -> Result<String> {
    serde_json::to_string(msg).map_err(|e| CoreError::malformed(format!("encode failed: {e}")))
}

/// Parses and validates a message from a JSON string.
///
/// # Errors
/// See [`Codec::decode`].
pub fn from_json(json: &str) -> Result<SecureMessage> {
    JsonCodec::new().decode(json.as_bytes())
}

// ============================================
// Tests
// ============================================

#[cfg(test)]
mod tests {
    use gridlink_common::time::Timestamp;
    use gridlink_common::types::{MessageId, NodeId};

    use super::*;
    use crate::crypto::{ENVELOPE_ALGORITHM, IV_SIZE, SIGNATURE_ALGORITHM};
    use crate::protocol::messages::{EncryptedEnvelope, SignedStatement};

    fn sample_message() -> SecureMessage {
        let sender = NodeId::new("security_controller").unwrap();
        SecureMessage {
            encrypted_data: EncryptedEnvelope {
                ciphertext: vec![0x5A; 48],
                iv: [0x01; IV_SIZE],
                timestamp: Timestamp::now(),
                algorithm: ENVELOPE_ALGORITHM.into(),
                sender: sender.clone(),
            },
            message_id: MessageId::for_content(b"payload"),
            sender_node: sender.clone(),
            created_at: Timestamp::now(),
            signature: Some(SignedStatement {
                signature: vec![0x30, 0x45, 0x02],
                message: "payload".into(),
                timestamp: Some("2025-01-01T10:00:00.123456".into()),
                signer: sender,
                algorithm: SIGNATURE_ALGORITHM.into(),
            }),
        }
    }

    #[test]
    fn test_json_roundtrip() {
        let msg = sample_message();

        let json = to_json(&msg).unwrap();
        assert_eq!(from_json(&json).unwrap(), msg);

        let pretty = JsonCodec::pretty().encode(&msg).unwrap();
        assert_eq!(JsonCodec::new().decode(&pretty).unwrap(), msg);
    }

    #[test]
    fn test_signature_timestamp_kept_verbatim() {
        let json = to_json(&sample_message()).unwrap();
        let decoded = from_json(&json).unwrap();

        assert_eq!(
            decoded.signature.unwrap().timestamp.as_deref(),
            Some("2025-01-01T10:00:00.123456")
        );
    }

    #[test]
    fn test_decode_rejects_oversized() {
        let buf = vec![b' '; MAX_MESSAGE_SIZE + 1];
        assert!(matches!(
            JsonCodec::new().decode(&buf),
            Err(CoreError::MessageTooLarge { .. })
        ));
    }

    #[test]
    fn test_decode_rejects_malformed() {
        assert!(matches!(from_json("{"), Err(CoreError::MalformedMessage { .. })));
        assert!(matches!(
            from_json(r#"{"message_id":"0011223344556677"}"#),
            Err(CoreError::MalformedMessage { .. })
        ));

        let mut value = serde_json::to_value(sample_message()).unwrap();
        value["encrypted_data"]["ciphertext"] = "%%%".into();
        assert!(matches!(
            from_json(&value.to_string()),
            Err(CoreError::MalformedMessage { .. })
        ));
    }

    #[test]
    fn test_decode_rejects_foreign_algorithm() {
        let mut value = serde_json::to_value(sample_message()).unwrap();
        value["signature"]["algorithm"] = "RSA-PSS".into();

        assert!(matches!(
            from_json(&value.to_string()),
            Err(CoreError::UnsupportedAlgorithm { .. })
        ));
    }
}
