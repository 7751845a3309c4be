// ============================================
// File: crates/gridlink-core/src/protocol/messages.rs
// ============================================
//! # Protocol Messages
//!
//! ## Creation Reason
//! Defines the structures exchanged between nodes and their JSON shape.
//!
//! ## Main Functionality
//! - `EncryptedEnvelope`: ciphertext, IV and diagnostic metadata
//! - `SignedStatement`: ECDSA signature over the plaintext (+ timestamp)
//! - `SecureMessage`: one envelope, its fingerprint, optional statement
//! - `SignatureStatus`: tri-state verification outcome
//!
//! ## Wire Format
//! ```text
//! {
//!   "encrypted_data": {
//!     "ciphertext": "<base64>", "iv": "<base64, 16 bytes>",
//!     "timestamp": "<ISO-8601>", "algorithm": "AES-256-CBC", "sender": "<node id>"
//!   },
//!   "message_id": "<16 hex chars>",
//!   "sender_node": "<node id>",
//!   "created_at": "<ISO-8601>",
//!   "signature": {                                  (optional)
//!     "signature": "<base64 DER>", "message": "<plaintext>",
//!     "timestamp": "<ISO-8601>",                    (optional)
//!     "signer": "<node id>", "algorithm": "ECDSA-SHA256"
//!   }
//! }
//! ```
//!
//! ## ⚠️ Important Note for Next Developer
//! - `SignedStatement::timestamp` stays a raw string: the signature covers
//!   the exact text, so it must never be re-formatted
//! - Field names are shared with deployed nodes; do not rename
//!
//! ## Last Modified
//! v0.1.0 - Initial message definitions

use std::fmt;

use serde::{Deserialize, Serialize};

use gridlink_common::time::Timestamp;
use gridlink_common::types::{MessageId, NodeId};

use crate::crypto::{ENVELOPE_ALGORITHM, IV_SIZE, SIGNATURE_ALGORITHM};
use crate::error::{CoreError, Result};

// ============================================
// EncryptedEnvelope
// ============================================

/// Ciphertext plus the parameters needed to decrypt it.
///
/// `timestamp` and `sender` are diagnostic; they are not bound into the
/// ciphertext.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncryptedEnvelope {
    /// AES-256-CBC ciphertext of the padded plaintext
    #[serde(with = "b64")]
    pub ciphertext: Vec<u8>,

    /// Random per-message initialization vector
    #[serde(with = "b64_iv")]
    pub iv: [u8; IV_SIZE],

    /// Creation instant (UTC)
    pub timestamp: Timestamp,

    /// Cipher suite tag, always `AES-256-CBC`
    pub algorithm: String,

    /// Node that sealed the envelope
    pub sender: NodeId,
}

impl EncryptedEnvelope {
    /// Checks the algorithm tag.
    ///
    /// # Errors
    /// Returns `UnsupportedAlgorithm` for any tag other than `AES-256-CBC`.
    pub fn validate(&self) -> Result<()> {
        check_algorithm("envelope", &self.algorithm, ENVELOPE_ALGORITHM)
    }
}

// ============================================
// SignedStatement
// ============================================

/// A signature over a plaintext payload, carried next to the payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignedStatement {
    /// DER-encoded ECDSA signature
    #[serde(with = "b64")]
    pub signature: Vec<u8>,

    /// The signed plaintext, echoed
    pub message: String,

    /// Timestamp text appended to the signed data, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,

    /// Node that produced the signature
    pub signer: NodeId,

    /// Signature suite tag, always `ECDSA-SHA256`
    pub algorithm: String,
}

impl SignedStatement {
    /// Checks the algorithm tag.
    ///
    /// # Errors
    /// Returns `UnsupportedAlgorithm` for any tag other than `ECDSA-SHA256`.
    pub fn validate(&self) -> Result<()> {
        check_algorithm("signature", &self.algorithm, SIGNATURE_ALGORITHM)
    }
}

// ============================================
// SecureMessage
// ============================================

/// A complete message as sent between nodes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SecureMessage {
    /// The encrypted payload
    pub encrypted_data: EncryptedEnvelope,

    /// Fingerprint of the plaintext
    pub message_id: MessageId,

    /// Originating node
    pub sender_node: NodeId,

    /// Composition instant (UTC)
    pub created_at: Timestamp,

    /// Optional signature over the plaintext
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub signature: Option<SignedStatement>,
}

impl SecureMessage {
    /// Returns `true` if the message carries a signature.
    #[must_use]
    pub const fn is_signed(&self) -> bool {
        self.signature.is_some()
    }

    /// Validates the algorithm tags of the envelope and signature.
    ///
    /// # Errors
    /// Returns `UnsupportedAlgorithm` if either tag is foreign.
    pub fn validate(&self) -> Result<()> {
        self.encrypted_data.validate()?;
        if let Some(statement) = &self.signature {
            statement.validate()?;
        }
        Ok(())
    }
}

// ============================================
// SignatureStatus
// ============================================

/// Outcome of signature verification on receipt.
///
/// `Unknown` means no verification was attempted (unsigned message or no
/// sender key supplied); it is distinct from `Invalid`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SignatureStatus {
    /// Signature verified against the sender key
    Valid,
    /// Signature did not verify
    Invalid,
    /// Verification not attempted
    Unknown,
}

impl SignatureStatus {
    /// Maps an optional verification result to a status.
    #[must_use]
    pub const fn from_verification(result: Option<bool>) -> Self {
        match result {
            Some(true) => Self::Valid,
            Some(false) => Self::Invalid,
            None => Self::Unknown,
        }
    }

    /// Returns `true` only for `Valid`.
    #[must_use]
    pub const fn is_valid(self) -> bool {
        matches!(self, Self::Valid)
    }
}

impl fmt::Display for SignatureStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Valid => "valid",
            Self::Invalid => "invalid",
            Self::Unknown => "unknown",
        })
    }
}

// ============================================
// Helpers
// ============================================

fn check_algorithm(field: &'static str, got: &str, expected: &'static str) -> Result<()> {
    if got == expected {
        return Ok(());
    }
    Err(CoreError::UnsupportedAlgorithm {
        field,
        got: got.chars().take(32).collect(),
        expected,
    })
}

/// Serde adapter for base64 (standard alphabet, padded) byte fields.
pub mod b64 {
    use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
    use serde::{Deserialize, Deserializer, Serializer};

    /// Serializes bytes as a base64 string.
    pub fn serialize<S, T>(bytes: &T, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
        T: AsRef<[u8]>,
    {
        serializer.serialize_str(&BASE64.encode(bytes.as_ref()))
    }

    /// Deserializes bytes from a base64 string.
    pub fn deserialize<'de, D>(deserializer: D) -> Result<Vec<u8>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        BASE64.decode(s.trim()).map_err(serde::de::Error::custom)
    }
}

mod b64_iv {
    use serde::{Deserializer, Serializer};

    use crate::crypto::IV_SIZE;

    pub fn serialize<S>(iv: &[u8; IV_SIZE], serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        super::b64::serialize(iv, serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<[u8; IV_SIZE], D::Error>
    where
        D: Deserializer<'de>,
    {
        let bytes = super::b64::deserialize(deserializer)?;
        bytes
            .as_slice()
            .try_into()
            .map_err(|_| serde::de::Error::invalid_length(bytes.len(), &"16-byte IV"))
    }
}

// ============================================
// Tests
// ============================================
