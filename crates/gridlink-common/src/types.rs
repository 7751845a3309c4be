// ============================================
// File: crates/gridlink-common/src/types.rs
// ============================================
//! # Core Type Definitions
//!
//! ## Creation Reason
//! Centralizes the identifiers used throughout the secure channel so that
//! peers and messages are never confused with arbitrary strings.
//!
//! ## Main Functionality
//! - `NodeId`: Identifier of a node (sender, signer, channel peer)
//! - `MessageId`: 16-hex-char content fingerprint of a plaintext
//!
//! ## ⚠️ Important Note for Next Developer
//! - `MessageId` is a deterministic function of the plaintext; it is a
//!   fingerprint, not a nonce, and leaks plaintext equality by design
//! - Maintain backward-compatible serialization formats
//!
//! ## Last Modified
//! v0.1.0 - Initial type definitions

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use sha2::{Digest, Sha256};

use crate::error::CommonError;

// ============================================
// Constants
// ============================================

/// Size of a `MessageId` in bytes (16 hex characters).
pub const MESSAGE_ID_SIZE: usize = 8;

/// Maximum length of a `NodeId` in bytes.
pub const MAX_NODE_ID_LEN: usize = 128;

// ============================================
// NodeId
// ============================================

/// Identifier of a node taking part in a secure channel.
///
/// # Validation
/// Non-empty, at most [`MAX_NODE_ID_LEN`] bytes, no control characters.
/// File-backed key stores use it as a file name stem, so path separators
/// are rejected as well.
///
/// # Example
/// ```
/// use gridlink_common::types::NodeId;
///
/// let id = NodeId::new("matlab_simulation").unwrap();
/// assert_eq!(id.as_str(), "matlab_simulation");
/// assert!(NodeId::new("").is_err());
/// ```
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct NodeId(String);

impl NodeId {
    /// Creates a validated node identifier.
    ///
    /// # Errors
    /// Returns `InvalidInput` if the identifier is empty, too long, or
    /// contains control characters or path separators.
    pub fn new(id: impl Into<String>) -> Result<Self, CommonError> {
        let id = id.into();
        if id.is_empty() {
            return Err(CommonError::invalid_input("node_id", "cannot be empty"));
        }
        if id.len() > MAX_NODE_ID_LEN {
            return Err(CommonError::invalid_input(
                "node_id",
                format!("cannot exceed {MAX_NODE_ID_LEN} bytes"),
            ));
        }
        if id.chars().any(|c| c.is_control() || c == '/' || c == '\\') {
            return Err(CommonError::invalid_input(
                "node_id",
                "cannot contain control characters or path separators",
            ));
        }
        Ok(Self(id))
    }

    /// Returns the identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "NodeId({})", self.0)
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for NodeId {
    type Err = CommonError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl AsRef<str> for NodeId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl<'de> Deserialize<'de> for NodeId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Self::new(s).map_err(serde::de::Error::custom)
    }
}

// ============================================
// MessageId
// ============================================

/// Content fingerprint of a plaintext message.
///
/// The first 8 bytes of SHA-256 over the plaintext, rendered as 16
/// lowercase hex characters.
///
/// # Example
/// ```
/// use gridlink_common::types::MessageId;
///
/// let a = MessageId::for_content(b"SET_VOLTAGE");
/// let b = MessageId::for_content(b"SET_VOLTAGE");
/// assert_eq!(a, b);
/// assert_eq!(a.to_string().len(), 16);
/// ```
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct MessageId([u8; MESSAGE_ID_SIZE]);

impl MessageId {
    /// Computes the fingerprint of `content`.
    #[must_use]
    pub fn for_content(content: &[u8]) -> Self {
        let digest = Sha256::digest(content);
        let mut id = [0u8; MESSAGE_ID_SIZE];
        id.copy_from_slice(&digest[..MESSAGE_ID_SIZE]);
        Self(id)
    }

    /// Returns the raw fingerprint bytes.
    #[must_use]
    pub const fn as_bytes(&self) -> &[u8; MESSAGE_ID_SIZE] {
        &self.0
    }

    /// Returns `true` if this id is the fingerprint of `content`.
    #[must_use]
    pub fn matches(&self, content: &[u8]) -> bool {
        *self == Self::for_content(content)
    }
}

impl fmt::Debug for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "MessageId({})", hex::encode(self.0))
    }
}

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode(self.0))
    }
}

impl FromStr for MessageId {
    type Err = CommonError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bytes = hex::decode(s)?;
        if bytes.len() != MESSAGE_ID_SIZE {
            return Err(CommonError::invalid_length(MESSAGE_ID_SIZE, bytes.len()));
        }
        let mut id = [0u8; MESSAGE_ID_SIZE];
        id.copy_from_slice(&bytes);
        Ok(Self(id))
    }
}

impl Serialize for MessageId {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for MessageId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

// ============================================
// Tests
// ============================================
