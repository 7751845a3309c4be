// ============================================
// File: crates/gridlink-core/src/error.rs
// ============================================
//! # Core Error Types
//!
//! ## Creation Reason
//! Defines error types specific to key handling, envelope encryption and
//! signing in the gridlink core crate.
//!
//! ## Error Categories
//! 1. **Key Errors**: generation, missing key, malformed key material
//! 2. **Envelope Errors**: encryption, ciphertext shape, padding, text decoding
//! 3. **Signature Errors**: signing failures, structurally malformed signatures
//! 4. **Protocol Errors**: message parsing, algorithm tags, timestamps
//!
//! An invalid signature is NOT an error. Verification returns `Ok(false)`;
//! only signatures that cannot be parsed at all surface as
//! `MalformedSignature`.
//!
//! ## ⚠️ Important Note for Next Developer
//! - NEVER include key material or plaintext in error messages
//! - Nothing here is retryable; all failures are deterministic in input
//!
//! ## Last Modified
//! v0.1.0 - Initial error definitions

use thiserror::Error;

use gridlink_common::error::CommonError;
use gridlink_common::time::TimestampError;

// ============================================
// Result Type Alias
// ============================================

/// Result type for core operations.
pub type Result<T> = std::result::Result<T, CoreError>;

// ============================================
// CoreError
// ============================================

/// Core error types for key, envelope and signature operations.
#[derive(Error, Debug)]
pub enum CoreError {
    // ========================================
    // Key Errors
    // ========================================

    /// Entropy source or curve library failed while generating a key.
    #[error("Key generation failed: {context}")]
    KeyGeneration {
        /// What key was being generated
        context: String,
    },

    /// Operation requires a key pair that has not been generated yet.
    #[error("No key pair available for {operation}; generate a key pair first")]
    NoKey {
        /// Operation that needed the key
        operation: String,
    },

    /// Peer or stored key material could not be parsed.
    #[error("Failed to parse key: {reason}")]
    KeyParse {
        /// Why parsing failed
        reason: String,
    },

    /// Key could not be serialized.
    #[error("Failed to encode key: {reason}")]
    KeyEncoding {
        /// Why encoding failed
        reason: String,
    },

    /// Key derivation failed.
    #[error("Key derivation failed: {reason}")]
    KeyDerivation {
        /// Why derivation failed
        reason: String,
    },

    /// Key storage collaborator failed.
    #[error("Key storage failed at '{location}': {reason}")]
    KeyStorage {
        /// Storage location involved
        location: String,
        /// Why the operation failed
        reason: String,
    },

    // ========================================
    // Envelope Errors
    // ========================================

    /// Encryption operation failed.
    #[error("Encryption failed: {context}")]
    Encryption {
        /// What was being encrypted
        context: String,
    },

    /// Ciphertext is empty or not a whole number of cipher blocks.
    #[error("Invalid ciphertext length: {len} bytes is not a positive multiple of {block_size}")]
    CiphertextLength {
        /// Ciphertext length received
        len: usize,
        /// Cipher block size
        block_size: usize,
    },

    /// Decrypted buffer does not end in valid padding.
    #[error("Invalid padding")]
    Padding,

    /// Decrypted bytes are not valid UTF-8 text.
    #[error("Decrypted payload is not valid text")]
    Decode,

    // ========================================
    // Signature Errors
    // ========================================

    /// Signature creation failed.
    #[error("Failed to create signature: {reason}")]
    SignatureCreation {
        /// Why signing failed
        reason: String,
    },

    /// Signature bytes are not a parseable ECDSA signature.
    #[error("Malformed signature: {reason}")]
    MalformedSignature {
        /// What's wrong with the signature encoding
        reason: String,
    },

    // ========================================
    // Protocol Errors
    // ========================================

    /// Algorithm tag does not match the fixed cipher suite.
    #[error("Unsupported {field} algorithm: '{got}' (expected '{expected}')")]
    UnsupportedAlgorithm {
        /// Which structure carried the tag
        field: &'static str,
        /// Tag received
        got: String,
        /// Tag required
        expected: &'static str,
    },

    /// Message is malformed.
    #[error("Malformed message: {reason}")]
    MalformedMessage {
        /// What's wrong with the message
        reason: String,
    },

    /// Message exceeds maximum allowed size.
    #[error("Message too large: max {max} bytes, got {actual}")]
    MessageTooLarge {
        /// Maximum allowed size
        max: usize,
        /// Actual size received
        actual: usize,
    },

    /// Timestamp parsing or freshness validation failed.
    #[error("Invalid timestamp: {reason}")]
    InvalidTimestamp {
        /// Why timestamp is invalid
        reason: String,
    },

    // ========================================
    // Wrapped Errors
    // ========================================

    /// Error from common crate.
    #[error(transparent)]
    Common(#[from] CommonError),
}

impl CoreError {
    // ========================================
    // Convenience Constructors
    // ========================================

    /// Creates a `KeyGeneration` error.
    pub fn key_generation(context: impl Into<String>) -> Self {
        Self::KeyGeneration {
            context: context.into(),
        }
    }

    /// Creates a `NoKey` error.
    pub fn no_key(operation: impl Into<String>) -> Self {
        Self::NoKey {
            operation: operation.into(),
        }
    }

    /// Creates a `KeyParse` error.
    pub fn key_parse(reason: impl Into<String>) -> Self {
        Self::KeyParse {
            reason: reason.into(),
        }
    }

    /// Creates a `KeyStorage` error.
    pub fn key_storage(location: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::KeyStorage {
            location: location.into(),
            reason: reason.into(),
        }
    }

    /// Creates an `Encryption` error.
    pub fn encryption(context: impl Into<String>) -> Self {
        Self::Encryption {
            context: context.into(),
        }
    }

    /// Creates a `MalformedSignature` error.
    pub fn malformed_signature(reason: impl Into<String>) -> Self {
        Self::MalformedSignature {
            reason: reason.into(),
        }
    }

    /// Creates a `MalformedMessage` error.
    pub fn malformed(reason: impl Into<String>) -> Self {
        Self::MalformedMessage {
            reason: reason.into(),
        }
    }

    // ========================================
    // Error Classification
    // ========================================

    /// Returns `true` if this is a cryptographic error.
    #[must_use]
    pub const fn is_crypto_error(&self) -> bool {
        matches!(
            self,
            Self::KeyGeneration { .. }
                | Self::KeyDerivation { .. }
                | Self::Encryption { .. }
                | Self::CiphertextLength { .. }
                | Self::Padding
                | Self::Decode
                | Self::SignatureCreation { .. }
                | Self::MalformedSignature { .. }
        )
    }

    /// Returns `true` if decryption produced no trustworthy plaintext.
    ///
    /// Covers corrupted or tampered ciphertext and decryption with the
    /// wrong secret.
    #[must_use]
    pub const fn is_decryption_failure(&self) -> bool {
        matches!(
            self,
            Self::CiphertextLength { .. } | Self::Padding | Self::Decode
        )
    }
}

impl From<TimestampError> for CoreError {
    fn from(err: TimestampError) -> Self {
        Self::InvalidTimestamp {
            reason: err.to_string(),
        }
    }
}

// ============================================
// Tests
// ============================================
