// ============================================
// File: crates/gridlink-core/src/crypto/mod.rs
// ============================================
//! # Cryptography Module
//!
//! ## Creation Reason
//! Centralizes all cryptographic operations of the secure channel, using
//! RustCrypto implementations for every primitive.
//!
//! ## Main Functionality
//!
//! ### Submodules
//! - [`keys`]: P-256 key pairs, public keys, channel keys, key slot
//! - [`kdf`]: HKDF-SHA256 channel key derivation
//! - [`envelope`]: AES-256-CBC sealing and opening with PKCS#7 padding
//! - [`signing`]: ECDSA-SHA256 statements over plaintext + timestamp
//!
//! ## Cryptographic Design
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                    Channel Establishment                    │
//! │  Node A                                        Node B       │
//! │    │  P-256 public key (PEM) ─────────────────► │           │
//! │    │ ◄───────────────────── P-256 public key (PEM)          │
//! │    │                                             │          │
//! │    │   ECDH(sk_A, pk_B) == ECDH(sk_B, pk_A)      │          │
//! │    │              │                              │          │
//! │    │              ▼                              │          │
//! │    │   HKDF-SHA256(info) ─────► ChannelKey (32B) │          │
//! └─────────────────────────────────────────────────────────────┘
//!
//! ┌─────────────────────────────────────────────────────────────┐
//! │                    Message Phase                            │
//! │                                                             │
//! │  plaintext ──► PKCS#7 ──► AES-256-CBC(key, random IV)       │
//! │  plaintext ":" timestamp ──► ECDSA-SHA256(sk_sender)        │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## ⚠️ Important Note for Next Developer
//! - A fresh random IV per encryption is mandatory
//! - The signature covers the plaintext, not the ciphertext
//! - ALL sensitive keys implement Zeroize
//!
//! ## Last Modified
//! v0.1.0 - Initial crypto implementation

pub mod envelope;
pub mod kdf;
pub mod keys;
pub mod signing;

// Re-export primary types at module level
pub use envelope::{Aes256CbcEnvelope, EnvelopeCrypto};
pub use keys::{ChannelKey, KeySlot, NodeKeyPair, NodePublicKey};

// ============================================
// Constants
// ============================================

/// Name of the elliptic curve used for all node keys.
pub const CURVE_NAME: &str = "secp256r1";

/// Size of a derived channel key in bytes (AES-256).
pub const CHANNEL_KEY_SIZE: usize = 32;

/// Size of a CBC initialization vector in bytes.
pub const IV_SIZE: usize = 16;

/// AES block size in bytes.
pub const AES_BLOCK_SIZE: usize = 16;

/// Default HKDF info string for channel key derivation.
pub const DEFAULT_KDF_INFO: &[u8] = b"microgrid-secure-channel";

/// Algorithm tag carried by every encrypted envelope.
pub const ENVELOPE_ALGORITHM: &str = "AES-256-CBC";

/// Algorithm tag carried by every signed statement.
pub const SIGNATURE_ALGORITHM: &str = "ECDSA-SHA256";

/// Separator between payload and timestamp in signed data.
pub const SIGNATURE_DELIMITER: u8 = b':';
