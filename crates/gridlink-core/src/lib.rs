// ============================================
// File: crates/gridlink-core/src/lib.rs
// ============================================
//! # Gridlink Core - Secure Channel Protocol Library
//!
//! ## Creation Reason
//! Provides the key handling, envelope encryption and statement signing
//! that peer nodes (control servers, simulation and field nodes) use to
//! exchange confidential, authenticated commands.
//!
//! ## Main Functionality
//!
//! ### Crypto Module ([`crypto`])
//! - Key types (`NodeKeyPair`, `NodePublicKey`, `ChannelKey`, `KeySlot`)
//! - ECDH on P-256 followed by HKDF-SHA256 channel key derivation
//! - AES-256-CBC envelopes with PKCS#7 padding
//! - ECDSA-SHA256 signed statements over the plaintext
//!
//! ### Protocol Module ([`protocol`])
//! - `SecureMessage` wire structure (JSON, base64 byte fields)
//! - JSON codec with size and algorithm-tag validation
//!
//! ### Storage Module ([`storage`])
//! - `KeyStore` collaborator trait for persisting key pairs
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────┐
//! │                gridlink-node                        │
//! │                      │                              │
//! │                      ▼                              │
//! │                gridlink-core  ◄── You are here      │
//! │                      │                              │
//! │                      ▼                              │
//! │               gridlink-common                       │
//! └─────────────────────────────────────────────────────┘
//! ```
//!
//! ## Security Properties
//! - **Confidentiality**: AES-256-CBC under an HKDF-derived channel key
//! - **Authenticity**: optional ECDSA-SHA256 signature over plaintext and timestamp
//! - **Integrity**: only through the signature; the envelope itself is unauthenticated
//!
//! ## ⚠️ Important Note for Next Developer
//! - ALL cryptographic code uses RustCrypto implementations
//! - NEVER use raw ECDH output as a key; always go through `kdf`
//! - ALL secret key types zeroize on drop
//! - The CBC envelope format is kept for interoperability with existing
//!   nodes; it is not an AEAD and padding checks are not constant-time
//!
//! ## Last Modified
//! v0.1.0 - Initial implementation

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod crypto;
pub mod error;
pub mod protocol;
pub mod storage;

// Re-export commonly used items
pub use crypto::{
    Aes256CbcEnvelope, ChannelKey, EnvelopeCrypto, KeySlot, NodeKeyPair, NodePublicKey,
};
pub use error::{CoreError, Result};
pub use protocol::{
    Codec, EncryptedEnvelope, JsonCodec, SecureMessage, SignatureStatus, SignedStatement,
};
pub use storage::{KeyStore, MemoryKeyStore};
