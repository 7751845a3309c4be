// ============================================
// File: crates/gridlink-core/src/protocol/mod.rs
// ============================================
//! # Protocol Module
//!
//! ## Creation Reason
//! Defines the messages exchanged between nodes and their JSON encoding.
//!
//! ## Main Functionality
//!
//! ### Submodules
//! - [`messages`]: `SecureMessage`, `EncryptedEnvelope`, `SignedStatement`
//! - [`codec`]: JSON codec with size limit and algorithm validation
//!
//! ## Protocol Overview
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │  Node A ─────── PUBLIC KEY PEM ─────────────────────► Node B│
//! │  Node A ◄────── PUBLIC KEY PEM ────────────────────── Node B│
//! │                  (both derive the channel key)              │
//! ├─────────────────────────────────────────────────────────────┤
//! │  Node A ═══════ SecureMessage (JSON) ═══════════════► Node B│
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## ⚠️ Important Note for Next Developer
//! - Field names and tags are shared with deployed nodes
//! - There is no negotiation; foreign algorithm tags are rejected
//!
//! ## Last Modified
//! v0.1.0 - Initial protocol definitions

pub mod codec;
pub mod messages;

// Re-export primary types
pub use codec::{from_json, to_json, Codec, JsonCodec, MAX_MESSAGE_SIZE};
pub use messages::{EncryptedEnvelope, SecureMessage, SignatureStatus, SignedStatement};
