// ============================================
// File: crates/gridlink-node/src/services/mod.rs
// ============================================
//! # Node Services
//!
//! ## Creation Reason
//! Stateful services of a gridlink node, separated from configuration,
//! key storage and the CLI.
//!
//! ## Main Functionality
//!
//! ### Submodules
//! - [`secret_store`]: Per-peer channel secrets with lazy expiry
//! - [`session`]: Secure channel send/receive for one node
//!
//! ## Service Architecture
//! ```text
//! ┌──────────────────────────────────────────────┐
//! │               ChannelSession                 │
//! │                                              │
//! │  KeySlot ──► ECDH + HKDF ──► ChannelSecretStore
//! │     │                              │         │
//! │     ▼                              ▼         │
//! │  sign / verify            seal / open        │
//! └──────────────────────────────────────────────┘
//! ```
//!
//! ## Last Modified
//! v0.1.0 - Initial services module

pub mod secret_store;
pub mod session;

pub use secret_store::{ChannelSecretStore, SharedSecret, StoreStatus, DEFAULT_SECRET_TTL};
pub use session::{ChannelSession, NodeInfo, ReceivedMessage, SessionStatus};
