// ============================================
// File: crates/gridlink-node/src/lib.rs
// ============================================
//! # Gridlink Node Library
//!
//! ## Creation Reason
//! Node-level side of the gridlink secure channel: configuration, key
//! persistence, channel secret bookkeeping and the send/receive session
//! used by controllers and simulators exchanging commands.
//!
//! ## Main Functionality
//!
//! ### Modules
//! - [`config`]: Node configuration management
//! - [`error`]: Node-specific error types
//! - [`key_store`]: PEM file key persistence
//! - [`services`]: Stateful services
//!   - [`services::secret_store`]: Per-peer channel secrets
//!   - [`services::session`]: Secure send/receive
//!
//! ## Architecture Overview
//! ```text
//! ┌────────────────────────────────────────────────────────┐
//! │                     Gridlink Node                      │
//! ├────────────────────────────────────────────────────────┤
//! │  ┌────────────┐     ┌────────────────┐                 │
//! │  │ NodeConfig │────►│ ChannelSession │                 │
//! │  └────────────┘     └───────┬────────┘                 │
//! │                             │                          │
//! │          ┌──────────────────┼──────────────────┐       │
//! │          ▼                  ▼                  ▼       │
//! │  ┌──────────────┐  ┌────────────────┐  ┌────────────┐  │
//! │  │ FileKeyStore │  │ SecretStore    │  │ Peer keys  │  │
//! │  └──────────────┘  └────────────────┘  └────────────┘  │
//! ├────────────────────────────────────────────────────────┤
//! │        gridlink-core: keys, envelope, signatures       │
//! └────────────────────────────────────────────────────────┘
//! ```
//!
//! ## ⚠️ Important Note for Next Developer
//! - The library never opens sockets; moving messages between nodes is
//!   the embedding application's job
//! - Configuration changes require a new session (no hot-reload)
//!
//! ## Last Modified
//! v0.1.0 - Initial node library

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod config;
pub mod error;
pub mod key_store;
pub mod services;

// Re-export primary types
pub use config::NodeConfig;
pub use error::{NodeError, Result};
pub use key_store::FileKeyStore;
pub use services::{ChannelSecretStore, ChannelSession, ReceivedMessage};
