// ============================================
// File: crates/gridlink-common/src/lib.rs
// ============================================
//! # Gridlink Common - Shared Utilities Library
//!
//! ## Creation Reason
//! Provides foundational types shared by the gridlink crates so that node
//! identifiers, message fingerprints and timestamps have one representation.
//!
//! ## Main Functionality
//! - [`types`]: `NodeId` and `MessageId`
//! - [`time`]: ISO-8601 `Timestamp` used on the wire and for secret expiry
//! - [`error`]: Common error types and result aliases
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────┐
//! │                gridlink-node                        │
//! │                      │                              │
//! │                      ▼                              │
//! │                gridlink-core                        │
//! │                      │                              │
//! │                      ▼                              │
//! │               gridlink-common  ◄── You are here     │
//! └─────────────────────────────────────────────────────┘
//! ```
//!
//! ## ⚠️ Important Note for Next Developer
//! - This crate is the foundation - changes affect everything
//! - Keep dependencies minimal
//! - Timestamps cross the wire as strings; keep parsing lenient
//!
//! ## Last Modified
//! v0.1.0 - Initial implementation

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod error;
pub mod time;
pub mod types;

// Re-export commonly used items at crate root
pub use error::{CommonError, Result};
pub use time::Timestamp;
pub use types::{MessageId, NodeId};
