// ============================================
// File: crates/gridlink-node/src/error.rs
// ============================================
//! # Node Error Types
//!
//! ## Last Modified
//! v0.1.0 - Initial node errors

use thiserror::Error;

use gridlink_common::error::CommonError;
use gridlink_common::types::NodeId;
use gridlink_core::error::CoreError;

/// Result type for node operations.
pub type Result<T> = std::result::Result<T, NodeError>;

/// Node error types.
#[derive(Error, Debug)]
pub enum NodeError {
    /// No live channel secret for the peer; run key exchange again.
    #[error("No shared secret for peer '{peer}'; establish the channel first")]
    NoSharedSecret {
        /// Peer the lookup was for
        peer: NodeId,
    },

    /// Configuration file could not be read or parsed.
    #[error("Failed to load configuration from '{path}': {reason}")]
    ConfigLoad {
        /// Config file path
        path: String,
        /// Why loading failed
        reason: String,
    },

    /// Configuration value is out of range.
    #[error("Invalid configuration: {field} - {reason}")]
    ConfigInvalid {
        /// Offending field
        field: String,
        /// What's wrong with it
        reason: String,
    },

    /// Error from the protocol core.
    #[error(transparent)]
    Core(#[from] CoreError),

    /// Error from the common crate.
    #[error(transparent)]
    Common(#[from] CommonError),
}

impl NodeError {
    /// Creates a `ConfigLoad` error.
    pub fn config_load(path: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::ConfigLoad {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Creates a `ConfigInvalid` error.
    pub fn config_invalid(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::ConfigInvalid {
            field: field.into(),
            reason: reason.into(),
        }
    }

    /// Returns `true` if the caller should re-run key exchange.
    #[must_use]
    pub const fn needs_key_exchange(&self) -> bool {
        matches!(self, Self::NoSharedSecret { .. })
    }

    /// Returns `true` if decryption produced no trustworthy plaintext.
    #[must_use]
    pub const fn is_decryption_failure(&self) -> bool {
        match self {
            Self::Core(e) => e.is_decryption_failure(),
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = NodeError::config_load("/etc/gridlink/node.toml", "file not found");
        assert!(err.to_string().contains("/etc/gridlink/node.toml"));

        let err = NodeError::NoSharedSecret {
            peer: NodeId::new("matlab_simulation").unwrap(),
        };
        assert!(err.to_string().contains("matlab_simulation"));
    }

    #[test]
    fn test_error_classification() {
        assert!(NodeError::NoSharedSecret { peer: NodeId::new("feeder_3").unwrap() }.needs_key_exchange());
        assert!(NodeError::from(CoreError::Padding).is_decryption_failure());
        assert!(!NodeError::from(CoreError::no_key("sign")).is_decryption_failure());
    }
}
