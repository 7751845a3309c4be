// ============================================
// File: crates/gridlink-core/src/crypto/signing.rs
// ============================================
//! # Signed Statements
//!
//! ## Creation Reason
//! Signs the plaintext of a message, optionally bound to a timestamp, and
//! verifies such statements on receipt.
//!
//! ## Signed Data
//! ```text
//! with timestamp:     payload ":" timestamp
//! without timestamp:  payload
//! ```
//! Verification rebuilds exactly these bytes from the statement. A changed
//! delimiter, timestamp text or timestamp presence makes the signature
//! invalid; it is never reported as a distinct error.
//!
//! ## Last Modified
//! v0.1.0 - Initial statement signing

use tracing::{debug, warn};

use gridlink_common::time::Timestamp;

use super::keys::{NodeKeyPair, NodePublicKey};
use super::{SIGNATURE_ALGORITHM, SIGNATURE_DELIMITER};
use crate::error::Result;
use crate::protocol::messages::SignedStatement;

/// Builds the exact byte string covered by a signature.
///
/// An empty timestamp counts as absent.
#[must_use]
pub fn signed_data(payload: &str, timestamp: Option<&str>) -> Vec<u8> {
    match timestamp.filter(|ts| !ts.is_empty()) {
        Some(ts) => {
            let mut data = Vec::with_capacity(payload.len() + 1 + ts.len());
            data.extend_from_slice(payload.as_bytes());
            data.push(SIGNATURE_DELIMITER);
            data.extend_from_slice(ts.as_bytes());
            data
        }
        None => payload.as_bytes().to_vec(),
    }
}

/// Signs `payload` with the node key.
///
/// With `include_timestamp` the current UTC time is appended to the signed
/// data and echoed in the statement.
///
/// # Errors
/// Returns `SignatureCreation` if the signer fails.
pub fn sign_statement(
    signer: &NodeKeyPair,
    payload: &str,
    include_timestamp: bool,
) -> Result<SignedStatement> {
    let timestamp = include_timestamp.then(|| Timestamp::now().to_iso_string());
    let signature = signer.sign(&signed_data(payload, timestamp.as_deref()))?;

    debug!(
        signer = %signer.node_id(),
        timestamped = include_timestamp,
        "Signed statement"
    );

    Ok(SignedStatement {
        signature,
        message: payload.to_string(),
        timestamp,
        signer: signer.node_id().clone(),
        algorithm: SIGNATURE_ALGORITHM.to_string(),
    })
}

/// Verifies a statement against the signer's public key.
///
/// # Returns
/// `Ok(true)` if valid, `Ok(false)` if the signature does not cover the
/// statement's message and timestamp under `public_key`.
///
/// # Errors
/// - `UnsupportedAlgorithm`: statement is not `ECDSA-SHA256`
/// - `MalformedSignature`: signature bytes cannot be parsed
pub fn verify_statement(statement: &SignedStatement, public_key: &NodePublicKey) -> Result<bool> {
    statement.validate()?;

    let data = signed_data(&statement.message, statement.timestamp.as_deref());
    let valid = public_key.verify(&data, &statement.signature)?;

    if !valid {
        warn!(
            signer = %statement.signer,
            key = %public_key.fingerprint(),
            "Signature verification failed"
        );
    }
    Ok(valid)
}

// ============================================
// Tests
// ============================================

#[cfg(test)]
mod tests {
    use gridlink_common::types::NodeId;

    use super::*;
    use crate::error::CoreError;

    fn node(id: &str) -> NodeKeyPair {
        NodeKeyPair::generate(NodeId::new(id).unwrap()).unwrap()
    }

    #[test]
    fn test_signed_data_layout() {
        assert_eq!(signed_data("cmd", Some("2025-01-01T00:00:00")), b"cmd:2025-01-01T00:00:00");
        assert_eq!(signed_data("cmd", None), b"cmd");
        assert_eq!(signed_data("cmd", Some("")), b"cmd");
    }

    #[test]
    fn test_statement_roundtrip() {
        let signer = node("security_controller");

        for include_timestamp in [true, false] {
            let statement = sign_statement(&signer, "SET_VOLTAGE", include_timestamp).unwrap();

            assert_eq!(statement.timestamp.is_some(), include_timestamp);
            assert_eq!(statement.algorithm, SIGNATURE_ALGORITHM);
            assert!(verify_statement(&statement, signer.public_key()).unwrap());
        }
    }

    #[test]
    fn test_tampered_message_is_invalid() {
        let signer = node("security_controller");
        let mut statement = sign_statement(&signer, "SET_VOLTAGE:230V", true).unwrap();

        statement.message.push_str("tampered");
        assert!(!verify_statement(&statement, signer.public_key()).unwrap());
    }

    #[test]
    fn test_timestamp_binding() {
        let signer = node("security_controller");
        let mut statement = sign_statement(&signer, "OPEN_BREAKER", true).unwrap();

        // Dropping the timestamp changes the signed bytes
        let mut stripped = statement.clone();
        stripped.timestamp = None;
        assert!(!verify_statement(&stripped, signer.public_key()).unwrap());

        statement.timestamp = Some("2020-01-01T00:00:00Z".into());
        assert!(!verify_statement(&statement, signer.public_key()).unwrap());
    }

    #[test]
    fn test_unrelated_key_is_invalid() {
        let signer = node("a");
        let other = node("b");
        let statement = sign_statement(&signer, "hello", true).unwrap();

        assert!(!verify_statement(&statement, other.public_key()).unwrap());
    }

    #[test]
    fn test_malformed_signature_raises() {
        let signer = node("a");
        let mut statement = sign_statement(&signer, "hello", false).unwrap();
        statement.signature = vec![0x30, 0x01];

        assert!(matches!(
            verify_statement(&statement, signer.public_key()),
            Err(CoreError::MalformedSignature { .. })
        ));
    }
}
