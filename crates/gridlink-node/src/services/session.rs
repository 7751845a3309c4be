// ============================================
// File: crates/gridlink-node/src/services/session.rs
// ============================================
//! # Channel Session Service
//!
//! ## Creation Reason
//! Ties one node's key pair, its per-peer channel secrets and the cached
//! public keys of its peers into the send/receive operations of the
//! secure channel.
//!
//! ## Main Functionality
//! - `ChannelSession`: key lifecycle, channel setup, `send_secure`,
//!   `receive_secure`
//! - `ReceivedMessage`: decrypted payload plus signature status
//! - `NodeInfo` / `SessionStatus`: observability snapshots
//!
//! ## Message Flow
//! ```text
//! send_secure(peer, text, sign)
//!   ├─ secret lookup ──────────── none → NoSharedSecret
//!   ├─ seal (AES-256-CBC, fresh IV)
//!   ├─ sign "text:timestamp" ──── no key → NoKey
//!   └─ SecureMessage { encrypted_data, message_id, sender_node, ... }
//!
//! receive_secure(msg, peer, sender_key)
//!   ├─ validate tags
//!   ├─ secret lookup ──────────── none → NoSharedSecret
//!   ├─ freshness window (optional, signed timestamp if signed)
//!   ├─ open ───────────────────── wrong key → Padding / CiphertextLength
//!   └─ verify signature ───────── valid / invalid / unknown
//! ```
//!
//! ## ⚠️ Important Note for Next Developer
//! - The signature status is only `valid` when the signed message equals
//!   the decrypted plaintext
//! - A signature is never checked against a key that was not supplied;
//!   without a key the status is `unknown`
//! - Message ID mismatches are logged, never rejected
//! - With a freshness window, a signed message must carry a signed
//!   timestamp; the envelope timestamp is not covered by any MAC
//!
//! ## Last Modified
//! v0.1.0 - Initial channel session

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use serde::Serialize;
use tracing::{debug, info, warn};

use gridlink_common::error::CommonError;
use gridlink_common::time::Timestamp;
use gridlink_common::types::{MessageId, NodeId};
use gridlink_core::crypto::{
    envelope, signing, Aes256CbcEnvelope, ChannelKey, EnvelopeCrypto, KeySlot, NodeKeyPair,
    NodePublicKey, CURVE_NAME,
};
use gridlink_core::error::CoreError;
use gridlink_core::protocol::{SecureMessage, SignatureStatus};

use crate::config::{ChannelConfig, NodeConfig};
use crate::error::{NodeError, Result};
use crate::services::secret_store::{ChannelSecretStore, StoreStatus};

// ============================================
// ReceivedMessage
// ============================================

/// Result of a successful `receive_secure`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReceivedMessage {
    /// Decrypted payload.
    pub plaintext: String,
    /// Outcome of signature verification.
    pub signature_valid: SignatureStatus,
    /// Sender named by the message.
    pub sender_node: NodeId,
    /// Message ID carried by the message.
    pub message_id: MessageId,
    /// When the sender created the message.
    pub created_at: Timestamp,
}

// ============================================
// Snapshots
// ============================================

/// Identity summary of a node.
#[derive(Debug, Clone, Serialize)]
pub struct NodeInfo {
    /// Node identifier.
    pub node_id: NodeId,
    /// Curve of the node key.
    pub curve: &'static str,
    /// Whether a key pair is loaded.
    pub has_key_pair: bool,
    /// Public key PEM, if a key pair is loaded.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub public_key_pem: Option<String>,
}

/// Channel summary of a session.
#[derive(Debug, Clone, Serialize)]
pub struct SessionStatus {
    /// Node identifier.
    pub node_id: NodeId,
    /// Peers with an unexpired channel secret.
    #[serde(flatten)]
    pub secrets: StoreStatus,
    /// Number of cached peer public keys.
    pub cached_public_keys: usize,
}

// ============================================
// ChannelSession
// ============================================

/// Secure channel endpoint for one node.
///
/// All methods take `&self`; the session can be shared behind an `Arc`.
pub struct ChannelSession {
    node_id: NodeId,
    keys: KeySlot,
    secrets: ChannelSecretStore,
    peer_keys: DashMap<NodeId, NodePublicKey>,
    cipher: Arc<dyn EnvelopeCrypto>,
    channel: ChannelConfig,
}

impl ChannelSession {
    /// Creates a session without a key pair.
    #[must_use]
    pub fn new(node_id: NodeId, channel: ChannelConfig) -> Self {
        let ttl = Duration::from_secs(channel.secret_ttl_secs);
        Self {
            node_id,
            keys: KeySlot::new(),
            secrets: ChannelSecretStore::new(ttl),
            peer_keys: DashMap::new(),
            cipher: Arc::new(Aes256CbcEnvelope::new()),
            channel,
        }
    }

    /// Creates a session from the node configuration.
    ///
    /// # Errors
    /// Returns `ConfigInvalid` if the node identifier is invalid.
    pub fn from_config(config: &NodeConfig) -> Result<Self> {
        Ok(Self::new(config.node_id()?, config.channel.clone()))
    }

    /// Returns the node identifier.
    #[must_use]
    pub fn node_id(&self) -> &NodeId {
        &self.node_id
    }

    /// Returns the channel secret store.
    #[must_use]
    pub fn secrets(&self) -> &ChannelSecretStore {
        &self.secrets
    }

    // ========================================
    // Key lifecycle
    // ========================================

    /// Generates a fresh key pair and installs it.
    ///
    /// Replaces any previous key pair. Existing channel secrets stay valid
    /// until they expire or are re-established.
    ///
    /// # Errors
    /// Returns `KeyGeneration` if the random source fails.
    pub fn generate_keys(&self) -> Result<NodePublicKey> {
        let pair = NodeKeyPair::generate(self.node_id.clone())?;
        let public = pair.public_key().clone();
        let replaced = self.keys.install(pair).is_some();

        info!(
            node_id = %self.node_id,
            fingerprint = %public.fingerprint(),
            replaced,
            "Generated node key pair"
        );
        Ok(public)
    }

    /// Installs a key pair loaded from storage.
    ///
    /// # Errors
    /// Returns `InvalidInput` if the pair belongs to another node.
    pub fn install_key_pair(&self, pair: NodeKeyPair) -> Result<()> {
        if pair.node_id() != &self.node_id {
            return Err(CommonError::invalid_input(
                "key_pair",
                format!("belongs to '{}', not '{}'", pair.node_id(), self.node_id),
            )
            .into());
        }

        debug!(
            node_id = %self.node_id,
            fingerprint = %pair.public_key().fingerprint(),
            "Installed node key pair"
        );
        self.keys.install(pair);
        Ok(())
    }

    /// Returns the installed key pair.
    #[must_use]
    pub fn key_pair(&self) -> Option<Arc<NodeKeyPair>> {
        self.keys.get()
    }

    /// Returns the node public key as SPKI PEM.
    ///
    /// # Errors
    /// Returns `NoKey` if no key pair is installed.
    pub fn export_public_key(&self) -> Result<String> {
        Ok(self.keys.export_public()?)
    }

    /// Derives the channel key shared with `peer_public`.
    ///
    /// # Errors
    /// Returns `NoKey` if no key pair is installed.
    pub fn derive_shared_secret(&self, peer_public: &NodePublicKey) -> Result<ChannelKey> {
        let pair = self.keys.require("derive shared secret")?;
        Ok(pair.derive_shared_secret(peer_public, self.channel.kdf_info.as_bytes())?)
    }

    // ========================================
    // Channel setup
    // ========================================

    /// Imports `peer_pem`, derives the channel key and stores it for
    /// `peer_id` with the configured lifetime.
    ///
    /// # Errors
    /// - `KeyParse`: `peer_pem` is not a P-256 public key
    /// - `NoKey`: no key pair is installed
    pub fn establish_channel(&self, peer_id: &NodeId, peer_pem: &str) -> Result<NodePublicKey> {
        let peer_public = NodePublicKey::from_pem(peer_pem)?;
        self.establish_with_key(peer_id, &peer_public)?;
        Ok(peer_public)
    }

    /// Derives and stores the channel key for an already parsed peer key.
    ///
    /// # Errors
    /// Returns `NoKey` if no key pair is installed.
    pub fn establish_with_key(&self, peer_id: &NodeId, peer_public: &NodePublicKey) -> Result<()> {
        let channel_key = self.derive_shared_secret(peer_public)?;
        let expires_at = self.secrets.put_default(peer_id, channel_key)?;
        self.peer_keys.insert(peer_id.clone(), peer_public.clone());

        info!(
            node_id = %self.node_id,
            peer_id = %peer_id,
            peer_key = %peer_public.fingerprint(),
            expires_at = %expires_at,
            "Secure channel established"
        );
        Ok(())
    }

    /// Returns the cached public key of `peer_id`.
    #[must_use]
    pub fn peer_public_key(&self, peer_id: &NodeId) -> Option<NodePublicKey> {
        self.peer_keys.get(peer_id).map(|entry| entry.value().clone())
    }

    /// Drops the channel secret for `peer_id`.
    ///
    /// The cached public key is kept so the channel can be re-established.
    pub fn close_channel(&self, peer_id: &NodeId) -> bool {
        self.secrets.remove(peer_id)
    }

    // ========================================
    // Messaging
    // ========================================

    /// Encrypts `plaintext` for `peer` and optionally signs it.
    ///
    /// # Errors
    /// - `NoSharedSecret`: no live channel secret for `peer`
    /// - `NoKey`: `sign` is set but no key pair is installed
    /// - `Encryption` / `SignatureCreation`: crypto backend failure
    pub fn send_secure(&self, peer: &NodeId, plaintext: &str, sign: bool) -> Result<SecureMessage> {
        let channel_key = self.secrets.get(peer).ok_or_else(|| NodeError::NoSharedSecret {
            peer: peer.clone(),
        })?;
        let signer = if sign {
            Some(self.keys.require("sign message")?)
        } else {
            None
        };

        let encrypted_data =
            envelope::seal(self.cipher.as_ref(), &channel_key, plaintext, &self.node_id)?;
        let signature = signer
            .map(|pair| signing::sign_statement(&pair, plaintext, true))
            .transpose()?;

        let message = SecureMessage {
            encrypted_data,
            message_id: MessageId::for_content(plaintext.as_bytes()),
            sender_node: self.node_id.clone(),
            created_at: Timestamp::now(),
            signature,
        };

        debug!(
            peer_id = %peer,
            message_id = %message.message_id,
            signed = message.is_signed(),
            "Secure message prepared"
        );
        Ok(message)
    }

    /// Encrypts `plaintext` for `peer`, signing per configuration.
    ///
    /// # Errors
    /// See [`ChannelSession::send_secure`].
    pub fn send(&self, peer: &NodeId, plaintext: &str) -> Result<SecureMessage> {
        self.send_secure(peer, plaintext, self.channel.sign_messages)
    }

    /// Decrypts a message from `peer` and checks its signature.
    ///
    /// Without `sender_key` the signature status is `Unknown`.
    ///
    /// # Errors
    /// - `NoSharedSecret`: no live channel secret for `peer`
    /// - `UnsupportedAlgorithm`: foreign cipher suite
    /// - `InvalidTimestamp`: signed timestamp (or, when unsigned, the
    ///   envelope timestamp) outside the freshness window
    /// - `CiphertextLength` / `Padding` / `Decode`: decryption failed
    /// - `MalformedSignature`: signature bytes cannot be parsed
    pub fn receive_secure(
        &self,
        message: &SecureMessage,
        peer: &NodeId,
        sender_key: Option<&NodePublicKey>,
    ) -> Result<ReceivedMessage> {
        message.validate()?;

        let channel_key = self.secrets.get(peer).ok_or_else(|| NodeError::NoSharedSecret {
            peer: peer.clone(),
        })?;

        self.check_freshness(message)?;

        let plaintext = envelope::open(self.cipher.as_ref(), &channel_key, &message.encrypted_data)
            .map_err(|e| {
                warn!(peer_id = %peer, error = %e, "Decryption failed");
                e
            })?;

        if !message.message_id.matches(plaintext.as_bytes()) {
            warn!(
                peer_id = %peer,
                message_id = %message.message_id,
                "Message ID does not match decrypted content"
            );
        }

        let signature_valid = match (&message.signature, sender_key) {
            (Some(statement), Some(public_key)) => {
                let verified = signing::verify_statement(statement, public_key)?;
                if verified && statement.message != plaintext {
                    warn!(
                        peer_id = %peer,
                        signer = %statement.signer,
                        "Signed message differs from decrypted content"
                    );
                    SignatureStatus::Invalid
                } else {
                    SignatureStatus::from_verification(Some(verified))
                }
            }
            _ => SignatureStatus::Unknown,
        };

        debug!(
            peer_id = %peer,
            message_id = %message.message_id,
            signature = %signature_valid,
            "Secure message received"
        );

        Ok(ReceivedMessage {
            plaintext,
            signature_valid,
            sender_node: message.sender_node.clone(),
            message_id: message.message_id,
            created_at: message.created_at,
        })
    }

    /// Like [`ChannelSession::receive_secure`], verifying against the
    /// cached public key of `peer`.
    ///
    /// # Errors
    /// See [`ChannelSession::receive_secure`].
    pub fn receive_from_peer(&self, message: &SecureMessage, peer: &NodeId) -> Result<ReceivedMessage> {
        let sender_key = self.peer_public_key(peer);
        self.receive_secure(message, peer, sender_key.as_ref())
    }

    // ========================================
    // Observability
    // ========================================

    /// Returns the node identity summary.
    #[must_use]
    pub fn node_info(&self) -> NodeInfo {
        let public_key_pem = self.keys.export_public().ok();
        NodeInfo {
            node_id: self.node_id.clone(),
            curve: CURVE_NAME,
            has_key_pair: public_key_pem.is_some(),
            public_key_pem,
        }
    }

    /// Returns the channel summary.
    #[must_use]
    pub fn status(&self) -> SessionStatus {
        SessionStatus {
            node_id: self.node_id.clone(),
            secrets: self.secrets.status(),
            cached_public_keys: self.peer_keys.len(),
        }
    }

    /// Signed messages are aged by their signed timestamp; the envelope
    /// timestamp is only trusted for unsigned ones.
    fn check_freshness(&self, message: &SecureMessage) -> Result<()> {
        let Some(max_age) = self.max_message_age() else {
            return Ok(());
        };

        let timestamp = match &message.signature {
            Some(statement) => {
                Timestamp::parse(statement.timestamp.as_deref().unwrap_or_default())
                    .map_err(CoreError::from)?
            }
            None => message.encrypted_data.timestamp,
        };
        timestamp.validate_freshness(max_age).map_err(CoreError::from)?;
        Ok(())
    }

    fn max_message_age(&self) -> Option<Duration> {
        self.channel.max_message_age_secs.map(Duration::from_secs)
    }
}

impl fmt::Debug for ChannelSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChannelSession")
            .field("node_id", &self.node_id)
            .field("has_key_pair", &self.keys.is_loaded())
            .field("secrets", &self.secrets)
            .field("peer_keys", &self.peer_keys.len())
            .field("cipher", &self.cipher.algorithm())
            .finish()
    }
}

// ============================================
// Tests
// ============================================
