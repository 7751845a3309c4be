// ============================================
// File: crates/gridlink-core/src/storage.rs
// ============================================
//! # Key Storage Interface
//!
//! ## Creation Reason
//! The protocol core never touches the filesystem itself. Persisting and
//! restoring node keys goes through the `KeyStore` collaborator, so nodes
//! can plug in files, a secrets manager, or memory for tests.
//!
//! ## Main Functionality
//! - `KeyStore`: async persistence interface for node keys
//! - `MemoryKeyStore`: in-process implementation for tests and demos
//!
//! ## Serialized Forms
//! - Private keys: PKCS#8 PEM, or encrypted PKCS#8 PEM with a password
//! - Public keys: SPKI PEM
//!
//! ## ⚠️ Important Note for Next Developer
//! - Implementations must be Send + Sync for use in async contexts
//! - Returned locations are opaque strings for logs and operators
//!
//! ## Last Modified
//! v0.1.0 - Initial storage interface

use std::collections::HashMap;
use std::fmt;

use async_trait::async_trait;
use parking_lot::Mutex;
use zeroize::Zeroizing;

use gridlink_common::types::NodeId;

use crate::crypto::{NodeKeyPair, NodePublicKey};
use crate::error::{CoreError, Result};

// ============================================
// KeyStore Trait
// ============================================

/// Persistence interface for node keys.
#[async_trait]
pub trait KeyStore: Send + Sync {
    /// Stores the private key of `key` under `node_id`.
    ///
    /// With a password the key is stored encrypted.
    ///
    /// # Returns
    /// Storage location of the saved key.
    ///
    /// # Errors
    /// Returns `KeyStorage` or `KeyEncoding` on failure.
    async fn save_private_key(
        &self,
        key: &NodeKeyPair,
        node_id: &NodeId,
        password: Option<&str>,
    ) -> Result<String>;

    /// Stores a public key under `node_id`.
    ///
    /// # Returns
    /// Storage location of the saved key.
    ///
    /// # Errors
    /// Returns `KeyStorage` or `KeyEncoding` on failure.
    async fn save_public_key(&self, key: &NodePublicKey, node_id: &NodeId) -> Result<String>;

    /// Restores the key pair stored under `node_id`.
    ///
    /// # Errors
    /// Returns `KeyStorage` if nothing is stored, `KeyParse` if the stored
    /// key or the password is wrong.
    async fn load_private_key(&self, node_id: &NodeId, password: Option<&str>)
        -> Result<NodeKeyPair>;

    /// Parses a serialized public key.
    ///
    /// # Errors
    /// Returns `KeyParse` if the text is not a P-256 public key PEM.
    async fn load_public_key(&self, serialized: &str) -> Result<NodePublicKey> {
        NodePublicKey::from_pem(serialized)
    }
}

// ============================================
// MemoryKeyStore
// ============================================

/// In-memory `KeyStore`.
///
/// Keys are held in their serialized PEM form, so a save/load cycle goes
/// through the same encoding as a persistent store.
#[derive(Default)]
pub struct MemoryKeyStore {
    private_keys: Mutex<HashMap<NodeId, Zeroizing<String>>>,
    public_keys: Mutex<HashMap<NodeId, String>>,
}

impl MemoryKeyStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the stored public key PEM for `node_id`.
    #[must_use]
    pub fn public_key_pem(&self, node_id: &NodeId) -> Option<String> {
        self.public_keys.lock().get(node_id).cloned()
    }

    /// Number of stored private keys.
    #[must_use]
    pub fn private_key_count(&self) -> usize {
        self.private_keys.lock().len()
    }
}

impl fmt::Debug for MemoryKeyStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Private PEMs stay out of debug output
        f.debug_struct("MemoryKeyStore")
            .field("private_keys", &self.private_key_count())
            .field("public_keys", &self.public_keys.lock().len())
            .finish()
    }
}

#[async_trait]
impl KeyStore for MemoryKeyStore {
    async fn save_private_key(
        &self,
        key: &NodeKeyPair,
        node_id: &NodeId,
        password: Option<&str>,
    ) -> Result<String> {
        let pem = key.to_pkcs8_pem(password)?;
        self.private_keys.lock().insert(node_id.clone(), pem);
        Ok(format!("memory://{node_id}/private"))
    }

    async fn save_public_key(&self, key: &NodePublicKey, node_id: &NodeId) -> Result<String> {
        let pem = key.to_pem()?;
        self.public_keys.lock().insert(node_id.clone(), pem);
        Ok(format!("memory://{node_id}/public"))
    }

    async fn load_private_key(
        &self,
        node_id: &NodeId,
        password: Option<&str>,
    ) -> Result<NodeKeyPair> {
        let pem = self
            .private_keys
            .lock()
            .get(node_id)
            .cloned()
            .ok_or_else(|| {
                CoreError::key_storage(format!("memory://{node_id}/private"), "no key stored")
            })?;
        NodeKeyPair::from_pkcs8_pem(node_id.clone(), &pem, password)
    }
}

// ============================================
// Tests
// ============================================

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_memory_store_roundtrip() {
        let store = MemoryKeyStore::new();
        let node_id = NodeId::new("matlab_simulation").unwrap();
        let pair = NodeKeyPair::generate(node_id.clone()).unwrap();

        let location = store.save_private_key(&pair, &node_id, None).await.unwrap();
        assert_eq!(location, "memory://matlab_simulation/private");
        store.save_public_key(pair.public_key(), &node_id).await.unwrap();

        let restored = store.load_private_key(&node_id, None).await.unwrap();
        assert_eq!(restored.public_key(), pair.public_key());

        let pem = store.public_key_pem(&node_id).unwrap();
        let public = store.load_public_key(&pem).await.unwrap();
        assert_eq!(&public, pair.public_key());
        assert_eq!(store.private_key_count(), 1);
    }

    #[tokio::test]
    async fn test_memory_store_missing_key() {
        let store = MemoryKeyStore::new();
        let node_id = NodeId::new("ghost").unwrap();

        assert!(matches!(
            store.load_private_key(&node_id, None).await,
            Err(CoreError::KeyStorage { .. })
        ));
    }

    #[tokio::test]
    async fn test_load_public_key_rejects_garbage() {
        let store = MemoryKeyStore::new();
        assert!(matches!(
            store.load_public_key("not a key").await,
            Err(CoreError::KeyParse { .. })
        ));
    }
}
