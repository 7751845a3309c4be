// ============================================
// File: crates/gridlink-node/src/key_store.rs
// ============================================
//! # File Key Store
//!
//! ## Creation Reason
//! Persists node keys as PEM files so a node keeps its identity across
//! restarts and peers can be handed a public key file.
//!
//! ## File Layout
//! ```text
//! {key_dir}/
//!   {node_id}_private.pem   PKCS#8, optionally encrypted (mode 0600)
//!   {node_id}_public.pem    SPKI
//! ```
//!
//! ## ⚠️ Important Note for Next Developer
//! - `NodeId` rejects path separators, so ids are safe as file stems
//! - Public keys read back from disk are cached by node id
//!
//! ## Last Modified
//! v0.1.0 - Initial file key store

use std::fmt;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use dashmap::DashMap;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info};

use gridlink_common::types::NodeId;
use gridlink_core::crypto::{NodeKeyPair, NodePublicKey};
use gridlink_core::error::{CoreError, Result};
use gridlink_core::storage::KeyStore;

/// `KeyStore` backed by PEM files in one directory.
pub struct FileKeyStore {
    key_dir: PathBuf,
    public_cache: DashMap<NodeId, NodePublicKey>,
}

impl FileKeyStore {
    /// Creates a store rooted at `key_dir`. The directory is created on
    /// first save.
    #[must_use]
    pub fn new(key_dir: impl Into<PathBuf>) -> Self {
        Self {
            key_dir: key_dir.into(),
            public_cache: DashMap::new(),
        }
    }

    /// Returns the key directory.
    #[must_use]
    pub fn key_dir(&self) -> &Path {
        &self.key_dir
    }

    /// Path of the private key file for `node_id`.
    #[must_use]
    pub fn private_key_path(&self, node_id: &NodeId) -> PathBuf {
        self.key_dir.join(format!("{node_id}_private.pem"))
    }

    /// Path of the public key file for `node_id`.
    #[must_use]
    pub fn public_key_path(&self, node_id: &NodeId) -> PathBuf {
        self.key_dir.join(format!("{node_id}_public.pem"))
    }

    /// Returns `true` if a private key file exists for `node_id`.
    pub async fn has_private_key(&self, node_id: &NodeId) -> bool {
        tokio::fs::try_exists(self.private_key_path(node_id))
            .await
            .unwrap_or(false)
    }

    /// Loads the public key file of `node_id`, using the cache when warm.
    ///
    /// # Errors
    /// Returns `KeyStorage` if the file cannot be read and `KeyParse` if
    /// it does not hold a P-256 public key.
    pub async fn load_public_key_for(&self, node_id: &NodeId) -> Result<NodePublicKey> {
        if let Some(cached) = self.public_cache.get(node_id) {
            return Ok(cached.value().clone());
        }

        let path = self.public_key_path(node_id);
        let pem = read_file(&path).await?;
        let key = NodePublicKey::from_pem(&pem)?;
        self.public_cache.insert(node_id.clone(), key.clone());

        debug!(node_id = %node_id, path = %path.display(), "Loaded public key");
        Ok(key)
    }

    /// Number of cached public keys.
    #[must_use]
    pub fn cached_public_keys(&self) -> usize {
        self.public_cache.len()
    }

    async fn write_file(&self, path: &Path, contents: &[u8], private: bool) -> Result<()> {
        let location = path.display().to_string();

        tokio::fs::create_dir_all(&self.key_dir)
            .await
            .map_err(|e| CoreError::key_storage(&location, e.to_string()))?;

        let mut options = tokio::fs::OpenOptions::new();
        options.write(true).create(true).truncate(true);

        // Private keys are owner-only from creation on Unix
        #[cfg(unix)]
        {
            if private {
                options.mode(0o600);
                // mode() only applies to new files
                if tokio::fs::try_exists(path).await.unwrap_or(false) {
                    use std::os::unix::fs::PermissionsExt;
                    tokio::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600))
                        .await
                        .map_err(|e| CoreError::key_storage(&location, e.to_string()))?;
                }
            }
        }
        #[cfg(not(unix))]
        let _ = private;

        let mut file = options
            .open(path)
            .await
            .map_err(|e| CoreError::key_storage(&location, e.to_string()))?;
        file.write_all(contents)
            .await
            .map_err(|e| CoreError::key_storage(&location, e.to_string()))?;
        file.flush()
            .await
            .map_err(|e| CoreError::key_storage(&location, e.to_string()))?;

        Ok(())
    }
}

async fn read_file(path: &Path) -> Result<String> {
    tokio::fs::read_to_string(path)
        .await
        .map_err(|e| CoreError::key_storage(path.display().to_string(), e.to_string()))
}

impl fmt::Debug for FileKeyStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FileKeyStore")
            .field("key_dir", &self.key_dir)
            .field("cached_public_keys", &self.cached_public_keys())
            .finish()
    }
}

#[async_trait]
impl KeyStore for FileKeyStore {
    async fn save_private_key(
        &self,
        key: &NodeKeyPair,
        node_id: &NodeId,
        password: Option<&str>,
    ) -> Result<String> {
        let pem = key.to_pkcs8_pem(password)?;
        let path = self.private_key_path(node_id);
        self.write_file(&path, pem.as_bytes(), true).await?;

        info!(
            node_id = %node_id,
            path = %path.display(),
            encrypted = password.is_some(),
            "Saved private key"
        );
        Ok(path.display().to_string())
    }

    async fn save_public_key(&self, key: &NodePublicKey, node_id: &NodeId) -> Result<String> {
        let pem = key.to_pem()?;
        let path = self.public_key_path(node_id);
        self.write_file(&path, pem.as_bytes(), false).await?;
        self.public_cache.insert(node_id.clone(), key.clone());

        info!(node_id = %node_id, path = %path.display(), "Saved public key");
        Ok(path.display().to_string())
    }

    async fn load_private_key(
        &self,
        node_id: &NodeId,
        password: Option<&str>,
    ) -> Result<NodeKeyPair> {
        let path = self.private_key_path(node_id);
        let pem = zeroize::Zeroizing::new(read_file(&path).await?);
        let pair = NodeKeyPair::from_pkcs8_pem(node_id.clone(), &pem, password)?;

        debug!(node_id = %node_id, path = %path.display(), "Loaded private key");
        Ok(pair)
    }
}

// ============================================
// Tests
// ============================================

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_file_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileKeyStore::new(dir.path().join("keys"));
        let node_id = NodeId::new("security_controller").unwrap();
        let pair = NodeKeyPair::generate(node_id.clone()).unwrap();

        assert!(!store.has_private_key(&node_id).await);
        let location = store.save_private_key(&pair, &node_id, None).await.unwrap();
        assert!(location.ends_with("security_controller_private.pem"));
        store.save_public_key(pair.public_key(), &node_id).await.unwrap();
        assert!(store.has_private_key(&node_id).await);

        let restored = store.load_private_key(&node_id, None).await.unwrap();
        assert_eq!(restored.public_key(), pair.public_key());

        let public = store.load_public_key_for(&node_id).await.unwrap();
        assert_eq!(&public, pair.public_key());
        assert_eq!(store.cached_public_keys(), 1);
    }

    #[tokio::test]
    async fn test_encrypted_private_key() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileKeyStore::new(dir.path());
        let node_id = NodeId::new("matlab_simulation").unwrap();
        let pair = NodeKeyPair::generate(node_id.clone()).unwrap();

        store
            .save_private_key(&pair, &node_id, Some("hunter2"))
            .await
            .unwrap();

        let pem = std::fs::read_to_string(store.private_key_path(&node_id)).unwrap();
        assert!(pem.contains("ENCRYPTED PRIVATE KEY"));

        assert!(store.load_private_key(&node_id, Some("hunter2")).await.is_ok());
        assert!(matches!(
            store.load_private_key(&node_id, Some("wrong")).await,
            Err(CoreError::KeyParse { .. })
        ));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_private_key_permissions() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let store = FileKeyStore::new(dir.path());
        let node_id = NodeId::new("node").unwrap();
        let pair = NodeKeyPair::generate(node_id.clone()).unwrap();
        store.save_private_key(&pair, &node_id, None).await.unwrap();

        let mode = std::fs::metadata(store.private_key_path(&node_id))
            .unwrap()
            .permissions()
            .mode();
        assert_eq!(mode & 0o777, 0o600);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_overwritten_private_key_is_owner_only() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let store = FileKeyStore::new(dir.path());
        let node_id = NodeId::new("node").unwrap();
        let path = store.private_key_path(&node_id);
        std::fs::write(&path, "stale").unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o644)).unwrap();

        let pair = NodeKeyPair::generate(node_id.clone()).unwrap();
        store.save_private_key(&pair, &node_id, None).await.unwrap();

        let mode = std::fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
        assert!(store.load_private_key(&node_id, None).await.is_ok());
    }

    #[tokio::test]
    async fn test_missing_key_file() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileKeyStore::new(dir.path());
        let node_id = NodeId::new("ghost").unwrap();

        assert!(matches!(
            store.load_private_key(&node_id, None).await,
            Err(CoreError::KeyStorage { .. })
        ));
        assert!(matches!(
            store.load_public_key_for(&node_id).await,
            Err(CoreError::KeyStorage { .. })
        ));
    }
}
