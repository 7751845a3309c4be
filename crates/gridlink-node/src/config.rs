// ============================================
// File: crates/gridlink-node/src/config.rs
// ============================================
//! # Node Configuration
//!
//! ## Creation Reason
//! Provides configuration management for a gridlink node, loaded from a
//! TOML file with defaults for every section.
//!
//! ## Main Functionality
//! - `NodeConfig`: Main configuration structure
//! - TOML file loading and parsing
//! - Configuration validation
//!
//! ## Configuration Sections
//! - `node`: Node identifier
//! - `keys`: Key directory and optional password source
//! - `channel`: Secret lifetime, KDF context, signing, freshness window
//! - `logging`: Log level
//!
//! ## Example Configuration
//! ```toml
//! [node]
//! node_id = "security_controller"
//!
//! [keys]
//! key_dir = "keys"
//! password_env = "GRIDLINK_KEY_PASSWORD"
//!
//! [channel]
//! secret_ttl_secs = 86400
//! kdf_info = "microgrid-secure-channel"
//! sign_messages = true
//! max_message_age_secs = 300
//!
//! [logging]
//! level = "info"
//! ```
//!
//! ## ⚠️ Important Note for Next Developer
//! - Both peers of a channel must use the same `kdf_info`
//! - The key password is read from the environment, never from the file
//!
//! ## Last Modified
//! v0.1.0 - Initial configuration implementation

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::info;
use zeroize::Zeroizing;

use gridlink_common::time::Timestamp;
use gridlink_common::types::NodeId;
use gridlink_core::crypto::DEFAULT_KDF_INFO;

use crate::error::{NodeError, Result};

// ============================================
// NodeConfig
// ============================================

/// Main node configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NodeConfig {
    /// Node identity.
    #[serde(default)]
    pub node: NodeSection,

    /// Key storage.
    #[serde(default)]
    pub keys: KeysConfig,

    /// Secure channel behaviour.
    #[serde(default)]
    pub channel: ChannelConfig,

    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl NodeConfig {
    /// Loads configuration from a TOML file.
    ///
    /// # Errors
    /// Returns `ConfigLoad` if the file cannot be read or parsed, and
    /// `ConfigInvalid` if validation fails.
    pub async fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let path_str = path.display().to_string();

        info!("Loading configuration from: {}", path_str);

        let content = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| NodeError::config_load(&path_str, e.to_string()))?;

        let config: Self = toml::from_str(&content)
            .map_err(|e| NodeError::config_load(&path_str, e.to_string()))?;

        config.validate()?;

        info!("Configuration loaded successfully");
        Ok(config)
    }

    /// Loads configuration, falling back to defaults if the file is absent.
    ///
    /// # Errors
    /// Same as [`NodeConfig::load`] when the file exists.
    pub async fn load_or_default(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if tokio::fs::try_exists(path).await.unwrap_or(false) {
            Self::load(path).await
        } else {
            info!(path = %path.display(), "Config file not found, using defaults");
            Ok(Self::default())
        }
    }

    /// Loads configuration from a string (useful for testing).
    ///
    /// # Errors
    /// Returns `ConfigLoad` on parse errors and `ConfigInvalid` on
    /// validation errors.
    pub fn from_toml(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content)
            .map_err(|e| NodeError::config_load("<string>", e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Validates the configuration.
    ///
    /// # Errors
    /// Returns `ConfigInvalid` naming the first offending field.
    pub fn validate(&self) -> Result<()> {
        self.node.validate()?;
        self.channel.validate()?;
        Ok(())
    }

    // ========================================
    // Helper methods
    // ========================================

    /// Returns the validated node identifier.
    ///
    /// # Errors
    /// Returns `ConfigInvalid` if `node.node_id` is not a valid identifier.
    pub fn node_id(&self) -> Result<NodeId> {
        NodeId::new(self.node.node_id.as_str())
            .map_err(|e| NodeError::config_invalid("node.node_id", e.to_string()))
    }

    /// Returns the channel secret lifetime.
    #[must_use]
    pub fn secret_ttl(&self) -> Duration {
        Duration::from_secs(self.channel.secret_ttl_secs)
    }

    /// Returns the freshness window, if enabled.
    #[must_use]
    pub fn max_message_age(&self) -> Option<Duration> {
        self.channel.max_message_age_secs.map(Duration::from_secs)
    }

    /// Reads the private key password from the configured variable.
    #[must_use]
    pub fn key_password(&self) -> Option<Zeroizing<String>> {
        let var = self.keys.password_env.as_deref()?;
        std::env::var(var).ok().filter(|p| !p.is_empty()).map(Zeroizing::new)
    }
}

// ============================================
// NodeSection
// ============================================

/// Node identity section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeSection {
    /// Identifier used as sender, signer and key file stem.
    #[serde(default = "default_node_id")]
    pub node_id: String,
}

fn default_node_id() -> String {
    "gridlink_node".to_string()
}

impl NodeSection {
    fn validate(&self) -> Result<()> {
        NodeId::new(self.node_id.as_str())
            .map(|_| ())
            .map_err(|e| NodeError::config_invalid("node.node_id", e.to_string()))
    }
}

impl Default for NodeSection {
    fn default() -> Self {
        Self {
            node_id: default_node_id(),
        }
    }
}

// ============================================
// KeysConfig
// ============================================

/// Key storage section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KeysConfig {
    /// Directory holding `{node_id}_private.pem` and `{node_id}_public.pem`.
    #[serde(default = "default_key_dir")]
    pub key_dir: PathBuf,

    /// Environment variable holding the private key password.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password_env: Option<String>,
}

fn default_key_dir() -> PathBuf {
    PathBuf::from("keys")
}

impl Default for KeysConfig {
    fn default() -> Self {
        Self {
            key_dir: default_key_dir(),
            password_env: None,
        }
    }
}

// ============================================
// ChannelConfig
// ============================================

/// Secure channel section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChannelConfig {
    /// Lifetime of a derived channel secret in seconds.
    #[serde(default = "default_secret_ttl")]
    pub secret_ttl_secs: u64,

    /// HKDF info string; must match on both peers.
    #[serde(default = "default_kdf_info")]
    pub kdf_info: String,

    /// Whether outgoing messages are signed.
    #[serde(default = "default_sign_messages")]
    pub sign_messages: bool,

    /// Optional freshness window for received envelopes, in seconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_message_age_secs: Option<u64>,
}

fn default_secret_ttl() -> u64 {
    86_400
}

fn default_kdf_info() -> String {
    String::from_utf8_lossy(DEFAULT_KDF_INFO).into_owned()
}

fn default_sign_messages() -> bool {
    true
}

impl ChannelConfig {
    fn validate(&self) -> Result<()> {
        if self.secret_ttl_secs == 0 {
            return Err(NodeError::config_invalid(
                "channel.secret_ttl_secs",
                "must be greater than 0",
            ));
        }
        if Timestamp::now()
            .checked_add(Duration::from_secs(self.secret_ttl_secs))
            .is_none()
        {
            return Err(NodeError::config_invalid(
                "channel.secret_ttl_secs",
                "expiry is out of range",
            ));
        }
        if self.kdf_info.is_empty() {
            return Err(NodeError::config_invalid(
                "channel.kdf_info",
                "cannot be empty",
            ));
        }
        if self.max_message_age_secs == Some(0) {
            return Err(NodeError::config_invalid(
                "channel.max_message_age_secs",
                "must be greater than 0",
            ));
        }
        Ok(())
    }
}

impl Default for ChannelConfig {
    fn default() -> Self {
        Self {
            secret_ttl_secs: default_secret_ttl(),
            kdf_info: default_kdf_info(),
            sign_messages: default_sign_messages(),
            max_message_age_secs: None,
        }
    }
}

// ============================================
// LoggingConfig
// ============================================

/// Logging configuration section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub level: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

// ============================================
// Tests
// ============================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = NodeConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.secret_ttl(), Duration::from_secs(86_400));
        assert_eq!(config.channel.kdf_info, "microgrid-secure-channel");
        assert!(config.channel.sign_messages);
        assert!(config.max_message_age().is_none());
    }

    #[test]
    fn test_parse_config() {
        let toml = r#"
            [node]
            node_id = "security_controller"

            [keys]
            key_dir = "/var/lib/gridlink/keys"

            [channel]
            secret_ttl_secs = 3600
            max_message_age_secs = 300
        "#;

        let config = NodeConfig::from_toml(toml).unwrap();
        assert_eq!(config.node_id().unwrap().as_str(), "security_controller");
        assert_eq!(config.keys.key_dir, PathBuf::from("/var/lib/gridlink/keys"));
        assert_eq!(config.secret_ttl(), Duration::from_secs(3600));
        assert_eq!(config.max_message_age(), Some(Duration::from_secs(300)));
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_unrepresentable_secret_ttl() {
        let config = NodeConfig {
            channel: ChannelConfig {
                secret_ttl_secs: u64::MAX,
                ..ChannelConfig::default()
            },
            ..NodeConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(NodeError::ConfigInvalid { ref field, .. }) if field == "channel.secret_ttl_secs"
        ));
    }

    #[test]
    fn test_invalid_config() {
        let err = NodeConfig::from_toml("[channel]\nsecret_ttl_secs = 0").unwrap_err();
        assert!(matches!(err, NodeError::ConfigInvalid { ref field, .. } if field == "channel.secret_ttl_secs"));

        assert!(NodeConfig::from_toml("[channel]\nkdf_info = \"\"").is_err());
        assert!(matches!(
            NodeConfig::from_toml("[channel]\nsecret_ttl_secs = 9223372036854775807"),
            Err(NodeError::ConfigInvalid { ref field, .. }) if field == "channel.secret_ttl_secs"
        ));
        assert!(NodeConfig::from_toml("[channel]\nmax_message_age_secs = 0").is_err());
        assert!(NodeConfig::from_toml("[node]\nnode_id = \"a/b\"").is_err());
        assert!(matches!(
            NodeConfig::from_toml("[node"),
            Err(NodeError::ConfigLoad { .. })
        ));
    }

    #[tokio::test]
    async fn test_load_or_default_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let config = NodeConfig::load_or_default(dir.path().join("absent.toml")).await.unwrap();
        assert_eq!(config.node.node_id, "gridlink_node");
    }

    #[tokio::test]
    async fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("node.toml");
        tokio::fs::write(&path, "[node]\nnode_id = \"field_node\"\n").await.unwrap();

        let config = NodeConfig::load(&path).await.unwrap();
        assert_eq!(config.node.node_id, "field_node");
    }
}
