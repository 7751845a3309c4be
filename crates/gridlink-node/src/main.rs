// ============================================
// File: crates/gridlink-node/src/main.rs
// ============================================
//! # Gridlink Node Entry Point
//!
//! ## Creation Reason
//! Command-line front end for a gridlink node: key generation and the
//! offline seal/open of secure messages exchanged as JSON files.
//!
//! ## Main Functionality
//! - CLI argument parsing with clap
//! - Logging initialization with tracing
//! - Configuration loading
//! - Key generation and export
//! - Sealing and opening secure messages
//!
//! ## Usage
//! ```bash
//! # Step 1: Generate this node's key pair
//! gridlink-node keygen
//!
//! # Step 2: Exchange public key files with the peer
//! gridlink-node pubkey > controller_public.pem
//!
//! # Step 3: Seal a command for the peer, and open its reply
//! gridlink-node seal --peer-id matlab_simulation --peer-key sim.pem \
//!     --message "SET_VOLTAGE:230.5" > msg.json
//! gridlink-node open --peer-id matlab_simulation --peer-key sim.pem --input reply.json
//!
//! # Other commands
//! gridlink-node validate            # Validate config file
//! ```
//!
//! ## ⚠️ Important Note for Next Developer
//! - Logging goes to stderr; stdout carries PEM and JSON output
//! - Private key passwords come from the env var named in `keys.password_env`
//!
//! ## Last Modified
//! v0.1.0 - Initial CLI implementation

use std::path::{Path, PathBuf};

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use tracing::{error, info};
use tracing_subscriber::{fmt, prelude::*, reload, EnvFilter, Registry};

use gridlink_common::types::NodeId;
use gridlink_core::crypto::NodeKeyPair;
use gridlink_core::protocol::{Codec, JsonCodec};
use gridlink_core::storage::KeyStore;
use gridlink_node::{ChannelSession, FileKeyStore, NodeConfig};

const DEFAULT_CONFIG: &str = "gridlink.toml";

/// Level used until the configuration file has been read.
const STARTUP_LOG_LEVEL: &str = "info";

type LogLevelHandle = reload::Handle<EnvFilter, Registry>;

// ============================================
// CLI Definition
// ============================================

/// Gridlink secure channel node
///
/// Quick Start:
///   1. Run: gridlink-node keygen
///   2. Give the peer your public key file
///   3. Run: gridlink-node seal --peer-id <ID> --peer-key <PEM> --message <TEXT>
#[derive(Parser, Debug)]
#[command(name = "gridlink-node")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Generate and store this node's key pair
    Keygen {
        /// Path to configuration file
        #[arg(short, long, default_value = DEFAULT_CONFIG)]
        config: PathBuf,

        /// Encrypt the private key with the password from `keys.password_env`
        #[arg(long)]
        password: bool,

        /// Overwrite an existing key pair
        #[arg(long)]
        force: bool,
    },

    /// Print this node's public key PEM
    Pubkey {
        /// Path to configuration file
        #[arg(short, long, default_value = DEFAULT_CONFIG)]
        config: PathBuf,
    },

    /// Encrypt (and sign) a message for a peer
    Seal {
        /// Path to configuration file
        #[arg(short, long, default_value = DEFAULT_CONFIG)]
        config: PathBuf,

        /// Peer node identifier
        #[arg(long)]
        peer_id: String,

        /// Peer public key PEM file
        #[arg(long)]
        peer_key: PathBuf,

        /// Plaintext to send
        #[arg(short, long)]
        message: String,

        /// Do not sign, regardless of `channel.sign_messages`
        #[arg(long)]
        no_sign: bool,

        /// Write the message JSON here instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Decrypt a message from a peer and verify its signature
    Open {
        /// Path to configuration file
        #[arg(short, long, default_value = DEFAULT_CONFIG)]
        config: PathBuf,

        /// Peer node identifier
        #[arg(long)]
        peer_id: String,

        /// Peer public key PEM file
        #[arg(long)]
        peer_key: PathBuf,

        /// Secure message JSON file
        #[arg(short, long)]
        input: PathBuf,
    },

    /// Validate configuration file
    Validate {
        /// Path to configuration file
        #[arg(short, long, default_value = DEFAULT_CONFIG)]
        config: PathBuf,
    },
}

impl Commands {
    fn config_path(&self) -> &Path {
        match self {
            Self::Keygen { config, .. }
            | Self::Pubkey { config }
            | Self::Seal { config, .. }
            | Self::Open { config, .. }
            | Self::Validate { config } => config,
        }
    }
}

// ============================================
// Main
// ============================================

#[tokio::main]
async fn main() {
    // Parse CLI arguments
    let cli = Cli::parse();

    // Initialize logging, then switch to the configured level
    let log_level = init_logging(STARTUP_LOG_LEVEL);
    let config_path = cli.command.config_path().to_path_buf();
    let config = NodeConfig::load_or_default(&config_path).await;
    if let (Some(handle), Ok(config)) = (&log_level, &config) {
        apply_log_level(handle, &config.logging.level);
    }

    // Execute command
    let result = match config {
        Err(e) => Err(e.into()),
        Ok(config) => match cli.command {
            Commands::Keygen { password, force, .. } => cmd_keygen(&config, password, force).await,
            Commands::Pubkey { .. } => cmd_pubkey(&config).await,
            Commands::Seal {
                peer_id,
                peer_key,
                message,
                no_sign,
                output,
                ..
            } => cmd_seal(&config, &peer_id, &peer_key, &message, no_sign, output).await,
            Commands::Open {
                peer_id,
                peer_key,
                input,
                ..
            } => cmd_open(&config, &peer_id, &peer_key, &input).await,
            Commands::Validate { config: path } => cmd_validate(&config, &path),
        },
    };

    // Handle errors
    if let Err(e) = result {
        error!("{:#}", e);
        std::process::exit(1);
    }
}

// ============================================
// Commands
// ============================================

/// Generates a key pair and writes both PEM files.
async fn cmd_keygen(config: &NodeConfig, encrypt: bool, force: bool) -> anyhow::Result<()> {
    let node_id = config.node_id()?;
    let store = FileKeyStore::new(&config.keys.key_dir);

    if store.has_private_key(&node_id).await && !force {
        bail!(
            "key already exists at {} (use --force to overwrite)",
            store.private_key_path(&node_id).display()
        );
    }

    let password = if encrypt {
        let Some(password) = config.key_password() else {
            bail!("--password needs keys.password_env set to a non-empty variable");
        };
        Some(password)
    } else {
        None
    };

    let pair = NodeKeyPair::generate(node_id.clone())?;
    let private_path = store
        .save_private_key(&pair, &node_id, password.as_deref().map(String::as_str))
        .await?;
    let public_path = store.save_public_key(pair.public_key(), &node_id).await?;

    info!(node_id = %node_id, "Key pair generated");

    println!("✅ Key pair generated for '{node_id}'");
    println!("   Fingerprint: {}", pair.public_key().fingerprint());
    println!("   Private key: {private_path}");
    println!("   Public key:  {public_path}");
    if password.is_some() {
        println!("   Encrypted:   yes");
    }
    Ok(())
}

/// Prints the node public key PEM.
async fn cmd_pubkey(config: &NodeConfig) -> anyhow::Result<()> {
    let session = load_session(config).await?;
    print!("{}", session.export_public_key()?);
    Ok(())
}

/// Seals a message for a peer and prints the JSON.
async fn cmd_seal(
    config: &NodeConfig,
    peer_id: &str,
    peer_key: &Path,
    message: &str,
    no_sign: bool,
    output: Option<PathBuf>,
) -> anyhow::Result<()> {
    let session = load_session(config).await?;
    let peer_id = establish(&session, peer_id, peer_key).await?;

    let secure = if no_sign {
        session.send_secure(&peer_id, message, false)?
    } else {
        session.send(&peer_id, message)?
    };
    let encoded = JsonCodec::pretty().encode(&secure)?;

    match output {
        Some(path) => {
            tokio::fs::write(&path, &encoded)
                .await
                .with_context(|| format!("failed to write {}", path.display()))?;
            info!(path = %path.display(), message_id = %secure.message_id, "Message written");
        }
        None => println!("{}", String::from_utf8_lossy(&encoded)),
    }
    Ok(())
}

/// Opens a message from a peer and prints the result.
async fn cmd_open(
    config: &NodeConfig,
    peer_id: &str,
    peer_key: &Path,
    input: &Path,
) -> anyhow::Result<()> {
    let session = load_session(config).await?;
    let peer_id = establish(&session, peer_id, peer_key).await?;

    let bytes = tokio::fs::read(input)
        .await
        .with_context(|| format!("failed to read {}", input.display()))?;
    let secure = JsonCodec::new().decode(&bytes)?;
    let received = session.receive_from_peer(&secure, &peer_id)?;

    println!("Sender:     {}", received.sender_node);
    println!("Message ID: {}", received.message_id);
    println!("Created:    {}", received.created_at);
    println!("Signature:  {}", received.signature_valid);
    println!();
    println!("{}", received.plaintext);
    Ok(())
}

/// Validates configuration file.
fn cmd_validate(config: &NodeConfig, path: &Path) -> anyhow::Result<()> {
    if !path.exists() {
        println!("⚠️  Config file not found: {}", path.display());
        println!("   Node will use default values.");
        return Ok(());
    }

    println!("✅ Configuration is valid");
    println!();
    println!("Node:");
    println!("   ID:         {}", config.node.node_id);
    println!();
    println!("Keys:");
    println!("   Directory:  {}", config.keys.key_dir.display());
    if let Some(var) = &config.keys.password_env {
        println!("   Password:   ${var}");
    }
    println!();
    println!("Channel:");
    println!("   Secret TTL: {}s", config.channel.secret_ttl_secs);
    println!("   KDF Info:   {}", config.channel.kdf_info);
    println!("   Signing:    {}", config.channel.sign_messages);
    if let Some(max_age) = config.channel.max_message_age_secs {
        println!("   Max Age:    {max_age}s");
    }
    println!();

    Ok(())
}

// ============================================
// Helper Functions
// ============================================

/// Initializes the tracing subscriber.
/// Returns a level handle unless `RUST_LOG` is set, which always wins.
fn init_logging(level: &str) -> Option<LogLevelHandle> {
    let from_env = EnvFilter::try_from_default_env().ok();
    let env_override = from_env.is_some();
    let (filter, handle) =
        reload::Layer::new(from_env.unwrap_or_else(|| EnvFilter::new(level)));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(true).with_writer(std::io::stderr))
        .try_init()
        .ok()?;

    (!env_override).then_some(handle)
}

fn apply_log_level(handle: &LogLevelHandle, level: &str) {
    if let Err(e) = handle.reload(EnvFilter::new(level)) {
        error!("Failed to apply log level '{}': {}", level, e);
    }
}

/// Builds a session with the stored node key installed.
async fn load_session(config: &NodeConfig) -> anyhow::Result<ChannelSession> {
    let session = ChannelSession::from_config(config)?;
    let store = FileKeyStore::new(&config.keys.key_dir);
    let password = config.key_password();

    let pair = store
        .load_private_key(session.node_id(), password.as_deref().map(String::as_str))
        .await
        .with_context(|| {
            format!(
                "no usable key for '{}'; run 'gridlink-node keygen' first",
                session.node_id()
            )
        })?;
    session.install_key_pair(pair)?;
    Ok(session)
}

/// Reads the peer key file and establishes the channel.
async fn establish(session: &ChannelSession, peer_id: &str, peer_key: &Path) -> anyhow::Result<NodeId> {
    let peer_id: NodeId = peer_id.parse()?;
    let pem = tokio::fs::read_to_string(peer_key)
        .await
        .with_context(|| format!("failed to read peer key {}", peer_key.display()))?;
    session.establish_channel(&peer_id, &pem)?;
    Ok(peer_id)
}

// ============================================
// Tests
// ============================================
