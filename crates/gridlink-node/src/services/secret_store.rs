// ============================================
// File: crates/gridlink-node/src/services/secret_store.rs
// ============================================
//! # Channel Secret Store
//!
//! ## Creation Reason
//! Holds the derived channel key for each peer together with its expiry,
//! so sessions can look secrets up by peer without re-running ECDH.
//!
//! ## Main Functionality
//! - `SharedSecret`: channel key plus creation and expiry instants
//! - `ChannelSecretStore`: per-peer map with lazy expiry
//! - `StoreStatus`: observability snapshot
//!
//! ## Secret Lifecycle
//! ```text
//! ┌───────────┐   put / put_until   ┌───────────────┐
//! │ NO_SECRET │ ──────────────────► │ SECRET_ACTIVE │
//! └───────────┘                     └───────┬───────┘
//!       ▲                                   │
//!       │      get() after expiry,          │
//!       └───── remove(), purge_expired() ◄──┘
//! ```
//!
//! ## Expiry Semantics
//! A secret is readable while `now < expires_at`. Expiry is checked lazily:
//! the `get` that observes an expired entry removes it. Nothing sweeps in
//! the background, so an expired entry that is never read again stays in
//! memory until `purge_expired` or `remove` is called. Memory is bounded
//! by the number of peers.
//!
//! ## ⚠️ Important Note for Next Developer
//! - Entries live in a DashMap; never hold a `Ref` while removing
//! - Eviction uses `remove_if` so a fresh `put` racing with an expiring
//!   read is never lost
//!
//! ## Last Modified
//! v0.1.0 - Initial secret store

use std::fmt;
use std::time::Duration;

use dashmap::DashMap;
use serde::Serialize;
use tracing::{debug, info, warn};

use gridlink_common::error::CommonError;
use gridlink_common::time::Timestamp;
use gridlink_common::types::NodeId;
use gridlink_core::crypto::ChannelKey;

use crate::error::Result;

/// Default secret lifetime (24 hours).
pub const DEFAULT_SECRET_TTL: Duration = Duration::from_secs(24 * 60 * 60);

// ============================================
// SharedSecret
// ============================================

/// A derived channel key with its validity window.
#[derive(Clone)]
pub struct SharedSecret {
    key: ChannelKey,
    created_at: Timestamp,
    expires_at: Timestamp,
}

impl SharedSecret {
    /// Returns the channel key.
    #[must_use]
    pub fn key(&self) -> &ChannelKey {
        &self.key
    }

    /// Returns when the secret was stored.
    #[must_use]
    pub const fn created_at(&self) -> Timestamp {
        self.created_at
    }

    /// Returns when the secret stops being readable.
    #[must_use]
    pub const fn expires_at(&self) -> Timestamp {
        self.expires_at
    }

    /// Returns `true` if the secret is no longer readable at `now`.
    #[must_use]
    pub fn is_expired_at(&self, now: Timestamp) -> bool {
        now >= self.expires_at
    }
}

impl fmt::Debug for SharedSecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SharedSecret")
            .field("key", &self.key)
            .field("created_at", &self.created_at.to_iso_string())
            .field("expires_at", &self.expires_at.to_iso_string())
            .finish()
    }
}

// ============================================
// StoreStatus
// ============================================

/// Snapshot of the store for observability.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StoreStatus {
    /// Number of unexpired secrets.
    pub active_count: usize,
    /// Peers with an unexpired secret, sorted.
    pub peer_ids: Vec<NodeId>,
}

// ============================================
// ChannelSecretStore
// ============================================

/// Per-peer store of channel secrets with lazy expiry.
///
/// One entry per peer; storing again overwrites.
pub struct ChannelSecretStore {
    secrets: DashMap<NodeId, SharedSecret>,
    default_ttl: Duration,
}

impl ChannelSecretStore {
    /// Creates a store whose `put_default` uses `default_ttl`.
    #[must_use]
    pub fn new(default_ttl: Duration) -> Self {
        Self {
            secrets: DashMap::new(),
            default_ttl,
        }
    }

    /// Stores `key` for `peer`, readable for `ttl` from now.
    ///
    /// A zero `ttl` stores an entry that is already expired.
    ///
    /// # Errors
    /// Returns `InvalidInput` if `now + ttl` is not representable.
    pub fn put(&self, peer: &NodeId, key: ChannelKey, ttl: Duration) -> Result<Timestamp> {
        let now = Timestamp::now();
        let expires_at = now
            .checked_add(ttl)
            .ok_or_else(|| CommonError::invalid_input("ttl", "expiry is out of range"))?;

        self.insert(peer, key, now, expires_at);
        Ok(expires_at)
    }

    /// Stores `key` for `peer` with the default lifetime.
    ///
    /// # Errors
    /// See [`ChannelSecretStore::put`].
    pub fn put_default(&self, peer: &NodeId, key: ChannelKey) -> Result<Timestamp> {
        self.put(peer, key, self.default_ttl)
    }

    /// Stores `key` for `peer` with an explicit expiry instant.
    pub fn put_until(&self, peer: &NodeId, key: ChannelKey, expires_at: Timestamp) {
        self.insert(peer, key, Timestamp::now(), expires_at);
    }

    fn insert(&self, peer: &NodeId, key: ChannelKey, created_at: Timestamp, expires_at: Timestamp) {
        let replaced = self
            .secrets
            .insert(
                peer.clone(),
                SharedSecret {
                    key,
                    created_at,
                    expires_at,
                },
            )
            .is_some();

        info!(
            peer_id = %peer,
            expires_at = %expires_at,
            replaced,
            "Channel secret stored"
        );
    }

    /// Returns the secret for `peer` if it has not expired.
    ///
    /// An expired entry is removed by this call.
    #[must_use]
    pub fn get(&self, peer: &NodeId) -> Option<ChannelKey> {
        self.get_entry(peer).map(|secret| secret.key)
    }

    /// Returns the full entry for `peer` if it has not expired.
    ///
    /// Evicts an expired entry like [`ChannelSecretStore::get`].
    #[must_use]
    pub fn get_entry(&self, peer: &NodeId) -> Option<SharedSecret> {
        let now = Timestamp::now();

        match self.secrets.get(peer) {
            None => return None,
            Some(entry) if !entry.is_expired_at(now) => return Some(entry.value().clone()),
            Some(_) => {}
        }

        if self
            .secrets
            .remove_if(peer, |_, secret| secret.is_expired_at(now))
            .is_some()
        {
            warn!(peer_id = %peer, "Channel secret expired, evicted");
        }
        None
    }

    /// Removes the secret for `peer`.
    ///
    /// Returns `true` if an entry existed.
    pub fn remove(&self, peer: &NodeId) -> bool {
        let removed = self.secrets.remove(peer).is_some();
        if removed {
            info!(peer_id = %peer, "Channel secret removed");
        }
        removed
    }

    /// Removes every expired entry and returns how many were dropped.
    ///
    /// Never called implicitly.
    pub fn purge_expired(&self) -> usize {
        let now = Timestamp::now();
        let before = self.secrets.len();
        self.secrets.retain(|_, secret| !secret.is_expired_at(now));
        let purged = before.saturating_sub(self.secrets.len());

        if purged > 0 {
            debug!(purged, "Purged expired channel secrets");
        }
        purged
    }

    /// Returns the unexpired peers without evicting anything.
    #[must_use]
    pub fn status(&self) -> StoreStatus {
        let now = Timestamp::now();
        let mut peer_ids: Vec<NodeId> = self
            .secrets
            .iter()
            .filter(|entry| !entry.value().is_expired_at(now))
            .map(|entry| entry.key().clone())
            .collect();
        peer_ids.sort();

        StoreStatus {
            active_count: peer_ids.len(),
            peer_ids,
        }
    }

    /// Number of stored entries, including expired ones not yet evicted.
    #[must_use]
    pub fn len(&self) -> usize {
        self.secrets.len()
    }

    /// Returns `true` if nothing is stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.secrets.is_empty()
    }
}

impl Default for ChannelSecretStore {
    fn default() -> Self {
        Self::new(DEFAULT_SECRET_TTL)
    }
}

impl fmt::Debug for ChannelSecretStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChannelSecretStore")
            .field("entries", &self.len())
            .field("default_ttl", &self.default_ttl)
            .finish()
    }
}

// ============================================
// Tests
// ============================================
