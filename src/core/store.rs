//! File-backed durable store for the pending queue and published registry.
//!
//! Two JSON files in the state directory, each fully rewritten on save:
//! - `pending_proxies.json`: ordered list of links awaiting validation
//! - `proxy_db.json`: map of published link → publish timestamp (RFC 3339)
//!
//! Every mutation is a load-mutate-save span held under one async mutex, so
//! the ingest handler and the hourly cycle cannot overwrite each other with
//! stale snapshots. Readers take the same lock to observe a consistent state.

use std::collections::BTreeMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::Serialize;
use thiserror::Error;
use tokio::fs;
use tokio::sync::Mutex;
use tracing::warn;

use crate::domain::ProxyLink;

/// File name of the pending queue resource.
pub const PENDING_FILE: &str = "pending_proxies.json";

/// File name of the published registry resource.
pub const REGISTRY_FILE: &str = "proxy_db.json";

/// Errors that can occur while persisting state
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// The published registry: link → time of first publish.
pub type Registry = BTreeMap<ProxyLink, DateTime<Utc>>;

/// Durable store over the two state files.
pub struct Store {
    pending_path: PathBuf,
    registry_path: PathBuf,

    /// Serializes every load-mutate-save span (single-writer discipline).
    lock: Mutex<()>,
}

impl Store {
    /// Create a store rooted at `state_dir`, creating the directory if needed.
    pub async fn open(state_dir: &Path) -> Result<Self, StoreError> {
        fs::create_dir_all(state_dir).await?;

        Ok(Self {
            pending_path: state_dir.join(PENDING_FILE),
            registry_path: state_dir.join(REGISTRY_FILE),
            lock: Mutex::new(()),
        })
    }

    /// Path of the pending queue file.
    pub fn pending_path(&self) -> &Path {
        &self.pending_path
    }

    /// Path of the registry file.
    pub fn registry_path(&self) -> &Path {
        &self.registry_path
    }

    /// Append links to the pending queue, skipping any that are already
    /// pending or already registered. Returns the number actually added.
    pub async fn enqueue(&self, links: &[ProxyLink]) -> Result<usize, StoreError> {
        let _guard = self.lock.lock().await;

        let mut pending: Vec<ProxyLink> = load_or_default(&self.pending_path).await;
        let registry: Registry = load_or_default(&self.registry_path).await;

        let mut added = 0;
        for link in links {
            if pending.contains(link) || registry.contains_key(link) {
                continue;
            }
            pending.push(link.clone());
            added += 1;
        }

        if added > 0 {
            save(&self.pending_path, &pending).await?;
        }

        Ok(added)
    }

    /// Atomically take the whole pending queue and persist it as empty.
    ///
    /// Draining at the start of a cycle (instead of clearing at the end)
    /// means links ingested while a cycle runs survive to the next one.
    pub async fn drain_pending(&self) -> Result<Vec<ProxyLink>, StoreError> {
        let _guard = self.lock.lock().await;

        let pending: Vec<ProxyLink> = load_or_default(&self.pending_path).await;
        if !pending.is_empty() {
            save(&self.pending_path, &Vec::<ProxyLink>::new()).await?;
        }

        Ok(pending)
    }

    /// Snapshot of the pending queue.
    pub async fn pending(&self) -> Vec<ProxyLink> {
        let _guard = self.lock.lock().await;
        load_or_default(&self.pending_path).await
    }

    /// Snapshot of the published registry.
    pub async fn registry(&self) -> Registry {
        let _guard = self.lock.lock().await;
        load_or_default(&self.registry_path).await
    }

    /// Whether a link has already been published.
    pub async fn is_registered(&self, link: &ProxyLink) -> bool {
        let _guard = self.lock.lock().await;
        let registry: Registry = load_or_default(&self.registry_path).await;
        registry.contains_key(link)
    }

    /// Record a link as published at `ts`.
    ///
    /// Returns `false` without touching the file when the link was already
    /// registered; this is the at-most-once re-check.
    pub async fn register(
        &self,
        link: &ProxyLink,
        ts: DateTime<Utc>,
    ) -> Result<bool, StoreError> {
        let _guard = self.lock.lock().await;

        let mut registry: Registry = load_or_default(&self.registry_path).await;
        if registry.contains_key(link) {
            return Ok(false);
        }

        registry.insert(link.clone(), ts);
        save(&self.registry_path, &registry).await?;

        Ok(true)
    }

    /// Remove a batch of links from the registry. Returns how many were
    /// present, and the registry size afterwards.
    pub async fn remove_registered(
        &self,
        links: &[ProxyLink],
    ) -> Result<(usize, usize), StoreError> {
        let _guard = self.lock.lock().await;

        let mut registry: Registry = load_or_default(&self.registry_path).await;
        let mut removed = 0;
        for link in links {
            if registry.remove(link).is_some() {
                removed += 1;
            }
        }

        if removed > 0 {
            save(&self.registry_path, &registry).await?;
        }

        Ok((removed, registry.len()))
    }
}

/// Load a state file, falling back to the empty default on a missing or
/// malformed file. A malformed file effectively resets that collection,
/// which is an acceptable degradation rather than a crash.
async fn load_or_default<T>(path: &Path) -> T
where
    T: DeserializeOwned + Default,
{
    let raw = match fs::read_to_string(path).await {
        Ok(raw) => raw,
        Err(e) if e.kind() == ErrorKind::NotFound => return T::default(),
        Err(e) => {
            warn!(path = %path.display(), error = %e, "failed to read state file, using empty default");
            return T::default();
        }
    };

    match serde_json::from_str(&raw) {
        Ok(value) => value,
        Err(e) => {
            warn!(path = %path.display(), error = %e, "malformed state file, using empty default");
            T::default()
        }
    }
}

/// Full-overwrite save of a state file.
async fn save<T: Serialize>(path: &Path, value: &T) -> Result<(), StoreError> {
    let json = serde_json::to_string_pretty(value)?;
    fs::write(path, json).await?;
    Ok(())
}
