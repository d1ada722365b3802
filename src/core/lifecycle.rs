//! Proxy-link lifecycle orchestration.
//!
//! Coordinates the three spans of a link's life:
//! ingestion (extract + dedup + enqueue), the hourly validation cycle
//! (probe, publish, register), and the daily expiry sweep.
//!
//! Each link moves through the collections implicitly:
//! discovered → pending → validated working/failing → published/registered,
//! with failing and already-registered links discarded from pending.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use chrono::Utc;
use tokio::time::sleep;
use tracing::{debug, info, instrument, warn};

use crate::adapters::Transport;
use crate::domain::{extract_proxy_links, ProxyLink};

use super::probe::{ProbeOutcome, Prober};
use super::store::Store;

/// Timing and retention knobs for the lifecycle.
#[derive(Debug, Clone)]
pub struct LifecycleSettings {
    /// Pause between reachability probes, bounds outbound connect rate.
    pub probe_delay: Duration,

    /// Pause between publishes to the output channel.
    pub publish_delay: Duration,

    /// How long a published link stays before it is eligible for expiry.
    pub retention: chrono::Duration,

    /// How many recent published payloads the sweep scans per run.
    pub sweep_lookback: usize,
}

impl Default for LifecycleSettings {
    fn default() -> Self {
        Self {
            probe_delay: Duration::from_millis(500),
            publish_delay: Duration::from_millis(300),
            retention: chrono::Duration::hours(24),
            sweep_lookback: 100,
        }
    }
}

/// Counters from one hourly cycle.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CycleReport {
    /// Links drained from the pending queue and probed.
    pub checked: usize,
    /// Links that probed reachable.
    pub working: usize,
    /// Links actually published this cycle.
    pub published: usize,
    /// Working links skipped because they were already registered.
    pub skipped_registered: usize,
}

/// Counters from one expiry sweep.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SweepReport {
    /// Registry entries past the retention window.
    pub candidates: usize,
    /// Published payloads actually deleted from the channel.
    pub deleted: usize,
    /// Registry entries remaining after the sweep.
    pub remaining: usize,
}

/// Lifecycle orchestrator over store, prober, and transport.
pub struct Lifecycle {
    store: Arc<Store>,
    prober: Arc<dyn Prober>,
    transport: Arc<dyn Transport>,
    settings: LifecycleSettings,
}

impl Lifecycle {
    pub fn new(
        store: Arc<Store>,
        prober: Arc<dyn Prober>,
        transport: Arc<dyn Transport>,
        settings: LifecycleSettings,
    ) -> Self {
        Self {
            store,
            prober,
            transport,
            settings,
        }
    }

    pub fn store(&self) -> &Arc<Store> {
        &self.store
    }

    /// Handle one incoming message: extract links and enqueue the novel ones.
    ///
    /// Returns how many links were added to the pending queue.
    #[instrument(skip(self, text))]
    pub async fn ingest_text(&self, source: &str, text: &str) -> Result<usize> {
        let links = extract_proxy_links(text);
        if links.is_empty() {
            return Ok(0);
        }

        let added = self.store.enqueue(&links).await?;
        if added > 0 {
            let pending_total = self.store.pending().await.len();
            info!(found = links.len(), added, pending_total, "queued new proxy links");
        }

        Ok(added)
    }

    /// Run one validation-and-publication cycle over the pending queue.
    ///
    /// The queue is drained up front, so every entry is consumed by exactly
    /// one cycle; failing links are not retried unless rediscovered. An
    /// empty queue is a no-op with zero transport calls.
    #[instrument(skip(self))]
    pub async fn run_cycle(&self) -> Result<CycleReport> {
        let mut report = CycleReport::default();

        let pending = self.store.drain_pending().await?;
        if pending.is_empty() {
            debug!("no pending proxies to process");
            return Ok(report);
        }

        report.checked = pending.len();
        info!(count = pending.len(), "checking pending proxies");

        let mut working = Vec::new();
        for (i, link) in pending.iter().enumerate() {
            match self.prober.probe(link).await {
                ProbeOutcome::Reachable => {
                    debug!(link = %link.short(), "proxy reachable");
                    working.push(link.clone());
                }
                ProbeOutcome::Unreachable(reason) => {
                    debug!(link = %link.short(), %reason, "proxy unreachable");
                }
                ProbeOutcome::Malformed => {
                    warn!(link = %link.short(), "malformed proxy link, dropping");
                }
            }

            if i + 1 < pending.len() {
                sleep(self.settings.probe_delay).await;
            }
        }

        report.working = working.len();
        if working.is_empty() {
            info!("no working proxies in this batch");
            return Ok(report);
        }

        info!(count = working.len(), "publishing working proxies");

        for (i, link) in working.iter().enumerate() {
            // Re-check right before publishing: the at-most-once guard
            if self.store.is_registered(link).await {
                debug!(link = %link.short(), "already published, skipping");
                report.skipped_registered += 1;
                continue;
            }

            // Each publish has its own fault boundary so one bad call does
            // not abort the rest of the batch.
            match self.transport.publish(link.as_str()).await {
                Ok(_handle) => {
                    self.store.register(link, Utc::now()).await?;
                    report.published += 1;
                    info!(link = %link.short(), "published proxy");
                }
                Err(e) => {
                    warn!(link = %link.short(), error = %e, "publish failed, link dropped from this batch");
                }
            }

            if i + 1 < working.len() {
                sleep(self.settings.publish_delay).await;
            }
        }

        let registry_total = self.store.registry().await.len();
        info!(
            published = report.published,
            registry_total, "cycle finished"
        );

        Ok(report)
    }

    /// Remove published links older than the retention window.
    ///
    /// For each expired link the sweep scans a bounded window of recent
    /// payloads and deletes the first one containing the link. The registry
    /// entry is removed whether or not a payload was found; a payload
    /// already deleted by hand is not an error.
    #[instrument(skip(self))]
    pub async fn sweep_expired(&self) -> Result<SweepReport> {
        info!("starting expiry sweep");

        let registry = self.store.registry().await;
        let threshold = Utc::now() - self.settings.retention;

        let expired: Vec<ProxyLink> = registry
            .iter()
            .filter(|(_, published_at)| **published_at < threshold)
            .map(|(link, _)| link.clone())
            .collect();

        if expired.is_empty() {
            info!("no proxies past retention");
            return Ok(SweepReport {
                candidates: 0,
                deleted: 0,
                remaining: registry.len(),
            });
        }

        info!(count = expired.len(), "found proxies past retention");

        let recent = match self.transport.recent(self.settings.sweep_lookback).await {
            Ok(messages) => messages,
            Err(e) => {
                warn!(error = %e, "could not enumerate published payloads, retiring registry entries anyway");
                Vec::new()
            }
        };

        let mut deleted = 0;
        for link in &expired {
            let Some(message) = recent.iter().find(|m| m.text.contains(link.as_str())) else {
                debug!(link = %link.short(), "no published payload found in lookback window");
                continue;
            };

            match self.transport.delete(&message.handle).await {
                Ok(()) => {
                    deleted += 1;
                    info!(link = %link.short(), "deleted expired proxy payload");
                }
                Err(e) => {
                    warn!(link = %link.short(), error = %e, "delete failed, retiring registry entry anyway");
                }
            }
        }

        let (_, remaining) = self.store.remove_registered(&expired).await?;

        info!(
            candidates = expired.len(),
            deleted, remaining, "expiry sweep finished"
        );

        Ok(SweepReport {
            candidates: expired.len(),
            deleted,
            remaining,
        })
    }
}
