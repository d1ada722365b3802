//! proxywatch - MTProto proxy-link scraper and lifecycle manager
//!
//! Watches a set of Telegram channels for `tg://proxy?...` links,
//! deduplicates and batches them, verifies reachability once an hour,
//! republishes the working ones to a single target channel, and retires
//! published links after a 24-hour retention window.
//!
//! # Architecture
//!
//! - Incoming posts flow through the extractor into a persisted pending
//!   queue, deduplicated against both the queue and the published registry
//! - An hourly cycle drains the queue, probes each link over TCP, and
//!   publishes the reachable ones that are not yet registered
//! - A daily sweep deletes published payloads older than the retention
//!   window and drops them from the registry
//!
//! All state-file mutations serialize behind one store-level mutex, so the
//! ingest handler and the periodic cycle cannot clobber each other.
//!
//! # Modules
//!
//! - `adapters`: Telegram transport (Bot API)
//! - `core`: Store, prober, lifecycle orchestrator, scheduler
//! - `domain`: ProxyLink type and extraction
//! - `cli`: Command-line interface
//!
//! # Usage
//!
//! ```bash
//! # Run the daemon
//! proxywatch run --bot-token $TELEGRAM_BOT_TOKEN --target-channel -100123456
//!
//! # Inspect persisted state
//! proxywatch status
//!
//! # Probe one link by hand
//! proxywatch check 'tg://proxy?server=1.2.3.4&port=443&secret=dd...'
//! ```

pub mod adapters;
pub mod cli;
pub mod config;
pub mod core;
pub mod domain;

// Re-export main types at crate root for convenience
pub use adapters::{MessageHandle, PublishedMessage, TelegramClient, Transport};
pub use config::SourceList;
pub use core::{
    CycleReport, Lifecycle, LifecycleSettings, ProbeOutcome, Prober, Scheduler, Store,
    SweepReport, TcpProber,
};
pub use domain::{extract_proxy_links, ProxyLink};
