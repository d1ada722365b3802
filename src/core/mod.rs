//! Core lifecycle logic.
//!
//! This module contains:
//! - Store: durable pending queue + published registry
//! - Prober: reachability probing
//! - Lifecycle: ingestion, hourly cycle, expiry sweep
//! - Scheduler: absolute-boundary periodic driver

pub mod lifecycle;
pub mod probe;
pub mod scheduler;
pub mod store;

// Re-export commonly used types
pub use lifecycle::{CycleReport, Lifecycle, LifecycleSettings, SweepReport};
pub use probe::{ProbeOutcome, Prober, TcpProber, DEFAULT_PROBE_TIMEOUT};
pub use scheduler::{next_hour_boundary, run_ingest_loop, Scheduler, DEFAULT_SWEEP_HOUR};
pub use store::{Registry, Store, StoreError, PENDING_FILE, REGISTRY_FILE};
