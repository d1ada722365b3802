//! Time-driven scheduling for the lifecycle.
//!
//! The hourly cycle fires on absolute top-of-hour boundaries: each
//! iteration recomputes the next boundary from the wall clock and sleeps
//! until it, so slow cycles delay nothing past the boundary they already
//! crossed and no drift accumulates. The expiry sweep piggybacks on the
//! boundary whose local hour matches `sweep_hour`.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use chrono::{DateTime, Local, Timelike};
use tokio::time::sleep;
use tracing::{error, info, warn};

use crate::adapters::TelegramClient;
use crate::config::SourceList;

use super::lifecycle::Lifecycle;

/// Local hour at which the daily expiry sweep runs.
pub const DEFAULT_SWEEP_HOUR: u32 = 3;

/// Back-off after a failed update poll.
const POLL_RETRY_DELAY: Duration = Duration::from_secs(5);

/// Next top-of-hour strictly after `now`.
///
/// Falls back to `now + 1h` if the truncated time does not exist locally
/// (DST gap).
pub fn next_hour_boundary(now: DateTime<Local>) -> DateTime<Local> {
    let next = now + chrono::Duration::hours(1);
    next.with_minute(0)
        .and_then(|t| t.with_second(0))
        .and_then(|t| t.with_nanosecond(0))
        .unwrap_or(next)
}

/// Periodic driver for the hourly cycle and the daily sweep.
pub struct Scheduler {
    lifecycle: Arc<Lifecycle>,
    sweep_hour: u32,
}

impl Scheduler {
    pub fn new(lifecycle: Arc<Lifecycle>) -> Self {
        Self {
            lifecycle,
            sweep_hour: DEFAULT_SWEEP_HOUR,
        }
    }

    pub fn with_sweep_hour(mut self, sweep_hour: u32) -> Self {
        self.sweep_hour = sweep_hour;
        self
    }

    /// Run cycles forever. Only process termination stops the loop;
    /// a failed cycle or sweep is logged and the next boundary still fires.
    pub async fn run(&self) -> Result<()> {
        loop {
            let now = Local::now();
            let next = next_hour_boundary(now);
            let wait = (next - now).to_std().unwrap_or_default();

            info!(next = %next.format("%H:%M"), "next cycle scheduled");
            sleep(wait).await;

            let fired_at = Local::now();

            if let Err(e) = self.lifecycle.run_cycle().await {
                error!(error = %e, "hourly cycle failed");
            }

            if fired_at.hour() == self.sweep_hour {
                if let Err(e) = self.lifecycle.sweep_expired().await {
                    error!(error = %e, "expiry sweep failed");
                }
            }
        }
    }
}

/// Long-poll the transport for new posts and feed them into ingestion.
///
/// Posts from sources outside the allow-list are dropped. Poll faults are
/// logged and retried after a short back-off; the loop never exits.
pub async fn run_ingest_loop(
    lifecycle: Arc<Lifecycle>,
    client: Arc<TelegramClient>,
    sources: SourceList,
) -> Result<()> {
    info!(sources = sources.len(), "monitoring source channels");

    let mut offset = 0i64;
    loop {
        match client.poll_posts(&mut offset, 30).await {
            Ok(posts) => {
                for post in posts {
                    if !sources.contains(&post.source) {
                        continue;
                    }
                    if let Err(e) = lifecycle.ingest_text(&post.source, &post.text).await {
                        warn!(source = %post.source, error = %e, "failed to ingest message");
                    }
                }
            }
            Err(e) => {
                warn!(error = %e, "update poll failed, retrying");
                sleep(POLL_RETRY_DELAY).await;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_next_hour_boundary_is_aligned() {
        let now = Local.with_ymd_and_hms(2024, 5, 10, 14, 37, 21).unwrap();
        let next = next_hour_boundary(now);

        assert_eq!(next.minute(), 0);
        assert_eq!(next.second(), 0);
        assert_eq!(next.hour(), 15);
    }

    #[test]
    fn test_next_hour_boundary_from_exact_hour() {
        let now = Local.with_ymd_and_hms(2024, 5, 10, 14, 0, 0).unwrap();
        let next = next_hour_boundary(now);

        // Always strictly in the future, never "now" again
        assert_eq!(next.hour(), 15);
        assert!(next > now);
    }

    #[test]
    fn test_next_hour_boundary_at_most_one_hour_ahead() {
        let now = Local.with_ymd_and_hms(2024, 5, 10, 23, 59, 59).unwrap();
        let next = next_hour_boundary(now);

        assert!(next > now);
        assert!(next - now <= chrono::Duration::hours(1));
        assert_eq!(next.hour(), 0);
    }
}
