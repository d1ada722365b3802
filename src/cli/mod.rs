//! Command-line interface for proxywatch.
//!
//! Provides commands for running the monitoring daemon, inspecting the
//! persisted state, and probing a single link by hand.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::info;

use crate::adapters::TelegramClient;
use crate::config::{self, SourceList, CHANNELS_FILE};
use crate::core::{
    run_ingest_loop, Lifecycle, LifecycleSettings, ProbeOutcome, Prober, Scheduler, Store,
    TcpProber, DEFAULT_SWEEP_HOUR,
};
use crate::domain::ProxyLink;

/// proxywatch - MTProto proxy-link scraper and lifecycle manager
#[derive(Parser, Debug)]
#[command(name = "proxywatch")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the monitoring daemon (ingest loop + hourly scheduler)
    Run {
        /// Telegram bot token
        #[arg(long, env = "TELEGRAM_BOT_TOKEN")]
        bot_token: String,

        /// Target channel chat id (e.g. -1001234567890)
        #[arg(long, env = "TARGET_CHANNEL", allow_negative_numbers = true)]
        target_channel: String,

        /// Allow-list file of source channels (defaults to <state dir>/channels.txt)
        #[arg(long)]
        channels: Option<PathBuf>,

        /// State directory (defaults to ~/.proxywatch)
        #[arg(long, env = "PROXYWATCH_HOME")]
        state_dir: Option<PathBuf>,

        /// Local hour of the daily expiry sweep
        #[arg(long, default_value_t = DEFAULT_SWEEP_HOUR, value_parser = clap::value_parser!(u32).range(0..=23))]
        sweep_hour: u32,
    },

    /// Show pending queue and registry counts
    Status {
        /// State directory (defaults to ~/.proxywatch)
        #[arg(long, env = "PROXYWATCH_HOME")]
        state_dir: Option<PathBuf>,
    },

    /// Probe a single proxy link and report the outcome
    Check {
        /// The tg://proxy?... link to probe
        link: String,
    },
}

impl Cli {
    /// Execute the parsed command
    pub async fn execute(self) -> Result<()> {
        match self.command {
            Commands::Run {
                bot_token,
                target_channel,
                channels,
                state_dir,
                sweep_hour,
            } => execute_run(bot_token, target_channel, channels, state_dir, sweep_hour).await,
            Commands::Status { state_dir } => execute_status(state_dir).await,
            Commands::Check { link } => execute_check(link).await,
        }
    }
}

fn resolve_state_dir(state_dir: Option<PathBuf>) -> Result<PathBuf> {
    match state_dir {
        Some(dir) => Ok(dir),
        None => config::proxywatch_home(),
    }
}

async fn execute_run(
    bot_token: String,
    target_channel: String,
    channels: Option<PathBuf>,
    state_dir: Option<PathBuf>,
    sweep_hour: u32,
) -> Result<()> {
    let state_dir = resolve_state_dir(state_dir)?;
    let channels_path = channels.unwrap_or_else(|| state_dir.join(CHANNELS_FILE));

    // No sources configured is fatal: there is nothing to monitor
    let sources = SourceList::load(&channels_path)
        .with_context(|| format!("Cannot start without source channels ({})", channels_path.display()))?;

    let store = Arc::new(Store::open(&state_dir).await?);

    let pending = store.pending().await.len();
    let registered = store.registry().await.len();
    info!(
        state_dir = %state_dir.display(),
        pending,
        registered,
        sources = sources.len(),
        "starting proxywatch"
    );

    let client = Arc::new(TelegramClient::new(bot_token, target_channel));
    let lifecycle = Arc::new(Lifecycle::new(
        store,
        Arc::new(TcpProber::default()),
        client.clone(),
        LifecycleSettings::default(),
    ));

    let scheduler = Scheduler::new(lifecycle.clone()).with_sweep_hour(sweep_hour);

    tokio::select! {
        result = scheduler.run() => result,
        result = run_ingest_loop(lifecycle, client, sources) => result,
    }
}

async fn execute_status(state_dir: Option<PathBuf>) -> Result<()> {
    let state_dir = resolve_state_dir(state_dir)?;
    let store = Store::open(&state_dir).await?;

    let pending = store.pending().await;
    let registry = store.registry().await;

    println!();
    println!("Proxywatch State");
    println!("══════════════════════════════════════════════════════════════");
    println!();
    println!("State dir:   {}", state_dir.display());
    println!("Pending:     {} proxies awaiting validation", pending.len());
    println!("Registered:  {} proxies published", registry.len());
    println!();

    if let Some((link, published_at)) = registry.iter().max_by_key(|(_, ts)| **ts) {
        println!(
            "Most recent: {} ({})",
            link.short(),
            published_at.format("%Y-%m-%d %H:%M:%S UTC")
        );
        println!();
    }

    Ok(())
}

async fn execute_check(link: String) -> Result<()> {
    let link = ProxyLink::new(link);

    if let Some((host, port)) = link.endpoint() {
        let secret_len = link.secret().map(|s| s.len()).unwrap_or(0);
        println!("Endpoint: {}:{} (secret: {} hex chars)", host, port, secret_len);
    }

    let prober = TcpProber::default();

    match prober.probe(&link).await {
        ProbeOutcome::Reachable => println!("✅ reachable: {}", link),
        ProbeOutcome::Unreachable(reason) => println!("❌ unreachable: {} ({})", link, reason),
        ProbeOutcome::Malformed => println!("⚠️  malformed link: {}", link),
    }

    Ok(())
}
