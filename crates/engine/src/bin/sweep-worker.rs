//! sweep-worker — scheduled campaign reconciliation daemon.
//!
//! Seeds an in-memory store (optionally from a YAML scenario) and drives:
//! - budget sweeps (default every five minutes)
//! - dayparting sweeps (default on the hour)
//! - daily and monthly reset sweeps at their calendar boundaries
//! - an optional random-traffic simulator
//!
//! Every campaign state flip is logged as a structured tracing event.
//! Shuts down cleanly on ctrl-c.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use chrono::Utc;
use clap::Parser;
use tokio::sync::Notify;
use tracing::{info, warn};

use adgate_core::config::{load_dotenv, Config};
use adgate_engine::beat::SweepTimetable;
use adgate_engine::events::LogSink;
use adgate_engine::runner::run_sweep_loop;
use adgate_engine::scenario;
use adgate_engine::sim::run_sim_loop;
use adgate_engine::{MemoryStore, Reconciler};

// ── CLI ─────────────────────────────────────────────────────────────

/// Campaign status reconciliation worker.
#[derive(Parser, Debug)]
#[command(name = "sweep-worker", version, about)]
struct Cli {
    /// Path to a YAML scenario file to seed the store from.
    #[arg(long, env = "ADGATE_SCENARIO")]
    scenario: Option<PathBuf>,

    /// Generate random spend traffic against active campaigns.
    #[arg(long, env = "ADGATE_SIMULATE", default_value_t = false)]
    simulate: bool,

    /// Shutdown grace period in seconds.
    #[arg(long, env = "ADGATE_SHUTDOWN_TIMEOUT", default_value_t = 10)]
    shutdown_timeout: u64,
}

// ── main ────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    load_dotenv();
    let cli = Cli::parse();
    let config = Config::from_env();
    config.log_summary();

    // Seeding takes brand locks with blocking acquires, so it runs off
    // the async runtime.
    let store = match cli.scenario.clone() {
        Some(path) => {
            info!(path = %path.display(), "seeding store from scenario");
            tokio::task::spawn_blocking(move || {
                let scenario = scenario::from_path(&path)?;
                scenario::build_store(&scenario)
            })
            .await
            .context("scenario load task panicked")??
        }
        None => {
            info!("starting with an empty store");
            MemoryStore::new()
        }
    };

    let reconciler = Arc::new(Reconciler::new(Arc::new(store), Arc::new(LogSink)));
    let timetable = SweepTimetable::new(&config.sweeps, Utc::now())?;
    let shutdown = Arc::new(Notify::new());

    let sweep_handle = tokio::spawn(run_sweep_loop(
        reconciler.clone(),
        timetable,
        config.runner.clone(),
        shutdown.clone(),
    ));
    let sim_handle = cli.simulate.then(|| {
        tokio::spawn(run_sim_loop(
            reconciler.clone(),
            config.sim.clone(),
            shutdown.clone(),
        ))
    });

    info!("sweep-worker running, ctrl-c to stop");
    tokio::signal::ctrl_c()
        .await
        .context("failed to listen for ctrl-c")?;
    info!("shutdown signal received");
    shutdown.notify_waiters();

    let drain = async {
        sweep_handle.await.ok();
        if let Some(handle) = sim_handle {
            handle.await.ok();
        }
    };
    if tokio::time::timeout(Duration::from_secs(cli.shutdown_timeout), drain)
        .await
        .is_err()
    {
        warn!("loops did not stop within the grace period");
    }

    info!("sweep-worker exited cleanly");
    Ok(())
}
