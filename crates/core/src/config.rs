use std::env;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Load .env file (silently ignores if missing).
pub fn load_dotenv() {
    dotenvy::dotenv().ok();
}

fn env_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

fn env_opt(key: &str) -> Option<String> {
    env::var(key).ok().filter(|s| !s.is_empty())
}

fn env_u32(key: &str, default: u32) -> u32 {
    env_opt(key).and_then(|v| v.parse().ok()).unwrap_or(default)
}

fn env_u64(key: &str, default: u64) -> u64 {
    env_opt(key).and_then(|v| v.parse().ok()).unwrap_or(default)
}

fn env_usize(key: &str, default: usize) -> usize {
    env_opt(key).and_then(|v| v.parse().ok()).unwrap_or(default)
}

fn env_decimal(key: &str, default: Decimal) -> Decimal {
    env_opt(key).and_then(|v| v.parse().ok()).unwrap_or(default)
}

// ── Top-level config ──────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub sweeps: SweepConfig,
    pub runner: RunnerConfig,
    pub journal: JournalConfig,
    pub sim: SimConfig,
}

impl Config {
    /// Build config from environment variables (call `load_dotenv()` first).
    pub fn from_env() -> Self {
        Self {
            sweeps: SweepConfig::from_env(),
            runner: RunnerConfig::from_env(),
            journal: JournalConfig::from_env(),
            sim: SimConfig::from_env(),
        }
    }

    /// Print a summary for startup logs.
    pub fn log_summary(&self) {
        tracing::info!("Config loaded:");
        tracing::info!(
            "  sweeps:  budget=\"{}\", dayparting=\"{}\", daily_reset=\"{}\", monthly_reset=\"{}\"",
            self.sweeps.budget_cron,
            self.sweeps.dayparting_cron,
            self.sweeps.daily_reset_cron,
            self.sweeps.monthly_reset_cron,
        );
        tracing::info!(
            "  runner:  tick={}s, retries={}, backoff={}ms",
            self.runner.tick_interval_secs,
            self.runner.retry_attempts,
            self.runner.retry_backoff_ms,
        );
        tracing::info!("  journal: capacity={}", self.journal.capacity);
        tracing::info!(
            "  sim:     interval={}s, amount={}..{}",
            self.sim.interval_secs,
            self.sim.min_amount,
            self.sim.max_amount,
        );
    }
}

// ── Sweep cadences ────────────────────────────────────────────

/// Cron expressions (standard 5-field) for the four scheduled sweeps.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SweepConfig {
    /// Budget safety sweep. Default: every 5 minutes.
    pub budget_cron: String,
    /// Dayparting sweep. Default: hourly, on the hour.
    pub dayparting_cron: String,
    /// Daily reset. Default: midnight.
    pub daily_reset_cron: String,
    /// Monthly reset. Default: midnight on the 1st.
    pub monthly_reset_cron: String,
}

impl SweepConfig {
    fn from_env() -> Self {
        Self {
            budget_cron: env_or("ADGATE_BUDGET_SWEEP_CRON", "*/5 * * * *"),
            dayparting_cron: env_or("ADGATE_DAYPARTING_SWEEP_CRON", "0 * * * *"),
            daily_reset_cron: env_or("ADGATE_DAILY_RESET_CRON", "0 0 * * *"),
            monthly_reset_cron: env_or("ADGATE_MONTHLY_RESET_CRON", "0 0 1 * *"),
        }
    }
}

// ── Worker loop ───────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunnerConfig {
    /// Seconds between timetable checks.
    pub tick_interval_secs: u64,
    /// Retries per sweep for brands that failed transiently.
    pub retry_attempts: u32,
    /// Pause between retries.
    pub retry_backoff_ms: u64,
}

impl RunnerConfig {
    fn from_env() -> Self {
        Self {
            tick_interval_secs: env_u64("ADGATE_TICK_INTERVAL_SECS", 30),
            retry_attempts: env_u32("ADGATE_RETRY_ATTEMPTS", 3),
            retry_backoff_ms: env_u64("ADGATE_RETRY_BACKOFF_MS", 250),
        }
    }
}

// ── Change journal ────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JournalConfig {
    /// Maximum retained change records (FIFO eviction beyond this).
    pub capacity: usize,
}

impl JournalConfig {
    fn from_env() -> Self {
        Self {
            capacity: env_usize("ADGATE_JOURNAL_CAPACITY", 500),
        }
    }
}

// ── Spend simulator ───────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimConfig {
    /// Seconds between traffic rounds.
    pub interval_secs: u64,
    /// Smallest simulated spend per hit.
    pub min_amount: Decimal,
    /// Largest simulated spend per hit.
    pub max_amount: Decimal,
}

impl SimConfig {
    fn from_env() -> Self {
        Self {
            interval_secs: env_u64("ADGATE_SIM_INTERVAL_SECS", 60),
            min_amount: env_decimal("ADGATE_SIM_MIN_AMOUNT", Decimal::ONE),
            max_amount: env_decimal("ADGATE_SIM_MAX_AMOUNT", Decimal::from(50)),
        }
    }
}
