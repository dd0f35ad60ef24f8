use std::path::PathBuf;

use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand, ValueEnum};
use rust_decimal::Decimal;

use adgate_engine::beat::SweepKind;

/// Campaign budget and dayparting administration for adgate.
///
/// Operates on a JSON state file: every command loads it, runs against an
/// in-memory store, and writes the result back. Pass --at to evaluate at a
/// simulated instant instead of the wall clock.
#[derive(Parser, Debug)]
#[command(name = "adgate", version, about = "Campaign status reconciliation CLI")]
pub struct CliArgs {
    /// Path to the JSON state file.
    #[arg(long, env = "ADGATE_STATE", default_value = "adgate-state.json")]
    pub state: PathBuf,

    /// Evaluate at this RFC 3339 instant instead of now.
    #[arg(long, global = true)]
    pub at: Option<DateTime<Utc>>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Create the state file from a YAML scenario.
    Init {
        /// Scenario file to seed from.
        #[arg(long)]
        scenario: PathBuf,

        /// Overwrite an existing state file.
        #[arg(long, default_value_t = false)]
        force: bool,
    },

    /// Show brands, spend totals, and campaign states.
    Status,

    /// Record a spend amount against a campaign.
    Spend {
        /// Campaign name or id.
        campaign: String,

        /// Amount to record (must be positive).
        amount: Decimal,
    },

    /// Run one reconciliation sweep.
    Sweep {
        #[arg(value_enum)]
        kind: SweepArg,
    },

    /// Run rounds of random spend traffic against active campaigns.
    Traffic {
        /// Number of rounds.
        #[arg(long, default_value_t = 1)]
        rounds: u32,

        /// Smallest amount per hit.
        #[arg(long, default_value = "1")]
        min: Decimal,

        /// Largest amount per hit.
        #[arg(long, default_value = "50")]
        max: Decimal,
    },

    /// Show recent campaign state changes, newest first.
    Journal {
        /// Maximum records to show.
        #[arg(long, default_value_t = 20)]
        limit: usize,

        /// Only changes for this campaign (name or id).
        #[arg(long)]
        campaign: Option<String>,

        /// Only changes for this brand (name or id).
        #[arg(long)]
        brand: Option<String>,
    },
}

#[derive(ValueEnum, Clone, Copy, Debug)]
pub enum SweepArg {
    Budget,
    Dayparting,
    DailyReset,
    MonthlyReset,
}

impl From<SweepArg> for SweepKind {
    fn from(arg: SweepArg) -> Self {
        match arg {
            SweepArg::Budget => SweepKind::Budget,
            SweepArg::Dayparting => SweepKind::Dayparting,
            SweepArg::DailyReset => SweepKind::DailyReset,
            SweepArg::MonthlyReset => SweepKind::MonthlyReset,
        }
    }
}
