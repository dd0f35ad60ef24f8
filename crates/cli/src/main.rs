mod cli;
mod state;

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use chrono::{DateTime, Utc};
use clap::Parser;
use rust_decimal::Decimal;
use uuid::Uuid;

use adgate_core::config::{load_dotenv, Config, SimConfig};
use adgate_core::{BrandId, CampaignId};
use adgate_engine::beat::SweepKind;
use adgate_engine::decision::{budget_ok, BudgetScope};
use adgate_engine::events::{ChangeJournal, JournalQuery};
use adgate_engine::ledger::SpendTotals;
use adgate_engine::runner::dispatch;
use adgate_engine::scenario;
use adgate_engine::sim;
use adgate_engine::store::memory::StoreSnapshot;
use adgate_engine::store::CampaignStore;
use adgate_engine::{MemoryStore, Reconciler};

use crate::cli::{CliArgs, Command};
use crate::state::StateFile;

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_target(false)
        .init();

    load_dotenv();
    let args = CliArgs::parse();
    let config = Config::from_env();
    let now = args.at.unwrap_or_else(Utc::now);

    // Init is the one command that starts without a state file.
    if let Command::Init { scenario, force } = &args.command {
        return init(&args.state, scenario, *force);
    }

    let file = state::load(&args.state)?;
    let store = Arc::new(MemoryStore::from_snapshot(file.snapshot)?);
    let journal = Arc::new(ChangeJournal::with_records(
        config.journal.capacity,
        file.journal,
    ));
    let rec = Reconciler::new(store, journal.clone());

    match args.command {
        Command::Init { .. } => unreachable!("handled above"),
        Command::Status => status(&rec, now)?,
        Command::Spend { campaign, amount } => spend(&rec, &campaign, amount, now)?,
        Command::Sweep { kind } => sweep(&rec, kind.into(), now)?,
        Command::Traffic { rounds, min, max } => traffic(&rec, rounds, min, max, now)?,
        Command::Journal {
            limit,
            campaign,
            brand,
        } => show_journal(&rec, &journal, limit, campaign.as_deref(), brand.as_deref())?,
    }

    state::save(
        &args.state,
        &StateFile {
            snapshot: rec.store().snapshot(),
            journal: journal.export(),
        },
    )
}

// ── Commands ────────────────────────────────────────────────────────

fn init(state_path: &Path, scenario_path: &Path, force: bool) -> Result<()> {
    if state_path.exists() && !force {
        bail!(
            "{} already exists (pass --force to overwrite)",
            state_path.display()
        );
    }
    let scenario = scenario::from_path(scenario_path)
        .with_context(|| format!("failed to load {}", scenario_path.display()))?;
    let store = scenario::build_store(&scenario)?;
    let snapshot = store.snapshot();
    let brands = snapshot.brands.len();
    let campaigns: usize = snapshot.brands.iter().map(|b| b.campaigns.len()).sum();
    state::save(
        state_path,
        &StateFile {
            snapshot,
            journal: Vec::new(),
        },
    )?;
    println!(
        "initialized {} from scenario \"{}\": {} brands, {} campaigns",
        state_path.display(),
        scenario.name,
        brands,
        campaigns
    );
    Ok(())
}

fn status(rec: &Reconciler<MemoryStore>, now: DateTime<Utc>) -> Result<()> {
    let snapshot = rec.store().snapshot();
    if snapshot.brands.is_empty() {
        println!("no brands");
        return Ok(());
    }
    println!("status at {}", now.to_rfc3339());
    for entry in &snapshot.brands {
        let tx = rec.store().begin_brand(entry.brand.id)?;
        let totals = SpendTotals::for_brand(&tx, now)?;
        drop(tx);
        let flag = if budget_ok(&entry.brand, totals, BudgetScope::Full) {
            ""
        } else {
            "  OVER BUDGET"
        };
        println!(
            "\n{}  daily {}/{}  monthly {}/{}{}",
            entry.brand.name,
            totals.daily,
            entry.brand.daily_budget,
            totals.monthly,
            entry.brand.monthly_budget,
            flag
        );
        for campaign in &entry.campaigns {
            let windows = match campaign.windows.len() {
                0 => "no windows".to_string(),
                1 => "1 window".to_string(),
                n => format!("{n} windows"),
            };
            println!(
                "  {:<24} {:<9} {}",
                campaign.name,
                state_str(campaign.is_active),
                windows
            );
        }
    }
    Ok(())
}

fn spend(
    rec: &Reconciler<MemoryStore>,
    query: &str,
    amount: Decimal,
    now: DateTime<Utc>,
) -> Result<()> {
    let snapshot = rec.store().snapshot();
    let campaign_id = resolve_campaign(&snapshot, query)?;
    let outcome = rec.record_spend(campaign_id, amount, now)?;
    println!(
        "recorded {} against {} (brand daily {}, monthly {})",
        amount, query, outcome.totals.daily, outcome.totals.monthly
    );
    let names = campaign_names(&snapshot);
    for change in &outcome.changes {
        println!(
            "  deactivated {} ({})",
            display_name(&names, change.campaign_id),
            change.reason
        );
    }
    Ok(())
}

fn sweep(rec: &Reconciler<MemoryStore>, kind: SweepKind, now: DateTime<Utc>) -> Result<()> {
    let report = dispatch(rec, kind, now)?;
    println!(
        "{} sweep at {}: {} brands, {} changes",
        kind,
        now.to_rfc3339(),
        report.brands_seen,
        report.changes.len()
    );
    let names = campaign_names(&rec.store().snapshot());
    for change in &report.changes {
        println!(
            "  {} {} -> {} ({})",
            display_name(&names, change.campaign_id),
            state_str(change.old_state),
            state_str(change.new_state),
            change.reason
        );
    }
    for failure in &report.failures {
        println!("  brand {} failed: {}", failure.brand_id, failure.error);
    }
    Ok(())
}

fn traffic(
    rec: &Reconciler<MemoryStore>,
    rounds: u32,
    min: Decimal,
    max: Decimal,
    now: DateTime<Utc>,
) -> Result<()> {
    if min <= Decimal::ZERO || max < min {
        bail!("amount range must satisfy 0 < min <= max, got {min}..{max}");
    }
    let config = SimConfig {
        interval_secs: 0,
        min_amount: min,
        max_amount: max,
    };
    for round in 1..=rounds {
        let summary = sim::run_round(rec, &config, now)?;
        println!(
            "round {round}: {} candidates, {} recorded, {} deactivated",
            summary.candidates, summary.recorded, summary.deactivated
        );
    }
    Ok(())
}

fn show_journal(
    rec: &Reconciler<MemoryStore>,
    journal: &ChangeJournal,
    limit: usize,
    campaign: Option<&str>,
    brand: Option<&str>,
) -> Result<()> {
    let snapshot = rec.store().snapshot();
    let campaign_id = campaign
        .map(|query| resolve_campaign(&snapshot, query))
        .transpose()?;
    let brand_id = brand
        .map(|query| resolve_brand(&snapshot, query))
        .transpose()?;
    let records = journal.query(&JournalQuery {
        campaign_id,
        brand_id,
        limit: Some(limit),
        ..JournalQuery::default()
    });
    if records.is_empty() {
        println!("no changes recorded");
        return Ok(());
    }
    let names = campaign_names(&snapshot);
    for record in records {
        println!(
            "{}  {:<16} {:<24} {} -> {}  {}",
            record.at.to_rfc3339(),
            record.trigger.to_string(),
            display_name(&names, record.campaign_id),
            state_str(record.old_state),
            state_str(record.new_state),
            record.reason
        );
    }
    Ok(())
}

// ── Helpers ─────────────────────────────────────────────────────────

fn state_str(active: bool) -> &'static str {
    if active {
        "active"
    } else {
        "inactive"
    }
}

/// Resolve a campaign argument: a UUID is taken as-is, anything else is
/// matched against campaign names across all brands.
fn resolve_campaign(snapshot: &StoreSnapshot, query: &str) -> Result<CampaignId> {
    if let Ok(id) = Uuid::parse_str(query) {
        return Ok(id);
    }
    let matches: Vec<CampaignId> = snapshot
        .brands
        .iter()
        .flat_map(|b| &b.campaigns)
        .filter(|c| c.name == query)
        .map(|c| c.id)
        .collect();
    match matches.as_slice() {
        [] => bail!("no campaign named \"{query}\""),
        [id] => Ok(*id),
        _ => bail!("campaign name \"{query}\" is ambiguous across brands, use its id"),
    }
}

/// Resolve a brand argument the same way: UUID as-is, otherwise by its
/// unique name.
fn resolve_brand(snapshot: &StoreSnapshot, query: &str) -> Result<BrandId> {
    if let Ok(id) = Uuid::parse_str(query) {
        return Ok(id);
    }
    snapshot
        .brands
        .iter()
        .find(|b| b.brand.name == query)
        .map(|b| b.brand.id)
        .ok_or_else(|| anyhow::anyhow!("no brand named \"{query}\""))
}

fn campaign_names(snapshot: &StoreSnapshot) -> HashMap<CampaignId, String> {
    snapshot
        .brands
        .iter()
        .flat_map(|b| &b.campaigns)
        .map(|c| (c.id, c.name.clone()))
        .collect()
}

fn display_name(names: &HashMap<CampaignId, String>, id: CampaignId) -> String {
    names.get(&id).cloned().unwrap_or_else(|| id.to_string())
}

// ── Tests ───────────────────────────────────────────────────────────
