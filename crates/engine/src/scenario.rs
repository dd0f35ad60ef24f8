//! YAML scenario loader.
//!
//! A scenario file describes brands, campaigns, dayparting windows, and
//! optional ledger history, and seeds a fresh in-memory store from them.
//! Used by the worker for demo runs and by the CLI's `init` command.

use std::fs;
use std::path::Path;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Deserialize;

use adgate_core::{Brand, Campaign, DaypartWindow, SpendRecord, ValidationError};

use crate::store::memory::MemoryStore;
use crate::store::{BrandTx, CampaignStore, StoreError};

// ── Error type ──────────────────────────────────────────────────────

#[derive(Debug, thiserror::Error)]
pub enum ScenarioError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML parse error: {0}")]
    Parse(#[from] serde_yaml::Error),

    #[error("validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("store error: {0}")]
    Store(#[from] StoreError),
}

// ── Schema ──────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct Scenario {
    pub name: String,
    pub brands: Vec<BrandSeed>,
}

#[derive(Debug, Deserialize)]
pub struct BrandSeed {
    pub name: String,
    pub daily_budget: Decimal,
    pub monthly_budget: Decimal,
    #[serde(default)]
    pub campaigns: Vec<CampaignSeed>,
}

#[derive(Debug, Deserialize)]
pub struct CampaignSeed {
    pub name: String,
    /// Seed state; the first sweep recomputes it either way.
    #[serde(default)]
    pub active: bool,
    #[serde(default)]
    pub windows: Vec<WindowSeed>,
    #[serde(default)]
    pub spend: Vec<SpendSeed>,
}

#[derive(Debug, Clone, Copy, Deserialize)]
pub struct WindowSeed {
    /// 0 = Monday through 6 = Sunday.
    pub day: u8,
    pub start: u8,
    pub end: u8,
}

#[derive(Debug, Deserialize)]
pub struct SpendSeed {
    pub amount: Decimal,
    pub at: DateTime<Utc>,
}

// ── Loading ─────────────────────────────────────────────────────────

/// Read and parse a scenario file.
pub fn from_path(path: &Path) -> Result<Scenario, ScenarioError> {
    let text = fs::read_to_string(path)?;
    let scenario: Scenario = serde_yaml::from_str(&text)?;
    Ok(scenario)
}

/// Seed a fresh store from a parsed scenario.
///
/// Every domain validation applies: budgets must be positive, windows
/// well-formed, spend amounts positive. Ledger history is appended
/// through a normal brand transaction.
pub fn build_store(scenario: &Scenario) -> Result<MemoryStore, ScenarioError> {
    let store = MemoryStore::new();
    let mut campaign_count = 0;

    for brand_seed in &scenario.brands {
        let brand = Brand::new(
            brand_seed.name.clone(),
            brand_seed.daily_budget,
            brand_seed.monthly_budget,
        )?;
        let brand_id = brand.id;
        store.insert_brand(brand)?;

        let mut history: Vec<SpendRecord> = Vec::new();
        for campaign_seed in &brand_seed.campaigns {
            let mut campaign = Campaign::new(brand_id, campaign_seed.name.clone());
            for window in &campaign_seed.windows {
                campaign.add_window(DaypartWindow::new(window.day, window.start, window.end)?)?;
            }
            let campaign_id = campaign.id;
            store.insert_campaign(campaign)?;
            if campaign_seed.active {
                store.set_active(campaign_id, true)?;
            }
            for spend in &campaign_seed.spend {
                history.push(SpendRecord::new(campaign_id, spend.amount, spend.at)?);
            }
            campaign_count += 1;
        }

        if !history.is_empty() {
            let mut tx = store.begin_brand(brand_id)?;
            for record in history {
                tx.append_spend(record);
            }
            tx.commit()?;
        }
    }

    tracing::info!(
        scenario = %scenario.name,
        brands = scenario.brands.len(),
        campaigns = campaign_count,
        "scenario loaded"
    );
    Ok(store)
}
