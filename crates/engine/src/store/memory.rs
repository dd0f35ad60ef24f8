//! In-memory [`CampaignStore`] backing the worker, the CLI, and tests.
//!
//! Brand topology (which brands exist, name and campaign indexes) lives
//! under an `RwLock`; each brand's mutable state sits behind its own
//! `tokio::sync::Mutex` so a [`BrandTx`] can hold the lock as an owned
//! guard for the whole read-decide-write. Lock order is always directory
//! first, brand second, and the directory lock is released before a brand
//! lock is taken on the transaction path.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tokio::sync::{Mutex, OwnedMutexGuard};

use adgate_core::{
    Brand, BrandId, Campaign, CampaignId, DaypartWindow, SpendRecord, TimeWindow,
};

use crate::error::EngineError;
use crate::store::{BrandTx, CampaignStore, StatusWrite, StoreError};

// ── Brand state ─────────────────────────────────────────────────────

#[derive(Debug, Clone)]
struct BrandState {
    brand: Brand,
    campaigns: Vec<Campaign>,
    spend: Vec<SpendRecord>,
}

#[derive(Debug)]
struct Directory {
    brands: HashMap<BrandId, Arc<Mutex<BrandState>>>,
    name_index: HashMap<String, BrandId>,
    campaign_index: HashMap<CampaignId, BrandId>,
}

// ── Store ───────────────────────────────────────────────────────────

#[derive(Debug)]
pub struct MemoryStore {
    dir: RwLock<Directory>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            dir: RwLock::new(Directory {
                brands: HashMap::new(),
                name_index: HashMap::new(),
                campaign_index: HashMap::new(),
            }),
        }
    }

    // ── Administrative surface ──────────────────────────────────

    /// Register a brand. Names are unique across the store.
    pub fn insert_brand(&self, brand: Brand) -> Result<(), StoreError> {
        let mut dir = self.dir.write().expect("store directory lock poisoned");
        if dir.name_index.contains_key(&brand.name) {
            return Err(StoreError::BrandNameTaken(brand.name));
        }
        dir.name_index.insert(brand.name.clone(), brand.id);
        dir.brands.insert(
            brand.id,
            Arc::new(Mutex::new(BrandState {
                brand,
                campaigns: Vec::new(),
                spend: Vec::new(),
            })),
        );
        Ok(())
    }

    /// Register a campaign under its owning brand.
    pub fn insert_campaign(&self, campaign: Campaign) -> Result<(), StoreError> {
        let mut dir = self.dir.write().expect("store directory lock poisoned");
        let state = dir
            .brands
            .get(&campaign.brand_id)
            .cloned()
            .ok_or(StoreError::UnknownBrand(campaign.brand_id))?;
        dir.campaign_index.insert(campaign.id, campaign.brand_id);
        drop(dir);
        state.blocking_lock().campaigns.push(campaign);
        Ok(())
    }

    /// Add a dayparting window to an existing campaign.
    pub fn add_window(
        &self,
        campaign_id: CampaignId,
        window: DaypartWindow,
    ) -> Result<(), EngineError> {
        let state = self.brand_state_of(campaign_id)?;
        let mut guard = state.blocking_lock();
        let campaign = guard
            .campaigns
            .iter_mut()
            .find(|c| c.id == campaign_id)
            .ok_or(StoreError::UnknownCampaign(campaign_id))?;
        campaign.add_window(window)?;
        Ok(())
    }

    /// Out-of-band activation override. Valid, but the next reconciliation
    /// pass recomputes the flag and may undo it.
    pub fn set_active(&self, campaign_id: CampaignId, active: bool) -> Result<(), StoreError> {
        let state = self.brand_state_of(campaign_id)?;
        let mut guard = state.blocking_lock();
        let campaign = guard
            .campaigns
            .iter_mut()
            .find(|c| c.id == campaign_id)
            .ok_or(StoreError::UnknownCampaign(campaign_id))?;
        campaign.is_active = active;
        Ok(())
    }

    /// Replace a brand's budget caps.
    pub fn update_budgets(
        &self,
        brand_id: BrandId,
        daily_budget: Decimal,
        monthly_budget: Decimal,
    ) -> Result<(), EngineError> {
        let state = self.brand_arc(brand_id)?;
        let mut guard = state.blocking_lock();
        guard.brand.set_budgets(daily_budget, monthly_budget)?;
        Ok(())
    }

    // ── Snapshots ───────────────────────────────────────────────

    /// Clone the full store contents, brands ordered by name.
    pub fn snapshot(&self) -> StoreSnapshot {
        let dir = self.dir.read().expect("store directory lock poisoned");
        let mut brands: Vec<BrandSnapshot> = dir
            .brands
            .values()
            .map(|state| {
                let guard = state.blocking_lock();
                BrandSnapshot {
                    brand: guard.brand.clone(),
                    campaigns: guard.campaigns.clone(),
                    spend: guard.spend.clone(),
                }
            })
            .collect();
        brands.sort_by(|a, b| a.brand.name.cmp(&b.brand.name));
        StoreSnapshot { brands }
    }

    /// Rebuild a store (and its indexes) from a snapshot.
    pub fn from_snapshot(snapshot: StoreSnapshot) -> Result<Self, StoreError> {
        let store = Self::new();
        {
            let mut dir = store.dir.write().expect("store directory lock poisoned");
            for entry in snapshot.brands {
                if dir.name_index.contains_key(&entry.brand.name) {
                    return Err(StoreError::BrandNameTaken(entry.brand.name));
                }
                dir.name_index.insert(entry.brand.name.clone(), entry.brand.id);
                for campaign in &entry.campaigns {
                    dir.campaign_index.insert(campaign.id, entry.brand.id);
                }
                dir.brands.insert(
                    entry.brand.id,
                    Arc::new(Mutex::new(BrandState {
                        brand: entry.brand,
                        campaigns: entry.campaigns,
                        spend: entry.spend,
                    })),
                );
            }
        }
        Ok(store)
    }

    // ── Internals ───────────────────────────────────────────────

    fn brand_arc(&self, brand_id: BrandId) -> Result<Arc<Mutex<BrandState>>, StoreError> {
        let dir = self.dir.read().expect("store directory lock poisoned");
        dir.brands
            .get(&brand_id)
            .cloned()
            .ok_or(StoreError::UnknownBrand(brand_id))
    }

    fn brand_state_of(
        &self,
        campaign_id: CampaignId,
    ) -> Result<Arc<Mutex<BrandState>>, StoreError> {
        let brand_id = self.brand_of(campaign_id)?;
        self.brand_arc(brand_id)
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl CampaignStore for MemoryStore {
    type Tx = MemoryTx;

    fn brand_ids(&self) -> Result<Vec<BrandId>, StoreError> {
        let dir = self.dir.read().expect("store directory lock poisoned");
        Ok(dir.brands.keys().copied().collect())
    }

    fn brand_of(&self, campaign_id: CampaignId) -> Result<BrandId, StoreError> {
        let dir = self.dir.read().expect("store directory lock poisoned");
        dir.campaign_index
            .get(&campaign_id)
            .copied()
            .ok_or(StoreError::UnknownCampaign(campaign_id))
    }

    fn begin_brand(&self, brand_id: BrandId) -> Result<MemoryTx, StoreError> {
        // Directory lock is dropped before the brand lock is taken, so a
        // held transaction never blocks directory reads.
        let state = self.brand_arc(brand_id)?;
        Ok(MemoryTx {
            guard: state.blocking_lock_owned(),
            staged: Vec::new(),
        })
    }
}

// ── Transaction ─────────────────────────────────────────────────────

/// Owned-guard transaction over one brand. Holding it blocks every other
/// reconciliation of the same brand until commit or drop.
pub struct MemoryTx {
    guard: OwnedMutexGuard<BrandState>,
    staged: Vec<StatusWrite>,
}

impl BrandTx for MemoryTx {
    fn brand(&self) -> &Brand {
        &self.guard.brand
    }

    fn campaigns(&self) -> &[Campaign] {
        &self.guard.campaigns
    }

    fn spend_within(&self, window: &TimeWindow) -> Result<Decimal, StoreError> {
        Ok(self
            .guard
            .spend
            .iter()
            .filter(|r| window.contains(r.at))
            .map(|r| r.amount)
            .sum())
    }

    fn append_spend(&mut self, record: SpendRecord) {
        self.guard.spend.push(record);
    }

    fn stage(&mut self, write: StatusWrite) {
        self.staged.push(write);
    }

    fn commit(mut self) -> Result<(), StoreError> {
        for write in std::mem::take(&mut self.staged) {
            if let Some(campaign) = self
                .guard
                .campaigns
                .iter_mut()
                .find(|c| c.id == write.campaign_id)
            {
                campaign.is_active = write.active;
            }
        }
        Ok(())
    }
}

// ── Snapshot types ──────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BrandSnapshot {
    pub brand: Brand,
    pub campaigns: Vec<Campaign>,
    pub spend: Vec<SpendRecord>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StoreSnapshot {
    pub brands: Vec<BrandSnapshot>,
}

// ── Tests ───────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use rust_decimal_macros::dec;
    use uuid::Uuid;

    fn brand(name: &str) -> Brand {
        Brand::new(name, dec!(100), dec!(1000)).unwrap()
    }

    #[test]
    fn insert_brand_rejects_duplicate_name() {
        let store = MemoryStore::new();
        store.insert_brand(brand("acme")).unwrap();
        assert!(matches!(
            store.insert_brand(brand("acme")),
            Err(StoreError::BrandNameTaken(name)) if name == "acme"
        ));
        assert_eq!(store.brand_ids().unwrap().len(), 1);
    }

    #[test]
    fn insert_campaign_requires_known_brand() {
        let store = MemoryStore::new();
        let campaign = Campaign::new(Uuid::new_v4(), "orphan");
        assert!(matches!(
            store.insert_campaign(campaign),
            Err(StoreError::UnknownBrand(_))
        ));
    }

    #[test]
    fn brand_of_resolves_through_the_index() {
        let store = MemoryStore::new();
        let b = brand("acme");
        let brand_id = b.id;
        store.insert_brand(b).unwrap();
        let campaign = Campaign::new(brand_id, "spring");
        let campaign_id = campaign.id;
        store.insert_campaign(campaign).unwrap();

        assert_eq!(store.brand_of(campaign_id).unwrap(), brand_id);
        assert!(matches!(
            store.brand_of(Uuid::new_v4()),
            Err(StoreError::UnknownCampaign(_))
        ));
    }

    #[test]
    fn commit_applies_staged_writes() {
        let store = MemoryStore::new();
        let b = brand("acme");
        let brand_id = b.id;
        store.insert_brand(b).unwrap();
        let campaign = Campaign::new(brand_id, "spring");
        let campaign_id = campaign.id;
        store.insert_campaign(campaign).unwrap();

        let mut tx = store.begin_brand(brand_id).unwrap();
        tx.stage(StatusWrite {
            campaign_id,
            active: true,
        });
        tx.commit().unwrap();

        let snap = store.snapshot();
        assert!(snap.brands[0].campaigns[0].is_active);
    }

    #[test]
    fn dropped_transaction_discards_staged_writes() {
        let store = MemoryStore::new();
        let b = brand("acme");
        let brand_id = b.id;
        store.insert_brand(b).unwrap();
        let campaign = Campaign::new(brand_id, "spring");
        let campaign_id = campaign.id;
        store.insert_campaign(campaign).unwrap();

        {
            let mut tx = store.begin_brand(brand_id).unwrap();
            tx.stage(StatusWrite {
                campaign_id,
                active: true,
            });
            // No commit.
        }

        let snap = store.snapshot();
        assert!(!snap.brands[0].campaigns[0].is_active);
    }

    #[test]
    fn spend_within_respects_the_window() {
        let store = MemoryStore::new();
        let b = brand("acme");
        let brand_id = b.id;
        store.insert_brand(b).unwrap();
        let campaign = Campaign::new(brand_id, "spring");
        let campaign_id = campaign.id;
        store.insert_campaign(campaign).unwrap();

        let inside = Utc.with_ymd_and_hms(2026, 3, 10, 12, 0, 0).unwrap();
        let outside = Utc.with_ymd_and_hms(2026, 3, 9, 12, 0, 0).unwrap();

        let mut tx = store.begin_brand(brand_id).unwrap();
        tx.append_spend(SpendRecord::new(campaign_id, dec!(30), inside).unwrap());
        tx.append_spend(SpendRecord::new(campaign_id, dec!(99), outside).unwrap());
        tx.commit().unwrap();

        let tx = store.begin_brand(brand_id).unwrap();
        let total = tx
            .spend_within(&TimeWindow::calendar_day(inside))
            .unwrap();
        assert_eq!(total, dec!(30));
    }

    #[test]
    fn add_window_rejects_duplicates_and_unknown_campaigns() {
        let store = MemoryStore::new();
        let b = brand("acme");
        let brand_id = b.id;
        store.insert_brand(b).unwrap();
        let campaign = Campaign::new(brand_id, "spring");
        let campaign_id = campaign.id;
        store.insert_campaign(campaign).unwrap();

        let w = DaypartWindow::new(0, 9, 17).unwrap();
        store.add_window(campaign_id, w).unwrap();
        assert!(matches!(
            store.add_window(campaign_id, w),
            Err(EngineError::Validation(_))
        ));
        assert!(matches!(
            store.add_window(Uuid::new_v4(), w),
            Err(EngineError::Store(StoreError::UnknownCampaign(_)))
        ));
    }

    #[test]
    fn update_budgets_validates() {
        let store = MemoryStore::new();
        let b = brand("acme");
        let brand_id = b.id;
        store.insert_brand(b).unwrap();

        store.update_budgets(brand_id, dec!(5), dec!(50)).unwrap();
        assert!(matches!(
            store.update_budgets(brand_id, dec!(0), dec!(50)),
            Err(EngineError::Validation(_))
        ));

        let snap = store.snapshot();
        assert_eq!(snap.brands[0].brand.daily_budget, dec!(5));
    }

    #[test]
    fn snapshot_round_trip_preserves_indexes() {
        let store = MemoryStore::new();
        let b = brand("acme");
        let brand_id = b.id;
        store.insert_brand(b).unwrap();
        let campaign = Campaign::new(brand_id, "spring");
        let campaign_id = campaign.id;
        store.insert_campaign(campaign).unwrap();
        let at = Utc.with_ymd_and_hms(2026, 3, 10, 12, 0, 0).unwrap();
        let mut tx = store.begin_brand(brand_id).unwrap();
        tx.append_spend(SpendRecord::new(campaign_id, dec!(12.50), at).unwrap());
        tx.commit().unwrap();

        let rebuilt = MemoryStore::from_snapshot(store.snapshot()).unwrap();
        assert_eq!(rebuilt.brand_of(campaign_id).unwrap(), brand_id);
        let snap = rebuilt.snapshot();
        assert_eq!(snap.brands.len(), 1);
        assert_eq!(snap.brands[0].spend.len(), 1);
        assert_eq!(snap.brands[0].spend[0].amount, dec!(12.50));
    }
}
