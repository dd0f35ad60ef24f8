//! Domain model: brands, campaigns, dayparting windows, and the spend ledger.
//!
//! `Campaign::is_active` is derived state. The reconciler is its only
//! legitimate writer; an out-of-band edit survives exactly until the next
//! reconciliation pass recomputes it.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ValidationError;

pub type BrandId = Uuid;
pub type CampaignId = Uuid;
pub type SpendRecordId = Uuid;

// ── Brand ─────────────────────────────────────────────────────

/// An advertiser account. Budget caps live here and are shared by every
/// campaign the brand owns.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Brand {
    pub id: BrandId,
    pub name: String,
    pub daily_budget: Decimal,
    pub monthly_budget: Decimal,
}

impl Brand {
    /// Create a brand with validated budgets (both must be positive).
    pub fn new(
        name: impl Into<String>,
        daily_budget: Decimal,
        monthly_budget: Decimal,
    ) -> Result<Self, ValidationError> {
        check_budgets(daily_budget, monthly_budget)?;
        Ok(Self {
            id: Uuid::new_v4(),
            name: name.into(),
            daily_budget,
            monthly_budget,
        })
    }

    /// Replace both budget caps, keeping the same validation as [`new`].
    ///
    /// [`new`]: Self::new
    pub fn set_budgets(
        &mut self,
        daily_budget: Decimal,
        monthly_budget: Decimal,
    ) -> Result<(), ValidationError> {
        check_budgets(daily_budget, monthly_budget)?;
        self.daily_budget = daily_budget;
        self.monthly_budget = monthly_budget;
        Ok(())
    }
}

fn check_budgets(daily_budget: Decimal, monthly_budget: Decimal) -> Result<(), ValidationError> {
    if daily_budget <= Decimal::ZERO {
        return Err(ValidationError::NonPositiveBudget {
            which: "daily",
            amount: daily_budget,
        });
    }
    if monthly_budget <= Decimal::ZERO {
        return Err(ValidationError::NonPositiveBudget {
            which: "monthly",
            amount: monthly_budget,
        });
    }
    Ok(())
}

// ── Dayparting window ─────────────────────────────────────────

/// One allowed delivery window: a day of the week plus a half-open hour
/// range `[start_hour, end_hour)`. A 9–17 window covers hours 9..=16 and
/// excludes hour 17.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DaypartWindow {
    /// 0 = Monday through 6 = Sunday.
    pub day_of_week: u8,
    pub start_hour: u8,
    /// Exclusive. 24 means the window runs to the end of the day.
    pub end_hour: u8,
}

impl DaypartWindow {
    pub fn new(day_of_week: u8, start_hour: u8, end_hour: u8) -> Result<Self, ValidationError> {
        if day_of_week > 6 {
            return Err(ValidationError::DayOutOfRange(day_of_week));
        }
        if start_hour >= end_hour || end_hour > 24 {
            return Err(ValidationError::InvalidHourRange {
                start: start_hour,
                end: end_hour,
            });
        }
        Ok(Self {
            day_of_week,
            start_hour,
            end_hour,
        })
    }

    /// Whether a weekday/hour pair falls inside this window.
    pub fn contains(&self, day_of_week: u8, hour: u8) -> bool {
        self.day_of_week == day_of_week && self.start_hour <= hour && hour < self.end_hour
    }
}

// ── Campaign ──────────────────────────────────────────────────

/// A campaign and its dayparting windows. A campaign with no windows is
/// never eligible for delivery.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Campaign {
    pub id: CampaignId,
    pub brand_id: BrandId,
    pub name: String,
    /// Derived activation flag, written only by the reconciler.
    pub is_active: bool,
    pub windows: Vec<DaypartWindow>,
}

impl Campaign {
    /// Create an inactive campaign with no windows. The first sweep decides
    /// its real state.
    pub fn new(brand_id: BrandId, name: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            brand_id,
            name: name.into(),
            is_active: false,
            windows: Vec::new(),
        }
    }

    /// Add a dayparting window. Exact duplicates are rejected; overlapping
    /// but distinct windows are allowed.
    pub fn add_window(&mut self, window: DaypartWindow) -> Result<(), ValidationError> {
        if self.windows.contains(&window) {
            return Err(ValidationError::DuplicateWindow {
                day: window.day_of_week,
                start: window.start_hour,
                end: window.end_hour,
            });
        }
        self.windows.push(window);
        Ok(())
    }
}

// ── Spend ledger entry ────────────────────────────────────────

/// One spend event. Appended exactly once, never updated or deleted;
/// daily/monthly "resets" are just window boundaries moving past it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpendRecord {
    pub id: SpendRecordId,
    pub campaign_id: CampaignId,
    pub amount: Decimal,
    pub at: DateTime<Utc>,
}

impl SpendRecord {
    /// Create a record with a validated positive amount.
    pub fn new(
        campaign_id: CampaignId,
        amount: Decimal,
        at: DateTime<Utc>,
    ) -> Result<Self, ValidationError> {
        if amount <= Decimal::ZERO {
            return Err(ValidationError::NonPositiveAmount(amount));
        }
        Ok(Self {
            id: Uuid::new_v4(),
            campaign_id,
            amount,
            at,
        })
    }
}

// ── Tests ─────────────────────────────────────────────────────
