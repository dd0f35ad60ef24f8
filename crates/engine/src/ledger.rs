//! Windowed spend aggregation over a brand's append-only ledger.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

use adgate_core::TimeWindow;

use crate::store::{BrandTx, StoreError};

/// Daily and monthly spend sums for one brand at a given instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SpendTotals {
    pub daily: Decimal,
    pub monthly: Decimal,
}

impl SpendTotals {
    /// Aggregate the brand's ledger over the calendar day and month
    /// containing `now`.
    ///
    /// The daily window is a subset of the monthly one, so `daily` never
    /// exceeds `monthly`. Crossing a day or month boundary shrinks these
    /// sums without touching the ledger: that shift is the whole reset
    /// mechanism.
    pub fn for_brand<T: BrandTx>(tx: &T, now: DateTime<Utc>) -> Result<Self, StoreError> {
        let daily = tx.spend_within(&TimeWindow::calendar_day(now))?;
        let monthly = tx.spend_within(&TimeWindow::calendar_month(now))?;
        Ok(Self { daily, monthly })
    }
}
