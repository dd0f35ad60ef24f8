//! Campaign status reconciliation.
//!
//! The reconciler owns the write path for `is_active`. Five entry points
//! feed it:
//! - **Budget sweep**: recheck every brand's caps; breached brands have all
//!   campaigns forced inactive, recovered brands fall through to the full
//!   decision and may reactivate.
//! - **Dayparting sweep**: recompute the full decision for every campaign.
//! - **Daily reset**: rerun at the day boundary with the daily cap out of
//!   scope (the new day's window is empty by construction).
//! - **Monthly reset**: rerun at the month boundary with no budget check.
//! - **Spend recording**: append to the ledger and force the brand's
//!   campaigns inactive if the append breached a cap. Never activates.
//!
//! Each pass holds one brand transaction for its whole read-decide-write
//! sequence, writes only deltas, and emits one [`ChangeRecord`] per flip
//! after the commit. A pass that reads no aggregate writes no status.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

use adgate_core::{BrandId, CampaignId, SpendRecord, SpendRecordId};

use crate::decision::{self, BudgetScope};
use crate::error::EngineError;
use crate::events::{ChangeRecord, ChangeSink, Reason, Trigger};
use crate::ledger::SpendTotals;
use crate::schedule::ScheduleSet;
use crate::store::{BrandTx, CampaignStore, StatusWrite, StoreError};

// ── Reports ─────────────────────────────────────────────────────────

/// One brand that could not be reconciled during a sweep.
#[derive(Debug)]
pub struct BrandFailure {
    pub brand_id: BrandId,
    pub error: StoreError,
}

/// Outcome of one sweep across a set of brands.
#[derive(Debug)]
pub struct SweepReport {
    pub trigger: Trigger,
    pub brands_seen: usize,
    pub changes: Vec<ChangeRecord>,
    pub failures: Vec<BrandFailure>,
}

impl SweepReport {
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }

    /// Brand ids whose failure is worth retrying.
    pub fn transient_failures(&self) -> Vec<BrandId> {
        self.failures
            .iter()
            .filter(|f| f.error.is_transient())
            .map(|f| f.brand_id)
            .collect()
    }
}

/// Outcome of recording one spend amount.
#[derive(Debug)]
pub struct SpendOutcome {
    pub record_id: SpendRecordId,
    pub brand_id: BrandId,
    /// Brand totals immediately after the append.
    pub totals: SpendTotals,
    /// Deactivations caused by the append, if it breached a cap.
    pub changes: Vec<ChangeRecord>,
}

// ── Reconciler ──────────────────────────────────────────────────────

/// Drives status reconciliation over a [`CampaignStore`].
///
/// All entry points are synchronous and may block on brand locks; async
/// callers go through `spawn_blocking` (see the runner).
pub struct Reconciler<S: CampaignStore> {
    store: Arc<S>,
    sink: Arc<dyn ChangeSink>,
}

impl<S: CampaignStore> Reconciler<S> {
    pub fn new(store: Arc<S>, sink: Arc<dyn ChangeSink>) -> Self {
        Self { store, sink }
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    // ── Sweep entry points ──────────────────────────────────────────

    /// Recheck budget caps for every brand.
    pub fn reconcile_budgets(&self, now: DateTime<Utc>) -> Result<SweepReport, StoreError> {
        self.sweep_all(Trigger::BudgetSweep, now)
    }

    pub fn reconcile_budgets_for(&self, brands: &[BrandId], now: DateTime<Utc>) -> SweepReport {
        self.sweep(Trigger::BudgetSweep, brands, now)
    }

    /// Recompute the full decision for every campaign.
    pub fn reconcile_dayparting(&self, now: DateTime<Utc>) -> Result<SweepReport, StoreError> {
        self.sweep_all(Trigger::DaypartingSweep, now)
    }

    pub fn reconcile_dayparting_for(&self, brands: &[BrandId], now: DateTime<Utc>) -> SweepReport {
        self.sweep(Trigger::DaypartingSweep, brands, now)
    }

    /// Day-boundary pass: the fresh daily window is empty, so only the
    /// monthly cap and the schedule decide.
    pub fn reconcile_daily_reset(&self, now: DateTime<Utc>) -> Result<SweepReport, StoreError> {
        self.sweep_all(Trigger::DailyReset, now)
    }

    pub fn reconcile_daily_reset_for(&self, brands: &[BrandId], now: DateTime<Utc>) -> SweepReport {
        self.sweep(Trigger::DailyReset, brands, now)
    }

    /// Month-boundary pass: both budget windows are empty, only the
    /// schedule decides.
    pub fn reconcile_monthly_reset(&self, now: DateTime<Utc>) -> Result<SweepReport, StoreError> {
        self.sweep_all(Trigger::MonthlyReset, now)
    }

    pub fn reconcile_monthly_reset_for(
        &self,
        brands: &[BrandId],
        now: DateTime<Utc>,
    ) -> SweepReport {
        self.sweep(Trigger::MonthlyReset, brands, now)
    }

    // ── Spend recording ─────────────────────────────────────────────

    /// Append a spend amount to a campaign's ledger and deactivate the
    /// brand's campaigns if the append breached a cap.
    ///
    /// This path never activates anything: a brand back under budget
    /// waits for the next budget sweep.
    pub fn record_spend(
        &self,
        campaign_id: CampaignId,
        amount: Decimal,
        now: DateTime<Utc>,
    ) -> Result<SpendOutcome, EngineError> {
        let record = SpendRecord::new(campaign_id, amount, now)?;
        let record_id = record.id;
        let brand_id = self.store.brand_of(campaign_id)?;

        let mut tx = self.store.begin_brand(brand_id)?;
        tx.append_spend(record);
        tracing::debug!(
            campaign_id = %campaign_id,
            brand_id = %brand_id,
            amount = %amount,
            "spend recorded"
        );

        let scope = scope_for(Trigger::Spend);
        let totals = SpendTotals::for_brand(&tx, now)?;
        let mut changes = Vec::new();
        if !decision::budget_ok(tx.brand(), totals, scope) {
            for campaign in tx.campaigns() {
                if campaign.is_active {
                    changes.push(ChangeRecord {
                        campaign_id: campaign.id,
                        brand_id,
                        old_state: true,
                        new_state: false,
                        trigger: Trigger::Spend,
                        reason: flip_reason(Trigger::Spend, false, false),
                        at: now,
                    });
                }
            }
            for change in &changes {
                tx.stage(StatusWrite {
                    campaign_id: change.campaign_id,
                    active: false,
                });
            }
        }
        tx.commit()?;

        if !changes.is_empty() {
            tracing::info!(
                brand_id = %brand_id,
                deactivated = changes.len(),
                daily = %totals.daily,
                monthly = %totals.monthly,
                "brand over budget after spend"
            );
        }
        for change in &changes {
            self.sink.emit(change);
        }

        Ok(SpendOutcome {
            record_id,
            brand_id,
            totals,
            changes,
        })
    }

    // ── Sweep internals ─────────────────────────────────────────────

    fn sweep_all(&self, trigger: Trigger, now: DateTime<Utc>) -> Result<SweepReport, StoreError> {
        let brands = self.store.brand_ids()?;
        Ok(self.sweep(trigger, &brands, now))
    }

    fn sweep(&self, trigger: Trigger, brands: &[BrandId], now: DateTime<Utc>) -> SweepReport {
        tracing::debug!(trigger = %trigger, brands = brands.len(), "starting sweep");

        let mut report = SweepReport {
            trigger,
            brands_seen: brands.len(),
            changes: Vec::new(),
            failures: Vec::new(),
        };

        // One brand's failure must not abort the rest of the sweep.
        for &brand_id in brands {
            match self.reconcile_brand(trigger, brand_id, now) {
                Ok(changes) => report.changes.extend(changes),
                Err(error) => {
                    tracing::warn!(
                        trigger = %trigger,
                        brand_id = %brand_id,
                        error = %error,
                        "brand reconciliation failed"
                    );
                    report.failures.push(BrandFailure { brand_id, error });
                }
            }
        }

        tracing::info!(
            trigger = %trigger,
            brands = report.brands_seen,
            changes = report.changes.len(),
            failures = report.failures.len(),
            "sweep complete"
        );
        report
    }

    /// Reconcile one brand under its lock. Returns the flips applied.
    ///
    /// Fail-closed: if the spend aggregate cannot be read, no status is
    /// written and the error surfaces in the sweep report.
    fn reconcile_brand(
        &self,
        trigger: Trigger,
        brand_id: BrandId,
        now: DateTime<Utc>,
    ) -> Result<Vec<ChangeRecord>, StoreError> {
        let mut tx = self.store.begin_brand(brand_id)?;
        let totals = SpendTotals::for_brand(&tx, now)?;
        let scope = scope_for(trigger);
        let budget_ok = decision::budget_ok(tx.brand(), totals, scope);

        let mut changes = Vec::new();
        for campaign in tx.campaigns() {
            let schedule = ScheduleSet::new(&campaign.windows);
            let desired = decision::decide(tx.brand(), schedule, totals, scope, now);
            if desired != campaign.is_active {
                changes.push(ChangeRecord {
                    campaign_id: campaign.id,
                    brand_id,
                    old_state: campaign.is_active,
                    new_state: desired,
                    trigger,
                    reason: flip_reason(trigger, desired, budget_ok),
                    at: now,
                });
            }
        }

        for change in &changes {
            tx.stage(StatusWrite {
                campaign_id: change.campaign_id,
                active: change.new_state,
            });
        }
        tx.commit()?;

        for change in &changes {
            self.sink.emit(change);
        }
        Ok(changes)
    }
}

/// Budget caps in scope for a trigger. Resets skip the cap whose window
/// restarts at their boundary.
fn scope_for(trigger: Trigger) -> BudgetScope {
    match trigger {
        Trigger::Spend | Trigger::BudgetSweep | Trigger::DaypartingSweep => BudgetScope::Full,
        Trigger::DailyReset => BudgetScope::MonthlyOnly,
        Trigger::MonthlyReset => BudgetScope::Unchecked,
    }
}

/// Reason attached to a flip. Activations name what the trigger restored;
/// deactivations name which check failed.
fn flip_reason(trigger: Trigger, new_state: bool, budget_ok: bool) -> Reason {
    if new_state {
        match trigger {
            // Spend recording never activates; the arm serves totality.
            Trigger::Spend | Trigger::BudgetSweep => Reason::BudgetOk,
            Trigger::DaypartingSweep => Reason::ScheduleMatch,
            Trigger::DailyReset => Reason::ResetDaily,
            Trigger::MonthlyReset => Reason::ResetMonthly,
        }
    } else if !budget_ok {
        Reason::BudgetExceeded
    } else {
        Reason::ScheduleMiss
    }
}
