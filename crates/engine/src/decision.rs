//! The pure decision function.
//!
//! Every trigger path funnels through [`decide`]: the four sweeps and the
//! on-spend check differ only in the [`BudgetScope`] they pass and in how
//! the reconciler applies the verdict. No side effects, no clock reads;
//! identical inputs always produce the identical verdict, which is what
//! makes every reconciliation idempotent and testable.

use chrono::{DateTime, Utc};

use adgate_core::Brand;

use crate::ledger::SpendTotals;
use crate::schedule::ScheduleSet;

/// Which budget caps a trigger rechecks.
///
/// Calendar resets skip the caps whose window restarts at the reset
/// boundary: at midnight the daily window is empty by construction, and at
/// month start both windows are.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BudgetScope {
    /// Daily and monthly caps both apply.
    Full,
    /// Only the monthly cap applies (daily reset).
    MonthlyOnly,
    /// No budget check at all (monthly reset).
    Unchecked,
}

/// Whether spend is within the caps selected by `scope`.
///
/// Spend exactly equal to a cap is still within it; only strictly greater
/// spend exceeds. Every trigger type uses this same comparison.
pub fn budget_ok(brand: &Brand, totals: SpendTotals, scope: BudgetScope) -> bool {
    match scope {
        BudgetScope::Full => {
            totals.daily <= brand.daily_budget && totals.monthly <= brand.monthly_budget
        }
        BudgetScope::MonthlyOnly => totals.monthly <= brand.monthly_budget,
        BudgetScope::Unchecked => true,
    }
}

/// Desired active state for one campaign: within budget and inside a
/// dayparting window.
pub fn decide(
    brand: &Brand,
    schedule: ScheduleSet<'_>,
    totals: SpendTotals,
    scope: BudgetScope,
    now: DateTime<Utc>,
) -> bool {
    budget_ok(brand, totals, scope) && schedule.matches(now)
}
