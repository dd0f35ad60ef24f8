//! Sweep cadence bookkeeping.
//!
//! The four sweeps each run on their own cron expression. A
//! [`SweepTimetable`] parses the expressions once at startup, tracks when
//! each sweep last ran, and answers which sweeps are due at a given
//! instant. Last-run marks start at construction time, so a worker
//! started mid-day does not retroactively fire the midnight resets.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use cron::Schedule;
use thiserror::Error;

use adgate_core::config::SweepConfig;

// ── Sweep kinds ─────────────────────────────────────────────────────

/// The four scheduled reconciliation passes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SweepKind {
    Budget,
    Dayparting,
    DailyReset,
    MonthlyReset,
}

impl SweepKind {
    pub const ALL: [SweepKind; 4] = [
        SweepKind::Budget,
        SweepKind::Dayparting,
        SweepKind::DailyReset,
        SweepKind::MonthlyReset,
    ];
}

impl fmt::Display for SweepKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SweepKind::Budget => "budget",
            SweepKind::Dayparting => "dayparting",
            SweepKind::DailyReset => "daily_reset",
            SweepKind::MonthlyReset => "monthly_reset",
        };
        f.write_str(s)
    }
}

// ── Errors ──────────────────────────────────────────────────────────

#[derive(Error, Debug)]
#[error("invalid cron expression for {kind} sweep: {expr}")]
pub struct TimetableError {
    pub kind: SweepKind,
    pub expr: String,
    #[source]
    source: cron::error::Error,
}

// ── Timetable ───────────────────────────────────────────────────────

#[derive(Debug, Clone)]
struct SweepEntry {
    /// Normalized 6-field expression, kept for logs and inspection.
    expression: String,
    schedule: Schedule,
    last_triggered: DateTime<Utc>,
}

impl SweepEntry {
    fn parse(kind: SweepKind, expr: &str, start: DateTime<Utc>) -> Result<Self, TimetableError> {
        let expression = normalize_cron(expr);
        let schedule = Schedule::from_str(&expression).map_err(|source| TimetableError {
            kind,
            expr: expr.to_string(),
            source,
        })?;
        Ok(Self {
            expression,
            schedule,
            last_triggered: start,
        })
    }

    /// Due when a scheduled tick falls after the last trigger and at or
    /// before `now`.
    fn is_due(&self, now: DateTime<Utc>) -> bool {
        match self.schedule.after(&self.last_triggered).next() {
            Some(next) => next <= now,
            None => false,
        }
    }
}

/// Tracks the cron cadence and last run of each sweep.
#[derive(Debug)]
pub struct SweepTimetable {
    budget: SweepEntry,
    dayparting: SweepEntry,
    daily_reset: SweepEntry,
    monthly_reset: SweepEntry,
}

impl SweepTimetable {
    /// Parse all four expressions, seeding every last-run mark to `start`.
    pub fn new(config: &SweepConfig, start: DateTime<Utc>) -> Result<Self, TimetableError> {
        Ok(Self {
            budget: SweepEntry::parse(SweepKind::Budget, &config.budget_cron, start)?,
            dayparting: SweepEntry::parse(SweepKind::Dayparting, &config.dayparting_cron, start)?,
            daily_reset: SweepEntry::parse(SweepKind::DailyReset, &config.daily_reset_cron, start)?,
            monthly_reset: SweepEntry::parse(
                SweepKind::MonthlyReset,
                &config.monthly_reset_cron,
                start,
            )?,
        })
    }

    fn entry(&self, kind: SweepKind) -> &SweepEntry {
        match kind {
            SweepKind::Budget => &self.budget,
            SweepKind::Dayparting => &self.dayparting,
            SweepKind::DailyReset => &self.daily_reset,
            SweepKind::MonthlyReset => &self.monthly_reset,
        }
    }

    fn entry_mut(&mut self, kind: SweepKind) -> &mut SweepEntry {
        match kind {
            SweepKind::Budget => &mut self.budget,
            SweepKind::Dayparting => &mut self.dayparting,
            SweepKind::DailyReset => &mut self.daily_reset,
            SweepKind::MonthlyReset => &mut self.monthly_reset,
        }
    }

    pub fn is_due(&self, kind: SweepKind, now: DateTime<Utc>) -> bool {
        self.entry(kind).is_due(now)
    }

    /// All sweeps due at `now`, in [`SweepKind::ALL`] order.
    pub fn due(&self, now: DateTime<Utc>) -> Vec<SweepKind> {
        SweepKind::ALL
            .into_iter()
            .filter(|&kind| self.is_due(kind, now))
            .collect()
    }

    /// Mark a sweep as having run at `at`.
    pub fn record_run(&mut self, kind: SweepKind, at: DateTime<Utc>) {
        self.entry_mut(kind).last_triggered = at;
    }

    /// Normalized expression for a sweep, for startup logs.
    pub fn expression(&self, kind: SweepKind) -> &str {
        &self.entry(kind).expression
    }
}

/// Normalize a 5-field cron expression to the 6-field form the `cron`
/// crate expects by prepending a seconds field. 6-field input passes
/// through untouched.
fn normalize_cron(expr: &str) -> String {
    let trimmed = expr.trim();
    if trimmed.split_whitespace().count() == 5 {
        format!("0 {}", trimmed)
    } else {
        trimmed.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn config() -> SweepConfig {
        SweepConfig {
            budget_cron: "*/5 * * * *".to_string(),
            dayparting_cron: "0 * * * *".to_string(),
            daily_reset_cron: "0 0 * * *".to_string(),
            monthly_reset_cron: "0 0 1 * *".to_string(),
        }
    }

    fn at(day: u32, hour: u32, min: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, day, hour, min, 0).unwrap()
    }

    // ── normalize_cron ──────────────────────────────────────────────

    #[test]
    fn normalize_cron_prepends_seconds_to_5_fields() {
        assert_eq!(normalize_cron("*/5 * * * *"), "0 */5 * * * *");
    }

    #[test]
    fn normalize_cron_passes_6_fields_through() {
        assert_eq!(normalize_cron("30 */5 * * * *"), "30 */5 * * * *");
    }

    #[test]
    fn normalize_cron_trims_whitespace() {
        assert_eq!(normalize_cron("  0 0 * * *  "), "0 0 0 * * *");
    }

    // ── Due checks ──────────────────────────────────────────────────

    #[test]
    fn nothing_is_due_at_construction_time() {
        let start = at(9, 10, 0);
        let timetable = SweepTimetable::new(&config(), start).unwrap();
        assert!(timetable.due(start).is_empty());
    }

    #[test]
    fn mid_day_start_does_not_fire_resets_retroactively() {
        // Worker comes up at 10:17; midnight and the 1st are long past.
        let timetable = SweepTimetable::new(&config(), at(9, 10, 17)).unwrap();
        assert!(!timetable.is_due(SweepKind::DailyReset, at(9, 10, 18)));
        assert!(!timetable.is_due(SweepKind::MonthlyReset, at(9, 10, 18)));
    }

    #[test]
    fn budget_sweep_fires_every_five_minutes() {
        let mut timetable = SweepTimetable::new(&config(), at(9, 10, 2)).unwrap();
        assert!(!timetable.is_due(SweepKind::Budget, at(9, 10, 4)));
        assert!(timetable.is_due(SweepKind::Budget, at(9, 10, 5)));

        timetable.record_run(SweepKind::Budget, at(9, 10, 5));
        assert!(!timetable.is_due(SweepKind::Budget, at(9, 10, 6)));
        assert!(timetable.is_due(SweepKind::Budget, at(9, 10, 10)));
    }

    #[test]
    fn dayparting_sweep_fires_on_the_hour() {
        let timetable = SweepTimetable::new(&config(), at(9, 10, 30)).unwrap();
        assert!(!timetable.is_due(SweepKind::Dayparting, at(9, 10, 59)));
        assert!(timetable.is_due(SweepKind::Dayparting, at(9, 11, 0)));
    }

    #[test]
    fn daily_reset_fires_at_midnight() {
        let timetable = SweepTimetable::new(&config(), at(9, 10, 0)).unwrap();
        assert!(!timetable.is_due(SweepKind::DailyReset, at(9, 23, 59)));
        assert!(timetable.is_due(SweepKind::DailyReset, at(10, 0, 0)));
    }

    #[test]
    fn monthly_reset_fires_on_the_first() {
        let timetable = SweepTimetable::new(&config(), at(9, 10, 0)).unwrap();
        assert!(!timetable.is_due(SweepKind::MonthlyReset, at(31, 23, 59)));
        let april_first = Utc.with_ymd_and_hms(2026, 4, 1, 0, 0, 0).unwrap();
        assert!(timetable.is_due(SweepKind::MonthlyReset, april_first));
    }

    #[test]
    fn due_lists_every_overdue_sweep() {
        let timetable = SweepTimetable::new(&config(), at(9, 10, 0)).unwrap();
        // Midnight on the 10th: budget, dayparting, and daily reset all
        // have a tick at 00:00; the monthly reset waits for the 1st.
        let due = timetable.due(at(10, 0, 0));
        assert_eq!(
            due,
            vec![SweepKind::Budget, SweepKind::Dayparting, SweepKind::DailyReset]
        );
    }

    #[test]
    fn lagging_check_still_catches_a_missed_tick() {
        // Tick loop wakes late: 10:07 is past the 10:05 mark but the
        // sweep has not run since 10:02.
        let timetable = SweepTimetable::new(&config(), at(9, 10, 2)).unwrap();
        assert!(timetable.is_due(SweepKind::Budget, at(9, 10, 7)));
    }

    #[test]
    fn invalid_cron_is_rejected_with_the_sweep_named() {
        let mut bad = config();
        bad.daily_reset_cron = "not a cron".to_string();
        let err = SweepTimetable::new(&config(), at(9, 10, 0));
        assert!(err.is_ok());
        let err = SweepTimetable::new(&bad, at(9, 10, 0)).unwrap_err();
        assert_eq!(err.kind, SweepKind::DailyReset);
        assert!(err.to_string().contains("daily_reset"));
    }
}
