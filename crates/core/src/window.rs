//! Calendar-aligned UTC windows for spend aggregation.
//!
//! Budget "resets" are implemented as window reinterpretation: the ledger is
//! append-only, and a new day or month simply moves the aggregation window
//! so older records stop counting. Nothing is ever mutated or deleted.

use chrono::{DateTime, Datelike, Duration, Months, TimeZone, Timelike, Utc};

/// Half-open UTC interval `[start, end)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl TimeWindow {
    pub fn contains(&self, at: DateTime<Utc>) -> bool {
        self.start <= at && at < self.end
    }

    /// The calendar day containing `at`: midnight to the next midnight.
    pub fn calendar_day(at: DateTime<Utc>) -> Self {
        let start = Utc
            .with_ymd_and_hms(at.year(), at.month(), at.day(), 0, 0, 0)
            .single()
            .expect("UTC timestamps are unambiguous");
        Self {
            start,
            end: start + Duration::days(1),
        }
    }

    /// The calendar month containing `at`: first-of-month midnight to the
    /// next first-of-month midnight.
    pub fn calendar_month(at: DateTime<Utc>) -> Self {
        let start = Utc
            .with_ymd_and_hms(at.year(), at.month(), 1, 0, 0, 0)
            .single()
            .expect("UTC timestamps are unambiguous");
        let end = start
            .checked_add_months(Months::new(1))
            .expect("month start stays within chrono range");
        Self { start, end }
    }
}

/// Weekday index matching [`DaypartWindow::day_of_week`]: Monday = 0.
///
/// [`DaypartWindow::day_of_week`]: crate::model::DaypartWindow
pub fn weekday_index(at: DateTime<Utc>) -> u8 {
    at.weekday().num_days_from_monday() as u8
}

/// Hour of day in 0..=23.
pub fn hour_of(at: DateTime<Utc>) -> u8 {
    at.hour() as u8
}

// ── Tests ─────────────────────────────────────────────────────
