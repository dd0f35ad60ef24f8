//! Dayparting schedule matching.

use chrono::{DateTime, Utc};

use adgate_core::{hour_of, weekday_index, DaypartWindow};

/// A campaign's dayparting windows, viewed for matching against a clock.
///
/// An empty set never matches: a campaign without windows is modeled as
/// "never eligible", not "always eligible".
#[derive(Debug, Clone, Copy)]
pub struct ScheduleSet<'a> {
    windows: &'a [DaypartWindow],
}

impl<'a> ScheduleSet<'a> {
    pub fn new(windows: &'a [DaypartWindow]) -> Self {
        Self { windows }
    }

    /// True iff `at` falls inside any window.
    pub fn matches(&self, at: DateTime<Utc>) -> bool {
        let day = weekday_index(at);
        let hour = hour_of(at);
        self.windows.iter().any(|w| w.contains(day, hour))
    }

    pub fn is_empty(&self) -> bool {
        self.windows.is_empty()
    }
}
