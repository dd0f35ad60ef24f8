//! Change records and the sinks that receive them.
//!
//! Every campaign state flip produces exactly one [`ChangeRecord`]. The
//! reconciler hands records to a [`ChangeSink`] after the owning store
//! transaction has committed; sinks observe history, they never influence
//! the decision itself. Campaigns whose recomputed state equals their
//! current state produce nothing.

use std::collections::VecDeque;
use std::fmt;
use std::sync::RwLock;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use adgate_core::{BrandId, CampaignId};

/// What caused a reconciliation pass.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Trigger {
    Spend,
    BudgetSweep,
    DaypartingSweep,
    DailyReset,
    MonthlyReset,
}

impl fmt::Display for Trigger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Trigger::Spend => "spend",
            Trigger::BudgetSweep => "budget_sweep",
            Trigger::DaypartingSweep => "dayparting_sweep",
            Trigger::DailyReset => "daily_reset",
            Trigger::MonthlyReset => "monthly_reset",
        };
        f.write_str(s)
    }
}

/// Why a campaign flipped state.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Reason {
    BudgetExceeded,
    BudgetOk,
    ScheduleMatch,
    ScheduleMiss,
    ResetDaily,
    ResetMonthly,
}

impl fmt::Display for Reason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Reason::BudgetExceeded => "budget_exceeded",
            Reason::BudgetOk => "budget_ok",
            Reason::ScheduleMatch => "schedule_match",
            Reason::ScheduleMiss => "schedule_miss",
            Reason::ResetDaily => "reset_daily",
            Reason::ResetMonthly => "reset_monthly",
        };
        f.write_str(s)
    }
}

/// One campaign state transition.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChangeRecord {
    pub campaign_id: CampaignId,
    pub brand_id: BrandId,
    pub old_state: bool,
    pub new_state: bool,
    pub trigger: Trigger,
    pub reason: Reason,
    pub at: DateTime<Utc>,
}

/// Receives change records after the owning transaction commits.
///
/// Implementations must tolerate being called from blocking worker threads.
pub trait ChangeSink: Send + Sync {
    fn emit(&self, record: &ChangeRecord);
}

/// Discards every record. Useful in tests that only assert on state.
#[derive(Debug, Default)]
pub struct NullSink;

impl ChangeSink for NullSink {
    fn emit(&self, _record: &ChangeRecord) {}
}

/// Logs each record as a structured tracing event.
#[derive(Debug, Default)]
pub struct LogSink;

impl ChangeSink for LogSink {
    fn emit(&self, record: &ChangeRecord) {
        tracing::info!(
            campaign_id = %record.campaign_id,
            brand_id = %record.brand_id,
            old_state = record.old_state,
            new_state = record.new_state,
            trigger = %record.trigger,
            reason = %record.reason,
            at = %record.at,
            "campaign state changed"
        );
    }
}

/// Filters for [`ChangeJournal::query`].
#[derive(Debug, Default)]
pub struct JournalQuery {
    pub campaign_id: Option<CampaignId>,
    pub brand_id: Option<BrandId>,
    pub trigger: Option<Trigger>,
    /// Maximum records to return (default 100).
    pub limit: Option<usize>,
}

/// In-memory journal of change records with FIFO eviction.
///
/// Thread-safe via `std::sync::RwLock` so the sweep worker's blocking
/// threads and async inspection paths can share one instance.
pub struct ChangeJournal {
    records: RwLock<VecDeque<ChangeRecord>>,
    capacity: usize,
}

impl ChangeJournal {
    /// Create an empty journal holding at most `capacity` records.
    pub fn new(capacity: usize) -> Self {
        Self {
            records: RwLock::new(VecDeque::new()),
            capacity,
        }
    }

    /// Rebuild a journal from previously exported records, oldest first.
    /// Keeps only the newest `capacity` records if given more.
    pub fn with_records(capacity: usize, records: Vec<ChangeRecord>) -> Self {
        let mut deque: VecDeque<ChangeRecord> = records.into();
        while deque.len() > capacity {
            deque.pop_front();
        }
        Self {
            records: RwLock::new(deque),
            capacity,
        }
    }

    /// Query records newest-first, applying the given filters.
    pub fn query(&self, params: &JournalQuery) -> Vec<ChangeRecord> {
        let guard = self.records.read().expect("journal lock poisoned");
        let limit = params.limit.unwrap_or(100);

        guard
            .iter()
            .rev()
            .filter(|r| params.campaign_id.map_or(true, |id| r.campaign_id == id))
            .filter(|r| params.brand_id.map_or(true, |id| r.brand_id == id))
            .filter(|r| params.trigger.map_or(true, |t| r.trigger == t))
            .take(limit)
            .cloned()
            .collect()
    }

    /// All retained records, oldest first. Suitable for persistence and
    /// for feeding back into [`ChangeJournal::with_records`].
    pub fn export(&self) -> Vec<ChangeRecord> {
        let guard = self.records.read().expect("journal lock poisoned");
        guard.iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.records.read().expect("journal lock poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for ChangeJournal {
    fn default() -> Self {
        Self::new(500)
    }
}

impl ChangeSink for ChangeJournal {
    fn emit(&self, record: &ChangeRecord) {
        let mut guard = self.records.write().expect("journal lock poisoned");
        guard.push_back(record.clone());
        while guard.len() > self.capacity {
            guard.pop_front();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use uuid::Uuid;

    fn record(campaign: CampaignId, brand: BrandId, trigger: Trigger, hour: u32) -> ChangeRecord {
        ChangeRecord {
            campaign_id: campaign,
            brand_id: brand,
            old_state: false,
            new_state: true,
            trigger,
            reason: Reason::ScheduleMatch,
            at: Utc.with_ymd_and_hms(2026, 3, 9, hour, 0, 0).unwrap(),
        }
    }

    #[test]
    fn test_emit_and_query_newest_first() {
        let journal = ChangeJournal::new(10);
        let campaign = Uuid::new_v4();
        let brand = Uuid::new_v4();
        journal.emit(&record(campaign, brand, Trigger::Spend, 1));
        journal.emit(&record(campaign, brand, Trigger::BudgetSweep, 2));
        journal.emit(&record(campaign, brand, Trigger::DailyReset, 3));

        let out = journal.query(&JournalQuery::default());
        assert_eq!(out.len(), 3);
        assert_eq!(out[0].trigger, Trigger::DailyReset);
        assert_eq!(out[2].trigger, Trigger::Spend);
    }

    #[test]
    fn test_campaign_filter() {
        let journal = ChangeJournal::new(10);
        let brand = Uuid::new_v4();
        let c1 = Uuid::new_v4();
        let c2 = Uuid::new_v4();
        journal.emit(&record(c1, brand, Trigger::Spend, 1));
        journal.emit(&record(c2, brand, Trigger::Spend, 2));
        journal.emit(&record(c1, brand, Trigger::BudgetSweep, 3));

        let out = journal.query(&JournalQuery {
            campaign_id: Some(c1),
            ..JournalQuery::default()
        });
        assert_eq!(out.len(), 2);
        assert!(out.iter().all(|r| r.campaign_id == c1));
    }

    #[test]
    fn test_brand_filter() {
        let journal = ChangeJournal::new(10);
        let acme = Uuid::new_v4();
        let zenith = Uuid::new_v4();
        journal.emit(&record(Uuid::new_v4(), acme, Trigger::Spend, 1));
        journal.emit(&record(Uuid::new_v4(), zenith, Trigger::Spend, 2));
        journal.emit(&record(Uuid::new_v4(), acme, Trigger::DailyReset, 3));

        let out = journal.query(&JournalQuery {
            brand_id: Some(acme),
            ..JournalQuery::default()
        });
        assert_eq!(out.len(), 2);
        assert!(out.iter().all(|r| r.brand_id == acme));
        // Combines with the trigger filter.
        let out = journal.query(&JournalQuery {
            brand_id: Some(acme),
            trigger: Some(Trigger::Spend),
            ..JournalQuery::default()
        });
        assert_eq!(out.len(), 1);
    }

    #[test]
    fn test_trigger_filter_and_limit() {
        let journal = ChangeJournal::new(50);
        let brand = Uuid::new_v4();
        for hour in 0..8 {
            journal.emit(&record(Uuid::new_v4(), brand, Trigger::DaypartingSweep, hour));
        }
        journal.emit(&record(Uuid::new_v4(), brand, Trigger::Spend, 9));

        let out = journal.query(&JournalQuery {
            trigger: Some(Trigger::DaypartingSweep),
            limit: Some(3),
            ..JournalQuery::default()
        });
        assert_eq!(out.len(), 3);
        assert!(out.iter().all(|r| r.trigger == Trigger::DaypartingSweep));
    }

    #[test]
    fn test_fifo_eviction_at_capacity() {
        let journal = ChangeJournal::new(3);
        let brand = Uuid::new_v4();
        for hour in 0..5 {
            journal.emit(&record(Uuid::new_v4(), brand, Trigger::Spend, hour));
        }

        let out = journal.query(&JournalQuery::default());
        assert_eq!(out.len(), 3);
        // Hours 0 and 1 were evicted; newest first leaves 4, 3, 2.
        assert_eq!(out[0].at.format("%H").to_string(), "04");
        assert_eq!(out[2].at.format("%H").to_string(), "02");
    }

    #[test]
    fn test_export_round_trips_through_with_records() {
        let journal = ChangeJournal::new(10);
        let brand = Uuid::new_v4();
        journal.emit(&record(Uuid::new_v4(), brand, Trigger::Spend, 1));
        journal.emit(&record(Uuid::new_v4(), brand, Trigger::MonthlyReset, 2));

        let exported = journal.export();
        let rebuilt = ChangeJournal::with_records(10, exported.clone());
        assert_eq!(rebuilt.export(), exported);
    }

    #[test]
    fn test_with_records_drops_oldest_beyond_capacity() {
        let brand = Uuid::new_v4();
        let records: Vec<ChangeRecord> = (0..6)
            .map(|hour| record(Uuid::new_v4(), brand, Trigger::Spend, hour))
            .collect();
        let journal = ChangeJournal::with_records(4, records);
        assert_eq!(journal.len(), 4);
        let out = journal.query(&JournalQuery::default());
        assert_eq!(out[0].at.format("%H").to_string(), "05");
    }

    #[test]
    fn test_serde_uses_snake_case_tags() {
        let rec = record(Uuid::new_v4(), Uuid::new_v4(), Trigger::BudgetSweep, 1);
        let json = serde_json::to_string(&rec).unwrap();
        assert!(json.contains("\"budget_sweep\""));
        assert!(json.contains("\"schedule_match\""));
        let back: ChangeRecord = serde_json::from_str(&json).unwrap();
        assert_eq!(back, rec);
    }
}
