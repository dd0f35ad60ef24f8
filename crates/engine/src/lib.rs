//! Campaign status reconciliation engine.
//!
//! This crate provides:
//! - A pure decision function deriving a campaign's active state from
//!   budget aggregates, dayparting schedules, and an injected clock
//! - A reconciler applying that decision over brand populations,
//!   writing only the deltas and emitting one change record per flip
//! - A cron-driven sweep timetable and background worker loop
//! - An in-memory store with per-brand transactional writes
//! - A spend traffic simulator and YAML scenario seeding

pub mod beat;
pub mod decision;
pub mod error;
pub mod events;
pub mod ledger;
pub mod reconciler;
pub mod runner;
pub mod scenario;
pub mod schedule;
pub mod sim;
pub mod store;

pub use error::EngineError;
pub use events::{ChangeRecord, ChangeSink, Reason, Trigger};
pub use reconciler::{Reconciler, SweepReport};
pub use store::memory::MemoryStore;
