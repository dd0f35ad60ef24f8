//! Async driver for the scheduled sweeps.
//!
//! The worker binary runs [`run_sweep_loop`]: a tick loop that asks the
//! timetable which sweeps are due and executes them on blocking threads
//! (brand locks and the reconciler are synchronous). Transient failures
//! are retried with bounded attempts and a fixed backoff; a sweep that
//! still fails keeps its due mark so the next tick picks it up again.
//! Sweeps are idempotent, so re-running one is always safe.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::Notify;

use adgate_core::config::RunnerConfig;
use adgate_core::BrandId;

use crate::beat::{SweepKind, SweepTimetable};
use crate::reconciler::{Reconciler, SweepReport};
use crate::store::{CampaignStore, StoreError};

/// Run one sweep kind through the reconciler.
pub fn dispatch<S: CampaignStore>(
    reconciler: &Reconciler<S>,
    kind: SweepKind,
    now: DateTime<Utc>,
) -> Result<SweepReport, StoreError> {
    match kind {
        SweepKind::Budget => reconciler.reconcile_budgets(now),
        SweepKind::Dayparting => reconciler.reconcile_dayparting(now),
        SweepKind::DailyReset => reconciler.reconcile_daily_reset(now),
        SweepKind::MonthlyReset => reconciler.reconcile_monthly_reset(now),
    }
}

/// Run one sweep kind over an explicit set of brands.
pub fn dispatch_for<S: CampaignStore>(
    reconciler: &Reconciler<S>,
    kind: SweepKind,
    brands: &[BrandId],
    now: DateTime<Utc>,
) -> SweepReport {
    match kind {
        SweepKind::Budget => reconciler.reconcile_budgets_for(brands, now),
        SweepKind::Dayparting => reconciler.reconcile_dayparting_for(brands, now),
        SweepKind::DailyReset => reconciler.reconcile_daily_reset_for(brands, now),
        SweepKind::MonthlyReset => reconciler.reconcile_monthly_reset_for(brands, now),
    }
}

/// Tick loop driving all four sweeps until `shutdown` is notified.
pub async fn run_sweep_loop<S>(
    reconciler: Arc<Reconciler<S>>,
    mut timetable: SweepTimetable,
    config: RunnerConfig,
    shutdown: Arc<Notify>,
) where
    S: CampaignStore + Send + Sync + 'static,
{
    for kind in SweepKind::ALL {
        tracing::info!(sweep = %kind, cron = timetable.expression(kind), "sweep scheduled");
    }

    let mut ticker =
        tokio::time::interval(Duration::from_secs(config.tick_interval_secs.max(1)));

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                let now = Utc::now();
                let due = timetable.due(now);
                if due.is_empty() {
                    tracing::debug!(%now, "sweep tick: nothing due");
                    continue;
                }
                for kind in due {
                    if run_sweep(&reconciler, kind, now, &config).await {
                        timetable.record_run(kind, now);
                    }
                }
            }
            _ = shutdown.notified() => {
                tracing::info!("sweep loop stopped");
                return;
            }
        }
    }
}

/// Execute one sweep with bounded retries.
///
/// Returns whether the sweep completed and should be marked as run. A
/// sweep that failed outright stays due and is retried on the next tick.
async fn run_sweep<S>(
    reconciler: &Arc<Reconciler<S>>,
    kind: SweepKind,
    now: DateTime<Utc>,
    config: &RunnerConfig,
) -> bool
where
    S: CampaignStore + Send + Sync + 'static,
{
    let backoff = Duration::from_millis(config.retry_backoff_ms);

    // Whole-sweep attempts cover brand-listing failures.
    let mut attempt = 0;
    let report = loop {
        let rec = reconciler.clone();
        let joined = tokio::task::spawn_blocking(move || dispatch(&rec, kind, now)).await;
        match joined {
            Ok(Ok(report)) => break report,
            Ok(Err(error)) if error.is_transient() && attempt < config.retry_attempts => {
                attempt += 1;
                tracing::warn!(sweep = %kind, %error, attempt, "sweep failed, retrying");
                tokio::time::sleep(backoff).await;
            }
            Ok(Err(error)) => {
                tracing::warn!(sweep = %kind, %error, "sweep failed");
                return false;
            }
            Err(join_error) => {
                tracing::warn!(sweep = %kind, "sweep task panicked: {join_error}");
                return false;
            }
        }
    };

    // Per-brand retries for brands that failed transiently inside an
    // otherwise successful sweep.
    let mut failed = report.transient_failures();
    let mut attempt = 0;
    while !failed.is_empty() && attempt < config.retry_attempts {
        attempt += 1;
        tokio::time::sleep(backoff).await;
        let rec = reconciler.clone();
        let brands = failed.clone();
        let joined =
            tokio::task::spawn_blocking(move || dispatch_for(&rec, kind, &brands, now)).await;
        match joined {
            Ok(retry_report) => failed = retry_report.transient_failures(),
            Err(join_error) => {
                tracing::warn!(sweep = %kind, "brand retry task panicked: {join_error}");
                break;
            }
        }
    }
    if !failed.is_empty() {
        tracing::warn!(
            sweep = %kind,
            brands = failed.len(),
            attempts = config.retry_attempts,
            "giving up on failed brands until the next tick"
        );
    }
    true
}
