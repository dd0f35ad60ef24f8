//! Random spend traffic for demos and soak runs.
//!
//! Each round picks the campaigns that are currently active and inside a
//! dayparting window, then records one random spend amount against each
//! through the normal spend entry point, so budget breaches deactivate
//! brands exactly as production traffic would.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use rand::Rng;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use tokio::sync::Notify;

use adgate_core::config::SimConfig;
use adgate_core::CampaignId;

use crate::reconciler::Reconciler;
use crate::schedule::ScheduleSet;
use crate::store::{BrandTx, CampaignStore, StoreError};

/// What one traffic round did.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct RoundSummary {
    /// Campaigns that were active and in-window when the round started.
    pub candidates: usize,
    /// Spend records successfully appended.
    pub recorded: usize,
    /// Campaign deactivations caused by this round's spend.
    pub deactivated: usize,
}

/// Run one traffic round at `now`.
///
/// Candidate selection holds each brand lock only long enough to read;
/// recording then goes through [`Reconciler::record_spend`] one campaign
/// at a time.
pub fn run_round<S: CampaignStore>(
    reconciler: &Reconciler<S>,
    config: &SimConfig,
    now: DateTime<Utc>,
) -> Result<RoundSummary, StoreError> {
    let store = reconciler.store();

    let mut candidates: Vec<CampaignId> = Vec::new();
    for brand_id in store.brand_ids()? {
        let tx = match store.begin_brand(brand_id) {
            Ok(tx) => tx,
            Err(error) => {
                tracing::warn!(brand_id = %brand_id, %error, "skipping brand this round");
                continue;
            }
        };
        for campaign in tx.campaigns() {
            if campaign.is_active && ScheduleSet::new(&campaign.windows).matches(now) {
                candidates.push(campaign.id);
            }
        }
    }

    let mut summary = RoundSummary {
        candidates: candidates.len(),
        ..RoundSummary::default()
    };

    let mut rng = rand::thread_rng();
    for campaign_id in candidates {
        let amount = random_amount(&mut rng, config.min_amount, config.max_amount);
        match reconciler.record_spend(campaign_id, amount, now) {
            Ok(outcome) => {
                summary.recorded += 1;
                summary.deactivated += outcome.changes.len();
            }
            Err(error) => {
                tracing::warn!(campaign_id = %campaign_id, %error, "spend not recorded");
            }
        }
    }

    Ok(summary)
}

/// Interval loop calling [`run_round`] until `shutdown` is notified.
pub async fn run_sim_loop<S>(
    reconciler: Arc<Reconciler<S>>,
    config: SimConfig,
    shutdown: Arc<Notify>,
) where
    S: CampaignStore + Send + Sync + 'static,
{
    tracing::info!(
        interval_secs = config.interval_secs,
        min = %config.min_amount,
        max = %config.max_amount,
        "traffic simulator started"
    );
    let mut ticker = tokio::time::interval(Duration::from_secs(config.interval_secs.max(1)));

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                let rec = reconciler.clone();
                let cfg = config.clone();
                let joined =
                    tokio::task::spawn_blocking(move || run_round(&rec, &cfg, Utc::now())).await;
                match joined {
                    Ok(Ok(summary)) => tracing::info!(
                        candidates = summary.candidates,
                        recorded = summary.recorded,
                        deactivated = summary.deactivated,
                        "traffic round complete"
                    ),
                    Ok(Err(error)) => tracing::warn!(%error, "traffic round failed"),
                    Err(join_error) => tracing::warn!("traffic task panicked: {join_error}"),
                }
            }
            _ = shutdown.notified() => {
                tracing::info!("traffic simulator stopped");
                return;
            }
        }
    }
}

/// Random amount in whole cents within `[min, max]`.
fn random_amount(rng: &mut impl Rng, min: Decimal, max: Decimal) -> Decimal {
    let cents = Decimal::new(100, 0);
    let min_cents = (min * cents).to_i64().unwrap_or(1).max(1);
    let max_cents = (max * cents).to_i64().unwrap_or(min_cents).max(min_cents);
    Decimal::new(rng.gen_range(min_cents..=max_cents), 2)
}

#[cfg(test)]
mod tests {
    use super::*;
    use adgate_core::{Brand, BrandId, Campaign, DaypartWindow, TimeWindow};
    use chrono::TimeZone;
    use rust_decimal_macros::dec;

    use crate::events::NullSink;
    use crate::store::memory::MemoryStore;

    fn monday_ten() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 9, 10, 0, 0).unwrap()
    }

    fn sim_config(amount: Decimal) -> SimConfig {
        SimConfig {
            interval_secs: 60,
            min_amount: amount,
            max_amount: amount,
        }
    }

    fn seeded(active: bool, windows: &[(u8, u8, u8)]) -> (Reconciler<MemoryStore>, BrandId, CampaignId) {
        let store = MemoryStore::new();
        let brand = Brand::new("acme", dec!(100), dec!(1000)).unwrap();
        let brand_id = brand.id;
        store.insert_brand(brand).unwrap();
        let mut campaign = Campaign::new(brand_id, "sim-target");
        for &(day, start, end) in windows {
            campaign.add_window(DaypartWindow::new(day, start, end).unwrap()).unwrap();
        }
        let campaign_id = campaign.id;
        store.insert_campaign(campaign).unwrap();
        if active {
            store.set_active(campaign_id, true).unwrap();
        }
        (Reconciler::new(Arc::new(store), Arc::new(NullSink)), brand_id, campaign_id)
    }

    #[test]
    fn round_records_spend_for_active_in_window_campaigns() {
        let (rec, brand_id, _) = seeded(true, &[(0, 0, 24)]);

        let summary = run_round(&rec, &sim_config(dec!(2)), monday_ten()).unwrap();
        assert_eq!(
            summary,
            RoundSummary {
                candidates: 1,
                recorded: 1,
                deactivated: 0
            }
        );

        let tx = rec.store().begin_brand(brand_id).unwrap();
        let daily = tx.spend_within(&TimeWindow::calendar_day(monday_ten())).unwrap();
        assert_eq!(daily, dec!(2));
    }

    #[test]
    fn round_skips_inactive_campaigns() {
        let (rec, _, _) = seeded(false, &[(0, 0, 24)]);
        let summary = run_round(&rec, &sim_config(dec!(2)), monday_ten()).unwrap();
        assert_eq!(summary.candidates, 0);
        assert_eq!(summary.recorded, 0);
    }

    #[test]
    fn round_skips_out_of_window_campaigns() {
        // Monday 9-17 window, but the round runs at 18:00.
        let (rec, _, _) = seeded(true, &[(0, 9, 17)]);
        let six_pm = Utc.with_ymd_and_hms(2026, 3, 9, 18, 0, 0).unwrap();
        let summary = run_round(&rec, &sim_config(dec!(2)), six_pm).unwrap();
        assert_eq!(summary.candidates, 0);
    }

    #[test]
    fn breaching_round_deactivates_and_later_rounds_go_quiet() {
        let (rec, _, campaign_id) = seeded(true, &[(0, 0, 24)]);
        let config = sim_config(dec!(60));

        let first = run_round(&rec, &config, monday_ten()).unwrap();
        assert_eq!(first.recorded, 1);
        assert_eq!(first.deactivated, 0);

        // Second round pushes the daily total to 120 over a 100 cap.
        let second = run_round(&rec, &config, monday_ten()).unwrap();
        assert_eq!(second.recorded, 1);
        assert_eq!(second.deactivated, 1);

        let third = run_round(&rec, &config, monday_ten()).unwrap();
        assert_eq!(third.candidates, 0);

        let tx = rec.store().begin_brand(rec.store().brand_ids().unwrap()[0]).unwrap();
        assert!(!tx.campaigns().iter().find(|c| c.id == campaign_id).unwrap().is_active);
    }

    #[test]
    fn amounts_are_whole_cents_within_range() {
        let mut rng = rand::thread_rng();
        for _ in 0..200 {
            let amount = random_amount(&mut rng, dec!(1), dec!(50));
            assert!(amount >= dec!(1) && amount <= dec!(50));
            assert_eq!(amount, amount.round_dp(2));
            assert_eq!(amount * dec!(100), (amount * dec!(100)).round_dp(0));
        }
    }

    #[test]
    fn degenerate_range_falls_back_to_the_minimum() {
        let mut rng = rand::thread_rng();
        // max below min collapses to min.
        let amount = random_amount(&mut rng, dec!(5), dec!(1));
        assert_eq!(amount, dec!(5));
    }
}
