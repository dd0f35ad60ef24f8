//! Verifies the shipped demo scenario parses, seeds a store, and
//! reconciles the way its schedules say it should.

use std::sync::Arc;

use chrono::{DateTime, TimeZone, Utc};

use adgate_engine::events::NullSink;
use adgate_engine::scenario;
use adgate_engine::store::{BrandTx, CampaignStore};
use adgate_engine::{MemoryStore, Reconciler};

/// Resolve the scenario file relative to the workspace root.
/// Integration tests run from the crate directory, so we go up two levels.
fn demo_path() -> std::path::PathBuf {
    let manifest = std::path::Path::new(env!("CARGO_MANIFEST_DIR"));
    manifest.join("../../data/scenarios/demo.yml")
}

fn demo_store() -> MemoryStore {
    let scenario = scenario::from_path(&demo_path())
        .unwrap_or_else(|e| panic!("failed to load {}: {}", demo_path().display(), e));
    scenario::build_store(&scenario).expect("demo scenario must seed cleanly")
}

fn active_names(store: &MemoryStore) -> Vec<String> {
    let mut names = Vec::new();
    for brand_id in store.brand_ids().unwrap() {
        let tx = store.begin_brand(brand_id).unwrap();
        for campaign in tx.campaigns() {
            if campaign.is_active {
                names.push(campaign.name.clone());
            }
        }
    }
    names.sort();
    names
}

#[test]
fn parse_demo_scenario() {
    let scenario = scenario::from_path(&demo_path()).unwrap();
    assert_eq!(scenario.name, "demo");
    assert_eq!(scenario.brands.len(), 2);

    let northwind = &scenario.brands[0];
    assert_eq!(northwind.name, "northwind");
    assert_eq!(northwind.campaigns.len(), 2);
    assert_eq!(northwind.campaigns[0].windows.len(), 7);

    let solstice = &scenario.brands[1];
    assert_eq!(solstice.campaigns[1].name, "paused");
    assert!(solstice.campaigns[1].windows.is_empty());

    // Everything seeds dark; the first sweep decides real states.
    let store = scenario::build_store(&scenario).unwrap();
    assert!(active_names(&store).is_empty());
}

#[test]
fn demo_schedules_drive_the_expected_states() {
    // 2026-03-09 is a Monday, 2026-03-14 a Saturday.
    let monday_ten: DateTime<Utc> = Utc.with_ymd_and_hms(2026, 3, 9, 10, 0, 0).unwrap();
    let saturday_seven_pm: DateTime<Utc> = Utc.with_ymd_and_hms(2026, 3, 14, 19, 0, 0).unwrap();

    let rec = Reconciler::new(Arc::new(demo_store()), Arc::new(NullSink));

    let report = rec.reconcile_dayparting(monday_ten).unwrap();
    assert!(report.is_clean());
    assert_eq!(active_names(rec.store()), vec!["always-on", "weekday-mornings"]);

    let report = rec.reconcile_dayparting(saturday_seven_pm).unwrap();
    assert!(report.is_clean());
    assert_eq!(active_names(rec.store()), vec!["always-on", "weekend-evenings"]);
}
