#![forbid(unsafe_code)]

use bazi_kernel_contracts::chart::RulesetId;
use bazi_kernel_contracts::ganzhi::StateLevel;
use bazi_kernel_contracts::ruleset::{defaults, DelingPolicy, RulesetBundle};
use bazi_storage::repo::RulesetStore;
use bazi_storage::{tables, MemoryChartStore, SqliteChartStore, StorageError};

fn score_min_bundle(id: &str, score_min: f64) -> RulesetBundle {
    let mut b = RulesetBundle::empty(RulesetId::new(id).unwrap());
    b.deling_policy = Some(DelingPolicy {
        state_thresholds: vec![],
        score_min: Some(score_min),
    });
    b.root_level_bands = Some(defaults::root_level_bands());
    b
}

fn exercise(store: &mut dyn RulesetStore) {
    let strict = score_min_bundle("strict", 0.8);
    store.put_ruleset(&strict).unwrap();
    store
        .put_ruleset(&RulesetBundle::empty(RulesetId::new("bare").unwrap()))
        .unwrap();

    let back = store.get_ruleset(&strict.ruleset_id).unwrap().unwrap();
    assert_eq!(back, strict);
    let resolved = back.resolve();
    assert_eq!(resolved.deling_policy.score_min, Some(0.8));
    assert!(resolved.defaulted_tables.contains(&"hanzao"));
    assert!(!resolved.defaulted_tables.contains(&"root_level_bands"));

    let ids: Vec<String> = store
        .ruleset_ids()
        .unwrap()
        .iter()
        .map(|id| id.as_str().to_string())
        .collect();
    assert_eq!(ids, vec!["bare".to_string(), "strict".to_string()]);

    // Overwrite in place.
    let mut replaced = strict.clone();
    replaced.deling_policy = Some(DelingPolicy {
        state_thresholds: vec![StateLevel::Wang],
        score_min: None,
    });
    store.put_ruleset(&replaced).unwrap();
    assert_eq!(
        store.get_ruleset(&strict.ruleset_id).unwrap(),
        Some(replaced)
    );
    assert_eq!(
        store
            .get_ruleset(&RulesetId::new("absent").unwrap())
            .unwrap(),
        None
    );
}

#[test]
fn at_ruleset_db_01_memory_store_round_trip() {
    exercise(&mut MemoryChartStore::new_in_memory());
}

#[test]
fn at_ruleset_db_02_sqlite_store_round_trip() {
    exercise(&mut SqliteChartStore::open_in_memory().unwrap());
}

#[test]
fn at_ruleset_db_03_out_of_range_bundle_is_rejected() {
    let mut s = MemoryChartStore::new_in_memory();
    let err = s.put_ruleset(&score_min_bundle("bad", 1.5)).unwrap_err();
    assert!(matches!(err, StorageError::ContractViolation(_)));
    assert!(s.ruleset_ids().unwrap().is_empty());
}

#[test]
fn at_ruleset_db_04_unprovisioned_rulesets_table() {
    let mut s = MemoryChartStore::new_in_memory().without_table(tables::RULESETS);
    assert!(s
        .put_ruleset(&score_min_bundle("strict", 0.8))
        .unwrap_err()
        .is_table_missing());
}
