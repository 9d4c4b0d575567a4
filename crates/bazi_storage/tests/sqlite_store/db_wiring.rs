#![forbid(unsafe_code)]

use bazi_engines::deling::DelingRuntime;
use bazi_engines::hanzao::HanZaoRuntime;
use bazi_engines::rootqi::{RootQiConfig, RootQiRuntime, TongGenRuntime, TouGanRuntime};
use bazi_engines::strength::{StrengthConfig, StrengthInputs, StrengthRuntime};
use bazi_engines::yongshen::YongShenRuntime;
use bazi_kernel_contracts::chart::{CalcVersion, ChartId, FourPillars, RulesetId};
use bazi_kernel_contracts::ruleset::Ruleset;
use bazi_storage::repo::{
    DelingRepo, HanZaoRepo, RootQiRepo, TongGenRepo, TouGanRepo, YongShenRepo,
};
use bazi_storage::sqlite::SCHEMA_VERSION;
use bazi_storage::{tables, SqliteChartStore, StorageError};
use tempfile::tempdir;

fn chart() -> ChartId {
    ChartId::new("dbw_sqlite_chart").unwrap()
}

fn pillars() -> FourPillars {
    FourPillars::parse("甲子,丙子,甲寅,丙寅").unwrap()
}

fn ruleset() -> Ruleset {
    Ruleset::builtin_default(RulesetId::default())
}

#[test]
fn at_sqlite_db_01_open_migrates_every_table() {
    let dir = tempdir().unwrap();
    let s = SqliteChartStore::open(dir.path().join("charts.db")).unwrap();
    assert_eq!(s.schema_version(), SCHEMA_VERSION);
    for t in tables::ALL {
        assert!(s.has_table(t).unwrap(), "missing {t}");
    }
}

#[test]
fn at_sqlite_db_02_rows_survive_reopen() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("charts.db");
    let out = DelingRuntime::new()
        .run(&chart(), &pillars(), &ruleset())
        .unwrap();
    {
        let mut s = SqliteChartStore::open(&path).unwrap();
        s.save_deling_outcome(&out).unwrap();
    }
    let mut s = SqliteChartStore::open(&path).unwrap();
    assert_eq!(s.migrate().unwrap(), SCHEMA_VERSION);
    assert_eq!(
        s.deling_result_row(&chart(), &RulesetId::default()).unwrap(),
        Some(out.result)
    );
    assert_eq!(
        s.element_state_rows(&chart(), &RulesetId::default()).unwrap(),
        out.snapshot
    );
}

#[test]
fn at_sqlite_db_03_repeated_saves_are_idempotent() {
    let mut s = SqliteChartStore::open_in_memory().unwrap();
    let rootqi = RootQiRuntime::new(RootQiConfig::mvp_v1())
        .run(&chart(), &pillars(), None, &ruleset().root_level_bands)
        .unwrap();
    let tong = TongGenRuntime::new().run(&chart(), &pillars()).unwrap();
    for _ in 0..2 {
        s.replace_rootqi_rows(&chart(), &rootqi).unwrap();
        s.replace_tonggen_rows(&tong).unwrap();
    }
    assert_eq!(s.rootqi_detail_rows(&chart()).unwrap(), rootqi.details);
    assert_eq!(s.rootqi_summary_rows(&chart()).unwrap(), rootqi.summaries);
    assert_eq!(s.tonggen_rows(&chart()).unwrap(), tong.details);

    let count: i64 = s
        .conn()
        .query_row(
            "SELECT COUNT(*) FROM bazi_tonggen_detail WHERE chart_id = ?1",
            [chart().as_str()],
            |row| row.get(0),
        )
        .unwrap();
    assert_eq!(count as usize, tong.details.len());
}

#[test]
fn at_sqlite_db_04_dropped_table_reports_table_missing() {
    let mut s = SqliteChartStore::open_in_memory().unwrap();
    s.drop_table(tables::HANZAO_SUMMARY).unwrap();
    let out = HanZaoRuntime::new()
        .run(&chart(), &pillars(), &ruleset())
        .unwrap();
    let err = s.replace_hanzao_rows(&out).unwrap_err();
    assert!(matches!(
        err,
        StorageError::TableMissing { ref table } if table == tables::HANZAO_SUMMARY
    ));
    // The detail insert ran inside the same transaction and was rolled back.
    assert!(s.hanzao_detail_rows(&chart()).unwrap().is_empty());
}

#[test]
fn at_sqlite_db_05_failed_replace_keeps_previous_rows() {
    let mut s = SqliteChartStore::open_in_memory().unwrap();
    let rootqi = RootQiRuntime::new(RootQiConfig::mvp_v1())
        .run(&chart(), &pillars(), None, &ruleset().root_level_bands)
        .unwrap();
    s.replace_rootqi_rows(&chart(), &rootqi).unwrap();
    s.drop_table(tables::ROOTQI_SUMMARY).unwrap();

    let err = s.replace_rootqi_rows(&chart(), &rootqi).unwrap_err();
    assert!(err.is_table_missing());
    assert_eq!(s.rootqi_detail_rows(&chart()).unwrap(), rootqi.details);
}

#[test]
fn at_sqlite_db_06_yongshen_scores_read_back_in_element_order() {
    let mut s = SqliteChartStore::open_in_memory().unwrap();
    let strength = StrengthRuntime::new(StrengthConfig::mvp_v1())
        .run(&chart(), &pillars(), StrengthInputs::default())
        .unwrap();
    let out = YongShenRuntime::new()
        .run(
            &chart(),
            &CalcVersion::default(),
            &strength,
            None,
            None,
            &ruleset().yongshen,
        )
        .unwrap();
    s.replace_yongshen_rows(&out).unwrap();
    s.replace_yongshen_rows(&out).unwrap();
    assert_eq!(
        s.element_score_rows(&chart(), &CalcVersion::default())
            .unwrap(),
        out.scores
    );
    assert_eq!(
        s.yongshen_result_row(&chart(), &CalcVersion::default())
            .unwrap(),
        Some(out.result)
    );
}

#[test]
fn at_sqlite_db_07_inconsistent_tonggen_and_tougan_rows_are_refused() {
    let mut s = SqliteChartStore::open_in_memory().unwrap();
    let tong = TongGenRuntime::new().run(&chart(), &pillars()).unwrap();
    let tou = TouGanRuntime::new().run(&chart(), &pillars()).unwrap();
    s.replace_tonggen_rows(&tong).unwrap();
    s.replace_tougan_rows(&tou).unwrap();

    let mut bad_tong = tong.clone();
    bad_tong.details[0].is_root = !bad_tong.details[0].is_root;
    let err = s.replace_tonggen_rows(&bad_tong).unwrap_err();
    assert!(matches!(err, StorageError::ContractViolation(_)));
    assert_eq!(s.tonggen_rows(&chart()).unwrap(), tong.details);

    let mut bad_tou = tou.clone();
    bad_tou.details[0].is_exposed = !bad_tou.details[0].is_exposed;
    let err = s.replace_tougan_rows(&bad_tou).unwrap_err();
    assert!(matches!(err, StorageError::ContractViolation(_)));
    assert_eq!(s.tougan_rows(&chart()).unwrap(), tou.details);
}
