#![forbid(unsafe_code)]

use bazi_engines::deling::DelingRuntime;
use bazi_engines::geju::{GejuConfig, GejuRuntime};
use bazi_engines::hanzao::HanZaoRuntime;
use bazi_engines::relation::RelationRuntime;
use bazi_engines::rootqi::{RootQiConfig, RootQiRuntime, TongGenRuntime, TouGanRuntime};
use bazi_engines::strength::{StrengthConfig, StrengthInputs, StrengthRuntime};
use bazi_engines::yongshen::YongShenRuntime;
use bazi_kernel_contracts::chart::{CalcVersion, ChartId, FourPillars, RulesetId};
use bazi_kernel_contracts::ruleset::Ruleset;
use bazi_kernel_contracts::yongshen::YongShenOutcome;
use bazi_storage::repo::{
    DelingRepo, GejuRepo, HanZaoRepo, RootQiRepo, TongGenRepo, TouGanRepo, YongShenRepo,
};
use bazi_storage::{tables, MemoryChartStore, StorageError};

const CHART_TEXT: &str = "甲子,丙子,甲寅,丙寅";

fn chart() -> ChartId {
    ChartId::new("dbw_chart_1").unwrap()
}

fn pillars() -> FourPillars {
    FourPillars::parse(CHART_TEXT).unwrap()
}

fn ruleset() -> Ruleset {
    Ruleset::builtin_default(RulesetId::default())
}

fn yongshen(calc_version: &CalcVersion) -> YongShenOutcome {
    let strength = StrengthRuntime::new(StrengthConfig::mvp_v1())
        .run(&chart(), &pillars(), StrengthInputs::default())
        .unwrap();
    YongShenRuntime::new()
        .run(
            &chart(),
            calc_version,
            &strength,
            None,
            None,
            &ruleset().yongshen,
        )
        .unwrap()
}

#[test]
fn at_mem_db_01_deling_upsert_twice_keeps_one_row_set() {
    let mut s = MemoryChartStore::new_in_memory();
    let out = DelingRuntime::new()
        .run(&chart(), &pillars(), &ruleset())
        .unwrap();
    s.save_deling_outcome(&out).unwrap();
    let first = s.element_state_rows(&chart(), &RulesetId::default()).unwrap();
    s.save_deling_outcome(&out).unwrap();
    let second = s.element_state_rows(&chart(), &RulesetId::default()).unwrap();

    assert_eq!(first.len(), 5);
    assert_eq!(first, second);
    assert_eq!(
        s.deling_result_row(&chart(), &RulesetId::default()).unwrap(),
        Some(out.result)
    );
}

#[test]
fn at_mem_db_02_rootqi_recompute_replaces_prior_rows() {
    let mut s = MemoryChartStore::new_in_memory();
    let rs = ruleset();
    let first = RootQiRuntime::new(RootQiConfig::mvp_v1())
        .run(&chart(), &pillars(), None, &rs.root_level_bands)
        .unwrap();
    s.replace_rootqi_rows(&chart(), &first).unwrap();
    s.replace_rootqi_rows(&chart(), &first).unwrap();
    assert_eq!(s.rootqi_detail_rows(&chart()).unwrap(), first.details);

    let other = FourPillars::parse("庚申,辛酉,庚申,辛酉").unwrap();
    let second = RootQiRuntime::new(RootQiConfig::mvp_v1())
        .run(&chart(), &other, None, &rs.root_level_bands)
        .unwrap();
    s.replace_rootqi_rows(&chart(), &second).unwrap();
    assert_eq!(s.rootqi_detail_rows(&chart()).unwrap(), second.details);
    assert_eq!(s.rootqi_summary_rows(&chart()).unwrap().len(), 4);
}

#[test]
fn at_mem_db_03_missing_summary_table_blocks_the_whole_hanzao_write() {
    let mut s = MemoryChartStore::new_in_memory().without_table(tables::HANZAO_SUMMARY);
    let out = HanZaoRuntime::new()
        .run(&chart(), &pillars(), &ruleset())
        .unwrap();
    let err = s.replace_hanzao_rows(&out).unwrap_err();
    assert!(matches!(
        err,
        StorageError::TableMissing { ref table } if table == tables::HANZAO_SUMMARY
    ));
    assert!(s.hanzao_detail_rows(&chart()).unwrap().is_empty());
    assert!(!s.has_table(tables::HANZAO_SUMMARY));
}

#[test]
fn at_mem_db_04_yongshen_rows_are_keyed_by_calc_version() {
    let mut s = MemoryChartStore::new_in_memory();
    let v1 = CalcVersion::default();
    let v2 = CalcVersion::new("v2").unwrap();
    s.replace_yongshen_rows(&yongshen(&v1)).unwrap();
    s.replace_yongshen_rows(&yongshen(&v2)).unwrap();
    s.replace_yongshen_rows(&yongshen(&v2)).unwrap();

    assert_eq!(s.element_score_rows(&chart(), &v1).unwrap().len(), 5);
    assert_eq!(s.element_score_rows(&chart(), &v2).unwrap().len(), 5);
    assert!(s.yongshen_result_row(&chart(), &v2).unwrap().is_some());
}

#[test]
fn at_mem_db_05_geju_rows_round_trip() {
    let mut s = MemoryChartStore::new_in_memory();
    let p = pillars();
    let relations = RelationRuntime::new().run(&p).unwrap();
    let out = GejuRuntime::new(GejuConfig::mvp_v1())
        .run(&chart(), &p, &relations, None)
        .unwrap();
    s.replace_geju_rows(&out).unwrap();
    s.replace_geju_rows(&out).unwrap();
    assert_eq!(s.geju_candidate_rows(&chart()).unwrap(), out.candidates);
    assert_eq!(s.geju_formation_rows(&chart()).unwrap(), out.formations);
    assert_eq!(s.geju_summary_row(&chart()).unwrap(), Some(out.summary));
}

#[test]
fn at_mem_db_06_tonggen_and_tougan_replace_per_chart() {
    let mut s = MemoryChartStore::new_in_memory();
    let tong = TongGenRuntime::new().run(&chart(), &pillars()).unwrap();
    let tou = TouGanRuntime::new().run(&chart(), &pillars()).unwrap();
    s.replace_tonggen_rows(&tong).unwrap();
    s.replace_tonggen_rows(&tong).unwrap();
    s.replace_tougan_rows(&tou).unwrap();
    assert_eq!(s.tonggen_rows(&chart()).unwrap(), tong.details);
    assert_eq!(s.tougan_rows(&chart()).unwrap(), tou.details);

    let mut s = s.without_table(tables::TOUGAN_DETAIL);
    assert!(s.replace_tougan_rows(&tou).unwrap_err().is_table_missing());
    assert!(s.tougan_rows(&chart()).unwrap_err().is_table_missing());
}

#[test]
fn at_mem_db_07_inconsistent_tonggen_and_tougan_rows_are_refused() {
    let mut s = MemoryChartStore::new_in_memory();
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
