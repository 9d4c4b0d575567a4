#![forbid(unsafe_code)]

use bazi_kernel_contracts::chart::{ChartId, FourPillars, RulesetId};
use bazi_kernel_contracts::ganzhi::{Branch, Element, StateLevel, Stem};
use bazi_kernel_contracts::profile::{ProjectionKind, ProjectionPillar, ProjectionStatus};
use bazi_kernel_contracts::ruleset::{defaults, DelingPolicy, RulesetBundle};
use bazi_kernel_contracts::strength::BodyState;
use bazi_os::config::{PersistencePolicies, PersistencePolicy};
use bazi_os::error::reason_codes;
use bazi_os::{
    ChartPipeline, ChartReport, ChartRequest, PipelineConfig, RulesetSource, Stage, StageStatus,
};
use bazi_storage::repo::{
    DelingRepo, GejuRepo, HanZaoRepo, RootQiRepo, RulesetStore, YongShenRepo,
};
use bazi_storage::{tables, MemoryChartStore, SqliteChartStore};
use tempfile::tempdir;

fn request(chart: &str, text: &str) -> ChartRequest {
    ChartRequest::v1(
        ChartId::new(chart).unwrap(),
        FourPillars::parse(text).unwrap(),
    )
    .unwrap()
}

fn run_memory(
    cfg: PipelineConfig,
    store: MemoryChartStore,
    req: &ChartRequest,
) -> (ChartReport, MemoryChartStore) {
    let mut p = ChartPipeline::new(cfg, store);
    let report = p.run(req).unwrap();
    (report, p.into_store())
}

fn ruleset_id(s: &str) -> RulesetId {
    RulesetId::new(s).unwrap()
}

#[test]
fn at_pipe_01_zi_month_jia_day_rests_without_command() {
    let req = request("scn-a", "甲子,丙子,甲子,甲子");
    let (report, store) = run_memory(
        PipelineConfig::mvp_v1(),
        MemoryChartStore::new_in_memory(),
        &req,
    );

    let deling = report.deling.as_ref().unwrap();
    assert_eq!(deling.day_master_element, Element::Wood);
    assert_eq!(deling.day_master_state, StateLevel::Xiu);
    assert!(!deling.is_deling);
    assert_eq!(report.status_of(Stage::Deling), Some(StageStatus::Completed));

    let stored = store
        .deling_result_row(&req.chart_id, &RulesetId::default())
        .unwrap()
        .unwrap();
    assert_eq!(&stored, deling);
    assert_eq!(
        store
            .element_state_rows(&req.chart_id, &RulesetId::default())
            .unwrap()
            .len(),
        5
    );
}

#[test]
fn at_pipe_02_four_jia_stems_are_strong() {
    let req = request("scn-b", "甲子,甲子,甲子,甲子");
    let (report, _) = run_memory(
        PipelineConfig::mvp_v1(),
        MemoryChartStore::new_in_memory(),
        &req,
    );
    let strength = report.strength.as_ref().unwrap();
    assert_eq!(strength.counts.peer, 4);
    assert_eq!(strength.counts.resource, 0);
    assert_eq!(strength.body_state, BodyState::Strong);
    assert_eq!(report.yongshen.as_ref().unwrap().body_state, BodyState::Strong);
    assert_eq!(report.element_scores.len(), 5);
}

#[test]
fn at_pipe_03_ruleset_without_policy_fails_deling_and_writes_nothing() {
    let mut store = MemoryChartStore::new_in_memory();
    let mut bundle = RulesetBundle::empty(ruleset_id("broken"));
    bundle.deling_policy = Some(DelingPolicy::default());
    store.put_ruleset(&bundle).unwrap();

    let req = request("scn-c", "甲子,丙子,甲子,甲子");
    let (report, store) = run_memory(
        PipelineConfig::mvp_v1().with_ruleset(ruleset_id("broken")),
        store,
        &req,
    );

    assert_eq!(report.ruleset_source, RulesetSource::Stored);
    let rec = report.stage(Stage::Deling).unwrap();
    assert_eq!(rec.status, StageStatus::Failed);
    assert_eq!(rec.reason_code, Some(reason_codes::OS_RULESET_MISCONFIGURED));
    assert!(report.deling.is_none());
    assert!(store
        .deling_result_row(&req.chart_id, &ruleset_id("broken"))
        .unwrap()
        .is_none());
    assert!(store
        .element_state_rows(&req.chart_id, &ruleset_id("broken"))
        .unwrap()
        .is_empty());

    // RootQi runs without a season weight; StrengthJudge's own sub-call
    // meets the same misconfiguration and carries on without it.
    assert_eq!(report.status_of(Stage::RootQi), Some(StageStatus::Degraded));
    let strength = report.strength.as_ref().unwrap();
    assert!(strength.deling.is_none());
    assert_eq!(report.status_of(Stage::Strength), Some(StageStatus::Degraded));
}

#[test]
fn at_pipe_04_missing_hanzao_table_is_tolerated_but_deling_table_is_not() {
    let store = MemoryChartStore::new_in_memory()
        .without_table(tables::HANZAO_SUMMARY)
        .without_table(tables::DELING_RESULT);
    let req = request("scn-d", "壬子,壬子,甲子,癸亥");
    let (report, store) = run_memory(PipelineConfig::mvp_v1(), store, &req);

    let hanzao = report.stage(Stage::HanZao).unwrap();
    assert_eq!(hanzao.status, StageStatus::Degraded);
    assert_eq!(hanzao.reason_code, Some(reason_codes::OS_PERSISTENCE_UNAVAILABLE));
    assert!(report.hanzao.is_some());
    assert!(store.hanzao_detail_rows(&req.chart_id).unwrap().is_empty());

    let deling = report.stage(Stage::Deling).unwrap();
    assert_eq!(deling.status, StageStatus::Failed);
    assert_eq!(deling.reason_code, Some(reason_codes::OS_PERSISTENCE_UNAVAILABLE));
    assert!(report.deling.is_none());

    // RootQi no longer sees the verdict, yet StrengthJudge recomputes it.
    assert_eq!(report.status_of(Stage::RootQi), Some(StageStatus::Degraded));
    assert!(!store.rootqi_detail_rows(&req.chart_id).unwrap().is_empty());
    assert_eq!(report.status_of(Stage::Strength), Some(StageStatus::Completed));
    assert!(report.strength.as_ref().unwrap().deling.is_some());
}

#[test]
fn at_pipe_05_propagate_policy_fails_hanzao_and_yongshen_runs_without_it() {
    let mut cfg = PipelineConfig::mvp_v1();
    cfg.persistence = PersistencePolicies::uniform(PersistencePolicy::Propagate);
    let store = MemoryChartStore::new_in_memory().without_table(tables::HANZAO_DETAIL);
    let req = request("scn-e", "壬子,壬子,甲子,癸亥");
    let (report, store) = run_memory(cfg, store, &req);

    assert_eq!(report.status_of(Stage::HanZao), Some(StageStatus::Failed));
    assert!(report.hanzao.is_none());
    assert!(store.hanzao_summary_row(&req.chart_id).unwrap().is_none());

    let ys = report.stage(Stage::YongShen).unwrap();
    assert_eq!(ys.status, StageStatus::Degraded);
    assert_eq!(ys.reason_code, Some(reason_codes::OS_UPSTREAM_ABSENT));
    assert!(ys.message.as_deref().unwrap().contains("han_zao"));
    assert!(report.yongshen.is_some());
}

#[test]
fn at_pipe_06_missing_decision_row_fails_yongshen_and_keeps_earlier_rows() {
    let mut table = defaults::yongshen();
    table.decisions.retain(|d| d.body_state != BodyState::Strong);
    let mut bundle = RulesetBundle::empty(ruleset_id("partial"));
    bundle.yongshen = Some(table);
    let mut store = MemoryChartStore::new_in_memory();
    store.put_ruleset(&bundle).unwrap();

    let cfg = PipelineConfig::mvp_v1().with_ruleset(ruleset_id("partial"));
    let calc_version = cfg.calc_version.clone();
    let req = request("scn-f", "甲子,甲子,甲子,甲子");
    let (report, store) = run_memory(cfg, store, &req);

    let ys = report.stage(Stage::YongShen).unwrap();
    assert_eq!(ys.status, StageStatus::Failed);
    assert_eq!(ys.reason_code, Some(reason_codes::OS_MISSING_DICTIONARY_ROW));
    assert!(report.yongshen.is_none());
    assert!(report.element_scores.is_empty());

    let cons = report.stage(Stage::Consistency).unwrap();
    assert_eq!(cons.status, StageStatus::Skipped);
    assert_eq!(cons.reason_code, Some(reason_codes::OS_UPSTREAM_ABSENT));
    assert_eq!(report.status_of(Stage::TenGodProfile), Some(StageStatus::Completed));

    assert!(store
        .deling_result_row(&req.chart_id, &ruleset_id("partial"))
        .unwrap()
        .is_some());
    assert!(store.hanzao_summary_row(&req.chart_id).unwrap().is_some());
    assert!(store.geju_summary_row(&req.chart_id).unwrap().is_some());
    assert!(store
        .yongshen_result_row(&req.chart_id, &calc_version)
        .unwrap()
        .is_none());
}

#[test]
fn at_pipe_07_sqlite_rerun_leaves_identical_rows() {
    let dir = tempdir().unwrap();
    let store = SqliteChartStore::open(dir.path().join("charts.db")).unwrap();
    let cfg = PipelineConfig::mvp_v1();
    let calc_version = cfg.calc_version.clone();
    let mut p = ChartPipeline::new(cfg, store);
    let req = request("scn-g", "甲子,丙寅,戊辰,庚午");

    let first = p.run(&req).unwrap();
    assert!(first
        .stages
        .iter()
        .all(|r| r.status == StageStatus::Completed));
    let s = p.store();
    let states = s.element_state_rows(&req.chart_id, &RulesetId::default()).unwrap();
    let roots = s.rootqi_detail_rows(&req.chart_id).unwrap();
    let candidates = s.geju_candidate_rows(&req.chart_id).unwrap();
    let scores = s.element_score_rows(&req.chart_id, &calc_version).unwrap();

    let second = p.run(&req).unwrap();
    assert_eq!(first, second);
    let s = p.store();
    assert_eq!(
        s.element_state_rows(&req.chart_id, &RulesetId::default()).unwrap(),
        states
    );
    assert_eq!(s.rootqi_detail_rows(&req.chart_id).unwrap(), roots);
    assert_eq!(s.geju_candidate_rows(&req.chart_id).unwrap(), candidates);
    assert_eq!(s.element_score_rows(&req.chart_id, &calc_version).unwrap(), scores);
    assert_eq!(scores.len(), 5);
}

#[test]
fn at_pipe_08_projection_rows_follow_requested_pillars() {
    let req = request("scn-h", "甲子,丙寅,戊辰,庚午").with_projection(
        ProjectionKind::Decade,
        vec![
            ProjectionPillar {
                label: "decade-1".to_string(),
                stem: Stem::Yi,
                branch: Branch::Chou,
            },
            ProjectionPillar {
                label: "decade-2".to_string(),
                stem: Stem::Jia,
                branch: Branch::Zi,
            },
        ],
    );
    let (report, _) = run_memory(
        PipelineConfig::mvp_v1(),
        MemoryChartStore::new_in_memory(),
        &req,
    );
    let projection = report.projection.as_ref().unwrap();
    assert_eq!(projection.status, ProjectionStatus::Projected);
    let labels: Vec<&str> = projection.rows.iter().map(|r| r.label.as_str()).collect();
    assert_eq!(labels, vec!["decade-1", "decade-2"]);
    assert_eq!(report.status_of(Stage::Projection), Some(StageStatus::Completed));
}

#[test]
fn at_pipe_09_report_serializes_with_stage_names() {
    let req = request("scn-i", "甲子,丙子,甲子,甲子");
    let (report, _) = run_memory(
        PipelineConfig::mvp_v1(),
        MemoryChartStore::new_in_memory(),
        &req,
    );
    let json = serde_json::to_value(&report).unwrap();
    assert_eq!(json["chart_id"], "scn-i");
    assert_eq!(json["stages"][2]["stage"], "deling");
    assert_eq!(json["stages"][2]["status"], "COMPLETED");
    assert_eq!(json["strength"]["body_state"], "平衡");
    assert!(json["projection"].is_object());
}

#[test]
fn at_pipe_10_table_dropped_between_runs_fails_only_its_stage() {
    let mut p = ChartPipeline::new(PipelineConfig::mvp_v1(), MemoryChartStore::new_in_memory());
    let req = request("scn-j", "甲子,丙寅,戊辰,庚午");
    p.run(&req).unwrap();

    p.store_mut().drop_table(tables::GEJU_SUMMARY);
    let report = p.run(&req).unwrap();

    let geju = report.stage(Stage::Geju).unwrap();
    assert_eq!(geju.status, StageStatus::Failed);
    assert_eq!(geju.reason_code, Some(reason_codes::OS_PERSISTENCE_UNAVAILABLE));
    // The earlier run's candidates stay untouched by the refused write.
    assert!(!p.store().geju_candidate_rows(&req.chart_id).unwrap().is_empty());

    let ys = report.stage(Stage::YongShen).unwrap();
    assert_eq!(ys.status, StageStatus::Degraded);
    assert!(ys.message.as_deref().unwrap().contains("geju"));
    assert_eq!(report.status_of(Stage::Consistency), Some(StageStatus::Degraded));
}

#[test]
fn at_pipe_11_unreadable_stored_ruleset_fails_the_run() {
    let store = SqliteChartStore::open_in_memory().unwrap();
    store
        .conn()
        .execute(
            "INSERT INTO rulesets (ruleset_id, bundle_json) VALUES ('broken', '{not json')",
            [],
        )
        .unwrap();
    let cfg = PipelineConfig::mvp_v1().with_ruleset(ruleset_id("broken"));
    let mut p = ChartPipeline::new(cfg, store);
    let req = request("scn-k", "甲子,丙子,甲子,甲子");

    let err = p.run(&req).unwrap_err();
    assert_eq!(err.stage(), Stage::Deling);
    assert_eq!(err.reason_code(), reason_codes::OS_STORAGE_FAILED);
    assert!(p
        .store()
        .deling_result_row(&req.chart_id, &ruleset_id("broken"))
        .unwrap()
        .is_none());
}
