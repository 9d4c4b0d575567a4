#![forbid(unsafe_code)]

//! Thirteen named stages run in a fixed order. Each persisting stage writes
//! only its own tables, in its own transaction. A failed stage leaves its
//! output absent and later stages run without it. A PillarProfile failure,
//! or a stored ruleset that cannot be read, ends the run.

use std::fmt;

use bazi_engines::consistency::ConsistencyRuntime;
use bazi_engines::deling::DelingRuntime;
use bazi_engines::geju::GejuRuntime;
use bazi_engines::hanzao::HanZaoRuntime;
use bazi_engines::pillar_profile::PillarProfileRuntime;
use bazi_engines::profile::{ProfileRuntime, ProjectionRuntime};
use bazi_engines::relation::RelationRuntime;
use bazi_engines::rootqi::{RootQiRuntime, TongGenRuntime, TouGanRuntime};
use bazi_engines::strength::{StrengthInputs, StrengthRuntime};
use bazi_engines::yongshen::YongShenRuntime;
use bazi_engines::EngineResult;
use bazi_kernel_contracts::chart::{CalcVersion, ChartId, FourPillars, RulesetId};
use bazi_kernel_contracts::consistency::ConsistencyReport;
use bazi_kernel_contracts::deling::DelingResult;
use bazi_kernel_contracts::geju::GejuSummary;
use bazi_kernel_contracts::hanzao::HanZaoSummary;
use bazi_kernel_contracts::profile::{
    PillarProfile, Projection, ProjectionKind, ProjectionPillar, TenGodProfile,
};
use bazi_kernel_contracts::relation::RelationReport;
use bazi_kernel_contracts::rootqi::{RootQiSummary, TongGenReport, TouGanReport};
use bazi_kernel_contracts::strength::StrengthJudgement;
use bazi_kernel_contracts::yongshen::{ElementScoreRow, YongShenResult};
use bazi_kernel_contracts::{ContractViolation, ReasonCodeId, Validate};
use bazi_storage::repo::{
    ChartStore, DelingRepo, GejuRepo, HanZaoRepo, RootQiRepo, TongGenRepo, TouGanRepo,
    YongShenRepo,
};
use bazi_storage::StorageError;
use serde::{Deserialize, Serialize};
use tracing::{info, info_span, warn};

use crate::catalog::{resolve_ruleset, RulesetSource};
use crate::config::{PersistencePolicy, PipelineConfig};
use crate::error::{reason_codes, StageError};

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    PillarProfile,
    Relations,
    Deling,
    RootQi,
    TongGen,
    TouGan,
    HanZao,
    Strength,
    Geju,
    YongShen,
    Consistency,
    TenGodProfile,
    Projection,
}

impl Stage {
    pub const ALL: [Stage; 13] = [
        Stage::PillarProfile,
        Stage::Relations,
        Stage::Deling,
        Stage::RootQi,
        Stage::TongGen,
        Stage::TouGan,
        Stage::HanZao,
        Stage::Strength,
        Stage::Geju,
        Stage::YongShen,
        Stage::Consistency,
        Stage::TenGodProfile,
        Stage::Projection,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Stage::PillarProfile => "pillar_profile",
            Stage::Relations => "relations",
            Stage::Deling => "deling",
            Stage::RootQi => "root_qi",
            Stage::TongGen => "tong_gen",
            Stage::TouGan => "tou_gan",
            Stage::HanZao => "han_zao",
            Stage::Strength => "strength",
            Stage::Geju => "geju",
            Stage::YongShen => "yong_shen",
            Stage::Consistency => "consistency",
            Stage::TenGodProfile => "ten_god_profile",
            Stage::Projection => "projection",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StageStatus {
    Completed,
    /// Output produced, but without an upstream input or unpersisted.
    Degraded,
    Failed,
    Skipped,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageRecord {
    pub stage: Stage,
    pub status: StageStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason_code: Option<ReasonCodeId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ChartRequest {
    pub chart_id: ChartId,
    pub pillars: FourPillars,
    pub projection_kind: ProjectionKind,
    pub projection: Vec<ProjectionPillar>,
}

impl ChartRequest {
    pub fn v1(chart_id: ChartId, pillars: FourPillars) -> Result<Self, ContractViolation> {
        chart_id.validate()?;
        pillars.validate()?;
        Ok(Self {
            chart_id,
            pillars,
            projection_kind: ProjectionKind::Decade,
            projection: Vec::new(),
        })
    }

    pub fn with_projection(mut self, kind: ProjectionKind, pillars: Vec<ProjectionPillar>) -> Self {
        self.projection_kind = kind;
        self.projection = pillars;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartReport {
    pub chart_id: ChartId,
    pub ruleset_id: RulesetId,
    pub ruleset_source: RulesetSource,
    pub calc_version: CalcVersion,
    pub pillar_profile: PillarProfile,
    pub relations: Option<RelationReport>,
    pub deling: Option<DelingResult>,
    pub rootqi: Option<Vec<RootQiSummary>>,
    pub tong_gen: Option<TongGenReport>,
    pub tou_gan: Option<TouGanReport>,
    pub hanzao: Option<HanZaoSummary>,
    pub strength: Option<StrengthJudgement>,
    pub geju: Option<GejuSummary>,
    pub yongshen: Option<YongShenResult>,
    pub element_scores: Vec<ElementScoreRow>,
    pub consistency: Option<ConsistencyReport>,
    pub ten_god_profile: Option<TenGodProfile>,
    pub projection: Option<Projection>,
    pub stages: Vec<StageRecord>,
}

impl ChartReport {
    pub fn stage(&self, stage: Stage) -> Option<&StageRecord> {
        self.stages.iter().find(|r| r.stage == stage)
    }

    pub fn status_of(&self, stage: Stage) -> Option<StageStatus> {
        self.stage(stage).map(|r| r.status)
    }
}

#[derive(Debug, Default)]
struct StageLog {
    records: Vec<StageRecord>,
}

impl StageLog {
    fn push(
        &mut self,
        stage: Stage,
        status: StageStatus,
        reason_code: Option<ReasonCodeId>,
        message: Option<String>,
    ) {
        self.records.push(StageRecord {
            stage,
            status,
            reason_code,
            message,
        });
    }

    fn completed(&mut self, stage: Stage) {
        info!(stage = stage.as_str(), "stage completed");
        self.push(stage, StageStatus::Completed, None, None);
    }

    fn degraded(&mut self, stage: Stage, reason_code: ReasonCodeId, message: String) {
        warn!(stage = stage.as_str(), reason_code = reason_code.0, %message, "stage degraded");
        self.push(stage, StageStatus::Degraded, Some(reason_code), Some(message));
    }

    fn failed(&mut self, e: &StageError) {
        warn!(stage = e.stage().as_str(), reason_code = e.reason_code().0, error = %e, "stage failed");
        self.push(
            e.stage(),
            StageStatus::Failed,
            Some(e.reason_code()),
            Some(e.to_string()),
        );
    }

    fn skipped(&mut self, stage: Stage, requires: Stage) {
        let message = format!("requires {requires}");
        warn!(stage = stage.as_str(), %message, "stage skipped");
        self.push(
            stage,
            StageStatus::Skipped,
            Some(reason_codes::OS_UPSTREAM_ABSENT),
            Some(message),
        );
    }
}

/// `Ok(None)` when written, `Ok(Some(_))` when an absent table was tolerated.
fn persist<S>(
    store: &mut S,
    stage: Stage,
    policy: PersistencePolicy,
    write: impl FnOnce(&mut S) -> Result<(), StorageError>,
) -> Result<Option<StageError>, StageError> {
    match write(store) {
        Ok(()) => Ok(None),
        Err(e) => {
            let e = StageError::from_storage(stage, e);
            if e.is_persistence_unavailable() && policy == PersistencePolicy::ReturnUnpersisted {
                Ok(Some(e))
            } else {
                Err(e)
            }
        }
    }
}

fn settle<T>(
    log: &mut StageLog,
    stage: Stage,
    computed: EngineResult<T>,
    absent: &[Stage],
    write: impl FnOnce(&T) -> Result<Option<StageError>, StageError>,
) -> Option<T> {
    let value = match computed {
        Ok(v) => v,
        Err(e) => {
            log.failed(&StageError::from_engine(stage, e));
            return None;
        }
    };
    match write(&value) {
        Err(e) => {
            log.failed(&e);
            None
        }
        Ok(Some(tolerated)) => {
            log.degraded(
                stage,
                tolerated.reason_code(),
                format!("returned unpersisted: {tolerated}"),
            );
            Some(value)
        }
        Ok(None) if !absent.is_empty() => {
            let names: Vec<&str> = absent.iter().map(|s| s.as_str()).collect();
            log.degraded(
                stage,
                reason_codes::OS_UPSTREAM_ABSENT,
                format!("ran without {}", names.join(", ")),
            );
            Some(value)
        }
        Ok(None) => {
            log.completed(stage);
            Some(value)
        }
    }
}

fn absent(inputs: &[(Stage, bool)]) -> Vec<Stage> {
    inputs
        .iter()
        .filter(|(_, present)| !present)
        .map(|(s, _)| *s)
        .collect()
}

fn no_write<T>(_: &T) -> Result<Option<StageError>, StageError> {
    Ok(None)
}

/// Sub-call made on behalf of StrengthJudge; a failure is logged and dropped.
fn best_effort<T>(owner: Stage, sub: Stage, r: EngineResult<T>) -> Option<T> {
    match r {
        Ok(v) => Some(v),
        Err(e) => {
            let e = StageError::from_engine(sub, e);
            warn!(stage = owner.as_str(), sub = sub.as_str(), error = %e, "sub-call failed");
            None
        }
    }
}

pub struct ChartPipeline<S> {
    config: PipelineConfig,
    store: S,
}

impl<S: ChartStore> ChartPipeline<S> {
    pub fn new(config: PipelineConfig, store: S) -> Self {
        Self { config, store }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut S {
        &mut self.store
    }

    pub fn into_store(self) -> S {
        self.store
    }

    pub fn run(&mut self, request: &ChartRequest) -> Result<ChartReport, StageError> {
        let cfg = self.config.clone();
        let policies = cfg.persistence;
        let chart_id = &request.chart_id;
        let pillars = &request.pillars;
        let span = info_span!("chart", chart_id = %chart_id, ruleset_id = %cfg.ruleset_id);
        let _guard = span.enter();
        let mut log = StageLog::default();

        let pillar_profile = PillarProfileRuntime::new()
            .run(chart_id, pillars)
            .map_err(|e| StageError::from_engine(Stage::PillarProfile, e))?;
        log.completed(Stage::PillarProfile);
        let day_master = pillar_profile.day_master.stem;

        // Deling is the first stage to read the ruleset.
        let (ruleset, ruleset_source) = resolve_ruleset(&self.store, &cfg.ruleset_id)
            .map_err(|e| StageError::from_storage(Stage::Deling, e))?;
        if ruleset_source == RulesetSource::BuiltinDefault {
            info!(
                ruleset_id = %cfg.ruleset_id,
                reason_code = reason_codes::OS_RULESET_FALLBACK.0,
                "using built-in ruleset tables"
            );
        }
        let store = &mut self.store;

        let relations = settle(
            &mut log,
            Stage::Relations,
            RelationRuntime::new().run(pillars),
            &[],
            no_write,
        );

        let deling = settle(
            &mut log,
            Stage::Deling,
            DelingRuntime::new().run(chart_id, pillars, &ruleset),
            &[],
            |out| {
                persist(store, Stage::Deling, policies.deling, |s| {
                    s.save_deling_outcome(out)
                })
            },
        );

        let rootqi = settle(
            &mut log,
            Stage::RootQi,
            RootQiRuntime::new(cfg.rootqi).run(
                chart_id,
                pillars,
                deling.as_ref().map(|d| &d.result),
                &ruleset.root_level_bands,
            ),
            &absent(&[(Stage::Deling, deling.is_some())]),
            |out| {
                persist(store, Stage::RootQi, policies.rootqi, |s| {
                    s.replace_rootqi_rows(chart_id, out)
                })
            },
        );

        let tong_gen = settle(
            &mut log,
            Stage::TongGen,
            TongGenRuntime::new().run(chart_id, pillars),
            &[],
            |out| {
                persist(store, Stage::TongGen, policies.tonggen, |s| {
                    s.replace_tonggen_rows(out)
                })
            },
        );

        let tou_gan = settle(
            &mut log,
            Stage::TouGan,
            TouGanRuntime::new().run(chart_id, pillars),
            &[],
            |out| {
                persist(store, Stage::TouGan, policies.tougan, |s| {
                    s.replace_tougan_rows(out)
                })
            },
        );

        let hanzao = settle(
            &mut log,
            Stage::HanZao,
            HanZaoRuntime::new().run(chart_id, pillars, &ruleset),
            &[],
            |out| {
                persist(store, Stage::HanZao, policies.hanzao, |s| {
                    s.replace_hanzao_rows(out)
                })
            },
        );

        // StrengthJudge reuses earlier outputs and recomputes any that are
        // missing; those recomputations never persist.
        let inputs = StrengthInputs {
            deling: match &deling {
                Some(d) => Some(d.result.clone()),
                None => best_effort(
                    Stage::Strength,
                    Stage::Deling,
                    DelingRuntime::new()
                        .run(chart_id, pillars, &ruleset)
                        .map(|o| o.result),
                ),
            },
            tong_gen: match &tong_gen {
                Some(t) => Some(t.clone()),
                None => best_effort(
                    Stage::Strength,
                    Stage::TongGen,
                    TongGenRuntime::new().run(chart_id, pillars),
                ),
            },
            tou_gan: match &tou_gan {
                Some(t) => Some(t.clone()),
                None => best_effort(
                    Stage::Strength,
                    Stage::TouGan,
                    TouGanRuntime::new().run(chart_id, pillars),
                ),
            },
        };
        let strength_absent = absent(&[
            (Stage::Deling, inputs.deling.is_some()),
            (Stage::TongGen, inputs.tong_gen.is_some()),
            (Stage::TouGan, inputs.tou_gan.is_some()),
        ]);
        let strength = settle(
            &mut log,
            Stage::Strength,
            StrengthRuntime::new(cfg.strength).run(chart_id, pillars, inputs),
            &strength_absent,
            no_write,
        );

        let geju = match &relations {
            None => {
                log.skipped(Stage::Geju, Stage::Relations);
                None
            }
            Some(rel) => settle(
                &mut log,
                Stage::Geju,
                GejuRuntime::new(cfg.geju).run(chart_id, pillars, rel, strength.as_ref()),
                &absent(&[(Stage::Strength, strength.is_some())]),
                |out| {
                    persist(store, Stage::Geju, policies.geju, |s| {
                        s.replace_geju_rows(out)
                    })
                },
            ),
        };

        let yongshen = match &strength {
            None => {
                log.skipped(Stage::YongShen, Stage::Strength);
                None
            }
            Some(st) => settle(
                &mut log,
                Stage::YongShen,
                YongShenRuntime::new().run(
                    chart_id,
                    &cfg.calc_version,
                    st,
                    hanzao.as_ref().map(|h| &h.summary),
                    geju.as_ref().map(|g| &g.summary),
                    &ruleset.yongshen,
                ),
                &absent(&[
                    (Stage::HanZao, hanzao.is_some()),
                    (Stage::Geju, geju.is_some()),
                ]),
                |out| {
                    persist(store, Stage::YongShen, policies.yongshen, |s| {
                        s.replace_yongshen_rows(out)
                    })
                },
            ),
        };

        let consistency = match &yongshen {
            None => {
                log.skipped(Stage::Consistency, Stage::YongShen);
                None
            }
            Some(y) => settle(
                &mut log,
                Stage::Consistency,
                Ok(ConsistencyRuntime::new().run(
                    &y.result,
                    geju.as_ref().map(|g| &g.summary),
                    relations.as_ref(),
                )),
                &absent(&[
                    (Stage::Geju, geju.is_some()),
                    (Stage::Relations, relations.is_some()),
                ]),
                no_write,
            ),
        };

        let ten_god_profile = match &relations {
            None => {
                log.skipped(Stage::TenGodProfile, Stage::Relations);
                None
            }
            Some(rel) => settle(
                &mut log,
                Stage::TenGodProfile,
                ProfileRuntime::new(cfg.profile).run(chart_id, rel),
                &[],
                no_write,
            ),
        };

        let yongshen_result = yongshen.as_ref().map(|y| &y.result);
        let projection = settle(
            &mut log,
            Stage::Projection,
            ProjectionRuntime::new().run(
                request.projection_kind,
                pillars,
                day_master,
                yongshen_result,
                &request.projection,
            ),
            &absent(&[(
                Stage::YongShen,
                yongshen.is_some() || request.projection.is_empty(),
            )]),
            no_write,
        );

        info!(
            failed = log
                .records
                .iter()
                .filter(|r| r.status == StageStatus::Failed)
                .count(),
            "chart pipeline finished"
        );

        let (yongshen, element_scores) = match yongshen {
            Some(y) => (Some(y.result), y.scores),
            None => (None, Vec::new()),
        };
        Ok(ChartReport {
            chart_id: chart_id.clone(),
            ruleset_id: ruleset.ruleset_id.clone(),
            ruleset_source,
            calc_version: cfg.calc_version.clone(),
            pillar_profile,
            relations,
            deling: deling.map(|d| d.result),
            rootqi: rootqi.map(|r| r.summaries),
            tong_gen,
            tou_gan,
            hanzao: hanzao.map(|h| h.summary),
            strength,
            geju: geju.map(|g| g.summary),
            yongshen,
            element_scores,
            consistency,
            ten_god_profile,
            projection,
            stages: log.records,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bazi_storage::MemoryChartStore;

    fn request(text: &str) -> ChartRequest {
        ChartRequest::v1(
            ChartId::new("chart-pipe").unwrap(),
            FourPillars::parse(text).unwrap(),
        )
        .unwrap()
    }

    #[test]
    fn at_pipeline_01_every_stage_is_recorded_in_order() {
        let mut p = ChartPipeline::new(PipelineConfig::mvp_v1(), MemoryChartStore::new_in_memory());
        let report = p.run(&request("甲子,丙寅,戊辰,庚午")).unwrap();
        let order: Vec<Stage> = report.stages.iter().map(|r| r.stage).collect();
        assert_eq!(order, Stage::ALL.to_vec());
        assert!(report
            .stages
            .iter()
            .all(|r| r.status == StageStatus::Completed));
        assert_eq!(report.ruleset_source, RulesetSource::BuiltinDefault);
    }

    #[test]
    fn at_pipeline_02_stage_names_match_serialized_form() {
        for stage in Stage::ALL {
            let json = serde_json::to_value(stage).unwrap();
            assert_eq!(json, serde_json::Value::from(stage.as_str()));
        }
    }

    #[test]
    fn at_pipeline_03_persist_tolerates_only_missing_tables() {
        let mut store = MemoryChartStore::new_in_memory();
        let tolerated = persist(
            &mut store,
            Stage::HanZao,
            PersistencePolicy::ReturnUnpersisted,
            |_| Err(StorageError::table_missing("t")),
        )
        .unwrap();
        assert!(tolerated.is_some());
        let err = persist(
            &mut store,
            Stage::Deling,
            PersistencePolicy::Propagate,
            |_| Err(StorageError::table_missing("t")),
        )
        .unwrap_err();
        assert!(err.is_persistence_unavailable());
        let err = persist(
            &mut store,
            Stage::HanZao,
            PersistencePolicy::ReturnUnpersisted,
            |_| {
                Err(StorageError::ContractViolation(
                    ContractViolation::NotFinite { field: "x" },
                ))
            },
        )
        .unwrap_err();
        assert!(!err.is_persistence_unavailable());
    }
}
