#![forbid(unsafe_code)]

//! RootingAnalyzer: how strongly each exposed stem is rooted in the
//! branches (根气), plus the 通根 and 透干 reports derived from the same
//! hidden-stem walk.

use bazi_kernel_contracts::chart::{ChartId, FourPillars, PillarPosition};
use bazi_kernel_contracts::deling::DelingResult;
use bazi_kernel_contracts::evidence::Evidence;
use bazi_kernel_contracts::ganzhi::{HiddenRank, StateLevel};
use bazi_kernel_contracts::rootqi::{
    BestRoot, RootDetailInputs, RootLevel, RootQiDetail, RootQiOutcome, RootQiSummary,
    RootSummaryInputs, RootType, RootWeights, TongGenDetail, TongGenInputs, TongGenReport,
    TouGanDetail, TouGanInputs, TouGanReport,
};
use bazi_kernel_contracts::ruleset::RootLevelBand;
use bazi_kernel_contracts::Validate;
use tracing::debug;

use crate::dictionary::ElementDictionary;
use crate::error::{EngineError, EngineResult};
use crate::fingerprint::pillars_sha256;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RootQiConfig {
    pub main_weight: f64,
    pub mid_weight: f64,
    pub res_weight: f64,
    pub month_weight: f64,
    pub day_weight: f64,
    pub hour_weight: f64,
    pub year_weight: f64,
    pub wang_weight: f64,
    pub xiang_weight: f64,
    pub xiu_weight: f64,
    pub qiu_weight: f64,
    pub si_weight: f64,
    /// Used when no seasonal snapshot is available for the target element.
    pub unknown_season_weight: f64,
}

impl RootQiConfig {
    pub fn mvp_v1() -> Self {
        Self {
            main_weight: 1.0,
            mid_weight: 0.6,
            res_weight: 0.3,
            month_weight: 1.0,
            day_weight: 0.8,
            hour_weight: 0.6,
            year_weight: 0.4,
            wang_weight: 1.2,
            xiang_weight: 1.0,
            xiu_weight: 0.7,
            qiu_weight: 0.5,
            si_weight: 0.3,
            unknown_season_weight: 1.0,
        }
    }

    fn rank_weight(&self, rank: HiddenRank) -> f64 {
        match rank {
            HiddenRank::Main => self.main_weight,
            HiddenRank::Mid => self.mid_weight,
            HiddenRank::Res => self.res_weight,
        }
    }

    fn position_weight(&self, position: PillarPosition) -> f64 {
        match position {
            PillarPosition::Month => self.month_weight,
            PillarPosition::Day => self.day_weight,
            PillarPosition::Hour => self.hour_weight,
            PillarPosition::Year => self.year_weight,
        }
    }

    fn seasonal_weight(&self, state: Option<StateLevel>) -> f64 {
        match state {
            Some(StateLevel::Wang) => self.wang_weight,
            Some(StateLevel::Xiang) => self.xiang_weight,
            Some(StateLevel::Xiu) => self.xiu_weight,
            Some(StateLevel::Qiu) => self.qiu_weight,
            Some(StateLevel::Si) => self.si_weight,
            None => self.unknown_season_weight,
        }
    }
}

/// First band containing the score, scanning bands in ascending `min`
/// order. `Unknown` when no band matches.
pub fn determine_root_level(total: f64, bands: &[RootLevelBand]) -> (RootLevel, Option<RootLevelBand>) {
    let mut sorted: Vec<&RootLevelBand> = bands.iter().collect();
    sorted.sort_by(|a, b| a.min.total_cmp(&b.min));
    match sorted.into_iter().find(|b| b.contains(total)) {
        Some(band) => (band.level, Some(*band)),
        None => (RootLevel::Unknown, None),
    }
}

#[derive(Debug, Clone)]
pub struct RootQiRuntime {
    config: RootQiConfig,
}

impl RootQiRuntime {
    pub fn new(config: RootQiConfig) -> Self {
        Self { config }
    }

    /// `deling` supplies the seasonal state of each target element; without
    /// it every target uses the unknown-season weight.
    pub fn run(
        &self,
        chart_id: &ChartId,
        pillars: &FourPillars,
        deling: Option<&DelingResult>,
        bands: &[RootLevelBand],
    ) -> EngineResult<RootQiOutcome> {
        chart_id.validate()?;
        pillars.validate()?;
        let sha = pillars_sha256(pillars);

        let mut details = Vec::new();
        let mut summaries = Vec::with_capacity(4);
        for target in pillars.iter() {
            let target_element = ElementDictionary::stem_element(target.stem);
            let target_state = deling.and_then(|d| d.state_of(target_element));
            let grave = ElementDictionary::grave_branch(target_element);

            let mut mine: Vec<RootQiDetail> = Vec::new();
            for root in pillars.iter() {
                for hidden in ElementDictionary::hidden_stems(root.branch) {
                    let hit_element = ElementDictionary::stem_element(hidden.stem);
                    if hit_element != target_element {
                        continue;
                    }
                    let root_type = if grave == Some(root.branch) && hidden.rank == HiddenRank::Res
                    {
                        RootType::KuGrave
                    } else if hidden.stem == target.stem {
                        RootType::SameStem
                    } else {
                        RootType::SameElement
                    };
                    let weights = RootWeights {
                        hidden_rank_weight: self.config.rank_weight(hidden.rank),
                        position_weight: self.config.position_weight(root.position),
                        seasonal_weight: self.config.seasonal_weight(target_state),
                    };
                    let root_score = weights.product();
                    if root_score <= 0.0 {
                        continue;
                    }
                    let detail = RootQiDetail {
                        chart_id: chart_id.clone(),
                        target_pillar: target.position,
                        target_stem: target.stem,
                        root_pillar: root.position,
                        root_branch: root.branch,
                        hit_hidden_stem: hidden.stem,
                        hidden_rank: hidden.rank,
                        root_type,
                        weights,
                        root_score,
                        evidence: Evidence::v1(RootDetailInputs {
                            target_element,
                            hit_element,
                            target_seasonal_state: target_state,
                        }),
                    };
                    detail.validate()?;
                    mine.push(detail);
                }
            }

            let total: f64 = mine.iter().map(|d| d.root_score).sum();
            let (root_level, matched_band) = determine_root_level(total, bands);
            let mut best: Option<&RootQiDetail> = None;
            for d in &mine {
                if best.map_or(true, |b| d.root_score > b.root_score) {
                    best = Some(d);
                }
            }
            summaries.push(RootQiSummary {
                chart_id: chart_id.clone(),
                target_pillar: target.position,
                target_stem: target.stem,
                total_root_score: total,
                root_level,
                best_root: best.map(|d| BestRoot {
                    root_pillar: d.root_pillar,
                    root_branch: d.root_branch,
                    hit_hidden_stem: d.hit_hidden_stem,
                    root_type: d.root_type,
                    root_score: d.root_score,
                }),
                evidence: Evidence::v1(RootSummaryInputs {
                    pillars_sha256: sha.clone(),
                    detail_count: mine.len() as u32,
                    matched_band,
                }),
            });
            details.extend(mine);
        }

        debug!(
            chart_id = %chart_id,
            detail_count = details.len(),
            "root qi analyzed"
        );
        Ok(RootQiOutcome { details, summaries })
    }
}

/// 通根: every hidden stem, flagged when it shares the day master's element.
#[derive(Debug, Clone, Default)]
pub struct TongGenRuntime;

impl TongGenRuntime {
    pub fn new() -> Self {
        Self
    }

    pub fn run(&self, chart_id: &ChartId, pillars: &FourPillars) -> EngineResult<TongGenReport> {
        pillars.validate()?;
        let day_stem = pillars
            .day_stem()
            .ok_or_else(|| EngineError::missing("four_pillars", "day"))?;
        let dm_element = ElementDictionary::stem_element(day_stem);
        let mut details = Vec::new();
        for p in pillars.iter() {
            for h in ElementDictionary::hidden_stems(p.branch) {
                let hidden_element = ElementDictionary::stem_element(h.stem);
                details.push(TongGenDetail {
                    chart_id: chart_id.clone(),
                    pillar: p.position,
                    branch: p.branch,
                    hidden_stem: h.stem,
                    hidden_rank: h.rank,
                    hidden_element,
                    day_master_element: dm_element,
                    is_root: hidden_element == dm_element,
                    evidence: Evidence::v1(TongGenInputs { day_stem }),
                });
            }
        }
        Ok(TongGenReport {
            chart_id: chart_id.clone(),
            details,
        })
    }
}

/// 透干: every hidden stem, flagged when the same stem is exposed.
#[derive(Debug, Clone, Default)]
pub struct TouGanRuntime;

impl TouGanRuntime {
    pub fn new() -> Self {
        Self
    }

    pub fn run(&self, chart_id: &ChartId, pillars: &FourPillars) -> EngineResult<TouGanReport> {
        pillars.validate()?;
        let exposed_stems: Vec<_> = pillars.iter().map(|p| p.stem).collect();
        let mut details = Vec::new();
        for p in pillars.iter() {
            for h in ElementDictionary::hidden_stems(p.branch) {
                let exposed_positions: Vec<_> = pillars
                    .iter()
                    .filter(|q| q.stem == h.stem)
                    .map(|q| q.position)
                    .collect();
                details.push(TouGanDetail {
                    chart_id: chart_id.clone(),
                    pillar: p.position,
                    branch: p.branch,
                    hidden_stem: h.stem,
                    hidden_rank: h.rank,
                    is_exposed: !exposed_positions.is_empty(),
                    exposed_positions,
                    evidence: Evidence::v1(TouGanInputs {
                        exposed_stems: exposed_stems.clone(),
                    }),
                });
            }
        }
        let report = TouGanReport {
            chart_id: chart_id.clone(),
            details,
        };
        debug!(
            chart_id = %chart_id,
            hidden = report.details.len(),
            exposed = report.exposed_count(),
            "tougan scanned"
        );
        Ok(report)
    }
}
