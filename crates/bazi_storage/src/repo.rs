#![forbid(unsafe_code)]

use bazi_kernel_contracts::chart::{CalcVersion, ChartId, RulesetId};
use bazi_kernel_contracts::deling::{DelingOutcome, DelingResult, ElementStateRow};
use bazi_kernel_contracts::geju::{GejuCandidate, GejuFormation, GejuOutcome, GejuSummary};
use bazi_kernel_contracts::hanzao::{HanZaoDetail, HanZaoOutcome, HanZaoSummary};
use bazi_kernel_contracts::rootqi::{
    RootQiDetail, RootQiOutcome, RootQiSummary, TongGenDetail, TongGenReport, TouGanDetail,
    TouGanReport,
};
use bazi_kernel_contracts::ruleset::RulesetBundle;
use bazi_kernel_contracts::yongshen::{ElementScoreRow, YongShenOutcome, YongShenResult};

use crate::error::StorageError;

/// Seasonal command: five snapshot rows plus one verdict row, upserted by
/// `(chart_id, ruleset_id[, element])`.
pub trait DelingRepo {
    fn save_deling_outcome(&mut self, outcome: &DelingOutcome) -> Result<(), StorageError>;
    fn deling_result_row(
        &self,
        chart_id: &ChartId,
        ruleset_id: &RulesetId,
    ) -> Result<Option<DelingResult>, StorageError>;
    fn element_state_rows(
        &self,
        chart_id: &ChartId,
        ruleset_id: &RulesetId,
    ) -> Result<Vec<ElementStateRow>, StorageError>;
}

/// Root details and summaries, replaced wholesale per chart.
pub trait RootQiRepo {
    fn replace_rootqi_rows(
        &mut self,
        chart_id: &ChartId,
        outcome: &RootQiOutcome,
    ) -> Result<(), StorageError>;
    fn rootqi_detail_rows(&self, chart_id: &ChartId) -> Result<Vec<RootQiDetail>, StorageError>;
    fn rootqi_summary_rows(&self, chart_id: &ChartId)
        -> Result<Vec<RootQiSummary>, StorageError>;
}

pub trait TongGenRepo {
    fn replace_tonggen_rows(&mut self, report: &TongGenReport) -> Result<(), StorageError>;
    fn tonggen_rows(&self, chart_id: &ChartId) -> Result<Vec<TongGenDetail>, StorageError>;
}

pub trait TouGanRepo {
    fn replace_tougan_rows(&mut self, report: &TouGanReport) -> Result<(), StorageError>;
    fn tougan_rows(&self, chart_id: &ChartId) -> Result<Vec<TouGanDetail>, StorageError>;
}

pub trait HanZaoRepo {
    fn replace_hanzao_rows(&mut self, outcome: &HanZaoOutcome) -> Result<(), StorageError>;
    fn hanzao_detail_rows(&self, chart_id: &ChartId) -> Result<Vec<HanZaoDetail>, StorageError>;
    fn hanzao_summary_row(&self, chart_id: &ChartId)
        -> Result<Option<HanZaoSummary>, StorageError>;
}

pub trait GejuRepo {
    fn replace_geju_rows(&mut self, outcome: &GejuOutcome) -> Result<(), StorageError>;
    fn geju_candidate_rows(&self, chart_id: &ChartId)
        -> Result<Vec<GejuCandidate>, StorageError>;
    fn geju_formation_rows(&self, chart_id: &ChartId)
        -> Result<Vec<GejuFormation>, StorageError>;
    fn geju_summary_row(&self, chart_id: &ChartId) -> Result<Option<GejuSummary>, StorageError>;
}

/// Useful-element result and its five score rows, keyed by
/// `(chart_id, calc_version)`.
pub trait YongShenRepo {
    fn replace_yongshen_rows(&mut self, outcome: &YongShenOutcome) -> Result<(), StorageError>;
    fn yongshen_result_row(
        &self,
        chart_id: &ChartId,
        calc_version: &CalcVersion,
    ) -> Result<Option<YongShenResult>, StorageError>;
    fn element_score_rows(
        &self,
        chart_id: &ChartId,
        calc_version: &CalcVersion,
    ) -> Result<Vec<ElementScoreRow>, StorageError>;
}

pub trait RulesetStore {
    fn put_ruleset(&mut self, bundle: &RulesetBundle) -> Result<(), StorageError>;
    fn get_ruleset(&self, ruleset_id: &RulesetId) -> Result<Option<RulesetBundle>, StorageError>;
    fn ruleset_ids(&self) -> Result<Vec<RulesetId>, StorageError>;
}

/// Everything the chart pipeline persists through.
pub trait ChartStore:
    DelingRepo
    + RootQiRepo
    + TongGenRepo
    + TouGanRepo
    + HanZaoRepo
    + GejuRepo
    + YongShenRepo
    + RulesetStore
{
}

impl<T> ChartStore for T where
    T: DelingRepo
        + RootQiRepo
        + TongGenRepo
        + TouGanRepo
        + HanZaoRepo
        + GejuRepo
        + YongShenRepo
        + RulesetStore
{
}
