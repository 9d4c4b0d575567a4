#![forbid(unsafe_code)]

use std::collections::{BTreeMap, BTreeSet};

use bazi_kernel_contracts::chart::{CalcVersion, ChartId, RulesetId};
use bazi_kernel_contracts::deling::{DelingOutcome, DelingResult, ElementStateRow};
use bazi_kernel_contracts::ganzhi::Element;
use bazi_kernel_contracts::geju::{GejuCandidate, GejuFormation, GejuOutcome, GejuSummary};
use bazi_kernel_contracts::hanzao::{HanZaoDetail, HanZaoOutcome, HanZaoSummary};
use bazi_kernel_contracts::rootqi::{
    RootQiDetail, RootQiOutcome, RootQiSummary, TongGenDetail, TongGenReport, TouGanDetail,
    TouGanReport,
};
use bazi_kernel_contracts::ruleset::RulesetBundle;
use bazi_kernel_contracts::yongshen::{ElementScoreRow, YongShenOutcome, YongShenResult};
use bazi_kernel_contracts::Validate;
use tracing::debug;

use crate::error::StorageError;
use crate::repo::{
    DelingRepo, GejuRepo, HanZaoRepo, RootQiRepo, RulesetStore, TongGenRepo, TouGanRepo,
    YongShenRepo,
};
use crate::tables;
use crate::validate_all;

type ChartRuleset = (ChartId, RulesetId);
type ChartVersion = (ChartId, CalcVersion);

/// In-process relational store. Tables can be dropped individually to model
/// an unprovisioned schema; a write touching a dropped table fails before
/// any of its rows land.
#[derive(Debug, Clone)]
pub struct MemoryChartStore {
    provisioned: BTreeSet<&'static str>,

    deling_results: BTreeMap<ChartRuleset, DelingResult>,
    element_states: BTreeMap<(ChartId, RulesetId, Element), ElementStateRow>,

    rootqi_details: BTreeMap<ChartId, Vec<RootQiDetail>>,
    rootqi_summaries: BTreeMap<ChartId, Vec<RootQiSummary>>,
    tonggen: BTreeMap<ChartId, Vec<TongGenDetail>>,
    tougan: BTreeMap<ChartId, Vec<TouGanDetail>>,

    hanzao_details: BTreeMap<ChartId, Vec<HanZaoDetail>>,
    hanzao_summaries: BTreeMap<ChartId, HanZaoSummary>,

    geju_candidates: BTreeMap<ChartId, Vec<GejuCandidate>>,
    geju_formations: BTreeMap<ChartId, Vec<GejuFormation>>,
    geju_summaries: BTreeMap<ChartId, GejuSummary>,

    yongshen_results: BTreeMap<ChartVersion, YongShenResult>,
    element_scores: BTreeMap<ChartVersion, Vec<ElementScoreRow>>,

    rulesets: BTreeMap<RulesetId, RulesetBundle>,
}

impl MemoryChartStore {
    pub fn new_in_memory() -> Self {
        Self {
            provisioned: tables::ALL.into_iter().collect(),
            deling_results: BTreeMap::new(),
            element_states: BTreeMap::new(),
            rootqi_details: BTreeMap::new(),
            rootqi_summaries: BTreeMap::new(),
            tonggen: BTreeMap::new(),
            tougan: BTreeMap::new(),
            hanzao_details: BTreeMap::new(),
            hanzao_summaries: BTreeMap::new(),
            geju_candidates: BTreeMap::new(),
            geju_formations: BTreeMap::new(),
            geju_summaries: BTreeMap::new(),
            yongshen_results: BTreeMap::new(),
            element_scores: BTreeMap::new(),
            rulesets: BTreeMap::new(),
        }
    }

    /// Removes a table and its rows. Unknown names are ignored.
    pub fn drop_table(&mut self, name: &str) {
        let Some(table) = tables::lookup(name) else {
            return;
        };
        self.provisioned.remove(table);
        match table {
            tables::DELING_SNAPSHOT => self.element_states.clear(),
            tables::DELING_RESULT => self.deling_results.clear(),
            tables::ROOTQI_DETAIL => self.rootqi_details.clear(),
            tables::ROOTQI_SUMMARY => self.rootqi_summaries.clear(),
            tables::TONGGEN_DETAIL => self.tonggen.clear(),
            tables::TOUGAN_DETAIL => self.tougan.clear(),
            tables::HANZAO_DETAIL => self.hanzao_details.clear(),
            tables::HANZAO_SUMMARY => self.hanzao_summaries.clear(),
            tables::GEJU_CANDIDATE => self.geju_candidates.clear(),
            tables::GEJU_FORMATION => self.geju_formations.clear(),
            tables::GEJU_SUMMARY => self.geju_summaries.clear(),
            tables::YONGSHEN_RESULT => self.yongshen_results.clear(),
            tables::ELEMENT_SCORE => self.element_scores.clear(),
            tables::RULESETS => self.rulesets.clear(),
            _ => {}
        }
    }

    pub fn without_table(mut self, name: &str) -> Self {
        self.drop_table(name);
        self
    }

    pub fn has_table(&self, name: &str) -> bool {
        self.provisioned.contains(name)
    }

    fn require(&self, needed: &[&'static str]) -> Result<(), StorageError> {
        match needed.iter().find(|t| !self.provisioned.contains(*t)) {
            Some(t) => Err(StorageError::table_missing(*t)),
            None => Ok(()),
        }
    }
}

impl Default for MemoryChartStore {
    fn default() -> Self {
        Self::new_in_memory()
    }
}

impl DelingRepo for MemoryChartStore {
    fn save_deling_outcome(&mut self, outcome: &DelingOutcome) -> Result<(), StorageError> {
        self.require(&[tables::DELING_SNAPSHOT, tables::DELING_RESULT])?;
        outcome.result.validate()?;
        let r = &outcome.result;
        for row in &outcome.snapshot {
            self.element_states.insert(
                (
                    row.chart_id.clone(),
                    row.ruleset_id.clone(),
                    row.element_state.element,
                ),
                row.clone(),
            );
        }
        self.deling_results
            .insert((r.chart_id.clone(), r.ruleset_id.clone()), r.clone());
        debug!(chart_id = %r.chart_id, ruleset_id = %r.ruleset_id, "deling rows upserted");
        Ok(())
    }

    fn deling_result_row(
        &self,
        chart_id: &ChartId,
        ruleset_id: &RulesetId,
    ) -> Result<Option<DelingResult>, StorageError> {
        self.require(&[tables::DELING_RESULT])?;
        Ok(self
            .deling_results
            .get(&(chart_id.clone(), ruleset_id.clone()))
            .cloned())
    }

    fn element_state_rows(
        &self,
        chart_id: &ChartId,
        ruleset_id: &RulesetId,
    ) -> Result<Vec<ElementStateRow>, StorageError> {
        self.require(&[tables::DELING_SNAPSHOT])?;
        Ok(self
            .element_states
            .iter()
            .filter(|((c, r, _), _)| c == chart_id && r == ruleset_id)
            .map(|(_, row)| row.clone())
            .collect())
    }
}

impl RootQiRepo for MemoryChartStore {
    fn replace_rootqi_rows(
        &mut self,
        chart_id: &ChartId,
        outcome: &RootQiOutcome,
    ) -> Result<(), StorageError> {
        self.require(&[tables::ROOTQI_DETAIL, tables::ROOTQI_SUMMARY])?;
        validate_all(&outcome.details)?;
        self.rootqi_details
            .insert(chart_id.clone(), outcome.details.clone());
        self.rootqi_summaries
            .insert(chart_id.clone(), outcome.summaries.clone());
        Ok(())
    }

    fn rootqi_detail_rows(&self, chart_id: &ChartId) -> Result<Vec<RootQiDetail>, StorageError> {
        self.require(&[tables::ROOTQI_DETAIL])?;
        Ok(self.rootqi_details.get(chart_id).cloned().unwrap_or_default())
    }

    fn rootqi_summary_rows(
        &self,
        chart_id: &ChartId,
    ) -> Result<Vec<RootQiSummary>, StorageError> {
        self.require(&[tables::ROOTQI_SUMMARY])?;
        Ok(self
            .rootqi_summaries
            .get(chart_id)
            .cloned()
            .unwrap_or_default())
    }
}

impl TongGenRepo for MemoryChartStore {
    fn replace_tonggen_rows(&mut self, report: &TongGenReport) -> Result<(), StorageError> {
        self.require(&[tables::TONGGEN_DETAIL])?;
        validate_all(&report.details)?;
        self.tonggen
            .insert(report.chart_id.clone(), report.details.clone());
        Ok(())
    }

    fn tonggen_rows(&self, chart_id: &ChartId) -> Result<Vec<TongGenDetail>, StorageError> {
        self.require(&[tables::TONGGEN_DETAIL])?;
        Ok(self.tonggen.get(chart_id).cloned().unwrap_or_default())
    }
}

impl TouGanRepo for MemoryChartStore {
    fn replace_tougan_rows(&mut self, report: &TouGanReport) -> Result<(), StorageError> {
        self.require(&[tables::TOUGAN_DETAIL])?;
        validate_all(&report.details)?;
        self.tougan
            .insert(report.chart_id.clone(), report.details.clone());
        Ok(())
    }

    fn tougan_rows(&self, chart_id: &ChartId) -> Result<Vec<TouGanDetail>, StorageError> {
        self.require(&[tables::TOUGAN_DETAIL])?;
        Ok(self.tougan.get(chart_id).cloned().unwrap_or_default())
    }
}

impl HanZaoRepo for MemoryChartStore {
    fn replace_hanzao_rows(&mut self, outcome: &HanZaoOutcome) -> Result<(), StorageError> {
        self.require(&[tables::HANZAO_DETAIL, tables::HANZAO_SUMMARY])?;
        outcome.summary.validate()?;
        let chart_id = &outcome.summary.chart_id;
        self.hanzao_details
            .insert(chart_id.clone(), outcome.details.clone());
        self.hanzao_summaries
            .insert(chart_id.clone(), outcome.summary.clone());
        Ok(())
    }

    fn hanzao_detail_rows(&self, chart_id: &ChartId) -> Result<Vec<HanZaoDetail>, StorageError> {
        self.require(&[tables::HANZAO_DETAIL])?;
        Ok(self.hanzao_details.get(chart_id).cloned().unwrap_or_default())
    }

    fn hanzao_summary_row(
        &self,
        chart_id: &ChartId,
    ) -> Result<Option<HanZaoSummary>, StorageError> {
        self.require(&[tables::HANZAO_SUMMARY])?;
        Ok(self.hanzao_summaries.get(chart_id).cloned())
    }
}

impl GejuRepo for MemoryChartStore {
    fn replace_geju_rows(&mut self, outcome: &GejuOutcome) -> Result<(), StorageError> {
        self.require(&[
            tables::GEJU_CANDIDATE,
            tables::GEJU_FORMATION,
            tables::GEJU_SUMMARY,
        ])?;
        validate_all(&outcome.candidates)?;
        outcome.summary.validate()?;
        let chart_id = &outcome.summary.chart_id;
        self.geju_candidates
            .insert(chart_id.clone(), outcome.candidates.clone());
        self.geju_formations
            .insert(chart_id.clone(), outcome.formations.clone());
        self.geju_summaries
            .insert(chart_id.clone(), outcome.summary.clone());
        Ok(())
    }

    fn geju_candidate_rows(
        &self,
        chart_id: &ChartId,
    ) -> Result<Vec<GejuCandidate>, StorageError> {
        self.require(&[tables::GEJU_CANDIDATE])?;
        Ok(self.geju_candidates.get(chart_id).cloned().unwrap_or_default())
    }

    fn geju_formation_rows(
        &self,
        chart_id: &ChartId,
    ) -> Result<Vec<GejuFormation>, StorageError> {
        self.require(&[tables::GEJU_FORMATION])?;
        Ok(self.geju_formations.get(chart_id).cloned().unwrap_or_default())
    }

    fn geju_summary_row(&self, chart_id: &ChartId) -> Result<Option<GejuSummary>, StorageError> {
        self.require(&[tables::GEJU_SUMMARY])?;
        Ok(self.geju_summaries.get(chart_id).cloned())
    }
}

impl YongShenRepo for MemoryChartStore {
    fn replace_yongshen_rows(&mut self, outcome: &YongShenOutcome) -> Result<(), StorageError> {
        self.require(&[tables::YONGSHEN_RESULT, tables::ELEMENT_SCORE])?;
        outcome.result.validate()?;
        validate_all(&outcome.scores)?;
        let key = (
            outcome.result.chart_id.clone(),
            outcome.result.calc_version.clone(),
        );
        self.element_scores.insert(key.clone(), outcome.scores.clone());
        self.yongshen_results.insert(key, outcome.result.clone());
        Ok(())
    }

    fn yongshen_result_row(
        &self,
        chart_id: &ChartId,
        calc_version: &CalcVersion,
    ) -> Result<Option<YongShenResult>, StorageError> {
        self.require(&[tables::YONGSHEN_RESULT])?;
        Ok(self
            .yongshen_results
            .get(&(chart_id.clone(), calc_version.clone()))
            .cloned())
    }

    fn element_score_rows(
        &self,
        chart_id: &ChartId,
        calc_version: &CalcVersion,
    ) -> Result<Vec<ElementScoreRow>, StorageError> {
        self.require(&[tables::ELEMENT_SCORE])?;
        Ok(self
            .element_scores
            .get(&(chart_id.clone(), calc_version.clone()))
            .cloned()
            .unwrap_or_default())
    }
}

impl RulesetStore for MemoryChartStore {
    fn put_ruleset(&mut self, bundle: &RulesetBundle) -> Result<(), StorageError> {
        self.require(&[tables::RULESETS])?;
        bundle.validate()?;
        self.rulesets
            .insert(bundle.ruleset_id.clone(), bundle.clone());
        Ok(())
    }

    fn get_ruleset(&self, ruleset_id: &RulesetId) -> Result<Option<RulesetBundle>, StorageError> {
        self.require(&[tables::RULESETS])?;
        Ok(self.rulesets.get(ruleset_id).cloned())
    }

    fn ruleset_ids(&self) -> Result<Vec<RulesetId>, StorageError> {
        self.require(&[tables::RULESETS])?;
        Ok(self.rulesets.keys().cloned().collect())
    }
}
