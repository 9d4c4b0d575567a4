#![forbid(unsafe_code)]

use serde::{Deserialize, Serialize};

use crate::chart::{CalcVersion, ChartId};
use crate::common::validate_unit_interval;
use crate::evidence::Evidence;
use crate::geju::GejuPattern;
use crate::ganzhi::Element;
use crate::hanzao::{ClimateNeed, FinalTendency};
use crate::strength::BodyState;
use crate::{ContractViolation, Validate};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct YongShenInputs {
    pub body_state: BodyState,
    #[serde(default)]
    pub final_tendency: Option<FinalTendency>,
    #[serde(default)]
    pub primary_pattern: Option<GejuPattern>,
    pub margin: f64,
}

/// One row per `(chart_id, calc_version)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct YongShenResult {
    pub chart_id: ChartId,
    pub calc_version: CalcVersion,
    pub body_state: BodyState,
    pub primary_element: Element,
    pub primary_ten_god: String,
    pub supporting_elements: Vec<Element>,
    pub favorable: Vec<Element>,
    pub unfavorable: Vec<Element>,
    pub climate_needs: Vec<ClimateNeed>,
    pub evidence: Evidence<YongShenInputs>,
}

impl Validate for YongShenResult {
    fn validate(&self) -> Result<(), ContractViolation> {
        self.chart_id.validate()?;
        self.calc_version.validate()?;
        if self.favorable.iter().any(|e| self.unfavorable.contains(e)) {
            return Err(ContractViolation::InvalidValue {
                field: "yongshen_result.favorable",
                reason: "an element cannot be both favorable and unfavorable",
            });
        }
        if self.primary_ten_god.trim().is_empty() {
            return Err(ContractViolation::InvalidValue {
                field: "yongshen_result.primary_ten_god",
                reason: "must not be empty",
            });
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ElementScoreInputs {
    pub base_score: f64,
    pub delta: f64,
}

/// One row per element, five per `(chart_id, calc_version)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ElementScoreRow {
    pub chart_id: ChartId,
    pub calc_version: CalcVersion,
    pub element: Element,
    pub score: f64,
    pub is_favorable: bool,
    pub is_unfavorable: bool,
    pub evidence: Evidence<ElementScoreInputs>,
}

impl Validate for ElementScoreRow {
    fn validate(&self) -> Result<(), ContractViolation> {
        validate_unit_interval("element_score_row.score", self.score)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct YongShenOutcome {
    pub result: YongShenResult,
    pub scores: Vec<ElementScoreRow>,
}
