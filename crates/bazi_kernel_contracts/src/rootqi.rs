#![forbid(unsafe_code)]

use serde::{Deserialize, Serialize};

use crate::chart::{ChartId, PillarPosition};
use crate::common::validate_finite;
use crate::evidence::Evidence;
use crate::ganzhi::{Branch, Element, HiddenRank, StateLevel, Stem};
use crate::ruleset::RootLevelBand;
use crate::{ContractViolation, Validate};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RootType {
    SameStem,
    SameElement,
    KuGrave,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RootLevel {
    None,
    Weak,
    Medium,
    Strong,
    Unknown,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RootWeights {
    pub hidden_rank_weight: f64,
    pub position_weight: f64,
    pub seasonal_weight: f64,
}

impl RootWeights {
    pub fn product(&self) -> f64 {
        self.hidden_rank_weight * self.position_weight * self.seasonal_weight
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RootDetailInputs {
    pub target_element: Element,
    pub hit_element: Element,
    #[serde(default)]
    pub target_seasonal_state: Option<StateLevel>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RootQiDetail {
    pub chart_id: ChartId,
    pub target_pillar: PillarPosition,
    pub target_stem: Stem,
    pub root_pillar: PillarPosition,
    pub root_branch: Branch,
    pub hit_hidden_stem: Stem,
    pub hidden_rank: HiddenRank,
    pub root_type: RootType,
    pub weights: RootWeights,
    pub root_score: f64,
    pub evidence: Evidence<RootDetailInputs>,
}

impl Validate for RootQiDetail {
    fn validate(&self) -> Result<(), ContractViolation> {
        validate_finite("rootqi_detail.root_score", self.root_score)?;
        if self.root_score <= 0.0 {
            return Err(ContractViolation::InvalidValue {
                field: "rootqi_detail.root_score",
                reason: "must be > 0",
            });
        }
        if self.root_type == RootType::SameStem && self.hit_hidden_stem != self.target_stem {
            return Err(ContractViolation::InvalidValue {
                field: "rootqi_detail.root_type",
                reason: "SAME_STEM requires the hidden stem to equal the target stem",
            });
        }
        if self.evidence.inputs.hit_element != self.evidence.inputs.target_element {
            return Err(ContractViolation::InvalidValue {
                field: "rootqi_detail.evidence",
                reason: "a root must share the target element",
            });
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BestRoot {
    pub root_pillar: PillarPosition,
    pub root_branch: Branch,
    pub hit_hidden_stem: Stem,
    pub root_type: RootType,
    pub root_score: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RootSummaryInputs {
    pub pillars_sha256: String,
    pub detail_count: u32,
    #[serde(default)]
    pub matched_band: Option<RootLevelBand>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RootQiSummary {
    pub chart_id: ChartId,
    pub target_pillar: PillarPosition,
    pub target_stem: Stem,
    pub total_root_score: f64,
    pub root_level: RootLevel,
    #[serde(default)]
    pub best_root: Option<BestRoot>,
    pub evidence: Evidence<RootSummaryInputs>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RootQiOutcome {
    pub details: Vec<RootQiDetail>,
    pub summaries: Vec<RootQiSummary>,
}

impl RootQiOutcome {
    pub fn summary_for(&self, position: PillarPosition) -> Option<&RootQiSummary> {
        self.summaries.iter().find(|s| s.target_pillar == position)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TongGenInputs {
    pub day_stem: Stem,
}

/// 通根: one row per hidden stem, flagging whether it carries the day
/// master's element.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TongGenDetail {
    pub chart_id: ChartId,
    pub pillar: PillarPosition,
    pub branch: Branch,
    pub hidden_stem: Stem,
    pub hidden_rank: HiddenRank,
    pub hidden_element: Element,
    pub day_master_element: Element,
    pub is_root: bool,
    pub evidence: Evidence<TongGenInputs>,
}

impl Validate for TongGenDetail {
    fn validate(&self) -> Result<(), ContractViolation> {
        if self.is_root != (self.hidden_element == self.day_master_element) {
            return Err(ContractViolation::InvalidValue {
                field: "tonggen_detail.is_root",
                reason: "must match whether the hidden element is the day master element",
            });
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TongGenReport {
    pub chart_id: ChartId,
    pub details: Vec<TongGenDetail>,
}

impl TongGenReport {
    pub fn rooted_count(&self) -> usize {
        self.details.iter().filter(|d| d.is_root).count()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TouGanInputs {
    pub exposed_stems: Vec<Stem>,
}

/// 透干: one row per hidden stem, flagging whether the same stem is exposed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TouGanDetail {
    pub chart_id: ChartId,
    pub pillar: PillarPosition,
    pub branch: Branch,
    pub hidden_stem: Stem,
    pub hidden_rank: HiddenRank,
    pub is_exposed: bool,
    pub exposed_positions: Vec<PillarPosition>,
    pub evidence: Evidence<TouGanInputs>,
}

impl Validate for TouGanDetail {
    fn validate(&self) -> Result<(), ContractViolation> {
        if self.is_exposed == self.exposed_positions.is_empty() {
            return Err(ContractViolation::InvalidValue {
                field: "tougan_detail.is_exposed",
                reason: "must be set exactly when exposed positions are listed",
            });
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TouGanReport {
    pub chart_id: ChartId,
    pub details: Vec<TouGanDetail>,
}

impl TouGanReport {
    pub fn exposed_count(&self) -> usize {
        self.details.iter().filter(|d| d.is_exposed).count()
    }

    pub fn is_exposed(&self, pillar: PillarPosition, stem: Stem) -> bool {
        self.details
            .iter()
            .any(|d| d.pillar == pillar && d.hidden_stem == stem && d.is_exposed)
    }
}
