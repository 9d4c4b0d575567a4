#![forbid(unsafe_code)]

use serde::{Deserialize, Serialize};

use crate::chart::{ChartId, PillarPosition};
use crate::common::{validate_finite, validate_unit_interval};
use crate::evidence::Evidence;
use crate::ganzhi::{Element, Stem, TenGod};
use crate::relation::RelationKind;
use crate::{ContractViolation, Validate};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum GejuPattern {
    ZhengGuanGe,
    QiShaGe,
    CaiGe,
    ShiShenGe,
    ShangGuanGe,
    YinGe,
    BiJieGe,
    Ordinary,
}

impl GejuPattern {
    pub fn label(self) -> &'static str {
        match self {
            GejuPattern::ZhengGuanGe => "官格",
            GejuPattern::QiShaGe => "杀格",
            GejuPattern::CaiGe => "财格",
            GejuPattern::ShiShenGe => "食神格",
            GejuPattern::ShangGuanGe => "伤官格",
            GejuPattern::YinGe => "印格",
            GejuPattern::BiJieGe => "比劫格",
            GejuPattern::Ordinary => "普通格局",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CandidateSource {
    MonthStem,
    MonthBranchMain,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandidateInputs {
    pub stem: Stem,
    #[serde(default)]
    pub ten_god: Option<TenGod>,
    #[serde(default)]
    pub exposed: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GejuCandidate {
    pub chart_id: ChartId,
    pub pattern: GejuPattern,
    pub source: CandidateSource,
    pub score: f64,
    pub confidence: f64,
    pub is_primary: bool,
    pub evidence: Evidence<CandidateInputs>,
}

impl Validate for GejuCandidate {
    fn validate(&self) -> Result<(), ContractViolation> {
        validate_finite("geju_candidate.score", self.score)?;
        validate_unit_interval("geju_candidate.confidence", self.confidence)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FormationInputs {
    pub relation_label: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GejuFormation {
    pub chart_id: ChartId,
    pub kind: RelationKind,
    pub members: String,
    pub positions: Vec<PillarPosition>,
    #[serde(default)]
    pub transforms_to: Option<Element>,
    pub complete: bool,
    pub score: f64,
    pub confidence: f64,
    pub evidence: Evidence<FormationInputs>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MixingFlag {
    #[serde(rename = "官杀混")]
    GuanShaMixed,
    #[serde(rename = "财混")]
    CaiMixed,
    #[serde(rename = "食伤混")]
    ShiShangMixed,
    #[serde(rename = "印混")]
    YinMixed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PurityLevel {
    Clean,
    RelativelyClean,
    Mixed,
    HeavilyMixed,
}

impl PurityLevel {
    pub fn from_score(score: f64) -> Self {
        if score >= 80.0 {
            PurityLevel::Clean
        } else if score >= 65.0 {
            PurityLevel::RelativelyClean
        } else if score >= 45.0 {
            PurityLevel::Mixed
        } else {
            PurityLevel::HeavilyMixed
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BreakLevel {
    None,
    Light,
    Medium,
    Heavy,
}

impl BreakLevel {
    pub fn from_breaker_count(count: usize) -> Self {
        match count {
            0 => BreakLevel::None,
            1 => BreakLevel::Light,
            2 | 3 => BreakLevel::Medium,
            _ => BreakLevel::Heavy,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Breaker {
    pub kind: RelationKind,
    pub members: String,
    pub positions: Vec<PillarPosition>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GejuSummaryInputs {
    pub pillars_sha256: String,
    pub month_stem: Stem,
    #[serde(default)]
    pub month_stem_ten_god: Option<TenGod>,
    pub is_deling: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GejuSummary {
    pub chart_id: ChartId,
    pub primary_pattern: GejuPattern,
    pub purity_score: f64,
    pub purity_level: PurityLevel,
    pub break_level: BreakLevel,
    pub breakers: Vec<Breaker>,
    pub mixing_flags: Vec<MixingFlag>,
    pub evidence: Evidence<GejuSummaryInputs>,
}

impl Validate for GejuSummary {
    fn validate(&self) -> Result<(), ContractViolation> {
        if !(0.0..=100.0).contains(&self.purity_score) {
            return Err(ContractViolation::InvalidRange {
                field: "geju_summary.purity_score",
                min: 0.0,
                max: 100.0,
                got: self.purity_score,
            });
        }
        if self.purity_level != PurityLevel::from_score(self.purity_score) {
            return Err(ContractViolation::InvalidValue {
                field: "geju_summary.purity_level",
                reason: "must match purity_score band",
            });
        }
        if self.break_level != BreakLevel::from_breaker_count(self.breakers.len()) {
            return Err(ContractViolation::InvalidValue {
                field: "geju_summary.break_level",
                reason: "must match breaker count band",
            });
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct GejuOutcome {
    pub candidates: Vec<GejuCandidate>,
    pub formations: Vec<GejuFormation>,
    pub summary: GejuSummary,
}
