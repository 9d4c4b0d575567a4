#![forbid(unsafe_code)]

use serde::{Deserialize, Serialize};

use crate::chart::{ChartId, RulesetId};
use crate::common::validate_finite;
use crate::evidence::Evidence;
use crate::ganzhi::{Element, Season};
use crate::{ContractViolation, Validate};

/// Climate tendencies in their fixed evaluation order.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Tendency {
    Han,
    Re,
    Zao,
    Shi,
}

impl Tendency {
    pub const ALL: [Tendency; 4] = [Tendency::Han, Tendency::Re, Tendency::Zao, Tendency::Shi];

    pub fn as_str(self) -> &'static str {
        match self {
            Tendency::Han => "HAN",
            Tendency::Re => "RE",
            Tendency::Zao => "ZAO",
            Tendency::Shi => "SHI",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FinalTendency {
    Han,
    Re,
    Zao,
    Shi,
    Neutral,
}

impl From<Tendency> for FinalTendency {
    fn from(t: Tendency) -> Self {
        match t {
            Tendency::Han => FinalTendency::Han,
            Tendency::Re => FinalTendency::Re,
            Tendency::Zao => FinalTendency::Zao,
            Tendency::Shi => FinalTendency::Shi,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StrengthLevel {
    Low,
    Medium,
    High,
}

impl StrengthLevel {
    pub fn from_count(count: u32) -> Self {
        if count >= 3 {
            StrengthLevel::High
        } else if count >= 2 {
            StrengthLevel::Medium
        } else {
            StrengthLevel::Low
        }
    }
}

/// What the chart's climate asks of the useful-element selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ClimateNeed {
    NeedsWarmth,
    NeedsMoisture,
}

impl ClimateNeed {
    pub fn element(self) -> Element {
        match self {
            ClimateNeed::NeedsWarmth => Element::Fire,
            ClimateNeed::NeedsMoisture => Element::Water,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "source", rename_all = "snake_case")]
pub enum Contribution {
    Season {
        season: Season,
        weight: f64,
    },
    Element {
        element: Element,
        count: u32,
        strength_level: StrengthLevel,
        element_weight: f64,
        level_weight: f64,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HanZaoDetailInputs {
    pub contribution: Contribution,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HanZaoDetail {
    pub chart_id: ChartId,
    pub tendency: Tendency,
    pub score: f64,
    pub evidence: Evidence<HanZaoDetailInputs>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ElementCount {
    pub element: Element,
    pub count: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HanZaoSummaryInputs {
    pub pillars_sha256: String,
    pub season: Season,
    pub element_counts: Vec<ElementCount>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HanZaoSummary {
    pub chart_id: ChartId,
    pub ruleset_id: RulesetId,
    pub han_score: f64,
    pub re_score: f64,
    pub zao_score: f64,
    pub shi_score: f64,
    pub final_tendency: FinalTendency,
    pub needs: Vec<ClimateNeed>,
    pub evidence: Evidence<HanZaoSummaryInputs>,
}

impl HanZaoSummary {
    pub fn score(&self, tendency: Tendency) -> f64 {
        match tendency {
            Tendency::Han => self.han_score,
            Tendency::Re => self.re_score,
            Tendency::Zao => self.zao_score,
            Tendency::Shi => self.shi_score,
        }
    }
}

impl Validate for HanZaoSummary {
    fn validate(&self) -> Result<(), ContractViolation> {
        validate_finite("hanzao_summary.han_score", self.han_score)?;
        validate_finite("hanzao_summary.re_score", self.re_score)?;
        validate_finite("hanzao_summary.zao_score", self.zao_score)?;
        validate_finite("hanzao_summary.shi_score", self.shi_score)?;
        let any_positive = Tendency::ALL.iter().any(|t| self.score(*t) > 0.0);
        if any_positive == (self.final_tendency == FinalTendency::Neutral) {
            return Err(ContractViolation::InvalidValue {
                field: "hanzao_summary.final_tendency",
                reason: "must be NEUTRAL exactly when no score is positive",
            });
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct HanZaoOutcome {
    pub details: Vec<HanZaoDetail>,
    pub summary: HanZaoSummary,
}
