#![forbid(unsafe_code)]

use serde::{Deserialize, Serialize};

use crate::chart::ChartId;
use crate::deling::DelingResult;
use crate::ganzhi::Element;
use crate::rootqi::{TongGenReport, TouGanReport};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BodyState {
    #[serde(rename = "身强")]
    Strong,
    #[serde(rename = "身弱")]
    Weak,
    #[serde(rename = "平衡")]
    Balanced,
}

impl BodyState {
    pub fn as_str(self) -> &'static str {
        match self {
            BodyState::Strong => "身强",
            BodyState::Weak => "身弱",
            BodyState::Balanced => "平衡",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct TenGodCounts {
    pub resource: u32,
    pub peer: u32,
    pub output: u32,
    pub wealth: u32,
    pub power: u32,
}

impl TenGodCounts {
    pub fn favorable(&self) -> u32 {
        self.resource + self.peer
    }

    pub fn unfavorable(&self) -> u32 {
        self.output + self.wealth + self.power
    }
}

/// StrengthJudge output. Not persisted; the three sub-reports are `None`
/// when their engine failed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StrengthJudgement {
    pub chart_id: ChartId,
    pub day_master_element: Element,
    pub counts: TenGodCounts,
    pub rooting_score: f64,
    pub season_score: f64,
    pub favorable_sum: f64,
    pub unfavorable_sum: f64,
    pub body_state: BodyState,
    pub deling: Option<DelingResult>,
    pub tong_gen: Option<TongGenReport>,
    pub tou_gan: Option<TouGanReport>,
}

impl StrengthJudgement {
    pub fn is_deling(&self) -> bool {
        self.deling.as_ref().is_some_and(|d| d.is_deling)
    }

    pub fn margin(&self) -> f64 {
        self.favorable_sum - self.unfavorable_sum
    }
}
