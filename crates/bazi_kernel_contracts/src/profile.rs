#![forbid(unsafe_code)]

use serde::{Deserialize, Serialize};

use crate::chart::ChartId;
use crate::ganzhi::{Branch, Element, Stem, TenGod, TenGodFamily, YinYang};
use crate::relation::Relation;
use crate::{ContractViolation, Validate};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DayMaster {
    pub stem: Stem,
    pub element: Element,
    pub yin_yang: YinYang,
}

/// Per-element occurrence counts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ElementTally {
    pub wood: u32,
    pub fire: u32,
    pub earth: u32,
    pub metal: u32,
    pub water: u32,
}

impl ElementTally {
    pub fn add(&mut self, element: Element) {
        *self.slot(element) += 1;
    }

    pub fn get(&self, element: Element) -> u32 {
        match element {
            Element::Wood => self.wood,
            Element::Fire => self.fire,
            Element::Earth => self.earth,
            Element::Metal => self.metal,
            Element::Water => self.water,
        }
    }

    pub fn total(&self) -> u32 {
        Element::ALL.iter().map(|e| self.get(*e)).sum()
    }

    pub fn missing(&self) -> Vec<Element> {
        Element::ALL
            .into_iter()
            .filter(|e| self.get(*e) == 0)
            .collect()
    }

    fn slot(&mut self, element: Element) -> &mut u32 {
        match element {
            Element::Wood => &mut self.wood,
            Element::Fire => &mut self.fire,
            Element::Earth => &mut self.earth,
            Element::Metal => &mut self.metal,
            Element::Water => &mut self.water,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PillarProfile {
    pub chart_id: ChartId,
    pub day_master: DayMaster,
    /// Four exposed stems plus four branch main elements.
    pub raw_tally: ElementTally,
    /// Every hidden stem, unweighted.
    pub hidden_tally: ElementTally,
}

impl Validate for PillarProfile {
    fn validate(&self) -> Result<(), ContractViolation> {
        self.chart_id.validate()?;
        if self.raw_tally.total() != 8 {
            return Err(ContractViolation::InvalidValue {
                field: "pillar_profile.raw_tally",
                reason: "must count exactly 8 occurrences",
            });
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FamilyScore {
    pub family: TenGodFamily,
    pub exposed: u32,
    pub hidden_weighted: f64,
    pub total: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TenGodProfile {
    pub chart_id: ChartId,
    pub family_scores: Vec<FamilyScore>,
    pub dominant_family: TenGodFamily,
    pub absent_families: Vec<TenGodFamily>,
    pub keywords: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ProjectionKind {
    Decade,
    Annual,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ProjectionStatus {
    NotRequested,
    Projected,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Favorability {
    Favorable,
    Unfavorable,
    Neutral,
}

/// A luck pillar supplied by the caller, e.g. the decade starting at age 8
/// or the year 2031.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectionPillar {
    pub label: String,
    pub stem: Stem,
    pub branch: Branch,
}

impl Validate for ProjectionPillar {
    fn validate(&self) -> Result<(), ContractViolation> {
        crate::common::validate_id("projection_pillar.label", &self.label, 64)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectionRow {
    pub label: String,
    pub stem: Stem,
    pub branch: Branch,
    pub stem_ten_god: TenGod,
    pub stem_favorability: Favorability,
    pub branch_favorability: Favorability,
    pub natal_interactions: Vec<Relation>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Projection {
    pub kind: ProjectionKind,
    pub status: ProjectionStatus,
    pub rows: Vec<ProjectionRow>,
}
