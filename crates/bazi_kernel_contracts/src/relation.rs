#![forbid(unsafe_code)]

use serde::{Deserialize, Serialize};

use crate::chart::PillarPosition;
use crate::ganzhi::{Branch, Element, HiddenRank, Stem, TenGod};

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RelationKind {
    /// 天干五合
    StemCombine,
    /// 天干相冲
    StemClash,
    /// 六合
    BranchSixCombine,
    /// 三合 (complete) or 半合 (partial)
    BranchTripleCombine,
    /// 三会
    BranchDirectional,
    /// 六冲
    BranchClash,
    /// 六害
    BranchHarm,
    /// 刑
    BranchPunish,
    /// 破
    BranchBreak,
}

impl RelationKind {
    pub fn is_combination(self) -> bool {
        matches!(
            self,
            RelationKind::StemCombine
                | RelationKind::BranchSixCombine
                | RelationKind::BranchTripleCombine
                | RelationKind::BranchDirectional
        )
    }

    pub fn is_clash(self) -> bool {
        matches!(self, RelationKind::StemClash | RelationKind::BranchClash)
    }

    /// Relations that damage a formation: clash, harm, punishment, break.
    pub fn is_breaker(self) -> bool {
        matches!(
            self,
            RelationKind::StemClash
                | RelationKind::BranchClash
                | RelationKind::BranchHarm
                | RelationKind::BranchPunish
                | RelationKind::BranchBreak
        )
    }

    pub fn is_branch_combination(self) -> bool {
        matches!(
            self,
            RelationKind::BranchSixCombine
                | RelationKind::BranchTripleCombine
                | RelationKind::BranchDirectional
        )
    }

    pub fn label(self) -> &'static str {
        match self {
            RelationKind::StemCombine => "天干五合",
            RelationKind::StemClash => "天干相冲",
            RelationKind::BranchSixCombine => "六合",
            RelationKind::BranchTripleCombine => "三合",
            RelationKind::BranchDirectional => "三会",
            RelationKind::BranchClash => "六冲",
            RelationKind::BranchHarm => "六害",
            RelationKind::BranchPunish => "刑",
            RelationKind::BranchBreak => "破",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Relation {
    pub kind: RelationKind,
    pub positions: Vec<PillarPosition>,
    /// Participating characters in position order, e.g. `"子午"`.
    pub members: String,
    #[serde(default)]
    pub transforms_to: Option<Element>,
    pub complete: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TenGodAssignment {
    pub position: PillarPosition,
    pub stem: Stem,
    pub ten_god: TenGod,
    pub is_day_master: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HiddenStemEntry {
    pub position: PillarPosition,
    pub branch: Branch,
    pub stem: Stem,
    pub rank: HiddenRank,
    pub ten_god: TenGod,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelationReport {
    pub ten_gods: Vec<TenGodAssignment>,
    pub hidden_stems: Vec<HiddenStemEntry>,
    pub relations: Vec<Relation>,
}

impl RelationReport {
    pub fn ten_god_at(&self, position: PillarPosition) -> Option<TenGod> {
        self.ten_gods
            .iter()
            .find(|t| t.position == position)
            .map(|t| t.ten_god)
    }

    pub fn combinations(&self) -> impl Iterator<Item = &Relation> {
        self.relations.iter().filter(|r| r.kind.is_combination())
    }

    pub fn clashes(&self) -> impl Iterator<Item = &Relation> {
        self.relations.iter().filter(|r| r.kind.is_clash())
    }

    pub fn breakers(&self) -> impl Iterator<Item = &Relation> {
        self.relations.iter().filter(|r| r.kind.is_breaker())
    }

    pub fn branch_combinations(&self) -> impl Iterator<Item = &Relation> {
        self.relations
            .iter()
            .filter(|r| r.kind.is_branch_combination())
    }
}
