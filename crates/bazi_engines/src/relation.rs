#![forbid(unsafe_code)]

//! Ten-god assignment, hidden-stem listing and stem/branch interactions
//! (合冲刑害破) for one chart.

use bazi_kernel_contracts::chart::{FourPillars, PillarPosition};
use bazi_kernel_contracts::ganzhi::{Branch, Element, Stem};
use bazi_kernel_contracts::relation::{
    HiddenStemEntry, Relation, RelationKind, RelationReport, TenGodAssignment,
};
use bazi_kernel_contracts::Validate;
use tracing::debug;

use crate::dictionary::ElementDictionary;
use crate::error::{EngineError, EngineResult};

const STEM_COMBINES: [(Stem, Stem, Element); 5] = [
    (Stem::Jia, Stem::Ji, Element::Earth),
    (Stem::Yi, Stem::Geng, Element::Metal),
    (Stem::Bing, Stem::Xin, Element::Water),
    (Stem::Ding, Stem::Ren, Element::Wood),
    (Stem::Wu, Stem::Gui, Element::Fire),
];

const STEM_CLASHES: [(Stem, Stem); 4] = [
    (Stem::Jia, Stem::Geng),
    (Stem::Yi, Stem::Xin),
    (Stem::Bing, Stem::Ren),
    (Stem::Ding, Stem::Gui),
];

const SIX_COMBINES: [(Branch, Branch, Element); 6] = [
    (Branch::Zi, Branch::Chou, Element::Earth),
    (Branch::Yin, Branch::Hai, Element::Wood),
    (Branch::Mao, Branch::Xu, Element::Fire),
    (Branch::Chen, Branch::You, Element::Metal),
    (Branch::Si, Branch::Shen, Element::Water),
    (Branch::Wu, Branch::Wei, Element::Earth),
];

const HARMS: [(Branch, Branch); 6] = [
    (Branch::Zi, Branch::Wei),
    (Branch::Chou, Branch::Wu),
    (Branch::Yin, Branch::Si),
    (Branch::Mao, Branch::Chen),
    (Branch::Shen, Branch::Hai),
    (Branch::You, Branch::Xu),
];

const PUNISHMENTS: [(Branch, Branch); 7] = [
    (Branch::Yin, Branch::Si),
    (Branch::Si, Branch::Shen),
    (Branch::Yin, Branch::Shen),
    (Branch::Chou, Branch::Xu),
    (Branch::Xu, Branch::Wei),
    (Branch::Chou, Branch::Wei),
    (Branch::Zi, Branch::Mao),
];

const SELF_PUNISHING: [Branch; 4] = [Branch::Chen, Branch::Wu, Branch::You, Branch::Hai];

const BREAKS: [(Branch, Branch); 6] = [
    (Branch::Zi, Branch::You),
    (Branch::Wu, Branch::Mao),
    (Branch::Shen, Branch::Si),
    (Branch::Yin, Branch::Hai),
    (Branch::Chen, Branch::Chou),
    (Branch::Xu, Branch::Wei),
];

/// 三合 frames; the middle branch is the one a half-combination must keep.
const TRIPLE_FRAMES: [([Branch; 3], Element); 4] = [
    ([Branch::Shen, Branch::Zi, Branch::Chen], Element::Water),
    ([Branch::Hai, Branch::Mao, Branch::Wei], Element::Wood),
    ([Branch::Yin, Branch::Wu, Branch::Xu], Element::Fire),
    ([Branch::Si, Branch::You, Branch::Chou], Element::Metal),
];

const DIRECTIONAL_FRAMES: [([Branch; 3], Element); 4] = [
    ([Branch::Yin, Branch::Mao, Branch::Chen], Element::Wood),
    ([Branch::Si, Branch::Wu, Branch::Wei], Element::Fire),
    ([Branch::Shen, Branch::You, Branch::Xu], Element::Metal),
    ([Branch::Hai, Branch::Zi, Branch::Chou], Element::Water),
];

fn unordered<T: PartialEq + Copy>(a: T, b: T, x: T, y: T) -> bool {
    (a == x && b == y) || (a == y && b == x)
}

/// Pairwise stem relations in a fixed kind order.
pub fn stem_pair_relations(a: Stem, b: Stem) -> Vec<(RelationKind, Option<Element>)> {
    let mut out = Vec::new();
    if let Some((_, _, e)) = STEM_COMBINES
        .iter()
        .find(|(x, y, _)| unordered(a, b, *x, *y))
    {
        out.push((RelationKind::StemCombine, Some(*e)));
    }
    if STEM_CLASHES.iter().any(|(x, y)| unordered(a, b, *x, *y)) {
        out.push((RelationKind::StemClash, None));
    }
    out
}

/// Pairwise branch relations in a fixed kind order. Multi-branch frames
/// (三合, 三会) are not pairwise and are detected separately.
pub fn branch_pair_relations(a: Branch, b: Branch) -> Vec<(RelationKind, Option<Element>)> {
    let mut out = Vec::new();
    if let Some((_, _, e)) = SIX_COMBINES
        .iter()
        .find(|(x, y, _)| unordered(a, b, *x, *y))
    {
        out.push((RelationKind::BranchSixCombine, Some(*e)));
    }
    if a != b && (a.index() + 6) % 12 == b.index() {
        out.push((RelationKind::BranchClash, None));
    }
    if HARMS.iter().any(|(x, y)| unordered(a, b, *x, *y)) {
        out.push((RelationKind::BranchHarm, None));
    }
    if PUNISHMENTS.iter().any(|(x, y)| unordered(a, b, *x, *y))
        || (a == b && SELF_PUNISHING.contains(&a))
    {
        out.push((RelationKind::BranchPunish, None));
    }
    if BREAKS.iter().any(|(x, y)| unordered(a, b, *x, *y)) {
        out.push((RelationKind::BranchBreak, None));
    }
    out
}

#[derive(Debug, Clone, Default)]
pub struct RelationRuntime;

impl RelationRuntime {
    pub fn new() -> Self {
        Self
    }

    pub fn run(&self, pillars: &FourPillars) -> EngineResult<RelationReport> {
        pillars.validate()?;
        let day_master = pillars
            .day_stem()
            .ok_or_else(|| EngineError::missing("four_pillars", "day"))?;

        let ten_gods = pillars
            .iter()
            .map(|p| TenGodAssignment {
                position: p.position,
                stem: p.stem,
                ten_god: ElementDictionary::ten_god(day_master, p.stem),
                is_day_master: p.position == PillarPosition::Day,
            })
            .collect();

        let hidden_stems = pillars
            .iter()
            .flat_map(|p| {
                ElementDictionary::hidden_stems(p.branch)
                    .iter()
                    .map(move |h| HiddenStemEntry {
                        position: p.position,
                        branch: p.branch,
                        stem: h.stem,
                        rank: h.rank,
                        ten_god: ElementDictionary::ten_god(day_master, h.stem),
                    })
            })
            .collect();

        let mut relations = Vec::new();
        let ps: Vec<_> = pillars.iter().collect();
        for i in 0..ps.len() {
            for j in (i + 1)..ps.len() {
                let (a, b) = (ps[i], ps[j]);
                for (kind, transforms_to) in stem_pair_relations(a.stem, b.stem) {
                    relations.push(Relation {
                        kind,
                        positions: vec![a.position, b.position],
                        members: [a.stem.as_char(), b.stem.as_char()].iter().collect(),
                        transforms_to,
                        complete: true,
                    });
                }
            }
        }
        for i in 0..ps.len() {
            for j in (i + 1)..ps.len() {
                let (a, b) = (ps[i], ps[j]);
                for (kind, transforms_to) in branch_pair_relations(a.branch, b.branch) {
                    relations.push(Relation {
                        kind,
                        positions: vec![a.position, b.position],
                        members: [a.branch.as_char(), b.branch.as_char()].iter().collect(),
                        transforms_to,
                        complete: true,
                    });
                }
            }
        }
        for (frame, element) in TRIPLE_FRAMES {
            if let Some(r) = frame_relation(
                pillars,
                RelationKind::BranchTripleCombine,
                &frame,
                element,
            ) {
                relations.push(r);
            }
        }
        for (frame, element) in DIRECTIONAL_FRAMES {
            if let Some(r) =
                frame_relation(pillars, RelationKind::BranchDirectional, &frame, element)
            {
                relations.push(r);
            }
        }

        debug!(
            pillars = %pillars.canonical(),
            relation_count = relations.len(),
            "relations analyzed"
        );
        Ok(RelationReport {
            ten_gods,
            hidden_stems,
            relations,
        })
    }
}

/// Complete when all three frame branches appear; partial when two distinct
/// branches appear and one of them is the middle branch.
fn frame_relation(
    pillars: &FourPillars,
    kind: RelationKind,
    frame: &[Branch; 3],
    element: Element,
) -> Option<Relation> {
    let hits: Vec<_> = pillars
        .iter()
        .filter(|p| frame.contains(&p.branch))
        .collect();
    let distinct = frame
        .iter()
        .filter(|b| hits.iter().any(|p| p.branch == **b))
        .count();
    let has_middle = hits.iter().any(|p| p.branch == frame[1]);
    let complete = distinct == 3;
    if !(complete || (distinct == 2 && has_middle)) {
        return None;
    }
    Some(Relation {
        kind,
        positions: hits.iter().map(|p| p.position).collect(),
        members: hits.iter().map(|p| p.branch.as_char()).collect(),
        transforms_to: Some(element),
        complete,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use bazi_kernel_contracts::ganzhi::TenGod;

    fn report(text: &str) -> RelationReport {
        RelationRuntime::new()
            .run(&FourPillars::parse(text).unwrap())
            .unwrap()
    }

    #[test]
    fn at_relation_01_day_stem_is_bijian_and_flagged() {
        let r = report("甲子,丙子,甲子,甲子");
        let day = r
            .ten_gods
            .iter()
            .find(|t| t.position == PillarPosition::Day)
            .unwrap();
        assert!(day.is_day_master);
        assert_eq!(day.ten_god, TenGod::BiJian);
        assert_eq!(r.ten_god_at(PillarPosition::Month), Some(TenGod::ShiShen));
    }

    #[test]
    fn at_relation_02_zi_wu_clash_is_found() {
        let r = report("甲子,丙寅,戊辰,庚午");
        let clash = r
            .relations
            .iter()
            .find(|x| x.kind == RelationKind::BranchClash)
            .unwrap();
        assert_eq!(clash.members, "子午");
        assert_eq!(
            clash.positions,
            vec![PillarPosition::Year, PillarPosition::Hour]
        );
        // 甲 year, 庚 hour
        assert!(r.relations.iter().any(|x| x.kind == RelationKind::StemClash));
    }

    #[test]
    fn at_relation_03_triple_combine_complete_and_half() {
        let full = report("庚申,戊子,甲辰,丙寅");
        let t = full
            .relations
            .iter()
            .find(|x| x.kind == RelationKind::BranchTripleCombine)
            .unwrap();
        assert!(t.complete);
        assert_eq!(t.transforms_to, Some(Element::Water));

        let half = report("庚申,戊子,甲午,丙寅");
        let t = half
            .relations
            .iter()
            .find(|x| x.kind == RelationKind::BranchTripleCombine && x.members == "申子")
            .unwrap();
        assert!(!t.complete);

        // 申辰 without the middle 子 is no combination
        let none = report("庚申,戊午,甲辰,丙寅");
        assert!(!none
            .relations
            .iter()
            .any(|x| x.kind == RelationKind::BranchTripleCombine && x.members.contains('申')));
    }

    #[test]
    fn at_relation_04_self_punishment_needs_matching_branch() {
        let pairs = branch_pair_relations(Branch::Wu, Branch::Wu);
        assert!(pairs.iter().any(|(k, _)| *k == RelationKind::BranchPunish));
        assert!(branch_pair_relations(Branch::Zi, Branch::Zi).is_empty());
    }

    #[test]
    fn at_relation_05_hidden_stems_listed_per_branch() {
        let r = report("甲子,丙寅,戊辰,庚午");
        // 子1 寅3 辰3 午2
        assert_eq!(r.hidden_stems.len(), 9);
    }
}
