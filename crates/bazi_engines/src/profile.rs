#![forbid(unsafe_code)]

//! Ten-god family profile and luck-pillar projection. Both read earlier
//! stage outputs and persist nothing.

use bazi_kernel_contracts::chart::{ChartId, FourPillars};
use bazi_kernel_contracts::ganzhi::{Element, HiddenRank, Stem, TenGodFamily};
use bazi_kernel_contracts::profile::{
    FamilyScore, Favorability, Projection, ProjectionKind, ProjectionPillar, ProjectionRow,
    ProjectionStatus, TenGodProfile,
};
use bazi_kernel_contracts::relation::{Relation, RelationKind, RelationReport};
use bazi_kernel_contracts::yongshen::YongShenResult;
use bazi_kernel_contracts::Validate;
use tracing::debug;

use crate::dictionary::ElementDictionary;
use crate::error::EngineResult;
use crate::relation::branch_pair_relations;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProfileConfig {
    pub main_weight: f64,
    pub mid_weight: f64,
    pub res_weight: f64,
}

impl ProfileConfig {
    pub fn mvp_v1() -> Self {
        Self {
            main_weight: 1.0,
            mid_weight: 0.6,
            res_weight: 0.3,
        }
    }

    fn weight(&self, rank: HiddenRank) -> f64 {
        match rank {
            HiddenRank::Main => self.main_weight,
            HiddenRank::Mid => self.mid_weight,
            HiddenRank::Res => self.res_weight,
        }
    }
}

fn keywords(family: TenGodFamily) -> [&'static str; 3] {
    match family {
        TenGodFamily::Peer => ["自主", "坚毅", "好胜"],
        TenGodFamily::Output => ["表达", "才艺", "创造"],
        TenGodFamily::Wealth => ["务实", "经营", "理财"],
        TenGodFamily::Power => ["自律", "责任", "进取"],
        TenGodFamily::Resource => ["学习", "包容", "稳重"],
    }
}

/// ProfileSummarizer: ten-god family weights over the three non-day stems
/// and every hidden stem.
#[derive(Debug, Clone)]
pub struct ProfileRuntime {
    config: ProfileConfig,
}

impl ProfileRuntime {
    pub fn new(config: ProfileConfig) -> Self {
        Self { config }
    }

    pub fn run(&self, chart_id: &ChartId, relations: &RelationReport) -> EngineResult<TenGodProfile> {
        chart_id.validate()?;
        let family_scores: Vec<FamilyScore> = TenGodFamily::ALL
            .into_iter()
            .map(|family| {
                let exposed = relations
                    .ten_gods
                    .iter()
                    .filter(|t| !t.is_day_master && t.ten_god.family() == family)
                    .count() as u32;
                let hidden_weighted: f64 = relations
                    .hidden_stems
                    .iter()
                    .filter(|h| h.ten_god.family() == family)
                    .map(|h| self.config.weight(h.rank))
                    .sum();
                FamilyScore {
                    family,
                    exposed,
                    hidden_weighted,
                    total: f64::from(exposed) + hidden_weighted,
                }
            })
            .collect();

        let mut dominant = TenGodFamily::ALL[0];
        let mut best = f64::MIN;
        for s in &family_scores {
            if s.total > best {
                best = s.total;
                dominant = s.family;
            }
        }
        let absent_families = family_scores
            .iter()
            .filter(|s| s.total == 0.0)
            .map(|s| s.family)
            .collect();

        debug!(chart_id = %chart_id, dominant = dominant.as_str(), "ten-god profile built");
        Ok(TenGodProfile {
            chart_id: chart_id.clone(),
            family_scores,
            dominant_family: dominant,
            absent_families,
            keywords: keywords(dominant).iter().map(|k| k.to_string()).collect(),
        })
    }
}

/// ProjectionStage: scores caller-supplied decade or annual pillars against
/// the natal chart.
#[derive(Debug, Clone, Default)]
pub struct ProjectionRuntime;

impl ProjectionRuntime {
    pub fn new() -> Self {
        Self
    }

    pub fn run(
        &self,
        kind: ProjectionKind,
        pillars: &FourPillars,
        day_master: Stem,
        yongshen: Option<&YongShenResult>,
        requested: &[ProjectionPillar],
    ) -> EngineResult<Projection> {
        if requested.is_empty() {
            return Ok(Projection {
                kind,
                status: ProjectionStatus::NotRequested,
                rows: Vec::new(),
            });
        }
        pillars.validate()?;

        let favorability = |element: Element| match yongshen {
            Some(y) if y.favorable.contains(&element) => Favorability::Favorable,
            Some(y) if y.unfavorable.contains(&element) => Favorability::Unfavorable,
            _ => Favorability::Neutral,
        };

        let mut rows = Vec::with_capacity(requested.len());
        for lp in requested {
            lp.validate()?;
            let mut natal_interactions = Vec::new();
            for natal in pillars.iter() {
                for (kind, transforms_to) in branch_pair_relations(lp.branch, natal.branch) {
                    if !(kind.is_clash() || kind == RelationKind::BranchSixCombine) {
                        continue;
                    }
                    natal_interactions.push(Relation {
                        kind,
                        positions: vec![natal.position],
                        members: [lp.branch.as_char(), natal.branch.as_char()]
                            .iter()
                            .collect(),
                        transforms_to,
                        complete: true,
                    });
                }
            }
            rows.push(ProjectionRow {
                label: lp.label.clone(),
                stem: lp.stem,
                branch: lp.branch,
                stem_ten_god: ElementDictionary::ten_god(day_master, lp.stem),
                stem_favorability: favorability(ElementDictionary::stem_element(lp.stem)),
                branch_favorability: favorability(ElementDictionary::branch_element(lp.branch)),
                natal_interactions,
            });
        }

        debug!(kind = ?kind, rows = rows.len(), "projection scored");
        Ok(Projection {
            kind,
            status: ProjectionStatus::Projected,
            rows,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bazi_kernel_contracts::chart::PillarPosition;
    use bazi_kernel_contracts::ganzhi::{Branch, TenGod};

    use crate::relation::RelationRuntime;

    #[test]
    fn at_profile_summary_01_peer_heavy_chart_is_peer_dominant() {
        let pillars = FourPillars::parse("甲寅,甲寅,甲寅,乙卯").unwrap();
        let relations = RelationRuntime::new().run(&pillars).unwrap();
        let p = ProfileRuntime::new(ProfileConfig::mvp_v1())
            .run(&ChartId::new("chart-p").unwrap(), &relations)
            .unwrap();
        assert_eq!(p.dominant_family, TenGodFamily::Peer);
        assert_eq!(p.keywords.len(), 3);
        assert!(!p.absent_families.contains(&TenGodFamily::Peer));
    }

    #[test]
    fn at_projection_01_nothing_requested() {
        let pillars = FourPillars::parse("甲子,丙寅,戊辰,庚午").unwrap();
        let out = ProjectionRuntime::new()
            .run(ProjectionKind::Decade, &pillars, Stem::Wu, None, &[])
            .unwrap();
        assert_eq!(out.status, ProjectionStatus::NotRequested);
        assert!(out.rows.is_empty());
    }

    #[test]
    fn at_projection_02_annual_pillar_clashes_natal_branch() {
        let pillars = FourPillars::parse("甲子,丙寅,戊辰,庚午").unwrap();
        let out = ProjectionRuntime::new()
            .run(
                ProjectionKind::Annual,
                &pillars,
                Stem::Wu,
                None,
                &[ProjectionPillar {
                    label: "2032".to_string(),
                    stem: Stem::Ren,
                    branch: Branch::Zi,
                }],
            )
            .unwrap();
        let row = &out.rows[0];
        assert_eq!(row.stem_ten_god, TenGod::PianCai);
        assert_eq!(row.stem_favorability, Favorability::Neutral);
        let clash = row
            .natal_interactions
            .iter()
            .find(|r| r.kind == RelationKind::BranchClash)
            .unwrap();
        assert_eq!(clash.positions, vec![PillarPosition::Hour]);
        assert_eq!(clash.members, "子午");
    }
}
