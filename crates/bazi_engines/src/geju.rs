#![forbid(unsafe_code)]

use bazi_kernel_contracts::chart::{ChartId, FourPillars, PillarPosition};
use bazi_kernel_contracts::evidence::Evidence;
use bazi_kernel_contracts::ganzhi::TenGod;
use bazi_kernel_contracts::geju::{
    BreakLevel, Breaker, CandidateInputs, CandidateSource, FormationInputs, GejuCandidate,
    GejuFormation, GejuOutcome, GejuPattern, GejuSummary, GejuSummaryInputs, MixingFlag,
    PurityLevel,
};
use bazi_kernel_contracts::relation::RelationReport;
use bazi_kernel_contracts::strength::StrengthJudgement;
use bazi_kernel_contracts::Validate;
use tracing::debug;

use crate::dictionary::ElementDictionary;
use crate::error::{EngineError, EngineResult};
use crate::fingerprint::pillars_sha256;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GejuConfig {
    pub purity_base: f64,
    pub deling_bonus: f64,
    pub breaker_penalty: f64,
    pub mixing_penalty: f64,
    pub month_stem_score: f64,
    pub month_stem_confidence: f64,
    pub branch_main_exposed_score: f64,
    pub branch_main_exposed_confidence: f64,
    pub branch_main_hidden_score: f64,
    pub branch_main_hidden_confidence: f64,
    pub complete_formation_score: f64,
    pub complete_formation_confidence: f64,
    pub partial_formation_score: f64,
    pub partial_formation_confidence: f64,
}

impl GejuConfig {
    pub fn mvp_v1() -> Self {
        Self {
            purity_base: 70.0,
            deling_bonus: 8.0,
            breaker_penalty: 4.0,
            mixing_penalty: 6.0,
            month_stem_score: 70.0,
            month_stem_confidence: 0.6,
            branch_main_exposed_score: 75.0,
            branch_main_exposed_confidence: 0.7,
            branch_main_hidden_score: 55.0,
            branch_main_hidden_confidence: 0.5,
            complete_formation_score: 80.0,
            complete_formation_confidence: 0.7,
            partial_formation_score: 60.0,
            partial_formation_confidence: 0.5,
        }
    }
}

pub fn pattern_for(ten_god: Option<TenGod>) -> GejuPattern {
    match ten_god {
        Some(TenGod::ZhengGuan) => GejuPattern::ZhengGuanGe,
        Some(TenGod::QiSha) => GejuPattern::QiShaGe,
        Some(TenGod::ZhengCai | TenGod::PianCai) => GejuPattern::CaiGe,
        Some(TenGod::ShiShen) => GejuPattern::ShiShenGe,
        Some(TenGod::ShangGuan) => GejuPattern::ShangGuanGe,
        Some(TenGod::ZhengYin | TenGod::PianYin) => GejuPattern::YinGe,
        Some(TenGod::BiJian | TenGod::JieCai) => GejuPattern::BiJieGe,
        None => GejuPattern::Ordinary,
    }
}

/// Both polarities of a family among the non-day stems.
pub fn mixing_flags(gods: &[TenGod]) -> Vec<MixingFlag> {
    let has = |g: TenGod| gods.contains(&g);
    let mut flags = Vec::new();
    if has(TenGod::ZhengGuan) && has(TenGod::QiSha) {
        flags.push(MixingFlag::GuanShaMixed);
    }
    if has(TenGod::ZhengCai) && has(TenGod::PianCai) {
        flags.push(MixingFlag::CaiMixed);
    }
    if has(TenGod::ShiShen) && has(TenGod::ShangGuan) {
        flags.push(MixingFlag::ShiShangMixed);
    }
    if has(TenGod::ZhengYin) && has(TenGod::PianYin) {
        flags.push(MixingFlag::YinMixed);
    }
    flags
}

#[derive(Debug, Clone)]
pub struct GejuRuntime {
    config: GejuConfig,
}

impl GejuRuntime {
    pub fn new(config: GejuConfig) -> Self {
        Self { config }
    }

    /// `strength` may be absent when StrengthJudge failed; the chart is then
    /// treated as not holding command and exposure is read off the pillars.
    pub fn run(
        &self,
        chart_id: &ChartId,
        pillars: &FourPillars,
        relations: &RelationReport,
        strength: Option<&StrengthJudgement>,
    ) -> EngineResult<GejuOutcome> {
        chart_id.validate()?;
        pillars.validate()?;
        let cfg = &self.config;
        let day_stem = pillars
            .day_stem()
            .ok_or_else(|| EngineError::missing("four_pillars", "day"))?;
        let month_stem = pillars
            .stem_at(PillarPosition::Month)
            .ok_or_else(|| EngineError::missing("four_pillars", "month"))?;
        let month_branch = pillars
            .month_branch()
            .ok_or_else(|| EngineError::missing("four_pillars", "month"))?;

        let month_god = relations.ten_god_at(PillarPosition::Month);
        let primary_pattern = pattern_for(month_god);
        let is_deling = strength.is_some_and(|s| s.is_deling());

        let mut candidates = vec![GejuCandidate {
            chart_id: chart_id.clone(),
            pattern: primary_pattern,
            source: CandidateSource::MonthStem,
            score: cfg.month_stem_score,
            confidence: cfg.month_stem_confidence,
            is_primary: true,
            evidence: Evidence::v1(CandidateInputs {
                stem: month_stem,
                ten_god: month_god,
                exposed: true,
            }),
        }];

        let main = ElementDictionary::main_hidden_stem(month_branch);
        let main_god = ElementDictionary::ten_god(day_stem, main);
        let exposed = match strength.and_then(|s| s.tou_gan.as_ref()) {
            Some(tou_gan) => tou_gan.is_exposed(PillarPosition::Month, main),
            None => pillars.iter().any(|p| p.stem == main),
        };
        let (score, confidence) = if exposed {
            (
                cfg.branch_main_exposed_score,
                cfg.branch_main_exposed_confidence,
            )
        } else {
            (
                cfg.branch_main_hidden_score,
                cfg.branch_main_hidden_confidence,
            )
        };
        candidates.push(GejuCandidate {
            chart_id: chart_id.clone(),
            pattern: pattern_for(Some(main_god)),
            source: CandidateSource::MonthBranchMain,
            score,
            confidence,
            is_primary: false,
            evidence: Evidence::v1(CandidateInputs {
                stem: main,
                ten_god: Some(main_god),
                exposed,
            }),
        });
        for c in &candidates {
            c.validate()?;
        }

        let formations = relations
            .branch_combinations()
            .map(|r| {
                let (score, confidence) = if r.complete {
                    (
                        cfg.complete_formation_score,
                        cfg.complete_formation_confidence,
                    )
                } else {
                    (
                        cfg.partial_formation_score,
                        cfg.partial_formation_confidence,
                    )
                };
                GejuFormation {
                    chart_id: chart_id.clone(),
                    kind: r.kind,
                    members: r.members.clone(),
                    positions: r.positions.clone(),
                    transforms_to: r.transforms_to,
                    complete: r.complete,
                    score,
                    confidence,
                    evidence: Evidence::v1(FormationInputs {
                        relation_label: r.kind.label().to_string(),
                    }),
                }
            })
            .collect::<Vec<_>>();

        let breakers: Vec<Breaker> = relations
            .breakers()
            .map(|r| Breaker {
                kind: r.kind,
                members: r.members.clone(),
                positions: r.positions.clone(),
            })
            .collect();

        let non_day: Vec<TenGod> = relations
            .ten_gods
            .iter()
            .filter(|t| !t.is_day_master)
            .map(|t| t.ten_god)
            .collect();
        let mixing = mixing_flags(&non_day);

        let raw = cfg.purity_base + if is_deling { cfg.deling_bonus } else { 0.0 }
            - cfg.breaker_penalty * breakers.len() as f64
            - cfg.mixing_penalty * mixing.len() as f64;
        let purity_score = raw.clamp(0.0, 100.0);

        let summary = GejuSummary {
            chart_id: chart_id.clone(),
            primary_pattern,
            purity_score,
            purity_level: PurityLevel::from_score(purity_score),
            break_level: BreakLevel::from_breaker_count(breakers.len()),
            breakers,
            mixing_flags: mixing,
            evidence: Evidence::v1(GejuSummaryInputs {
                pillars_sha256: pillars_sha256(pillars),
                month_stem,
                month_stem_ten_god: month_god,
                is_deling,
            }),
        };
        summary.validate()?;

        debug!(
            chart_id = %chart_id,
            pattern = primary_pattern.label(),
            purity_score,
            formation_count = formations.len(),
            "formation classified"
        );
        Ok(GejuOutcome {
            candidates,
            formations,
            summary,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bazi_kernel_contracts::ganzhi::Element;
    use bazi_kernel_contracts::relation::RelationKind;

    use crate::relation::RelationRuntime;

    fn classify(text: &str) -> GejuOutcome {
        let pillars = FourPillars::parse(text).unwrap();
        let relations = RelationRuntime::new().run(&pillars).unwrap();
        GejuRuntime::new(GejuConfig::mvp_v1())
            .run(&ChartId::new("chart-g").unwrap(), &pillars, &relations, None)
            .unwrap()
    }

    #[test]
    fn at_geju_01_month_stem_ten_god_names_the_pattern() {
        // 甲 day, 辛 month stem: 正官
        let out = classify("戊辰,辛酉,甲寅,丙寅");
        assert_eq!(out.summary.primary_pattern, GejuPattern::ZhengGuanGe);
        let primary = out.candidates.iter().find(|c| c.is_primary).unwrap();
        assert_eq!(primary.source, CandidateSource::MonthStem);
    }

    #[test]
    fn at_geju_02_clean_chart_without_breakers() {
        let out = classify("戊辰,辛酉,甲寅,丙寅");
        assert!(out.summary.breakers.is_empty());
        assert_eq!(out.summary.break_level, BreakLevel::None);
        assert_eq!(out.summary.purity_score, 70.0);
        assert_eq!(out.summary.purity_level, PurityLevel::RelativelyClean);
    }

    #[test]
    fn at_geju_03_clash_and_mixing_lower_purity() {
        // 庚 七杀 and 辛 正官 both exposed; 子午 clash.
        let out = classify("庚子,辛巳,甲午,丙寅");
        assert!(out.summary.mixing_flags.contains(&MixingFlag::GuanShaMixed));
        let clash = out
            .summary
            .breakers
            .iter()
            .any(|b| b.kind == RelationKind::BranchClash && b.members == "子午");
        assert!(clash);
        let expected = 70.0 - 4.0 * out.summary.breakers.len() as f64 - 6.0;
        assert_eq!(out.summary.purity_score, expected.clamp(0.0, 100.0));
    }

    #[test]
    fn at_geju_04_branch_combinations_become_formations() {
        let out = classify("庚申,戊子,甲辰,丙寅");
        let water = out
            .formations
            .iter()
            .find(|f| f.kind == RelationKind::BranchTripleCombine)
            .unwrap();
        assert!(water.complete);
        assert_eq!(water.score, 80.0);
        assert_eq!(water.transforms_to, Some(Element::Water));
    }

    #[test]
    fn at_geju_05_exposed_branch_main_stem_scores_higher() {
        // 酉 main 辛 is exposed on the month stem.
        let out = classify("戊辰,辛酉,甲寅,丙寅");
        let branch = out
            .candidates
            .iter()
            .find(|c| c.source == CandidateSource::MonthBranchMain)
            .unwrap();
        assert!(branch.evidence.inputs.exposed);
        assert_eq!(branch.score, 75.0);
    }

    #[test]
    fn at_geju_06_breaker_count_bands() {
        assert_eq!(BreakLevel::from_breaker_count(1), BreakLevel::Light);
        assert_eq!(BreakLevel::from_breaker_count(3), BreakLevel::Medium);
        assert_eq!(BreakLevel::from_breaker_count(4), BreakLevel::Heavy);
    }
}
