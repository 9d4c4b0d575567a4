#![forbid(unsafe_code)]

use std::collections::BTreeMap;

use bazi_kernel_contracts::chart::{ChartId, FourPillars};
use bazi_kernel_contracts::evidence::Evidence;
use bazi_kernel_contracts::ganzhi::Element;
use bazi_kernel_contracts::hanzao::{
    ClimateNeed, Contribution, ElementCount, FinalTendency, HanZaoDetail, HanZaoDetailInputs,
    HanZaoOutcome, HanZaoSummary, HanZaoSummaryInputs, StrengthLevel, Tendency,
};
use bazi_kernel_contracts::ruleset::Ruleset;
use bazi_kernel_contracts::Validate;
use tracing::debug;

use crate::dictionary::ElementDictionary;
use crate::error::{EngineError, EngineResult};
use crate::fingerprint::pillars_sha256;

/// ClimateScorer (寒暖燥湿): season base weights plus per-element
/// contributions scaled by how often the element occurs.
#[derive(Debug, Clone, Default)]
pub struct HanZaoRuntime;

impl HanZaoRuntime {
    pub fn new() -> Self {
        Self
    }

    pub fn run(
        &self,
        chart_id: &ChartId,
        pillars: &FourPillars,
        ruleset: &Ruleset,
    ) -> EngineResult<HanZaoOutcome> {
        chart_id.validate()?;
        pillars.validate()?;
        let month_branch = pillars
            .month_branch()
            .ok_or_else(|| EngineError::missing("four_pillars", "month"))?;
        let season = ruleset
            .season_for(month_branch)
            .ok_or_else(|| EngineError::missing("season_by_branch", month_branch.to_string()))?;
        let table = &ruleset.hanzao;

        let mut scores: BTreeMap<Tendency, f64> =
            Tendency::ALL.iter().map(|t| (*t, 0.0)).collect();
        let mut details = Vec::new();
        let mut add = |tendency: Tendency, score: f64, contribution: Contribution| {
            *scores.entry(tendency).or_insert(0.0) += score;
            details.push(HanZaoDetail {
                chart_id: chart_id.clone(),
                tendency,
                score,
                evidence: Evidence::v1(HanZaoDetailInputs { contribution }),
            });
        };

        for row in table.season_weights.iter().filter(|r| r.season == season) {
            if row.weight <= 0.0 {
                continue;
            }
            add(
                row.tendency,
                row.weight,
                Contribution::Season {
                    season,
                    weight: row.weight,
                },
            );
        }

        let counts = element_counts(pillars);
        for c in counts.iter().filter(|c| c.count > 0) {
            let strength_level = StrengthLevel::from_count(c.count);
            let level_weight = table.strength_level_weights.weight(strength_level);
            for row in table.element_weights.iter().filter(|r| r.element == c.element) {
                let score = f64::from(c.count) * row.weight * level_weight;
                if score == 0.0 {
                    continue;
                }
                add(
                    row.tendency,
                    score,
                    Contribution::Element {
                        element: c.element,
                        count: c.count,
                        strength_level,
                        element_weight: row.weight,
                        level_weight,
                    },
                );
            }
        }

        let score_of = |t: Tendency| scores.get(&t).copied().unwrap_or(0.0);
        let final_tendency = pick_tendency(&score_of);
        let needs = climate_needs(final_tendency);

        let summary = HanZaoSummary {
            chart_id: chart_id.clone(),
            ruleset_id: ruleset.ruleset_id.clone(),
            han_score: score_of(Tendency::Han),
            re_score: score_of(Tendency::Re),
            zao_score: score_of(Tendency::Zao),
            shi_score: score_of(Tendency::Shi),
            final_tendency,
            needs,
            evidence: Evidence::v1(HanZaoSummaryInputs {
                pillars_sha256: pillars_sha256(pillars),
                season,
                element_counts: counts,
            }),
        };
        summary.validate()?;

        debug!(
            chart_id = %chart_id,
            season = season.as_str(),
            tendency = ?final_tendency,
            detail_count = details.len(),
            "climate scored"
        );
        Ok(HanZaoOutcome { details, summary })
    }
}

/// Exposed stems and every hidden stem, per element.
fn element_counts(pillars: &FourPillars) -> Vec<ElementCount> {
    let mut counts: BTreeMap<Element, u32> = BTreeMap::new();
    for p in pillars.iter() {
        *counts
            .entry(ElementDictionary::stem_element(p.stem))
            .or_insert(0) += 1;
        for h in ElementDictionary::hidden_stems(p.branch) {
            *counts
                .entry(ElementDictionary::stem_element(h.stem))
                .or_insert(0) += 1;
        }
    }
    Element::ALL
        .into_iter()
        .map(|element| ElementCount {
            element,
            count: counts.get(&element).copied().unwrap_or(0),
        })
        .collect()
}

/// Strict maximum over positive scores, scanning HAN, RE, ZAO, SHI; the
/// first tendency to reach the maximum keeps it.
pub fn pick_tendency(score_of: impl Fn(Tendency) -> f64) -> FinalTendency {
    let mut best: Option<(Tendency, f64)> = None;
    for t in Tendency::ALL {
        let s = score_of(t);
        if s <= 0.0 {
            continue;
        }
        if best.map_or(true, |(_, b)| s > b) {
            best = Some((t, s));
        }
    }
    best.map_or(FinalTendency::Neutral, |(t, _)| t.into())
}

pub fn climate_needs(tendency: FinalTendency) -> Vec<ClimateNeed> {
    match tendency {
        FinalTendency::Han | FinalTendency::Shi => vec![ClimateNeed::NeedsWarmth],
        FinalTendency::Re | FinalTendency::Zao => vec![ClimateNeed::NeedsMoisture],
        FinalTendency::Neutral => Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bazi_kernel_contracts::chart::RulesetId;
    use bazi_kernel_contracts::ruleset::{HanZaoRuleset, StrengthLevelWeights};

    fn run(text: &str, rs: &Ruleset) -> HanZaoOutcome {
        HanZaoRuntime::new()
            .run(
                &ChartId::new("chart-h").unwrap(),
                &FourPillars::parse(text).unwrap(),
                rs,
            )
            .unwrap()
    }

    #[test]
    fn at_hanzao_01_winter_water_chart_is_cold_and_needs_warmth() {
        let rs = Ruleset::builtin_default(RulesetId::default());
        let out = run("壬子,壬子,甲子,癸亥", &rs);
        assert_eq!(out.summary.final_tendency, FinalTendency::Han);
        assert_eq!(out.summary.needs, vec![ClimateNeed::NeedsWarmth]);
        let sum: f64 = out
            .details
            .iter()
            .filter(|d| d.tendency == Tendency::Han)
            .map(|d| d.score)
            .sum();
        assert!((sum - out.summary.han_score).abs() < 1e-9);
    }

    #[test]
    fn at_hanzao_02_summer_fire_chart_is_hot_and_needs_moisture() {
        let rs = Ruleset::builtin_default(RulesetId::default());
        let out = run("丙午,丁巳,丙午,丁未", &rs);
        assert_eq!(out.summary.final_tendency, FinalTendency::Re);
        assert_eq!(out.summary.needs, vec![ClimateNeed::NeedsMoisture]);
    }

    #[test]
    fn at_hanzao_03_all_zero_weights_are_neutral_with_no_details() {
        let mut rs = Ruleset::builtin_default(RulesetId::default());
        rs.hanzao = HanZaoRuleset {
            season_weights: vec![],
            element_weights: vec![],
            strength_level_weights: StrengthLevelWeights {
                low: 1.0,
                medium: 1.0,
                high: 1.0,
            },
        };
        let out = run("壬子,壬子,甲子,癸亥", &rs);
        assert_eq!(out.summary.final_tendency, FinalTendency::Neutral);
        assert!(out.summary.needs.is_empty());
        assert!(out.details.is_empty());
    }

    #[test]
    fn at_hanzao_04_ties_resolve_in_fixed_order() {
        let t = pick_tendency(|t| match t {
            Tendency::Zao | Tendency::Shi => 2.0,
            _ => 1.0,
        });
        assert_eq!(t, FinalTendency::Zao);
        let t = pick_tendency(|_| 1.0);
        assert_eq!(t, FinalTendency::Han);
        assert_eq!(pick_tendency(|_| -1.0), FinalTendency::Neutral);
    }

    #[test]
    fn at_hanzao_05_counts_include_hidden_stems() {
        let counts = element_counts(&FourPillars::parse("甲子,丙寅,戊辰,庚午").unwrap());
        let total: u32 = counts.iter().map(|c| c.count).sum();
        // 4 exposed + 子1 寅3 辰3 午2
        assert_eq!(total, 13);
    }
}
