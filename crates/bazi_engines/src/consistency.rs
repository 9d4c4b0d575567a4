#![forbid(unsafe_code)]

use bazi_kernel_contracts::consistency::{
    ConsistencyReport, RiskPoint, RiskSource, SelfConsistency,
};
use bazi_kernel_contracts::geju::GejuSummary;
use bazi_kernel_contracts::relation::RelationReport;
use bazi_kernel_contracts::strength::BodyState;
use bazi_kernel_contracts::yongshen::YongShenResult;

/// Advisory cross-check of the useful-element pick against the chart's
/// relations. Never fails and never persists.
#[derive(Debug, Clone, Default)]
pub struct ConsistencyRuntime;

impl ConsistencyRuntime {
    pub fn new() -> Self {
        Self
    }

    pub fn run(
        &self,
        yongshen: &YongShenResult,
        geju: Option<&GejuSummary>,
        relations: Option<&RelationReport>,
    ) -> ConsistencyReport {
        let primary_conflict = format!(
            "{}，需{}",
            yongshen.body_state.as_str(),
            yongshen.primary_element
        );

        let mut medicine = format!("用{}", yongshen.primary_element);
        let supporting: String = yongshen
            .supporting_elements
            .iter()
            .filter(|e| yongshen.favorable.contains(e) && **e != yongshen.primary_element)
            .map(|e| e.as_char())
            .collect();
        if !supporting.is_empty() {
            medicine.push_str(&format!("，辅以{supporting}"));
        }

        let mut risk_points: Vec<RiskPoint> = geju
            .map(|g| {
                g.breakers
                    .iter()
                    .map(|b| RiskPoint {
                        source: RiskSource::FormationBreaker,
                        description: format!("{}{}破格", b.members, b.kind.label()),
                    })
                    .collect()
            })
            .unwrap_or_default();

        if let Some(r) = relations {
            let load = r.combinations().count() + r.clashes().count();
            if load > 0 {
                risk_points.push(RiskPoint {
                    source: RiskSource::RelationLoad,
                    description: format!("合冲关系{load}处"),
                });
            }
        }

        let self_consistency = if !risk_points.is_empty() {
            SelfConsistency::NeedsReview
        } else if yongshen.body_state != BodyState::Balanced {
            SelfConsistency::Consistent
        } else {
            SelfConsistency::Inconclusive
        };

        ConsistencyReport {
            primary_conflict,
            medicine,
            risk_points,
            self_consistency,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bazi_kernel_contracts::chart::{CalcVersion, ChartId};
    use bazi_kernel_contracts::evidence::Evidence;
    use bazi_kernel_contracts::ganzhi::Element;
    use bazi_kernel_contracts::yongshen::YongShenInputs;

    fn result(body_state: BodyState) -> YongShenResult {
        YongShenResult {
            chart_id: ChartId::new("chart-c").unwrap(),
            calc_version: CalcVersion::default(),
            body_state,
            primary_element: Element::Water,
            primary_ten_god: "食伤".to_string(),
            supporting_elements: vec![Element::Wood],
            favorable: vec![Element::Water, Element::Wood],
            unfavorable: vec![Element::Earth],
            climate_needs: vec![],
            evidence: Evidence::v1(YongShenInputs {
                body_state,
                final_tendency: None,
                primary_pattern: None,
                margin: 4.0,
            }),
        }
    }

    fn quiet_relations() -> RelationReport {
        RelationReport {
            ten_gods: vec![],
            hidden_stems: vec![],
            relations: vec![],
        }
    }

    #[test]
    fn at_consistency_01_statements_name_elements() {
        let r = ConsistencyRuntime::new().run(&result(BodyState::Strong), None, None);
        assert_eq!(r.primary_conflict, "身强，需水");
        assert_eq!(r.medicine, "用水，辅以木");
        assert_eq!(r.self_consistency, SelfConsistency::Consistent);
    }

    #[test]
    fn at_consistency_02_balanced_without_risks_is_inconclusive() {
        let r = ConsistencyRuntime::new().run(
            &result(BodyState::Balanced),
            None,
            Some(&quiet_relations()),
        );
        assert!(r.risk_points.is_empty());
        assert_eq!(r.self_consistency, SelfConsistency::Inconclusive);
    }

    #[test]
    fn at_consistency_03_any_combination_or_clash_needs_review() {
        use crate::relation::RelationRuntime;
        use bazi_kernel_contracts::chart::FourPillars;

        let relations = RelationRuntime::new()
            .run(&FourPillars::parse("甲子,丙寅,戊辰,庚午").unwrap())
            .unwrap();
        let r = ConsistencyRuntime::new().run(&result(BodyState::Strong), None, Some(&relations));
        assert!(r
            .risk_points
            .iter()
            .any(|p| p.source == RiskSource::RelationLoad));
        assert_eq!(r.self_consistency, SelfConsistency::NeedsReview);
    }
}
