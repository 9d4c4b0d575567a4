#![forbid(unsafe_code)]

use bazi_kernel_contracts::chart::{CalcVersion, ChartId};
use bazi_kernel_contracts::evidence::Evidence;
use bazi_kernel_contracts::ganzhi::Element;
use bazi_kernel_contracts::geju::GejuSummary;
use bazi_kernel_contracts::hanzao::HanZaoSummary;
use bazi_kernel_contracts::ruleset::YongShenRuleset;
use bazi_kernel_contracts::strength::StrengthJudgement;
use bazi_kernel_contracts::yongshen::{
    ElementScoreInputs, ElementScoreRow, YongShenInputs, YongShenOutcome, YongShenResult,
};
use bazi_kernel_contracts::Validate;
use tracing::debug;

use crate::error::{EngineError, EngineResult};

/// UsefulElementSelector (用神): decision-table pick by body state, then
/// climate needs pull their element into the favorable set.
#[derive(Debug, Clone, Default)]
pub struct YongShenRuntime;

impl YongShenRuntime {
    pub fn new() -> Self {
        Self
    }

    pub fn run(
        &self,
        chart_id: &ChartId,
        calc_version: &CalcVersion,
        strength: &StrengthJudgement,
        climate: Option<&HanZaoSummary>,
        geju: Option<&GejuSummary>,
        table: &YongShenRuleset,
    ) -> EngineResult<YongShenOutcome> {
        chart_id.validate()?;
        calc_version.validate()?;
        let body_state = strength.body_state;
        let decision = table
            .decisions
            .iter()
            .find(|d| d.body_state == body_state)
            .ok_or_else(|| EngineError::missing("yongshen.decisions", body_state.as_str()))?;

        let mut favorable = decision.favorable.clone();
        let mut unfavorable = decision.unfavorable.clone();
        let climate_needs = climate.map(|c| c.needs.clone()).unwrap_or_default();
        for need in &climate_needs {
            let e = need.element();
            if !favorable.contains(&e) {
                favorable.push(e);
            }
            unfavorable.retain(|u| *u != e);
        }
        // A decision row may list an element on both sides; favorable wins.
        unfavorable.retain(|u| !favorable.contains(u));

        let mut scores = Vec::with_capacity(5);
        for element in Element::ALL {
            let is_favorable = favorable.contains(&element);
            let is_unfavorable = unfavorable.contains(&element);
            let mut delta = 0.0;
            if is_favorable {
                delta += table.favorable_delta;
            }
            if is_unfavorable {
                delta -= table.unfavorable_delta;
            }
            let row = ElementScoreRow {
                chart_id: chart_id.clone(),
                calc_version: calc_version.clone(),
                element,
                score: (table.base_score + delta).clamp(0.0, 1.0),
                is_favorable,
                is_unfavorable,
                evidence: Evidence::v1(ElementScoreInputs {
                    base_score: table.base_score,
                    delta,
                }),
            };
            row.validate()?;
            scores.push(row);
        }

        let result = YongShenResult {
            chart_id: chart_id.clone(),
            calc_version: calc_version.clone(),
            body_state,
            primary_element: decision.primary_element,
            primary_ten_god: decision.primary_ten_god.clone(),
            supporting_elements: decision.supporting_elements.clone(),
            favorable,
            unfavorable,
            climate_needs,
            evidence: Evidence::v1(YongShenInputs {
                body_state,
                final_tendency: climate.map(|c| c.final_tendency),
                primary_pattern: geju.map(|g| g.primary_pattern),
                margin: strength.margin(),
            }),
        };
        result.validate()?;

        debug!(
            chart_id = %chart_id,
            body_state = body_state.as_str(),
            primary = %result.primary_element,
            "useful element selected"
        );
        Ok(YongShenOutcome { result, scores })
    }
}
