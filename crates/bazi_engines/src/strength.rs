#![forbid(unsafe_code)]

use bazi_kernel_contracts::chart::{ChartId, FourPillars};
use bazi_kernel_contracts::deling::DelingResult;
use bazi_kernel_contracts::ganzhi::TenGodFamily;
use bazi_kernel_contracts::rootqi::{TongGenReport, TouGanReport};
use bazi_kernel_contracts::strength::{BodyState, StrengthJudgement, TenGodCounts};
use bazi_kernel_contracts::Validate;
use tracing::debug;

use crate::dictionary::ElementDictionary;
use crate::error::{EngineError, EngineResult};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StrengthConfig {
    /// Added when a branch's own element is the day master's.
    pub branch_root_weight: f64,
    /// Added for each hidden stem of the day master's element.
    pub hidden_root_weight: f64,
    pub season_weight: f64,
    pub strong_above: f64,
    /// The day stem always counts as a peer, so margins never drop below
    /// -2.0; `Weak` is unreachable at the `mvp_v1` value.
    pub weak_below: f64,
}

impl StrengthConfig {
    pub fn mvp_v1() -> Self {
        Self {
            branch_root_weight: 1.0,
            hidden_root_weight: 0.5,
            season_weight: 1.0,
            strong_above: 2.0,
            weak_below: -2.0,
        }
    }
}

/// Best-effort results of the three sub-analyses; each is `None` when its
/// engine failed. They are carried into the judgement for downstream use
/// and never change the body-state arithmetic.
#[derive(Debug, Clone, Default)]
pub struct StrengthInputs {
    pub deling: Option<DelingResult>,
    pub tong_gen: Option<TongGenReport>,
    pub tou_gan: Option<TouGanReport>,
}

#[derive(Debug, Clone)]
pub struct StrengthRuntime {
    config: StrengthConfig,
}

impl StrengthRuntime {
    pub fn new(config: StrengthConfig) -> Self {
        Self { config }
    }

    pub fn run(
        &self,
        chart_id: &ChartId,
        pillars: &FourPillars,
        inputs: StrengthInputs,
    ) -> EngineResult<StrengthJudgement> {
        chart_id.validate()?;
        pillars.validate()?;
        let day_stem = pillars
            .day_stem()
            .ok_or_else(|| EngineError::missing("four_pillars", "day"))?;
        let month_branch = pillars
            .month_branch()
            .ok_or_else(|| EngineError::missing("four_pillars", "month"))?;
        let dm_element = ElementDictionary::stem_element(day_stem);

        let mut counts = TenGodCounts::default();
        for p in pillars.iter() {
            match ElementDictionary::ten_god(day_stem, p.stem).family() {
                TenGodFamily::Resource => counts.resource += 1,
                TenGodFamily::Peer => counts.peer += 1,
                TenGodFamily::Output => counts.output += 1,
                TenGodFamily::Wealth => counts.wealth += 1,
                TenGodFamily::Power => counts.power += 1,
            }
        }

        let mut rooting_score = 0.0;
        for p in pillars.iter() {
            if ElementDictionary::branch_element(p.branch) == dm_element {
                rooting_score += self.config.branch_root_weight;
            }
            rooting_score += ElementDictionary::hidden_stems(p.branch)
                .iter()
                .filter(|h| ElementDictionary::stem_element(h.stem) == dm_element)
                .count() as f64
                * self.config.hidden_root_weight;
        }

        let season_score = if ElementDictionary::branch_element(month_branch) == dm_element {
            self.config.season_weight
        } else {
            0.0
        };

        let favorable_sum = f64::from(counts.favorable()) + rooting_score + season_score;
        let unfavorable_sum = f64::from(counts.unfavorable());
        let margin = favorable_sum - unfavorable_sum;
        let body_state = if margin > self.config.strong_above {
            BodyState::Strong
        } else if margin < self.config.weak_below {
            BodyState::Weak
        } else {
            BodyState::Balanced
        };

        debug!(
            chart_id = %chart_id,
            margin,
            body_state = body_state.as_str(),
            has_deling = inputs.deling.is_some(),
            has_tong_gen = inputs.tong_gen.is_some(),
            has_tou_gan = inputs.tou_gan.is_some(),
            "strength judged"
        );
        Ok(StrengthJudgement {
            chart_id: chart_id.clone(),
            day_master_element: dm_element,
            counts,
            rooting_score,
            season_score,
            favorable_sum,
            unfavorable_sum,
            body_state,
            deling: inputs.deling,
            tong_gen: inputs.tong_gen,
            tou_gan: inputs.tou_gan,
        })
    }
}
