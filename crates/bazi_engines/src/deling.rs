#![forbid(unsafe_code)]

use bazi_kernel_contracts::chart::{ChartId, FourPillars};
use bazi_kernel_contracts::deling::{
    AppliedOverride, DelingInputs, DelingOutcome, DelingResult, ElementState, ElementStateRow,
    SnapshotInputs, StateSource, VerdictPolicy,
};
use bazi_kernel_contracts::evidence::Evidence;
use bazi_kernel_contracts::ganzhi::{Element, StateLevel};
use bazi_kernel_contracts::ruleset::{Ruleset, StateOverrideRule};
use bazi_kernel_contracts::Validate;
use tracing::debug;

use crate::dictionary::ElementDictionary;
use crate::error::{EngineError, EngineResult};
use crate::fingerprint::pillars_sha256;

/// SeasonClassifier (得令): seasonal state of each element for the month
/// branch, and whether the day master holds command.
#[derive(Debug, Clone, Default)]
pub struct DelingRuntime;

impl DelingRuntime {
    pub fn new() -> Self {
        Self
    }

    pub fn run(
        &self,
        chart_id: &ChartId,
        pillars: &FourPillars,
        ruleset: &Ruleset,
    ) -> EngineResult<DelingOutcome> {
        chart_id.validate()?;
        pillars.validate()?;
        let month_branch = pillars
            .month_branch()
            .ok_or_else(|| EngineError::missing("four_pillars", "month"))?;
        let day_stem = pillars
            .day_stem()
            .ok_or_else(|| EngineError::missing("four_pillars", "day"))?;
        let dm_element = ElementDictionary::stem_element(day_stem);

        let season = ruleset
            .season_for(month_branch)
            .ok_or_else(|| EngineError::missing("season_by_branch", month_branch.to_string()))?;

        // Highest priority first; the first enabled rule seen per element wins.
        let mut overrides: Vec<&StateOverrideRule> = ruleset
            .state_overrides
            .iter()
            .filter(|r| r.enabled && r.branch == month_branch)
            .collect();
        overrides.sort_by(|a, b| b.priority.cmp(&a.priority));

        let mut states: Vec<(Element, StateLevel, StateSource, Option<StateLevel>)> =
            Vec::with_capacity(5);
        let mut applied = Vec::new();
        for element in Element::ALL {
            let default_state = ruleset.default_state(season, element);
            let chosen = overrides.iter().find(|r| r.element == element);
            match (chosen, default_state) {
                (Some(rule), _) => {
                    applied.push(AppliedOverride {
                        element,
                        state: rule.state,
                        priority: rule.priority,
                    });
                    states.push((
                        element,
                        rule.state,
                        StateSource::Override {
                            priority: rule.priority,
                        },
                        default_state,
                    ));
                }
                (None, Some(state)) => {
                    states.push((element, state, StateSource::Default, default_state));
                }
                (None, None) => {
                    return Err(EngineError::missing(
                        "element_states",
                        format!("{}/{}", season.as_str(), element),
                    ));
                }
            }
        }

        let dm_state = states
            .iter()
            .find(|(e, ..)| *e == dm_element)
            .map(|(_, s, ..)| *s)
            .ok_or_else(|| {
                EngineError::missing("element_states", format!("{}/{}", season.as_str(), dm_element))
            })?;

        let rank = dm_state.rank();
        let score = f64::from(rank) / 5.0;
        let policy = &ruleset.deling_policy;
        let (is_deling, verdict_policy) = if !policy.state_thresholds.is_empty() {
            (
                policy.state_thresholds.contains(&dm_state),
                VerdictPolicy::StateThresholds {
                    states: policy.state_thresholds.clone(),
                },
            )
        } else if let Some(score_min) = policy.score_min {
            (score >= score_min, VerdictPolicy::ScoreMin { score_min })
        } else {
            return Err(EngineError::RulesetMisconfigured {
                ruleset_id: ruleset.ruleset_id.to_string(),
                reason: "deling policy defines neither state thresholds nor score_min",
            });
        };

        let rule_text = format!(
            "月令{}属{}，日主{}{}处{}（{}/5），{}：{}",
            month_branch,
            season.as_str(),
            day_stem,
            dm_element,
            dm_state,
            rank,
            policy_text(&verdict_policy),
            if is_deling { "得令" } else { "不得令" },
        );

        let snapshot = states
            .iter()
            .map(|(element, state, source, default_state)| ElementStateRow {
                chart_id: chart_id.clone(),
                ruleset_id: ruleset.ruleset_id.clone(),
                element_state: ElementState::v1(*element, *state),
                source: *source,
                evidence: Evidence::v1(SnapshotInputs {
                    month_branch,
                    season,
                    default_state: *default_state,
                }),
            })
            .collect();

        let result = DelingResult {
            chart_id: chart_id.clone(),
            ruleset_id: ruleset.ruleset_id.clone(),
            month_branch,
            season,
            day_stem,
            day_master_element: dm_element,
            day_master_state: dm_state,
            day_master_state_rank: rank,
            day_master_score: score,
            is_deling,
            rule_text,
            evidence: Evidence::v1(DelingInputs {
                pillars_sha256: pillars_sha256(pillars),
                element_states: states
                    .iter()
                    .map(|(e, s, ..)| ElementState::v1(*e, *s))
                    .collect(),
                applied_overrides: applied,
                verdict_policy,
            }),
        };
        result.validate()?;

        debug!(
            chart_id = %chart_id,
            ruleset_id = %ruleset.ruleset_id,
            month_branch = %month_branch,
            state = %dm_state,
            is_deling,
            "deling classified"
        );
        Ok(DelingOutcome { result, snapshot })
    }
}

fn policy_text(policy: &VerdictPolicy) -> String {
    match policy {
        VerdictPolicy::StateThresholds { states } => {
            let s: String = states.iter().map(|s| s.as_char()).collect();
            format!("依{s}判定")
        }
        VerdictPolicy::ScoreMin { score_min } => format!("依分值≥{score_min}判定"),
    }
}
