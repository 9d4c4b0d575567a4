#![forbid(unsafe_code)]

//! Ruleset bundles: the externally configurable tables that govern
//! classification thresholds and weights.
//!
//! A stored `RulesetBundle` may leave any table unset. `resolve` fills every
//! unset table from the built-in default bundle, table by table, and records
//! which ones were filled. A table that *is* set is used as-is, so a missing
//! row inside it surfaces as a dictionary miss rather than silently
//! defaulting.

use serde::{Deserialize, Serialize};

use crate::chart::RulesetId;
use crate::ganzhi::{Branch, Element, Season, StateLevel};
use crate::hanzao::{StrengthLevel, Tendency};
use crate::rootqi::RootLevel;
use crate::strength::BodyState;
use crate::{ContractViolation, Validate};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeasonByBranchRow {
    pub branch: Branch,
    pub season: Season,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ElementStateRule {
    pub season: Season,
    pub element: Element,
    pub state: StateLevel,
}

/// Branch-specific override of one element's default seasonal state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateOverrideRule {
    pub branch: Branch,
    pub element: Element,
    pub state: StateLevel,
    pub priority: i32,
    #[serde(default = "enabled_by_default")]
    pub enabled: bool,
}

fn enabled_by_default() -> bool {
    true
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct DelingPolicy {
    #[serde(default)]
    pub state_thresholds: Vec<StateLevel>,
    #[serde(default)]
    pub score_min: Option<f64>,
}

/// Half-open score band `[min, max)`. `max = None` leaves the band open above.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RootLevelBand {
    pub level: RootLevel,
    pub min: f64,
    #[serde(default)]
    pub max: Option<f64>,
}

impl RootLevelBand {
    pub fn contains(&self, score: f64) -> bool {
        score >= self.min && self.max.map_or(true, |max| score < max)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SeasonWeightRow {
    pub season: Season,
    pub tendency: Tendency,
    pub weight: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ElementWeightRow {
    pub element: Element,
    pub tendency: Tendency,
    pub weight: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StrengthLevelWeights {
    pub low: f64,
    pub medium: f64,
    pub high: f64,
}

impl StrengthLevelWeights {
    pub fn weight(&self, level: StrengthLevel) -> f64 {
        match level {
            StrengthLevel::Low => self.low,
            StrengthLevel::Medium => self.medium,
            StrengthLevel::High => self.high,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HanZaoRuleset {
    pub season_weights: Vec<SeasonWeightRow>,
    pub element_weights: Vec<ElementWeightRow>,
    pub strength_level_weights: StrengthLevelWeights,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct YongShenDecisionRow {
    pub body_state: BodyState,
    pub primary_element: Element,
    pub primary_ten_god: String,
    #[serde(default)]
    pub supporting_elements: Vec<Element>,
    #[serde(default)]
    pub favorable: Vec<Element>,
    #[serde(default)]
    pub unfavorable: Vec<Element>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct YongShenRuleset {
    pub base_score: f64,
    pub favorable_delta: f64,
    pub unfavorable_delta: f64,
    pub decisions: Vec<YongShenDecisionRow>,
}

/// Stored form of a ruleset; every table is optional.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RulesetBundle {
    pub ruleset_id: RulesetId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub season_by_branch: Option<Vec<SeasonByBranchRow>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub element_states: Option<Vec<ElementStateRule>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state_overrides: Option<Vec<StateOverrideRule>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deling_policy: Option<DelingPolicy>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub root_level_bands: Option<Vec<RootLevelBand>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hanzao: Option<HanZaoRuleset>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub yongshen: Option<YongShenRuleset>,
}

impl RulesetBundle {
    /// A bundle with no tables of its own; resolves to the built-in defaults.
    pub fn empty(ruleset_id: RulesetId) -> Self {
        Self {
            ruleset_id,
            season_by_branch: None,
            element_states: None,
            state_overrides: None,
            deling_policy: None,
            root_level_bands: None,
            hanzao: None,
            yongshen: None,
        }
    }

    pub fn resolve(self) -> Ruleset {
        let mut defaulted = Vec::new();
        let mut fill = |name: &'static str, present: bool| {
            if !present {
                defaulted.push(name);
            }
        };
        fill("season_by_branch", self.season_by_branch.is_some());
        fill("element_states", self.element_states.is_some());
        fill("state_overrides", self.state_overrides.is_some());
        fill("deling_policy", self.deling_policy.is_some());
        fill("root_level_bands", self.root_level_bands.is_some());
        fill("hanzao", self.hanzao.is_some());
        fill("yongshen", self.yongshen.is_some());

        Ruleset {
            ruleset_id: self.ruleset_id,
            season_by_branch: self
                .season_by_branch
                .unwrap_or_else(defaults::season_by_branch),
            element_states: self.element_states.unwrap_or_else(defaults::element_states),
            state_overrides: self
                .state_overrides
                .unwrap_or_else(defaults::state_overrides),
            deling_policy: self.deling_policy.unwrap_or_else(defaults::deling_policy),
            root_level_bands: self
                .root_level_bands
                .unwrap_or_else(defaults::root_level_bands),
            hanzao: self.hanzao.unwrap_or_else(defaults::hanzao),
            yongshen: self.yongshen.unwrap_or_else(defaults::yongshen),
            defaulted_tables: defaulted,
        }
    }
}

impl Validate for RulesetBundle {
    fn validate(&self) -> Result<(), ContractViolation> {
        self.ruleset_id.validate()?;
        if let Some(policy) = &self.deling_policy {
            if let Some(min) = policy.score_min {
                if !(0.0..=1.0).contains(&min) {
                    return Err(ContractViolation::InvalidRange {
                        field: "ruleset.deling_policy.score_min",
                        min: 0.0,
                        max: 1.0,
                        got: min,
                    });
                }
            }
        }
        if let Some(bands) = &self.root_level_bands {
            for band in bands {
                if !band.min.is_finite() || band.max.is_some_and(|m| !m.is_finite()) {
                    return Err(ContractViolation::NotFinite {
                        field: "ruleset.root_level_bands",
                    });
                }
                if band.max.is_some_and(|m| m <= band.min) {
                    return Err(ContractViolation::InvalidValue {
                        field: "ruleset.root_level_bands",
                        reason: "band max must exceed min",
                    });
                }
            }
        }
        if let Some(hz) = &self.hanzao {
            let w = hz.strength_level_weights;
            if [w.low, w.medium, w.high].iter().any(|v| !v.is_finite()) {
                return Err(ContractViolation::NotFinite {
                    field: "ruleset.hanzao.strength_level_weights",
                });
            }
        }
        if let Some(ys) = &self.yongshen {
            if !(0.0..=1.0).contains(&ys.base_score) {
                return Err(ContractViolation::InvalidRange {
                    field: "ruleset.yongshen.base_score",
                    min: 0.0,
                    max: 1.0,
                    got: ys.base_score,
                });
            }
        }
        Ok(())
    }
}

/// Fully resolved ruleset consumed by the engines.
#[derive(Debug, Clone, PartialEq)]
pub struct Ruleset {
    pub ruleset_id: RulesetId,
    pub season_by_branch: Vec<SeasonByBranchRow>,
    pub element_states: Vec<ElementStateRule>,
    pub state_overrides: Vec<StateOverrideRule>,
    pub deling_policy: DelingPolicy,
    pub root_level_bands: Vec<RootLevelBand>,
    pub hanzao: HanZaoRuleset,
    pub yongshen: YongShenRuleset,
    /// Tables that came from the built-in defaults.
    pub defaulted_tables: Vec<&'static str>,
}

impl Ruleset {
    pub fn builtin_default(ruleset_id: RulesetId) -> Self {
        RulesetBundle::empty(ruleset_id).resolve()
    }

    pub fn season_for(&self, branch: Branch) -> Option<Season> {
        self.season_by_branch
            .iter()
            .find(|r| r.branch == branch)
            .map(|r| r.season)
    }

    pub fn default_state(&self, season: Season, element: Element) -> Option<StateLevel> {
        self.element_states
            .iter()
            .find(|r| r.season == season && r.element == element)
            .map(|r| r.state)
    }
}

/// Built-in tables used wherever a stored ruleset leaves a table unset.
pub mod defaults {
    use super::*;

    pub fn season_by_branch() -> Vec<SeasonByBranchRow> {
        use Branch::*;
        [
            (Yin, Season::Spring),
            (Mao, Season::Spring),
            (Chen, Season::Spring),
            (Si, Season::Summer),
            (Wu, Season::Summer),
            (Wei, Season::Summer),
            (Shen, Season::Autumn),
            (You, Season::Autumn),
            (Xu, Season::Autumn),
            (Hai, Season::Winter),
            (Zi, Season::Winter),
            (Chou, Season::Winter),
        ]
        .into_iter()
        .map(|(branch, season)| SeasonByBranchRow { branch, season })
        .collect()
    }

    /// The commanding element is 旺, its mother 相, its child 休, the element
    /// controlling it 囚 and the element it controls 死.
    pub fn element_states() -> Vec<ElementStateRule> {
        let mut rows = Vec::with_capacity(20);
        for (season, command) in [
            (Season::Spring, Element::Wood),
            (Season::Summer, Element::Fire),
            (Season::Autumn, Element::Metal),
            (Season::Winter, Element::Water),
        ] {
            rows.extend(rotate_states(command).into_iter().map(|(element, state)| {
                ElementStateRule {
                    season,
                    element,
                    state,
                }
            }));
        }
        rows
    }

    /// The four earth months hand command to 土.
    pub fn state_overrides() -> Vec<StateOverrideRule> {
        let mut rows = Vec::with_capacity(20);
        for branch in [Branch::Chen, Branch::Wei, Branch::Xu, Branch::Chou] {
            rows.extend(rotate_states(Element::Earth).into_iter().map(
                |(element, state)| StateOverrideRule {
                    branch,
                    element,
                    state,
                    priority: 100,
                    enabled: true,
                },
            ));
        }
        rows
    }

    pub fn deling_policy() -> DelingPolicy {
        DelingPolicy {
            state_thresholds: vec![StateLevel::Wang, StateLevel::Xiang],
            score_min: None,
        }
    }

    pub fn root_level_bands() -> Vec<RootLevelBand> {
        vec![
            RootLevelBand {
                level: RootLevel::None,
                min: 0.0,
                max: Some(0.2),
            },
            RootLevelBand {
                level: RootLevel::Weak,
                min: 0.2,
                max: Some(0.8),
            },
            RootLevelBand {
                level: RootLevel::Medium,
                min: 0.8,
                max: Some(1.6),
            },
            RootLevelBand {
                level: RootLevel::Strong,
                min: 1.6,
                max: None,
            },
        ]
    }

    pub fn hanzao() -> HanZaoRuleset {
        use Tendency::*;
        let season_weights = [
            (Season::Spring, Shi, 0.4),
            (Season::Spring, Re, 0.2),
            (Season::Summer, Re, 1.0),
            (Season::Summer, Zao, 0.6),
            (Season::Autumn, Zao, 0.8),
            (Season::Autumn, Han, 0.3),
            (Season::Winter, Han, 1.0),
            (Season::Winter, Shi, 0.6),
        ]
        .into_iter()
        .map(|(season, tendency, weight)| SeasonWeightRow {
            season,
            tendency,
            weight,
        })
        .collect();
        let element_weights = [
            (Element::Wood, Shi, 0.3),
            (Element::Wood, Re, 0.2),
            (Element::Fire, Re, 1.0),
            (Element::Fire, Zao, 0.6),
            (Element::Earth, Zao, 0.5),
            (Element::Earth, Shi, 0.2),
            (Element::Metal, Han, 0.5),
            (Element::Metal, Zao, 0.4),
            (Element::Water, Han, 1.0),
            (Element::Water, Shi, 0.8),
        ]
        .into_iter()
        .map(|(element, tendency, weight)| ElementWeightRow {
            element,
            tendency,
            weight,
        })
        .collect();
        HanZaoRuleset {
            season_weights,
            element_weights,
            strength_level_weights: StrengthLevelWeights {
                low: 0.7,
                medium: 1.0,
                high: 1.3,
            },
        }
    }

    pub fn yongshen() -> YongShenRuleset {
        YongShenRuleset {
            base_score: 0.5,
            favorable_delta: 0.3,
            unfavorable_delta: 0.3,
            decisions: vec![
                YongShenDecisionRow {
                    body_state: BodyState::Weak,
                    primary_element: Element::Earth,
                    primary_ten_god: "印".to_string(),
                    supporting_elements: vec![Element::Fire],
                    favorable: vec![Element::Earth, Element::Fire],
                    unfavorable: vec![Element::Water, Element::Wood],
                },
                YongShenDecisionRow {
                    body_state: BodyState::Strong,
                    primary_element: Element::Water,
                    primary_ten_god: "食伤".to_string(),
                    supporting_elements: vec![Element::Wood],
                    favorable: vec![Element::Water, Element::Wood],
                    unfavorable: vec![Element::Earth, Element::Fire],
                },
                YongShenDecisionRow {
                    body_state: BodyState::Balanced,
                    primary_element: Element::Water,
                    primary_ten_god: "疏泄".to_string(),
                    supporting_elements: vec![Element::Metal],
                    favorable: vec![Element::Water, Element::Metal],
                    unfavorable: vec![Element::Fire],
                },
            ],
        }
    }

    fn rotate_states(command: Element) -> [(Element, StateLevel); 5] {
        [
            (command, StateLevel::Wang),
            (command.generated_by(), StateLevel::Xiang),
            (command.generates(), StateLevel::Xiu),
            (command.controlled_by(), StateLevel::Qiu),
            (command.controls(), StateLevel::Si),
        ]
    }
}
