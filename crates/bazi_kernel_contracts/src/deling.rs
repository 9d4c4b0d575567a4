#![forbid(unsafe_code)]

use serde::{Deserialize, Serialize};

use crate::chart::{ChartId, RulesetId};
use crate::common::validate_unit_interval;
use crate::evidence::Evidence;
use crate::ganzhi::{Branch, Element, Season, StateLevel, Stem};
use crate::{ContractViolation, Validate};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ElementState {
    pub element: Element,
    pub state: StateLevel,
    pub state_rank: u8,
}

impl ElementState {
    pub fn v1(element: Element, state: StateLevel) -> Self {
        Self {
            element,
            state,
            state_rank: state.rank(),
        }
    }
}

impl Validate for ElementState {
    fn validate(&self) -> Result<(), ContractViolation> {
        if self.state_rank != self.state.rank() {
            return Err(ContractViolation::InvalidValue {
                field: "element_state.state_rank",
                reason: "must match state",
            });
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StateSource {
    Default,
    Override { priority: i32 },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SnapshotInputs {
    pub month_branch: Branch,
    pub season: Season,
    #[serde(default)]
    pub default_state: Option<StateLevel>,
}

/// One of the five rows of the per-chart element-state snapshot, keyed by
/// `(chart_id, ruleset_id, element)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ElementStateRow {
    pub chart_id: ChartId,
    pub ruleset_id: RulesetId,
    pub element_state: ElementState,
    pub source: StateSource,
    pub evidence: Evidence<SnapshotInputs>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppliedOverride {
    pub element: Element,
    pub state: StateLevel,
    pub priority: i32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "policy", rename_all = "snake_case")]
pub enum VerdictPolicy {
    StateThresholds { states: Vec<StateLevel> },
    ScoreMin { score_min: f64 },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DelingInputs {
    pub pillars_sha256: String,
    pub element_states: Vec<ElementState>,
    #[serde(default)]
    pub applied_overrides: Vec<AppliedOverride>,
    pub verdict_policy: VerdictPolicy,
}

/// Verdict row, one per `(chart_id, ruleset_id)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DelingResult {
    pub chart_id: ChartId,
    pub ruleset_id: RulesetId,
    pub month_branch: Branch,
    pub season: Season,
    pub day_stem: Stem,
    pub day_master_element: Element,
    pub day_master_state: StateLevel,
    pub day_master_state_rank: u8,
    pub day_master_score: f64,
    pub is_deling: bool,
    pub rule_text: String,
    pub evidence: Evidence<DelingInputs>,
}

impl DelingResult {
    pub fn state_of(&self, element: Element) -> Option<StateLevel> {
        self.evidence
            .inputs
            .element_states
            .iter()
            .find(|s| s.element == element)
            .map(|s| s.state)
    }
}

impl Validate for DelingResult {
    fn validate(&self) -> Result<(), ContractViolation> {
        self.chart_id.validate()?;
        self.ruleset_id.validate()?;
        if self.day_master_state_rank != self.day_master_state.rank() {
            return Err(ContractViolation::InvalidValue {
                field: "deling_result.day_master_state_rank",
                reason: "must match day_master_state",
            });
        }
        validate_unit_interval("deling_result.day_master_score", self.day_master_score)?;
        let expected = f64::from(self.day_master_state_rank) / 5.0;
        if (self.day_master_score - expected).abs() > f64::EPSILON {
            return Err(ContractViolation::InvalidValue {
                field: "deling_result.day_master_score",
                reason: "must equal state_rank / 5",
            });
        }
        if self.rule_text.trim().is_empty() {
            return Err(ContractViolation::InvalidValue {
                field: "deling_result.rule_text",
                reason: "must not be empty",
            });
        }
        for s in &self.evidence.inputs.element_states {
            s.validate()?;
        }
        Ok(())
    }
}

/// Everything one SeasonClassifier run writes.
#[derive(Debug, Clone, PartialEq)]
pub struct DelingOutcome {
    pub result: DelingResult,
    pub snapshot: Vec<ElementStateRow>,
}
