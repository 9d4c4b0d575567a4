#![forbid(unsafe_code)]

use bazi_engines::geju::GejuConfig;
use bazi_engines::profile::ProfileConfig;
use bazi_engines::rootqi::RootQiConfig;
use bazi_engines::strength::StrengthConfig;
use bazi_kernel_contracts::chart::{CalcVersion, RulesetId};
use serde::{Deserialize, Serialize};

/// What a persisting stage does when its write fails because the target
/// table is absent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PersistencePolicy {
    /// The stage fails and its output is dropped.
    Propagate,
    /// The in-memory result is kept and the stage is marked degraded.
    ReturnUnpersisted,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersistencePolicies {
    pub deling: PersistencePolicy,
    pub rootqi: PersistencePolicy,
    pub tonggen: PersistencePolicy,
    pub tougan: PersistencePolicy,
    pub hanzao: PersistencePolicy,
    pub geju: PersistencePolicy,
    pub yongshen: PersistencePolicy,
}

impl PersistencePolicies {
    /// Seasonal command and rooting must persist; climate and useful-element
    /// results may be returned without a schema.
    pub fn mvp_v1() -> Self {
        use PersistencePolicy::{Propagate, ReturnUnpersisted};
        Self {
            deling: Propagate,
            rootqi: Propagate,
            tonggen: Propagate,
            tougan: Propagate,
            hanzao: ReturnUnpersisted,
            geju: Propagate,
            yongshen: ReturnUnpersisted,
        }
    }

    pub fn uniform(policy: PersistencePolicy) -> Self {
        Self {
            deling: policy,
            rootqi: policy,
            tonggen: policy,
            tougan: policy,
            hanzao: policy,
            geju: policy,
            yongshen: policy,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PipelineConfig {
    pub ruleset_id: RulesetId,
    pub calc_version: CalcVersion,
    pub persistence: PersistencePolicies,
    pub rootqi: RootQiConfig,
    pub strength: StrengthConfig,
    pub geju: GejuConfig,
    pub profile: ProfileConfig,
}

impl PipelineConfig {
    pub fn mvp_v1() -> Self {
        Self {
            ruleset_id: RulesetId::default(),
            calc_version: CalcVersion::default(),
            persistence: PersistencePolicies::mvp_v1(),
            rootqi: RootQiConfig::mvp_v1(),
            strength: StrengthConfig::mvp_v1(),
            geju: GejuConfig::mvp_v1(),
            profile: ProfileConfig::mvp_v1(),
        }
    }

    pub fn with_ruleset(mut self, ruleset_id: RulesetId) -> Self {
        self.ruleset_id = ruleset_id;
        self
    }
}
