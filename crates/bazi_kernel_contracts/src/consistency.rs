#![forbid(unsafe_code)]

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SelfConsistency {
    Consistent,
    NeedsReview,
    /// Balanced chart without risk points; the heuristic never calls a
    /// balanced chart consistent.
    Inconclusive,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskSource {
    FormationBreaker,
    RelationLoad,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RiskPoint {
    pub source: RiskSource,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConsistencyReport {
    pub primary_conflict: String,
    pub medicine: String,
    pub risk_points: Vec<RiskPoint>,
    pub self_consistency: SelfConsistency,
}
