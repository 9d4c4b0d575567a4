#![forbid(unsafe_code)]

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::common::validate_id;
use crate::ganzhi::{Branch, Stem};
use crate::{ContractViolation, Validate};

pub const DEFAULT_RULESET_ID: &str = "default";
pub const DEFAULT_CALC_VERSION: &str = "v1";

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChartId(String);

impl ChartId {
    pub fn new(v: impl Into<String>) -> Result<Self, ContractViolation> {
        let v = Self(v.into());
        v.validate()?;
        Ok(v)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Validate for ChartId {
    fn validate(&self) -> Result<(), ContractViolation> {
        validate_id("chart_id", &self.0, 128)
    }
}

impl fmt::Display for ChartId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RulesetId(String);

impl RulesetId {
    pub fn new(v: impl Into<String>) -> Result<Self, ContractViolation> {
        let v = Self(v.into());
        v.validate()?;
        Ok(v)
    }

    pub fn default_id() -> Self {
        Self(DEFAULT_RULESET_ID.to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for RulesetId {
    fn default() -> Self {
        Self::default_id()
    }
}

impl Validate for RulesetId {
    fn validate(&self) -> Result<(), ContractViolation> {
        validate_id("ruleset_id", &self.0, 64)
    }
}

impl fmt::Display for RulesetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CalcVersion(String);

impl CalcVersion {
    pub fn new(v: impl Into<String>) -> Result<Self, ContractViolation> {
        let v = Self(v.into());
        v.validate()?;
        Ok(v)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for CalcVersion {
    fn default() -> Self {
        Self(DEFAULT_CALC_VERSION.to_string())
    }
}

impl Validate for CalcVersion {
    fn validate(&self) -> Result<(), ContractViolation> {
        validate_id("calc_version", &self.0, 32)
    }
}

impl fmt::Display for CalcVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum PillarPosition {
    Year,
    Month,
    Day,
    Hour,
}

impl PillarPosition {
    pub const ALL: [PillarPosition; 4] = [
        PillarPosition::Year,
        PillarPosition::Month,
        PillarPosition::Day,
        PillarPosition::Hour,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            PillarPosition::Year => "year",
            PillarPosition::Month => "month",
            PillarPosition::Day => "day",
            PillarPosition::Hour => "hour",
        }
    }
}

impl fmt::Display for PillarPosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Pillar {
    pub position: PillarPosition,
    pub stem: Stem,
    pub branch: Branch,
}

impl Pillar {
    pub fn new(position: PillarPosition, stem: Stem, branch: Branch) -> Self {
        Self {
            position,
            stem,
            branch,
        }
    }
}

/// The four natal pillars. Order is always year, month, day, hour once
/// constructed through `v1`; the field stays public so callers that bypass
/// the constructor are still caught by `validate`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FourPillars {
    pub pillars: Vec<Pillar>,
}

impl FourPillars {
    pub fn v1(mut pillars: Vec<Pillar>) -> Result<Self, ContractViolation> {
        pillars.sort_by_key(|p| p.position);
        let fp = Self { pillars };
        fp.validate()?;
        Ok(fp)
    }

    /// Builds from four stem-branch pairs in year, month, day, hour order.
    pub fn from_pairs(pairs: [(Stem, Branch); 4]) -> Self {
        let pillars = PillarPosition::ALL
            .into_iter()
            .zip(pairs)
            .map(|(position, (stem, branch))| Pillar::new(position, stem, branch))
            .collect();
        Self { pillars }
    }

    /// Parses `"甲子,丙寅,戊辰,庚午"` (year, month, day, hour).
    pub fn parse(s: &str) -> Result<Self, ContractViolation> {
        let parts: Vec<&str> = s
            .split(&[',', ' ', '，'][..])
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .collect();
        if parts.len() != 4 {
            return Err(ContractViolation::InvalidValue {
                field: "four_pillars.pillars",
                reason: "must contain exactly 4 pillars",
            });
        }
        let mut pillars = Vec::with_capacity(4);
        for (position, part) in PillarPosition::ALL.into_iter().zip(parts) {
            pillars.push(parse_pillar(position, part)?);
        }
        Self::v1(pillars)
    }

    pub fn pillar(&self, position: PillarPosition) -> Option<&Pillar> {
        self.pillars.iter().find(|p| p.position == position)
    }

    pub fn stem_at(&self, position: PillarPosition) -> Option<Stem> {
        self.pillar(position).map(|p| p.stem)
    }

    pub fn branch_at(&self, position: PillarPosition) -> Option<Branch> {
        self.pillar(position).map(|p| p.branch)
    }

    pub fn day_stem(&self) -> Option<Stem> {
        self.stem_at(PillarPosition::Day)
    }

    pub fn month_branch(&self) -> Option<Branch> {
        self.branch_at(PillarPosition::Month)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Pillar> {
        self.pillars.iter()
    }

    /// Canonical text form used for fingerprints and logs.
    pub fn canonical(&self) -> String {
        self.pillars
            .iter()
            .map(|p| format!("{}{}", p.stem.as_char(), p.branch.as_char()))
            .collect::<Vec<_>>()
            .join(",")
    }
}

impl Validate for FourPillars {
    fn validate(&self) -> Result<(), ContractViolation> {
        if self.pillars.len() != 4 {
            return Err(ContractViolation::InvalidValue {
                field: "four_pillars.pillars",
                reason: "must contain exactly 4 pillars",
            });
        }
        for position in PillarPosition::ALL {
            if self.pillars.iter().filter(|p| p.position == position).count() != 1 {
                return Err(ContractViolation::InvalidValue {
                    field: "four_pillars.pillars",
                    reason: "must contain exactly one pillar per position",
                });
            }
        }
        Ok(())
    }
}

fn parse_pillar(position: PillarPosition, s: &str) -> Result<Pillar, ContractViolation> {
    let mut chars = s.chars();
    let (Some(sc), Some(bc), None) = (chars.next(), chars.next(), chars.next()) else {
        return Err(ContractViolation::InvalidValue {
            field: "four_pillars.pillar",
            reason: "must be one stem followed by one branch",
        });
    };
    let stem = Stem::from_char(sc).ok_or(ContractViolation::InvalidValue {
        field: "four_pillars.pillar.stem",
        reason: "unknown heavenly stem",
    })?;
    let branch = Branch::from_char(bc).ok_or(ContractViolation::InvalidValue {
        field: "four_pillars.pillar.branch",
        reason: "unknown earthly branch",
    })?;
    Ok(Pillar::new(position, stem, branch))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_orders_positions_and_round_trips_canonical_form() {
        let fp = FourPillars::parse("甲子, 丙寅, 戊辰, 庚午").unwrap();
        assert_eq!(fp.day_stem(), Some(Stem::Wu));
        assert_eq!(fp.month_branch(), Some(Branch::Yin));
        assert_eq!(fp.canonical(), "甲子,丙寅,戊辰,庚午");
    }

    #[test]
    fn three_pillars_are_rejected() {
        assert!(FourPillars::parse("甲子,丙寅,戊辰").is_err());
        let fp = FourPillars {
            pillars: FourPillars::from_pairs([
                (Stem::Jia, Branch::Zi),
                (Stem::Bing, Branch::Yin),
                (Stem::Wu, Branch::Chen),
                (Stem::Geng, Branch::Wu),
            ])
            .pillars
            .into_iter()
            .take(3)
            .collect(),
        };
        assert!(fp.validate().is_err());
    }

    #[test]
    fn duplicate_position_is_rejected() {
        let p = Pillar::new(PillarPosition::Year, Stem::Jia, Branch::Zi);
        assert!(FourPillars::v1(vec![p, p, p, p]).is_err());
    }

    #[test]
    fn blank_chart_id_is_rejected() {
        assert!(ChartId::new("   ").is_err());
        assert_eq!(RulesetId::default().as_str(), "default");
        assert_eq!(CalcVersion::default().as_str(), "v1");
    }
}
