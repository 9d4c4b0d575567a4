#![forbid(unsafe_code)]

use std::path::PathBuf;

use bazi_engines::EngineError;
use bazi_kernel_contracts::chart::RulesetId;
use bazi_kernel_contracts::{ContractViolation, ReasonCodeId};
use bazi_storage::StorageError;
use thiserror::Error;

use crate::pipeline::Stage;

pub mod reason_codes {
    use bazi_kernel_contracts::ReasonCodeId;

    pub const OS_INVALID_INPUT: ReasonCodeId = ReasonCodeId(0x4F53_0001);
    pub const OS_MISSING_DICTIONARY_ROW: ReasonCodeId = ReasonCodeId(0x4F53_0002);
    pub const OS_RULESET_MISCONFIGURED: ReasonCodeId = ReasonCodeId(0x4F53_0003);
    pub const OS_PERSISTENCE_UNAVAILABLE: ReasonCodeId = ReasonCodeId(0x4F53_0004);
    pub const OS_STORAGE_FAILED: ReasonCodeId = ReasonCodeId(0x4F53_0005);
    pub const OS_UPSTREAM_ABSENT: ReasonCodeId = ReasonCodeId(0x4F53_0010);
    pub const OS_RULESET_FALLBACK: ReasonCodeId = ReasonCodeId(0x4F53_0011);
}

/// A classified stage failure. The message is meant to be shown verbatim.
#[derive(Debug, Error)]
pub enum StageError {
    #[error("{stage}: invalid input: {detail}")]
    InvalidInput { stage: Stage, detail: String },
    #[error("{stage}: no row for {key} in {table}")]
    MissingDictionaryRow {
        stage: Stage,
        table: &'static str,
        key: String,
    },
    #[error("{stage}: ruleset {ruleset_id} is misconfigured: {reason}")]
    RulesetMisconfigured {
        stage: Stage,
        ruleset_id: String,
        reason: &'static str,
    },
    #[error("{stage}: table {table} is not available")]
    PersistenceUnavailable { stage: Stage, table: String },
    #[error("{stage}: storage failed: {source}")]
    Storage {
        stage: Stage,
        #[source]
        source: StorageError,
    },
}

impl StageError {
    pub fn from_engine(stage: Stage, e: EngineError) -> Self {
        match e {
            EngineError::InvalidInput(v) => StageError::InvalidInput {
                stage,
                detail: v.to_string(),
            },
            EngineError::MissingDictionaryRow { table, key } => {
                StageError::MissingDictionaryRow { stage, table, key }
            }
            EngineError::RulesetMisconfigured { ruleset_id, reason } => {
                StageError::RulesetMisconfigured {
                    stage,
                    ruleset_id,
                    reason,
                }
            }
        }
    }

    pub fn from_storage(stage: Stage, e: StorageError) -> Self {
        match e {
            StorageError::TableMissing { table } => {
                StageError::PersistenceUnavailable { stage, table }
            }
            StorageError::ContractViolation(v) => StageError::InvalidInput {
                stage,
                detail: v.to_string(),
            },
            source => StageError::Storage { stage, source },
        }
    }

    pub fn stage(&self) -> Stage {
        match self {
            StageError::InvalidInput { stage, .. }
            | StageError::MissingDictionaryRow { stage, .. }
            | StageError::RulesetMisconfigured { stage, .. }
            | StageError::PersistenceUnavailable { stage, .. }
            | StageError::Storage { stage, .. } => *stage,
        }
    }

    pub fn reason_code(&self) -> ReasonCodeId {
        match self {
            StageError::InvalidInput { .. } => reason_codes::OS_INVALID_INPUT,
            StageError::MissingDictionaryRow { .. } => reason_codes::OS_MISSING_DICTIONARY_ROW,
            StageError::RulesetMisconfigured { .. } => reason_codes::OS_RULESET_MISCONFIGURED,
            StageError::PersistenceUnavailable { .. } => reason_codes::OS_PERSISTENCE_UNAVAILABLE,
            StageError::Storage { .. } => reason_codes::OS_STORAGE_FAILED,
        }
    }

    pub fn is_persistence_unavailable(&self) -> bool {
        matches!(self, StageError::PersistenceUnavailable { .. })
    }
}

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("reading {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("parsing ruleset catalog: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("ruleset {0} is defined more than once")]
    Duplicate(RulesetId),
    #[error("invalid ruleset: {0}")]
    Invalid(#[from] ContractViolation),
    #[error("installing rulesets: {0}")]
    Storage(#[from] StorageError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn at_os_err_01_engine_errors_keep_their_class() {
        let e = StageError::from_engine(
            Stage::Deling,
            EngineError::RulesetMisconfigured {
                ruleset_id: "broken".to_string(),
                reason: "no policy",
            },
        );
        assert_eq!(e.reason_code(), reason_codes::OS_RULESET_MISCONFIGURED);
        assert_eq!(e.stage(), Stage::Deling);
        assert_eq!(
            e.to_string(),
            "deling: ruleset broken is misconfigured: no policy"
        );
    }

    #[test]
    fn at_os_err_02_missing_table_is_persistence_unavailable() {
        let e = StageError::from_storage(Stage::HanZao, StorageError::table_missing("t"));
        assert!(e.is_persistence_unavailable());
        assert_eq!(e.reason_code(), reason_codes::OS_PERSISTENCE_UNAVAILABLE);
    }
}
