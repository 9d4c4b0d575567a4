#![forbid(unsafe_code)]

use bazi_kernel_contracts::{ContractViolation, ReasonCodeId};
use thiserror::Error;

pub mod reason_codes {
    use bazi_kernel_contracts::ReasonCodeId;

    // Engine reason-code namespace ("EN").
    pub const ENGINE_INVALID_INPUT: ReasonCodeId = ReasonCodeId(0x454E_00F1);
    pub const ENGINE_MISSING_DICTIONARY_ROW: ReasonCodeId = ReasonCodeId(0x454E_00F2);
    pub const ENGINE_RULESET_MISCONFIGURED: ReasonCodeId = ReasonCodeId(0x454E_00F3);
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum EngineError {
    #[error("invalid input: {0}")]
    InvalidInput(#[from] ContractViolation),

    #[error("missing dictionary row in {table}: {key}")]
    MissingDictionaryRow { table: &'static str, key: String },

    #[error("ruleset {ruleset_id} is misconfigured: {reason}")]
    RulesetMisconfigured {
        ruleset_id: String,
        reason: &'static str,
    },
}

impl EngineError {
    pub fn reason_code(&self) -> ReasonCodeId {
        match self {
            EngineError::InvalidInput(_) => reason_codes::ENGINE_INVALID_INPUT,
            EngineError::MissingDictionaryRow { .. } => {
                reason_codes::ENGINE_MISSING_DICTIONARY_ROW
            }
            EngineError::RulesetMisconfigured { .. } => {
                reason_codes::ENGINE_RULESET_MISCONFIGURED
            }
        }
    }

    pub(crate) fn missing(table: &'static str, key: impl Into<String>) -> Self {
        EngineError::MissingDictionaryRow {
            table,
            key: key.into(),
        }
    }
}

pub type EngineResult<T> = Result<T, EngineError>;
