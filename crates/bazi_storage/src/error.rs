#![forbid(unsafe_code)]

use bazi_kernel_contracts::ContractViolation;
use thiserror::Error;

pub mod reason_codes {
    use bazi_kernel_contracts::ReasonCodeId;

    pub const STORAGE_TABLE_MISSING: ReasonCodeId = ReasonCodeId(0x5354_00F1);
    pub const STORAGE_SQLITE_FAILED: ReasonCodeId = ReasonCodeId(0x5354_00F2);
    pub const STORAGE_SERIALIZATION_FAILED: ReasonCodeId = ReasonCodeId(0x5354_00F3);
    pub const STORAGE_CONTRACT_VIOLATION: ReasonCodeId = ReasonCodeId(0x5354_00F4);
}

#[derive(Debug, Error)]
pub enum StorageError {
    /// The target table is not provisioned in this store.
    #[error("table {table} is not provisioned")]
    TableMissing { table: String },
    #[error("sqlite: {0}")]
    Sqlite(rusqlite::Error),
    #[error("row document: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("contract violation: {0}")]
    ContractViolation(#[from] ContractViolation),
}

impl StorageError {
    pub fn table_missing(table: impl Into<String>) -> Self {
        StorageError::TableMissing {
            table: table.into(),
        }
    }

    pub fn is_table_missing(&self) -> bool {
        matches!(self, StorageError::TableMissing { .. })
    }

    pub fn reason_code(&self) -> bazi_kernel_contracts::ReasonCodeId {
        match self {
            StorageError::TableMissing { .. } => reason_codes::STORAGE_TABLE_MISSING,
            StorageError::Sqlite(_) => reason_codes::STORAGE_SQLITE_FAILED,
            StorageError::Serialization(_) => reason_codes::STORAGE_SERIALIZATION_FAILED,
            StorageError::ContractViolation(_) => reason_codes::STORAGE_CONTRACT_VIOLATION,
        }
    }
}

impl From<rusqlite::Error> for StorageError {
    fn from(e: rusqlite::Error) -> Self {
        match missing_table_name(&e) {
            Some(table) => StorageError::TableMissing { table },
            None => StorageError::Sqlite(e),
        }
    }
}

/// SQLite reports an absent table only through the message text.
fn missing_table_name(e: &rusqlite::Error) -> Option<String> {
    let msg = match e {
        rusqlite::Error::SqliteFailure(_, Some(msg)) => msg.as_str(),
        rusqlite::Error::SqlInputError { msg, .. } => msg.as_str(),
        _ => return None,
    };
    msg.strip_prefix("no such table: ")
        .map(|t| t.trim().trim_start_matches("main.").to_string())
}
