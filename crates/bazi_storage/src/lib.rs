#![forbid(unsafe_code)]

pub mod error;
pub mod memory;
pub mod repo;
pub mod sqlite;
pub mod tables;

use bazi_kernel_contracts::Validate;

pub use error::StorageError;
pub use memory::MemoryChartStore;
pub use repo::ChartStore;
pub use sqlite::SqliteChartStore;

pub(crate) fn validate_all<T: Validate>(rows: &[T]) -> Result<(), StorageError> {
    for row in rows {
        row.validate()?;
    }
    Ok(())
}
