#![forbid(unsafe_code)]

pub mod catalog;
pub mod config;
pub mod error;
pub mod pipeline;

pub use catalog::{resolve_ruleset, RulesetCatalog, RulesetSource};
pub use config::{PersistencePolicies, PersistencePolicy, PipelineConfig};
pub use error::{CatalogError, StageError};
pub use pipeline::{ChartPipeline, ChartReport, ChartRequest, Stage, StageRecord, StageStatus};
