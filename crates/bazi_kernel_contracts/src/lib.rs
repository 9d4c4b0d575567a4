#![forbid(unsafe_code)]

pub mod chart;
pub mod common;
pub mod consistency;
pub mod deling;
pub mod evidence;
pub mod ganzhi;
pub mod geju;
pub mod hanzao;
pub mod profile;
pub mod relation;
pub mod rootqi;
pub mod ruleset;
pub mod strength;
pub mod yongshen;

pub use common::{ContractViolation, ReasonCodeId, Validate};
