#![forbid(unsafe_code)]

pub mod consistency;
pub mod deling;
pub mod dictionary;
pub mod error;
pub mod fingerprint;
pub mod geju;
pub mod hanzao;
pub mod pillar_profile;
pub mod profile;
pub mod relation;
pub mod rootqi;
pub mod strength;
pub mod yongshen;

pub use dictionary::ElementDictionary;
pub use error::{EngineError, EngineResult};
