#![forbid(unsafe_code)]

//! Audit payload attached to every persisted row.
//!
//! Each stage declares a typed `inputs` record. Keys written by a newer or
//! older producer that this build does not know about land in `extra` and are
//! written back unchanged, so a row can be read and re-saved without losing
//! anything.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

pub const EVIDENCE_VERSION: u32 = 1;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Evidence<T> {
    pub evidence_version: u32,
    #[serde(flatten)]
    pub inputs: T,
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

impl<T> Evidence<T> {
    pub fn v1(inputs: T) -> Self {
        Self {
            evidence_version: EVIDENCE_VERSION,
            inputs,
            extra: BTreeMap::new(),
        }
    }

    pub fn with_extra(mut self, key: impl Into<String>, value: Value) -> Self {
        self.extra.insert(key.into(), value);
        self
    }
}
