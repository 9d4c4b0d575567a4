#![forbid(unsafe_code)]

//! Ruleset catalog loaded from TOML. Each `[[ruleset]]` entry is a
//! `RulesetBundle`; tables left out fall back to the built-in defaults when
//! the bundle is resolved.

use std::collections::BTreeMap;
use std::path::Path;

use bazi_kernel_contracts::chart::RulesetId;
use bazi_kernel_contracts::ruleset::{Ruleset, RulesetBundle};
use bazi_kernel_contracts::Validate;
use bazi_storage::repo::RulesetStore;
use bazi_storage::StorageError;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::CatalogError;

#[derive(Debug, Deserialize)]
struct CatalogFile {
    #[serde(default, rename = "ruleset")]
    rulesets: Vec<RulesetBundle>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct RulesetCatalog {
    bundles: BTreeMap<RulesetId, RulesetBundle>,
}

impl RulesetCatalog {
    pub fn from_toml_str(text: &str) -> Result<Self, CatalogError> {
        let file: CatalogFile = toml::from_str(text)?;
        let mut catalog = Self::default();
        for bundle in file.rulesets {
            bundle.validate()?;
            if catalog.bundles.contains_key(&bundle.ruleset_id) {
                return Err(CatalogError::Duplicate(bundle.ruleset_id));
            }
            catalog.bundles.insert(bundle.ruleset_id.clone(), bundle);
        }
        Ok(catalog)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, CatalogError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| CatalogError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&text)
    }

    pub fn get(&self, ruleset_id: &RulesetId) -> Option<&RulesetBundle> {
        self.bundles.get(ruleset_id)
    }

    pub fn ids(&self) -> impl Iterator<Item = &RulesetId> {
        self.bundles.keys()
    }

    pub fn len(&self) -> usize {
        self.bundles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bundles.is_empty()
    }

    /// Writes every bundle into the store, replacing same-id rows.
    pub fn install(&self, store: &mut impl RulesetStore) -> Result<usize, CatalogError> {
        for bundle in self.bundles.values() {
            store.put_ruleset(bundle)?;
        }
        info!(count = self.bundles.len(), "rulesets installed");
        Ok(self.bundles.len())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RulesetSource {
    Stored,
    BuiltinDefault,
}

/// Looks the ruleset up in the store. An id the store does not know, or a
/// store without a rulesets table, resolves to the built-in defaults; a row
/// that cannot be read is an error.
pub fn resolve_ruleset(
    store: &impl RulesetStore,
    ruleset_id: &RulesetId,
) -> Result<(Ruleset, RulesetSource), StorageError> {
    match store.get_ruleset(ruleset_id) {
        Ok(Some(bundle)) => Ok((bundle.resolve(), RulesetSource::Stored)),
        Ok(None) => Ok((
            Ruleset::builtin_default(ruleset_id.clone()),
            RulesetSource::BuiltinDefault,
        )),
        Err(e) if e.is_table_missing() => {
            warn!(ruleset_id = %ruleset_id, error = %e, "no rulesets table; using defaults");
            Ok((
                Ruleset::builtin_default(ruleset_id.clone()),
                RulesetSource::BuiltinDefault,
            ))
        }
        Err(e) => Err(e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bazi_kernel_contracts::ganzhi::StateLevel;
    use bazi_storage::{tables, MemoryChartStore};

    const CATALOG: &str = r#"
[[ruleset]]
ruleset_id = "strict"

[ruleset.deling_policy]
state_thresholds = ["旺"]

[[ruleset]]
ruleset_id = "lenient"

[ruleset.deling_policy]
score_min = 0.6
"#;

    #[test]
    fn at_catalog_01_toml_bundles_resolve_with_defaults() {
        let c = RulesetCatalog::from_toml_str(CATALOG).unwrap();
        assert_eq!(c.len(), 2);
        let strict = c
            .get(&RulesetId::new("strict").unwrap())
            .unwrap()
            .clone()
            .resolve();
        assert_eq!(strict.deling_policy.state_thresholds, vec![StateLevel::Wang]);
        assert!(strict.defaulted_tables.contains(&"season_by_branch"));
        assert!(!strict.defaulted_tables.contains(&"deling_policy"));
    }

    #[test]
    fn at_catalog_02_duplicate_ids_are_rejected() {
        let text = format!("{}\n[[ruleset]]\nruleset_id = \"strict\"\n", CATALOG);
        assert!(matches!(
            RulesetCatalog::from_toml_str(&text),
            Err(CatalogError::Duplicate(_))
        ));
    }

    #[test]
    fn at_catalog_03_out_of_range_score_min_is_invalid() {
        let text = "[[ruleset]]\nruleset_id = \"x\"\n[ruleset.deling_policy]\nscore_min = 2.0\n";
        assert!(matches!(
            RulesetCatalog::from_toml_str(text),
            Err(CatalogError::Invalid(_))
        ));
    }

    #[test]
    fn at_catalog_04_install_then_resolve_from_store() {
        let mut store = MemoryChartStore::new_in_memory();
        let c = RulesetCatalog::from_toml_str(CATALOG).unwrap();
        assert_eq!(c.install(&mut store).unwrap(), 2);

        let (rs, source) = resolve_ruleset(&store, &RulesetId::new("lenient").unwrap()).unwrap();
        assert_eq!(source, RulesetSource::Stored);
        assert_eq!(rs.deling_policy.score_min, Some(0.6));

        let (_, source) = resolve_ruleset(&store, &RulesetId::new("unknown").unwrap()).unwrap();
        assert_eq!(source, RulesetSource::BuiltinDefault);

        let bare = MemoryChartStore::new_in_memory().without_table(tables::RULESETS);
        let (_, source) = resolve_ruleset(&bare, &RulesetId::new("lenient").unwrap()).unwrap();
        assert_eq!(source, RulesetSource::BuiltinDefault);
    }

    #[test]
    fn at_catalog_05_missing_file_reports_path() {
        let err = RulesetCatalog::from_path("/nonexistent/rules.toml").unwrap_err();
        assert!(err.to_string().contains("/nonexistent/rules.toml"));
    }
}
