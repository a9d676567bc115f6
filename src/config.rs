//! Catalog configuration
//!
//! ```toml
//! table = "ice_cream"
//! database_url = "postgres://localhost/shop"
//!
//! [[sources]]
//! display_name = "Number Scoops"
//! column = "num_scoops"
//! value_types = ["numeric", "nullable"]
//!
//! [[operators]]
//! name = "at least"
//! value_type = "numeric"
//! ```

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::catalog::{Catalog, DataSource};
use crate::compiler::Winnow;
use crate::error::{WinnowError, WinnowResult};
use crate::operators::{Operator, OperatorRegistry};

/// Contents of a catalog file.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct WinnowConfig {
    /// Table queries select from
    pub table: String,

    /// Database connection URL (optional)
    pub database_url: Option<String>,

    /// Filterable data sources
    #[serde(default)]
    pub sources: Vec<DataSource>,

    /// Operators added to the default table
    #[serde(default)]
    pub operators: Vec<Operator>,
}

impl WinnowConfig {
    /// `<config dir>/winnow/catalog.toml`
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("winnow").join("catalog.toml"))
    }

    /// Read and parse a catalog file.
    pub fn load(path: impl AsRef<Path>) -> WinnowResult<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|e| WinnowError::Config(format!("{}: {}", path.display(), e)))?;
        let config = Self::from_toml_str(&content)?;
        tracing::info!(path = %path.display(), sources = config.sources.len(), "loaded catalog");
        Ok(config)
    }

    pub fn from_toml_str(content: &str) -> WinnowResult<Self> {
        let config: WinnowConfig = toml::from_str(content).map_err(|e| WinnowError::Config(e.to_string()))?;

        let mut seen = HashSet::new();
        for source in &config.sources {
            if !seen.insert(source.display_name.as_str()) {
                // only an error once a filter actually names it
                tracing::warn!(source = %source.display_name, "data source defined more than once");
            }
        }
        Ok(config)
    }

    /// The operator table: defaults plus the configured extras.
    pub fn operator_registry(&self) -> WinnowResult<OperatorRegistry> {
        let mut registry = OperatorRegistry::default();
        for operator in &self.operators {
            registry.push(operator.clone())?;
        }
        Ok(registry)
    }

    /// Build a compiler for the configured table and sources.
    pub fn into_winnow(self) -> WinnowResult<Winnow> {
        let operators = self.operator_registry()?;
        Ok(Winnow::new(self.table, Catalog::new(self.sources)).with_operators(operators))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::operators::ValueType;

    const CATALOG: &str = r#"
        table = "ice_cream"

        [[sources]]
        display_name = "Number Scoops"
        column = "num_scoops"
        value_types = ["numeric", "nullable"]

        [[sources]]
        display_name = "Flavor"
        column = "flavor"
        value_types = ["collection"]
        choices = [
            { id = "choc", name = "Chocolate" },
            { id = "straw", name = "Strawberry" },
        ]

        [[operators]]
        name = "at least"
        value_type = "numeric"
    "#;

    #[test]
    fn test_parse_catalog() {
        let config = WinnowConfig::from_toml_str(CATALOG).unwrap();
        assert_eq!(config.table, "ice_cream");
        assert_eq!(config.database_url, None);
        assert_eq!(config.sources.len(), 2);
        assert_eq!(config.sources[0].value_types, vec![ValueType::Numeric, ValueType::Nullable]);
        assert_eq!(config.sources[1].choices.as_ref().map(Vec::len), Some(2));
    }

    #[test]
    fn test_extra_operators() {
        let config = WinnowConfig::from_toml_str(CATALOG).unwrap();
        let registry = config.operator_registry().unwrap();
        assert_eq!(registry.len(), OperatorRegistry::default().len() + 1);

        let winnow = config.into_winnow().unwrap();
        assert_eq!(winnow.table(), "ice_cream");
        assert_eq!(winnow.catalog().len(), 2);
    }

    #[test]
    fn test_duplicate_operator_rejected() {
        let toml = r#"
            table = "t"
            [[operators]]
            name = "IS"
            value_type = "string"
        "#;
        let config = WinnowConfig::from_toml_str(toml).unwrap();
        assert!(matches!(config.into_winnow(), Err(WinnowError::DuplicateOperator { .. })));
    }

    #[test]
    fn test_unknown_value_type_rejected() {
        let toml = r#"
            table = "t"
            [[sources]]
            display_name = "Colour"
            column = "colour"
            value_types = ["colour"]
        "#;
        assert!(matches!(WinnowConfig::from_toml_str(toml), Err(WinnowError::Config(_))));
    }

    #[test]
    fn test_missing_file() {
        let err = WinnowConfig::load("/definitely/not/here/catalog.toml").unwrap_err();
        assert!(matches!(err, WinnowError::Config(msg) if msg.contains("catalog.toml")));
    }

    #[test]
    fn test_default_path() {
        if let Some(path) = WinnowConfig::default_path() {
            assert!(path.ends_with("winnow/catalog.toml"));
        }
    }
}
